//! Generalization traversal
//!
//! This module provides functions to:
//! - Collect all defined attributes/associations/operations along the superclass chain
//! - Compute descendant closures, repairing cyclic generalization on the way
//! - Order entities so that every superclass comes before its subclasses
//! - Look up principal primary/unique keys

use std::collections::{HashMap, HashSet, VecDeque};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::model::{AssociationId, AttributeId, EntityGraph, EntityId, InvariantId, OperationId};

/// `e` followed by its primary ancestors, truncated at the first revisit
pub fn superclass_chain(
    graph: &EntityGraph,
    e: EntityId,
    diagnostics: &mut Diagnostics,
) -> Vec<EntityId> {
    let mut chain = vec![e];
    let mut visited = HashSet::from([e]);
    let mut current = e;

    while let Some(parent) = graph.entity(current).superclass {
        if !visited.insert(parent) {
            diagnostics.push(Diagnostic::CycleDetected {
                entity: graph.name(current).to_string(),
                revisited: graph.name(parent).to_string(),
            });
            break;
        }
        chain.push(parent);
        current = parent;
    }

    chain
}

/// Primary ancestors of `e`, nearest first
pub fn ancestors(graph: &EntityGraph, e: EntityId, diagnostics: &mut Diagnostics) -> Vec<EntityId> {
    superclass_chain(graph, e, diagnostics).split_off(1)
}

/// `e` plus all of its primary ancestors
pub fn upper_cotopy(
    graph: &EntityGraph,
    e: EntityId,
    diagnostics: &mut Diagnostics,
) -> HashSet<EntityId> {
    superclass_chain(graph, e, diagnostics).into_iter().collect()
}

/// True if `ancestor` is reachable from `e` through primary or additional parents
pub fn is_ancestor(graph: &EntityGraph, ancestor: EntityId, e: EntityId) -> bool {
    let mut visited = HashSet::new();
    let mut stack = graph.all_parents(e);
    while let Some(next) = stack.pop() {
        if next == ancestor {
            return true;
        }
        if visited.insert(next) {
            stack.extend(graph.all_parents(next));
        }
    }
    false
}

pub fn is_descendant(graph: &EntityGraph, descendant: EntityId, e: EntityId) -> bool {
    is_ancestor(graph, e, descendant)
}

/// Own attributes followed by those of every primary ancestor
///
/// A name declared again below an ancestor is kept twice; the subclass
/// declaration comes first and therefore wins for name-based resolution.
pub fn all_defined_attributes(
    graph: &EntityGraph,
    e: EntityId,
    diagnostics: &mut Diagnostics,
) -> Vec<AttributeId> {
    collect_defined(
        graph,
        e,
        diagnostics,
        |entity| graph.entity(entity).attributes.clone(),
        |id| graph.attribute(id).name.as_str(),
    )
}

/// Own associations followed by those of every primary ancestor
pub fn all_defined_associations(
    graph: &EntityGraph,
    e: EntityId,
    diagnostics: &mut Diagnostics,
) -> Vec<AssociationId> {
    collect_defined(
        graph,
        e,
        diagnostics,
        |entity| graph.entity(entity).associations.clone(),
        |id| graph.association(id).role2.as_str(),
    )
}

/// Own operations followed by inherited ones
///
/// An operation name redeclared below an ancestor is kept twice and reported
/// like a redeclared attribute.
pub fn all_defined_operations(
    graph: &EntityGraph,
    e: EntityId,
    diagnostics: &mut Diagnostics,
) -> Vec<OperationId> {
    collect_defined(
        graph,
        e,
        diagnostics,
        |entity| graph.entity(entity).operations.clone(),
        |id| graph.operation(id).name.as_str(),
    )
}

pub fn all_defined_invariants(
    graph: &EntityGraph,
    e: EntityId,
    diagnostics: &mut Diagnostics,
) -> Vec<InvariantId> {
    superclass_chain(graph, e, diagnostics)
        .into_iter()
        .flat_map(|entity| graph.entity(entity).invariants.clone())
        .collect()
}

fn collect_defined<'g, T: Copy>(
    graph: &'g EntityGraph,
    e: EntityId,
    diagnostics: &mut Diagnostics,
    own: impl Fn(EntityId) -> Vec<T>,
    name_of: impl Fn(T) -> &'g str,
) -> Vec<T> {
    let mut result = Vec::new();
    // feature name -> entity that declared it lowest in the chain
    let mut declared_in: HashMap<&'g str, EntityId> = HashMap::new();

    for entity in superclass_chain(graph, e, diagnostics) {
        for feature in own(entity) {
            let name = name_of(feature);
            match declared_in.get(name) {
                Some(lower) if *lower != entity => {
                    diagnostics.push(Diagnostic::StructuralWarning {
                        entity: graph.name(*lower).to_string(),
                        feature: name.to_string(),
                        reason: format!("redeclares feature inherited from {}", graph.name(entity)),
                    });
                }
                Some(_) => {}
                None => {
                    declared_in.insert(name, entity);
                }
            }
            result.push(feature);
        }
    }

    result
}

/// All descendants of `e`, with cycle repair
///
/// A child already on the current branch is a cycle: the offending
/// parent→child edge is removed, one `CycleDetected` is recorded and the walk
/// continues with the remaining children. The result never contains `e` and
/// has no duplicates.
pub fn get_all_subclasses(
    graph: &mut EntityGraph,
    e: EntityId,
    diagnostics: &mut Diagnostics,
) -> Vec<EntityId> {
    let mut result = Vec::new();
    let mut branch = vec![e];
    collect_subclasses(graph, e, &mut branch, &mut result, diagnostics);
    result
}

fn collect_subclasses(
    graph: &mut EntityGraph,
    parent: EntityId,
    branch: &mut Vec<EntityId>,
    result: &mut Vec<EntityId>,
    diagnostics: &mut Diagnostics,
) {
    let children = graph.entity(parent).children.clone();
    for child in children {
        if branch.contains(&child) {
            diagnostics.push(Diagnostic::CycleDetected {
                entity: graph.name(parent).to_string(),
                revisited: graph.name(child).to_string(),
            });
            graph.remove_generalization(parent, child);
            continue;
        }
        if !result.contains(&child) {
            result.push(child);
        }
        branch.push(child);
        collect_subclasses(graph, child, branch, result, diagnostics);
        branch.pop();
    }
}

/// Read-only descendant closure; cycles are skipped, not repaired
pub fn descendants(graph: &EntityGraph, e: EntityId) -> Vec<EntityId> {
    let mut result = Vec::new();
    let mut visited = HashSet::from([e]);
    let mut queue: VecDeque<EntityId> = graph.entity(e).children.iter().copied().collect();
    while let Some(next) = queue.pop_front() {
        if !visited.insert(next) {
            continue;
        }
        result.push(next);
        queue.extend(graph.entity(next).children.iter().copied());
    }
    result
}

/// Descendants without children; stored in the entity's cache
pub fn leaf_subclasses(
    graph: &mut EntityGraph,
    e: EntityId,
    diagnostics: &mut Diagnostics,
) -> Vec<EntityId> {
    let leaves: Vec<EntityId> = get_all_subclasses(graph, e, diagnostics)
        .into_iter()
        .filter(|sub| graph.entity(*sub).is_leaf())
        .collect();
    graph.entity_mut(e).cache.leaf_subclasses = Some(leaves.clone());
    leaves
}

/// Leaf subclasses as of the last `leaf_subclasses` call
pub fn cached_leaf_subclasses(graph: &EntityGraph, e: EntityId) -> Option<&[EntityId]> {
    graph.entity(e).cache.leaf_subclasses.as_deref()
}

/// First identity attribute visible at `e`
pub fn get_principal_primary_key(
    graph: &EntityGraph,
    e: EntityId,
    diagnostics: &mut Diagnostics,
) -> Option<AttributeId> {
    let key = all_defined_attributes(graph, e, diagnostics)
        .into_iter()
        .find(|a| graph.attribute(*a).flags.identity);
    if key.is_none() {
        diagnostics.push(Diagnostic::NoKeyAttribute {
            entity: graph.name(e).to_string(),
        });
    }
    key
}

/// Primary key if there is one, otherwise the first unique attribute
pub fn get_principal_unique_key(
    graph: &EntityGraph,
    e: EntityId,
    diagnostics: &mut Diagnostics,
) -> Option<AttributeId> {
    let attributes = all_defined_attributes(graph, e, diagnostics);
    let key = attributes
        .iter()
        .find(|a| graph.attribute(**a).flags.identity)
        .or_else(|| attributes.iter().find(|a| graph.attribute(**a).flags.unique))
        .copied();
    if key.is_none() {
        diagnostics.push(Diagnostic::NoKeyAttribute {
            entity: graph.name(e).to_string(),
        });
    }
    key
}

/// Order `entities` so that parents come before their children (Kahn's algorithm)
///
/// Only generalization edges inside the given set count. Entities caught in a
/// generalization cycle are appended in input order after a `CycleDetected`.
pub fn superclass_first_order(
    graph: &EntityGraph,
    entities: &[EntityId],
    diagnostics: &mut Diagnostics,
) -> Vec<EntityId> {
    let members: HashSet<EntityId> = entities.iter().copied().collect();
    let mut pending: HashMap<EntityId, usize> = HashMap::new();

    // Count in-set parents of each entity
    for &entity in entities {
        let parents: HashSet<EntityId> = graph
            .all_parents(entity)
            .into_iter()
            .filter(|p| *p != entity && members.contains(p))
            .collect();
        pending.insert(entity, parents.len());
    }

    // Start with roots, in input order
    let mut queue: VecDeque<EntityId> = entities
        .iter()
        .copied()
        .filter(|e| pending[e] == 0)
        .collect();
    let mut result = Vec::new();
    let mut placed = HashSet::new();

    while let Some(entity) = queue.pop_front() {
        if !placed.insert(entity) {
            continue;
        }
        result.push(entity);

        let children: HashSet<EntityId> = graph.entity(entity).children.iter().copied().collect();
        for &child in entities.iter().filter(|c| children.contains(c)) {
            if child == entity {
                continue;
            }
            if let Some(count) = pending.get_mut(&child) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    queue.push_back(child);
                }
            }
        }
    }

    // Anything left sits on a cycle
    for &entity in entities {
        if placed.insert(entity) {
            let parent = graph.entity(entity).superclass.unwrap_or(entity);
            diagnostics.push(Diagnostic::CycleDetected {
                entity: graph.name(entity).to_string(),
                revisited: graph.name(parent).to_string(),
            });
            result.push(entity);
        }
    }

    result
}
