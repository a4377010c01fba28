//! Flattened and target-side entity copies
//!
//! A flattened copy is a self-contained view of an entity: inherited
//! attributes, association ends and composed paths all become plain
//! attributes. Target copies are single-level placeholders used to build a
//! target schema. Both record the original in `copy_of`; edges between
//! originals are relabelled onto copies through an original→copy map.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::model::{
    AssociationId, Attribute, AttributeFlags, Entity, EntityGraph, EntityId, FeaturePath,
    Provenance, Step, TypeDescriptor,
};
use crate::services::features::{PathPolicy, composed_properties, crosses_boundary, path_feature};
use crate::services::inheritance::{
    all_defined_associations, all_defined_attributes, superclass_first_order,
};

/// Original → copy
pub type CopyMap = BTreeMap<EntityId, EntityId>;

fn blank_copy(original: &Entity, of: EntityId) -> Entity {
    let mut copy = Entity::new(original.name.clone());
    copy.role = original.role;
    copy.provenance = original.provenance;
    copy.capabilities = original.capabilities;
    copy.tags = original.tags.clone();
    copy.cardinality = original.cardinality;
    copy.copy_of = Some(of);
    copy
}

/// Build a flattened view of `e` and return its id
///
/// Attributes are added in this order, first name wins:
/// 1. clones of all defined attributes (owner stays the declaring entity)
/// 2. one view per all-defined association that stays on this side of the
///    provenance boundary
/// 3. one attribute per composed path of length 2..=n
pub fn make_flattened_copy(
    graph: &mut EntityGraph,
    e: EntityId,
    use_all_paths: bool,
    n: usize,
    diagnostics: &mut Diagnostics,
) -> EntityId {
    let mut pending: Vec<Attribute> = Vec::new();

    for id in all_defined_attributes(graph, e, diagnostics) {
        pending.push(graph.attribute(id).clone());
    }

    for role in all_defined_associations(graph, e, diagnostics) {
        if crosses_boundary(graph, e, role) {
            continue;
        }
        pending.push(role_view(graph, role));
    }

    let policy = PathPolicy::from_all_paths(use_all_paths);
    for path in composed_properties(graph, e, &HashSet::new(), n, policy, diagnostics) {
        if path.len() < 2 {
            continue;
        }
        let feature = path_feature(graph, e, path);
        pending.push(Attribute {
            name: feature.name,
            ty: feature.ty,
            flags: feature.flags,
            owner: e,
            path: Some(feature.path),
        });
    }

    let entity = blank_copy(graph.entity(e), e);
    let copy = graph.insert_entity(entity);
    let mut taken = HashSet::new();
    for attribute in pending {
        if taken.insert(attribute.name.clone()) {
            graph.attach_attribute(copy, attribute);
        }
    }

    log::debug!(
        "Flattened {} ({} policy, depth {}): {} attributes",
        graph.name(e),
        policy.label(),
        n,
        graph.entity(copy).attributes.len()
    );
    copy
}

fn role_view(graph: &EntityGraph, role: AssociationId) -> Attribute {
    let association = graph.association(role);
    Attribute {
        name: association.role2.clone(),
        ty: association.far_type(),
        flags: AttributeFlags {
            multiple: association.is_many(),
            frozen: association.flags.frozen,
            ..AttributeFlags::default()
        },
        owner: association.entity1,
        path: Some(FeaturePath::single(Step::Role(role))),
    }
}

/// Single-level placeholder of `e` for a target schema
///
/// Only direct attributes are copied. A `Source` entity becomes `Shared`.
pub fn target_copy(graph: &mut EntityGraph, e: EntityId) -> EntityId {
    let mut entity = blank_copy(graph.entity(e), e);
    if entity.provenance == Provenance::Source {
        entity.provenance = Provenance::Shared;
    }
    let attributes: Vec<Attribute> = graph
        .entity(e)
        .attributes
        .iter()
        .map(|a| graph.attribute(*a).clone())
        .collect();

    let copy = graph.insert_entity(entity);
    for attribute in attributes {
        graph.attach_attribute(copy, attribute);
    }
    copy
}

/// Relabel generalization edges of the originals onto their copies
pub fn copy_inheritances(
    graph: &mut EntityGraph,
    copies: &CopyMap,
    diagnostics: &mut Diagnostics,
) {
    let originals: Vec<EntityId> = copies.keys().copied().collect();

    for original in superclass_first_order(graph, &originals, diagnostics) {
        let copy = copies[&original];
        let superclass = graph.entity(original).superclass;
        let parents = graph.entity(original).parents.clone();

        if let Some(parent) = superclass {
            match copies.get(&parent) {
                Some(parent_copy) => graph.set_superclass(copy, Some(*parent_copy)),
                None => diagnostics.push(Diagnostic::UnresolvedReference {
                    entity: graph.name(original).to_string(),
                    reference: format!("copy of superclass {}", graph.name(parent)),
                }),
            }
        }

        for parent in parents {
            if let Some(parent_copy) = copies.get(&parent) {
                graph.add_parent(copy, *parent_copy);
            }
        }
    }
}

/// Relabel associations of the originals onto their copies
///
/// Inverse links are carried over when both directions were copied, and
/// entity-typed attributes of the copies are retargeted to the copies.
/// Returns the number of associations copied.
pub fn copy_to_target(
    graph: &mut EntityGraph,
    copies: &CopyMap,
    diagnostics: &mut Diagnostics,
) -> usize {
    let originals: Vec<EntityId> = copies.keys().copied().collect();
    let mut copied: HashMap<AssociationId, AssociationId> = HashMap::new();

    for original in superclass_first_order(graph, &originals, diagnostics) {
        let copy = copies[&original];

        for role in graph.entity(original).associations.clone() {
            let source = graph.association(role).clone();
            let Some(far_copy) = copies.get(&source.entity2).copied() else {
                diagnostics.push(Diagnostic::UnresolvedReference {
                    entity: graph.name(original).to_string(),
                    reference: format!(
                        "association {} to {} (no copy)",
                        source.role2,
                        graph.name(source.entity2)
                    ),
                });
                continue;
            };

            let mut association = source;
            association.entity1 = copy;
            association.entity2 = far_copy;
            association.inverse = None;
            let id = graph.add_association(association);
            copied.insert(role, id);
        }
    }

    // Inverses
    let mut pairs: Vec<(AssociationId, AssociationId)> =
        copied.iter().map(|(o, c)| (*o, *c)).collect();
    pairs.sort();
    for (original, copy) in &pairs {
        if let Some(inverse) = graph.association(*original).inverse {
            if let Some(inverse_copy) = copied.get(&inverse) {
                graph.link_inverse(*copy, *inverse_copy);
            }
        }
    }

    // Entity-typed attributes
    let retarget = |id: EntityId| copies.get(&id).copied().unwrap_or(id);
    for copy in copies.values() {
        for attribute in graph.entity(*copy).attributes.clone() {
            let ty: TypeDescriptor = graph.attribute(attribute).ty.map_entities(&retarget);
            graph.attribute_mut(attribute).ty = ty;
        }
    }

    pairs.len()
}

/// Flatten every entity in `entities`, parents first, and relabel inheritance
pub fn flatten_model(
    graph: &mut EntityGraph,
    entities: &[EntityId],
    use_all_paths: bool,
    n: usize,
    diagnostics: &mut Diagnostics,
) -> CopyMap {
    let mut copies = CopyMap::new();
    for e in superclass_first_order(graph, entities, diagnostics) {
        let copy = make_flattened_copy(graph, e, use_all_paths, n, diagnostics);
        copies.insert(e, copy);
    }
    copy_inheritances(graph, &copies, diagnostics);
    log::info!("Flattened {} entities", copies.len());
    copies
}

/// Target placeholders for `entities` with generalization and associations relabelled
pub fn target_schema(
    graph: &mut EntityGraph,
    entities: &[EntityId],
    diagnostics: &mut Diagnostics,
) -> CopyMap {
    let mut copies = CopyMap::new();
    for e in superclass_first_order(graph, entities, diagnostics) {
        copies.insert(e, target_copy(graph, e));
    }
    copy_inheritances(graph, &copies, diagnostics);
    let associations = copy_to_target(graph, &copies, diagnostics);
    log::info!(
        "Target schema: {} entities, {} associations",
        copies.len(),
        associations
    );
    copies
}
