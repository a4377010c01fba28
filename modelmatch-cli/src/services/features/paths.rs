//! Path step primitives and the bounded path enumerator

use std::collections::HashSet;

use super::PathPolicy;
use crate::diagnostics::Diagnostics;
use crate::model::{
    AssociationId, AttributeFlags, AttributeId, EntityGraph, EntityId, Feature, FeaturePath, Step,
    TypeDescriptor,
};
use crate::services::inheritance::{all_defined_associations, all_defined_attributes};

/// Engine view of a declared (or materialised) attribute
pub fn attribute_feature(graph: &EntityGraph, id: AttributeId) -> Feature {
    let attribute = graph.attribute(id);
    Feature {
        name: attribute.name.clone(),
        ty: attribute.ty.clone(),
        owner: attribute.owner,
        flags: attribute.flags,
        path: attribute
            .path
            .clone()
            .unwrap_or_else(|| FeaturePath::single(Step::Attribute(id))),
    }
}

/// Association end read as an attribute of its owning entity
pub fn role_feature(graph: &EntityGraph, id: AssociationId) -> Feature {
    let association = graph.association(id);
    Feature {
        name: association.role2.clone(),
        ty: association.far_type(),
        owner: association.entity1,
        flags: AttributeFlags {
            multiple: association.is_many(),
            frozen: association.flags.frozen,
            ..AttributeFlags::default()
        },
        path: FeaturePath::single(Step::Role(id)),
    }
}

/// Feature for a path rooted at `root`
///
/// The type is that of the last step, lifted to `Set` when an earlier role is
/// multi-valued.
pub fn path_feature(graph: &EntityGraph, root: EntityId, path: FeaturePath) -> Feature {
    let (ty, mut flags) = match path.last() {
        Some(Step::Attribute(id)) => {
            let attribute = graph.attribute(id);
            (attribute.ty.clone(), attribute.flags)
        }
        Some(Step::Role(id)) => {
            let feature = role_feature(graph, id);
            (feature.ty, feature.flags)
        }
        None => (TypeDescriptor::primitive("void"), AttributeFlags::default()),
    };

    let steps = path.steps();
    let lifted = steps
        .iter()
        .take(steps.len().saturating_sub(1))
        .any(|step| matches!(step, Step::Role(r) if graph.association(*r).is_many()));

    let ty = if lifted {
        flags.multiple = true;
        TypeDescriptor::set_of(ty.element_type().clone())
    } else {
        ty
    };

    Feature {
        name: graph.path_name(&path),
        ty,
        owner: root,
        flags,
        path,
    }
}

/// True when `second` walks straight back along `first`
///
/// Either one is linked as the other's inverse, or both join the same two
/// entities in opposite directions and the near-end role name of one is the
/// far-end role name of the other.
pub fn is_forbidden_inverse(
    graph: &EntityGraph,
    first: AssociationId,
    second: AssociationId,
) -> bool {
    let a = graph.association(first);
    let b = graph.association(second);

    if a.inverse == Some(second) || b.inverse == Some(first) {
        return true;
    }

    let opposite = a.entity1 == b.entity2 && a.entity2 == b.entity1;
    opposite
        && (a.role1.as_deref() == Some(b.role2.as_str())
            || b.role1.as_deref() == Some(a.role2.as_str()))
}

/// True when following `association` from `from` leaves the source model for
/// the target model or the other way round
pub fn crosses_boundary(graph: &EntityGraph, from: EntityId, association: AssociationId) -> bool {
    let far = graph.association(association).entity2;
    graph
        .entity(from)
        .provenance
        .crosses(graph.entity(far).provenance)
}

/// Every path of length 1..=n rooted at `e`
///
/// `seen` holds entities that may not be entered under [`PathPolicy::Strict`];
/// `e` itself is always added to it. A role into a seen entity is still
/// listed, only the walk stops there.
pub fn composed_properties(
    graph: &EntityGraph,
    e: EntityId,
    seen: &HashSet<EntityId>,
    n: usize,
    policy: PathPolicy,
    diagnostics: &mut Diagnostics,
) -> Vec<FeaturePath> {
    let mut seen = seen.clone();
    seen.insert(e);

    let mut paths = Vec::new();
    let root = FeaturePath::new(Vec::new());
    walk(graph, e, &root, &seen, n, policy, diagnostics, &mut paths);
    paths
}

#[allow(clippy::too_many_arguments)]
fn walk(
    graph: &EntityGraph,
    e: EntityId,
    prefix: &FeaturePath,
    seen: &HashSet<EntityId>,
    n: usize,
    policy: PathPolicy,
    diagnostics: &mut Diagnostics,
    paths: &mut Vec<FeaturePath>,
) {
    if n == 0 {
        return;
    }

    for attribute in all_defined_attributes(graph, e, diagnostics) {
        paths.push(prefix.with(Step::Attribute(attribute)));
    }

    for role in all_defined_associations(graph, e, diagnostics) {
        if crosses_boundary(graph, e, role) {
            continue;
        }
        let far = graph.association(role).entity2;

        if policy == PathPolicy::AllPaths {
            if let Some(Step::Role(previous)) = prefix.last() {
                if is_forbidden_inverse(graph, previous, role) {
                    continue;
                }
            }
        }

        let path = prefix.with(Step::Role(role));
        paths.push(path.clone());

        // the role itself is always listed; strict only refuses to enter a seen entity
        let enter = match policy {
            PathPolicy::Strict => !seen.contains(&far),
            PathPolicy::AllPaths => true,
        };
        if n > 1 && enter {
            let mut next_seen = seen.clone();
            next_seen.insert(far);
            walk(graph, far, &path, &next_seen, n - 1, policy, diagnostics, paths);
        }
    }
}
