//! Local / nonlocal feature partition
//!
//! Local features are an entity's own attributes plus one view per own
//! association. Nonlocal features are exactly two hops: an own association
//! followed by an attribute or association of the far side.
//!
//! `define_*` compute and store the result in the entity's cache; the
//! `cached_*` readers return whatever was stored last, stale or not.

use super::paths::{attribute_feature, is_forbidden_inverse, path_feature, role_feature};
use crate::diagnostics::Diagnostics;
use crate::model::{EntityGraph, EntityId, Feature, FeaturePath, Step};
use crate::services::inheritance::{all_defined_associations, all_defined_attributes};
use crate::services::matching::Mapping;

pub fn local_features_of(graph: &EntityGraph, e: EntityId) -> Vec<Feature> {
    let entity = graph.entity(e);
    entity
        .attributes
        .iter()
        .map(|a| attribute_feature(graph, *a))
        .chain(entity.associations.iter().map(|r| role_feature(graph, *r)))
        .collect()
}

pub fn nonlocal_features_of(
    graph: &EntityGraph,
    e: EntityId,
    diagnostics: &mut Diagnostics,
) -> Vec<Feature> {
    let mut features = Vec::new();

    for &role in &graph.entity(e).associations {
        let far = graph.association(role).entity2;

        for attribute in all_defined_attributes(graph, far, diagnostics) {
            let path = FeaturePath::new(vec![Step::Role(role), Step::Attribute(attribute)]);
            features.push(path_feature(graph, e, path));
        }

        for next in all_defined_associations(graph, far, diagnostics) {
            if next == role || is_forbidden_inverse(graph, role, next) {
                continue;
            }
            let path = FeaturePath::new(vec![Step::Role(role), Step::Role(next)]);
            features.push(path_feature(graph, e, path));
        }
    }

    features
}

pub fn define_local_features(graph: &mut EntityGraph, e: EntityId) -> Vec<Feature> {
    let features = local_features_of(graph, e);
    graph.entity_mut(e).cache.local = Some(features.clone());
    features
}

pub fn define_nonlocal_features(
    graph: &mut EntityGraph,
    e: EntityId,
    diagnostics: &mut Diagnostics,
) -> Vec<Feature> {
    let features = nonlocal_features_of(graph, e, diagnostics);
    graph.entity_mut(e).cache.nonlocal = Some(features.clone());
    features
}

pub fn cached_local_features(graph: &EntityGraph, e: EntityId) -> Option<&[Feature]> {
    graph.entity(e).cache.local.as_deref()
}

pub fn cached_nonlocal_features(graph: &EntityGraph, e: EntityId) -> Option<&[Feature]> {
    graph.entity(e).cache.nonlocal.as_deref()
}

/// Nonlocal features of a target entity still worth matching against
///
/// Keeps paths whose intermediate entity is concrete and not already the image
/// of some source entity in `mapping`.
pub fn get_nonlocal_target_features(
    graph: &EntityGraph,
    e: EntityId,
    mapping: &Mapping,
    diagnostics: &mut Diagnostics,
) -> Vec<Feature> {
    nonlocal_features_of(graph, e, diagnostics)
        .into_iter()
        .filter(|feature| match feature.first_role() {
            Some(role) => {
                let intermediate = graph.association(role).entity2;
                graph.entity(intermediate).is_concrete() && !mapping.image_contains(intermediate)
            }
            None => false,
        })
        .collect()
}
