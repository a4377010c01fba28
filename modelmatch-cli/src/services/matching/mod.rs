// Matching service for aligning the entities of two models
//
// Pairs are scored by a greedy, pass-ordered cascade over the feature pools
// of the source and target entity. Scoring only reads the mapping; recording
// a result is a separate step so that pairs can be scored independently.

pub mod core;
pub mod export;
pub mod fuzzy;
pub mod models;

// Re-export commonly used types
pub use self::core::{PassState, Scorer, TypeMatch};
pub use models::{AttributeMatch, EntityMatch, Mapping, MatchType};

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::model::{EntityGraph, EntityId, Feature};
use crate::services::features::{
    get_nonlocal_target_features, local_features_of, nonlocal_features_of,
};
use crate::services::inheritance::{
    descendants, is_descendant, superclass_first_order, upper_cotopy,
};
use crate::services::naming::Thesaurus;
use fuzzy::{soft_and_all, soft_or_all};

/// Weights of the composite entity similarity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompositeWeights {
    pub name: f64,
    pub esim: f64,
    pub cotopy: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            name: 1.0 / 3.0,
            esim: 1.0 / 3.0,
            cotopy: 1.0 / 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    /// Propagate superclass correspondences and reject pairs that break the hierarchy
    pub strict: bool,
    pub weights: CompositeWeights,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            strict: true,
            weights: CompositeWeights::default(),
        }
    }
}

/// Scores source/target entity pairs of one graph
pub struct SimilarityEngine<'a> {
    graph: &'a EntityGraph,
    thesaurus: &'a dyn Thesaurus,
    /// Entities type references may resolve to
    entities: HashSet<EntityId>,
    options: MatchOptions,
}

impl<'a> SimilarityEngine<'a> {
    pub fn new(
        graph: &'a EntityGraph,
        thesaurus: &'a dyn Thesaurus,
        entities: impl IntoIterator<Item = EntityId>,
    ) -> Self {
        Self {
            graph,
            thesaurus,
            entities: entities.into_iter().collect(),
            options: MatchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    fn scorer<'s>(&'s self, mapping: &'s Mapping) -> Scorer<'s> {
        Scorer {
            graph: self.graph,
            entities: &self.entities,
            mapping,
            thesaurus: self.thesaurus,
        }
    }

    /// Score `src` against `trg` without touching the mapping
    ///
    /// Returns `None` when strict mode rejects the pair outright.
    pub fn pair_similarity(
        &self,
        src: EntityId,
        trg: EntityId,
        mapping: &Mapping,
        diagnostics: &mut Diagnostics,
    ) -> Option<EntityMatch> {
        let graph = self.graph;
        let scorer = self.scorer(mapping);
        let mut state = PassState::default();

        log::debug!("Scoring {} -> {}", graph.name(src), graph.name(trg));

        // 1. Generalization propagation
        if self.options.strict {
            if let Some(inherited) = graph
                .entity(src)
                .superclass
                .and_then(|parent| mapping.get(parent))
            {
                for m in &inherited.attribute_matches {
                    state.consume(&m.source, &m.target, MatchType::Inherited, 1.0);
                }
            }

            if mapping.get(src).is_none() {
                let breaks_hierarchy = descendants(graph, src)
                    .into_iter()
                    .filter_map(|sub| mapping.target_of(sub))
                    .any(|image| image != trg && !is_descendant(graph, image, trg));
                if breaks_hierarchy {
                    log::debug!(
                        "{} is not a common ancestor of the images of {}'s subclasses",
                        graph.name(trg),
                        graph.name(src)
                    );
                    return None;
                }
            }
        }

        let src_local = local_features_of(graph, src);
        let src_composed = nonlocal_features_of(graph, src, diagnostics);
        let trg_local = local_features_of(graph, trg);
        let trg_composed = nonlocal_features_of(graph, trg, diagnostics);
        let trg_nonlocal = get_nonlocal_target_features(graph, trg, mapping, diagnostics);

        // 2..5 per round
        let rounds: [(&[Feature], &[Feature], Option<&[Feature]>); 3] = [
            (src_local.as_slice(), trg_local.as_slice(), Some(trg_composed.as_slice())),
            (src_composed.as_slice(), trg_local.as_slice(), Some(trg_composed.as_slice())),
            (src_local.as_slice(), trg_nonlocal.as_slice(), None),
        ];

        for (sources, targets, composed) in rounds {
            scorer.exact_name_pass(&mut state, sources, targets, diagnostics);
            scorer.best_type_pass(
                &mut state,
                sources,
                targets,
                TypeMatch::Exact,
                MatchType::ExactType,
                diagnostics,
            );
            if let Some(composed) = composed {
                scorer.best_type_pass(
                    &mut state,
                    sources,
                    composed,
                    TypeMatch::Exact,
                    MatchType::ComposedType,
                    diagnostics,
                );
            }
            scorer.best_type_pass(
                &mut state,
                sources,
                targets,
                TypeMatch::Partial,
                MatchType::PartialType,
                diagnostics,
            );
        }

        let score = state.score();
        log::debug!(
            "{} -> {}: {} attribute matches, score {:.3}",
            graph.name(src),
            graph.name(trg),
            state.matches.len(),
            score
        );

        Some(EntityMatch {
            source: src,
            target: trg,
            score,
            attribute_matches: state.matches,
        })
    }

    /// Score the pair and record it unless `src` already has an equal or stronger match
    pub fn similarity(
        &self,
        src: EntityId,
        trg: EntityId,
        mapping: &mut Mapping,
        diagnostics: &mut Diagnostics,
    ) -> f64 {
        match self.pair_similarity(src, trg, mapping, diagnostics) {
            Some(entity_match) => {
                let score = entity_match.score;
                mapping.record(entity_match);
                score
            }
            None => 0.0,
        }
    }

    pub fn feature_similarity(
        &self,
        source: &Feature,
        target: &Feature,
        mapping: &Mapping,
        diagnostics: &mut Diagnostics,
    ) -> f64 {
        self.scorer(mapping)
            .feature_similarity(source, target, diagnostics)
    }

    /// How well every source feature is covered by some target feature
    pub fn esim_source(
        &self,
        src: EntityId,
        trg: EntityId,
        mapping: &Mapping,
        diagnostics: &mut Diagnostics,
    ) -> f64 {
        let scorer = self.scorer(mapping);
        let sources = local_features_of(self.graph, src);
        let targets = local_features_of(self.graph, trg);
        soft_and_all(sources.iter().map(|f| {
            soft_or_all(
                targets
                    .iter()
                    .map(|g| scorer.feature_similarity(f, g, diagnostics))
                    .collect::<Vec<_>>(),
            )
        }))
    }

    /// How well every target feature is covered by some source feature
    pub fn esim_target(
        &self,
        src: EntityId,
        trg: EntityId,
        mapping: &Mapping,
        diagnostics: &mut Diagnostics,
    ) -> f64 {
        let scorer = self.scorer(mapping);
        let sources = local_features_of(self.graph, src);
        let targets = local_features_of(self.graph, trg);
        soft_and_all(targets.iter().map(|g| {
            soft_or_all(
                sources
                    .iter()
                    .map(|f| scorer.feature_similarity(f, g, diagnostics))
                    .collect::<Vec<_>>(),
            )
        }))
    }

    /// Jaccard overlap of the mapped upper cotopy of `src` with that of `trg`,
    /// plus the pair score per source feature
    pub fn cotopy_similarity(
        &self,
        src: EntityId,
        trg: EntityId,
        mapping: &Mapping,
        diagnostics: &mut Diagnostics,
    ) -> f64 {
        let image: HashSet<EntityId> = upper_cotopy(self.graph, src, diagnostics)
            .into_iter()
            .filter_map(|e| mapping.target_of(e))
            .collect();
        let target_cotopy = upper_cotopy(self.graph, trg, diagnostics);

        let shared = image.intersection(&target_cotopy).count();
        let union = image.union(&target_cotopy).count();
        let overlap = if union == 0 {
            0.0
        } else {
            shared as f64 / union as f64
        };

        let feature_count = local_features_of(self.graph, src).len();
        let per_feature = if feature_count == 0 {
            0.0
        } else {
            self.pair_similarity(src, trg, mapping, diagnostics)
                .map(|m| m.score)
                .unwrap_or(0.0)
                / feature_count as f64
        };

        overlap + per_feature
    }

    /// Weighted ranking heuristic over name, esim and cotopy similarity
    pub fn composite_similarity(
        &self,
        src: EntityId,
        trg: EntityId,
        mapping: &Mapping,
        diagnostics: &mut Diagnostics,
    ) -> f64 {
        let weights = self.options.weights;
        let name = self
            .scorer(mapping)
            .name_similarity(self.graph.name(src), self.graph.name(trg));
        let esim = self.esim_source(src, trg, mapping, diagnostics);
        let cotopy = self.cotopy_similarity(src, trg, mapping, diagnostics);
        weights.name * name + weights.esim * esim + weights.cotopy * cotopy
    }

    /// Greedily pair every source with its best target, parents first
    ///
    /// Returns the number of sources that received a correspondence.
    pub fn match_models(
        &self,
        sources: &[EntityId],
        targets: &[EntityId],
        mapping: &mut Mapping,
        diagnostics: &mut Diagnostics,
    ) -> usize {
        let mut matched = 0;

        for src in superclass_first_order(self.graph, sources, diagnostics) {
            let mut best: Option<(EntityId, f64)> = None;
            for &trg in targets {
                let score = self.composite_similarity(src, trg, mapping, diagnostics);
                if score > best.map_or(0.0, |(_, s)| s) {
                    best = Some((trg, score));
                }
            }

            let Some((trg, composite)) = best else {
                log::debug!("No candidate for {}", self.graph.name(src));
                continue;
            };

            self.similarity(src, trg, mapping, diagnostics);
            if mapping.target_of(src) == Some(trg) {
                matched += 1;
                log::debug!(
                    "Matched {} -> {} (composite {:.3})",
                    self.graph.name(src),
                    self.graph.name(trg),
                    composite
                );
            }
        }

        log::info!(
            "Matched {} of {} source entities against {} targets",
            matched,
            sources.len(),
            targets.len()
        );
        matched
    }
}

/// Every entity mapped to itself, each local feature matched to itself
pub fn identity_mapping(graph: &EntityGraph, entities: &[EntityId]) -> Mapping {
    let mut mapping = Mapping::new();
    for &e in entities {
        let attribute_matches: Vec<AttributeMatch> = local_features_of(graph, e)
            .into_iter()
            .map(|feature| AttributeMatch {
                source: feature.clone(),
                target: feature,
                match_type: MatchType::ExactNameType,
                score: 1.0,
            })
            .collect();
        mapping.record(EntityMatch {
            source: e,
            target: e,
            score: attribute_matches.len() as f64,
            attribute_matches,
        });
    }
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Multiplicity, TypeDescriptor};
    use crate::services::naming::{NoThesaurus, ThesaurusTable};

    fn string() -> TypeDescriptor {
        TypeDescriptor::primitive("String")
    }

    #[test]
    fn test_exact_name_and_type() {
        let mut graph = EntityGraph::new();
        let src = graph.add_entity("Person");
        let trg = graph.add_entity("Person");
        graph.add_attribute(src, "name", string());
        graph.add_attribute(src, "age", TypeDescriptor::primitive("int"));
        graph.add_attribute(trg, "age", TypeDescriptor::primitive("int"));
        graph.add_attribute(trg, "name", string());

        let engine = SimilarityEngine::new(&graph, &NoThesaurus, [src, trg]);
        let mut mapping = Mapping::new();
        let mut diagnostics = Diagnostics::new();

        assert_eq!(engine.similarity(src, trg, &mut mapping, &mut diagnostics), 2.0);
        let recorded = mapping.get(src).unwrap();
        assert_eq!(recorded.target, trg);
        assert!(
            recorded
                .attribute_matches
                .iter()
                .all(|m| m.match_type == MatchType::ExactNameType && m.source.name == m.target.name)
        );
    }

    #[test]
    fn test_composed_target_pass() {
        let mut graph = EntityGraph::new();
        let src = graph.add_entity("Order");
        graph.add_attribute(src, "customerName", string());

        let trg = graph.add_entity("Order");
        let customer = graph.add_entity("Customer");
        graph.add_attribute(customer, "name", string());
        graph.associate(trg, "customer", customer, Multiplicity::One);

        let engine = SimilarityEngine::new(&graph, &NoThesaurus, [src, trg, customer]);
        let mut diagnostics = Diagnostics::new();
        let result = engine
            .pair_similarity(src, trg, &Mapping::new(), &mut diagnostics)
            .unwrap();

        assert_eq!(result.attribute_matches.len(), 1);
        let m = &result.attribute_matches[0];
        assert_eq!(m.match_type, MatchType::ComposedType);
        assert_eq!(m.target.name, "customer.name");
        assert_eq!(m.score, 1.0);
    }

    #[test]
    fn test_subtype_reference_is_partial_match() {
        let mut graph = EntityGraph::new();
        let person = graph.add_entity("Person");
        let student = graph.add_entity("Student");
        graph.set_superclass(student, Some(person));

        let src = graph.add_entity("Enrollment");
        graph.add_attribute(src, "owner", TypeDescriptor::Entity(student));
        let trg = graph.add_entity("Enrollment");
        graph.add_attribute(trg, "ownerRef", TypeDescriptor::Entity(person));

        let engine = SimilarityEngine::new(&graph, &NoThesaurus, [person, student, src, trg]);
        let mapping = Mapping::new();
        let mut diagnostics = Diagnostics::new();
        let result = engine
            .pair_similarity(src, trg, &mapping, &mut diagnostics)
            .unwrap();

        assert_eq!(result.attribute_matches.len(), 1);
        let m = &result.attribute_matches[0];
        assert_eq!(m.match_type, MatchType::PartialType);
        assert_eq!((m.source.name.as_str(), m.target.name.as_str()), ("owner", "ownerRef"));
        // name similarity 1, halved
        assert_eq!(m.score, 0.5);
        assert_eq!(result.score, 0.5);
        assert_eq!(
            engine.feature_similarity(&m.source, &m.target, &mapping, &mut diagnostics),
            0.5
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_local_source_against_nonlocal_target() {
        let mut graph = EntityGraph::new();
        let person = graph.add_entity("Person");
        let student = graph.add_entity("Student");
        graph.set_superclass(student, Some(person));

        let src = graph.add_entity("Order");
        graph.add_attribute(src, "buyer", TypeDescriptor::Entity(student));

        // Order -customer-> Customer{buyer: Person}
        let trg = graph.add_entity("Order");
        let customer = graph.add_entity("Customer");
        graph.add_attribute(customer, "buyer", TypeDescriptor::Entity(person));
        graph.associate(trg, "customer", customer, Multiplicity::One);
        let client = graph.add_entity("Client");

        let engine = SimilarityEngine::new(
            &graph,
            &NoThesaurus,
            [person, student, src, trg, customer, client],
        );
        let mut diagnostics = Diagnostics::new();

        let open = engine
            .pair_similarity(src, trg, &Mapping::new(), &mut diagnostics)
            .unwrap();
        assert_eq!(open.attribute_matches.len(), 1);
        let m = &open.attribute_matches[0];
        assert_eq!(m.match_type, MatchType::PartialType);
        assert_eq!(m.target.name, "customer.buyer");
        assert_eq!(m.score, 0.5);

        // once Customer is already some source's image the path is off the table
        let mut mapping = Mapping::new();
        mapping.record(EntityMatch::new(client, customer, 1.0));
        let closed = engine
            .pair_similarity(src, trg, &mapping, &mut diagnostics)
            .unwrap();
        assert!(closed.attribute_matches.is_empty());
        assert_eq!(closed.score, 0.0);
    }

    #[test]
    fn test_weaker_result_does_not_overwrite() {
        let mut graph = EntityGraph::new();
        let src = graph.add_entity("Person");
        let good = graph.add_entity("Person");
        let poor = graph.add_entity("Item");
        graph.add_attribute(src, "name", string());
        graph.add_attribute(good, "name", string());
        graph.add_attribute(poor, "label", TypeDescriptor::primitive("int"));

        let engine = SimilarityEngine::new(&graph, &NoThesaurus, [src, good, poor]);
        let mut mapping = Mapping::new();
        let mut diagnostics = Diagnostics::new();

        engine.similarity(src, good, &mut mapping, &mut diagnostics);
        engine.similarity(src, poor, &mut mapping, &mut diagnostics);
        assert_eq!(mapping.target_of(src), Some(good));
    }

    #[test]
    fn test_strict_mode_rejects_non_ancestor() {
        let mut graph = EntityGraph::new();
        let party = graph.add_entity("Party");
        let person = graph.add_entity("Person");
        graph.set_superclass(person, Some(party));
        let client = graph.add_entity("Client");
        let other = graph.add_entity("Other");

        let engine = SimilarityEngine::new(&graph, &NoThesaurus, [party, person, client, other]);
        let mut mapping = Mapping::new();
        mapping.record(EntityMatch::new(person, client, 1.0));
        let mut diagnostics = Diagnostics::new();

        assert!(engine.pair_similarity(party, other, &mapping, &mut diagnostics).is_none());
        assert_eq!(engine.similarity(party, other, &mut mapping, &mut diagnostics), 0.0);
        assert!(mapping.get(party).is_none());
        assert!(engine.pair_similarity(party, client, &mapping, &mut diagnostics).is_some());

        let lenient = SimilarityEngine::new(&graph, &NoThesaurus, [party, person, client, other])
            .with_options(MatchOptions {
                strict: false,
                ..MatchOptions::default()
            });
        assert!(lenient.pair_similarity(party, other, &mapping, &mut diagnostics).is_some());
    }

    #[test]
    fn test_esim_is_directional() {
        let mut graph = EntityGraph::new();
        let src = graph.add_entity("A");
        let trg = graph.add_entity("B");
        graph.add_attribute(src, "name", string());
        graph.add_attribute(trg, "name", string());
        graph.add_attribute(trg, "extra", TypeDescriptor::primitive("int"));

        let engine = SimilarityEngine::new(&graph, &NoThesaurus, [src, trg]);
        let mapping = Mapping::new();
        let mut diagnostics = Diagnostics::new();

        assert_eq!(engine.esim_source(src, trg, &mapping, &mut diagnostics), 1.0);
        assert_eq!(engine.esim_target(src, trg, &mapping, &mut diagnostics), 0.0);
    }

    #[test]
    fn test_identity_mapping_esim() {
        let mut graph = EntityGraph::new();
        let person = graph.add_entity("Person");
        let order = graph.add_entity("Order");
        graph.add_attribute(person, "name", string());
        graph.add_attribute(order, "total", TypeDescriptor::primitive("double"));
        graph.associate(person, "orders", order, Multiplicity::Many);

        let entities = [person, order];
        let mapping = identity_mapping(&graph, &entities);
        let engine = SimilarityEngine::new(&graph, &NoThesaurus, entities);
        let mut diagnostics = Diagnostics::new();

        assert_eq!(mapping.get(person).map(|m| m.score), Some(2.0));
        for e in entities {
            assert_eq!(engine.esim_source(e, e, &mapping, &mut diagnostics), 1.0);
            assert_eq!(engine.esim_target(e, e, &mapping, &mut diagnostics), 1.0);
        }
    }

    #[test]
    fn test_match_models_with_thesaurus() {
        let mut graph = EntityGraph::new();
        let customer = graph.add_entity("Customer");
        graph.add_attribute(customer, "name", string());
        let invoice = graph.add_entity("Invoice");
        graph.add_attribute(invoice, "amount", TypeDescriptor::primitive("double"));

        let bill = graph.add_entity("Bill");
        graph.add_attribute(bill, "amount", TypeDescriptor::primitive("double"));
        let client = graph.add_entity("Client");
        graph.add_attribute(client, "name", string());

        let mut thesaurus = ThesaurusTable::new();
        thesaurus.insert("customer", "client", 0.9);

        let engine = SimilarityEngine::new(&graph, &thesaurus, [customer, invoice, bill, client]);
        let mut mapping = Mapping::new();
        let mut diagnostics = Diagnostics::new();

        let matched = engine.match_models(
            &[customer, invoice],
            &[bill, client],
            &mut mapping,
            &mut diagnostics,
        );
        assert_eq!(matched, 2);
        assert_eq!(mapping.target_of(customer), Some(client));
        assert_eq!(mapping.target_of(invoice), Some(bill));
    }
}
