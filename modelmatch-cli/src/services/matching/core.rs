//! Core matching functions: type comparison through a mapping and the
//! attribute-matching passes

use std::collections::HashSet;

use super::models::{AttributeMatch, Mapping, MatchType};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::model::{EntityGraph, EntityId, Feature, FeaturePath, TypeDescriptor};
use crate::services::inheritance::is_ancestor;
use crate::services::naming::{Thesaurus, name_similarity};

/// Result of comparing a source type with a target type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMatch {
    Exact,
    Partial,
    None,
}

/// Read-only scoring context for one source/target pair
pub struct Scorer<'a> {
    pub graph: &'a EntityGraph,
    pub entities: &'a HashSet<EntityId>,
    pub mapping: &'a Mapping,
    pub thesaurus: &'a dyn Thesaurus,
}

impl Scorer<'_> {
    /// Compare two types, translating source entity references through the mapping
    pub fn type_match(
        &self,
        source: &TypeDescriptor,
        target: &TypeDescriptor,
        diagnostics: &mut Diagnostics,
    ) -> TypeMatch {
        match (source, target) {
            (TypeDescriptor::Primitive(a), TypeDescriptor::Primitive(b)) => {
                if a == b {
                    TypeMatch::Exact
                } else {
                    TypeMatch::None
                }
            }
            (TypeDescriptor::Entity(x), TypeDescriptor::Entity(y)) => {
                if !self.resolved(*x, diagnostics) || !self.resolved(*y, diagnostics) {
                    return TypeMatch::None;
                }
                let image = self.mapping.target_of(*x).unwrap_or(*x);
                if x == y || image == *y {
                    TypeMatch::Exact
                } else if is_ancestor(self.graph, image, *y) || is_ancestor(self.graph, *y, image) {
                    TypeMatch::Partial
                } else {
                    TypeMatch::None
                }
            }
            (
                TypeDescriptor::Collection {
                    kind: source_kind,
                    element: source_element,
                },
                TypeDescriptor::Collection {
                    kind: target_kind,
                    element: target_element,
                },
            ) => match self.type_match(source_element, target_element, diagnostics) {
                TypeMatch::None => TypeMatch::None,
                inner if source_kind == target_kind => inner,
                _ => TypeMatch::Partial,
            },
            _ => TypeMatch::None,
        }
    }

    fn resolved(&self, entity: EntityId, diagnostics: &mut Diagnostics) -> bool {
        if self.entities.contains(&entity) {
            return true;
        }
        diagnostics.push(Diagnostic::UnresolvedReference {
            entity: self.graph.name(entity).to_string(),
            reference: "type outside the matched entity set".to_string(),
        });
        false
    }

    pub fn name_similarity(&self, first: &str, second: &str) -> f64 {
        name_similarity(first, second, self.thesaurus)
    }

    /// Name similarity weighted by how well the types agree
    pub fn feature_similarity(
        &self,
        source: &Feature,
        target: &Feature,
        diagnostics: &mut Diagnostics,
    ) -> f64 {
        match self.type_match(&source.ty, &target.ty, diagnostics) {
            TypeMatch::Exact => self.name_similarity(&source.name, &target.name),
            TypeMatch::Partial => self.name_similarity(&source.name, &target.name) / 2.0,
            TypeMatch::None => 0.0,
        }
    }

    /// Pass: same name and exactly matching type, score 1
    pub fn exact_name_pass(
        &self,
        state: &mut PassState,
        sources: &[Feature],
        targets: &[Feature],
        diagnostics: &mut Diagnostics,
    ) {
        for source in sources {
            if !state.source_free(source) {
                continue;
            }
            let found = targets.iter().find(|target| {
                state.target_free(target)
                    && source.name.eq_ignore_ascii_case(&target.name)
                    && self.type_match(&source.ty, &target.ty, diagnostics) == TypeMatch::Exact
            });
            if let Some(target) = found {
                state.consume(source, target, MatchType::ExactNameType, 1.0);
            }
        }
    }

    /// Pass: types related as `wanted`, best name similarity wins (first seen on ties)
    ///
    /// Exact type matches score the name similarity, partial ones half of it.
    pub fn best_type_pass(
        &self,
        state: &mut PassState,
        sources: &[Feature],
        targets: &[Feature],
        wanted: TypeMatch,
        match_type: MatchType,
        diagnostics: &mut Diagnostics,
    ) {
        let factor = if wanted == TypeMatch::Partial { 0.5 } else { 1.0 };

        for source in sources {
            if !state.source_free(source) {
                continue;
            }

            let mut best: Option<(&Feature, f64)> = None;
            for target in targets {
                if !state.target_free(target)
                    || self.type_match(&source.ty, &target.ty, diagnostics) != wanted
                {
                    continue;
                }
                let score = self.name_similarity(&source.name, &target.name) * factor;
                if best.is_none_or(|(_, current)| score > current) {
                    best = Some((target, score));
                }
            }

            if let Some((target, score)) = best {
                state.consume(source, target, match_type, score);
            }
        }
    }
}

/// Features consumed so far while matching one pair
#[derive(Debug, Default)]
pub struct PassState {
    consumed_source: HashSet<FeaturePath>,
    consumed_target: HashSet<FeaturePath>,
    pub matches: Vec<AttributeMatch>,
}

impl PassState {
    pub fn source_free(&self, feature: &Feature) -> bool {
        !self.consumed_source.contains(&feature.path)
    }

    pub fn target_free(&self, feature: &Feature) -> bool {
        !self.consumed_target.contains(&feature.path)
    }

    pub fn consume(
        &mut self,
        source: &Feature,
        target: &Feature,
        match_type: MatchType,
        score: f64,
    ) {
        log::debug!(
            "  {} {} -> {} ({:.3})",
            match_type.label(),
            source.name,
            target.name,
            score
        );
        self.consumed_source.insert(source.path.clone());
        self.consumed_target.insert(target.path.clone());
        self.matches.push(AttributeMatch {
            source: source.clone(),
            target: target.clone(),
            match_type,
            score,
        });
    }

    pub fn score(&self) -> f64 {
        self.matches.iter().map(|m| m.score).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Multiplicity;
    use crate::services::features::local_features_of;
    use crate::services::matching::EntityMatch;
    use crate::services::naming::NoThesaurus;

    struct Fixture {
        graph: EntityGraph,
        entities: HashSet<EntityId>,
        party: EntityId,
        person: EntityId,
        client: EntityId,
        stranger: EntityId,
    }

    fn fixture() -> Fixture {
        let mut graph = EntityGraph::new();
        let party = graph.add_entity("Party");
        let person = graph.add_entity("Person");
        let client = graph.add_entity("Client");
        let stranger = graph.add_entity("Stranger");
        graph.set_superclass(person, Some(party));
        let entities = [party, person, client].into_iter().collect();
        Fixture {
            graph,
            entities,
            party,
            person,
            client,
            stranger,
        }
    }

    fn scorer<'a>(fixture: &'a Fixture, mapping: &'a Mapping) -> Scorer<'a> {
        Scorer {
            graph: &fixture.graph,
            entities: &fixture.entities,
            mapping,
            thesaurus: &NoThesaurus,
        }
    }

    #[test]
    fn test_primitive_and_collection_types() {
        let fixture = fixture();
        let mapping = Mapping::new();
        let scorer = scorer(&fixture, &mapping);
        let mut diagnostics = Diagnostics::new();
        let int = TypeDescriptor::primitive("int");

        assert_eq!(scorer.type_match(&int, &int, &mut diagnostics), TypeMatch::Exact);
        assert_eq!(
            scorer.type_match(&int, &TypeDescriptor::primitive("String"), &mut diagnostics),
            TypeMatch::None
        );
        assert_eq!(
            scorer.type_match(
                &TypeDescriptor::set_of(int.clone()),
                &TypeDescriptor::sequence_of(int.clone()),
                &mut diagnostics
            ),
            TypeMatch::Partial
        );
        assert_eq!(
            scorer.type_match(&TypeDescriptor::set_of(int.clone()), &int, &mut diagnostics),
            TypeMatch::None
        );
    }

    #[test]
    fn test_entity_types_through_mapping() {
        let fixture = fixture();
        let mut mapping = Mapping::new();
        mapping.record(EntityMatch::new(fixture.person, fixture.client, 1.0));
        let scorer = scorer(&fixture, &mapping);
        let mut diagnostics = Diagnostics::new();
        let entity = TypeDescriptor::Entity;

        assert_eq!(
            scorer.type_match(&entity(fixture.person), &entity(fixture.client), &mut diagnostics),
            TypeMatch::Exact
        );
        // related by generalization
        assert_eq!(
            scorer.type_match(&entity(fixture.party), &entity(fixture.person), &mut diagnostics),
            TypeMatch::Partial
        );
        assert_eq!(
            scorer.type_match(&entity(fixture.client), &entity(fixture.party), &mut diagnostics),
            TypeMatch::None
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unresolved_reference_is_no_match() {
        let fixture = fixture();
        let mapping = Mapping::new();
        let scorer = scorer(&fixture, &mapping);
        let mut diagnostics = Diagnostics::new();

        let result = scorer.type_match(
            &TypeDescriptor::Entity(fixture.stranger),
            &TypeDescriptor::Entity(fixture.stranger),
            &mut diagnostics,
        );
        assert_eq!(result, TypeMatch::None);
        assert_eq!(diagnostics.count_kind("UnresolvedReference"), 1);
    }

    #[test]
    fn test_passes_consume_features_once() {
        let mut fixture = fixture();
        let (person, client) = (fixture.person, fixture.client);
        let graph = &mut fixture.graph;
        graph.add_attribute(person, "name", TypeDescriptor::primitive("String"));
        graph.add_attribute(person, "nickname", TypeDescriptor::primitive("String"));
        graph.add_attribute(client, "clientName", TypeDescriptor::primitive("String"));
        graph.associate(person, "friends", person, Multiplicity::Many);

        let sources = local_features_of(&fixture.graph, person);
        let targets = local_features_of(&fixture.graph, client);
        let mapping = Mapping::new();
        let scorer = scorer(&fixture, &mapping);
        let mut diagnostics = Diagnostics::new();
        let mut state = PassState::default();

        scorer.exact_name_pass(&mut state, &sources, &targets, &mut diagnostics);
        assert!(state.matches.is_empty());

        scorer.best_type_pass(
            &mut state,
            &sources,
            &targets,
            TypeMatch::Exact,
            MatchType::ExactType,
            &mut diagnostics,
        );
        assert_eq!(state.matches.len(), 1);
        assert_eq!(state.matches[0].source.name, "name");
        assert_eq!(state.matches[0].target.name, "clientName");
        assert_eq!(state.score(), 1.0);
    }
}
