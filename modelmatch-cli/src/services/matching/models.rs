use std::collections::HashSet;

use serde::Serialize;

use crate::model::{EntityId, Feature};

/// How an attribute correspondence was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MatchType {
    Inherited,     // Copied from the superclass correspondence
    ExactNameType, // Same name, same type
    ExactType,     // Same type, best name similarity
    ComposedType,  // Same type against a composed (2-hop) feature
    PartialType,   // Types related by generalization or collection kind
}

impl MatchType {
    /// Get display label for match type
    pub fn label(&self) -> &'static str {
        match self {
            MatchType::Inherited => "[Inherited]",
            MatchType::ExactNameType => "[Exact]",
            MatchType::ExactType => "[Type]",
            MatchType::ComposedType => "[Composed]",
            MatchType::PartialType => "[Partial]",
        }
    }
}

/// One source feature matched to one target feature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeMatch {
    pub source: Feature,
    pub target: Feature,
    pub match_type: MatchType,
    pub score: f64,
}

/// Correspondence of one source entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityMatch {
    pub source: EntityId,
    pub target: EntityId,
    /// Sum of the attribute match scores
    pub score: f64,
    pub attribute_matches: Vec<AttributeMatch>,
}

impl EntityMatch {
    pub fn new(source: EntityId, target: EntityId, score: f64) -> Self {
        Self {
            source,
            target,
            score,
            attribute_matches: Vec::new(),
        }
    }
}

/// Source entity → target entity correspondences, at most one per source
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Mapping {
    matches: Vec<EntityMatch>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: EntityId) -> Option<&EntityMatch> {
        self.matches.iter().find(|m| m.source == source)
    }

    pub fn target_of(&self, source: EntityId) -> Option<EntityId> {
        self.get(source).map(|m| m.target)
    }

    /// All target entities some source is mapped to
    pub fn image(&self) -> HashSet<EntityId> {
        self.matches.iter().map(|m| m.target).collect()
    }

    pub fn image_contains(&self, target: EntityId) -> bool {
        self.matches.iter().any(|m| m.target == target)
    }

    /// Store `entity_match` unless the source already has an equal or stronger one
    ///
    /// Returns true when the mapping changed.
    pub fn record(&mut self, entity_match: EntityMatch) -> bool {
        match self
            .matches
            .iter_mut()
            .find(|m| m.source == entity_match.source)
        {
            Some(existing) if existing.score >= entity_match.score => false,
            Some(existing) => {
                *existing = entity_match;
                true
            }
            None => {
                self.matches.push(entity_match);
                true
            }
        }
    }

    /// Fold another partial mapping in with the same stronger-wins rule
    pub fn merge(&mut self, other: Mapping) -> usize {
        other
            .matches
            .into_iter()
            .map(|m| self.record(m))
            .filter(|changed| *changed)
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityMatch> {
        self.matches.iter()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}
