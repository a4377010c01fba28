//! Recoverable anomalies reported by the engine
//!
//! None of these abort a whole-model run. Operations that can report take a
//! `&mut Diagnostics` and keep going; callers inspect the log afterwards.

use std::collections::HashSet;

use serde::Serialize;

/// A single anomaly found while resolving or matching a model
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Diagnostic {
    /// Duplicate feature name across subclass/ancestor, or a redeclared operation
    StructuralWarning {
        entity: String,
        feature: String,
        reason: String,
    },
    /// Traversal reached `revisited` again while walking from `entity`
    CycleDetected { entity: String, revisited: String },
    /// Keyed lookup on an entity without primary or unique key
    NoKeyAttribute { entity: String },
    /// A type or entity could not be resolved in the supplied entity set
    UnresolvedReference { entity: String, reference: String },
}

impl Diagnostic {
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::StructuralWarning { .. } => "StructuralWarning",
            Diagnostic::CycleDetected { .. } => "CycleDetected",
            Diagnostic::NoKeyAttribute { .. } => "NoKeyAttribute",
            Diagnostic::UnresolvedReference { .. } => "UnresolvedReference",
        }
    }

    /// Entity the diagnostic is about
    pub fn entity(&self) -> &str {
        match self {
            Diagnostic::StructuralWarning { entity, .. }
            | Diagnostic::CycleDetected { entity, .. }
            | Diagnostic::NoKeyAttribute { entity }
            | Diagnostic::UnresolvedReference { entity, .. } => entity,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::StructuralWarning {
                entity,
                feature,
                reason,
            } => write!(f, "{}.{}: {}", entity, feature, reason),
            Diagnostic::CycleDetected { entity, revisited } => write!(
                f,
                "Generalization cycle: {} leads back to {}; traversal truncated",
                entity, revisited
            ),
            Diagnostic::NoKeyAttribute { entity } => {
                write!(f, "Entity {} has no primary or unique key attribute", entity)
            }
            Diagnostic::UnresolvedReference { entity, reference } => {
                write!(f, "{} references unresolved {}", entity, reference)
            }
        }
    }
}

impl std::error::Error for Diagnostic {}

/// Aggregated diagnostics of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    #[serde(skip)]
    seen: HashSet<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic; identical entries are kept once
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if !self.seen.insert(diagnostic.clone()) {
            return;
        }
        match &diagnostic {
            Diagnostic::UnresolvedReference { .. } => log::debug!("{}", diagnostic),
            _ => log::warn!("{}", diagnostic),
        }
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        for diagnostic in other.entries {
            self.push(diagnostic);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of diagnostics of the given kind
    pub fn count_kind(&self, kind: &str) -> usize {
        self.entries.iter().filter(|d| d.kind() == kind).count()
    }

    /// Cycle diagnostics only
    pub fn cycles(&self) -> Vec<&Diagnostic> {
        self.entries
            .iter()
            .filter(|d| matches!(d, Diagnostic::CycleDetected { .. }))
            .collect()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
