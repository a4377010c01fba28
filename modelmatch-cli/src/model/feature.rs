//! Feature views and attribute/role paths

use serde::{Deserialize, Serialize};

use super::models::{AssociationId, AttributeFlags, AttributeId, EntityId, TypeDescriptor};

/// One hop of a feature path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Step {
    Attribute(AttributeId),
    Role(AssociationId),
}

/// Ordered sequence of attribute/role steps
///
/// A path of length 1 is a plain attribute or an association end read as an
/// attribute; longer paths are composed (non-local) features. Only the last
/// step may be an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct FeaturePath(Vec<Step>);

impl FeaturePath {
    pub fn new(steps: Vec<Step>) -> Self {
        Self(steps)
    }

    pub fn single(step: Step) -> Self {
        Self(vec![step])
    }

    /// Copy of this path with one more step
    pub fn with(&self, step: Step) -> Self {
        let mut steps = self.0.clone();
        steps.push(step);
        Self(steps)
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<Step> {
        self.0.first().copied()
    }

    pub fn last(&self) -> Option<Step> {
        self.0.last().copied()
    }

    /// Roles traversed by this path, in order
    pub fn roles(&self) -> impl Iterator<Item = AssociationId> + '_ {
        self.0.iter().filter_map(|step| match step {
            Step::Role(id) => Some(*id),
            Step::Attribute(_) => None,
        })
    }
}

/// Engine view of a feature: a declared attribute, an association end, or a path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Step names joined by '.'
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    /// Entity the path is rooted at (for a declared attribute: its declaring entity)
    pub owner: EntityId,
    pub flags: AttributeFlags,
    pub path: FeaturePath,
}

impl Feature {
    /// More than one hop
    pub fn is_composed(&self) -> bool {
        self.path.len() > 1
    }

    /// Number of association hops before the final step
    pub fn hops(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    /// Association traversed first, when the path starts with a role
    pub fn first_role(&self) -> Option<AssociationId> {
        match self.path.first() {
            Some(Step::Role(id)) => Some(id),
            _ => None,
        }
    }
}
