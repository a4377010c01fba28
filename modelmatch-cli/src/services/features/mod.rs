//! Feature paths and feature classification
//!
//! `paths` enumerates bounded multi-hop paths through associations,
//! `classifier` partitions an entity's features into local and nonlocal sets.

pub mod classifier;
pub mod paths;

pub use classifier::{
    cached_local_features, cached_nonlocal_features, define_local_features,
    define_nonlocal_features, get_nonlocal_target_features, local_features_of,
    nonlocal_features_of,
};
pub use paths::{
    attribute_feature, composed_properties, crosses_boundary, is_forbidden_inverse, path_feature,
    role_feature,
};

use serde::{Deserialize, Serialize};

/// Exclusion rule applied while composing paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PathPolicy {
    /// Never enter an entity already on the current path
    #[default]
    Strict,
    /// Revisits allowed; a role may not be followed by its own inverse
    AllPaths,
}

impl PathPolicy {
    pub fn from_all_paths(use_all_paths: bool) -> Self {
        if use_all_paths {
            PathPolicy::AllPaths
        } else {
            PathPolicy::Strict
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PathPolicy::Strict => "strict",
            PathPolicy::AllPaths => "all-paths",
        }
    }
}
