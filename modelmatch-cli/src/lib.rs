//! Entity feature resolution and model matching for class models
//!
//! Entities, attributes and associations live in an arena
//! ([`model::EntityGraph`]); the [`services`] compute inherited and composed
//! features, flattened entity views and cross-model correspondences.

pub mod config;
pub mod diagnostics;
pub mod model;
pub mod services;

pub use config::Config;
pub use diagnostics::{Diagnostic, Diagnostics};
pub use model::{EntityGraph, EntityId, ModelDocument};
pub use services::matching::{Mapping, SimilarityEngine};
