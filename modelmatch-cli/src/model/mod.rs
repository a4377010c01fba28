//! Class model: node types, feature paths, the arena and the JSON loader

pub mod document;
pub mod feature;
pub mod graph;
pub mod models;

pub use document::{DocumentError, ModelDocument};
pub use feature::{Feature, FeaturePath, Step};
pub use graph::EntityGraph;
pub use models::*;
