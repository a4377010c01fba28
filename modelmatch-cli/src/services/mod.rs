// Engine services layer
//
// Graph algorithms over the entity arena: inheritance traversal, feature
// paths, flattening, name similarity and model matching.

pub mod features;
pub mod flatten;
pub mod inheritance;
pub mod matching;
pub mod naming;
