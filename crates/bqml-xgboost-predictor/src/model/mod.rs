//! Model-level metadata: what kind of model is served and how its raw
//! margins become predictions.

mod meta;
mod transform;

pub use meta::{ModelType, TaskKind, is_classification_objective};
pub use transform::OutputTransform;
