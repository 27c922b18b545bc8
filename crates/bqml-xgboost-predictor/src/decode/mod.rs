//! Output decoding.
//!
//! Regression margins pass through the objective's inverse link. Classifier
//! margins are normalized into probabilities over the label vocabulary and
//! the most probable label is picked (first index on ties).

mod decoder;
mod output;

pub use decoder::OutputDecoder;
pub use output::{ClassPrediction, Predictions, RegressionOutput};
