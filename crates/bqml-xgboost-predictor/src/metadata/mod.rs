//! BigQuery ML model metadata.
//!
//! A BQML model directory holds the XGBoost ensemble plus
//! `assets/model_metadata.json`, which describes how each input feature is
//! encoded and, for classifiers, the ordered class names.

mod features;
mod loader;
mod schema;

pub use features::{
    Accumulate, CategoricalEncoding, FeatureKind, FeatureSpec, LabelVocabulary, UnknownPolicy,
    Vocabulary,
};
pub use loader::ModelArtifacts;
