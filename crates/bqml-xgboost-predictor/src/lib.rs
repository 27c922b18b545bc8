//! bqml-xgboost-predictor: serve BigQuery ML boosted-tree models in Rust.
//!
//! Loads a BigQuery ML model export (an XGBoost JSON ensemble plus
//! `assets/model_metadata.json`) and runs encode → score → decode over
//! loosely typed input records.
//!
//! # Key Types
//!
//! - [`Predictor`] - Load a model directory and predict
//! - [`PredictorConfig`] - Threads, block size and file layout
//! - [`InputRecord`] / [`FeatureValue`] - Prediction inputs
//! - [`Predictions`] - Regression (columnar) or classification (per record) results
//!
//! # Pipeline
//!
//! 1. [`metadata`] reads feature specs and class names
//! 2. [`encode`] turns records into a dense matrix
//! 3. [`inference`] scores the matrix against the [`repr::gbdt::Forest`]
//!    converted by [`compat::xgboost`]
//! 4. [`decode`] normalizes margins and picks labels
//!
//! # Example
//!
//! ```no_run
//! use bqml_xgboost_predictor::{InputRecord, Predictor};
//!
//! let predictor = Predictor::from_path("models/boosted_tree_classifier_model")?;
//! let records = vec![
//!     InputRecord::new().with("f1", "b").with("f3", 3).with("f2", vec!["a"]),
//!     InputRecord::new().with("f1", "f").with("f3", 0).with("f2", vec!["c", "a", "a", "f"]),
//! ];
//! for prediction in predictor.predict(&records)?.as_classification().unwrap_or_default() {
//!     println!("{} {:?}", prediction.predicted_label, prediction.label_probs);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export approx traits for users who want to compare predictions
pub use approx;

pub mod compat;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod inference;
pub mod metadata;
pub mod model;
pub mod predictor;
pub mod repr;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use config::{ConfigError, PredictorConfig};
pub use decode::{ClassPrediction, Predictions, RegressionOutput};
pub use encode::{FeatureValue, InputRecord, Scalar};
pub use error::{DecodingError, EncodingError, ModelLoadError, PredictError};
pub use metadata::{FeatureKind, FeatureSpec, LabelVocabulary};
pub use model::{ModelType, OutputTransform, TaskKind};
pub use predictor::Predictor;

// Shared utilities
pub use utils::Parallelism;
