//! Error types for model loading, feature encoding, and output decoding.
//!
//! Each stage of the predict pipeline has its own error enum so callers can
//! tell a broken model directory apart from a bad input record:
//!
//! - [`ModelLoadError`]: returned by [`Predictor::from_path`](crate::Predictor::from_path)
//! - [`EncodingError`]: a record does not fit the model's feature spec
//! - [`DecodingError`]: raw scores do not fit the label vocabulary
//! - [`PredictError`]: umbrella returned by [`Predictor::predict`](crate::Predictor::predict)

use std::path::PathBuf;

use crate::compat::xgboost::ConversionError;
use crate::config::ConfigError;

// =============================================================================
// Model Loading
// =============================================================================

/// Errors raised while loading a model directory.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    /// A required file is missing from the model directory.
    #[error("required model file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    /// A file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON file (model or metadata) could not be parsed.
    #[error("failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The model file is not XGBoost JSON.
    #[error("unsupported model format in {}: expected XGBoost JSON", path.display())]
    UnsupportedModelFormat { path: PathBuf },

    /// Metadata declares a feature encoding this crate does not know.
    #[error("feature '{feature}' uses unknown encoding kind '{kind}'")]
    UnknownFeatureKind { feature: String, kind: String },

    /// Metadata declares a model type this crate does not serve.
    #[error("unknown model type '{0}'")]
    UnknownModelType(String),

    /// Metadata is structurally valid JSON but semantically inconsistent.
    #[error("invalid model metadata: {0}")]
    InvalidMetadata(String),

    /// The tree ensemble could not be converted.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The booster kind is not a tree ensemble.
    #[error("unsupported booster '{0}': only gbtree and dart are served")]
    UnsupportedBooster(String),

    /// The metadata model type disagrees with the ensemble objective.
    #[error("model type '{model_type}' cannot be served with objective '{objective}'")]
    ObjectiveMismatch {
        model_type: String,
        objective: String,
    },

    /// Encoded row width differs from the width the ensemble was trained on.
    #[error("feature spec encodes {encoded} columns but the ensemble expects {expected}")]
    WidthMismatch { encoded: usize, expected: usize },

    /// The predictor configuration is invalid.
    #[error("invalid predictor configuration: {0}")]
    Config(#[from] ConfigError),
}

// =============================================================================
// Encoding
// =============================================================================

/// Errors raised while encoding input records.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodingError {
    /// The value shape does not match the feature kind.
    #[error("feature '{feature}' expects {expected}, found {found}")]
    TypeMismatch {
        feature: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A string given for a numeric feature does not parse as a number.
    #[error("feature '{feature}' expects a number, got '{value}'")]
    NotNumeric { feature: String, value: String },

    /// NaN or infinity used as a category.
    #[error("feature '{feature}' cannot use a non-finite number as a category")]
    NonFiniteCategory { feature: String },

    /// Wraps an error with the index of the offending record.
    #[error("record {index}: {source}")]
    InRecord {
        index: usize,
        #[source]
        source: Box<EncodingError>,
    },
}

impl EncodingError {
    /// Attach the batch index of the record that failed.
    pub fn at_record(self, index: usize) -> Self {
        match self {
            already @ EncodingError::InRecord { .. } => already,
            other => EncodingError::InRecord {
                index,
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, with any record context stripped.
    pub fn root(&self) -> &EncodingError {
        match self {
            EncodingError::InRecord { source, .. } => source.root(),
            other => other,
        }
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Errors raised while turning raw scores into predictions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodingError {
    /// The per-row score vector does not match the label vocabulary.
    #[error("model produced {actual} class scores but the label vocabulary has {expected} entries")]
    ScoreWidthMismatch { expected: usize, actual: usize },

    /// The score matrix covers a different number of rows than were encoded.
    #[error("model produced scores for {actual} rows, expected {expected}")]
    RowCountMismatch { expected: usize, actual: usize },
}

// =============================================================================
// Prediction
// =============================================================================

/// Errors returned by [`Predictor::predict`](crate::Predictor::predict).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Decoding(#[from] DecodingError),

    /// JSON instances passed to `predict_json` could not be read as records.
    #[error("invalid instances: {0}")]
    InvalidInstances(String),
}
