//! Predictor configuration with builder pattern.
//!
//! [`PredictorConfig`] controls how a model directory is located and how
//! batches are scored. Encoding policies are not configured here; they are
//! read from the model's metadata.
//!
//! # Example
//!
//! ```
//! use bqml_xgboost_predictor::PredictorConfig;
//!
//! // All defaults: sequential, blocks of 64 rows
//! let config = PredictorConfig::builder().build().unwrap();
//!
//! let config = PredictorConfig::builder()
//!     .n_threads(4)
//!     .block_size(128)
//!     .metadata_file("assets/model_metadata.json")
//!     .build()
//!     .unwrap();
//! assert_eq!(config.n_threads, 4);
//! ```

use std::path::PathBuf;

use bon::Builder;

use crate::inference::DEFAULT_BLOCK_SIZE;

/// Metadata location inside a BQML model directory.
pub const DEFAULT_METADATA_FILE: &str = "assets/model_metadata.json";

/// Model files tried in order.
pub const DEFAULT_MODEL_FILES: [&str; 2] = ["model.json", "model.bst"];

fn default_model_files() -> Vec<PathBuf> {
    DEFAULT_MODEL_FILES.iter().map(PathBuf::from).collect()
}

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Block size must be at least 1.
    #[error("block_size must be at least 1")]
    InvalidBlockSize,
    /// At least one model file name is needed.
    #[error("model_files must name at least one file")]
    NoModelFiles,
    /// The dedicated thread pool could not be created.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),
}

// =============================================================================
// PredictorConfig
// =============================================================================

/// Configuration for [`Predictor`](crate::Predictor).
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct PredictorConfig {
    /// Number of threads. `1` (default) is sequential, `0` uses the global
    /// rayon pool, `n > 1` builds a dedicated pool of `n` threads.
    #[builder(default = 1)]
    pub n_threads: usize,

    /// Rows scored together. Default: 64.
    #[builder(default = DEFAULT_BLOCK_SIZE)]
    pub block_size: usize,

    /// Metadata file, relative to the model directory.
    #[builder(into, default = PathBuf::from(DEFAULT_METADATA_FILE))]
    pub metadata_file: PathBuf,

    /// Candidate model files, relative to the model directory. The first
    /// one that exists is loaded.
    #[builder(default = default_model_files())]
    pub model_files: Vec<PathBuf>,
}

impl<S: predictor_config_builder::IsComplete> PredictorConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `block_size == 0` or `model_files` is empty.
    pub fn build(self) -> Result<PredictorConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl PredictorConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::InvalidBlockSize);
        }
        if self.model_files.is_empty() {
            return Err(ConfigError::NoModelFiles);
        }
        Ok(())
    }
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            n_threads: 1,
            block_size: DEFAULT_BLOCK_SIZE,
            metadata_file: PathBuf::from(DEFAULT_METADATA_FILE),
            model_files: default_model_files(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PredictorConfig::builder().build().unwrap();
        assert_eq!(config.n_threads, 1);
        assert_eq!(config.block_size, 64);
        assert_eq!(config.metadata_file, PathBuf::from("assets/model_metadata.json"));
        assert_eq!(
            config.model_files,
            vec![PathBuf::from("model.json"), PathBuf::from("model.bst")]
        );

        let default = PredictorConfig::default();
        assert_eq!(default.block_size, config.block_size);
        assert_eq!(default.model_files, config.model_files);
    }

    #[test]
    fn rejects_zero_block_size() {
        let err = PredictorConfig::builder().block_size(0).build().unwrap_err();
        assert_eq!(err, ConfigError::InvalidBlockSize);
    }

    #[test]
    fn rejects_empty_model_files() {
        let err = PredictorConfig::builder()
            .model_files(vec![])
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::NoModelFiles);
    }

    #[test]
    fn custom_paths() {
        let config = PredictorConfig::builder()
            .metadata_file("meta.json")
            .model_files(vec![PathBuf::from("booster.json")])
            .build()
            .unwrap();
        assert_eq!(config.metadata_file, PathBuf::from("meta.json"));
        assert_eq!(config.model_files.len(), 1);
    }
}
