//! The predictor facade: load once, predict many times.

use std::path::Path;

use ndarray::Array2;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::{ConfigError, PredictorConfig};
use crate::decode::{OutputDecoder, Predictions};
use crate::encode::{FeatureEncoder, InputRecord};
use crate::error::{EncodingError, ModelLoadError, PredictError};
use crate::inference::ForestScorer;
use crate::metadata::{FeatureSpec, LabelVocabulary, ModelArtifacts};
use crate::model::{ModelType, OutputTransform, TaskKind};
use crate::repr::gbdt::Forest;
use crate::utils::{Parallelism, build_thread_pool, run_in_pool};

/// A loaded BigQuery ML boosted-tree model.
///
/// Created by [`Predictor::from_path`]; immutable afterwards. `predict` takes
/// `&self`, so one predictor can serve concurrent callers.
///
/// # Example
///
/// ```no_run
/// use bqml_xgboost_predictor::{InputRecord, Predictor};
///
/// let predictor = Predictor::from_path("models/boosted_tree_regressor_model")?;
/// let records = vec![
///     InputRecord::new().with("f1", "b").with("f3", 3).with("f2", vec!["a"]),
/// ];
/// let predictions = predictor.predict(&records)?;
/// println!("{:?}", predictions.as_regression().map(|r| &r.predicted_label));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Predictor {
    artifacts: ModelArtifacts,
    block_size: usize,
    parallelism: Parallelism,
    pool: Option<rayon::ThreadPool>,
}

impl Predictor {
    /// Load a model directory with the default configuration.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        Self::from_path_with_config(path, PredictorConfig::default())
    }

    /// Load a model directory.
    ///
    /// # Errors
    ///
    /// Returns [`ModelLoadError`] if files are missing or unreadable, the
    /// metadata names an unknown model type or feature kind, or the metadata
    /// and the ensemble disagree.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_path_with_config(
        path: impl AsRef<Path>,
        config: PredictorConfig,
    ) -> Result<Self, ModelLoadError> {
        config.validate()?;

        let artifacts =
            ModelArtifacts::load(path.as_ref(), &config.metadata_file, &config.model_files)?;
        let pool = build_thread_pool(config.n_threads)
            .map_err(|e| ConfigError::ThreadPool(e.to_string()))?;

        Ok(Self {
            artifacts,
            block_size: config.block_size,
            parallelism: Parallelism::from_threads(config.n_threads),
            pool,
        })
    }

    // =========================================================================
    // Prediction
    // =========================================================================

    /// Encode, score and decode a batch of records.
    ///
    /// Output order matches input order. Regression returns one
    /// `predicted_label` list for the batch; classification returns one
    /// [`ClassPrediction`](crate::ClassPrediction) per record.
    pub fn predict(&self, records: &[InputRecord]) -> Result<Predictions, PredictError> {
        debug!(n_records = records.len(), "predict");

        let unknown = self.encoder().unknown_fields(records);
        if !unknown.is_empty() {
            warn!(fields = ?unknown, "ignoring record fields the model does not declare");
        }

        let margins = self.raw_scores(records)?;
        Ok(self.decoder().decode(margins.view(), records.len())?)
    }

    /// Predict from JSON instances: an array of objects, or a single object.
    pub fn predict_json(&self, instances: &Value) -> Result<Predictions, PredictError> {
        let records = match instances {
            Value::Array(items) => items
                .iter()
                .map(InputRecord::from_json)
                .collect::<Result<Vec<_>, _>>(),
            Value::Object(_) => InputRecord::from_json(instances).map(|record| vec![record]),
            _ => {
                return Err(PredictError::InvalidInstances(
                    "expected an object or an array of objects".to_string(),
                ));
            }
        }
        .map_err(|e| PredictError::InvalidInstances(e.to_string()))?;

        self.predict(&records)
    }

    /// The encoded `[n_records, n_features]` matrix, for debugging.
    pub fn encode(&self, records: &[InputRecord]) -> Result<Array2<f32>, EncodingError> {
        run_in_pool(self.pool.as_ref(), self.parallelism, |parallelism| {
            self.encoder().encode(records, parallelism)
        })
    }

    /// Raw margins `[n_groups, n_records]` before normalization.
    pub fn raw_scores(&self, records: &[InputRecord]) -> Result<Array2<f32>, EncodingError> {
        run_in_pool(self.pool.as_ref(), self.parallelism, |parallelism| {
            let features = self.encoder().encode(records, parallelism)?;
            Ok(self.scorer().score(features.view(), parallelism))
        })
    }

    #[inline]
    fn encoder(&self) -> FeatureEncoder<'_> {
        FeatureEncoder::new(&self.artifacts.features)
    }

    #[inline]
    fn scorer(&self) -> ForestScorer<'_> {
        ForestScorer::new(&self.artifacts.forest).with_block_size(self.block_size)
    }

    #[inline]
    fn decoder(&self) -> OutputDecoder<'_> {
        OutputDecoder::new(
            self.artifacts.task,
            self.artifacts.transform,
            self.artifacts.labels.as_ref(),
        )
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    pub fn model_type(&self) -> ModelType {
        self.artifacts.model_type
    }

    pub fn task(&self) -> TaskKind {
        self.artifacts.task
    }

    /// Name of the label column the model was trained on.
    pub fn label_col(&self) -> &str {
        &self.artifacts.label_col
    }

    /// Input features in encoded column order.
    pub fn feature_specs(&self) -> &[FeatureSpec] {
        &self.artifacts.features
    }

    /// Class names; `None` for regressors.
    pub fn label_vocabulary(&self) -> Option<&LabelVocabulary> {
        self.artifacts.labels.as_ref()
    }

    /// Encoded row width.
    pub fn n_features(&self) -> usize {
        self.artifacts.n_features
    }

    pub fn objective(&self) -> &str {
        &self.artifacts.objective
    }

    pub fn output_transform(&self) -> OutputTransform {
        self.artifacts.transform
    }

    pub fn forest(&self) -> &Forest {
        &self.artifacts.forest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predictor_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Predictor>();
    }

    #[test]
    fn invalid_config_is_rejected_before_loading() {
        let config = PredictorConfig {
            block_size: 0,
            ..PredictorConfig::default()
        };
        let err = Predictor::from_path_with_config("/does/not/matter", config).unwrap_err();
        assert!(matches!(err, ModelLoadError::Config(ConfigError::InvalidBlockSize)));
    }
}
