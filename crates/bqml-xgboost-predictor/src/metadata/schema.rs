//! On-disk schema of `model_metadata.json`.
//!
//! Feature entries are kept loosely typed (`kind` + free-form parameters) so
//! that an unrecognised kind can be reported as such instead of as a generic
//! parse failure. [`super::loader`] turns them into [`FeatureSpec`]s.
//!
//! [`FeatureSpec`]: super::FeatureSpec

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::features::{Accumulate, CategoricalEncoding, UnknownPolicy};

fn default_label_col() -> String {
    "label".to_string()
}

/// `assets/model_metadata.json` in this crate's own layout. BigQuery's export
/// does not write this file; it is produced alongside the exported model.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawMetadata {
    pub model_type: String,
    #[serde(default = "default_label_col")]
    pub label_col: String,
    /// Model-wide sentinel for absent numeric values; `null` means NaN.
    #[serde(default)]
    pub missing_value: Option<f32>,
    #[serde(default)]
    pub class_names: Option<Vec<String>>,
    pub features: Vec<RawFeature>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawFeature {
    pub name: String,
    pub kind: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl RawFeature {
    /// Deserialize the kind-specific parameters.
    pub fn params<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.params.clone()))
    }
}

// =============================================================================
// Kind parameters
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct NumericParams {
    #[serde(default)]
    pub missing: Option<f32>,
}

/// A vocabulary given inline or as a file under the metadata directory.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct VocabularySource {
    #[serde(default)]
    pub vocabulary: Option<Vec<String>>,
    #[serde(default)]
    pub vocabulary_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CategoricalParams {
    #[serde(flatten)]
    pub source: VocabularySource,
    #[serde(default)]
    pub encoding: CategoricalEncoding,
    #[serde(default)]
    pub unknown: UnknownPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TargetEncodedParams {
    pub statistics: HashMap<String, Vec<f32>>,
    pub default: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MultiValuedParams {
    #[serde(flatten)]
    pub source: VocabularySource,
    #[serde(default)]
    pub accumulate: Accumulate,
    #[serde(default)]
    pub unknown: UnknownPolicy,
}
