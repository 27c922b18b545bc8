//! Prediction result types.
//!
//! Regression results are column-oriented (one `predicted_label` list for the
//! whole batch) while classification results are row-oriented (one object
//! per record). Serialized, they take exactly those two JSON shapes.

use serde::{Deserialize, Serialize};

/// Regression predictions for a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionOutput {
    /// One value per input record, in input order.
    pub predicted_label: Vec<f32>,
}

/// Classification prediction for one record.
///
/// `label_values` is the full label vocabulary in model order and
/// `label_probs` is aligned with it (not sorted by probability).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPrediction {
    pub predicted_label: String,
    pub label_values: Vec<String>,
    pub label_probs: Vec<f32>,
}

impl ClassPrediction {
    /// Probability assigned to `label`.
    pub fn probability_of(&self, label: &str) -> Option<f32> {
        self.label_values
            .iter()
            .position(|l| l == label)
            .and_then(|i| self.label_probs.get(i).copied())
    }

    /// The `k` most probable labels, highest first; ties keep vocabulary order.
    pub fn top_k(&self, k: usize) -> Vec<(&str, f32)> {
        let mut ranked: Vec<(&str, f32)> = self
            .label_values
            .iter()
            .map(String::as_str)
            .zip(self.label_probs.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(k);
        ranked
    }
}

/// Decoded predictions for a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Predictions {
    Regression(RegressionOutput),
    Classification(Vec<ClassPrediction>),
}

impl Predictions {
    /// Number of records predicted.
    pub fn len(&self) -> usize {
        match self {
            Predictions::Regression(output) => output.predicted_label.len(),
            Predictions::Classification(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_regression(&self) -> Option<&RegressionOutput> {
        match self {
            Predictions::Regression(output) => Some(output),
            Predictions::Classification(_) => None,
        }
    }

    pub fn as_classification(&self) -> Option<&[ClassPrediction]> {
        match self {
            Predictions::Regression(_) => None,
            Predictions::Classification(rows) => Some(rows),
        }
    }

    pub fn into_regression(self) -> Option<RegressionOutput> {
        match self {
            Predictions::Regression(output) => Some(output),
            Predictions::Classification(_) => None,
        }
    }

    pub fn into_classification(self) -> Option<Vec<ClassPrediction>> {
        match self {
            Predictions::Regression(_) => None,
            Predictions::Classification(rows) => Some(rows),
        }
    }
}
