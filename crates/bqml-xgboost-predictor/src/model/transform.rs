//! Output transformation for inference.
//!
//! The [`OutputTransform`] enum defines how raw model outputs (margins)
//! are converted to final predictions. It is derived once from the XGBoost
//! objective when a model is loaded.
//!
//! # Variants
//!
//! - [`Identity`](OutputTransform::Identity): No transformation (squared error, raw margins)
//! - [`Sigmoid`](OutputTransform::Sigmoid): Logistic sigmoid for binary classification and
//!   `reg:logistic`
//! - [`Softmax`](OutputTransform::Softmax): Softmax for multiclass classification
//! - [`Exp`](OutputTransform::Exp): Inverse log link for poisson, gamma and tweedie

/// Inference-time output transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputTransform {
    /// No transformation; output = margin.
    #[default]
    Identity,

    /// Logistic sigmoid: output = 1 / (1 + exp(-margin)).
    Sigmoid,

    /// Softmax: output_i = exp(margin_i) / sum(exp(margin_j)).
    Softmax,

    /// Exponential: output = exp(margin).
    Exp,
}

impl OutputTransform {
    /// Select the transform XGBoost applies for an objective name.
    ///
    /// `binary:logitraw` maps to [`Sigmoid`](Self::Sigmoid) because class
    /// probabilities are always reported, never raw margins.
    pub fn from_objective(objective: &str) -> Self {
        match objective {
            "binary:logistic" | "binary:logitraw" | "reg:logistic" => Self::Sigmoid,
            "multi:softprob" | "multi:softmax" => Self::Softmax,
            "count:poisson" | "reg:gamma" | "reg:tweedie" => Self::Exp,
            _ => Self::Identity,
        }
    }

    /// Apply the transformation in-place to a row-major predictions buffer.
    ///
    /// `predictions` has shape `(n_rows, n_outputs)`. NaN and Inf inputs
    /// propagate without panics.
    ///
    /// # Panics
    ///
    /// Panics if `n_outputs` is 0 or does not divide `predictions.len()`.
    #[inline]
    pub fn transform_inplace(&self, predictions: &mut [f32], n_outputs: usize) {
        assert!(n_outputs > 0, "n_outputs must be > 0");
        assert!(
            predictions.len().is_multiple_of(n_outputs),
            "predictions.len() must be divisible by n_outputs"
        );

        match self {
            OutputTransform::Identity => {}
            OutputTransform::Sigmoid => predictions.iter_mut().for_each(|x| *x = sigmoid(*x)),
            OutputTransform::Exp => predictions.iter_mut().for_each(|x| *x = x.exp()),
            OutputTransform::Softmax => {
                for row in predictions.chunks_exact_mut(n_outputs) {
                    softmax_inplace(row);
                }
            }
        }
    }

    /// Apply the transformation to the outputs of a single row.
    #[inline]
    pub fn transform_row(&self, row: &mut [f32]) {
        if !row.is_empty() {
            self.transform_inplace(row, row.len());
        }
    }
}

/// Numerically stable sigmoid.
#[inline]
fn sigmoid(x: f32) -> f32 {
    let clamped = x.clamp(-500.0, 500.0);
    if clamped >= 0.0 {
        1.0 / (1.0 + (-clamped).exp())
    } else {
        let e = clamped.exp();
        e / (1.0 + e)
    }
}

/// Softmax in f32, subtracting the row max first (XGBoost's formula).
#[inline]
fn softmax_inplace(row: &mut [f32]) {
    if row.is_empty() {
        return;
    }

    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    let mut sum = 0.0f32;
    for x in row.iter_mut() {
        *x = (*x - max).exp();
        sum += *x;
    }

    if sum > 0.0 {
        for x in row.iter_mut() {
            *x /= sum;
        }
    }
}
