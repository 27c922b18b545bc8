//! Raw margins → predictions.

use ndarray::ArrayView2;

use crate::error::DecodingError;
use crate::metadata::LabelVocabulary;
use crate::model::{OutputTransform, TaskKind};

use super::output::{ClassPrediction, Predictions, RegressionOutput};

/// Turns the scorer's `[n_groups, n_rows]` margins into [`Predictions`].
#[derive(Debug, Clone, Copy)]
pub struct OutputDecoder<'a> {
    task: TaskKind,
    transform: OutputTransform,
    labels: Option<&'a LabelVocabulary>,
}

impl<'a> OutputDecoder<'a> {
    pub fn new(
        task: TaskKind,
        transform: OutputTransform,
        labels: Option<&'a LabelVocabulary>,
    ) -> Self {
        Self {
            task,
            transform,
            labels,
        }
    }

    /// Decode margins for `n_rows` records.
    pub fn decode(
        &self,
        margins: ArrayView2<f32>,
        n_rows: usize,
    ) -> Result<Predictions, DecodingError> {
        if margins.ncols() != n_rows {
            return Err(DecodingError::RowCountMismatch {
                expected: n_rows,
                actual: margins.ncols(),
            });
        }

        if self.task.is_regression() {
            self.decode_regression(margins).map(Predictions::Regression)
        } else {
            self.decode_classification(margins)
                .map(Predictions::Classification)
        }
    }

    fn decode_regression(
        &self,
        margins: ArrayView2<f32>,
    ) -> Result<RegressionOutput, DecodingError> {
        if margins.nrows() != 1 {
            return Err(DecodingError::ScoreWidthMismatch {
                expected: 1,
                actual: margins.nrows(),
            });
        }

        let mut predicted_label = margins.row(0).to_vec();
        self.transform.transform_inplace(&mut predicted_label, 1);
        Ok(RegressionOutput { predicted_label })
    }

    fn decode_classification(
        &self,
        margins: ArrayView2<f32>,
    ) -> Result<Vec<ClassPrediction>, DecodingError> {
        let label_values = self.labels.map_or(&[][..], LabelVocabulary::labels);

        // A single output group is a binary model scoring the second class.
        let binary = margins.nrows() == 1;
        let n_probs = if binary { 2 } else { margins.nrows() };
        if n_probs != label_values.len() {
            return Err(DecodingError::ScoreWidthMismatch {
                expected: label_values.len(),
                actual: n_probs,
            });
        }

        let predictions = margins
            .columns()
            .into_iter()
            .map(|column| {
                let mut probs = column.to_vec();
                self.transform.transform_row(&mut probs);
                if binary {
                    probs = vec![1.0 - probs[0], probs[0]];
                }

                let best = argmax(&probs);
                ClassPrediction {
                    predicted_label: label_values[best].clone(),
                    label_values: label_values.to_vec(),
                    label_probs: probs,
                }
            })
            .collect();
        Ok(predictions)
    }
}

/// Index of the largest value; the first one wins ties.
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, array};

    fn labels(names: &[&str]) -> LabelVocabulary {
        LabelVocabulary::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn regression_passes_margins_through() {
        let decoder = OutputDecoder::new(TaskKind::Regression, OutputTransform::Identity, None);
        let out = decoder.decode(array![[1.75, 0.625]].view(), 2).unwrap();
        assert_eq!(out.as_regression().unwrap().predicted_label, vec![1.75, 0.625]);
    }

    #[test]
    fn regression_applies_inverse_link() {
        let decoder = OutputDecoder::new(TaskKind::Regression, OutputTransform::Exp, None);
        let out = decoder.decode(array![[0.0]].view(), 1).unwrap();
        assert_abs_diff_eq!(out.as_regression().unwrap().predicted_label[0], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn multiclass_softmax_and_argmax() {
        let vocab = labels(&["3", "2", "1"]);
        let decoder = OutputDecoder::new(
            TaskKind::MulticlassClassification { n_classes: 3 },
            OutputTransform::Softmax,
            Some(&vocab),
        );
        // columns are rows: [0.5, 1.5, 0.0] and [0.5, 1.0, 1.0]
        let margins = array![[0.5, 0.5], [1.5, 1.0], [0.0, 1.0]];
        let out = decoder.decode(margins.view(), 2).unwrap().into_classification().unwrap();

        assert_eq!(out[0].predicted_label, "2");
        assert_eq!(out[0].label_values, vec!["3", "2", "1"]);
        assert_abs_diff_eq!(out[0].label_probs[1], 0.628_531_7, epsilon = 1e-6);
        assert_abs_diff_eq!(out[0].label_probs.iter().sum::<f32>(), 1.0, epsilon = 1e-6);

        // Tie between classes 1 and 2 resolves to the lower index.
        assert_eq!(out[1].label_probs[1], out[1].label_probs[2]);
        assert_eq!(out[1].predicted_label, "2");
    }

    #[test]
    fn binary_expands_to_two_probabilities() {
        let vocab = labels(&["no", "yes"]);
        let decoder = OutputDecoder::new(
            TaskKind::BinaryClassification,
            OutputTransform::Sigmoid,
            Some(&vocab),
        );
        let out = decoder
            .decode(array![[0.0, 2.0]].view(), 2)
            .unwrap()
            .into_classification()
            .unwrap();

        assert_abs_diff_eq!(out[0].label_probs[0], 0.5, epsilon = 1e-6);
        assert_eq!(out[0].predicted_label, "no");
        assert!(out[1].label_probs[1] > 0.85);
        assert_eq!(out[1].predicted_label, "yes");
    }

    #[test]
    fn width_mismatch_is_an_error() {
        let vocab = labels(&["a", "b"]);
        let decoder = OutputDecoder::new(
            TaskKind::MulticlassClassification { n_classes: 3 },
            OutputTransform::Softmax,
            Some(&vocab),
        );
        let err = decoder.decode(Array2::zeros((3, 1)).view(), 1).unwrap_err();
        assert_eq!(err, DecodingError::ScoreWidthMismatch { expected: 2, actual: 3 });
    }

    #[test]
    fn row_count_mismatch_is_an_error() {
        let decoder = OutputDecoder::new(TaskKind::Regression, OutputTransform::Identity, None);
        let err = decoder.decode(Array2::zeros((1, 2)).view(), 3).unwrap_err();
        assert_eq!(err, DecodingError::RowCountMismatch { expected: 3, actual: 2 });
    }

    #[test]
    fn empty_batch_keeps_variant() {
        let vocab = labels(&["a", "b", "c"]);
        let decoder = OutputDecoder::new(
            TaskKind::MulticlassClassification { n_classes: 3 },
            OutputTransform::Softmax,
            Some(&vocab),
        );
        let out = decoder.decode(Array2::zeros((3, 0)).view(), 0).unwrap();
        assert!(out.as_classification().unwrap().is_empty());
    }

    #[test]
    fn argmax_prefers_first() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax(&[0.5]), 0);
    }
}
