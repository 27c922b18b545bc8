//! Record → dense feature matrix encoding.

use std::borrow::Cow;
use std::collections::BTreeSet;

use ndarray::{Array2, ArrayView1};

use crate::Parallelism;
use crate::error::EncodingError;
use crate::metadata::{
    Accumulate, CategoricalEncoding, FeatureKind, FeatureSpec, UnknownPolicy, Vocabulary,
};

use super::value::{FeatureValue, InputRecord, Scalar};

/// Encodes records into the column layout the ensemble was trained on.
///
/// Encoding is a pure function of the record and the feature specs: the same
/// record always produces the same row.
#[derive(Debug, Clone, Copy)]
pub struct FeatureEncoder<'a> {
    features: &'a [FeatureSpec],
    width: usize,
}

impl<'a> FeatureEncoder<'a> {
    pub fn new(features: &'a [FeatureSpec]) -> Self {
        let width = features.iter().map(FeatureSpec::width).sum();
        Self { features, width }
    }

    /// Encoded row width.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn features(&self) -> &'a [FeatureSpec] {
        self.features
    }

    /// Encode a batch into a `[n_records, width]` matrix.
    ///
    /// The batch fails as a whole: the error of the lowest-indexed bad record
    /// is returned, wrapped in [`EncodingError::InRecord`].
    pub fn encode(
        &self,
        records: &[InputRecord],
        parallelism: Parallelism,
    ) -> Result<Array2<f32>, EncodingError> {
        let rows = parallelism.maybe_par_map(0..records.len(), |index| {
            let mut row = vec![0.0f32; self.width];
            self.encode_row(&records[index], &mut row)
                .map(|()| row)
                .map_err(|err| err.at_record(index))
        });

        let mut output = Array2::<f32>::zeros((records.len(), self.width));
        for (mut dst, row) in output.rows_mut().into_iter().zip(rows) {
            let row = row?;
            dst.assign(&ArrayView1::from(row.as_slice()));
        }
        Ok(output)
    }

    /// Encode one record into `row`, which must be `width` long and zeroed.
    pub fn encode_row(&self, record: &InputRecord, row: &mut [f32]) -> Result<(), EncodingError> {
        debug_assert_eq!(row.len(), self.width);
        for spec in self.features {
            let value = record.get(spec.name()).unwrap_or(&FeatureValue::Null);
            encode_feature(spec, value, &mut row[spec.columns()])?;
        }
        Ok(())
    }

    /// Record fields that no feature declares, across a batch.
    pub fn unknown_fields<'r>(&self, records: &'r [InputRecord]) -> BTreeSet<&'r str> {
        records
            .iter()
            .flat_map(InputRecord::fields)
            .map(|(name, _)| name)
            .filter(|name| !self.features.iter().any(|spec| spec.name() == *name))
            .collect()
    }
}

// =============================================================================
// Per-kind encoding
// =============================================================================

fn encode_feature(
    spec: &FeatureSpec,
    value: &FeatureValue,
    block: &mut [f32],
) -> Result<(), EncodingError> {
    let name = spec.name();
    match spec.kind() {
        FeatureKind::Numeric { missing } => {
            block[0] = encode_numeric(name, value, *missing)?;
        }
        FeatureKind::Categorical {
            vocabulary,
            encoding,
            unknown,
        } => {
            let category = scalar_category(name, value)?;
            encode_categorical(vocabulary, *encoding, *unknown, category.as_deref(), block);
        }
        FeatureKind::TargetEncoded {
            statistics,
            default,
        } => {
            let category = scalar_category(name, value)?;
            let stats = category
                .as_deref()
                .and_then(|c| statistics.get(c))
                .unwrap_or(default);
            block.copy_from_slice(stats);
        }
        FeatureKind::MultiValued {
            vocabulary,
            accumulate,
            unknown,
        } => {
            let items = match value {
                FeatureValue::Null => return Ok(()),
                FeatureValue::List(items) => items,
                FeatureValue::Scalar(scalar) => {
                    return Err(EncodingError::TypeMismatch {
                        feature: name.to_string(),
                        expected: "list",
                        found: scalar.type_name(),
                    });
                }
            };
            for item in items.iter().flatten() {
                let category = category_text(name, item)?;
                let column = match (vocabulary.get(&category), unknown) {
                    (Some(index), _) => index,
                    (None, UnknownPolicy::Other) => vocabulary.len(),
                    (None, _) => continue,
                };
                match accumulate {
                    Accumulate::Count => block[column] += 1.0,
                    Accumulate::Presence => block[column] = 1.0,
                }
            }
        }
    }
    Ok(())
}

fn encode_numeric(name: &str, value: &FeatureValue, missing: f32) -> Result<f32, EncodingError> {
    match value {
        FeatureValue::Null => Ok(missing),
        FeatureValue::Scalar(Scalar::Num(n)) => Ok(*n as f32),
        FeatureValue::Scalar(Scalar::Str(s)) => {
            s.trim()
                .parse::<f64>()
                .map(|n| n as f32)
                .map_err(|_| EncodingError::NotNumeric {
                    feature: name.to_string(),
                    value: s.clone(),
                })
        }
        FeatureValue::List(_) => Err(EncodingError::TypeMismatch {
            feature: name.to_string(),
            expected: "number",
            found: "list",
        }),
    }
}

/// Category key of a scalar feature value; `None` for null.
fn scalar_category<'v>(
    name: &str,
    value: &'v FeatureValue,
) -> Result<Option<Cow<'v, str>>, EncodingError> {
    match value {
        FeatureValue::Null => Ok(None),
        FeatureValue::Scalar(scalar) => category_text(name, scalar).map(Some),
        FeatureValue::List(_) => Err(EncodingError::TypeMismatch {
            feature: name.to_string(),
            expected: "scalar",
            found: "list",
        }),
    }
}

fn category_text<'v>(name: &str, scalar: &'v Scalar) -> Result<Cow<'v, str>, EncodingError> {
    scalar
        .category_text()
        .ok_or_else(|| EncodingError::NonFiniteCategory {
            feature: name.to_string(),
        })
}

fn encode_categorical(
    vocabulary: &Vocabulary,
    encoding: CategoricalEncoding,
    unknown: UnknownPolicy,
    category: Option<&str>,
    block: &mut [f32],
) {
    let Some(category) = category else {
        if encoding == CategoricalEncoding::Label {
            block[0] = f32::NAN;
        }
        return;
    };

    match (encoding, vocabulary.get(category)) {
        (CategoricalEncoding::OneHot, Some(index)) => block[index] = 1.0,
        (CategoricalEncoding::Label, Some(index)) => block[0] = index as f32,
        (_, None) => match (encoding, unknown) {
            (_, UnknownPolicy::Missing) => block.fill(f32::NAN),
            (CategoricalEncoding::OneHot, UnknownPolicy::Zero) => {}
            (CategoricalEncoding::OneHot, UnknownPolicy::Other) => block[vocabulary.len()] = 1.0,
            (CategoricalEncoding::Label, UnknownPolicy::Zero) => block[0] = 0.0,
            (CategoricalEncoding::Label, UnknownPolicy::Other) => {
                block[0] = vocabulary.len() as f32
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vocab(entries: &[&str]) -> Vocabulary {
        Vocabulary::new(entries.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    /// f1 one-hot over [a, b, f], f2 counts over [a, c, f], f3 numeric.
    fn regression_features() -> Vec<FeatureSpec> {
        vec![
            FeatureSpec::new(
                "f1".into(),
                FeatureKind::Categorical {
                    vocabulary: vocab(&["a", "b", "f"]),
                    encoding: CategoricalEncoding::OneHot,
                    unknown: UnknownPolicy::Zero,
                },
                0,
            ),
            FeatureSpec::new(
                "f2".into(),
                FeatureKind::MultiValued {
                    vocabulary: vocab(&["a", "c", "f"]),
                    accumulate: Accumulate::Count,
                    unknown: UnknownPolicy::Zero,
                },
                3,
            ),
            FeatureSpec::new("f3".into(), FeatureKind::Numeric { missing: f32::NAN }, 6),
        ]
    }

    fn encode_one(
        features: &[FeatureSpec],
        record: InputRecord,
    ) -> Result<Vec<f32>, EncodingError> {
        let encoder = FeatureEncoder::new(features);
        let matrix = encoder.encode(&[record], Parallelism::Sequential)?;
        Ok(matrix.row(0).to_vec())
    }

    #[test]
    fn encodes_mixed_record() {
        let features = regression_features();
        let row = encode_one(
            &features,
            InputRecord::new().with("f1", "b").with("f3", 3).with("f2", vec!["a"]),
        )
        .unwrap();
        assert_eq!(row, vec![0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 3.0]);
    }

    #[test]
    fn multi_valued_counts_duplicates() {
        let features = regression_features();
        let with_dup = encode_one(
            &features,
            InputRecord::new().with("f2", vec!["c", "a", "a", "f"]).with("f3", 0),
        )
        .unwrap();
        let without_dup = encode_one(
            &features,
            InputRecord::new().with("f2", vec!["c", "a", "f"]).with("f3", 0),
        )
        .unwrap();

        assert_eq!(&with_dup[3..6], &[2.0, 1.0, 1.0]);
        assert_eq!(&without_dup[3..6], &[1.0, 1.0, 1.0]);
        assert_ne!(with_dup, without_dup);
    }

    #[test]
    fn presence_and_other_bucket() {
        let features = vec![FeatureSpec::new(
            "tags".into(),
            FeatureKind::MultiValued {
                vocabulary: vocab(&["x", "y"]),
                accumulate: Accumulate::Presence,
                unknown: UnknownPolicy::Other,
            },
            0,
        )];
        let value = serde_json::json!({"tags": ["x", "x", null, "q", "z"]});
        let record = InputRecord::from_json(&value).unwrap();
        assert_eq!(encode_one(&features, record).unwrap(), vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn absent_fields_keep_width() {
        let features = regression_features();
        let row = encode_one(&features, InputRecord::new()).unwrap();
        assert_eq!(row.len(), 7);
        assert_eq!(&row[..6], &[0.0; 6]);
        assert!(row[6].is_nan());
    }

    #[test]
    fn numeric_strings_are_parsed() {
        let features = regression_features();
        let row = encode_one(&features, InputRecord::new().with("f3", " 2.5 ")).unwrap();
        assert_eq!(row[6], 2.5);

        let err = encode_one(&features, InputRecord::new().with("f3", "abc")).unwrap_err();
        assert_eq!(
            err.root(),
            &EncodingError::NotNumeric {
                feature: "f3".into(),
                value: "abc".into()
            }
        );
    }

    #[test]
    fn shape_mismatches_are_rejected() {
        let features = regression_features();

        let err = encode_one(&features, InputRecord::new().with("f1", vec!["a"])).unwrap_err();
        assert!(matches!(err.root(), EncodingError::TypeMismatch { found: "list", .. }));

        let err = encode_one(&features, InputRecord::new().with("f2", "a")).unwrap_err();
        assert!(matches!(
            err.root(),
            EncodingError::TypeMismatch { expected: "list", found: "string", .. }
        ));

        let err = encode_one(&features, InputRecord::new().with("f3", vec![1.0])).unwrap_err();
        assert!(matches!(err.root(), EncodingError::TypeMismatch { expected: "number", .. }));
    }

    #[test]
    fn batch_error_reports_first_bad_record() {
        let features = regression_features();
        let encoder = FeatureEncoder::new(&features);
        let records = vec![
            InputRecord::new().with("f3", 1),
            InputRecord::new().with("f3", "x"),
            InputRecord::new().with("f2", "y"),
        ];

        for parallelism in [Parallelism::Sequential, Parallelism::Parallel] {
            let err = encoder.encode(&records, parallelism).unwrap_err();
            assert!(matches!(err, EncodingError::InRecord { index: 1, .. }));
        }
    }

    #[test]
    fn numeric_categories_use_canonical_text() {
        let features = vec![FeatureSpec::new(
            "code".into(),
            FeatureKind::Categorical {
                vocabulary: vocab(&["1", "2", "3"]),
                encoding: CategoricalEncoding::OneHot,
                unknown: UnknownPolicy::Zero,
            },
            0,
        )];
        let row = encode_one(&features, InputRecord::new().with("code", 3.0)).unwrap();
        assert_eq!(row, vec![0.0, 0.0, 1.0]);

        let err = encode_one(&features, InputRecord::new().with("code", f64::NAN)).unwrap_err();
        assert!(matches!(err.root(), EncodingError::NonFiniteCategory { .. }));
    }

    #[test]
    fn unknown_category_policies() {
        let make = |encoding, unknown| {
            vec![FeatureSpec::new(
                "c".into(),
                FeatureKind::Categorical {
                    vocabulary: vocab(&["a", "b"]),
                    encoding,
                    unknown,
                },
                0,
            )]
        };
        let unseen = || InputRecord::new().with("c", "zzz");

        let encode_unseen =
            |encoding, unknown| encode_one(&make(encoding, unknown), unseen()).unwrap();

        let row = encode_unseen(CategoricalEncoding::OneHot, UnknownPolicy::Zero);
        assert_eq!(row, vec![0.0, 0.0]);
        let row = encode_unseen(CategoricalEncoding::OneHot, UnknownPolicy::Other);
        assert_eq!(row, vec![0.0, 0.0, 1.0]);
        let row = encode_unseen(CategoricalEncoding::OneHot, UnknownPolicy::Missing);
        assert!(row.iter().all(|v| v.is_nan()));

        let row = encode_unseen(CategoricalEncoding::Label, UnknownPolicy::Other);
        assert_eq!(row, vec![2.0]);
        let row = encode_unseen(CategoricalEncoding::Label, UnknownPolicy::Zero);
        assert_eq!(row, vec![0.0]);
        let label_zero = make(CategoricalEncoding::Label, UnknownPolicy::Zero);
        let row = encode_one(&label_zero, InputRecord::new().with("c", "b")).unwrap();
        assert_eq!(row, vec![1.0]);
        let row = encode_one(&label_zero, InputRecord::new()).unwrap();
        assert!(row[0].is_nan());
    }

    #[test]
    fn target_encoding_falls_back_to_default() {
        let mut statistics = HashMap::new();
        statistics.insert("a".to_string(), vec![0.25, 1.0].into_boxed_slice());
        let features = vec![FeatureSpec::new(
            "f3".into(),
            FeatureKind::TargetEncoded {
                statistics,
                default: vec![0.5, 0.0].into_boxed_slice(),
            },
            0,
        )];

        let encode = |record| encode_one(&features, record).unwrap();
        assert_eq!(encode(InputRecord::new().with("f3", "a")), vec![0.25, 1.0]);
        assert_eq!(encode(InputRecord::new().with("f3", "q")), vec![0.5, 0.0]);
        assert_eq!(encode(InputRecord::new().with("f3", 3)), vec![0.5, 0.0]);
        assert_eq!(encode(InputRecord::new()), vec![0.5, 0.0]);
    }

    #[test]
    fn unknown_fields_are_collected() {
        let features = regression_features();
        let encoder = FeatureEncoder::new(&features);
        let records = vec![
            InputRecord::new().with("f1", "a").with("extra", 1),
            InputRecord::new().with("label", "2").with("extra", 2),
        ];
        let unknown: Vec<_> = encoder.unknown_fields(&records).into_iter().collect();
        assert_eq!(unknown, vec!["extra", "label"]);
    }

    #[test]
    fn encoding_is_deterministic_across_parallelism() {
        let features = regression_features();
        let encoder = FeatureEncoder::new(&features);
        let records: Vec<_> = (0..300)
            .map(|i| {
                InputRecord::new()
                    .with("f1", ["a", "b", "f", "x"][i % 4])
                    .with("f2", vec!["c"; i % 3])
                    .with("f3", i as f64)
            })
            .collect();

        let sequential = encoder.encode(&records, Parallelism::Sequential).unwrap();
        let parallel = encoder.encode(&records, Parallelism::Parallel).unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(sequential.shape(), &[300, 7]);
    }
}
