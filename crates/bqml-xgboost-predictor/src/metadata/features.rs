//! Loaded feature specifications and label vocabulary.
//!
//! Everything here is immutable once [`ModelArtifacts`](super::ModelArtifacts)
//! has been built; the encoder and decoder only read from it.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

// =============================================================================
// Encoding policies
// =============================================================================

/// How a categorical feature is laid out in the encoded row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalEncoding {
    /// One indicator column per vocabulary entry.
    #[default]
    OneHot,
    /// A single column holding the vocabulary index.
    Label,
}

/// What to emit for a category that is not in the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownPolicy {
    /// All indicator columns stay zero (label encoding: index 0).
    #[default]
    Zero,
    /// A trailing "other" column is set (label encoding: index `|vocab|`).
    Other,
    /// The feature block is filled with NaN so trees take the default branch.
    Missing,
}

/// How repeated elements of a multi-valued feature combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accumulate {
    /// Each occurrence adds one.
    #[default]
    Count,
    /// Column is 1 if the element occurs at all.
    Presence,
}

// =============================================================================
// Vocabulary
// =============================================================================

/// Ordered category vocabulary with O(1) lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    entries: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Build a vocabulary, returning the first duplicated entry on failure.
    pub fn new(entries: Vec<String>) -> Result<Self, String> {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if index.insert(entry.clone(), i).is_some() {
                return Err(entry.clone());
            }
        }
        Ok(Self { entries, index })
    }

    #[inline]
    pub fn get(&self, category: &str) -> Option<usize> {
        self.index.get(category).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

// =============================================================================
// FeatureSpec
// =============================================================================

/// Encoding rule of one input feature.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureKind {
    /// Passthrough; `missing` is written when the value is absent.
    Numeric { missing: f32 },
    Categorical {
        vocabulary: Vocabulary,
        encoding: CategoricalEncoding,
        unknown: UnknownPolicy,
    },
    /// Category replaced by a precomputed statistic vector.
    TargetEncoded {
        statistics: HashMap<String, Box<[f32]>>,
        default: Box<[f32]>,
    },
    /// Array feature expanded into multi-hot / count columns.
    MultiValued {
        vocabulary: Vocabulary,
        accumulate: Accumulate,
        unknown: UnknownPolicy,
    },
}

impl FeatureKind {
    /// Name of the kind as written in the metadata file.
    pub fn name(&self) -> &'static str {
        match self {
            FeatureKind::Numeric { .. } => "numeric",
            FeatureKind::Categorical { .. } => "categorical",
            FeatureKind::TargetEncoded { .. } => "target_encoded",
            FeatureKind::MultiValued { .. } => "multi_valued",
        }
    }

    /// Number of encoded columns this feature occupies.
    pub fn width(&self) -> usize {
        match self {
            FeatureKind::Numeric { .. } => 1,
            FeatureKind::Categorical {
                encoding: CategoricalEncoding::Label,
                ..
            } => 1,
            FeatureKind::Categorical {
                vocabulary,
                unknown,
                ..
            }
            | FeatureKind::MultiValued {
                vocabulary,
                unknown,
                ..
            } => vocabulary.len() + usize::from(*unknown == UnknownPolicy::Other),
            FeatureKind::TargetEncoded { default, .. } => default.len(),
        }
    }
}

/// One input feature: its record field name, its encoding rule and the first
/// column it writes to in the encoded row.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSpec {
    name: String,
    kind: FeatureKind,
    offset: usize,
}

impl FeatureSpec {
    pub(crate) fn new(name: String, kind: FeatureKind, offset: usize) -> Self {
        Self { name, kind, offset }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> &FeatureKind {
        &self.kind
    }

    /// First encoded column of this feature.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.kind.width()
    }

    /// Encoded column range of this feature.
    #[inline]
    pub fn columns(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.width()
    }
}

// =============================================================================
// LabelVocabulary
// =============================================================================

/// Ordered class names of a classifier.
///
/// Position `i` names the class whose score is output group `i` (or, for a
/// binary model, probability column `i` of `[1 - p, p]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LabelVocabulary(Vec<String>);

impl LabelVocabulary {
    /// Build from class names, returning the first duplicate on failure.
    pub fn new(labels: Vec<String>) -> Result<Self, String> {
        let duplicate = {
            let mut seen = HashSet::with_capacity(labels.len());
            labels.iter().find(|label| !seen.insert(label.as_str())).cloned()
        };
        match duplicate {
            Some(dup) => Err(dup),
            None => Ok(Self(labels)),
        }
    }

    #[inline]
    pub fn labels(&self) -> &[String] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// Class index of a label.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.0.iter().position(|l| l == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(entries: &[&str]) -> Vocabulary {
        Vocabulary::new(entries.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn vocabulary_lookup_and_duplicates() {
        let v = vocab(&["a", "b", "f"]);
        assert_eq!(v.get("b"), Some(1));
        assert_eq!(v.get("z"), None);
        assert_eq!(v.len(), 3);

        let dup = Vocabulary::new(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(dup, Err("a".to_string()));
    }

    #[test]
    fn widths_follow_encoding_and_policy() {
        let one_hot = FeatureKind::Categorical {
            vocabulary: vocab(&["a", "b", "f"]),
            encoding: CategoricalEncoding::OneHot,
            unknown: UnknownPolicy::Zero,
        };
        assert_eq!(one_hot.width(), 3);

        let with_other = FeatureKind::MultiValued {
            vocabulary: vocab(&["a", "c"]),
            accumulate: Accumulate::Count,
            unknown: UnknownPolicy::Other,
        };
        assert_eq!(with_other.width(), 3);

        let label = FeatureKind::Categorical {
            vocabulary: vocab(&["a", "b", "f"]),
            encoding: CategoricalEncoding::Label,
            unknown: UnknownPolicy::Other,
        };
        assert_eq!(label.width(), 1);

        let target = FeatureKind::TargetEncoded {
            statistics: HashMap::new(),
            default: vec![0.1, 0.2].into_boxed_slice(),
        };
        assert_eq!(target.width(), 2);
        assert_eq!(FeatureKind::Numeric { missing: f32::NAN }.width(), 1);
    }

    #[test]
    fn feature_columns() {
        let spec = FeatureSpec::new(
            "f2".into(),
            FeatureKind::MultiValued {
                vocabulary: vocab(&["a", "c", "f"]),
                accumulate: Accumulate::Count,
                unknown: UnknownPolicy::Zero,
            },
            3,
        );
        assert_eq!(spec.columns(), 3..6);
        assert_eq!(spec.kind().name(), "multi_valued");
    }

    #[test]
    fn label_vocabulary() {
        let labels = LabelVocabulary::new(vec!["3".into(), "2".into(), "1".into()]).unwrap();
        assert_eq!(labels.get(1), Some("2"));
        assert_eq!(labels.position("1"), Some(2));
        assert_eq!(labels.get(3), None);
        assert!(LabelVocabulary::new(vec!["x".into(), "x".into()]).is_err());
    }

    #[test]
    fn policies_deserialize_from_snake_case() {
        let encoding: CategoricalEncoding = serde_json::from_str("\"one_hot\"").unwrap();
        assert_eq!(encoding, CategoricalEncoding::OneHot);
        let unknown: UnknownPolicy = serde_json::from_str("\"missing\"").unwrap();
        assert_eq!(unknown, UnknownPolicy::Missing);
        let accumulate: Accumulate = serde_json::from_str("\"presence\"").unwrap();
        assert_eq!(accumulate, Accumulate::Presence);
    }
}
