//! Input record values.
//!
//! Records are loosely typed on the wire (JSON objects of strings, numbers,
//! arrays and nulls). They are modelled here as a small tagged union so the
//! encoder can match on the shape of each value.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Scalar
// =============================================================================

/// A single string or number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Num(f64),
    Str(String),
}

impl Scalar {
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Num(_) => "number",
            Scalar::Str(_) => "string",
        }
    }

    /// Text used to look the value up as a category.
    ///
    /// Strings are used as-is. Integral numbers print without a fractional
    /// part (`3.0` → `"3"`), other finite numbers use their shortest
    /// round-trip form. Returns `None` for NaN and infinities.
    pub fn category_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Scalar::Str(s) => Some(Cow::Borrowed(s.as_str())),
            Scalar::Num(n) => number_to_category(*n).map(Cow::Owned),
        }
    }
}

fn number_to_category(n: f64) -> Option<String> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Some(format!("{}", n as i64))
    } else {
        Some(format!("{n}"))
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Num(value)
    }
}

impl From<f32> for Scalar {
    fn from(value: f32) -> Self {
        Scalar::Num(value as f64)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Num(value as f64)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Num(value as f64)
    }
}

// =============================================================================
// FeatureValue
// =============================================================================

/// Value of one record field.
///
/// A `null` element inside a list is kept as `None` and skipped by the
/// encoder.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    #[default]
    Null,
    Scalar(Scalar),
    List(Vec<Option<Scalar>>),
}

impl FeatureValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FeatureValue::Null => "null",
            FeatureValue::Scalar(scalar) => scalar.type_name(),
            FeatureValue::List(_) => "list",
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, FeatureValue::Null)
    }
}

macro_rules! scalar_feature_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for FeatureValue {
                fn from(value: $ty) -> Self {
                    FeatureValue::Scalar(value.into())
                }
            }
        )*
    };
}

scalar_feature_value!(Scalar, &str, String, f64, f32, i64, i32);

impl<T: Into<Scalar>> From<Vec<T>> for FeatureValue {
    fn from(values: Vec<T>) -> Self {
        FeatureValue::List(values.into_iter().map(|v| Some(v.into())).collect())
    }
}

impl<T: Into<Scalar>> From<Option<T>> for FeatureValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FeatureValue::Null, |v| FeatureValue::Scalar(v.into()))
    }
}

// =============================================================================
// InputRecord
// =============================================================================

/// Mapping from feature name to value for one prediction instance.
///
/// Fields the model does not declare are ignored; declared fields that are
/// absent encode exactly like `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputRecord(BTreeMap<String, FeatureValue>);

impl InputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FeatureValue>) {
        self.0.insert(name.into(), value.into());
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.0.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse one JSON object.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }
}

impl<K: Into<String>, V: Into<FeatureValue>> FromIterator<(K, V)> for InputRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_from_json() {
        let record = InputRecord::from_json(&json!({
            "f1": "b",
            "f2": ["a", null, 3],
            "f3": 3,
            "f4": null
        }))
        .unwrap();

        assert_eq!(record.get("f1"), Some(&FeatureValue::from("b")));
        assert_eq!(
            record.get("f2"),
            Some(&FeatureValue::List(vec![
                Some(Scalar::from("a")),
                None,
                Some(Scalar::Num(3.0))
            ]))
        );
        assert_eq!(record.get("f3"), Some(&FeatureValue::from(3)));
        assert!(record.get("f4").unwrap().is_null());
        assert_eq!(record.len(), 4);
    }

    #[test]
    fn nested_lists_and_objects_are_rejected() {
        assert!(InputRecord::from_json(&json!({"f": [[1]]})).is_err());
        assert!(InputRecord::from_json(&json!({"f": {"a": 1}})).is_err());
        assert!(InputRecord::from_json(&json!(["not", "an", "object"])).is_err());
    }

    #[test]
    fn builder_matches_json() {
        let built = InputRecord::new()
            .with("f1", "b")
            .with("f3", 3)
            .with("f2", vec!["a"]);
        let parsed = InputRecord::from_json(&json!({"f1": "b", "f3": 3, "f2": ["a"]})).unwrap();
        assert_eq!(built, parsed);
    }

    #[test]
    fn serializes_back_to_plain_json() {
        let record: InputRecord = [("f1", FeatureValue::from("b")), ("f3", FeatureValue::from(0.5))]
            .into_iter()
            .collect();
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"f1": "b", "f3": 0.5})
        );
    }

    #[test]
    fn category_text_canonicalizes_numbers() {
        assert_eq!(Scalar::Num(3.0).category_text().unwrap(), "3");
        assert_eq!(Scalar::Num(-0.0).category_text().unwrap(), "0");
        assert_eq!(Scalar::Num(2.5).category_text().unwrap(), "2.5");
        assert_eq!(Scalar::from("3.0").category_text().unwrap(), "3.0");
        assert_eq!(Scalar::Num(f64::NAN).category_text(), None);
        assert_eq!(Scalar::Num(f64::INFINITY).category_text(), None);
    }

    #[test]
    fn type_names() {
        assert_eq!(FeatureValue::Null.type_name(), "null");
        assert_eq!(FeatureValue::from("x").type_name(), "string");
        assert_eq!(FeatureValue::from(1.5).type_name(), "number");
        assert_eq!(FeatureValue::from(vec![1]).type_name(), "list");
        assert_eq!(FeatureValue::from(None::<f64>), FeatureValue::Null);
    }
}
