//! Model kind and task metadata.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Model types exported by BigQuery ML that are served from XGBoost boosters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    BoostedTreeRegressor,
    BoostedTreeClassifier,
    RandomForestRegressor,
    RandomForestClassifier,
}

impl ModelType {
    /// Parse the `model_type` string of the metadata file.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "boosted_tree_regressor" => Some(Self::BoostedTreeRegressor),
            "boosted_tree_classifier" => Some(Self::BoostedTreeClassifier),
            "random_forest_regressor" => Some(Self::RandomForestRegressor),
            "random_forest_classifier" => Some(Self::RandomForestClassifier),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BoostedTreeRegressor => "boosted_tree_regressor",
            Self::BoostedTreeClassifier => "boosted_tree_classifier",
            Self::RandomForestRegressor => "random_forest_regressor",
            Self::RandomForestClassifier => "random_forest_classifier",
        }
    }

    #[inline]
    pub fn is_classifier(&self) -> bool {
        matches!(
            self,
            Self::BoostedTreeClassifier | Self::RandomForestClassifier
        )
    }

    /// Whether an XGBoost objective can back this model type.
    pub fn accepts_objective(&self, objective: &str) -> bool {
        self.is_classifier() == is_classification_objective(objective)
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Objectives whose outputs are class scores.
pub fn is_classification_objective(objective: &str) -> bool {
    matches!(
        objective,
        "binary:logistic" | "binary:logitraw" | "multi:softprob" | "multi:softmax"
    )
}

/// Type of prediction task, which decides the shape of decoded output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskKind {
    /// Regression (continuous target).
    #[default]
    Regression,
    /// Binary classification: one output group, probabilities `[1 - p, p]`.
    BinaryClassification,
    /// Multi-class classification: one output group per class.
    MulticlassClassification {
        /// Number of classes.
        n_classes: usize,
    },
}

impl TaskKind {
    /// Task implied by a model type and the ensemble's output group count.
    pub fn resolve(model_type: ModelType, n_groups: usize) -> Self {
        match (model_type.is_classifier(), n_groups) {
            (false, _) => Self::Regression,
            (true, 0 | 1) => Self::BinaryClassification,
            (true, n_classes) => Self::MulticlassClassification { n_classes },
        }
    }

    /// Returns the number of output groups for this task.
    pub fn n_groups(&self) -> usize {
        match self {
            Self::Regression | Self::BinaryClassification => 1,
            Self::MulticlassClassification { n_classes } => *n_classes,
        }
    }

    /// Number of class probabilities produced per row (0 for regression).
    pub fn n_probabilities(&self) -> usize {
        match self {
            Self::Regression => 0,
            Self::BinaryClassification => 2,
            Self::MulticlassClassification { n_classes } => *n_classes,
        }
    }

    pub fn is_regression(&self) -> bool {
        matches!(self, Self::Regression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("boosted_tree_regressor", ModelType::BoostedTreeRegressor)]
    #[case("boosted_tree_classifier", ModelType::BoostedTreeClassifier)]
    #[case("random_forest_regressor", ModelType::RandomForestRegressor)]
    #[case("random_forest_classifier", ModelType::RandomForestClassifier)]
    fn model_type_round_trips_name(#[case] name: &str, #[case] expected: ModelType) {
        let parsed = ModelType::parse(name).unwrap();
        assert_eq!(parsed, expected);
        assert_eq!(parsed.to_string(), name);
    }

    #[test]
    fn unknown_model_type() {
        assert_eq!(ModelType::parse("kmeans"), None);
        assert_eq!(ModelType::parse(""), None);
    }

    #[test]
    fn objective_agreement() {
        assert!(ModelType::BoostedTreeClassifier.accepts_objective("multi:softprob"));
        assert!(ModelType::RandomForestClassifier.accepts_objective("binary:logistic"));
        assert!(!ModelType::BoostedTreeClassifier.accepts_objective("reg:squarederror"));
        assert!(ModelType::BoostedTreeRegressor.accepts_objective("reg:squarederror"));
        assert!(ModelType::BoostedTreeRegressor.accepts_objective("count:poisson"));
        assert!(!ModelType::RandomForestRegressor.accepts_objective("multi:softmax"));
    }

    #[test]
    fn task_resolution() {
        assert_eq!(
            TaskKind::resolve(ModelType::BoostedTreeRegressor, 1),
            TaskKind::Regression
        );
        assert_eq!(
            TaskKind::resolve(ModelType::BoostedTreeClassifier, 1),
            TaskKind::BinaryClassification
        );
        let multi = TaskKind::resolve(ModelType::BoostedTreeClassifier, 3);
        assert_eq!(multi, TaskKind::MulticlassClassification { n_classes: 3 });
        assert_eq!(multi.n_groups(), 3);
        assert_eq!(multi.n_probabilities(), 3);
        assert_eq!(TaskKind::BinaryClassification.n_groups(), 1);
        assert_eq!(TaskKind::BinaryClassification.n_probabilities(), 2);
        assert!(TaskKind::Regression.is_regression());
    }
}
