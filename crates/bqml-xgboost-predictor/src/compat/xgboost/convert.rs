//! Conversion from XGBoost JSON types to the native forest.

use std::collections::HashMap;

use crate::repr::gbdt::{CategoriesStorage, Forest, ForestValidationError, SplitType, Tree};

use super::json::{GradientBooster, Tree as XgbTree, XgbModel};

/// Error type for XGBoost model conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("booster '{0}' is not a tree ensemble")]
    NotATreeBooster(&'static str),
    #[error("models with {0} targets are not supported")]
    MultiTarget(i64),
    #[error("gbtree_model_param declares {declared} trees but the model has {actual}")]
    TreeCountMismatch { declared: i64, actual: usize },
    #[error("tree {0} has no nodes")]
    EmptyTree(usize),
    #[error("tree {tree}: array '{field}' has {actual} entries, expected {expected}")]
    ArrayLengthMismatch {
        tree: usize,
        field: &'static str,
        actual: usize,
        expected: usize,
    },
    #[error(
        "invalid node index in tree {tree}: node {node} references child {child} but tree has {num_nodes} nodes"
    )]
    InvalidNodeIndex {
        tree: usize,
        node: usize,
        child: i32,
        num_nodes: usize,
    },
    #[error("tree {tree}: node {node} splits on negative feature index {index}")]
    InvalidFeatureIndex { tree: usize, node: usize, index: i32 },
    #[error("tree {tree}: categorical segment for node {node} is out of range")]
    InvalidCategories { tree: usize, node: usize },
    #[error("dart weight_drop has {actual} entries for {expected} trees")]
    DartWeightsMismatch { actual: usize, expected: usize },
    #[error("converted forest is invalid: {0}")]
    InvalidForest(#[from] ForestValidationError),
}

/// Convert base_score from probability space to margin space based on objective.
///
/// XGBoost stores base_score in the output space of the objective; trees add
/// to the margin. This replicates XGBoost's `ProbToMargin`.
pub fn prob_to_margin(base_score: f32, objective: &str) -> f32 {
    match objective {
        "binary:logistic" | "binary:logitraw" | "reg:logistic" => {
            let p = base_score.clamp(1e-7, 1.0 - 1e-7);
            (p / (1.0 - p)).ln()
        }
        "count:poisson" | "reg:gamma" | "reg:tweedie" => base_score.max(1e-7).ln(),
        _ => base_score,
    }
}

impl XgbModel {
    /// Convert to a native [`Forest`].
    ///
    /// Supports gbtree and dart boosters. DART per-tree weights are carried
    /// on the forest so scoring applies them.
    pub fn to_forest(&self) -> Result<Forest, ConversionError> {
        let (model_trees, tree_weights) = match &self.learner.gradient_booster {
            GradientBooster::Gbtree { model } => (model, None),
            GradientBooster::Dart {
                gbtree,
                weight_drop,
            } => (&gbtree.model, Some(weight_drop)),
            other @ GradientBooster::Gblinear { .. } => {
                return Err(ConversionError::NotATreeBooster(other.name()));
            }
        };

        let num_target = self.learner.learner_model_param.num_target;
        if num_target > 1 {
            return Err(ConversionError::MultiTarget(num_target));
        }
        let declared = model_trees.gbtree_model_param.num_trees;
        if declared != model_trees.num_trees() as i64 {
            return Err(ConversionError::TreeCountMismatch {
                declared,
                actual: model_trees.num_trees(),
            });
        }

        let n_groups = self.n_groups();
        let margin_base_score = prob_to_margin(
            self.learner.learner_model_param.base_score,
            self.objective_name(),
        );
        let mut forest =
            Forest::new(n_groups).with_base_score(vec![margin_base_score; n_groups as usize]);

        if let Some(weights) = tree_weights {
            if weights.len() != model_trees.num_trees() {
                return Err(ConversionError::DartWeightsMismatch {
                    actual: weights.len(),
                    expected: model_trees.num_trees(),
                });
            }
            forest = forest.with_tree_weights(weights.clone());
        }

        for (tree_idx, xgb_tree) in model_trees.trees.iter().enumerate() {
            // Trees without tree_info belong to group 0 (single-output models).
            let group = model_trees.tree_info.get(tree_idx).copied().unwrap_or(0).max(0) as u32;
            if group >= n_groups {
                return Err(ForestValidationError::TreeGroupOutOfRange {
                    tree_idx,
                    group,
                    n_groups,
                }
                .into());
            }
            let tree = convert_tree(xgb_tree, tree_idx)?;
            forest.push_tree(tree, group);
        }

        forest.validate()?;
        Ok(forest)
    }
}

fn check_len(
    tree: usize,
    field: &'static str,
    actual: usize,
    expected: usize,
) -> Result<(), ConversionError> {
    if actual < expected {
        return Err(ConversionError::ArrayLengthMismatch {
            tree,
            field,
            actual,
            expected,
        });
    }
    Ok(())
}

/// Convert a single XGBoost tree to a native [`Tree`].
fn convert_tree(xgb_tree: &XgbTree, tree_idx: usize) -> Result<Tree, ConversionError> {
    let num_nodes = xgb_tree.tree_param.num_nodes.max(0) as usize;
    if num_nodes == 0 {
        return Err(ConversionError::EmptyTree(tree_idx));
    }

    check_len(tree_idx, "left_children", xgb_tree.left_children.len(), num_nodes)?;
    check_len(tree_idx, "right_children", xgb_tree.right_children.len(), num_nodes)?;
    check_len(tree_idx, "split_indices", xgb_tree.split_indices.len(), num_nodes)?;
    check_len(tree_idx, "default_left", xgb_tree.default_left.len(), num_nodes)?;
    if xgb_tree.split_conditions.len() < num_nodes {
        check_len(tree_idx, "base_weights", xgb_tree.base_weights.len(), num_nodes)?;
    }

    let categorical_map = build_categorical_map(xgb_tree, tree_idx)?;

    let mut split_indices = vec![0u32; num_nodes];
    let mut thresholds = vec![0.0f32; num_nodes];
    let mut left_children = vec![0u32; num_nodes];
    let mut right_children = vec![0u32; num_nodes];
    let mut default_left = vec![false; num_nodes];
    let mut is_leaf = vec![false; num_nodes];
    let mut leaf_values = vec![0.0f32; num_nodes];
    let mut split_types = vec![SplitType::Numeric; num_nodes];
    let mut node_categories = vec![Vec::new(); num_nodes];

    for node in 0..num_nodes {
        let left = xgb_tree.left_children[node];
        let right = xgb_tree.right_children[node];

        // XGBoost marks leaves with left_child == -1.
        if left == -1 {
            is_leaf[node] = true;
            // split_conditions carries the learning-rate-scaled leaf value.
            leaf_values[node] = xgb_tree
                .split_conditions
                .get(node)
                .or_else(|| xgb_tree.base_weights.get(node))
                .copied()
                .unwrap_or_default();
            continue;
        }

        for child in [left, right] {
            if child < 0 || child as usize >= num_nodes {
                return Err(ConversionError::InvalidNodeIndex {
                    tree: tree_idx,
                    node,
                    child,
                    num_nodes,
                });
            }
        }

        let index = xgb_tree.split_indices[node];
        if index < 0 {
            return Err(ConversionError::InvalidFeatureIndex {
                tree: tree_idx,
                node,
                index,
            });
        }

        split_indices[node] = index as u32;
        left_children[node] = left as u32;
        right_children[node] = right as u32;
        default_left[node] = xgb_tree.default_left[node] != 0;
        split_types[node] = xgb_tree.split_type.get(node).copied().unwrap_or(0).into();

        match split_types[node] {
            SplitType::Numeric => {
                thresholds[node] = xgb_tree.split_conditions.get(node).copied().unwrap_or_default();
            }
            SplitType::Categorical => {
                node_categories[node] = categorical_map.get(&node).cloned().unwrap_or_default();
            }
        }
    }

    let categories = CategoriesStorage::from_node_categories(&node_categories);

    Ok(Tree::new(
        split_indices,
        thresholds,
        left_children,
        right_children,
        default_left,
        is_leaf,
        leaf_values,
        split_types,
        categories,
    ))
}

/// Build a map from node index to the category values that go right.
///
/// XGBoost JSON stores categorical splits in parallel arrays:
/// - `categories_nodes`: node indices with categorical splits
/// - `categories_segments`: start index into `categories` for each node
/// - `categories_sizes`: number of category values for each node
/// - `categories`: flat array of category values
fn build_categorical_map(
    xgb_tree: &XgbTree,
    tree_idx: usize,
) -> Result<HashMap<usize, Vec<u32>>, ConversionError> {
    let mut map = HashMap::new();

    for (i, &node) in xgb_tree.categories_nodes.iter().enumerate() {
        let node = node.max(0) as usize;
        let invalid = || ConversionError::InvalidCategories {
            tree: tree_idx,
            node,
        };

        let start = *xgb_tree.categories_segments.get(i).ok_or_else(invalid)?;
        let size = *xgb_tree.categories_sizes.get(i).ok_or_else(invalid)?;
        let start = usize::try_from(start).map_err(|_| invalid())?;
        let size = usize::try_from(size).map_err(|_| invalid())?;
        let values = xgb_tree
            .categories
            .get(start..start + size)
            .ok_or_else(invalid)?;

        map.insert(node, values.iter().map(|&c| c.max(0) as u32).collect());
    }

    Ok(map)
}
