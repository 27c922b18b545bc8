//! Canonical forest representation (collection of trees).

use super::Tree;
use super::tree::TreeValidationError;

/// Structural validation errors for [`Forest`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForestValidationError {
    #[error("base score has {len} entries for {n_groups} output groups")]
    BaseScoreLenMismatch { n_groups: u32, len: usize },
    #[error("tree {tree_idx} is assigned to group {group} but the forest has {n_groups} groups")]
    TreeGroupOutOfRange {
        tree_idx: usize,
        group: u32,
        n_groups: u32,
    },
    #[error("{len} tree weights for {n_trees} trees")]
    TreeWeightsLenMismatch { n_trees: usize, len: usize },
    #[error("tree {tree_idx}: {error}")]
    InvalidTree {
        tree_idx: usize,
        error: TreeValidationError,
    },
}

/// Forest of decision trees.
///
/// Stores trees with their output group assignments. Multi-class ensembles
/// have one group per class; regression and binary classification have one.
/// DART ensembles additionally carry one weight per tree.
#[derive(Debug, Clone)]
pub struct Forest {
    trees: Vec<Tree>,
    tree_groups: Vec<u32>,
    tree_weights: Option<Box<[f32]>>,
    n_groups: u32,
    base_score: Vec<f32>,
}

impl Forest {
    /// Create a new forest with the given number of groups.
    pub fn new(n_groups: u32) -> Self {
        Self {
            trees: Vec::new(),
            tree_groups: Vec::new(),
            tree_weights: None,
            n_groups,
            base_score: vec![0.0; n_groups as usize],
        }
    }

    /// Create a forest for regression (single output group).
    pub fn for_regression() -> Self {
        Self::new(1)
    }

    /// Set the base score (margin space) for all groups.
    pub fn with_base_score(mut self, base_score: Vec<f32>) -> Self {
        debug_assert_eq!(base_score.len(), self.n_groups as usize);
        self.base_score = base_score;
        self
    }

    /// Set per-tree weights (DART).
    pub fn with_tree_weights(mut self, weights: Vec<f32>) -> Self {
        self.tree_weights = Some(weights.into_boxed_slice());
        self
    }

    /// Add a tree to the forest.
    pub fn push_tree(&mut self, tree: Tree, group: u32) {
        debug_assert!(group < self.n_groups, "group out of range");
        self.trees.push(tree);
        self.tree_groups.push(group);
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[inline]
    pub fn n_groups(&self) -> u32 {
        self.n_groups
    }

    #[inline]
    pub fn base_score(&self) -> &[f32] {
        &self.base_score
    }

    #[inline]
    pub fn tree_weights(&self) -> Option<&[f32]> {
        self.tree_weights.as_deref()
    }

    /// Iterate over trees with their group assignments and weights.
    pub fn weighted_trees(&self) -> impl Iterator<Item = (&Tree, u32, f32)> {
        self.trees
            .iter()
            .zip(self.tree_groups.iter())
            .enumerate()
            .map(|(i, (tree, &group))| {
                let weight = self.tree_weights.as_ref().map_or(1.0, |w| w[i]);
                (tree, group, weight)
            })
    }

    /// Number of input columns the trees read: one past the largest split index.
    pub fn n_features_used(&self) -> usize {
        self.trees
            .iter()
            .filter_map(Tree::max_split_index)
            .max()
            .map_or(0, |max| max as usize + 1)
    }

    /// Predict raw margins for a single row of features.
    pub fn predict_row(&self, features: &[f32]) -> Vec<f32> {
        let mut output = self.base_score.clone();
        for (tree, group, weight) in self.weighted_trees() {
            output[group as usize] += tree.predict_row(features) * weight;
        }
        output
    }

    /// Validate structural invariants (trees, group assignments, base score, weights).
    pub fn validate(&self) -> Result<(), ForestValidationError> {
        if self.base_score.len() != self.n_groups as usize {
            return Err(ForestValidationError::BaseScoreLenMismatch {
                n_groups: self.n_groups,
                len: self.base_score.len(),
            });
        }

        if let Some(weights) = &self.tree_weights
            && weights.len() != self.trees.len()
        {
            return Err(ForestValidationError::TreeWeightsLenMismatch {
                n_trees: self.trees.len(),
                len: weights.len(),
            });
        }

        for (tree_idx, &group) in self.tree_groups.iter().enumerate() {
            if group >= self.n_groups {
                return Err(ForestValidationError::TreeGroupOutOfRange {
                    tree_idx,
                    group,
                    n_groups: self.n_groups,
                });
            }
        }

        for (tree_idx, tree) in self.trees.iter().enumerate() {
            tree.validate()
                .map_err(|error| ForestValidationError::InvalidTree { tree_idx, error })?;
        }

        Ok(())
    }
}
