//! Block-based batch scoring of a [`Forest`].
//!
//! Rows are processed in blocks of [`DEFAULT_BLOCK_SIZE`] (matching XGBoost).
//! Within a block every tree is evaluated for all rows before moving to the
//! next tree, so a tree's nodes stay hot in cache while the block is scored.
//! Blocks are independent and may be scored in parallel.

use std::borrow::Cow;

use ndarray::{Array2, ArrayView2, ArrayViewMut2, Axis};

use crate::Parallelism;
use crate::repr::gbdt::Forest;

/// Default block size for batch processing (matches XGBoost).
pub const DEFAULT_BLOCK_SIZE: usize = 64;

/// Scores an encoded feature matrix against a forest.
#[derive(Debug, Clone, Copy)]
pub struct ForestScorer<'f> {
    forest: &'f Forest,
    block_size: usize,
}

impl<'f> ForestScorer<'f> {
    #[inline]
    pub fn new(forest: &'f Forest) -> Self {
        Self {
            forest,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    /// Set how many rows are scored together. Zero is treated as one.
    #[inline]
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn n_groups(&self) -> usize {
        self.forest.n_groups() as usize
    }

    /// Raw margins for every row.
    ///
    /// `features` is `[n_rows, n_features]`; the result is `[n_groups, n_rows]`.
    pub fn score(&self, features: ArrayView2<f32>, parallelism: Parallelism) -> Array2<f32> {
        let n_rows = features.nrows();
        let mut output = Array2::<f32>::zeros((self.n_groups(), n_rows));
        self.score_into(features, parallelism, output.view_mut());
        output
    }

    /// Write raw margins into a preallocated `[n_groups, n_rows]` buffer.
    pub fn score_into(
        &self,
        features: ArrayView2<f32>,
        parallelism: Parallelism,
        mut output: ArrayViewMut2<f32>,
    ) {
        assert_eq!(
            output.shape(),
            &[self.n_groups(), features.nrows()],
            "output shape must be (n_groups, n_rows)"
        );

        if features.nrows() == 0 {
            return;
        }

        for (mut group_row, &score) in output
            .axis_iter_mut(Axis(0))
            .zip(self.forest.base_score())
        {
            group_row.fill(score);
        }

        let feature_chunks = features.axis_chunks_iter(Axis(0), self.block_size);
        let output_chunks = output.axis_chunks_iter_mut(Axis(1), self.block_size);

        parallelism.maybe_par_bridge_for_each(
            feature_chunks.zip(output_chunks),
            |(feature_block, output_block)| self.score_block(feature_block, output_block),
        );
    }

    fn score_block(&self, features: ArrayView2<f32>, mut output: ArrayViewMut2<f32>) {
        let rows: Vec<Cow<'_, [f32]>> = features
            .rows()
            .into_iter()
            .map(|row| match row.to_slice() {
                Some(slice) => Cow::Borrowed(slice),
                None => Cow::Owned(row.to_vec()),
            })
            .collect();

        for (tree, group, weight) in self.forest.weighted_trees() {
            let mut group_row = output.row_mut(group as usize);
            for (out, row) in group_row.iter_mut().zip(&rows) {
                *out += tree.predict_row(row) * weight;
            }
        }
    }
}
