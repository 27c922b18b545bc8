//! Ensemble scoring.
//!
//! Turns an encoded feature matrix into raw margins of shape
//! `[n_groups, n_rows]`. Normalization into probabilities happens later in
//! [`decode`](crate::decode).

mod scorer;

pub use scorer::{DEFAULT_BLOCK_SIZE, ForestScorer};
