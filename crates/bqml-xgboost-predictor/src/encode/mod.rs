//! Feature encoding.
//!
//! Converts loosely typed [`InputRecord`]s into the dense `[n_rows, width]`
//! matrix the ensemble consumes. Column order is fixed by the model's
//! [`FeatureSpec`](crate::metadata::FeatureSpec)s.
//!
//! | kind | null / absent | string | number | list |
//! |---|---|---|---|---|
//! | numeric | missing sentinel | parsed | value | error |
//! | categorical (one-hot) | all zero | lookup | canonical text, lookup | error |
//! | categorical (label) | NaN | index | as string | error |
//! | target_encoded | default | statistic or default | as string | error |
//! | multi_valued | all zero | error | error | count / presence |

mod encoder;
mod value;

pub use encoder::FeatureEncoder;
pub use value::{FeatureValue, InputRecord, Scalar};
