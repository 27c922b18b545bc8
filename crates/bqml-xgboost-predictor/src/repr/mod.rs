//! Native model representations.
//!
//! Foreign formats (see [`crate::compat`]) are converted into these types once
//! at load time; scoring only ever touches the native representation.

pub mod gbdt;
