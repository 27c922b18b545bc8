//! Compatibility layers for foreign model formats.

pub mod xgboost;
