//! XGBoost JSON model loading.
//!
//! Parses the JSON model format written by `Booster.save_model("model.json")`
//! and converts it to the native [`Forest`](crate::repr::gbdt::Forest).

mod convert;
mod json;

pub use convert::{ConversionError, prob_to_margin};
pub use json::{GradientBooster, LearnerModelParam, Objective, XgbModel};
