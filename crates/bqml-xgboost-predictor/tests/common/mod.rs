//! Test case loading utilities for integration tests.
//!
//! Each case under `tests/test-cases/bqml/{name}/` is a complete BigQuery ML
//! export (`model.json` + `assets/`) with an `input.json` batch and the
//! `expected.json` predictions for it.

#![allow(dead_code)]

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tempfile::TempDir;

use bqml_xgboost_predictor::InputRecord;

/// Tolerance for comparing probabilities and regression outputs.
pub const TOLERANCE: f32 = 1e-6;

// =============================================================================
// Test Case Loading
// =============================================================================

/// Base directory for test cases.
pub fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/test-cases")
}

/// Directory of a BQML model export.
pub fn model_dir(name: &str) -> PathBuf {
    test_cases_dir().join("bqml").join(name)
}

/// Load a JSON file and deserialize it.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> T {
    let file =
        File::open(path).unwrap_or_else(|e| panic!("Failed to open {}: {e}", path.display()));
    serde_json::from_reader(file)
        .unwrap_or_else(|e| panic!("Failed to parse {}: {e}", path.display()))
}

/// The input batch of a test case.
pub fn load_input(name: &str) -> Vec<InputRecord> {
    load_json(&model_dir(name).join("input.json"))
}

/// The expected output of a test case, deserialized into the caller's type.
pub fn load_expected<T: DeserializeOwned>(name: &str) -> T {
    load_json(&model_dir(name).join("expected.json"))
}

// =============================================================================
// Scratch Model Directories
// =============================================================================

/// Copy a test case into a temporary directory so a test can break it.
pub fn copy_model_dir(name: &str) -> TempDir {
    let src = model_dir(name);
    let dst = TempDir::new().expect("tempdir");
    copy_recursive(&src, dst.path());
    dst
}

fn copy_recursive(src: &Path, dst: &Path) {
    fs::create_dir_all(dst).expect("create dir");
    for entry in fs::read_dir(src).expect("read dir") {
        let entry = entry.expect("dir entry");
        let target = dst.join(entry.file_name());
        if entry.file_type().expect("file type").is_dir() {
            copy_recursive(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), &target).expect("copy file");
        }
    }
}

/// Write a model directory from metadata and model JSON.
pub fn write_model_dir(metadata: &Value, model: &Value) -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    fs::create_dir_all(dir.path().join("assets")).expect("assets dir");
    write_json(&dir.path().join("assets/model_metadata.json"), metadata);
    write_json(&dir.path().join("model.json"), model);
    dir
}

pub fn write_json(path: &Path, value: &Value) {
    fs::write(path, serde_json::to_vec_pretty(value).expect("serialize"))
        .unwrap_or_else(|e| panic!("Failed to write {}: {e}", path.display()));
}

/// Edit a JSON file in place.
pub fn edit_json(path: &Path, edit: impl FnOnce(&mut Value)) {
    let mut value: Value = load_json(path);
    edit(&mut value);
    write_json(path, &value);
}
