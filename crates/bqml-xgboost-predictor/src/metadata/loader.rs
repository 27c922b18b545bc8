//! Model directory loading.
//!
//! Reads `model_metadata.json`, resolves vocabulary files, parses the XGBoost
//! model and cross-checks the two. Either everything loads and validates or
//! a [`ModelLoadError`] is returned; nothing is half-initialized.

use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::compat::xgboost::{GradientBooster, XgbModel};
use crate::error::ModelLoadError;
use crate::model::{ModelType, OutputTransform, TaskKind};
use crate::repr::gbdt::Forest;

use super::features::{FeatureKind, FeatureSpec, LabelVocabulary, UnknownPolicy, Vocabulary};
use super::schema::{
    CategoricalParams, MultiValuedParams, NumericParams, RawFeature, RawMetadata,
    TargetEncodedParams, VocabularySource,
};

/// Everything loaded from a model directory.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub model_type: ModelType,
    pub task: TaskKind,
    pub label_col: String,
    /// Features in encoded column order.
    pub features: Vec<FeatureSpec>,
    /// Class names; `None` for regressors.
    pub labels: Option<LabelVocabulary>,
    pub forest: Forest,
    pub objective: String,
    pub transform: OutputTransform,
    /// Encoded row width.
    pub n_features: usize,
}

impl ModelArtifacts {
    /// Load a model directory.
    ///
    /// `metadata_file` and `model_files` are relative to `dir`. The first
    /// entry of `model_files` that exists is used.
    #[instrument(skip_all, fields(dir = %dir.display()))]
    pub fn load(
        dir: &Path,
        metadata_file: &Path,
        model_files: &[PathBuf],
    ) -> Result<Self, ModelLoadError> {
        if !dir.is_dir() {
            return Err(ModelLoadError::MissingFile {
                path: dir.to_path_buf(),
            });
        }

        let metadata_path = dir.join(metadata_file);
        debug!(path = %metadata_path.display(), "reading model metadata");
        let raw: RawMetadata = parse_json(&metadata_path, &read_file(&metadata_path)?)?;

        let model_type = ModelType::parse(&raw.model_type)
            .ok_or_else(|| ModelLoadError::UnknownModelType(raw.model_type.clone()))?;

        let asset_dir = metadata_path.parent().unwrap_or(dir);
        let missing_value = raw.missing_value.unwrap_or(f32::NAN);
        let features = build_features(&raw.features, asset_dir, missing_value)?;
        let n_features: usize = features.iter().map(FeatureSpec::width).sum();

        let labels = if model_type.is_classifier() {
            Some(build_labels(raw.class_names)?)
        } else {
            if raw.class_names.is_some() {
                debug!("ignoring class_names of a regression model");
            }
            None
        };

        let model_path = find_model_file(dir, model_files)?;
        debug!(path = %model_path.display(), "reading ensemble");
        let model = parse_model(&model_path)?;
        debug!(version = ?model.version, "parsed ensemble");

        if let GradientBooster::Gblinear { .. } = model.learner.gradient_booster {
            return Err(ModelLoadError::UnsupportedBooster(
                model.learner.gradient_booster.name().to_string(),
            ));
        }

        let objective = model.objective_name().to_string();
        if !model_type.accepts_objective(&objective) {
            return Err(ModelLoadError::ObjectiveMismatch {
                model_type: model_type.to_string(),
                objective,
            });
        }

        let forest = model.to_forest()?;
        check_width(&model, &forest, n_features)?;

        let task = TaskKind::resolve(model_type, forest.n_groups() as usize);
        let transform = OutputTransform::from_objective(&objective);
        debug!(%objective, ?transform, ?task, "selected output transform");

        info!(
            %model_type,
            n_input_features = features.len(),
            n_encoded_columns = n_features,
            n_trees = forest.n_trees(),
            n_classes = labels.as_ref().map_or(0, LabelVocabulary::len),
            "loaded model"
        );

        Ok(Self {
            model_type,
            task,
            label_col: raw.label_col,
            features,
            labels,
            forest,
            objective,
            transform,
            n_features,
        })
    }
}

// =============================================================================
// File access
// =============================================================================

fn read_file(path: &Path) -> Result<Vec<u8>, ModelLoadError> {
    std::fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ModelLoadError::MissingFile {
            path: path.to_path_buf(),
        },
        _ => ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

fn parse_json<T: for<'de> serde::Deserialize<'de>>(
    path: &Path,
    bytes: &[u8],
) -> Result<T, ModelLoadError> {
    serde_json::from_slice(bytes).map_err(|source| ModelLoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn find_model_file(dir: &Path, model_files: &[PathBuf]) -> Result<PathBuf, ModelLoadError> {
    model_files
        .iter()
        .map(|file| dir.join(file))
        .find(|path| path.is_file())
        .ok_or_else(|| ModelLoadError::MissingFile {
            path: model_files
                .first()
                .map_or_else(|| dir.to_path_buf(), |file| dir.join(file)),
        })
}

/// Parse an XGBoost JSON model. Legacy binary and UBJSON files are rejected.
fn parse_model(path: &Path) -> Result<XgbModel, ModelLoadError> {
    let bytes = read_file(path)?;
    let first = bytes.iter().find(|b| !b.is_ascii_whitespace());
    if first != Some(&b'{') {
        return Err(ModelLoadError::UnsupportedModelFormat {
            path: path.to_path_buf(),
        });
    }
    parse_json(path, &bytes)
}

/// One vocabulary entry per non-empty line.
fn read_vocabulary_file(path: &Path) -> Result<Vec<String>, ModelLoadError> {
    let bytes = read_file(path)?;
    let text = String::from_utf8(bytes).map_err(|e| ModelLoadError::Io {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidData, e),
    })?;
    Ok(text
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

// =============================================================================
// Feature specs
// =============================================================================

fn invalid(feature: &str, message: impl Display) -> ModelLoadError {
    ModelLoadError::InvalidMetadata(format!("feature '{feature}': {message}"))
}

fn build_features(
    raw_features: &[RawFeature],
    asset_dir: &Path,
    missing_value: f32,
) -> Result<Vec<FeatureSpec>, ModelLoadError> {
    if raw_features.is_empty() {
        return Err(ModelLoadError::InvalidMetadata(
            "metadata declares no features".to_string(),
        ));
    }

    let mut specs: Vec<FeatureSpec> = Vec::with_capacity(raw_features.len());
    let mut offset = 0;
    for raw in raw_features {
        if raw.name.is_empty() {
            return Err(ModelLoadError::InvalidMetadata(
                "feature with an empty name".to_string(),
            ));
        }
        if specs.iter().any(|spec| spec.name() == raw.name) {
            return Err(invalid(&raw.name, "declared more than once"));
        }

        let kind = build_kind(raw, asset_dir, missing_value)?;
        if kind.width() == 0 {
            return Err(invalid(&raw.name, "encodes to zero columns"));
        }
        let spec = FeatureSpec::new(raw.name.clone(), kind, offset);
        offset += spec.width();
        specs.push(spec);
    }
    Ok(specs)
}

fn build_kind(
    raw: &RawFeature,
    asset_dir: &Path,
    missing_value: f32,
) -> Result<FeatureKind, ModelLoadError> {
    let name = raw.name.as_str();
    match raw.kind.as_str() {
        "numeric" => {
            let params: NumericParams = raw.params().map_err(|e| invalid(name, e))?;
            Ok(FeatureKind::Numeric {
                missing: params.missing.unwrap_or(missing_value),
            })
        }
        "categorical" => {
            let params: CategoricalParams = raw.params().map_err(|e| invalid(name, e))?;
            Ok(FeatureKind::Categorical {
                vocabulary: load_vocabulary(name, params.source, asset_dir)?,
                encoding: params.encoding,
                unknown: params.unknown,
            })
        }
        "target_encoded" => {
            let params: TargetEncodedParams = raw.params().map_err(|e| invalid(name, e))?;
            let width = params.default.len();
            if width == 0 {
                return Err(invalid(name, "default statistic is empty"));
            }
            if let Some((category, _)) = params.statistics.iter().find(|(_, s)| s.len() != width) {
                return Err(invalid(
                    name,
                    format!("statistic for '{category}' does not have {width} values"),
                ));
            }
            Ok(FeatureKind::TargetEncoded {
                statistics: params
                    .statistics
                    .into_iter()
                    .map(|(category, stats)| (category, stats.into_boxed_slice()))
                    .collect(),
                default: params.default.into_boxed_slice(),
            })
        }
        "multi_valued" => {
            let params: MultiValuedParams = raw.params().map_err(|e| invalid(name, e))?;
            if params.unknown == UnknownPolicy::Missing {
                return Err(invalid(
                    name,
                    "multi_valued features accept unknown = zero or other",
                ));
            }
            Ok(FeatureKind::MultiValued {
                vocabulary: load_vocabulary(name, params.source, asset_dir)?,
                accumulate: params.accumulate,
                unknown: params.unknown,
            })
        }
        other => Err(ModelLoadError::UnknownFeatureKind {
            feature: raw.name.clone(),
            kind: other.to_string(),
        }),
    }
}

fn load_vocabulary(
    feature: &str,
    source: VocabularySource,
    asset_dir: &Path,
) -> Result<Vocabulary, ModelLoadError> {
    let entries = match (source.vocabulary, source.vocabulary_file) {
        (Some(entries), None) => entries,
        (None, Some(file)) => {
            let path = asset_dir.join(file);
            debug!(feature, path = %path.display(), "reading vocabulary file");
            read_vocabulary_file(&path)?
        }
        (Some(_), Some(_)) => {
            return Err(invalid(
                feature,
                "set either vocabulary or vocabulary_file, not both",
            ));
        }
        (None, None) => return Err(invalid(feature, "no vocabulary given")),
    };

    if entries.is_empty() {
        return Err(invalid(feature, "vocabulary is empty"));
    }
    Vocabulary::new(entries)
        .map_err(|dup| invalid(feature, format!("duplicate vocabulary entry '{dup}'")))
}

fn build_labels(class_names: Option<Vec<String>>) -> Result<LabelVocabulary, ModelLoadError> {
    let class_names = class_names.ok_or_else(|| {
        ModelLoadError::InvalidMetadata("classifier metadata must list class_names".to_string())
    })?;
    if class_names.len() < 2 {
        return Err(ModelLoadError::InvalidMetadata(format!(
            "classifier needs at least 2 class_names, got {}",
            class_names.len()
        )));
    }
    LabelVocabulary::new(class_names)
        .map_err(|dup| ModelLoadError::InvalidMetadata(format!("duplicate class name '{dup}'")))
}

/// The encoded row must cover what the ensemble reads.
fn check_width(model: &XgbModel, forest: &Forest, encoded: usize) -> Result<(), ModelLoadError> {
    let declared = model.n_features();
    if declared > 0 && declared != encoded {
        return Err(ModelLoadError::WidthMismatch {
            encoded,
            expected: declared,
        });
    }
    let used = forest.n_features_used();
    if used > encoded {
        return Err(ModelLoadError::WidthMismatch {
            encoded,
            expected: used,
        });
    }
    Ok(())
}
