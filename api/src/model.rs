//! Model Manager: owns the fitted transform and regressor for the process
//! lifetime and runs inference on validated records.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::info;

use crate::ensemble::TreeEnsemble;
use crate::preprocess::Preprocessor;
use crate::schema::PredictionRequest;

/// Failure to bring the artifact pair into memory. Always fatal for serving.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("model has no trees")]
    EmptyEnsemble,
    #[error("tree {0} has no nodes")]
    EmptyTree(usize),
    #[error("tree {0} node arrays have different lengths")]
    RaggedTree(usize),
    #[error("invalid node index in tree {tree}: node {node} references child {child} but tree has {num_nodes} nodes")]
    InvalidNodeIndex {
        tree: usize,
        node: usize,
        child: i32,
        num_nodes: usize,
    },
    #[error("tree {tree} node {node} splits on feature {feature} but model has {num_features} features")]
    InvalidSplitFeature {
        tree: usize,
        node: usize,
        feature: usize,
        num_features: usize,
    },
    #[error("preprocessing encodes unsupported columns: {0:?}")]
    UnsupportedColumns(Vec<String>),
    #[error("model expects features {expected:?} but preprocessing produces {actual:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
}

/// Failure while scoring a single record.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("unknown category '{value}' for {field}")]
    UnknownCategory { field: String, value: String },
    #[error("preprocessing column {0} has no matching request field")]
    UnsupportedColumn(String),
    #[error("model produced a non-finite prediction ({0})")]
    NonFinite(f64),
    #[error("record {index}: {source}")]
    Record {
        index: usize,
        #[source]
        source: Box<InferenceError>,
    },
}

impl InferenceError {
    /// Innermost error, skipping batch record wrappers.
    pub fn root(&self) -> &InferenceError {
        match self {
            InferenceError::Record { source, .. } => source.root(),
            other => other,
        }
    }
}

pub fn preprocessing_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}_preprocessing.json"))
}

pub fn model_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}_model.json"))
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = fs::read(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug)]
pub struct ModelManager {
    name: String,
    preprocessor: Preprocessor,
    regressor: TreeEnsemble,
}

impl ModelManager {
    /// Reads `<name>_preprocessing.json` and `<name>_model.json` from `dir`.
    pub fn load(dir: &Path, name: &str) -> Result<Self, ArtifactError> {
        let pre_path = preprocessing_path(dir, name);
        let model_path = model_path(dir, name);
        info!(path = %pre_path.display(), "loading preprocessing artifact");
        let preprocessor: Preprocessor = read_artifact(&pre_path)?;
        info!(path = %model_path.display(), "loading model artifact");
        let regressor: TreeEnsemble = read_artifact(&model_path)?;

        let manager = Self::from_parts(name, preprocessor, regressor)?;
        info!(
            model_name = name,
            trees = manager.regressor.trees.len(),
            features = manager.regressor.num_features(),
            "model artifacts loaded"
        );
        Ok(manager)
    }

    pub fn from_parts(
        name: impl Into<String>,
        preprocessor: Preprocessor,
        regressor: TreeEnsemble,
    ) -> Result<Self, ArtifactError> {
        let unsupported = preprocessor.unknown_columns();
        if !unsupported.is_empty() {
            return Err(ArtifactError::UnsupportedColumns(
                unsupported.into_iter().map(String::from).collect(),
            ));
        }
        regressor.validate()?;
        let actual = preprocessor.feature_names();
        if actual != regressor.feature_names {
            return Err(ArtifactError::FeatureMismatch {
                expected: regressor.feature_names.clone(),
                actual,
            });
        }
        Ok(Self {
            name: name.into(),
            preprocessor,
            regressor,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw model output for one record; may be negative.
    pub fn predict(&self, record: &PredictionRequest) -> Result<f64, InferenceError> {
        let features = self.preprocessor.transform(record)?;
        let value = self.regressor.predict_row(&features);
        if !value.is_finite() {
            return Err(InferenceError::NonFinite(value));
        }
        Ok(value)
    }

    /// Scores records in input order. The first failing record fails the batch.
    pub fn predict_batch(&self, records: &[PredictionRequest]) -> Result<Vec<f64>, InferenceError> {
        records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                self.predict(record).map_err(|e| InferenceError::Record {
                    index,
                    source: Box::new(e),
                })
            })
            .collect()
    }
}
