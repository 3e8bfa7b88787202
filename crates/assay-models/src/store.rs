//! Directory-backed model handle.
//!
//! ```text
//! <dir>/config.json   ModelConfig (features, predict, tcluster)
//! <dir>/model.json    TrainedState, present once the model is trained
//! ```

use crate::centroid::NearestCentroid;
use crate::cluster::{Agglomerative, DEFAULT_MAX_ITER, KMeans};
use crate::linear::LinearRegression;
use assay_kernel::{
    Estimator, EstimatorError, Model, ModelConfig, Record, ScoreError, ScoreResult, Value,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_FILE: &str = "config.json";
pub const MODEL_FILE: &str = "model.json";

/// Persisted trained estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "estimator", rename_all = "snake_case")]
pub enum TrainedState {
    LinearRegression(LinearRegression),
    NearestCentroid(NearestCentroid),
    KMeans(KMeans),
    Agglomerative(Agglomerative),
}

impl TrainedState {
    pub fn estimator(&self) -> &dyn Estimator {
        match self {
            TrainedState::LinearRegression(model) => model,
            TrainedState::NearestCentroid(model) => model,
            TrainedState::KMeans(model) => model,
            TrainedState::Agglomerative(model) => model,
        }
    }
}

fn default_max_iter() -> usize {
    DEFAULT_MAX_ITER
}

/// Which reference estimator to fit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "estimator", rename_all = "snake_case")]
pub enum TrainSpec {
    LinearRegression,
    NearestCentroid,
    KMeans {
        n_clusters: usize,
        #[serde(default = "default_max_iter")]
        max_iter: usize,
    },
    Agglomerative {
        n_clusters: usize,
    },
}

/// Fit a reference estimator on `records` under `config`.
pub fn train(
    records: &[Record],
    config: &ModelConfig,
    spec: &TrainSpec,
) -> Result<TrainedState, ModelStoreError> {
    let rows = records
        .iter()
        .map(|record| config.features.flatten(record))
        .collect::<ScoreResult<Vec<_>>>()?;

    let state = match spec {
        TrainSpec::LinearRegression => {
            let targets = supervised_targets(records, config)?
                .iter()
                .map(|value| {
                    value.as_f64().ok_or_else(|| {
                        EstimatorError::Failed(format!("target `{value}` is not numeric"))
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;
            TrainedState::LinearRegression(LinearRegression::fit(&rows, &targets)?)
        }
        TrainSpec::NearestCentroid => {
            let labels = supervised_targets(records, config)?;
            TrainedState::NearestCentroid(NearestCentroid::fit(&rows, &labels)?)
        }
        TrainSpec::KMeans {
            n_clusters,
            max_iter,
        } => TrainedState::KMeans(KMeans::fit(&rows, *n_clusters, *max_iter)?),
        TrainSpec::Agglomerative { n_clusters } => {
            TrainedState::Agglomerative(Agglomerative::fit(&rows, *n_clusters)?)
        }
    };
    info!(records = records.len(), "trained {spec:?}");
    Ok(state)
}

fn supervised_targets(records: &[Record], config: &ModelConfig) -> ScoreResult<Vec<Value>> {
    let predict = config.predict.as_ref().ok_or(ScoreError::NoTargetFeature)?;
    records
        .iter()
        .map(|record| {
            record
                .feature(&predict.name)
                .cloned()
                .ok_or_else(|| ScoreError::MissingPrediction {
                    record: record.key.clone(),
                    feature: predict.name.clone(),
                })
        })
        .collect()
}

/// A model directory: configuration plus, once trained, persisted state.
#[derive(Debug, Clone)]
pub struct DirectoryModel {
    directory: PathBuf,
    config: ModelConfig,
    state: Option<TrainedState>,
    digest: Option<String>,
}

impl DirectoryModel {
    /// Create `directory` holding `config` and no trained state.
    pub fn create(
        directory: impl Into<PathBuf>,
        config: ModelConfig,
    ) -> Result<Self, ModelStoreError> {
        let directory = directory.into();
        fs::create_dir_all(&directory).map_err(|e| ModelStoreError::io(&directory, e))?;
        write_json(&directory.join(CONFIG_FILE), &config)?;
        Ok(Self {
            directory,
            config,
            state: None,
            digest: None,
        })
    }

    /// Load a model directory. A missing `model.json` leaves the model
    /// untrained; an unreadable one is an error.
    pub fn load(directory: impl Into<PathBuf>) -> Result<Self, ModelStoreError> {
        let directory = directory.into();
        let (config, _) = read_json::<ModelConfig>(&directory.join(CONFIG_FILE))?;

        let model_path = directory.join(MODEL_FILE);
        let (state, digest) = if model_path.is_file() {
            let (state, digest) = read_json::<TrainedState>(&model_path)?;
            (Some(state), Some(digest))
        } else {
            (None, None)
        };
        debug!(
            directory = %directory.display(),
            trained = state.is_some(),
            "model directory loaded"
        );

        Ok(Self {
            directory,
            config,
            state,
            digest,
        })
    }

    /// Persist `state` as this model's trained state.
    pub fn save(&mut self, state: TrainedState) -> Result<(), ModelStoreError> {
        let digest = write_json(&self.directory.join(MODEL_FILE), &state)?;
        info!(directory = %self.directory.display(), %digest, "trained state saved");
        self.state = Some(state);
        self.digest = Some(digest);
        Ok(())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn state(&self) -> Option<&TrainedState> {
        self.state.as_ref()
    }

    /// sha256 of `model.json` as loaded or saved.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }
}

impl Model for DirectoryModel {
    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn is_trained(&self) -> bool {
        self.state.is_some()
    }

    fn estimator(&self) -> ScoreResult<&dyn Estimator> {
        self.state
            .as_ref()
            .map(TrainedState::estimator)
            .ok_or(ScoreError::ModelNotTrained)
    }
}

fn digest_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<(T, String), ModelStoreError> {
    let bytes = fs::read(path).map_err(|e| ModelStoreError::io(path, e))?;
    let value = serde_json::from_slice(&bytes).map_err(|e| ModelStoreError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok((value, digest_hex(&bytes)))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<String, ModelStoreError> {
    let mut bytes =
        serde_json::to_vec_pretty(value).map_err(|e| ModelStoreError::Serialize(e.to_string()))?;
    bytes.push(b'\n');
    fs::write(path, &bytes).map_err(|e| ModelStoreError::io(path, e))?;
    Ok(digest_hex(&bytes))
}

/// Errors from the model directory.
#[derive(Debug, thiserror::Error)]
pub enum ModelStoreError {
    #[error("{path}: I/O error: {message}")]
    Io { path: String, message: String },

    #[error("{path}: parse error: {message}")]
    Parse { path: String, message: String },

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error(transparent)]
    Estimator(#[from] EstimatorError),
}

impl ModelStoreError {
    fn io(path: &Path, err: std::io::Error) -> Self {
        ModelStoreError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
