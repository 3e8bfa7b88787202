//! Collaborator contracts: trained estimators and the models that own them.
//!
//! The kernel never trains anything. A [`Model`] wraps configuration plus
//! (optionally) a trained [`Estimator`]; the scoring context only reads
//! through these traits.

use crate::error::{EstimatorError, ScoreError, ScoreResult};
use crate::feature::{Feature, Features};
use crate::record::{Prediction, Record, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What an estimator declares itself to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    Classifier,
    Regressor,
    Clusterer,
    Other(String),
}

impl fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimatorKind::Classifier => f.write_str("classifier"),
            EstimatorKind::Regressor => f.write_str("regressor"),
            EstimatorKind::Clusterer => f.write_str("clusterer"),
            EstimatorKind::Other(kind) => f.write_str(kind),
        }
    }
}

/// Prediction on data not seen during training.
pub trait Predictor: Send + Sync {
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<Value>, EstimatorError>;

    /// Predictions paired with a confidence. Deterministic estimators
    /// report full confidence.
    fn predict_with_confidence(
        &self,
        features: &[Vec<f64>],
    ) -> Result<Vec<Prediction>, EstimatorError> {
        Ok(self
            .predict(features)?
            .into_iter()
            .map(|value| Prediction::new(value, 1.0))
            .collect())
    }
}

/// A trained estimator.
pub trait Estimator: Send + Sync {
    fn kind(&self) -> EstimatorKind;

    /// The prediction operation, if this estimator is inductive.
    fn predictor(&self) -> Option<&dyn Predictor> {
        None
    }

    /// The estimator's own score on `(features, targets)`: mean accuracy
    /// for classifiers, R² for regressors.
    fn native_score(&self, features: &[Vec<f64>], targets: &[Value]) -> Result<f64, EstimatorError> {
        let _ = (features, targets);
        Err(EstimatorError::Unsupported("native_score"))
    }

    /// Labels assigned at training time. Only meaningful for transductive
    /// clusterers, which have no other way to label data.
    fn stored_training_labels(&self) -> Option<&[Value]> {
        None
    }
}

/// Model configuration consumed by the scoring context.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub features: Features,
    /// Target feature of supervised models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predict: Option<Feature>,
    /// Ground-truth cluster feature of clusterers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcluster: Option<Feature>,
}

impl ModelConfig {
    /// The feature predictions are stored under: `predict` when set,
    /// otherwise `tcluster`.
    pub fn target(&self) -> Option<&Feature> {
        self.predict.as_ref().or(self.tcluster.as_ref())
    }
}

/// A model handle: configuration plus persisted trained state.
pub trait Model: Send + Sync {
    fn config(&self) -> &ModelConfig;

    /// Whether the model has persisted trained state.
    fn is_trained(&self) -> bool;

    /// The trained estimator. Fails with [`ScoreError::ModelNotTrained`]
    /// when there is none.
    fn estimator(&self) -> ScoreResult<&dyn Estimator>;

    /// Copy of `record` carrying this model's prediction under the target
    /// feature name.
    fn predict_record(&self, record: &Record) -> ScoreResult<Record> {
        let config = self.config();
        let target = config.target().ok_or(ScoreError::NoTargetFeature)?;
        let estimator = self.estimator()?;
        let predictor = estimator.predictor().ok_or_else(|| {
            ScoreError::UnsupportedEstimator(format!(
                "{} has no predict operation",
                estimator.kind()
            ))
        })?;
        let row = config.features.flatten(record)?;
        let prediction = predictor
            .predict_with_confidence(&[row])?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ScoreError::Estimator(EstimatorError::Failed(
                    "predictor returned no rows".to_string(),
                ))
            })?;
        Ok(record.with_prediction(target.name.clone(), prediction))
    }
}
