//! Error types for assay scoring operations.

use crate::capability::EstimatorCapability;
use crate::metrics::MetricClass;

/// Errors surfaced by the scoring subsystem.
///
/// Every variant is returned at the point of detection. None of them is
/// ever downgraded to a default score.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoreError {
    /// The model has no persisted trained state.
    #[error("model not trained: train model before assessing for accuracy")]
    ModelNotTrained,

    /// The capability probe could not classify the estimator, or the
    /// estimator cannot serve the requested scoring path.
    #[error("unsupported estimator: {0}")]
    UnsupportedEstimator(String),

    /// Zero records were streamed where at least one is required.
    #[error("empty dataset: no records streamed for scorer `{scorer}`")]
    EmptyDataset { scorer: String },

    /// A record lacks the requested prediction or target feature.
    #[error("record `{record}` is missing `{feature}`")]
    MissingPrediction { record: String, feature: String },

    /// Two metric descriptors claim the same plugin identifier.
    #[error("registry collision: plugin id `{0}` is already registered")]
    RegistryCollision(String),

    /// No scorer is registered under the requested name.
    #[error("scorer not found: `{0}`")]
    NotFound(String),

    /// The scorer's applicability class does not match the estimator.
    #[error("scorer `{scorer}` applies to {expected} estimators, model is {actual}")]
    CapabilityMismatch {
        scorer: String,
        expected: MetricClass,
        actual: EstimatorCapability,
    },

    /// The model config names no target feature for this scoring path.
    #[error("model config has no target feature (`predict` or `tcluster`)")]
    NoTargetFeature,

    /// Plugin identifiers must be lowercase snake case.
    #[error("invalid plugin id `{0}`: expected ^[a-z][a-z0-9_]*$")]
    InvalidPluginId(String),

    /// Scorer configuration values did not match the scorer's schema.
    #[error("invalid config for scorer `{scorer}`: {reason}")]
    InvalidConfig { scorer: String, reason: String },

    /// A feature value that must be numeric was not.
    #[error("record `{record}`: feature `{feature}` is not numeric")]
    NonNumericFeature { record: String, feature: String },

    /// A feature value's width differs from its declared length.
    #[error("record `{record}`: feature `{feature}` has width {actual}, expected {expected}")]
    FeatureShape {
        record: String,
        feature: String,
        expected: usize,
        actual: usize,
    },

    /// A scoring context was driven out of order.
    #[error("scoring context is {actual:?}, expected {expected:?}")]
    ContextState {
        expected: crate::context::ContextState,
        actual: crate::context::ContextState,
    },

    #[error(transparent)]
    Metric(#[from] MetricError),

    #[error(transparent)]
    Estimator(#[from] EstimatorError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// Errors from metric functions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MetricError {
    #[error("length mismatch between true and predicted values: {0} vs {1}")]
    LengthMismatch(usize, usize),

    #[error("cannot calculate with empty data")]
    Empty,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("value out of domain: {0}")]
    Domain(String),
}

/// Errors raised by estimator collaborators.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EstimatorError {
    #[error("estimator does not support `{0}`")]
    Unsupported(&'static str),

    #[error("estimator is not fitted")]
    NotFitted,

    #[error("feature width mismatch: expected {expected}, got {actual}")]
    Width { expected: usize, actual: usize },

    #[error("estimator failure: {0}")]
    Failed(String),
}

/// Errors raised by data-source collaborators.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    #[error("source I/O error: {0}")]
    Io(String),

    #[error("source record {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("corrupted source: {0}")]
    Corrupt(String),
}

/// Result alias used across the kernel.
pub type ScoreResult<T> = Result<T, ScoreError>;
