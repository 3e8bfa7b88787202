//! # Assay Kernel
//!
//! Scoring dispatch for trained estimators: a catalog of metric functions,
//! a registry turning each into an independently configurable scorer, and
//! a scoring context that picks the data-extraction path from the
//! estimator's capability.
//!
//! This crate does not train estimators or store records. It only
//! prescribes how a trained estimator is scored against a record stream.
//!
//! ## Architecture
//!
//! ```text
//! MetricCatalog         ← id → (y_true, y_pred, config) -> score
//!     │
//! ScorerRegistry        ← one Scorer per descriptor, plus estimator_score
//!     │
//! EstimatorCapability   ← Classifier | Regressor | Clusterer { inductive }
//!     │
//! ScoringContext        ← Idle → Opened → Scoring → Closed
//!     │
//! facade::score         ← resolve, check trained, open source, score
//! ```

pub mod capability;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod estimator;
pub mod facade;
pub mod feature;
pub mod metrics;
pub mod record;
pub mod registry;
pub mod source;

pub use capability::{EstimatorCapability, probe};
pub use catalog::{CATALOG, MetricDescriptor, catalog_json, lookup};
pub use config::{Average, ConfigField, ConfigKind, MetricConfig};
pub use context::{Advisory, ContextState, ScoringContext, ScoringResult};
pub use error::{EstimatorError, MetricError, ScoreError, ScoreResult, SourceError};
pub use estimator::{Estimator, EstimatorKind, Model, ModelConfig, Predictor};
pub use facade::{ScorerRef, score, score_report};
pub use feature::{Feature, FeatureType, Features};
pub use metrics::MetricClass;
pub use record::{Prediction, Record, Value};
pub use registry::{
    ESTIMATOR_SCORER_ID, Scorer, ScorerInfo, ScorerRegistry, ScorerRegistryBuilder, registry,
};
pub use source::{DataSource, MemorySource, RecordStream, SourceContext, SourceUsage};
