//! Canonical metric catalog.
//!
//! This module is the single authority mapping plugin ids to metric
//! functions and applicability classes. The table is static; the scorer
//! registry is built from it once.

use crate::config::{
    AVERAGED_FIELDS, ConfigField, LOG_LOSS_FIELDS, MetricConfig, NO_FIELDS, PROBABILITY_FIELDS,
    TOP_K_FIELDS,
};
use crate::error::{ScoreError, ScoreResult};
use crate::metrics::{
    self, MetricClass, MetricFn, Result, classification as cls, clustering as clu,
    floats_metric, labels_metric, regression as reg, sorted_labels, to_floats, to_labels,
    to_vectors,
};
use crate::record::Value;
use serde::Serialize;
use serde_json::{Value as Json, json};

/// One catalog row: plugin id, display name, applicability class, the
/// metric function, and the config fields the metric reads.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub class: MetricClass,
    #[serde(skip)]
    pub metric: MetricFn,
    pub config: &'static [ConfigField],
}

impl MetricDescriptor {
    /// Whether `other` describes the same scorer. Function pointers are not
    /// compared; the id, name, class and schema identify a descriptor.
    pub fn same_as(&self, other: &MetricDescriptor) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.class == other.class
            && self.config == other.config
    }
}

macro_rules! descriptor {
    ($id:literal, $name:literal, $class:ident, $metric:expr, $config:expr) => {
        MetricDescriptor {
            id: $id,
            name: $name,
            class: MetricClass::$class,
            metric: $metric,
            config: $config,
        }
    };
}

/// The canonical catalog, grouped by applicability class.
pub const CATALOG: &[MetricDescriptor] = &[
    // Classification
    descriptor!("accuracy_score", "AccuracyScore", Classification, accuracy, NO_FIELDS),
    descriptor!(
        "balanced_accuracy_score",
        "BalancedAccuracyScore",
        Classification,
        balanced_accuracy,
        NO_FIELDS
    ),
    descriptor!(
        "top_k_accuracy_score",
        "TopKAccuracyScore",
        Classification,
        top_k_accuracy,
        TOP_K_FIELDS
    ),
    descriptor!(
        "average_precision_score",
        "AveragePrecisionScore",
        Classification,
        average_precision,
        PROBABILITY_FIELDS
    ),
    descriptor!("brier_score_loss", "BrierScoreLoss", Classification, brier, PROBABILITY_FIELDS),
    descriptor!("f1_score", "F1Score", Classification, f1, AVERAGED_FIELDS),
    descriptor!("log_loss", "LogLoss", Classification, log_loss, LOG_LOSS_FIELDS),
    descriptor!("precision_score", "PrecisionScore", Classification, precision, AVERAGED_FIELDS),
    descriptor!("recall_score", "RecallScore", Classification, recall, AVERAGED_FIELDS),
    descriptor!("jaccard_score", "JaccardScore", Classification, jaccard, AVERAGED_FIELDS),
    descriptor!("roc_auc_score", "RocAucScore", Classification, roc_auc, PROBABILITY_FIELDS),
    // Clustering
    descriptor!(
        "adjusted_mutual_info_score",
        "AdjustedMutualInfoScore",
        Clustering,
        adjusted_mutual_info,
        NO_FIELDS
    ),
    descriptor!("adjusted_rand_score", "AdjustedRandScore", Clustering, adjusted_rand, NO_FIELDS),
    descriptor!("completeness_score", "CompletenessScore", Clustering, completeness, NO_FIELDS),
    descriptor!(
        "fowlkes_mallows_score",
        "FowlkesMallowsScore",
        Clustering,
        fowlkes_mallows,
        NO_FIELDS
    ),
    descriptor!("homogeneity_score", "HomogeneityScore", Clustering, homogeneity, NO_FIELDS),
    descriptor!("mutual_info_score", "MutualInfoScore", Clustering, mutual_info, NO_FIELDS),
    descriptor!(
        "normalized_mutual_info_score",
        "NormalizedMutualInfoScore",
        Clustering,
        normalized_mutual_info,
        NO_FIELDS
    ),
    descriptor!("rand_score", "RandScore", Clustering, rand, NO_FIELDS),
    descriptor!("v_measure_score", "VMeasureScore", Clustering, v_measure, NO_FIELDS),
    // Regression
    descriptor!(
        "explained_variance_score",
        "ExplainedVarianceScore",
        Regression,
        explained_variance,
        NO_FIELDS
    ),
    descriptor!("max_error", "MaxError", Regression, max_error, NO_FIELDS),
    descriptor!("mean_absolute_error", "MeanAbsoluteError", Regression, mae, NO_FIELDS),
    descriptor!("mean_squared_error", "MeanSquaredError", Regression, mse, NO_FIELDS),
    descriptor!("mean_squared_log_error", "MeanSquaredLogError", Regression, msle, NO_FIELDS),
    descriptor!(
        "median_absolute_error",
        "MedianAbsoluteError",
        Regression,
        median_ae,
        NO_FIELDS
    ),
    descriptor!("r2_score", "R2Score", Regression, r2, NO_FIELDS),
    descriptor!("mean_poisson_deviance", "MeanPoissonDeviance", Regression, poisson, NO_FIELDS),
    descriptor!("mean_gamma_deviance", "MeanGammaDeviance", Regression, gamma, NO_FIELDS),
    descriptor!(
        "mean_absolute_percentage_error",
        "MeanAbsolutePercentageError",
        Regression,
        mape,
        NO_FIELDS
    ),
];

pub fn lookup(id: &str) -> ScoreResult<&'static MetricDescriptor> {
    CATALOG
        .iter()
        .find(|descriptor| descriptor.id == id)
        .ok_or_else(|| ScoreError::NotFound(id.to_string()))
}

/// Catalog rows of one applicability class, in table order.
pub fn entries(class: MetricClass) -> impl Iterator<Item = &'static MetricDescriptor> {
    CATALOG.iter().filter(move |descriptor| descriptor.class == class)
}

pub const CATALOG_KIND: &str = "assay.metric_catalog.v1";

/// The raw metric table, without the estimator scorer.
pub fn catalog_json() -> Json {
    json!({
        "schema": 1,
        "catalogKind": CATALOG_KIND,
        "metrics": CATALOG,
    })
}

// Classification bindings.

fn accuracy(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    labels_metric(t, p, cls::accuracy_score)
}

fn balanced_accuracy(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    labels_metric(t, p, cls::balanced_accuracy_score)
}

fn class_labels(y_true: &[String], config: &MetricConfig) -> Vec<String> {
    match &config.labels {
        Some(labels) => labels.clone(),
        None => sorted_labels(y_true),
    }
}

fn top_k_accuracy(t: &[Value], p: &[Value], c: &MetricConfig) -> Result<f64> {
    let y_true = to_labels(t)?;
    let labels = class_labels(&y_true, c);
    cls::top_k_accuracy_score(&y_true, &to_vectors(p)?, c.k, &labels)
}

fn average_precision(t: &[Value], p: &[Value], c: &MetricConfig) -> Result<f64> {
    cls::average_precision_score(&to_labels(t)?, &to_floats(p)?, &c.pos_label)
}

fn brier(t: &[Value], p: &[Value], c: &MetricConfig) -> Result<f64> {
    cls::brier_score_loss(&to_labels(t)?, &to_floats(p)?, &c.pos_label)
}

fn log_loss(t: &[Value], p: &[Value], c: &MetricConfig) -> Result<f64> {
    let y_true = to_labels(t)?;
    if p.iter().all(|value| matches!(value, Value::Vector(_))) {
        let labels = class_labels(&y_true, c);
        cls::log_loss_multiclass(&y_true, &to_vectors(p)?, &labels, c.eps)
    } else {
        cls::log_loss_binary(&y_true, &to_floats(p)?, &c.pos_label, c.eps)
    }
}

fn f1(t: &[Value], p: &[Value], c: &MetricConfig) -> Result<f64> {
    cls::f1_score(&to_labels(t)?, &to_labels(p)?, c.average, &c.pos_label)
}

fn precision(t: &[Value], p: &[Value], c: &MetricConfig) -> Result<f64> {
    cls::precision_score(&to_labels(t)?, &to_labels(p)?, c.average, &c.pos_label)
}

fn recall(t: &[Value], p: &[Value], c: &MetricConfig) -> Result<f64> {
    cls::recall_score(&to_labels(t)?, &to_labels(p)?, c.average, &c.pos_label)
}

fn jaccard(t: &[Value], p: &[Value], c: &MetricConfig) -> Result<f64> {
    cls::jaccard_score(&to_labels(t)?, &to_labels(p)?, c.average, &c.pos_label)
}

fn roc_auc(t: &[Value], p: &[Value], c: &MetricConfig) -> Result<f64> {
    cls::roc_auc_score(&to_labels(t)?, &to_floats(p)?, &c.pos_label)
}

// Clustering bindings.

fn adjusted_mutual_info(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    labels_metric(t, p, clu::adjusted_mutual_info_score)
}

fn adjusted_rand(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    labels_metric(t, p, clu::adjusted_rand_score)
}

fn completeness(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    labels_metric(t, p, clu::completeness_score)
}

fn fowlkes_mallows(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    labels_metric(t, p, clu::fowlkes_mallows_score)
}

fn homogeneity(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    labels_metric(t, p, clu::homogeneity_score)
}

fn mutual_info(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    labels_metric(t, p, clu::mutual_info_score)
}

fn normalized_mutual_info(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    labels_metric(t, p, clu::normalized_mutual_info_score)
}

fn rand(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    labels_metric(t, p, clu::rand_score)
}

fn v_measure(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    labels_metric(t, p, clu::v_measure_score)
}

// Regression bindings.

fn explained_variance(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    floats_metric(t, p, reg::explained_variance_score)
}

fn max_error(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    floats_metric(t, p, reg::max_error)
}

fn mae(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    floats_metric(t, p, reg::mean_absolute_error)
}

fn mse(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    floats_metric(t, p, reg::mean_squared_error)
}

fn msle(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    floats_metric(t, p, reg::mean_squared_log_error)
}

fn median_ae(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    floats_metric(t, p, reg::median_absolute_error)
}

fn r2(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    floats_metric(t, p, reg::r2_score)
}

fn poisson(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    floats_metric(t, p, reg::mean_poisson_deviance)
}

fn gamma(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    floats_metric(t, p, reg::mean_gamma_deviance)
}

fn mape(t: &[Value], p: &[Value], _: &MetricConfig) -> Result<f64> {
    floats_metric(t, p, reg::mean_absolute_percentage_error)
}

/// Mutual information between two label columns, used by the estimator
/// scorer's ground-truth clusterer path.
pub(crate) fn mutual_info_values(y_true: &[Value], y_pred: &[Value]) -> Result<f64> {
    labels_metric(y_true, y_pred, metrics::clustering::mutual_info_score)
}

/// Silhouette over a feature matrix and label column, used by the
/// estimator scorer's ground-truth-free clusterer path.
pub(crate) fn silhouette_values(features: &[Vec<f64>], labels: &[Value]) -> Result<f64> {
    metrics::clustering::silhouette_score(features, &to_labels(labels)?)
}
