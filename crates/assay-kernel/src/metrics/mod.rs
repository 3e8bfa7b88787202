//! Pure metric functions, grouped by applicability class.
//!
//! The typed functions in [`classification`], [`clustering`] and
//! [`regression`] operate on labels or floats. The catalog binds them to the
//! uniform [`MetricFn`] signature through the adapters at the bottom of this
//! module.

pub mod classification;
pub mod clustering;
pub mod regression;

use crate::config::MetricConfig;
use crate::error::MetricError;
use crate::record::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Result alias for metric functions.
pub type Result<T> = std::result::Result<T, MetricError>;

/// Uniform metric signature: `(y_true, y_pred, config) -> score`.
pub type MetricFn = fn(&[Value], &[Value], &MetricConfig) -> Result<f64>;

/// Which estimator class a metric is valid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricClass {
    Classification,
    Clustering,
    Regression,
}

impl MetricClass {
    pub const ALL: [MetricClass; 3] = [
        MetricClass::Classification,
        MetricClass::Clustering,
        MetricClass::Regression,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricClass::Classification => "classification",
            MetricClass::Clustering => "clustering",
            MetricClass::Regression => "regression",
        }
    }
}

impl fmt::Display for MetricClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MetricClass {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "classification" => Ok(MetricClass::Classification),
            "clustering" => Ok(MetricClass::Clustering),
            "regression" => Ok(MetricClass::Regression),
            other => Err(format!(
                "unknown metric class `{other}`; use classification, clustering or regression"
            )),
        }
    }
}

pub(crate) fn check_lengths(len_true: usize, len_pred: usize) -> Result<()> {
    if len_true != len_pred {
        return Err(MetricError::LengthMismatch(len_true, len_pred));
    }
    if len_true == 0 {
        return Err(MetricError::Empty);
    }
    Ok(())
}

/// Order labels numerically when both parse as numbers, otherwise
/// lexicographically, with numbers first.
pub(crate) fn label_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Distinct labels in sorted order.
pub fn sorted_labels<'a>(labels: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut out: Vec<String> = labels.into_iter().cloned().collect();
    out.sort_by(|a, b| label_order(a, b));
    out.dedup();
    out
}

pub(crate) fn to_labels(values: &[Value]) -> Result<Vec<String>> {
    values
        .iter()
        .map(|value| {
            value
                .label()
                .ok_or_else(|| MetricError::InvalidInput(format!("`{value}` is not a label")))
        })
        .collect()
}

pub(crate) fn to_floats(values: &[Value]) -> Result<Vec<f64>> {
    values
        .iter()
        .map(|value| {
            value
                .as_f64()
                .ok_or_else(|| MetricError::InvalidInput(format!("`{value}` is not numeric")))
        })
        .collect()
}

pub(crate) fn to_vectors(values: &[Value]) -> Result<Vec<Vec<f64>>> {
    values
        .iter()
        .map(|value| match value {
            Value::Vector(v) => Ok(v.clone()),
            other => Err(MetricError::InvalidInput(format!(
                "`{other}` is not a score vector"
            ))),
        })
        .collect()
}

// Adapters binding typed metrics to `MetricFn`.

pub(crate) fn labels_metric(
    y_true: &[Value],
    y_pred: &[Value],
    f: fn(&[String], &[String]) -> Result<f64>,
) -> Result<f64> {
    f(&to_labels(y_true)?, &to_labels(y_pred)?)
}

pub(crate) fn floats_metric(
    y_true: &[Value],
    y_pred: &[Value],
    f: fn(&[f64], &[f64]) -> Result<f64>,
) -> Result<f64> {
    f(&to_floats(y_true)?, &to_floats(y_pred)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_labels_sort_numerically() {
        let labels: Vec<String> = ["10", "2", "b", "a", "2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(sorted_labels(&labels), vec!["2", "10", "a", "b"]);
    }

    #[test]
    fn metric_class_round_trips_through_str() {
        for class in MetricClass::ALL {
            assert_eq!(class.as_str().parse::<MetricClass>(), Ok(class));
        }
        assert!("ranking".parse::<MetricClass>().is_err());
    }
}
