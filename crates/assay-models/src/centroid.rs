//! Nearest-centroid classifier.

use crate::linalg::{check_width, nearest};
use assay_kernel::{Estimator, EstimatorError, EstimatorKind, Predictor, Value};
use serde::{Deserialize, Serialize};

/// Assigns each row the label of the closest class mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestCentroid {
    /// Class labels in order of first appearance.
    pub classes: Vec<Value>,
    pub centroids: Vec<Vec<f64>>,
}

impl NearestCentroid {
    pub fn fit(rows: &[Vec<f64>], labels: &[Value]) -> Result<Self, EstimatorError> {
        if rows.is_empty() || rows.len() != labels.len() {
            return Err(EstimatorError::Failed(format!(
                "need matching non-empty rows and labels, got {} and {}",
                rows.len(),
                labels.len()
            )));
        }
        let width = rows[0].len();
        check_width(rows, width)?;

        let mut classes: Vec<(String, Value)> = Vec::new();
        let mut sums: Vec<Vec<f64>> = Vec::new();
        let mut counts: Vec<usize> = Vec::new();
        for (row, label) in rows.iter().zip(labels) {
            let key = label
                .label()
                .ok_or_else(|| EstimatorError::Failed(format!("`{label}` is not a class label")))?;
            let index = match classes.iter().position(|(k, _)| *k == key) {
                Some(index) => index,
                None => {
                    classes.push((key, label.clone()));
                    sums.push(vec![0.0; width]);
                    counts.push(0);
                    classes.len() - 1
                }
            };
            for (sum, x) in sums[index].iter_mut().zip(row) {
                *sum += x;
            }
            counts[index] += 1;
        }

        let centroids = sums
            .into_iter()
            .zip(&counts)
            .map(|(sum, &count)| sum.into_iter().map(|s| s / count as f64).collect())
            .collect();
        Ok(Self {
            classes: classes.into_iter().map(|(_, value)| value).collect(),
            centroids,
        })
    }
}

impl Predictor for NearestCentroid {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<Value>, EstimatorError> {
        let width = self.centroids.first().map_or(0, Vec::len);
        check_width(rows, width)?;
        rows.iter()
            .map(|row| {
                nearest(row, &self.centroids)
                    .map(|index| self.classes[index].clone())
                    .ok_or(EstimatorError::NotFitted)
            })
            .collect()
    }
}

impl Estimator for NearestCentroid {
    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Classifier
    }

    fn predictor(&self) -> Option<&dyn Predictor> {
        Some(self)
    }

    /// Mean accuracy on `(rows, targets)`.
    fn native_score(&self, rows: &[Vec<f64>], targets: &[Value]) -> Result<f64, EstimatorError> {
        if targets.is_empty() || rows.len() != targets.len() {
            return Err(EstimatorError::Failed(format!(
                "need matching non-empty rows and targets, got {} and {}",
                rows.len(),
                targets.len()
            )));
        }
        let predicted = self.predict(rows)?;
        let hits = predicted
            .iter()
            .zip(targets)
            .filter(|(p, t)| p.label().is_some() && p.label() == t.label())
            .count();
        Ok(hits as f64 / targets.len() as f64)
    }
}
