//! Ordinary least squares regression.

use crate::linalg::{check_width, matrix_inverse};
use assay_kernel::metrics::regression::r2_score;
use assay_kernel::{Estimator, EstimatorError, EstimatorKind, Predictor, Value};
use serde::{Deserialize, Serialize};

/// Linear regression with an intercept, fitted by the normal equations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearRegression {
    pub fn fit(rows: &[Vec<f64>], targets: &[f64]) -> Result<Self, EstimatorError> {
        if rows.is_empty() {
            return Err(EstimatorError::Failed("no data to train on".to_string()));
        }
        if rows.len() != targets.len() {
            return Err(EstimatorError::Failed(format!(
                "{} rows but {} targets",
                rows.len(),
                targets.len()
            )));
        }
        let width = rows[0].len();
        check_width(rows, width)?;

        // Design matrix with a leading intercept column.
        let design: Vec<Vec<f64>> = rows
            .iter()
            .map(|row| std::iter::once(1.0).chain(row.iter().copied()).collect())
            .collect();
        let dim = width + 1;

        let mut xtx = vec![vec![0.0; dim]; dim];
        let mut xty = vec![0.0; dim];
        for (row, y) in design.iter().zip(targets) {
            for i in 0..dim {
                xty[i] += row[i] * y;
                for j in 0..dim {
                    xtx[i][j] += row[i] * row[j];
                }
            }
        }

        let inverse = matrix_inverse(&xtx)?;
        let beta: Vec<f64> = inverse
            .iter()
            .map(|row| row.iter().zip(&xty).map(|(a, b)| a * b).sum())
            .collect();

        Ok(Self {
            intercept: beta[0],
            coefficients: beta[1..].to_vec(),
        })
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }

    fn predict_f64(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, EstimatorError> {
        check_width(rows, self.coefficients.len())?;
        Ok(rows.iter().map(|row| self.predict_row(row)).collect())
    }
}

impl Predictor for LinearRegression {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<Value>, EstimatorError> {
        Ok(self
            .predict_f64(rows)?
            .into_iter()
            .map(Value::Float)
            .collect())
    }
}

impl Estimator for LinearRegression {
    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Regressor
    }

    fn predictor(&self) -> Option<&dyn Predictor> {
        Some(self)
    }

    /// R² of the predictions on `(rows, targets)`.
    fn native_score(&self, rows: &[Vec<f64>], targets: &[Value]) -> Result<f64, EstimatorError> {
        let truth = targets
            .iter()
            .map(|value| {
                value
                    .as_f64()
                    .ok_or_else(|| EstimatorError::Failed(format!("target `{value}` is not numeric")))
            })
            .collect::<Result<Vec<f64>, _>>()?;
        let predicted = self.predict_f64(rows)?;
        r2_score(&truth, &predicted).map_err(|e| EstimatorError::Failed(e.to_string()))
    }
}
