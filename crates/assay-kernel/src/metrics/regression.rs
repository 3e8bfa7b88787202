//! Regression metrics.

use super::{Result, check_lengths};
use crate::error::MetricError;

fn residuals<'a>(y_true: &'a [f64], y_pred: &'a [f64]) -> impl Iterator<Item = f64> + 'a {
    y_true.iter().zip(y_pred).map(|(t, p)| t - p)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Ratio score of the form `1 - numerator / denominator`, with the
/// constant-target cases resolved to finite values.
fn finite_ratio_score(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        if numerator == 0.0 { 1.0 } else { 0.0 }
    } else {
        1.0 - numerator / denominator
    }
}

/// Calculate Mean Squared Error (MSE)
pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    Ok(mean(residuals(y_true, y_pred).map(|r| r * r)))
}

/// Calculate Mean Absolute Error (MAE)
pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    Ok(mean(residuals(y_true, y_pred).map(f64::abs)))
}

/// Largest absolute residual.
pub fn max_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    Ok(residuals(y_true, y_pred).map(f64::abs).fold(0.0, f64::max))
}

/// Median of absolute residuals.
pub fn median_absolute_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    let mut errors: Vec<f64> = residuals(y_true, y_pred).map(f64::abs).collect();
    errors.sort_by(f64::total_cmp);
    let mid = errors.len() / 2;
    Ok(if errors.len() % 2 == 0 {
        (errors[mid - 1] + errors[mid]) / 2.0
    } else {
        errors[mid]
    })
}

/// Mean squared error between `ln(1 + y)` values. Targets must be
/// non-negative.
pub fn mean_squared_log_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    if y_true.iter().chain(y_pred).any(|v| *v < 0.0) {
        return Err(MetricError::Domain(
            "mean squared logarithmic error cannot be used when targets contain negative values"
                .to_string(),
        ));
    }
    Ok(mean(
        y_true
            .iter()
            .zip(y_pred)
            .map(|(t, p)| (t.ln_1p() - p.ln_1p()).powi(2)),
    ))
}

/// Mean of `|y - ŷ| / max(|y|, ε)`.
pub fn mean_absolute_percentage_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    Ok(mean(
        y_true
            .iter()
            .zip(y_pred)
            .map(|(t, p)| (t - p).abs() / t.abs().max(f64::EPSILON)),
    ))
}

/// Coefficient of determination.
///
/// Best possible score is 1.0; it can be arbitrarily negative.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    let y_mean = mean(y_true.iter().copied());
    let ss_res: f64 = residuals(y_true, y_pred).map(|r| r * r).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - y_mean).powi(2)).sum();
    Ok(finite_ratio_score(ss_res, ss_tot))
}

/// Explained variance: `1 - Var(y - ŷ) / Var(y)`.
pub fn explained_variance_score(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    let diff: Vec<f64> = residuals(y_true, y_pred).collect();
    let diff_mean = mean(diff.iter().copied());
    let var_res = mean(diff.iter().map(|d| (d - diff_mean).powi(2)));
    let y_mean = mean(y_true.iter().copied());
    let var_true = mean(y_true.iter().map(|t| (t - y_mean).powi(2)));
    Ok(finite_ratio_score(var_res, var_true))
}

/// Mean Poisson deviance. Requires `y >= 0` and `ŷ > 0`.
pub fn mean_poisson_deviance(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    if y_true.iter().any(|t| *t < 0.0) || y_pred.iter().any(|p| *p <= 0.0) {
        return Err(MetricError::Domain(
            "mean Poisson deviance requires y_true >= 0 and y_pred > 0".to_string(),
        ));
    }
    Ok(mean(y_true.iter().zip(y_pred).map(|(t, p)| {
        let xlogy = if *t == 0.0 { 0.0 } else { t * (t / p).ln() };
        2.0 * (xlogy - t + p)
    })))
}

/// Mean Gamma deviance. Requires `y > 0` and `ŷ > 0`.
pub fn mean_gamma_deviance(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    if y_true.iter().chain(y_pred).any(|v| *v <= 0.0) {
        return Err(MetricError::Domain(
            "mean Gamma deviance requires y_true > 0 and y_pred > 0".to_string(),
        ));
    }
    Ok(mean(
        y_true
            .iter()
            .zip(y_pred)
            .map(|(t, p)| 2.0 * ((p / t).ln() + t / p - 1.0)),
    ))
}
