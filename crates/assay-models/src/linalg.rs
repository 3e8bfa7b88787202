//! Dense row-major helpers shared by the reference estimators.

use assay_kernel::EstimatorError;

pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Index of the row in `centers` closest to `row`; ties go to the first.
pub fn nearest(row: &[f64], centers: &[Vec<f64>]) -> Option<usize> {
    centers
        .iter()
        .map(|center| euclidean(row, center))
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
            Some((_, best_d)) if best_d <= d => best,
            _ => Some((i, d)),
        })
        .map(|(i, _)| i)
}

/// Every row must be `width` wide.
pub fn check_width(rows: &[Vec<f64>], width: usize) -> Result<(), EstimatorError> {
    match rows.iter().find(|row| row.len() != width) {
        Some(row) => Err(EstimatorError::Width {
            expected: width,
            actual: row.len(),
        }),
        None => Ok(()),
    }
}

/// Gauss-Jordan inverse with partial pivoting.
pub fn matrix_inverse(matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, EstimatorError> {
    let n = matrix.len();
    if n == 0 {
        return Err(EstimatorError::Failed("matrix is empty".to_string()));
    }
    if matrix.iter().any(|row| row.len() != n) {
        return Err(EstimatorError::Failed("matrix must be square".to_string()));
    }

    let mut augmented: Vec<Vec<f64>> = matrix
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut out = Vec::with_capacity(2 * n);
            out.extend_from_slice(row);
            out.extend((0..n).map(|j| if i == j { 1.0 } else { 0.0 }));
            out
        })
        .collect();

    for i in 0..n {
        let (pivot_row, pivot_abs) = (i..n)
            .map(|j| (j, augmented[j][i].abs()))
            .fold((i, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });
        if pivot_abs < 1e-12 {
            return Err(EstimatorError::Failed(
                "matrix is singular (inverse does not exist)".to_string(),
            ));
        }
        augmented.swap(i, pivot_row);

        let pivot = augmented[i][i];
        for value in augmented[i].iter_mut() {
            *value /= pivot;
        }
        for j in 0..n {
            if j != i {
                let factor = augmented[j][i];
                if factor != 0.0 {
                    let pivot_values = augmented[i].clone();
                    for (value, p) in augmented[j].iter_mut().zip(pivot_values) {
                        *value -= factor * p;
                    }
                }
            }
        }
    }

    Ok(augmented.into_iter().map(|row| row[n..].to_vec()).collect())
}
