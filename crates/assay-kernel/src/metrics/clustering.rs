//! Clustering metrics: label agreement against ground truth, and the
//! ground-truth-free silhouette coefficient.
//!
//! Information quantities are in nats.

use super::{Result, check_lengths};
use crate::error::MetricError;
use std::collections::HashMap;

/// Contingency table between true classes (rows) and predicted clusters
/// (columns).
#[derive(Debug, Clone)]
struct Contingency {
    cells: HashMap<(usize, usize), usize>,
    rows: Vec<usize>,
    cols: Vec<usize>,
    n: usize,
}

impl Contingency {
    fn build(y_true: &[String], y_pred: &[String]) -> Result<Self> {
        check_lengths(y_true.len(), y_pred.len())?;
        let rows_index = index_labels(y_true);
        let cols_index = index_labels(y_pred);
        let mut rows = vec![0; rows_index.len()];
        let mut cols = vec![0; cols_index.len()];
        let mut cells = HashMap::new();
        for (t, p) in y_true.iter().zip(y_pred) {
            let (i, j) = (rows_index[t.as_str()], cols_index[p.as_str()]);
            rows[i] += 1;
            cols[j] += 1;
            *cells.entry((i, j)).or_insert(0) += 1;
        }
        Ok(Self {
            cells,
            rows,
            cols,
            n: y_true.len(),
        })
    }

    fn mutual_info(&self) -> f64 {
        let n = self.n as f64;
        self.cells
            .iter()
            .map(|(&(i, j), &nij)| {
                let nij = nij as f64;
                let outer = self.rows[i] as f64 * self.cols[j] as f64;
                nij / n * (n * nij / outer).ln()
            })
            .sum::<f64>()
            .max(0.0)
    }

    fn row_entropy(&self) -> f64 {
        entropy(&self.rows, self.n)
    }

    fn col_entropy(&self) -> f64 {
        entropy(&self.cols, self.n)
    }

    fn sum_squares(&self) -> f64 {
        self.cells.values().map(|&c| (c * c) as f64).sum()
    }

    /// Ordered-pair confusion `(tn, fp, fn, tp)`.
    fn pair_confusion(&self) -> (f64, f64, f64, f64) {
        let n = self.n as f64;
        let sum_squares = self.sum_squares();
        let rows_sq: f64 = self.rows.iter().map(|&a| (a * a) as f64).sum();
        let cols_sq: f64 = self.cols.iter().map(|&b| (b * b) as f64).sum();
        let tp = sum_squares - n;
        let fp = cols_sq - sum_squares;
        let fn_ = rows_sq - sum_squares;
        let tn = n * n - fp - fn_ - sum_squares;
        (tn, fp, fn_, tp)
    }

    fn is_single_cluster_pair(&self) -> bool {
        self.rows.len() == 1 && self.cols.len() == 1
    }
}

fn index_labels(labels: &[String]) -> HashMap<&str, usize> {
    let mut index = HashMap::new();
    for label in labels {
        let next = index.len();
        index.entry(label.as_str()).or_insert(next);
    }
    index
}

fn entropy(counts: &[usize], n: usize) -> f64 {
    let n = n as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.ln()
        })
        .sum()
}

pub fn mutual_info_score(y_true: &[String], y_pred: &[String]) -> Result<f64> {
    Ok(Contingency::build(y_true, y_pred)?.mutual_info())
}

/// Each cluster contains only members of a single class.
pub fn homogeneity_score(y_true: &[String], y_pred: &[String]) -> Result<f64> {
    let table = Contingency::build(y_true, y_pred)?;
    let h_true = table.row_entropy();
    Ok(if h_true == 0.0 {
        1.0
    } else {
        table.mutual_info() / h_true
    })
}

/// All members of a given class are assigned to the same cluster.
pub fn completeness_score(y_true: &[String], y_pred: &[String]) -> Result<f64> {
    let table = Contingency::build(y_true, y_pred)?;
    let h_pred = table.col_entropy();
    Ok(if h_pred == 0.0 {
        1.0
    } else {
        table.mutual_info() / h_pred
    })
}

/// Harmonic mean of homogeneity and completeness.
pub fn v_measure_score(y_true: &[String], y_pred: &[String]) -> Result<f64> {
    let h = homogeneity_score(y_true, y_pred)?;
    let c = completeness_score(y_true, y_pred)?;
    Ok(if h + c == 0.0 {
        0.0
    } else {
        2.0 * h * c / (h + c)
    })
}

/// Mutual information normalized by the arithmetic mean of the entropies.
pub fn normalized_mutual_info_score(y_true: &[String], y_pred: &[String]) -> Result<f64> {
    let table = Contingency::build(y_true, y_pred)?;
    if table.is_single_cluster_pair() {
        return Ok(1.0);
    }
    let mi = table.mutual_info();
    if mi == 0.0 {
        return Ok(0.0);
    }
    let normalizer = (table.row_entropy() + table.col_entropy()) / 2.0;
    Ok(mi / normalizer.max(f64::EPSILON))
}

/// Mutual information adjusted for chance, arithmetic normalization.
pub fn adjusted_mutual_info_score(y_true: &[String], y_pred: &[String]) -> Result<f64> {
    let table = Contingency::build(y_true, y_pred)?;
    if table.is_single_cluster_pair() {
        return Ok(1.0);
    }
    let mi = table.mutual_info();
    let emi = expected_mutual_info(&table.rows, &table.cols, table.n);
    let normalizer = (table.row_entropy() + table.col_entropy()) / 2.0;
    let mut denominator = normalizer - emi;
    if denominator < 0.0 {
        denominator = denominator.min(-f64::EPSILON);
    } else {
        denominator = denominator.max(f64::EPSILON);
    }
    Ok((mi - emi) / denominator)
}

/// Expected mutual information under the hypergeometric model of
/// randomness, for the given marginals.
fn expected_mutual_info(rows: &[usize], cols: &[usize], n: usize) -> f64 {
    let ln_fact = ln_factorials(n);
    let nf = n as f64;
    let mut emi = 0.0;
    for &a in rows {
        for &b in cols {
            let start = (a + b).saturating_sub(n).max(1);
            let end = a.min(b);
            for nij in start..=end {
                let nijf = nij as f64;
                let term = nijf / nf * (nf * nijf / (a as f64 * b as f64)).ln();
                let ln_p = ln_fact[a] + ln_fact[b] + ln_fact[n - a] + ln_fact[n - b]
                    - ln_fact[n]
                    - ln_fact[nij]
                    - ln_fact[a - nij]
                    - ln_fact[b - nij]
                    - ln_fact[n + nij - a - b];
                emi += term * ln_p.exp();
            }
        }
    }
    emi
}

fn ln_factorials(n: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(n + 1);
    out.push(0.0);
    let mut acc = 0.0;
    for k in 1..=n {
        acc += (k as f64).ln();
        out.push(acc);
    }
    out
}

/// Rand index adjusted for chance.
pub fn adjusted_rand_score(y_true: &[String], y_pred: &[String]) -> Result<f64> {
    let table = Contingency::build(y_true, y_pred)?;
    let (tn, fp, fn_, tp) = table.pair_confusion();
    if fn_ == 0.0 && fp == 0.0 {
        return Ok(1.0);
    }
    Ok(2.0 * (tp * tn - fn_ * fp) / ((tp + fn_) * (fn_ + tn) + (tp + fp) * (fp + tn)))
}

/// Fraction of sample pairs on which both labelings agree.
pub fn rand_score(y_true: &[String], y_pred: &[String]) -> Result<f64> {
    let table = Contingency::build(y_true, y_pred)?;
    let (tn, fp, fn_, tp) = table.pair_confusion();
    let numerator = tn + tp;
    let denominator = tn + fp + fn_ + tp;
    if numerator == denominator || denominator == 0.0 {
        return Ok(1.0);
    }
    Ok(numerator / denominator)
}

/// Geometric mean of pairwise precision and recall.
pub fn fowlkes_mallows_score(y_true: &[String], y_pred: &[String]) -> Result<f64> {
    let table = Contingency::build(y_true, y_pred)?;
    let n = table.n as f64;
    let tk = table.sum_squares() - n;
    let pk: f64 = table.cols.iter().map(|&b| (b * b) as f64).sum::<f64>() - n;
    let qk: f64 = table.rows.iter().map(|&a| (a * a) as f64).sum::<f64>() - n;
    if tk == 0.0 {
        return Ok(0.0);
    }
    Ok((tk / pk).sqrt() * (tk / qk).sqrt())
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Mean silhouette coefficient over all samples, Euclidean distance.
///
/// Requires `2 <= n_labels <= n_samples - 1`. Samples in singleton
/// clusters score zero.
pub fn silhouette_score(features: &[Vec<f64>], labels: &[String]) -> Result<f64> {
    check_lengths(features.len(), labels.len())?;
    let index = index_labels(labels);
    let n_labels = index.len();
    if n_labels < 2 || n_labels > features.len() - 1 {
        return Err(MetricError::InvalidInput(format!(
            "number of labels is {n_labels}; valid values are 2 to n_samples - 1 ({})",
            features.len().saturating_sub(1)
        )));
    }

    let assignment: Vec<usize> = labels.iter().map(|l| index[l.as_str()]).collect();
    let mut sizes = vec![0usize; n_labels];
    for &c in &assignment {
        sizes[c] += 1;
    }

    let mut total = 0.0;
    for (i, row) in features.iter().enumerate() {
        let own = assignment[i];
        if sizes[own] <= 1 {
            continue;
        }
        let mut sums = vec![0.0; n_labels];
        for (j, other) in features.iter().enumerate() {
            if i != j {
                sums[assignment[j]] += euclidean(row, other);
            }
        }
        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..n_labels)
            .filter(|&c| c != own)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    Ok(total / features.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn identical_partitions_are_perfect() {
        let t = labels(&["0", "0", "1", "1", "2", "2"]);
        let p = labels(&["b", "b", "a", "a", "c", "c"]);
        assert!(close(mutual_info_score(&t, &p).unwrap(), 3f64.ln()));
        assert!(close(homogeneity_score(&t, &p).unwrap(), 1.0));
        assert!(close(completeness_score(&t, &p).unwrap(), 1.0));
        assert!(close(v_measure_score(&t, &p).unwrap(), 1.0));
        assert!(close(normalized_mutual_info_score(&t, &p).unwrap(), 1.0));
        assert!(close(adjusted_mutual_info_score(&t, &p).unwrap(), 1.0));
        assert!(close(adjusted_rand_score(&t, &p).unwrap(), 1.0));
        assert!(close(rand_score(&t, &p).unwrap(), 1.0));
        assert!(close(fowlkes_mallows_score(&t, &p).unwrap(), 1.0));
    }

    #[test]
    fn split_class_is_homogeneous_but_incomplete() {
        let t = labels(&["0", "0", "1", "1"]);
        let p = labels(&["0", "1", "2", "3"]);
        assert!(close(homogeneity_score(&t, &p).unwrap(), 1.0));
        assert!(close(completeness_score(&t, &p).unwrap(), 0.5));
        assert!(close(v_measure_score(&t, &p).unwrap(), 2.0 / 3.0));
    }

    #[test]
    fn pair_counting_scores() {
        let t = labels(&["0", "0", "1", "1"]);
        let p = labels(&["0", "0", "1", "2"]);
        // ordered pairs: tp=2, fp=0, fn=2, tn=8
        assert!(close(rand_score(&t, &p).unwrap(), 10.0 / 12.0));
        assert!(close(adjusted_rand_score(&t, &p).unwrap(), 0.5714285714285715));
        assert!(close(fowlkes_mallows_score(&t, &p).unwrap(), 0.7071067811865476));
    }

    #[test]
    fn independent_labelings_share_no_information() {
        let t = labels(&["0", "0", "1", "1"]);
        let p = labels(&["0", "1", "0", "1"]);
        assert!(close(mutual_info_score(&t, &p).unwrap(), 0.0));
        assert!(close(normalized_mutual_info_score(&t, &p).unwrap(), 0.0));
        assert!(adjusted_mutual_info_score(&t, &p).unwrap() < 0.0);
    }

    #[test]
    fn silhouette_of_well_separated_blobs() {
        let x = vec![vec![0.0], vec![1.0], vec![10.0], vec![11.0]];
        let l = labels(&["a", "a", "b", "b"]);
        // each point: a = 1, b = 10 or 9/11 averaged
        let s0 = (10.5 - 1.0) / 10.5;
        let s1 = (9.5 - 1.0) / 9.5;
        let expected = (s0 + s1 + s1 + s0) / 4.0;
        assert!(close(silhouette_score(&x, &l).unwrap(), expected));
    }

    #[test]
    fn silhouette_requires_two_to_n_minus_one_labels() {
        let x = vec![vec![0.0], vec![1.0], vec![2.0]];
        assert!(silhouette_score(&x, &labels(&["a", "a", "a"])).is_err());
        assert!(silhouette_score(&x, &labels(&["a", "b", "c"])).is_err());
    }
}
