//! Clustering estimators.
//!
//! `KMeans` can label unseen rows. `Agglomerative` only keeps the labels it
//! assigned to its training rows.

use crate::linalg::{check_width, euclidean, nearest};
use assay_kernel::{Estimator, EstimatorError, EstimatorKind, Predictor, Value};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_ITER: usize = 100;

/// Lloyd's k-means with deterministic farthest-point initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeans {
    pub centroids: Vec<Vec<f64>>,
    pub iterations: usize,
}

impl KMeans {
    pub fn fit(rows: &[Vec<f64>], k: usize, max_iter: usize) -> Result<Self, EstimatorError> {
        if k == 0 || k > rows.len() {
            return Err(EstimatorError::Failed(format!(
                "n_clusters={k} must be between 1 and the number of rows ({})",
                rows.len()
            )));
        }
        let width = rows[0].len();
        check_width(rows, width)?;

        let mut centroids = farthest_point_init(rows, k);
        let mut assignment = vec![usize::MAX; rows.len()];
        let mut iterations = 0;
        while iterations < max_iter {
            iterations += 1;
            let mut changed = false;
            for (slot, row) in assignment.iter_mut().zip(rows) {
                let cluster = nearest(row, &centroids).unwrap_or(0);
                if *slot != cluster {
                    *slot = cluster;
                    changed = true;
                }
            }
            if !changed {
                break;
            }

            let mut sums = vec![vec![0.0; width]; k];
            let mut counts = vec![0usize; k];
            for (&cluster, row) in assignment.iter().zip(rows) {
                counts[cluster] += 1;
                for (sum, x) in sums[cluster].iter_mut().zip(row) {
                    *sum += x;
                }
            }
            // Empty clusters keep their previous centroid.
            for ((centroid, sum), count) in centroids.iter_mut().zip(sums).zip(counts) {
                if count > 0 {
                    *centroid = sum.into_iter().map(|s| s / count as f64).collect();
                }
            }
        }

        Ok(Self {
            centroids,
            iterations,
        })
    }
}

fn farthest_point_init(rows: &[Vec<f64>], k: usize) -> Vec<Vec<f64>> {
    let mut centroids = vec![rows[0].clone()];
    while centroids.len() < k {
        let next = rows
            .iter()
            .map(|row| {
                centroids
                    .iter()
                    .map(|c| euclidean(row, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, d)| {
                if d > best.1 { (i, d) } else { best }
            })
            .0;
        centroids.push(rows[next].clone());
    }
    centroids
}

impl Predictor for KMeans {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<Value>, EstimatorError> {
        let width = self.centroids.first().map_or(0, Vec::len);
        check_width(rows, width)?;
        rows.iter()
            .map(|row| {
                nearest(row, &self.centroids)
                    .map(|cluster| Value::Int(cluster as i64))
                    .ok_or(EstimatorError::NotFitted)
            })
            .collect()
    }
}

impl Estimator for KMeans {
    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Clusterer
    }

    fn predictor(&self) -> Option<&dyn Predictor> {
        Some(self)
    }
}

/// Single-linkage agglomerative clustering. Transductive: there is no
/// prediction for rows outside the training set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agglomerative {
    pub n_clusters: usize,
    pub labels: Vec<Value>,
}

impl Agglomerative {
    pub fn fit(rows: &[Vec<f64>], n_clusters: usize) -> Result<Self, EstimatorError> {
        if n_clusters == 0 || n_clusters > rows.len() {
            return Err(EstimatorError::Failed(format!(
                "n_clusters={n_clusters} must be between 1 and the number of rows ({})",
                rows.len()
            )));
        }
        check_width(rows, rows[0].len())?;

        let mut clusters: Vec<Vec<usize>> = (0..rows.len()).map(|i| vec![i]).collect();
        while clusters.len() > n_clusters {
            let mut best = (0, 1, f64::INFINITY);
            for a in 0..clusters.len() {
                for b in a + 1..clusters.len() {
                    let d = single_link(rows, &clusters[a], &clusters[b]);
                    if d < best.2 {
                        best = (a, b, d);
                    }
                }
            }
            let merged = clusters.remove(best.1);
            clusters[best.0].extend(merged);
        }

        // Number clusters by their lowest member index.
        for members in &mut clusters {
            members.sort_unstable();
        }
        clusters.sort_by_key(|members| members[0]);
        let mut labels = vec![Value::Int(0); rows.len()];
        for (cluster, members) in clusters.iter().enumerate() {
            for &i in members {
                labels[i] = Value::Int(cluster as i64);
            }
        }

        Ok(Self { n_clusters, labels })
    }
}

fn single_link(rows: &[Vec<f64>], a: &[usize], b: &[usize]) -> f64 {
    a.iter()
        .flat_map(|&i| b.iter().map(move |&j| euclidean(&rows[i], &rows[j])))
        .fold(f64::INFINITY, f64::min)
}

impl Estimator for Agglomerative {
    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Clusterer
    }

    fn stored_training_labels(&self) -> Option<&[Value]> {
        Some(&self.labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![0.3, 0.1],
            vec![0.1, 0.4],
            vec![8.0, 8.0],
            vec![8.2, 7.9],
            vec![7.8, 8.3],
        ]
    }

    #[test]
    fn kmeans_separates_blobs_and_predicts_unseen_rows() {
        let model = KMeans::fit(&two_blobs(), 2, DEFAULT_MAX_ITER).expect("fit");
        let labels = model.predict(&two_blobs()).expect("predict");
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_ne!(labels[0], labels[3]);

        let unseen = model.predict(&[vec![7.5, 7.5]]).expect("predict unseen");
        assert_eq!(unseen[0], labels[3]);
    }

    #[test]
    fn kmeans_rejects_too_many_clusters() {
        assert!(KMeans::fit(&[vec![1.0]], 2, DEFAULT_MAX_ITER).is_err());
    }

    #[test]
    fn agglomerative_labels_by_first_member() {
        let model = Agglomerative::fit(&two_blobs(), 2).expect("fit");
        let expected: Vec<Value> = [0, 0, 0, 1, 1, 1].into_iter().map(Value::Int).collect();
        assert_eq!(model.labels, expected);
        assert!(model.predictor().is_none());
        assert_eq!(model.stored_training_labels(), Some(expected.as_slice()));
    }
}
