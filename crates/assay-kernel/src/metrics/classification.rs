//! Classification metrics over label keys and class scores.

use super::{Result, check_lengths, sorted_labels};
use crate::config::Average;
use crate::error::MetricError;
use std::collections::{BTreeSet, HashMap};

/// Per-class confusion counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ClassCounts {
    tp: usize,
    fp: usize,
    fn_: usize,
    support: usize,
}

/// Which ratio a precision/recall-family metric reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stat {
    Precision,
    Recall,
    F1,
    Jaccard,
}

impl Stat {
    fn ratio(self, c: ClassCounts) -> f64 {
        let (num, den) = match self {
            Stat::Precision => (c.tp, c.tp + c.fp),
            Stat::Recall => (c.tp, c.tp + c.fn_),
            Stat::F1 => (2 * c.tp, 2 * c.tp + c.fp + c.fn_),
            Stat::Jaccard => (c.tp, c.tp + c.fp + c.fn_),
        };
        if den == 0 {
            0.0
        } else {
            num as f64 / den as f64
        }
    }
}

fn union_labels(y_true: &[String], y_pred: &[String]) -> Vec<String> {
    sorted_labels(y_true.iter().chain(y_pred.iter()))
}

fn class_counts(y_true: &[String], y_pred: &[String], labels: &[String]) -> Vec<ClassCounts> {
    let index: HashMap<&str, usize> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| (label.as_str(), i))
        .collect();
    let mut counts = vec![ClassCounts::default(); labels.len()];
    for (t, p) in y_true.iter().zip(y_pred) {
        let ti = index.get(t.as_str()).copied();
        let pi = index.get(p.as_str()).copied();
        if let Some(ti) = ti {
            counts[ti].support += 1;
        }
        match (ti, pi) {
            (Some(ti), Some(pi)) if ti == pi => counts[ti].tp += 1,
            (ti, pi) => {
                if let Some(ti) = ti {
                    counts[ti].fn_ += 1;
                }
                if let Some(pi) = pi {
                    counts[pi].fp += 1;
                }
            }
        }
    }
    counts
}

fn averaged(
    y_true: &[String],
    y_pred: &[String],
    average: Average,
    pos_label: &str,
    stat: Stat,
) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    let labels = union_labels(y_true, y_pred);

    match average {
        Average::Binary => {
            if labels.len() > 2 {
                return Err(MetricError::InvalidInput(
                    "target is multiclass but average is `binary`".to_string(),
                ));
            }
            if labels.len() == 2 && !labels.iter().any(|l| l == pos_label) {
                return Err(MetricError::InvalidInput(format!(
                    "pos_label `{pos_label}` is not a valid label: {labels:?}"
                )));
            }
            let pos = [pos_label.to_string()];
            let counts = class_counts(y_true, y_pred, &pos);
            Ok(stat.ratio(counts[0]))
        }
        Average::Micro => {
            let total = class_counts(y_true, y_pred, &labels).into_iter().fold(
                ClassCounts::default(),
                |acc, c| ClassCounts {
                    tp: acc.tp + c.tp,
                    fp: acc.fp + c.fp,
                    fn_: acc.fn_ + c.fn_,
                    support: acc.support + c.support,
                },
            );
            Ok(stat.ratio(total))
        }
        Average::Macro => {
            let counts = class_counts(y_true, y_pred, &labels);
            let sum: f64 = counts.iter().map(|c| stat.ratio(*c)).sum();
            Ok(sum / counts.len() as f64)
        }
        Average::Weighted => {
            let counts = class_counts(y_true, y_pred, &labels);
            let support: usize = counts.iter().map(|c| c.support).sum();
            if support == 0 {
                return Ok(0.0);
            }
            let sum: f64 = counts
                .iter()
                .map(|c| stat.ratio(*c) * c.support as f64)
                .sum();
            Ok(sum / support as f64)
        }
    }
}

/// Fraction of exact label matches.
pub fn accuracy_score(y_true: &[String], y_pred: &[String]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Mean per-class recall over classes present in `y_true`.
pub fn balanced_accuracy_score(y_true: &[String], y_pred: &[String]) -> Result<f64> {
    check_lengths(y_true.len(), y_pred.len())?;
    let labels = union_labels(y_true, y_pred);
    let recalls: Vec<f64> = class_counts(y_true, y_pred, &labels)
        .into_iter()
        .filter(|c| c.support > 0)
        .map(|c| Stat::Recall.ratio(c))
        .collect();
    Ok(recalls.iter().sum::<f64>() / recalls.len() as f64)
}

pub fn precision_score(
    y_true: &[String],
    y_pred: &[String],
    average: Average,
    pos_label: &str,
) -> Result<f64> {
    averaged(y_true, y_pred, average, pos_label, Stat::Precision)
}

pub fn recall_score(
    y_true: &[String],
    y_pred: &[String],
    average: Average,
    pos_label: &str,
) -> Result<f64> {
    averaged(y_true, y_pred, average, pos_label, Stat::Recall)
}

pub fn f1_score(
    y_true: &[String],
    y_pred: &[String],
    average: Average,
    pos_label: &str,
) -> Result<f64> {
    averaged(y_true, y_pred, average, pos_label, Stat::F1)
}

pub fn jaccard_score(
    y_true: &[String],
    y_pred: &[String],
    average: Average,
    pos_label: &str,
) -> Result<f64> {
    averaged(y_true, y_pred, average, pos_label, Stat::Jaccard)
}

/// Map binary labels onto positive-class indicators.
fn binary_targets(y_true: &[String], pos_label: &str) -> Result<Vec<bool>> {
    let distinct: BTreeSet<&str> = y_true.iter().map(String::as_str).collect();
    if distinct.len() > 2 {
        return Err(MetricError::InvalidInput(format!(
            "only binary targets are supported, got {} classes",
            distinct.len()
        )));
    }
    if distinct.len() == 2 && !distinct.contains(pos_label) {
        return Err(MetricError::InvalidInput(format!(
            "pos_label `{pos_label}` is not a valid label"
        )));
    }
    Ok(y_true.iter().map(|label| label == pos_label).collect())
}

fn check_probabilities(y_prob: &[f64]) -> Result<()> {
    if let Some(p) = y_prob.iter().find(|p| !(0.0..=1.0).contains(*p)) {
        return Err(MetricError::Domain(format!(
            "probability {p} is outside [0, 1]"
        )));
    }
    Ok(())
}

/// Mean squared difference between positive-class probability and outcome.
pub fn brier_score_loss(y_true: &[String], y_prob: &[f64], pos_label: &str) -> Result<f64> {
    check_lengths(y_true.len(), y_prob.len())?;
    check_probabilities(y_prob)?;
    let targets = binary_targets(y_true, pos_label)?;
    let sum: f64 = targets
        .iter()
        .zip(y_prob)
        .map(|(t, p)| {
            let t = if *t { 1.0 } else { 0.0 };
            (t - p).powi(2)
        })
        .sum();
    Ok(sum / y_true.len() as f64)
}

/// Binary cross-entropy against positive-class probabilities.
pub fn log_loss_binary(y_true: &[String], y_prob: &[f64], pos_label: &str, eps: f64) -> Result<f64> {
    check_lengths(y_true.len(), y_prob.len())?;
    check_probabilities(y_prob)?;
    let targets = binary_targets(y_true, pos_label)?;
    let sum: f64 = targets
        .iter()
        .zip(y_prob)
        .map(|(t, p)| {
            let p = p.clamp(eps, 1.0 - eps);
            if *t { -p.ln() } else { -(1.0 - p).ln() }
        })
        .sum();
    Ok(sum / y_true.len() as f64)
}

/// Multi-class cross-entropy against per-class probability vectors.
///
/// Each row is normalized to sum to one before clipping.
pub fn log_loss_multiclass(
    y_true: &[String],
    y_prob: &[Vec<f64>],
    labels: &[String],
    eps: f64,
) -> Result<f64> {
    check_lengths(y_true.len(), y_prob.len())?;
    let index = class_index(labels);
    let mut sum = 0.0;
    for (label, row) in y_true.iter().zip(y_prob) {
        check_row(row, labels.len())?;
        let i = lookup(&index, label)?;
        let total: f64 = row.iter().sum();
        if total <= 0.0 {
            return Err(MetricError::Domain(
                "probability row sums to zero".to_string(),
            ));
        }
        let p = (row[i] / total).clamp(eps, 1.0 - eps);
        sum -= p.ln();
    }
    Ok(sum / y_true.len() as f64)
}

fn class_index(labels: &[String]) -> HashMap<&str, usize> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| (label.as_str(), i))
        .collect()
}

fn lookup(index: &HashMap<&str, usize>, label: &str) -> Result<usize> {
    index
        .get(label)
        .copied()
        .ok_or_else(|| MetricError::InvalidInput(format!("label `{label}` is not among the classes")))
}

fn check_row(row: &[f64], width: usize) -> Result<()> {
    if row.len() != width {
        return Err(MetricError::InvalidInput(format!(
            "score vector has {} entries for {width} classes",
            row.len()
        )));
    }
    Ok(())
}

/// Area under the ROC curve via the rank-sum statistic. Ties share their
/// average rank.
pub fn roc_auc_score(y_true: &[String], y_score: &[f64], pos_label: &str) -> Result<f64> {
    check_lengths(y_true.len(), y_score.len())?;
    let targets = binary_targets(y_true, pos_label)?;
    let positives = targets.iter().filter(|t| **t).count();
    let negatives = targets.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(MetricError::InvalidInput(
            "only one class present in y_true; ROC AUC is not defined".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|a, b| y_score[*a].total_cmp(&y_score[*b]));
    let mut ranks = vec![0.0; y_score.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && y_score[order[end + 1]] == y_score[order[start]] {
            end += 1;
        }
        let rank = (start + end) as f64 / 2.0 + 1.0;
        for idx in &order[start..=end] {
            ranks[*idx] = rank;
        }
        start = end + 1;
    }

    let rank_sum: f64 = targets
        .iter()
        .zip(&ranks)
        .filter(|(t, _)| **t)
        .map(|(_, r)| *r)
        .sum();
    let p = positives as f64;
    Ok((rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64))
}

/// Average precision: precision at each distinct threshold weighted by the
/// recall gained there.
pub fn average_precision_score(y_true: &[String], y_score: &[f64], pos_label: &str) -> Result<f64> {
    check_lengths(y_true.len(), y_score.len())?;
    let targets = binary_targets(y_true, pos_label)?;
    let positives = targets.iter().filter(|t| **t).count();
    if positives == 0 {
        return Err(MetricError::InvalidInput(
            "no positive samples in y_true; average precision is not defined".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|a, b| y_score[*b].total_cmp(&y_score[*a]));

    let (mut tp, mut fp) = (0usize, 0usize);
    let mut prev_recall = 0.0;
    let mut ap = 0.0;
    let mut i = 0;
    while i < order.len() {
        let threshold = y_score[order[i]];
        while i < order.len() && y_score[order[i]] == threshold {
            if targets[order[i]] {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        let precision = tp as f64 / (tp + fp) as f64;
        let recall = tp as f64 / positives as f64;
        ap += (recall - prev_recall) * precision;
        prev_recall = recall;
    }
    Ok(ap)
}

/// Fraction of samples whose true class ranks among the `k` highest scores.
pub fn top_k_accuracy_score(
    y_true: &[String],
    y_score: &[Vec<f64>],
    k: usize,
    labels: &[String],
) -> Result<f64> {
    check_lengths(y_true.len(), y_score.len())?;
    let index = class_index(labels);
    let mut hits = 0usize;
    for (label, row) in y_true.iter().zip(y_score) {
        check_row(row, labels.len())?;
        let i = lookup(&index, label)?;
        let better = row.iter().filter(|s| **s > row[i]).count();
        if better < k {
            hits += 1;
        }
    }
    Ok(hits as f64 / y_true.len() as f64)
}
