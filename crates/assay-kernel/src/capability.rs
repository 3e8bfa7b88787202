//! Estimator capability probe.
//!
//! The capability is derived once per scoring run and every branch of the
//! scoring context switches on it; nothing else inspects the estimator's
//! shape.

use crate::error::{ScoreError, ScoreResult};
use crate::estimator::{Estimator, EstimatorKind};
use crate::metrics::MetricClass;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimatorCapability {
    Classifier,
    Regressor,
    /// `inductive` clusterers can label unseen data; transductive ones only
    /// carry their training-time labels.
    Clusterer { inductive: bool },
}

impl EstimatorCapability {
    pub fn is_supervised(self) -> bool {
        matches!(
            self,
            EstimatorCapability::Classifier | EstimatorCapability::Regressor
        )
    }

    pub fn is_transductive(self) -> bool {
        matches!(self, EstimatorCapability::Clusterer { inductive: false })
    }

    /// Metric class valid for this capability.
    pub fn metric_class(self) -> MetricClass {
        match self {
            EstimatorCapability::Classifier => MetricClass::Classification,
            EstimatorCapability::Regressor => MetricClass::Regression,
            EstimatorCapability::Clusterer { .. } => MetricClass::Clustering,
        }
    }
}

impl fmt::Display for EstimatorCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimatorCapability::Classifier => f.write_str("a classifier"),
            EstimatorCapability::Regressor => f.write_str("a regressor"),
            EstimatorCapability::Clusterer { inductive: true } => {
                f.write_str("an inductive clusterer")
            }
            EstimatorCapability::Clusterer { inductive: false } => {
                f.write_str("a transductive clusterer")
            }
        }
    }
}

/// Classify a trained estimator.
pub fn probe(estimator: &dyn Estimator) -> ScoreResult<EstimatorCapability> {
    match estimator.kind() {
        EstimatorKind::Classifier => Ok(EstimatorCapability::Classifier),
        EstimatorKind::Regressor => Ok(EstimatorCapability::Regressor),
        EstimatorKind::Clusterer => {
            if estimator.predictor().is_some() {
                Ok(EstimatorCapability::Clusterer { inductive: true })
            } else if estimator.stored_training_labels().is_some() {
                Ok(EstimatorCapability::Clusterer { inductive: false })
            } else {
                Err(ScoreError::UnsupportedEstimator(
                    "clusterer has neither a predict operation nor stored training labels"
                        .to_string(),
                ))
            }
        }
        EstimatorKind::Other(kind) => Err(ScoreError::UnsupportedEstimator(format!(
            "estimator kind `{kind}` is not a classifier, regressor or clusterer"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EstimatorError;
    use crate::estimator::Predictor;
    use crate::record::Value;

    struct Probe {
        kind: EstimatorKind,
        predicts: bool,
        labels: Option<Vec<Value>>,
    }

    impl Predictor for Probe {
        fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<Value>, EstimatorError> {
            Ok(vec![Value::Int(0); features.len()])
        }
    }

    impl Estimator for Probe {
        fn kind(&self) -> EstimatorKind {
            self.kind.clone()
        }

        fn predictor(&self) -> Option<&dyn Predictor> {
            self.predicts.then_some(self as &dyn Predictor)
        }

        fn stored_training_labels(&self) -> Option<&[Value]> {
            self.labels.as_deref()
        }
    }

    fn probe_of(kind: EstimatorKind, predicts: bool, labels: Option<Vec<Value>>) -> ScoreResult<EstimatorCapability> {
        probe(&Probe {
            kind,
            predicts,
            labels,
        })
    }

    #[test]
    fn supervised_kinds_map_directly() {
        assert_eq!(
            probe_of(EstimatorKind::Classifier, true, None),
            Ok(EstimatorCapability::Classifier)
        );
        assert_eq!(
            probe_of(EstimatorKind::Regressor, false, None),
            Ok(EstimatorCapability::Regressor)
        );
    }

    #[test]
    fn clusterers_split_on_predictor() {
        assert_eq!(
            probe_of(EstimatorKind::Clusterer, true, None),
            Ok(EstimatorCapability::Clusterer { inductive: true })
        );
        assert_eq!(
            probe_of(EstimatorKind::Clusterer, false, Some(vec![Value::Int(0)])),
            Ok(EstimatorCapability::Clusterer { inductive: false })
        );
    }

    #[test]
    fn unclassifiable_estimators_are_unsupported() {
        assert!(matches!(
            probe_of(EstimatorKind::Other("transformer".to_string()), true, None),
            Err(ScoreError::UnsupportedEstimator(_))
        ));
        assert!(matches!(
            probe_of(EstimatorKind::Clusterer, false, None),
            Err(ScoreError::UnsupportedEstimator(_))
        ));
    }

    #[test]
    fn capability_serializes_tagged() {
        let json = serde_json::to_value(EstimatorCapability::Clusterer { inductive: false })
            .expect("capability should serialize");
        assert_eq!(json, serde_json::json!({"kind": "clusterer", "inductive": false}));
    }
}
