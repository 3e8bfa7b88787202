//! Per-invocation scoring context.
//!
//! A context moves `Idle -> Opened -> Scoring -> Closed` exactly once. The
//! estimator capability picks one of four paths:
//!
//! - supervised estimators with the estimator scorer use the native score
//! - clusterers with a `tcluster` target use mutual information
//! - clusterers without one use the silhouette coefficient
//! - catalog scorers compare per-record predictions with the target

use crate::capability::{self, EstimatorCapability};
use crate::catalog::{self, MetricDescriptor};
use crate::error::{ScoreError, ScoreResult};
use crate::estimator::{Estimator, Model, ModelConfig};
use crate::feature::Feature;
use crate::record::Value;
use crate::registry::{Binding, Scorer};
use crate::source::SourceContext;
use futures::StreamExt;
use serde::Serialize;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextState {
    Idle,
    Opened,
    Scoring,
    Closed,
}

pub const TRANSDUCTIVE_ADVISORY: &str = "transductive_clusterer";

/// Non-fatal notice attached to a scoring result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    pub code: &'static str,
    pub message: String,
}

impl Advisory {
    fn transductive() -> Self {
        Self {
            code: TRANSDUCTIVE_ADVISORY,
            message: "transductive clusterer scored with its stored training labels; \
                      ensure the data passed is the training data"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResult {
    /// Plugin id of the scorer that produced `value`.
    pub scorer: String,
    pub value: f64,
    /// Records streamed from the source.
    pub records: usize,
    pub capability: EstimatorCapability,
    pub advisories: Vec<Advisory>,
}

impl ScoringResult {
    pub fn is_transductive(&self) -> bool {
        self.capability.is_transductive()
    }
}

/// Feature rows and target values gathered from one stream.
struct Batch {
    rows: Vec<Vec<f64>>,
    targets: Vec<Value>,
}

/// One scoring run bound to a scorer.
#[derive(Debug)]
pub struct ScoringContext {
    scorer: Scorer,
    state: ContextState,
    run_id: Uuid,
}

impl ScoringContext {
    pub(crate) fn new(scorer: Scorer) -> Self {
        Self {
            scorer,
            state: ContextState::Idle,
            run_id: Uuid::new_v4(),
        }
    }

    pub(crate) fn open(&mut self) {
        if self.state == ContextState::Idle {
            self.state = ContextState::Opened;
        }
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Score `model` against the records of `source`.
    ///
    /// The context ends `Closed` whether or not scoring succeeds.
    pub async fn score(
        &mut self,
        model: &dyn Model,
        source: &mut dyn SourceContext,
    ) -> ScoreResult<ScoringResult> {
        if self.state != ContextState::Opened {
            return Err(ScoreError::ContextState {
                expected: ContextState::Opened,
                actual: self.state,
            });
        }
        self.state = ContextState::Scoring;
        let span = info_span!("score", scorer = self.scorer.id(), run = %self.run_id);
        let outcome = self.run(model, source).instrument(span).await;
        self.state = ContextState::Closed;
        outcome
    }

    async fn run(
        &self,
        model: &dyn Model,
        source: &mut dyn SourceContext,
    ) -> ScoreResult<ScoringResult> {
        let estimator = model.estimator()?;
        let capability = capability::probe(estimator)?;
        if !self.scorer.accepts(capability)
            && let Some(expected) = self.scorer.applicability()
        {
            return Err(ScoreError::CapabilityMismatch {
                scorer: self.scorer.id().to_string(),
                expected,
                actual: capability,
            });
        }
        if capability.is_transductive() && matches!(self.scorer.binding(), Binding::Metric(_)) {
            return Err(ScoreError::UnsupportedEstimator(format!(
                "{capability} cannot predict per record; use `{}` instead",
                crate::registry::ESTIMATOR_SCORER_ID
            )));
        }
        info!(%capability, "selected scorer `{}`", self.scorer.id());

        let mut advisories = Vec::new();
        if capability.is_transductive() {
            warn!("accuracy found transductive clusterer, ensure data being passed is training data");
            advisories.push(Advisory::transductive());
        }

        let config = model.config();
        let (value, records) = match self.scorer.binding() {
            Binding::Metric(descriptor) => self.score_metric(descriptor, model, source).await?,
            Binding::Estimator if capability.is_supervised() => {
                self.score_supervised(estimator, config, source).await?
            }
            Binding::Estimator => match &config.tcluster {
                Some(tcluster) => {
                    self.score_against_truth(estimator, config, tcluster, source)
                        .await?
                }
                None => self.score_silhouette(estimator, config, source).await?,
            },
        };
        debug!(records, value, "score computed");

        Ok(ScoringResult {
            scorer: self.scorer.id().to_string(),
            value,
            records,
            capability,
            advisories,
        })
    }

    async fn gather(
        &self,
        config: &ModelConfig,
        target: Option<&Feature>,
        source: &mut dyn SourceContext,
    ) -> ScoreResult<Batch> {
        let mut batch = Batch {
            rows: Vec::new(),
            targets: Vec::new(),
        };
        let mut stream = source.stream(config.features.names_with(target));
        while let Some(record) = stream.next().await {
            let record = record?;
            batch.rows.push(config.features.flatten(&record)?);
            if let Some(target) = target {
                let value = record.feature(&target.name).cloned().ok_or_else(|| {
                    ScoreError::MissingPrediction {
                        record: record.key.clone(),
                        feature: target.name.clone(),
                    }
                })?;
                batch.targets.push(value);
            }
        }
        debug!(records = batch.rows.len(), "records streamed");
        if batch.rows.is_empty() {
            return Err(self.empty());
        }
        Ok(batch)
    }

    async fn score_supervised(
        &self,
        estimator: &dyn Estimator,
        config: &ModelConfig,
        source: &mut dyn SourceContext,
    ) -> ScoreResult<(f64, usize)> {
        let predict = config.predict.as_ref().ok_or(ScoreError::NoTargetFeature)?;
        let batch = self.gather(config, Some(predict), source).await?;
        let value = estimator.native_score(&batch.rows, &batch.targets)?;
        Ok((value, batch.rows.len()))
    }

    async fn score_against_truth(
        &self,
        estimator: &dyn Estimator,
        config: &ModelConfig,
        tcluster: &Feature,
        source: &mut dyn SourceContext,
    ) -> ScoreResult<(f64, usize)> {
        let batch = self.gather(config, Some(tcluster), source).await?;
        let value = match estimator.predictor() {
            Some(predictor) => {
                let labels = predictor.predict(&batch.rows)?;
                catalog::mutual_info_values(&batch.targets, &labels)?
            }
            None => catalog::mutual_info_values(&batch.targets, stored_labels(estimator)?)?,
        };
        Ok((value, batch.rows.len()))
    }

    async fn score_silhouette(
        &self,
        estimator: &dyn Estimator,
        config: &ModelConfig,
        source: &mut dyn SourceContext,
    ) -> ScoreResult<(f64, usize)> {
        let batch = self.gather(config, None, source).await?;
        let value = match estimator.predictor() {
            Some(predictor) => {
                let labels = predictor.predict(&batch.rows)?;
                catalog::silhouette_values(&batch.rows, &labels)?
            }
            None => catalog::silhouette_values(&batch.rows, stored_labels(estimator)?)?,
        };
        Ok((value, batch.rows.len()))
    }

    async fn score_metric(
        &self,
        descriptor: MetricDescriptor,
        model: &dyn Model,
        source: &mut dyn SourceContext,
    ) -> ScoreResult<(f64, usize)> {
        let config = model.config();
        let target = config.target().ok_or(ScoreError::NoTargetFeature)?;
        let mut y_true = Vec::new();
        let mut y_pred = Vec::new();
        let mut stream = source.stream(config.features.names_with(Some(target)));
        while let Some(record) = stream.next().await {
            let record = record?;
            let missing = || ScoreError::MissingPrediction {
                record: record.key.clone(),
                feature: target.name.clone(),
            };
            let truth = record.feature(&target.name).cloned().ok_or_else(missing)?;
            let predicted = model.predict_record(&record)?;
            let prediction = predicted.prediction(&target.name).ok_or_else(missing)?;
            y_true.push(truth);
            y_pred.push(prediction.value.clone());
        }
        debug!(records = y_true.len(), "records streamed");
        if y_true.is_empty() {
            return Err(self.empty());
        }
        let value = (descriptor.metric)(&y_true, &y_pred, self.scorer.config())?;
        Ok((value, y_true.len()))
    }

    fn empty(&self) -> ScoreError {
        ScoreError::EmptyDataset {
            scorer: self.scorer.id().to_string(),
        }
    }
}

fn stored_labels(estimator: &dyn Estimator) -> ScoreResult<&[Value]> {
    estimator.stored_training_labels().ok_or_else(|| {
        ScoreError::UnsupportedEstimator("clusterer has no stored training labels".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EstimatorError;
    use crate::estimator::{EstimatorKind, Predictor};
    use crate::feature::{FeatureType, Features};
    use crate::record::Record;
    use crate::registry::registry;
    use crate::source::{DataSource, MemorySource};
    use tracing_test::traced_test;

    /// Predicts the sign of the first feature.
    struct SignClassifier;

    impl Predictor for SignClassifier {
        fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<Value>, EstimatorError> {
            Ok(features
                .iter()
                .map(|row| Value::Int(i64::from(row[0] > 0.0)))
                .collect())
        }
    }

    impl Estimator for SignClassifier {
        fn kind(&self) -> EstimatorKind {
            EstimatorKind::Classifier
        }

        fn predictor(&self) -> Option<&dyn Predictor> {
            Some(self)
        }

        fn native_score(
            &self,
            features: &[Vec<f64>],
            targets: &[Value],
        ) -> Result<f64, EstimatorError> {
            let predicted = self.predict(features)?;
            let hits = predicted
                .iter()
                .zip(targets)
                .filter(|(p, t)| p.label() == t.label())
                .count();
            Ok(hits as f64 / targets.len() as f64)
        }
    }

    struct Labelled(Vec<Value>);

    impl Estimator for Labelled {
        fn kind(&self) -> EstimatorKind {
            EstimatorKind::Clusterer
        }

        fn stored_training_labels(&self) -> Option<&[Value]> {
            Some(&self.0)
        }
    }

    struct Harness<E> {
        config: ModelConfig,
        estimator: E,
    }

    impl<E: Estimator> Model for Harness<E> {
        fn config(&self) -> &ModelConfig {
            &self.config
        }

        fn is_trained(&self) -> bool {
            true
        }

        fn estimator(&self) -> ScoreResult<&dyn Estimator> {
            Ok(&self.estimator)
        }
    }

    fn classifier() -> Harness<SignClassifier> {
        Harness {
            config: ModelConfig {
                features: Features::new(vec![Feature::new("x", FeatureType::Float, 1)]),
                predict: Some(Feature::new("y", FeatureType::Int, 1)),
                tcluster: None,
            },
            estimator: SignClassifier,
        }
    }

    fn signs() -> MemorySource {
        MemorySource::new(vec![
            Record::new("a").with_feature("x", -1.0).with_feature("y", 0i64),
            Record::new("b").with_feature("x", 2.0).with_feature("y", 1i64),
            Record::new("c").with_feature("x", 3.0).with_feature("y", 0i64),
            Record::new("d").with_feature("x", 4.0).with_feature("y", 1i64),
        ])
    }

    async fn run(scorer: &str, model: &dyn Model, source: &MemorySource) -> ScoreResult<ScoringResult> {
        let scorer = registry()?.get(scorer)?;
        let mut context = scorer.open();
        let mut cursor = source.open().await?;
        context.score(model, cursor.as_mut()).await
    }

    #[tokio::test]
    async fn context_closes_after_scoring_and_rejects_reuse() {
        let scorer = registry().expect("registry").get("accuracy_score").expect("scorer");
        let mut context = scorer.open();
        assert_eq!(context.state(), ContextState::Opened);

        let model = classifier();
        let source = signs();
        let mut cursor = source.open().await.expect("open");
        let result = context.score(&model, cursor.as_mut()).await.expect("score");
        assert_eq!(result.value, 0.75);
        assert_eq!(result.records, 4);
        assert_eq!(context.state(), ContextState::Closed);

        let again = context.score(&model, cursor.as_mut()).await;
        assert_eq!(
            again,
            Err(ScoreError::ContextState {
                expected: ContextState::Opened,
                actual: ContextState::Closed,
            })
        );
    }

    #[tokio::test]
    async fn context_closes_after_failure() {
        let scorer = registry().expect("registry").get("accuracy_score").expect("scorer");
        let mut context = scorer.open();
        let source = MemorySource::default();
        let mut cursor = source.open().await.expect("open");
        let err = context
            .score(&classifier(), cursor.as_mut())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ScoreError::EmptyDataset {
                scorer: "accuracy_score".to_string()
            }
        );
        assert_eq!(context.state(), ContextState::Closed);
    }

    #[tokio::test]
    async fn estimator_scorer_uses_native_score() {
        let result = run("estimator_score", &classifier(), &signs())
            .await
            .expect("score");
        assert_eq!(result.value, 0.75);
        assert_eq!(result.capability, EstimatorCapability::Classifier);
        assert!(result.advisories.is_empty());
    }

    #[tokio::test]
    async fn metric_class_must_match_capability() {
        let err = run("r2_score", &classifier(), &signs()).await.unwrap_err();
        assert_eq!(
            err,
            ScoreError::CapabilityMismatch {
                scorer: "r2_score".to_string(),
                expected: crate::metrics::MetricClass::Regression,
                actual: EstimatorCapability::Classifier,
            }
        );
    }

    #[tokio::test]
    async fn record_without_target_is_missing_prediction() {
        let source = MemorySource::new(vec![
            Record::new("a").with_feature("x", 1.0).with_feature("y", 1i64),
            Record::new("b").with_feature("x", 2.0),
        ]);
        let err = run("f1_score", &classifier(), &source).await.unwrap_err();
        assert_eq!(
            err,
            ScoreError::MissingPrediction {
                record: "b".to_string(),
                feature: "y".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn catalog_metric_rejects_transductive_clusterer() {
        let model = Harness {
            config: ModelConfig {
                features: Features::new(vec![Feature::new("x", FeatureType::Float, 1)]),
                predict: None,
                tcluster: Some(Feature::new("t", FeatureType::Int, 1)),
            },
            estimator: Labelled(vec![Value::Int(0), Value::Int(1)]),
        };
        let source = MemorySource::new(vec![
            Record::new("a").with_feature("x", 0.0).with_feature("t", 0i64),
            Record::new("b").with_feature("x", 9.0).with_feature("t", 1i64),
        ]);
        let err = run("adjusted_rand_score", &model, &source)
            .await
            .unwrap_err();
        assert!(matches!(err, ScoreError::UnsupportedEstimator(_)));
        assert_eq!(source.usage().streamed(), 0);

        let result = run("estimator_score", &model, &source).await.expect("score");
        assert_eq!(result.advisories.len(), 1);
        assert_eq!(result.advisories[0].code, TRANSDUCTIVE_ADVISORY);
        assert!(result.is_transductive());
    }

    #[tokio::test]
    #[traced_test]
    async fn transductive_scoring_logs_warning() {
        let model = Harness {
            config: ModelConfig {
                features: Features::new(vec![Feature::new("x", FeatureType::Float, 1)]),
                predict: None,
                tcluster: None,
            },
            estimator: Labelled(vec![Value::Int(0), Value::Int(0), Value::Int(1)]),
        };
        let source = MemorySource::new(vec![
            Record::new("a").with_feature("x", 0.0),
            Record::new("b").with_feature("x", 1.0),
            Record::new("c").with_feature("x", 10.0),
        ]);
        let result = run("estimator_score", &model, &source).await.expect("score");
        assert!(result.value > 0.0 && result.value <= 1.0);
        assert!(logs_contain("transductive clusterer"));
        assert!(logs_contain("score computed"));
    }

    #[tokio::test]
    async fn ragged_vector_rows_fail_instead_of_scoring() {
        let model = Harness {
            config: ModelConfig {
                features: Features::new(vec![Feature::new("v", FeatureType::Float, 2)]),
                predict: None,
                tcluster: None,
            },
            estimator: Labelled(vec![
                Value::Int(0),
                Value::Int(0),
                Value::Int(1),
                Value::Int(1),
            ]),
        };
        let source = MemorySource::new(vec![
            Record::new("a").with_feature("v", vec![0.0, 0.0]),
            Record::new("b").with_feature("v", vec![0.0]),
            Record::new("c").with_feature("v", vec![10.0, 10.0, 99.0]),
            Record::new("d").with_feature("v", vec![10.0, 10.0]),
        ]);
        let err = run("estimator_score", &model, &source).await.unwrap_err();
        assert_eq!(
            err,
            ScoreError::FeatureShape {
                record: "b".to_string(),
                feature: "v".to_string(),
                expected: 2,
                actual: 1,
            }
        );
    }

    #[tokio::test]
    async fn supervised_scoring_requires_predict_feature() {
        let mut model = classifier();
        model.config.predict = None;
        let err = run("estimator_score", &model, &signs()).await.unwrap_err();
        assert_eq!(err, ScoreError::NoTargetFeature);
    }
}
