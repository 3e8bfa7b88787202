//! Accuracy facade: one call from model, scorer and source to a score.

use crate::context::ScoringResult;
use crate::error::{ScoreError, ScoreResult};
use crate::estimator::Model;
use crate::registry::{Scorer, registry};
use crate::source::DataSource;
use tracing::debug;

/// A scorer given by registered name or as a configured instance.
#[derive(Debug, Clone, Copy)]
pub enum ScorerRef<'a> {
    Name(&'a str),
    Instance(&'a Scorer),
}

impl<'a> From<&'a str> for ScorerRef<'a> {
    fn from(name: &'a str) -> Self {
        ScorerRef::Name(name)
    }
}

impl<'a> From<&'a String> for ScorerRef<'a> {
    fn from(name: &'a String) -> Self {
        ScorerRef::Name(name)
    }
}

impl<'a> From<&'a Scorer> for ScorerRef<'a> {
    fn from(scorer: &'a Scorer) -> Self {
        ScorerRef::Instance(scorer)
    }
}

/// Score `model` on `source` and return the scalar.
pub async fn score<'a>(
    model: &dyn Model,
    scorer: impl Into<ScorerRef<'a>>,
    source: &dyn DataSource,
) -> ScoreResult<f64> {
    score_report(model, scorer, source)
        .await
        .map(|result| result.value)
}

/// Score `model` on `source` and return the full result.
///
/// The scorer is resolved and the model's trained state checked before the
/// source is opened. The source context is released on every path.
pub async fn score_report<'a>(
    model: &dyn Model,
    scorer: impl Into<ScorerRef<'a>>,
    source: &dyn DataSource,
) -> ScoreResult<ScoringResult> {
    let scorer = match scorer.into() {
        ScorerRef::Name(name) => registry()?.get(name)?,
        ScorerRef::Instance(scorer) => scorer,
    };
    if !model.is_trained() {
        return Err(ScoreError::ModelNotTrained);
    }
    let mut cursor = source.open().await?;
    let mut context = scorer.open();
    debug!(scorer = scorer.id(), run = %context.run_id(), "context opened");
    context.score(model, cursor.as_mut()).await
}
