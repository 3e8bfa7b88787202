//! Scorer registry.
//!
//! Every catalog row becomes one [`Scorer`] through a single factory,
//! [`Scorer::from_descriptor`], alongside the estimator-native scorer. The
//! process-wide registry is built once by [`registry`] and is read-only
//! afterwards, so concurrent scoring runs share it without locking.

use crate::capability::EstimatorCapability;
use crate::catalog::{self, MetricDescriptor};
use crate::config::{self, ConfigField, MetricConfig};
use crate::context::ScoringContext;
use crate::error::{ScoreError, ScoreResult};
use crate::metrics::MetricClass;
use regex::Regex;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Plugin id of the scorer that defers to the estimator's own score.
pub const ESTIMATOR_SCORER_ID: &str = "estimator_score";

pub const REGISTRY_KIND: &str = "assay.scorer_registry.v1";
pub const REGISTRY_SCHEMA: u32 = 1;

/// What a scorer invokes once records are assembled.
#[derive(Debug, Clone, Copy)]
pub enum Binding {
    /// The estimator's native score, or mutual information / silhouette
    /// for clusterers.
    Estimator,
    /// A catalog metric applied to `(y_true, y_pred)`.
    Metric(MetricDescriptor),
}

/// One registered, independently configurable scorer.
#[derive(Debug, Clone)]
pub struct Scorer {
    id: &'static str,
    binding: Binding,
    config: MetricConfig,
}

impl Scorer {
    /// The factory every catalog scorer is built through.
    pub fn from_descriptor(descriptor: MetricDescriptor) -> Self {
        Self {
            id: descriptor.id,
            binding: Binding::Metric(descriptor),
            config: MetricConfig::default(),
        }
    }

    pub fn estimator() -> Self {
        Self {
            id: ESTIMATOR_SCORER_ID,
            binding: Binding::Estimator,
            config: MetricConfig::default(),
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn binding(&self) -> Binding {
        self.binding
    }

    pub fn config(&self) -> &MetricConfig {
        &self.config
    }

    /// Applicability class; `None` means any estimator.
    pub fn applicability(&self) -> Option<MetricClass> {
        match self.binding {
            Binding::Estimator => None,
            Binding::Metric(descriptor) => Some(descriptor.class),
        }
    }

    pub fn accepts(&self, capability: EstimatorCapability) -> bool {
        self.applicability()
            .is_none_or(|class| class == capability.metric_class())
    }

    pub fn config_schema(&self) -> &'static [ConfigField] {
        match self.binding {
            Binding::Estimator => config::NO_FIELDS,
            Binding::Metric(descriptor) => descriptor.config,
        }
    }

    /// Copy of this scorer with `values` applied. Values are checked against
    /// the scorer's schema.
    pub fn configure(&self, values: &Value) -> ScoreResult<Scorer> {
        let config = config::resolve(self.config_schema(), &self.config, values).map_err(
            |reason| ScoreError::InvalidConfig {
                scorer: self.id.to_string(),
                reason,
            },
        )?;
        Ok(Self {
            config,
            ..self.clone()
        })
    }

    /// Open a scoring context bound to this scorer.
    pub fn open(&self) -> ScoringContext {
        let mut context = ScoringContext::new(self.clone());
        context.open();
        context
    }

    /// Serializable summary: id, name, class and config schema.
    pub fn info(&self) -> ScorerInfo {
        ScorerInfo {
            id: self.id,
            name: match self.binding {
                Binding::Estimator => "EstimatorScore",
                Binding::Metric(descriptor) => descriptor.name,
            },
            class: self.applicability(),
            config: self.config_schema(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorerInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub class: Option<MetricClass>,
    pub config: &'static [ConfigField],
}

fn plugin_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("plugin id regex must compile"))
}

fn validate_id(id: &str) -> ScoreResult<()> {
    if plugin_id_re().is_match(id) {
        Ok(())
    } else {
        Err(ScoreError::InvalidPluginId(id.to_string()))
    }
}

/// Immutable name → scorer table.
#[derive(Debug, Clone)]
pub struct ScorerRegistry {
    scorers: BTreeMap<&'static str, Scorer>,
}

impl ScorerRegistry {
    /// Build a registry from `descriptors` plus the estimator scorer.
    ///
    /// Fails fast with [`ScoreError::RegistryCollision`] when two
    /// descriptors claim one id; nothing is registered in that case.
    pub fn build(descriptors: impl IntoIterator<Item = MetricDescriptor>) -> ScoreResult<Self> {
        let mut scorers = BTreeMap::new();
        scorers.insert(ESTIMATOR_SCORER_ID, Scorer::estimator());
        for descriptor in descriptors {
            validate_id(descriptor.id)?;
            if scorers.contains_key(descriptor.id) {
                return Err(ScoreError::RegistryCollision(descriptor.id.to_string()));
            }
            scorers.insert(descriptor.id, Scorer::from_descriptor(descriptor));
        }
        Ok(Self { scorers })
    }

    pub fn builder() -> ScorerRegistryBuilder {
        ScorerRegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> ScoreResult<&Scorer> {
        self.scorers
            .get(name)
            .ok_or_else(|| ScoreError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scorers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.scorers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scorers.is_empty()
    }

    /// Registered ids in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.scorers.keys().copied()
    }

    /// Every scorer in id order.
    pub fn scorers(&self) -> impl Iterator<Item = &Scorer> {
        self.scorers.values()
    }

    /// Scorers applicable to `class`. The estimator scorer applies to every
    /// class.
    pub fn scorers_for(&self, class: MetricClass) -> impl Iterator<Item = &Scorer> {
        self.scorers
            .values()
            .filter(move |scorer| scorer.applicability().is_none_or(|c| c == class))
    }

    pub fn describe(&self, name: &str) -> ScoreResult<ScorerInfo> {
        self.get(name).map(Scorer::info)
    }

    pub fn registry_json(&self) -> Value {
        let scorers: Vec<ScorerInfo> = self.scorers.values().map(Scorer::info).collect();
        json!({
            "schema": REGISTRY_SCHEMA,
            "registryKind": REGISTRY_KIND,
            "scorers": scorers,
        })
    }
}

/// Incremental registration. Re-registering an identical descriptor is a
/// no-op returning the existing id; a different descriptor on a taken id
/// is a collision.
#[derive(Debug, Clone)]
pub struct ScorerRegistryBuilder {
    scorers: BTreeMap<&'static str, Scorer>,
}

impl Default for ScorerRegistryBuilder {
    fn default() -> Self {
        let mut scorers = BTreeMap::new();
        scorers.insert(ESTIMATOR_SCORER_ID, Scorer::estimator());
        Self { scorers }
    }
}

impl ScorerRegistryBuilder {
    pub fn register(&mut self, descriptor: MetricDescriptor) -> ScoreResult<&'static str> {
        validate_id(descriptor.id)?;
        if let Some(existing) = self.scorers.get(descriptor.id) {
            return match existing.binding {
                Binding::Metric(current) if current.same_as(&descriptor) => Ok(current.id),
                _ => Err(ScoreError::RegistryCollision(descriptor.id.to_string())),
            };
        }
        self.scorers
            .insert(descriptor.id, Scorer::from_descriptor(descriptor));
        Ok(descriptor.id)
    }

    /// Register every catalog row. Idempotent.
    pub fn extend_from_catalog(&mut self) -> ScoreResult<()> {
        for descriptor in catalog::CATALOG {
            self.register(*descriptor)?;
        }
        Ok(())
    }

    pub fn build(self) -> ScorerRegistry {
        ScorerRegistry {
            scorers: self.scorers,
        }
    }
}

/// The process-wide registry over the canonical catalog.
pub fn registry() -> ScoreResult<&'static ScorerRegistry> {
    static REGISTRY: OnceLock<ScoreResult<ScorerRegistry>> = OnceLock::new();
    REGISTRY
        .get_or_init(|| ScorerRegistry::build(catalog::CATALOG.iter().copied()))
        .as_ref()
        .map_err(Clone::clone)
}
