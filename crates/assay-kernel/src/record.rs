//! Records streamed from data sources.
//!
//! A record is read-only to the scoring subsystem. Model predictions are
//! attached to a copy via [`Record::with_prediction`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A feature or prediction value.
///
/// Deserialized untagged, so JSON `1` is an integer, `1.5` a float and
/// `[1.0, 2.0]` a fixed-length vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Vector(Vec<f64>),
}

impl Value {
    /// Numeric view of a scalar value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(_) | Value::Vector(_) => None,
        }
    }

    /// Canonical label key used by label-valued metrics.
    ///
    /// Integral floats collapse onto their integer spelling so that `3`
    /// and `3.0` name the same class. Booleans map to `1`/`0`.
    pub fn label(&self) -> Option<String> {
        match self {
            Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                Some(format!("{}", *f as i64))
            }
            Value::Float(f) => Some(f.to_string()),
            Value::Str(s) => Some(s.clone()),
            Value::Vector(_) => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::Vector(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Vector(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<Vec<f64>> for Value {
    fn from(value: Vec<f64>) -> Self {
        Value::Vector(value)
    }
}

/// A model prediction attached to a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub value: Value,
    pub confidence: f64,
}

impl Prediction {
    pub fn new(value: impl Into<Value>, confidence: f64) -> Self {
        Self {
            value: value.into(),
            confidence,
        }
    }
}

/// One keyed row: features plus zero or more named predictions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    #[serde(default)]
    pub features: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub predictions: BTreeMap<String, Prediction>,
}

impl Record {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// Builder-style feature insert.
    pub fn with_feature(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.features.insert(name.into(), value.into());
        self
    }

    /// Copy of this record with `prediction` stored under `name`.
    pub fn with_prediction(&self, name: impl Into<String>, prediction: Prediction) -> Self {
        let mut out = self.clone();
        out.predictions.insert(name.into(), prediction);
        out
    }

    pub fn feature(&self, name: &str) -> Option<&Value> {
        self.features.get(name)
    }

    pub fn prediction(&self, name: &str) -> Option<&Prediction> {
        self.predictions.get(name)
    }

    /// Projection onto `names`. Features not listed are dropped; listed
    /// features the record lacks stay absent.
    pub fn project(&self, names: &[String]) -> Self {
        let features = names
            .iter()
            .filter_map(|name| {
                self.features
                    .get(name)
                    .map(|value| (name.clone(), value.clone()))
            })
            .collect();
        Self {
            key: self.key.clone(),
            features,
            predictions: self.predictions.clone(),
        }
    }
}
