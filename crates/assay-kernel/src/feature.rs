//! Feature descriptors and row flattening.

use crate::error::{ScoreError, ScoreResult};
use crate::record::{Record, Value};
use serde::{Deserialize, Serialize};

/// Declared value type of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    Float,
    Int,
    Str,
    Bool,
}

/// One feature descriptor: name, value type and vector length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub dtype: FeatureType,
    #[serde(default = "default_length")]
    pub length: usize,
}

fn default_length() -> usize {
    1
}

impl Feature {
    pub fn new(name: impl Into<String>, dtype: FeatureType, length: usize) -> Self {
        Self {
            name: name.into(),
            dtype,
            length,
        }
    }
}

/// Ordered feature set defining which record fields participate in scoring.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Features(Vec<Feature>);

impl Features {
    pub fn new(features: Vec<Feature>) -> Self {
        Self(features)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|f| f.name.clone()).collect()
    }

    /// Feature names plus `extra`, skipping a duplicate of an existing name.
    pub fn names_with(&self, extra: Option<&Feature>) -> Vec<String> {
        let mut names = self.names();
        if let Some(extra) = extra
            && !names.contains(&extra.name)
        {
            names.push(extra.name.clone());
        }
        names
    }

    /// Total width of a flattened row: scalars count once, vectors count
    /// their declared length.
    pub fn width(&self) -> usize {
        self.0.iter().map(|f| f.length.max(1)).sum()
    }

    /// Flatten one record into a numeric row in feature order. Scalars
    /// stay in place; vectors are spread in place. Every value must match
    /// its declared length, so all rows of one feature set share a width.
    pub fn flatten(&self, record: &Record) -> ScoreResult<Vec<f64>> {
        let mut row = Vec::with_capacity(self.width());
        for feature in &self.0 {
            let value = record
                .feature(&feature.name)
                .ok_or_else(|| ScoreError::MissingPrediction {
                    record: record.key.clone(),
                    feature: feature.name.clone(),
                })?;
            let expected = feature.length.max(1);
            let actual = match value {
                Value::Vector(items) => items.len(),
                _ => 1,
            };
            if actual != expected {
                return Err(ScoreError::FeatureShape {
                    record: record.key.clone(),
                    feature: feature.name.clone(),
                    expected,
                    actual,
                });
            }
            match value {
                Value::Vector(items) => row.extend_from_slice(items),
                scalar => {
                    let x = scalar
                        .as_f64()
                        .ok_or_else(|| ScoreError::NonNumericFeature {
                            record: record.key.clone(),
                            feature: feature.name.clone(),
                        })?;
                    row.push(x);
                }
            }
        }
        Ok(row)
    }
}

impl FromIterator<Feature> for Features {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
