//! Scorer configuration: typed schemas and the resolved metric config.
//!
//! A scorer declares the fields it accepts as a static [`ConfigField`]
//! slice. Caller-supplied values (a JSON object, or a TOML table converted
//! to JSON) are checked against that schema before they are deserialized
//! into a [`MetricConfig`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Value kind of a configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigKind {
    String,
    Integer,
    Float,
    StringList,
}

impl ConfigKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            ConfigKind::String => value.is_string(),
            ConfigKind::Integer => value.is_u64(),
            ConfigKind::Float => value.is_number(),
            ConfigKind::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigField {
    pub name: &'static str,
    pub kind: ConfigKind,
    pub default: &'static str,
    pub help: &'static str,
}

/// Averaging mode for multi-class precision/recall/F1/Jaccard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Average {
    #[default]
    Binary,
    Micro,
    Macro,
    Weighted,
}

/// Resolved configuration handed to every metric function.
///
/// Fields a scorer's schema does not list keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricConfig {
    pub average: Average,
    pub pos_label: String,
    pub k: usize,
    pub labels: Option<Vec<String>>,
    pub eps: f64,
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            average: Average::Binary,
            pos_label: "1".to_string(),
            k: 2,
            labels: None,
            eps: 1e-15,
        }
    }
}

pub const AVERAGE: ConfigField = ConfigField {
    name: "average",
    kind: ConfigKind::String,
    default: "binary",
    help: "averaging mode: binary, micro, macro or weighted",
};

pub const POS_LABEL: ConfigField = ConfigField {
    name: "pos_label",
    kind: ConfigKind::String,
    default: "1",
    help: "label of the positive class",
};

pub const K: ConfigField = ConfigField {
    name: "k",
    kind: ConfigKind::Integer,
    default: "2",
    help: "number of most likely outcomes considered correct",
};

pub const LABELS: ConfigField = ConfigField {
    name: "labels",
    kind: ConfigKind::StringList,
    default: "sorted distinct y_true labels",
    help: "class labels indexing the score vectors",
};

pub const EPS: ConfigField = ConfigField {
    name: "eps",
    kind: ConfigKind::Float,
    default: "1e-15",
    help: "probability clipping bound",
};

pub const NO_FIELDS: &[ConfigField] = &[];
pub const AVERAGED_FIELDS: &[ConfigField] = &[AVERAGE, POS_LABEL];
pub const TOP_K_FIELDS: &[ConfigField] = &[K, LABELS];
pub const PROBABILITY_FIELDS: &[ConfigField] = &[POS_LABEL];
pub const LOG_LOSS_FIELDS: &[ConfigField] = &[POS_LABEL, EPS];

/// Check `values` against `schema` and resolve them onto `base`.
pub fn resolve(
    schema: &[ConfigField],
    base: &MetricConfig,
    values: &Value,
) -> Result<MetricConfig, String> {
    let Some(object) = values.as_object() else {
        return Err("config values must be an object".to_string());
    };

    for (key, value) in object {
        let field = schema
            .iter()
            .find(|field| field.name == key)
            .ok_or_else(|| format!("unknown field `{key}`"))?;
        if !field.kind.accepts(value) {
            return Err(format!(
                "field `{key}` expects {:?}, got {value}",
                field.kind
            ));
        }
    }

    let mut merged: Map<String, Value> = match serde_json::to_value(base) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(e) => return Err(e.to_string()),
    };
    for (key, value) in object {
        merged.insert(key.clone(), value.clone());
    }
    let config: MetricConfig =
        serde_json::from_value(Value::Object(merged)).map_err(|e| e.to_string())?;
    if config.k == 0 {
        return Err("field `k` must be at least 1".to_string());
    }
    Ok(config)
}
