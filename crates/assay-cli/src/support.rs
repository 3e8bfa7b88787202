use assay_kernel::{MetricClass, ScorerRegistry, registry};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the stderr log subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

pub fn registry_or_exit() -> &'static ScorerRegistry {
    registry().unwrap_or_else(|e| {
        eprintln!("error: scorer registry failed to initialize: {e}");
        process::exit(1);
    })
}

pub fn parse_class_or_exit(class: &str) -> MetricClass {
    class.parse().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    })
}

pub fn print_json_or_exit(payload: &Value) {
    match serde_json::to_string_pretty(payload) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("error: failed to render JSON output: {e}");
            process::exit(2);
        }
    }
}

pub fn runtime_or_exit() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        })
}

/// `--config` file: run defaults plus the scorer config table.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoreFile {
    pub run: RunSection,
    pub scorer: toml::Table,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    pub model: Option<String>,
    pub source: Option<String>,
    pub scorer: Option<String>,
}

pub fn load_score_file_or_exit(path: &str) -> ScoreFile {
    let text = fs::read_to_string(Path::new(path)).unwrap_or_else(|e| {
        eprintln!("error: failed to read config {path}: {e}");
        process::exit(1);
    });
    parse_score_file(&text).unwrap_or_else(|e| {
        eprintln!("error: invalid config {path}: {e}");
        process::exit(1);
    })
}

pub fn parse_score_file(text: &str) -> Result<ScoreFile, String> {
    toml::from_str(text).map_err(|e| e.to_string())
}

/// Merge the file's `[scorer]` table with `--set key=value` pairs; flags
/// win. Values that parse as JSON keep their JSON type, anything else is a
/// string.
pub fn scorer_values(table: &toml::Table, sets: &[String]) -> Result<Value, String> {
    let mut values = match serde_json::to_value(table) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(e) => return Err(e.to_string()),
    };
    for pair in sets {
        let Some((key, raw)) = pair.split_once('=') else {
            return Err(format!("`--set {pair}` must be KEY=VALUE"));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("`--set {pair}` has an empty key"));
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        values.insert(key.to_string(), value);
    }
    Ok(Value::Object(values))
}

pub fn required_or_exit(flag: Option<String>, file: Option<String>, name: &str) -> String {
    flag.or(file).unwrap_or_else(|| {
        eprintln!("error: missing --{name} (or `{name}` under [run] in --config)");
        process::exit(1);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_values_override_file_table() {
        let file = parse_score_file(
            r#"
            [run]
            scorer = "f1_score"

            [scorer]
            average = "macro"
            pos_label = "yes"
            "#,
        )
        .expect("config should parse");
        assert_eq!(file.run.scorer.as_deref(), Some("f1_score"));

        let values = scorer_values(&file.scorer, &["average=weighted".to_string()])
            .expect("values should merge");
        assert_eq!(values, json!({"average": "weighted", "pos_label": "yes"}));
    }

    #[test]
    fn set_values_keep_json_types() {
        let values = scorer_values(
            &toml::Table::new(),
            &["k=3".to_string(), r#"labels=["a","b"]"#.to_string()],
        )
        .expect("values should parse");
        assert_eq!(values, json!({"k": 3, "labels": ["a", "b"]}));
    }

    #[test]
    fn malformed_set_is_rejected() {
        assert!(scorer_values(&toml::Table::new(), &["average".to_string()]).is_err());
        assert!(scorer_values(&toml::Table::new(), &["=macro".to_string()]).is_err());
    }

    #[test]
    fn unknown_config_sections_are_rejected() {
        assert!(parse_score_file("[output]\nformat = \"json\"\n").is_err());
    }
}
