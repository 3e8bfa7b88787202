use assay_kernel::{Feature, FeatureType, Features, Model, ModelConfig, Record};
use assay_models::{DirectoryModel, TrainSpec, train};
use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "assay-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn run_assay<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_assay");
    Command::new(bin)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("assay command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_failure(output: &Output) {
    if output.status.success() {
        panic!(
            "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "expected valid JSON stdout, got error: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn sample_records() -> Vec<Record> {
    [
        (1.0, "no"),
        (1.5, "no"),
        (2.0, "no"),
        (6.0, "yes"),
        (6.5, "yes"),
        (7.0, "yes"),
        (2.5, "yes"),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (x, label))| {
        Record::new(format!("rec-{i}"))
            .with_feature("x", x)
            .with_feature("y", 3.0 * x + 2.0)
            .with_feature("label", label)
    })
    .collect()
}

fn write_sample_source(path: &Path) {
    let body: String = sample_records()
        .iter()
        .map(|record| serde_json::to_string(record).expect("record should serialize") + "\n")
        .collect();
    fs::write(path, body).expect("sample records should be written");
}

fn x_only() -> Features {
    Features::new(vec![Feature::new("x", FeatureType::Float, 1)])
}

fn write_regressor(dir: &Path) -> DirectoryModel {
    let config = ModelConfig {
        features: x_only(),
        predict: Some(Feature::new("y", FeatureType::Float, 1)),
        tcluster: None,
    };
    let mut model = DirectoryModel::create(dir, config).expect("model dir should be created");
    let state = train(&sample_records(), model.config(), &TrainSpec::LinearRegression)
        .expect("regressor should train");
    model.save(state).expect("model state should be saved");
    model
}

fn write_classifier(dir: &Path) {
    let config = ModelConfig {
        features: x_only(),
        predict: Some(Feature::new("label", FeatureType::Str, 1)),
        tcluster: None,
    };
    let mut model = DirectoryModel::create(dir, config).expect("model dir should be created");
    let state = train(&sample_records(), model.config(), &TrainSpec::NearestCentroid)
        .expect("classifier should train");
    model.save(state).expect("model state should be saved");
}

#[test]
fn scorers_json_lists_catalog_and_estimator_scorer() {
    let output = run_assay(["scorers", "--json"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["registryKind"], "assay.scorer_registry.v1");
    assert_eq!(payload["count"], 31);
    let ids: Vec<&str> = payload["scorers"]
        .as_array()
        .expect("scorers array")
        .iter()
        .filter_map(|s| s["id"].as_str())
        .collect();
    assert!(ids.contains(&"estimator_score"));
    assert!(ids.contains(&"mean_gamma_deviance"));
}

#[test]
fn scorers_filters_by_class() {
    let output = run_assay(["scorers", "--class", "clustering"]);
    assert_success(&output);
    let text = stdout_text(&output);
    assert!(text.contains("Count: 10"));
    assert!(text.contains("adjusted_rand_score [clustering]"));
    assert!(text.contains("estimator_score [any]"));
    assert!(!text.contains("r2_score"));

    let output = run_assay(["scorers", "--class", "ranking"]);
    assert_failure(&output);
    assert!(stderr_text(&output).contains("unknown metric class"));
}

#[test]
fn catalog_lists_metric_table_without_estimator_scorer() {
    let output = run_assay(["catalog", "--json"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["catalogKind"], "assay.metric_catalog.v1");
    let metrics = payload["metrics"].as_array().expect("metrics array");
    assert_eq!(metrics.len(), 30);
    assert!(metrics.iter().all(|m| m["id"] != "estimator_score"));

    let output = run_assay(["catalog"]);
    assert_success(&output);
    let text = stdout_text(&output);
    assert!(text.contains("Metrics: 30"));
    assert!(text.contains("  regression:"));
    assert!(text.contains("- top_k_accuracy_score (k, labels)"));
}

#[test]
fn describe_prints_config_schema() {
    let output = run_assay(["describe", "f1_score", "--json"]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["class"], "classification");
    assert_eq!(payload["config"][0]["name"], "average");
    assert_eq!(payload["config"][1]["name"], "pos_label");

    let output = run_assay(["describe", "no_such_scorer"]);
    assert_failure(&output);
    assert!(stderr_text(&output).contains("scorer not found"));
}

#[test]
fn score_json_reports_value_and_digest() {
    let tmp = TempDirGuard::new("score-json");
    let model_dir = tmp.path().join("model");
    let source = tmp.path().join("records.jsonl");
    let model = write_regressor(&model_dir);
    write_sample_source(&source);

    let output = run_assay([
        OsStr::new("score"),
        OsStr::new("--model"),
        model_dir.as_os_str(),
        OsStr::new("--source"),
        source.as_os_str(),
        OsStr::new("--scorer"),
        OsStr::new("r2_score"),
        OsStr::new("--json"),
    ]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["resultKind"], "assay.scoring_result.v1");
    assert_eq!(payload["scorer"], "r2_score");
    assert_eq!(payload["records"], 7);
    assert_eq!(payload["capability"]["kind"], "regressor");
    assert_eq!(payload["modelDigest"].as_str(), model.digest());
    let value = payload["value"].as_f64().expect("value");
    assert!((value - 1.0).abs() < 1e-9);
    let scored_at = payload["scoredAt"].as_str().expect("scoredAt");
    assert!(chrono::DateTime::parse_from_rfc3339(scored_at).is_ok());
}

#[test]
fn score_reads_run_defaults_and_scorer_table_from_config() {
    let tmp = TempDirGuard::new("score-config");
    let model_dir = tmp.path().join("model");
    let source = tmp.path().join("records.jsonl");
    write_classifier(&model_dir);
    write_sample_source(&source);
    let config = tmp.path().join("assay.toml");
    fs::write(
        &config,
        format!(
            "[run]\nmodel = {:?}\nsource = {:?}\nscorer = \"recall_score\"\n\n[scorer]\npos_label = \"no\"\n",
            model_dir.display().to_string(),
            source.display().to_string(),
        ),
    )
    .expect("config should be written");

    // Centroids 1.5 and 5.5; x = 2.5 is labelled "yes" but predicted "no".
    let output = run_assay([
        OsStr::new("score"),
        OsStr::new("--config"),
        config.as_os_str(),
        OsStr::new("--json"),
    ]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    assert_eq!(payload["scorer"], "recall_score");
    assert_eq!(payload["value"].as_f64(), Some(1.0));

    let output = run_assay([
        OsStr::new("score"),
        OsStr::new("--config"),
        config.as_os_str(),
        OsStr::new("--set"),
        OsStr::new("pos_label=yes"),
        OsStr::new("--json"),
    ]);
    assert_success(&output);
    let payload = parse_json_stdout(&output);
    let value = payload["value"].as_f64().expect("value");
    assert!((value - 0.75).abs() < 1e-12);
}

#[test]
fn score_rejects_unknown_scorer_and_bad_config() {
    let tmp = TempDirGuard::new("score-errors");
    let model_dir = tmp.path().join("model");
    let source = tmp.path().join("records.jsonl");
    write_regressor(&model_dir);
    write_sample_source(&source);

    let base = [
        OsStr::new("score"),
        OsStr::new("--model"),
        model_dir.as_os_str(),
        OsStr::new("--source"),
        source.as_os_str(),
    ];

    let output = run_assay(base.iter().copied().chain([
        OsStr::new("--scorer"),
        OsStr::new("no_such_scorer"),
    ]));
    assert_failure(&output);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_text(&output).contains("scorer not found: `no_such_scorer`"));

    let output = run_assay(base.iter().copied().chain([
        OsStr::new("--scorer"),
        OsStr::new("r2_score"),
        OsStr::new("--set"),
        OsStr::new("average=macro"),
    ]));
    assert_failure(&output);
    assert!(stderr_text(&output).contains("invalid config for scorer `r2_score`"));

    let output = run_assay(base.iter().copied().chain([
        OsStr::new("--scorer"),
        OsStr::new("f1_score"),
    ]));
    assert_failure(&output);
    assert!(stderr_text(&output).contains("applies to classification estimators"));
}

#[test]
fn score_untrained_model_fails() {
    let tmp = TempDirGuard::new("score-untrained");
    let model_dir = tmp.path().join("model");
    let source = tmp.path().join("records.jsonl");
    DirectoryModel::create(
        &model_dir,
        ModelConfig {
            features: x_only(),
            predict: Some(Feature::new("y", FeatureType::Float, 1)),
            tcluster: None,
        },
    )
    .expect("model dir should be created");
    write_sample_source(&source);

    let output = run_assay([
        OsStr::new("score"),
        OsStr::new("--model"),
        model_dir.as_os_str(),
        OsStr::new("--source"),
        source.as_os_str(),
        OsStr::new("--scorer"),
        OsStr::new("estimator_score"),
    ]);
    assert_failure(&output);
    assert!(stderr_text(&output).contains("model not trained"));
}
