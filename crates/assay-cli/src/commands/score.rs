use crate::support::{
    ScoreFile, load_score_file_or_exit, print_json_or_exit, registry_or_exit, required_or_exit,
    runtime_or_exit, scorer_values,
};
use assay_kernel::{ScoringResult, score_report};
use assay_models::DirectoryModel;
use assay_source::JsonlSource;
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use std::process;
use tracing::info;

const RESULT_KIND: &str = "assay.scoring_result.v1";

#[derive(Debug, Clone)]
pub struct Args {
    pub model: Option<String>,
    pub source: Option<String>,
    pub scorer: Option<String>,
    pub set: Vec<String>,
    pub config: Option<String>,
    pub json: bool,
}

pub fn run(args: Args) {
    let file = args
        .config
        .as_deref()
        .map(load_score_file_or_exit)
        .unwrap_or_default();
    let ScoreFile { run, scorer: table } = file;
    let model_dir = required_or_exit(args.model, run.model, "model");
    let source_path = required_or_exit(args.source, run.source, "source");
    let scorer_name = required_or_exit(args.scorer, run.scorer, "scorer");

    let values = scorer_values(&table, &args.set).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });
    let scorer = registry_or_exit()
        .get(&scorer_name)
        .and_then(|scorer| scorer.configure(&values))
        .unwrap_or_else(|e| {
            eprintln!("error: {e}");
            process::exit(1);
        });

    let model = DirectoryModel::load(&model_dir).unwrap_or_else(|e| {
        eprintln!("error: failed to load model {model_dir}: {e}");
        process::exit(1);
    });
    let source = JsonlSource::new(&source_path);
    info!(model = %model_dir, source = %source_path, "scoring with `{scorer_name}`");

    let runtime = runtime_or_exit();
    let result: ScoringResult = runtime
        .block_on(score_report(&model, &scorer, &source))
        .unwrap_or_else(|e| {
            eprintln!("error: {e}");
            process::exit(1);
        });
    let scored_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    if args.json {
        let payload = json!({
            "schema": 1,
            "resultKind": RESULT_KIND,
            "scorer": result.scorer,
            "value": result.value,
            "records": result.records,
            "capability": result.capability,
            "advisories": result.advisories,
            "model": model_dir,
            "modelDigest": model.digest(),
            "source": source_path,
            "scoredAt": scored_at,
        });
        print_json_or_exit(&payload);
    } else {
        println!("assay score {}", result.scorer);
        println!("  Model: {model_dir}");
        if let Some(digest) = model.digest() {
            println!("  Model digest: {digest}");
        }
        println!("  Source: {source_path}");
        println!("  Estimator: {}", result.capability);
        println!("  Records: {}", result.records);
        println!("  Value: {}", result.value);
        for advisory in &result.advisories {
            println!("  Advisory [{}]: {}", advisory.code, advisory.message);
        }
        println!("  Scored at: {scored_at}");
    }
}
