use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "assay",
    about = "Assay: score trained estimators with pluggable accuracy metrics",
    version
)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered scorers
    Scorers {
        /// Only scorers applicable to this class: classification, clustering or regression
        #[arg(long)]
        class: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the metric catalog by class
    Catalog {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one scorer's applicability and config schema
    Describe {
        /// Scorer plugin id
        scorer: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score a trained model against a JSONL record source
    Score {
        /// Model directory (config.json + model.json)
        #[arg(long)]
        model: Option<String>,

        /// Path to records JSONL
        #[arg(long)]
        source: Option<String>,

        /// Scorer plugin id
        #[arg(long)]
        scorer: Option<String>,

        /// Scorer config value as key=value (repeatable; JSON values accepted)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// TOML file with [run] defaults and a [scorer] config table
        #[arg(long)]
        config: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
