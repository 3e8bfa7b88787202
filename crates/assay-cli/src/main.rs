//! Assay CLI: the `assay` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    support::init_tracing(cli.verbose);

    match cli.command {
        Commands::Scorers { class, json } => commands::scorers::run(class, json),

        Commands::Catalog { json } => commands::catalog::run(json),

        Commands::Describe { scorer, json } => commands::describe::run(scorer, json),

        Commands::Score {
            model,
            source,
            scorer,
            set,
            config,
            json,
        } => commands::score::run(commands::score::Args {
            model,
            source,
            scorer,
            set,
            config,
            json,
        }),
    }
}
