mod analysis;
mod cli;
mod codes;
mod commands;
mod export;
mod ingest;
mod model;
mod semester;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Semesters(args) => commands::semesters::run(args),
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::Publish(args) => commands::publish::run(args),
        Commands::History(args) => commands::history::run(args),
        Commands::Compare(args) => commands::compare::run(args),
        Commands::Summary(args) => commands::summary::run(args),
        Commands::Codes(args) => commands::codes::run(args),
        Commands::Inspect(args) => commands::inspect::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
