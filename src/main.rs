//! Offense predictor - Main Entry Point

use clap::Parser;
use offense_predictor::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offense=info,offense_predictor=info".into()),
        )
        .init();

    run(Cli::parse())
}
