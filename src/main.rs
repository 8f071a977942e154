mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "asset_stamp=debug"
    } else if cli.quiet {
        "asset_stamp=error"
    } else {
        "asset_stamp=info"
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Init { force } => commands::init::run(force),
        Commands::Build { input, options } => commands::build::run(input, options),
        Commands::Inspect {
            input,
            options,
            json,
        } => commands::inspect::run(input, options, json),
        Commands::Watch { input, options } => commands::watch::run(input, options),
    }
}
