// src/main.rs

//! scriptgen
//!
//! Entry point for the scriptgen CLI.
//!
//! Responsibilities of this file:
//! - Load `.env` and initialise logging
//! - Parse CLI arguments
//! - Hand off execution to the runner
//!
//! There is intentionally *no business logic* here.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use scriptgen::{cli, runner};

/// Program entry point.
///
/// Uses Tokio because generation is an HTTP call and execution waits on a
/// child process with a timeout.
#[tokio::main]
async fn main() -> Result<()> {
    // missing .env is fine
    let _ = dotenvy::dotenv();

    // logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("scriptgen=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    runner::run(cli).await
}
