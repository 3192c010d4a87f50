//! dashlint - Grafana dashboard linter
//!
//! Analyzes dashboard JSON for PromQL and design anti-patterns, scores
//! the result, and optionally applies automatic fixes.

use clap::Parser;
use std::process;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    // Initialize logging; RUST_LOG controls verbosity.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = dashlint::cli::Cli::parse();
    match dashlint::cli::run(cli) {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(2);
        }
    }
}
