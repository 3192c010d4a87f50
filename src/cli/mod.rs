//! CLI definition and command handlers

use crate::analyzer::Engine;
use crate::cardinality;
use crate::fixer;
use crate::models::{Report, Severity};
use crate::reporters;
use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Analyze Grafana dashboards for performance anti-patterns
///
/// Parses the dashboard JSON, lints every PromQL expression and the
/// dashboard structure, and reports findings with a composite health
/// score.
#[derive(Parser, Debug)]
#[command(name = "dashlint")]
#[command(
    version,
    about = "Lint Grafana dashboards for query and design anti-patterns",
    after_help = "\
Examples:
  dashlint dashboard.json                      Analyze and print a text report
  dashlint dashboard.json --format json        JSON output for scripting
  dashlint dashboard.json --fail-on high       Exit code 1 if high+ findings (CI mode)
  dashlint dashboard.json --fix -o fixed.json  Apply auto-fixes, write patched JSON
  dashlint dashboard.json --prometheus-url http://prom:9090
                                               Enrich findings with live cardinality"
)]
pub struct Cli {
    /// Path to the dashboard JSON file
    pub dashboard: PathBuf,

    /// Output format: text, json
    #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Exit code 1 if findings at this severity or above exist
    #[arg(long, value_parser = ["critical", "high", "medium", "low"])]
    pub fail_on: Option<String>,

    /// Apply auto-fixes and output the patched dashboard JSON
    #[arg(long)]
    pub fix: bool,

    /// Write output to this file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Prometheus base URL for live cardinality enrichment
    #[arg(long)]
    pub prometheus_url: Option<String>,

    /// Timeout in seconds for Prometheus API requests
    #[arg(long, default_value = "5")]
    pub timeout: u64,
}

/// Run the CLI and return the process exit code. Usage and I/O errors
/// surface as `Err` and map to exit code 2 in main.
pub fn run(cli: Cli) -> Result<i32> {
    let mut engine = Engine::default();
    if let Some(url) = &cli.prometheus_url {
        let client = cardinality::Client::new(url, Duration::from_secs(cli.timeout));
        engine = engine.with_cardinality(client);
    }

    let report = engine.analyze_file(&cli.dashboard)?;

    if cli.fix {
        run_fix(&cli, &report)
    } else {
        run_lint(&cli, &report)
    }
}

fn run_lint(cli: &Cli, report: &Report) -> Result<i32> {
    let rendered = reporters::report(report, &cli.format)?;
    write_output(cli.output.as_deref(), &rendered)?;

    if let Some(fail_on) = &cli.fail_on {
        let threshold: Severity = fail_on.parse()?;
        if report.findings.iter().any(|f| f.severity >= threshold) {
            return Ok(1);
        }
    }
    Ok(0)
}

fn run_fix(cli: &Cli, report: &Report) -> Result<i32> {
    let raw = fs::read(&cli.dashboard)
        .with_context(|| format!("reading {}", cli.dashboard.display()))?;
    let (patched, fix_count) = fixer::apply_fixes(&raw, &report.findings)?;

    if fix_count == 0 {
        eprintln!("No auto-fixable issues found.");
        return Ok(0);
    }

    let mut rendered = serde_json::to_string_pretty(&patched)?;
    rendered.push('\n');
    write_output(cli.output.as_deref(), &rendered)?;
    eprintln!("Applied {fix_count} fix(es).");
    Ok(0)
}

fn write_output(path: Option<&std::path::Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => fs::write(path, content)
            .with_context(|| format!("writing {}", path.display())),
        None => {
            print!("{content}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_lint_invocation() {
        let cli = Cli::parse_from(["dashlint", "dash.json", "--format", "json"]);
        assert_eq!(cli.dashboard, PathBuf::from("dash.json"));
        assert_eq!(cli.format, "json");
        assert!(!cli.fix);
        assert!(cli.fail_on.is_none());
    }

    #[test]
    fn parses_fix_invocation() {
        let cli = Cli::parse_from(["dashlint", "dash.json", "--fix", "-o", "out.json"]);
        assert!(cli.fix);
        assert_eq!(cli.output, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn rejects_unknown_format() {
        assert!(Cli::try_parse_from(["dashlint", "dash.json", "--format", "yaml"]).is_err());
    }
}
