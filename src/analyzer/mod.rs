//! Analysis engine
//!
//! Orchestrates the pipeline: load dashboard → parse expressions → run
//! rules → score → assemble report. The engine itself holds no per-run
//! state; everything a rule may read lives in the [`AnalysisContext`]
//! built fresh for each dashboard.

pub mod cost;

use crate::cardinality::{self, CardinalityData};
use crate::dashboard::{self, Dashboard};
use crate::models::{Report, ReportMetadata};
use crate::promql::{self, Expr};
use crate::rules::{default_rules, AnalysisContext, Rule};
use crate::scoring;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// The step assumed when estimating query costs for the report.
const COST_STEP_SECS: f64 = 15.0;

pub struct Engine {
    rules: Vec<Box<dyn Rule>>,
    cardinality_client: Option<cardinality::Client>,
}

impl Default for Engine {
    /// An engine with the full built-in rule catalog.
    fn default() -> Self {
        Self {
            rules: default_rules(),
            cardinality_client: None,
        }
    }
}

impl Engine {
    /// An engine with the full built-in rule catalog, same as `default()`.
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine with no rules registered, for callers assembling their
    /// own catalog via [`Engine::register_rule`].
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            cardinality_client: None,
        }
    }

    pub fn register_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    /// Enable live cardinality enrichment. The engine fetches TSDB status
    /// data once per run and hands it to rules through the context; fetch
    /// failures degrade to static analysis.
    pub fn with_cardinality(mut self, client: cardinality::Client) -> Self {
        self.cardinality_client = Some(client);
        self
    }

    pub fn analyze_file(&self, path: &Path) -> Result<Report> {
        let dash = dashboard::load_dashboard(path)?;
        Ok(self.analyze_dashboard(dash))
    }

    pub fn analyze_bytes(&self, data: &[u8]) -> Result<Report> {
        let dash = dashboard::parse_dashboard(data).context("parsing dashboard")?;
        Ok(self.analyze_dashboard(dash))
    }

    /// Run every registered rule against a parsed dashboard. This is
    /// infallible: unparseable expressions are counted and skipped, and a
    /// failed cardinality fetch falls back to heuristics.
    pub fn analyze_dashboard(&self, dash: Dashboard) -> Report {
        let exprs = dashboard::all_target_exprs(&dash);
        let (parsed, parse_errors) = parse_all_exprs(&exprs);

        let cardinality_data = self.fetch_cardinality();

        let total_panels = dashboard::all_panels(&dash).len();
        let total_targets: usize = dashboard::all_panels(&dash)
            .iter()
            .map(|p| p.targets.len())
            .sum();

        let ctx = AnalysisContext {
            dashboard: dash,
            parsed_exprs: parsed,
            cardinality: cardinality_data,
        };

        let mut findings = Vec::new();
        for rule in &self.rules {
            findings.extend(rule.check(&ctx));
        }

        let score = scoring::compute_score(&findings);
        let panel_scores = scoring::compute_panel_scores(&findings);

        let query_costs: HashMap<String, f64> = ctx
            .parsed_exprs
            .iter()
            .map(|(raw, expr)| {
                let cost =
                    cost::estimate_cost(Some(expr), ctx.cardinality.as_ref(), COST_STEP_SECS);
                (raw.clone(), cost)
            })
            .collect();

        Report {
            dashboard_uid: ctx.dashboard.uid.clone(),
            dashboard_title: ctx.dashboard.title.clone(),
            score,
            findings,
            panel_scores,
            metadata: ReportMetadata {
                total_panels,
                total_targets,
                parse_errors,
                analyzer_version: env!("CARGO_PKG_VERSION").to_string(),
                cardinality_available: ctx.cardinality.is_some(),
                query_costs,
            },
        }
    }

    fn fetch_cardinality(&self) -> Option<CardinalityData> {
        let client = self.cardinality_client.as_ref()?;
        match client.fetch() {
            Ok(data) => Some(data),
            Err(err) => {
                warn!("cardinality enrichment unavailable: {err:#}");
                None
            }
        }
    }
}

/// Parse every distinct raw expression, keyed by the original string so
/// rules can map findings back to panels. Returns the parsed map and the
/// count of expressions that failed to parse.
fn parse_all_exprs(exprs: &[&str]) -> (HashMap<String, Expr>, usize) {
    let mut parsed = HashMap::with_capacity(exprs.len());
    let mut errors = 0;
    for raw in exprs {
        if raw.is_empty() {
            continue;
        }
        let normalized = promql::substitute(raw);
        match promql::parse(&normalized) {
            Ok(expr) => {
                parsed.insert((*raw).to_string(), expr);
            }
            Err(err) => {
                warn!("unparseable PromQL (skipped): {raw:?} — {err}");
                errors += 1;
            }
        }
    }
    (parsed, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DASH: &str = r#"{
        "uid": "test-dash",
        "title": "Test Dashboard",
        "refresh": "10s",
        "time": {"from": "now-7d", "to": "now"},
        "panels": [
            {"id": 1, "title": "Bare", "type": "timeseries",
             "targets": [{"expr": "up"}]},
            {"id": 2, "title": "Fine", "type": "timeseries", "maxDataPoints": 500,
             "targets": [{"expr": "sum by (job) (rate(http_requests_total{job=\"api\"}[$__rate_interval]))"}]},
            {"id": 3, "title": "Broken", "type": "timeseries", "maxDataPoints": 500,
             "targets": [{"expr": "rate(((("}]}
        ]
    }"#;

    #[test]
    fn full_pipeline_produces_report() {
        let report = Engine::default().analyze_bytes(DASH.as_bytes()).unwrap();
        assert_eq!(report.dashboard_uid, "test-dash");
        assert_eq!(report.metadata.total_panels, 3);
        assert_eq!(report.metadata.total_targets, 3);
        assert_eq!(report.metadata.parse_errors, 1);
        assert!(!report.metadata.cardinality_available);
        assert!(report.score < 100);
        // Bare selector on panel 1 must surface as a Q1 finding.
        assert!(report
            .findings
            .iter()
            .any(|f| f.rule_id == "Q1" && f.panel_ids == vec![1]));
        // D5 fires on the 10s refresh, D6 on the 7d range.
        assert!(report.findings.iter().any(|f| f.rule_id == "D5"));
        assert!(report.findings.iter().any(|f| f.rule_id == "D6"));
    }

    #[test]
    fn findings_are_in_registration_order() {
        let report = Engine::default().analyze_bytes(DASH.as_bytes()).unwrap();
        let rule_order = |id: &str| -> usize {
            default_rules().iter().position(|r| r.id() == id).unwrap()
        };
        let positions: Vec<usize> = report
            .findings
            .iter()
            .map(|f| rule_order(&f.rule_id))
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn panel_scores_cover_flagged_panels() {
        let report = Engine::default().analyze_bytes(DASH.as_bytes()).unwrap();
        assert!(report.panel_scores.contains_key(&1));
        let score = report.panel_scores[&1];
        assert!((1..100).contains(&score));
    }

    #[test]
    fn query_costs_keyed_by_raw_expression() {
        let report = Engine::default().analyze_bytes(DASH.as_bytes()).unwrap();
        assert!(report.metadata.query_costs.contains_key("up"));
        assert_eq!(report.metadata.query_costs["up"], 1000.0);
        // The broken expression never parses, so it has no cost entry.
        assert!(!report.metadata.query_costs.contains_key("rate(((("));
    }

    #[test]
    fn empty_engine_reports_perfect_score() {
        let report = Engine::empty().analyze_bytes(DASH.as_bytes()).unwrap();
        assert_eq!(report.score, 100);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn new_engine_carries_the_default_catalog() {
        let via_new = Engine::new().analyze_bytes(DASH.as_bytes()).unwrap();
        let via_default = Engine::default().analyze_bytes(DASH.as_bytes()).unwrap();
        assert_eq!(via_new.findings.len(), via_default.findings.len());
        assert_eq!(via_new.score, via_default.score);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(Engine::default().analyze_bytes(b"not json").is_err());
    }
}
