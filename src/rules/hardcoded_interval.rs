//! Q7: hardcoded durations where $__rate_interval belongs

use super::{AnalysisContext, Rule, RATE_INTERVAL_FUNCS};
use crate::models::{Finding, Severity};
use crate::promql::Expr;
use regex::Regex;
use std::sync::OnceLock;

/// Matches rate/irate/increase calls with a hardcoded duration like [5m]
/// in the raw (pre-substitution) expression text.
fn hardcoded_range_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:rate|irate|increase)\s*\([^)]*\[\d+[smh]\]").expect("valid regex")
    })
}

/// Detects rate/irate/increase calls that use hardcoded time durations
/// instead of Grafana's $__rate_interval or $__interval. Hardcoded
/// intervals break when the dashboard time range or scrape interval
/// changes, often producing wrong or missing data.
pub struct HardcodedInterval;

impl Rule for HardcodedInterval {
    fn id(&self) -> &'static str {
        "Q7"
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Finding> {
        let mut findings = Vec::new();
        for panel in ctx.panels_with_targets() {
            for target in &panel.targets {
                let raw = target.expr.as_str();
                let Some(expr) = ctx.expr(raw) else {
                    continue;
                };
                let has_rate_func = expr.any(|node| {
                    matches!(node, Expr::Call { func, .. }
                        if RATE_INTERVAL_FUNCS.contains(&func.as_str()))
                });
                if !has_rate_func {
                    continue;
                }
                if raw.contains("$__rate_interval") || raw.contains("$__interval") {
                    continue;
                }
                let Some(m) = hardcoded_range_re().find(raw) else {
                    continue;
                };
                let func = RATE_INTERVAL_FUNCS
                    .iter()
                    .find(|f| m.as_str().starts_with(**f))
                    .copied()
                    .unwrap_or("rate");
                findings.push(Finding {
                    rule_id: "Q7".to_string(),
                    severity: Severity::Medium,
                    panel_ids: vec![panel.id],
                    panel_titles: vec![panel.title.clone()],
                    title: "Hardcoded interval in rate function".to_string(),
                    why: format!(
                        "{func}() uses a hardcoded duration instead of $__rate_interval \
                         or $__interval. This breaks when the dashboard time range or \
                         scrape interval changes."
                    ),
                    fix: format!(
                        "Replace the hardcoded duration with $__rate_interval, e.g. \
                         {func}(metric[$__rate_interval])."
                    ),
                    impact: "Ensures correct per-point calculations regardless of time \
                             range or scrape config"
                        .to_string(),
                    validate: "Change the dashboard time range and verify the panel \
                               still renders correctly"
                        .to_string(),
                    auto_fixable: true,
                    confidence: 0.9,
                });
            }
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::single_panel;
    use super::*;

    #[test]
    fn hardcoded_duration_fires() {
        let ctx = single_panel(&[r#"rate(http_requests_total{job="x"}[5m])"#]);
        let findings = HardcodedInterval.check(&ctx);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].auto_fixable);
        assert!(findings[0].why.starts_with("rate()"));
    }

    #[test]
    fn template_interval_passes() {
        let ctx = single_panel(&[r#"rate(m{job="x"}[$__rate_interval])"#]);
        assert!(HardcodedInterval.check(&ctx).is_empty());
    }

    #[test]
    fn irate_named_in_finding() {
        let ctx = single_panel(&[r#"irate(m{job="x"}[30s])"#]);
        let findings = HardcodedInterval.check(&ctx);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].why.starts_with("irate()"));
    }

    #[test]
    fn non_rate_range_function_passes() {
        let ctx = single_panel(&[r#"max_over_time(m{job="x"}[5m])"#]);
        assert!(HardcodedInterval.check(&ctx).is_empty());
    }
}
