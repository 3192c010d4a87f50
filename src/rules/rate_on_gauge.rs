//! Q11: rate()/irate() applied to gauge metrics

use super::{AnalysisContext, Rule};
use crate::models::{Finding, Severity};
use crate::promql::Expr;

/// Metric name prefixes known to be gauge-type.
const KNOWN_GAUGE_PREFIXES: &[&str] = &[
    "go_goroutines",
    "go_threads",
    "go_memstats_",
    "go_info",
    "process_resident_memory_bytes",
    "process_virtual_memory_bytes",
    "process_open_fds",
    "process_max_fds",
    "node_memory_",
    "node_filesystem_",
    "node_load",
    "node_time_seconds",
    "node_boot_time_seconds",
    "prometheus_tsdb_head_series",
    "prometheus_tsdb_head_chunks",
    "up",
];

/// Detects rate() or irate() applied to gauge-type metrics. These
/// functions compute per-second change and only make sense on counters;
/// on gauges they produce mostly-zero noise with occasional spikes.
pub struct RateOnGauge;

impl Rule for RateOnGauge {
    fn id(&self) -> &'static str {
        "Q11"
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Finding> {
        let mut findings = Vec::new();
        for panel in ctx.panels_with_targets() {
            for target in &panel.targets {
                let Some(expr) = ctx.expr(&target.expr) else {
                    continue;
                };
                expr.walk(&mut |node| {
                    let Expr::Call { func, args } = node else {
                        return;
                    };
                    if func != "rate" && func != "irate" {
                        return;
                    }
                    let Some(metric) = args.first().and_then(Expr::first_metric_name) else {
                        return;
                    };
                    if !is_likely_gauge(metric) {
                        return;
                    }
                    findings.push(Finding {
                        rule_id: "Q11".to_string(),
                        severity: Severity::Medium,
                        panel_ids: vec![panel.id],
                        panel_titles: vec![panel.title.clone()],
                        title: "rate()/irate() on gauge metric".to_string(),
                        why: format!(
                            "{func}() is applied to {metric:?}, which appears to be a \
                             gauge metric. rate/irate compute per-second change and only \
                             produce meaningful results on counters (_total, _count, \
                             _bucket)."
                        ),
                        fix: format!(
                            "Use the metric directly ({metric}) or use delta() / \
                             deriv() instead of {func}() for gauge metrics."
                        ),
                        impact: "Correct function choice produces accurate \
                                 visualizations instead of mostly-zero noise"
                            .to_string(),
                        validate: "Compare rate() output with raw metric — gauges \
                                   should show actual values, not per-second derivatives"
                            .to_string(),
                        auto_fixable: false,
                        confidence: 0.6,
                    });
                });
            }
        }
        findings
    }
}

/// Conservative gauge classification: only flag metrics that are
/// definitely gauges, never unknown ones. Counter suffixes win over any
/// prefix match.
fn is_likely_gauge(name: &str) -> bool {
    if name.ends_with("_total")
        || name.ends_with("_count")
        || name.ends_with("_sum")
        || name.ends_with("_bucket")
    {
        return false;
    }
    KNOWN_GAUGE_PREFIXES.iter().any(|p| name.starts_with(p))
}
