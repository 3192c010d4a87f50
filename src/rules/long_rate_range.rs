//! Q6: rate-family calls over excessively long range windows

use super::{AnalysisContext, Rule, RATE_RANGE_FUNCS};
use crate::models::{Finding, Severity};
use crate::promql::{format_duration_secs, Expr};

/// Detects rate/irate/increase/delta/idelta calls whose range vector
/// window exceeds the threshold. Long windows force Prometheus to read
/// and iterate many more samples per series.
pub struct LongRateRange {
    pub max_range_secs: f64,
}

impl Default for LongRateRange {
    fn default() -> Self {
        Self {
            max_range_secs: 600.0,
        }
    }
}

impl Rule for LongRateRange {
    fn id(&self) -> &'static str {
        "Q6"
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
                    if !RATE_RANGE_FUNCS.contains(&func.as_str()) {
                        return;
                    }
                    let Some(Expr::Matrix { range_secs, .. }) = args.first() else {
                        return;
                    };
                    if *range_secs <= self.max_range_secs {
                        return;
                    }
                    findings.push(Finding {
                        rule_id: "Q6".to_string(),
                        severity: Severity::Medium,
                        panel_ids: vec![panel.id],
                        panel_titles: vec![panel.title.clone()],
                        title: "Long rate range".to_string(),
                        why: format!(
                            "{func}() uses a {} range window. Windows longer than {} \
                             force Prometheus to scan many more samples per series.",
                            format_duration_secs(*range_secs),
                            format_duration_secs(self.max_range_secs)
                        ),
                        fix: format!(
                            "Reduce the range to match the scrape interval or use \
                             $__rate_interval. E.g. {func}(metric[5m])."
                        ),
                        impact: "Reduces the number of samples processed per evaluation, \
                                 lowering CPU and memory"
                            .to_string(),
                        validate: "Query Inspector → Stats tab → compare query time \
                                   before/after"
                            .to_string(),
                        auto_fixable: false,
                        confidence: 0.8,
                    });
                });
            }
        }
        findings
    }
}
