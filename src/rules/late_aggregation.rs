//! Q5: aggregations wrapping unfiltered selectors

use super::{has_unfiltered_selector, AnalysisContext, Rule};
use crate::models::{Finding, Severity};
use crate::promql::Expr;

/// Detects aggregations that wrap unfiltered vector selectors. When sum()
/// wraps a bare metric, Prometheus fetches every series first and then
/// aggregates, the opposite of pushing filters down as early as possible.
pub struct LateAggregation;

impl Rule for LateAggregation {
    fn id(&self) -> &'static str {
        "Q5"
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
                    let Expr::Aggregate { expr: inner, .. } = node else {
                        return;
                    };
                    if !has_unfiltered_selector(inner) {
                        return;
                    }
                    let metric = inner.first_metric_name().unwrap_or("<unknown>");
                    findings.push(self.build_finding(ctx, panel.id, &panel.title, metric));
                });
            }
        }
        findings
    }
}

impl LateAggregation {
    fn build_finding(
        &self,
        ctx: &AnalysisContext,
        panel_id: i64,
        panel_title: &str,
        metric: &str,
    ) -> Finding {
        let mut confidence = 0.75;
        let mut why = format!(
            "An aggregation wraps the metric {metric:?} which has no label filters. \
             Prometheus must fetch all series first, then aggregate — wasting memory \
             and I/O."
        );
        let mut impact =
            "Pushes filtering earlier, reducing series fetched by orders of magnitude"
                .to_string();

        if let Some(card) = &ctx.cardinality {
            let series = card.estimated_series(metric, 0);
            if series > 0 {
                confidence = 0.9;
                why = format!(
                    "An aggregation wraps the metric {metric:?} ({series} active series) \
                     with no label filters. Prometheus fetches all {series} series first, \
                     then aggregates — wasting memory and I/O."
                );
                impact = format!(
                    "Adding filters before aggregation could avoid scanning {series} \
                     series unnecessarily"
                );
            }
        }

        Finding {
            rule_id: "Q5".to_string(),
            severity: Severity::Medium,
            panel_ids: vec![panel_id],
            panel_titles: vec![panel_title.to_string()],
            title: "Late aggregation over unfiltered selector".to_string(),
            why,
            fix: format!(
                "Add label matchers to {metric} before aggregating, e.g. \
                 {metric}{{namespace=\"...\"}}."
            ),
            impact,
            validate: "Query Inspector → Stats tab → compare 'Series fetched' \
                       before/after"
                .to_string(),
            auto_fixable: false,
            confidence,
        }
    }
}
