//! Q1: queries selecting a metric with no label filters

use super::{AnalysisContext, Rule};
use crate::models::{Finding, Severity};
use crate::promql::{Expr, VectorSelector};

/// Detects PromQL queries with bare metrics or insufficient label matchers.
/// Without filters a query scans every series for a metric, which gets
/// extremely expensive at scale.
pub struct MissingFilters;

impl Rule for MissingFilters {
    fn id(&self) -> &'static str {
        "Q1"
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Finding> {
        let mut findings = Vec::new();
        for panel in ctx.panels_with_targets() {
            for target in &panel.targets {
                let Some(expr) = ctx.expr(&target.expr) else {
                    continue;
                };
                expr.walk(&mut |node| {
                    let vs = match node {
                        Expr::Selector(vs) | Expr::Matrix { selector: vs, .. } => vs,
                        _ => return,
                    };
                    if vs.real_matcher_count() > 0 {
                        return;
                    }
                    findings.push(self.build_finding(ctx, panel.id, &panel.title, vs));
                });
            }
        }
        findings
    }
}

impl MissingFilters {
    fn build_finding(
        &self,
        ctx: &AnalysisContext,
        panel_id: i64,
        panel_title: &str,
        vs: &VectorSelector,
    ) -> Finding {
        let metric = vs.metric_name().unwrap_or("");
        let mut confidence = 0.9;
        let mut why = format!(
            "Query selects all series for metric {metric:?} without any label filters. \
             This forces a full scan across all label combinations."
        );
        let mut impact =
            "Reduces series scanned by ~10-100x depending on cardinality".to_string();

        if let Some(card) = &ctx.cardinality {
            let series = card.estimated_series(metric, 0);
            if series > 0 {
                confidence = 0.95;
                why = format!(
                    "Query selects all {series} series for metric {metric:?} without any \
                     label filters. This forces a full scan across all label combinations."
                );
                impact = format!(
                    "This metric has {series} active series — adding filters could reduce \
                     scans by 10-100x"
                );
            }
        }

        Finding {
            rule_id: "Q1".to_string(),
            severity: Severity::Critical,
            panel_ids: vec![panel_id],
            panel_titles: vec![panel_title.to_string()],
            title: "Missing label filters".to_string(),
            why,
            fix: format!(
                "Add label matchers to narrow the selection, e.g. \
                 {metric}{{job=\"...\", namespace=\"...\"}}"
            ),
            impact,
            validate: "Query Inspector → Stats tab → check 'Series fetched' before/after"
                .to_string(),
            auto_fixable: false,
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::single_panel;
    use super::*;
    use crate::cardinality::CardinalityData;

    #[test]
    fn bare_metric_fires() {
        let ctx = single_panel(&["up"]);
        let findings = MissingFilters.check(&ctx);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule_id, "Q1");
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].panel_ids, vec![1]);
        assert!(findings[0].why.contains("\"up\""));
    }

    #[test]
    fn filtered_metric_passes() {
        let ctx = single_panel(&[r#"up{job="node"}"#]);
        assert!(MissingFilters.check(&ctx).is_empty());
    }

    #[test]
    fn unfiltered_matrix_selector_fires() {
        let ctx = single_panel(&["rate(http_requests_total[5m])"]);
        assert_eq!(MissingFilters.check(&ctx).len(), 1);
    }

    #[test]
    fn cardinality_data_sharpens_finding() {
        let mut ctx = single_panel(&["up"]);
        let mut card = CardinalityData::default();
        card.series_by_metric.insert("up".into(), 4200);
        ctx.cardinality = Some(card);
        let findings = MissingFilters.check(&ctx);
        assert_eq!(findings[0].confidence, 0.95);
        assert!(findings[0].why.contains("4200"));
        assert!(findings[0].impact.contains("4200"));
    }

    #[test]
    fn name_only_matcher_selector_counts_as_bare() {
        let ctx = single_panel(&[r#"{__name__="up"}"#]);
        let findings = MissingFilters.check(&ctx);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].why.contains("\"up\""));
    }
}
