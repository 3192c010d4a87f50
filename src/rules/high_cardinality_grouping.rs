//! Q4: group-by clauses that explode output cardinality

use super::{AnalysisContext, Rule};
use crate::models::{Finding, Severity};
use crate::promql::Expr;

/// Label names that typically carry very high cardinality and should not
/// appear in group-by clauses.
const HIGH_CARDINALITY_LABELS: &[&str] = &[
    "pod",
    "container",
    "instance",
    "pod_name",
    "container_name",
    "id",
    "uid",
];

/// Detects aggregations that group by too many labels or by labels known
/// to have very high cardinality. Both shapes produce huge result sets
/// that stress Prometheus and the browser alike.
pub struct HighCardinalityGrouping {
    /// Grouping label count above which the "too many labels" variant fires.
    pub max_grouping_labels: usize,
}

impl Default for HighCardinalityGrouping {
    fn default() -> Self {
        Self {
            max_grouping_labels: 3,
        }
    }
}

impl Rule for HighCardinalityGrouping {
    fn id(&self) -> &'static str {
        "Q4"
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Finding> {
        let mut findings = Vec::new();
        for panel in ctx.panels_with_targets() {
            for target in &panel.targets {
                let Some(expr) = ctx.expr(&target.expr) else {
                    continue;
                };
                expr.walk(&mut |node| {
                    let Expr::Aggregate { grouping, .. } = node else {
                        return;
                    };
                    if grouping.len() > self.max_grouping_labels {
                        findings.push(Finding {
                            rule_id: "Q4".to_string(),
                            severity: Severity::High,
                            panel_ids: vec![panel.id],
                            panel_titles: vec![panel.title.clone()],
                            title: "High-cardinality grouping".to_string(),
                            why: format!(
                                "Aggregation groups by {} labels ({}). More than {} \
                                 grouping labels often produces an explosion of output \
                                 series.",
                                grouping.len(),
                                grouping.join(", "),
                                self.max_grouping_labels
                            ),
                            fix: "Reduce the number of grouping labels to only those \
                                  needed for the visualization."
                                .to_string(),
                            impact: "Fewer output series reduces memory, network, and \
                                     rendering cost"
                                .to_string(),
                            validate: "Query Inspector → Stats tab → check result series \
                                       count before/after"
                                .to_string(),
                            auto_fixable: false,
                            confidence: 0.8,
                        });
                    }
                    for lbl in grouping {
                        if !HIGH_CARDINALITY_LABELS.contains(&lbl.as_str()) {
                            continue;
                        }
                        findings.push(self.label_finding(ctx, panel.id, &panel.title, lbl));
                    }
                });
            }
        }
        findings
    }
}

impl HighCardinalityGrouping {
    fn label_finding(
        &self,
        ctx: &AnalysisContext,
        panel_id: i64,
        panel_title: &str,
        label: &str,
    ) -> Finding {
        let mut confidence = 0.85;
        let mut why = format!(
            "Aggregation groups by {label:?}, which is typically a very high-cardinality \
             label. This can produce thousands of output series."
        );
        if let Some(card) = &ctx.cardinality {
            let values = card.label_cardinality(label, 0);
            if values > 0 {
                confidence = 0.95;
                why = format!(
                    "Aggregation groups by {label:?}, which currently has {values} \
                     distinct values. This produces up to {values} output series."
                );
            }
        }
        Finding {
            rule_id: "Q4".to_string(),
            severity: Severity::High,
            panel_ids: vec![panel_id],
            panel_titles: vec![panel_title.to_string()],
            title: "High-cardinality grouping label".to_string(),
            why,
            fix: format!(
                "Remove {label:?} from the group-by clause or replace it with a \
                 lower-cardinality label (e.g. namespace, job)."
            ),
            impact: "Dramatically reduces the number of output series".to_string(),
            validate: "Query Inspector → Stats tab → check result series count \
                       before/after"
                .to_string(),
            auto_fixable: false,
            confidence,
        }
    }
}
