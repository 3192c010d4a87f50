//! Q12: binary operations between different metrics without on()/ignoring()

use super::{AnalysisContext, Rule};
use crate::models::{Finding, Severity};
use crate::promql::Expr;

/// Detects binary expressions between two different metrics without an
/// explicit on()/ignoring() label list. Prometheus then matches on ALL
/// labels, which often produces silently empty results.
pub struct AmbiguousVectorMatching;

impl Rule for AmbiguousVectorMatching {
    fn id(&self) -> &'static str {
        "Q12"
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
                    let Expr::Binary {
                        op,
                        lhs,
                        rhs,
                        matching,
                    } = node
                    else {
                        return;
                    };
                    // Set operations always vector-match by definition.
                    if op.is_set_op() {
                        return;
                    }
                    if matching.as_ref().is_some_and(|m| !m.labels.is_empty()) {
                        return;
                    }

                    let (Some(left), Some(right)) =
                        (primary_metric_name(lhs), primary_metric_name(rhs))
                    else {
                        return;
                    };
                    if left == right {
                        return;
                    }

                    findings.push(Finding {
                        rule_id: "Q12".to_string(),
                        severity: Severity::Medium,
                        panel_ids: vec![panel.id],
                        panel_titles: vec![panel.title.clone()],
                        title: "Binary operation without explicit label matching"
                            .to_string(),
                        why: format!(
                            "Binary {op} between {left:?} and {right:?} without \
                             on()/ignoring(). Prometheus matches on ALL labels, which \
                             may produce empty results if the two metrics have different \
                             label sets."
                        ),
                        fix: format!(
                            "Add explicit matching: ... {op} on(common_labels) ..., or \
                             use ignoring(differing_labels)."
                        ),
                        impact: "Explicit matching prevents silent empty results and \
                                 makes the query's intent clear"
                            .to_string(),
                        validate: "Run the query and verify it returns the expected \
                                   number of series"
                            .to_string(),
                        auto_fixable: false,
                        confidence: 0.7,
                    });
                });
            }
        }
        findings
    }
}

/// The metric name of the outermost selector on one side of a binary
/// operation. Complex shapes (aggregations, literals) yield `None` so the
/// rule stays conservative.
fn primary_metric_name(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Selector(vs) | Expr::Matrix { selector: vs, .. } => vs.metric_name(),
        Expr::Call { args, .. } => args.first().and_then(primary_metric_name),
        Expr::Paren(inner) => primary_metric_name(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::single_panel;
    use super::*;

    #[test]
    fn cross_metric_division_fires() {
        let ctx = single_panel(&[r#"node_memory_Active_bytes{job="x"} / node_memory_MemTotal_bytes{job="x"}"#]);
        let findings = AmbiguousVectorMatching.check(&ctx);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].why.contains("node_memory_Active_bytes"));
    }

    #[test]
    fn explicit_on_clause_passes() {
        let ctx = single_panel(&[r#"a{job="x"} / on(instance) b{job="x"}"#]);
        assert!(AmbiguousVectorMatching.check(&ctx).is_empty());
    }

    #[test]
    fn same_metric_both_sides_passes() {
        let ctx = single_panel(&[r#"m{a="1"} - m{a="2"}"#]);
        assert!(AmbiguousVectorMatching.check(&ctx).is_empty());
    }

    #[test]
    fn scalar_operand_passes() {
        let ctx = single_panel(&[r#"m{job="x"} > 0.5"#]);
        assert!(AmbiguousVectorMatching.check(&ctx).is_empty());
    }

    #[test]
    fn set_operations_skipped() {
        let ctx = single_panel(&[r#"a{job="x"} and b{job="x"}"#]);
        assert!(AmbiguousVectorMatching.check(&ctx).is_empty());
    }

    #[test]
    fn rate_wrapped_metrics_still_compared() {
        let ctx = single_panel(&[r#"rate(a_total{job="x"}[5m]) / rate(b_total{job="x"}[5m])"#]);
        assert_eq!(AmbiguousVectorMatching.check(&ctx).len(), 1);
    }
}
