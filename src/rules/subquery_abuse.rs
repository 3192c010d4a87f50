//! Q8: subqueries that multiply evaluation work

use super::{AnalysisContext, Rule};
use crate::models::{Finding, Severity};
use crate::promql::{format_duration_secs, Expr};

/// Detects subqueries that are nested, combine a fine step with a long
/// range, or exceed a range/step ratio. Subqueries are evaluated
/// recursively and can multiply the work Prometheus must do.
pub struct SubqueryAbuse {
    /// Step below this with a range above `long_range_secs` fires the
    /// fine-step variant.
    pub fine_step_secs: f64,
    pub long_range_secs: f64,
    /// Range/step ratio above which the ratio variant fires.
    pub max_ratio: u64,
}

impl Default for SubqueryAbuse {
    fn default() -> Self {
        Self {
            fine_step_secs: 60.0,
            long_range_secs: 3600.0,
            max_ratio: 360,
        }
    }
}

impl Rule for SubqueryAbuse {
    fn id(&self) -> &'static str {
        "Q8"
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
                    let Expr::Subquery {
                        expr: inner,
                        range_secs,
                        step_secs,
                    } = node
                    else {
                        return;
                    };

                    let base = |title: &str, why: String, fix: &str, impact: &str,
                                validate: &str, confidence: f64| Finding {
                        rule_id: "Q8".to_string(),
                        severity: Severity::High,
                        panel_ids: vec![panel.id],
                        panel_titles: vec![panel.title.clone()],
                        title: title.to_string(),
                        why,
                        fix: fix.to_string(),
                        impact: impact.to_string(),
                        validate: validate.to_string(),
                        auto_fixable: false,
                        confidence,
                    };

                    if inner.any(|n| matches!(n, Expr::Subquery { .. })) {
                        findings.push(base(
                            "Nested subquery",
                            "A subquery is nested inside another subquery. Nested \
                             subqueries cause exponential evaluation cost and can \
                             overwhelm Prometheus."
                                .to_string(),
                            "Flatten the subquery or use recording rules to pre-compute \
                             intermediate results.",
                            "Avoids exponential evaluation cost",
                            "Query Inspector → Stats tab → compare query time \
                             before/after",
                            0.95,
                        ));
                    }

                    let Some(step) = step_secs.filter(|s| *s > 0.0) else {
                        return;
                    };

                    if step < self.fine_step_secs && *range_secs > self.long_range_secs {
                        findings.push(base(
                            "Subquery with fine step over long range",
                            format!(
                                "Subquery has a {} step over a {} range. This produces \
                                 {} evaluation points, creating excessive load.",
                                format_duration_secs(step),
                                format_duration_secs(*range_secs),
                                (range_secs / step) as u64
                            ),
                            "Increase the step or reduce the range. Consider using a \
                             recording rule for long-range aggregations.",
                            "Dramatically reduces the number of inner evaluations",
                            "Query Inspector → Stats tab → compare query time and \
                             samples before/after",
                            0.9,
                        ));
                    }

                    let ratio = (range_secs / step) as u64;
                    if ratio > self.max_ratio {
                        findings.push(base(
                            "Subquery with excessive range/step ratio",
                            format!(
                                "Subquery range/step ratio is {ratio} (range={}, \
                                 step={}). Ratios above {} cause excessive evaluation \
                                 points.",
                                format_duration_secs(*range_secs),
                                format_duration_secs(step),
                                self.max_ratio
                            ),
                            "Increase the step or reduce the range to bring the ratio \
                             under 360.",
                            "Reduces the number of evaluation points to a manageable \
                             level",
                            "Query Inspector → Stats tab → compare query time \
                             before/after",
                            0.85,
                        ));
                    }
                });
            }
        }
        findings
    }
}
