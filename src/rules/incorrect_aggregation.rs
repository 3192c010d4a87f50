//! Q10: rate-like functions applied after aggregation

use super::{AnalysisContext, Rule, RATE_INTERVAL_FUNCS};
use crate::models::{Finding, Severity};
use crate::promql::Expr;
use regex::Regex;
use std::sync::OnceLock;

/// Matches patterns like rate(sum( in raw expression text, the most common
/// form of inverted aggregation order.
fn inverted_order_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:rate|irate|increase)\s*\(\s*(?:sum|avg|min|max|count)\s*\(")
            .expect("valid regex")
    })
}

/// Detects rate/irate/increase applied after an aggregation, e.g.
/// rate(sum(x)[5m:]). Rate functions expect monotonically increasing
/// counter samples; aggregation output does not preserve that invariant.
/// The correct order is sum(rate(x[5m])).
pub struct IncorrectAggregation;

impl Rule for IncorrectAggregation {
    fn id(&self) -> &'static str {
        "Q10"
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Finding> {
        let mut findings = Vec::new();
        for panel in ctx.panels_with_targets() {
            for target in &panel.targets {
                let raw = target.expr.as_str();

                // String-level check catches the common textual shape even
                // when the expression fails to parse.
                if let Some(m) = inverted_order_re().find(raw) {
                    let func = outer_func_name(m.as_str());
                    findings.push(Finding {
                        rule_id: "Q10".to_string(),
                        severity: Severity::Medium,
                        panel_ids: vec![panel.id],
                        panel_titles: vec![panel.title.clone()],
                        title: "Incorrect aggregation order".to_string(),
                        why: format!(
                            "Expression applies {func}() over an aggregation. Rate-like \
                             functions expect raw counter values, but aggregation output \
                             is not a monotonic counter — results will be mathematically \
                             incorrect."
                        ),
                        fix: format!(
                            "Reverse the order: apply {func}() first on the raw metric, \
                             then aggregate. E.g. sum(rate(metric[5m])) instead of \
                             rate(sum(metric)[5m])."
                        ),
                        impact: "Produces mathematically correct results and often \
                                 reduces series scanned"
                            .to_string(),
                        validate: "Compare the output values — after fixing, the graph \
                                   shape should be similar but values will be accurate"
                            .to_string(),
                        auto_fixable: false,
                        confidence: 0.85,
                    });
                    continue;
                }

                // AST-level check: rate-like call over a subquery whose inner
                // expression aggregates.
                let Some(expr) = ctx.expr(raw) else {
                    continue;
                };
                expr.walk(&mut |node| {
                    let Expr::Call { func, args } = node else {
                        return;
                    };
                    if !RATE_INTERVAL_FUNCS.contains(&func.as_str()) {
                        return;
                    }
                    for arg in args {
                        let Expr::Subquery { expr: inner, .. } = arg else {
                            continue;
                        };
                        if !inner.any(|n| matches!(n, Expr::Aggregate { .. })) {
                            continue;
                        }
                        findings.push(Finding {
                            rule_id: "Q10".to_string(),
                            severity: Severity::Medium,
                            panel_ids: vec![panel.id],
                            panel_titles: vec![panel.title.clone()],
                            title: "Incorrect aggregation order".to_string(),
                            why: format!(
                                "Expression applies {func}() over a subquery containing \
                                 an aggregation. Rate-like functions expect raw counter \
                                 values, but aggregation output is not a monotonic \
                                 counter."
                            ),
                            fix: format!(
                                "Reverse the order: apply {func}() first on the raw \
                                 metric, then aggregate."
                            ),
                            impact: "Produces mathematically correct results and often \
                                     reduces series scanned"
                                .to_string(),
                            validate: "Compare the output values — after fixing, the \
                                       graph shape should be similar but values will be \
                                       accurate"
                                .to_string(),
                            auto_fixable: false,
                            confidence: 0.8,
                        });
                    }
                });
            }
        }
        findings
    }
}

fn outer_func_name(matched: &str) -> &'static str {
    RATE_INTERVAL_FUNCS
        .iter()
        .find(|f| matched.starts_with(**f))
        .copied()
        .unwrap_or("rate")
}
