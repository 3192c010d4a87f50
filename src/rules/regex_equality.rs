//! Q3: regex matchers where equality would do

use super::{contains_regex_meta, AnalysisContext, Rule};
use crate::models::{Finding, Severity};
use crate::promql::{Expr, MatchOp};

/// Detects `=~` matchers whose value contains no regex metacharacters.
/// These should use `=` instead, skipping the regex engine entirely.
pub struct RegexEquality;

impl Rule for RegexEquality {
    fn id(&self) -> &'static str {
        "Q3"
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
                    let vs = match node {
                        Expr::Selector(vs) | Expr::Matrix { selector: vs, .. } => vs,
                        _ => return,
                    };
                    for m in &vs.matchers {
                        if m.op != MatchOp::Regex || contains_regex_meta(&m.value) {
                            continue;
                        }
                        findings.push(Finding {
                            rule_id: "Q3".to_string(),
                            severity: Severity::Medium,
                            panel_ids: vec![panel.id],
                            panel_titles: vec![panel.title.clone()],
                            title: "Regex matcher where equality suffices".to_string(),
                            why: format!(
                                "Label {:?} uses regex match =~{:?} but the value contains \
                                 no regex metacharacters. Regex matching is slower than \
                                 equality.",
                                m.name, m.value
                            ),
                            fix: format!(
                                "Change {name}=~\"{value}\" to {name}=\"{value}\"",
                                name = m.name,
                                value = m.value
                            ),
                            impact: "Avoids regex engine overhead on every label lookup"
                                .to_string(),
                            validate: "Query Inspector → Stats tab → compare query time \
                                       before/after"
                                .to_string(),
                            auto_fixable: true,
                            confidence: 1.0,
                        });
                    }
                });
            }
        }
        findings
    }
}
