//! Q2: regex matchers that match too broadly

use super::{AnalysisContext, Rule};
use crate::models::{Finding, Severity};
use crate::promql::{Expr, MatchOp};

/// Detects label matchers whose regex pattern forces the engine to scan an
/// enormous number of label values: `.+`, leading `.*`, or `.*` in the
/// middle of the pattern.
pub struct UnboundedRegex;

impl Rule for UnboundedRegex {
    fn id(&self) -> &'static str {
        "Q2"
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
                    let vs = match node {
                        Expr::Selector(vs) | Expr::Matrix { selector: vs, .. } => vs,
                        _ => return,
                    };
                    for m in &vs.matchers {
                        if m.name == "__name__" || m.op != MatchOp::Regex {
                            continue;
                        }
                        let Some(reason) = unbounded_reason(&m.value) else {
                            continue;
                        };
                        findings.push(Finding {
                            rule_id: "Q2".to_string(),
                            severity: Severity::High,
                            panel_ids: vec![panel.id],
                            panel_titles: vec![panel.title.clone()],
                            title: "Unbounded regex matcher".to_string(),
                            why: format!(
                                "Label {:?} uses regex =~{:?} — {reason}. This can force a \
                                 full scan of all label values.",
                                m.name, m.value
                            ),
                            fix: format!(
                                "Rewrite the regex for {} to be more specific, e.g. use a \
                                 prefix match or equality.",
                                m.name
                            ),
                            impact: "Reduces label value scanning and regex evaluation \
                                     overhead significantly"
                                .to_string(),
                            validate: "Query Inspector → Stats tab → compare 'Series \
                                       fetched' before/after"
                                .to_string(),
                            auto_fixable: false,
                            confidence: 0.85,
                        });
                    }
                });
            }
        }
        findings
    }
}

/// Why the pattern is unbounded, or `None` if it looks fine. A trailing
/// `.*` is anchored and therefore harmless on its own.
fn unbounded_reason(value: &str) -> Option<&'static str> {
    if value == ".+" {
        return Some("pattern .+ matches every non-empty label value");
    }
    if value.starts_with(".*") {
        return Some("leading .* causes a full scan of all label values");
    }
    let trimmed = value.strip_suffix(".*").unwrap_or(value);
    if let Some(idx) = trimmed.find(".*") {
        if idx > 0 {
            return Some("mid-pattern .* causes expensive backtracking");
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::super::testutil::single_panel;
    use super::*;

    #[test]
    fn reason_classification() {
        assert!(unbounded_reason(".+").is_some());
        assert!(unbounded_reason(".*foo").is_some());
        assert!(unbounded_reason("foo.*bar").is_some());
        assert!(unbounded_reason("foo.*").is_none());
        assert!(unbounded_reason("api|web").is_none());
        assert!(unbounded_reason("prod-.+").is_none());
    }

    #[test]
    fn leading_wildcard_fires() {
        let ctx = single_panel(&[r#"up{pod=~".*frontend"}"#]);
        let findings = UnboundedRegex.check(&ctx);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].why.contains("leading .*"));
    }

    #[test]
    fn anchored_prefix_passes() {
        let ctx = single_panel(&[r#"up{pod=~"frontend.*"}"#]);
        assert!(UnboundedRegex.check(&ctx).is_empty());
    }

    #[test]
    fn equality_matchers_ignored() {
        let ctx = single_panel(&[r#"up{pod=".*literal-dot-star"}"#]);
        assert!(UnboundedRegex.check(&ctx).is_empty());
    }
}
