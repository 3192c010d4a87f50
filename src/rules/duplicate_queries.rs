//! D8: identical raw queries firing redundant datasource requests

use super::{truncate_query, AnalysisContext, Rule};
use crate::models::{Finding, Severity};
use std::collections::HashMap;

/// Detects the same raw query expression used by several panels. Each
/// panel fires its own request; the Dashboard datasource can share one
/// query result instead.
///
/// Q9 flags the same condition at the PromQL level with whitespace
/// normalization; this rule works on the raw text and recommends the
/// Grafana-side sharing mechanism.
pub struct DuplicateQueries {
    /// Target reference count above which a shared query is reported.
    pub max_refs: usize,
}

impl Default for DuplicateQueries {
    fn default() -> Self {
        Self { max_refs: 2 }
    }
}

impl Rule for DuplicateQueries {
    fn id(&self) -> &'static str {
        "D8"
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Finding> {
        let mut expr_panels: HashMap<&str, Vec<(i64, &str)>> = HashMap::new();
        for panel in ctx.all_panels() {
            if panel.is_row() {
                continue;
            }
            for target in &panel.targets {
                let expr = target.expr.trim();
                if expr.is_empty() {
                    continue;
                }
                expr_panels
                    .entry(expr)
                    .or_default()
                    .push((panel.id, panel.title.as_str()));
            }
        }

        // Sorted key order keeps the report stable across runs.
        let mut exprs: Vec<_> = expr_panels.keys().copied().collect();
        exprs.sort_unstable();

        let mut findings = Vec::new();
        for expr in exprs {
            let panels = &expr_panels[expr];
            if panels.len() <= self.max_refs {
                continue;
            }
            let ids: Vec<i64> = panels.iter().map(|(id, _)| *id).collect();
            let titles: Vec<String> =
                panels.iter().map(|(_, t)| (*t).to_string()).collect();
            findings.push(Finding {
                rule_id: "D8".to_string(),
                severity: Severity::Medium,
                panel_ids: ids,
                panel_titles: titles.clone(),
                title: "Duplicate query across panels".to_string(),
                why: format!(
                    "Query {:?} is used in {} panels [{}]. Each panel fires its own \
                     request, causing redundant datasource load.",
                    truncate_query(expr, 80),
                    panels.len(),
                    titles.join(", ")
                ),
                fix: "Use the Dashboard datasource to share the query result from one \
                      panel to the others, eliminating duplicate requests."
                    .to_string(),
                impact: format!(
                    "Eliminates {} redundant query executions per refresh cycle",
                    panels.len() - 1
                ),
                validate: "Check Network tab to confirm only one request is made for \
                           the shared query"
                    .to_string(),
                auto_fixable: false,
                confidence: 0.9,
            });
        }
        findings
    }
}
