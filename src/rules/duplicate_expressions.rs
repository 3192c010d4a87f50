//! Q9: identical expressions evaluated by many panels

use super::{AnalysisContext, Rule};
use crate::models::{Finding, Severity};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Detects identical PromQL expressions used across multiple panels. Every
/// copy is sent to Prometheus independently; three or more panels sharing
/// one expression should consolidate it.
pub struct DuplicateExpressions {
    /// Distinct panel count above which a shared expression is reported.
    pub max_panels: usize,
}

impl Default for DuplicateExpressions {
    fn default() -> Self {
        Self { max_panels: 2 }
    }
}

impl Rule for DuplicateExpressions {
    fn id(&self) -> &'static str {
        "Q9"
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Finding> {
        // Normalized expression hash → panels using it, in document order.
        let mut expr_panels: HashMap<String, Vec<(i64, &str)>> = HashMap::new();
        for panel in ctx.panels_with_targets() {
            for target in &panel.targets {
                let normalized = normalize_expr(&target.expr);
                if normalized.is_empty() {
                    continue;
                }
                expr_panels
                    .entry(hash_expr(&normalized))
                    .or_default()
                    .push((panel.id, panel.title.as_str()));
            }
        }

        // HashMap iteration order is arbitrary; sort by key so the output
        // is stable run to run.
        let mut keys: Vec<_> = expr_panels.keys().cloned().collect();
        keys.sort();

        let mut findings = Vec::new();
        for key in keys {
            let panels = &expr_panels[&key];
            let mut ids: Vec<i64> = Vec::new();
            let mut titles: Vec<String> = Vec::new();
            for (id, title) in panels {
                if !ids.contains(id) {
                    ids.push(*id);
                    titles.push((*title).to_string());
                }
            }
            if ids.len() <= self.max_panels {
                continue;
            }
            findings.push(Finding {
                rule_id: "Q9".to_string(),
                severity: Severity::High,
                panel_ids: ids.clone(),
                panel_titles: titles.clone(),
                title: "Duplicate expression across panels".to_string(),
                why: format!(
                    "The same PromQL expression is used in {} panels ({}). Each copy is \
                     evaluated independently, multiplying Prometheus load.",
                    ids.len(),
                    titles.join(", ")
                ),
                fix: "Use a shared query (panel data source), a library panel, or a \
                      recording rule to evaluate the expression once."
                    .to_string(),
                impact: format!(
                    "Eliminates {} redundant query evaluations per refresh",
                    ids.len() - 1
                ),
                validate: "Verify each panel still renders after consolidation".to_string(),
                auto_fixable: false,
                confidence: 0.95,
            });
        }
        findings
    }
}

/// Strip all whitespace so formatting differences do not hide duplicates.
fn normalize_expr(expr: &str) -> String {
    expr.chars().filter(|c| !c.is_whitespace()).collect()
}

fn hash_expr(expr: &str) -> String {
    let digest = Sha256::digest(expr.as_bytes());
    format!("{digest:x}")
}
