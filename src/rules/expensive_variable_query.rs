//! D4: template variables backed by full PromQL queries

use super::{truncate_query, AnalysisContext, Rule};
use crate::models::{Finding, Severity};

/// Detects query-type template variables that run a full PromQL
/// expression instead of the lightweight label_values() metadata call.
/// Full queries execute against Prometheus on every dashboard load or
/// variable refresh.
pub struct ExpensiveVariableQuery;

impl Rule for ExpensiveVariableQuery {
    fn id(&self) -> &'static str {
        "D4"
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Finding> {
        let mut findings = Vec::new();
        for var in ctx.variables() {
            if var.kind != "query" {
                continue;
            }
            let qs = var.query_string().trim();
            if qs.is_empty() || qs.starts_with("label_values(") {
                continue;
            }
            findings.push(Finding {
                rule_id: "D4".to_string(),
                severity: Severity::High,
                panel_ids: Vec::new(),
                panel_titles: Vec::new(),
                title: "Variable uses full PromQL query".to_string(),
                why: format!(
                    "Variable ${} uses query {:?} instead of label_values(). Full \
                     PromQL queries run against Prometheus on every variable refresh, \
                     causing unnecessary load.",
                    var.name,
                    truncate_query(qs, 80)
                ),
                fix: format!(
                    "Rewrite variable ${} to use label_values(<metric>, <label>) if \
                     possible.",
                    var.name
                ),
                impact: "Replaces a full query execution with a lightweight metadata \
                         lookup on each dashboard load"
                    .to_string(),
                validate: "Open dashboard → check Network tab for variable query timing"
                    .to_string(),
                auto_fixable: false,
                confidence: 0.9,
            });
        }
        findings
    }
}
