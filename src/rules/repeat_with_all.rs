//! D2: repeating panels over Include-All variables

use super::{AnalysisContext, Rule};
use crate::models::{Finding, Severity};
use std::collections::HashMap;

/// Detects panels that repeat over a template variable with Include All
/// enabled. Selecting All can instantiate hundreds of panel copies, each
/// firing its own queries.
pub struct RepeatWithAll;

impl Rule for RepeatWithAll {
    fn id(&self) -> &'static str {
        "D2"
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Finding> {
        let var_by_name: HashMap<&str, _> = ctx
            .variables()
            .iter()
            .map(|v| (v.name.as_str(), v))
            .collect();

        let mut findings = Vec::new();
        for panel in ctx.all_panels() {
            let Some(repeat) = &panel.repeat else {
                continue;
            };
            let Some(var) = var_by_name.get(repeat.as_str()) else {
                continue;
            };
            if !var.include_all {
                continue;
            }
            findings.push(Finding {
                rule_id: "D2".to_string(),
                severity: Severity::Critical,
                panel_ids: vec![panel.id],
                panel_titles: vec![panel.title.clone()],
                title: "Repeat panel uses variable with Include All".to_string(),
                why: format!(
                    "Panel {:?} repeats over variable ${} which has Include All \
                     enabled. Selecting All can instantiate hundreds of panel copies, \
                     each firing its own queries.",
                    panel.title, var.name
                ),
                fix: format!(
                    "Disable Include All on variable {:?}, or remove the repeat from \
                     this panel and use a multi-value variable filter instead.",
                    var.name
                ),
                impact: "Prevents unbounded panel multiplication that causes query \
                         fan-out proportional to variable cardinality"
                    .to_string(),
                validate: "Select All on the variable and check that the panel count \
                           stays reasonable"
                    .to_string(),
                auto_fixable: false,
                confidence: 1.0,
            });
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::context_from_json;
    use super::*;

    fn dashboard(repeat: &str, include_all: bool) -> String {
        format!(
            r#"{{"uid": "t", "title": "T",
                "templating": {{"list": [
                    {{"name": "namespace", "type": "query", "query": "label_values(namespace)",
                      "includeAll": {include_all}, "multi": true}}
                ]}},
                "panels": [
                    {{"id": 1, "title": "Repeated", "type": "timeseries", "repeat": "{repeat}",
                      "targets": [{{"expr": "up{{job=\"x\"}}"}}]}}
                ]}}"#
        )
    }

    #[test]
    fn repeat_over_include_all_fires() {
        let ctx = context_from_json(&dashboard("namespace", true));
        let findings = RepeatWithAll.check(&ctx);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert!(findings[0].why.contains("$namespace"));
    }

    #[test]
    fn repeat_without_include_all_passes() {
        let ctx = context_from_json(&dashboard("namespace", false));
        assert!(RepeatWithAll.check(&ctx).is_empty());
    }

    #[test]
    fn repeat_over_unknown_variable_passes() {
        let ctx = context_from_json(&dashboard("missing_var", true));
        assert!(RepeatWithAll.check(&ctx).is_empty());
    }
}
