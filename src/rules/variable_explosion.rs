//! D3: combinatorial explosion of multi-select variables

use super::{AnalysisContext, Rule};
use crate::models::{Finding, Severity};

/// Assumed value count for a multi-select Include-All variable when no
/// measured cardinality is available.
const DEFAULT_VALUES_PER_VARIABLE: u64 = 100;

/// Cap on the estimated cross-product to avoid overflow with many
/// variables.
const PRODUCT_CAP: u64 = 1_000_000;

/// Detects dashboards where the cross-product of multi-select variables
/// with Include All enabled exceeds a safe threshold. Selecting All on
/// each creates a combinatorial explosion of repeated panels or query
/// permutations.
pub struct VariableExplosion {
    pub threshold: u64,
}

impl Default for VariableExplosion {
    fn default() -> Self {
        Self { threshold: 50 }
    }
}

impl Rule for VariableExplosion {
    fn id(&self) -> &'static str {
        "D3"
    }

    fn severity(&self) -> Severity {
        Severity::Critical
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Finding> {
        let explosive: Vec<&str> = ctx
            .variables()
            .iter()
            .filter(|v| v.include_all && v.multi)
            .map(|v| v.name.as_str())
            .collect();
        if explosive.is_empty() {
            return Vec::new();
        }

        // When TSDB data is present and the variable name matches a label
        // name, use the measured value count instead of the assumption.
        let mut measured_any = false;
        let mut product: u64 = 1;
        for name in &explosive {
            let values = match &ctx.cardinality {
                Some(card) if card.values_by_label.contains_key(*name) => {
                    measured_any = true;
                    card.label_cardinality(name, DEFAULT_VALUES_PER_VARIABLE).max(1)
                }
                _ => DEFAULT_VALUES_PER_VARIABLE,
            };
            product = product.saturating_mul(values);
            if product > PRODUCT_CAP {
                product = PRODUCT_CAP;
                break;
            }
        }

        if product <= self.threshold {
            return Vec::new();
        }

        let confidence = if measured_any { 0.85 } else { 0.7 };
        vec![Finding {
            rule_id: "D3".to_string(),
            severity: Severity::Critical,
            panel_ids: Vec::new(),
            panel_titles: Vec::new(),
            title: "Variable cross-product explosion".to_string(),
            why: format!(
                "Variables [{}] are all multi-select with Include All. Estimated \
                 cross-product: {product} (threshold: {}). Selecting All on each \
                 creates a combinatorial explosion of query permutations.",
                explosive.join(", "),
                self.threshold
            ),
            fix: "Disable Include All or Multi on some variables, or add ad-hoc \
                  filters instead of multi-select variables."
                .to_string(),
            impact: format!(
                "Reducing the cross-product from {product} to ≤{} prevents \
                 combinatorial query fan-out",
                self.threshold
            ),
            validate: "Select All on all flagged variables and verify query count in \
                       browser DevTools"
                .to_string(),
            auto_fixable: false,
            confidence,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::context_from_json;
    use super::*;
    use crate::cardinality::CardinalityData;

    fn dashboard_with_vars(vars: &[(&str, bool, bool)]) -> String {
        let list: Vec<String> = vars
            .iter()
            .map(|(name, all, multi)| {
                format!(
                    r#"{{"name": "{name}", "type": "query", "query": "label_values({name})",
                        "includeAll": {all}, "multi": {multi}}}"#
                )
            })
            .collect();
        format!(
            r#"{{"uid": "t", "title": "T", "templating": {{"list": [{}]}},
                "panels": [{{"id": 1, "title": "P", "type": "timeseries",
                             "targets": [{{"expr": "up{{job=\"x\"}}"}}]}}]}}"#,
            list.join(",")
        )
    }

    #[test]
    fn single_explosive_variable_fires() {
        // One variable assumed at 100 values already exceeds 50.
        let ctx = context_from_json(&dashboard_with_vars(&[("namespace", true, true)]));
        let findings = VariableExplosion::default().check(&ctx);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].confidence, 0.7);
        assert!(findings[0].why.contains("cross-product: 100"));
    }

    #[test]
    fn product_capped_for_many_variables() {
        let ctx = context_from_json(&dashboard_with_vars(&[
            ("a", true, true),
            ("b", true, true),
            ("c", true, true),
            ("d", true, true),
        ]));
        let findings = VariableExplosion::default().check(&ctx);
        assert!(findings[0].why.contains("cross-product: 1000000"));
    }

    #[test]
    fn non_multi_variables_ignored() {
        let ctx = context_from_json(&dashboard_with_vars(&[
            ("a", true, false),
            ("b", false, true),
        ]));
        assert!(VariableExplosion::default().check(&ctx).is_empty());
    }

    #[test]
    fn measured_cardinality_raises_confidence() {
        let mut ctx = context_from_json(&dashboard_with_vars(&[("namespace", true, true)]));
        let mut card = CardinalityData::default();
        card.values_by_label.insert("namespace".into(), 60);
        ctx.cardinality = Some(card);
        let findings = VariableExplosion::default().check(&ctx);
        assert_eq!(findings[0].confidence, 0.85);
        assert!(findings[0].why.contains("cross-product: 60"));
    }

    #[test]
    fn measured_small_cardinality_suppresses_finding() {
        let mut ctx = context_from_json(&dashboard_with_vars(&[("namespace", true, true)]));
        let mut card = CardinalityData::default();
        card.values_by_label.insert("namespace".into(), 12);
        ctx.cardinality = Some(card);
        assert!(VariableExplosion::default().check(&ctx).is_empty());
    }
}
