//! D1: dashboards with too many visible panels

use super::{AnalysisContext, Rule};
use crate::dashboard;
use crate::models::{Finding, Severity};

/// Detects dashboards with more visible panels than the threshold. Each
/// visible panel fires queries on load, so too many panels cause slow
/// initial render and excessive backend load.
pub struct TooManyPanels {
    pub threshold: usize,
}

impl Default for TooManyPanels {
    fn default() -> Self {
        Self { threshold: 25 }
    }
}

impl Rule for TooManyPanels {
    fn id(&self) -> &'static str {
        "D1"
    }

    fn severity(&self) -> Severity {
        Severity::High
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Finding> {
        let count = dashboard::visible_panels(&ctx.dashboard).len();
        if count <= self.threshold {
            return Vec::new();
        }
        vec![Finding {
            rule_id: "D1".to_string(),
            severity: Severity::High,
            panel_ids: Vec::new(),
            panel_titles: Vec::new(),
            title: "Too many visible panels".to_string(),
            why: format!(
                "Dashboard has {count} visible panels (threshold: {}). Each panel fires \
                 queries on load, causing slow initial render and high backend load.",
                self.threshold
            ),
            fix: "Group related panels into collapsed rows, or split the dashboard into \
                  multiple focused dashboards."
                .to_string(),
            impact: format!(
                "Reducing from {count} to ≤{} panels cuts initial query load \
                 proportionally",
                self.threshold
            ),
            validate: "Reload dashboard → check browser DevTools Network tab for query \
                       count"
                .to_string(),
            auto_fixable: false,
            confidence: 1.0,
        }]
    }
}
