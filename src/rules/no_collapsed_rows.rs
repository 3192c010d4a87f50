//! D10: dashboards that fire every panel query on load

use super::{AnalysisContext, Rule};
use crate::models::{Finding, Severity};

/// Detects dashboards with no collapsed row panels. Collapsed rows defer
/// query execution for their nested panels until expanded; without any,
/// every panel queries on load.
pub struct NoCollapsedRows {
    /// Minimum non-row panel count before the rule applies. Small
    /// dashboards do not need rows.
    pub min_panels: usize,
}

impl Default for NoCollapsedRows {
    fn default() -> Self {
        Self { min_panels: 5 }
    }
}

impl Rule for NoCollapsedRows {
    fn id(&self) -> &'static str {
        "D10"
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Finding> {
        let total_panels = ctx.all_panels().iter().filter(|p| !p.is_row()).count();
        if total_panels < self.min_panels {
            return Vec::new();
        }

        let mut has_rows = false;
        let mut has_collapsed_row = false;
        for panel in &ctx.dashboard.panels {
            if panel.is_row() {
                has_rows = true;
                if panel.collapsed {
                    has_collapsed_row = true;
                    break;
                }
            }
        }
        if has_collapsed_row {
            return Vec::new();
        }

        let why = if has_rows {
            format!(
                "Dashboard has {total_panels} panels with row panels, but none are \
                 collapsed. All panels still fire queries on load because no rows \
                 defer execution."
            )
        } else {
            format!(
                "Dashboard has {total_panels} panels but no row panels. Without rows, \
                 all panels fire queries on load."
            )
        };

        vec![Finding {
            rule_id: "D10".to_string(),
            severity: Severity::Medium,
            panel_ids: Vec::new(),
            panel_titles: Vec::new(),
            title: "No collapsed rows to defer query execution".to_string(),
            why,
            fix: "Organize panels into rows and collapse less-frequently viewed \
                  sections. Collapsed rows defer query execution until expanded."
                .to_string(),
            impact: "Reduces initial query count by the number of panels moved into \
                     collapsed rows"
                .to_string(),
            validate: "Reload dashboard → verify collapsed rows show an expand arrow \
                       and don't fire queries until clicked"
                .to_string(),
            auto_fixable: false,
            confidence: 0.8,
        }]
    }
}
