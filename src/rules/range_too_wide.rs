//! D6: default time ranges that pull too much data

use super::{AnalysisContext, Rule};
use crate::dashboard::parse_relative_range;
use crate::models::{Finding, Severity};
use crate::promql::format_duration_secs;
use std::time::Duration;

/// Detects dashboards whose default time range is wider than a safe
/// maximum. Wide ranges pull large data volumes per query, increasing
/// response times and memory usage on the datasource and in the browser.
pub struct RangeTooWide {
    pub max_range: Duration,
}

impl Default for RangeTooWide {
    fn default() -> Self {
        Self {
            max_range: Duration::from_secs(24 * 3600),
        }
    }
}

impl Rule for RangeTooWide {
    fn id(&self) -> &'static str {
        "D6"
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Finding> {
        let from = ctx.dashboard.time.from.as_str();
        if from.is_empty() {
            return Vec::new();
        }
        let Some(range) = parse_relative_range(from) else {
            return Vec::new();
        };
        if range <= self.max_range {
            return Vec::new();
        }

        let range_display = format_duration_secs(range.as_secs_f64());
        let max_display = format_duration_secs(self.max_range.as_secs_f64());
        vec![Finding {
            rule_id: "D6".to_string(),
            severity: Severity::Medium,
            panel_ids: Vec::new(),
            panel_titles: Vec::new(),
            title: "Default time range too wide".to_string(),
            why: format!(
                "Dashboard default time range is {from:?} ({range_display}). Ranges \
                 wider than {max_display} pull large data volumes per query, \
                 increasing response times and memory usage."
            ),
            fix: format!(
                "Set the default time range to {max_display} or less (e.g., \
                 \"now-6h\" or \"now-1h\")."
            ),
            impact: format!(
                "Narrowing from {range_display} to {max_display} reduces data scanned \
                 per query proportionally"
            ),
            validate: "Open dashboard settings → Time Options → verify the From value"
                .to_string(),
            auto_fixable: true,
            confidence: 1.0,
        }]
    }
}
