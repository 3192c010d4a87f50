//! D7: time-series panels without a maxDataPoints bound

use super::{AnalysisContext, Rule};
use crate::models::{Finding, Severity};

/// Panel types that benefit from a maxDataPoints limit.
pub(crate) const PANEL_TYPES_NEEDING_LIMIT: &[&str] =
    &["timeseries", "graph", "barchart", "heatmap"];

/// Detects time-series-style panels without maxDataPoints configured.
/// Without a limit the datasource may return unbounded point counts for
/// wide time ranges, causing slow rendering and high browser memory use.
pub struct MissingMaxDataPoints;

impl Rule for MissingMaxDataPoints {
    fn id(&self) -> &'static str {
        "D7"
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Finding> {
        let mut findings = Vec::new();
        for panel in ctx.all_panels() {
            if !PANEL_TYPES_NEEDING_LIMIT.contains(&panel.kind.as_str()) {
                continue;
            }
            if panel.max_data_points.is_some_and(|n| n > 0) {
                continue;
            }
            findings.push(Finding {
                rule_id: "D7".to_string(),
                severity: Severity::Medium,
                panel_ids: vec![panel.id],
                panel_titles: vec![panel.title.clone()],
                title: "Missing maxDataPoints".to_string(),
                why: format!(
                    "Panel {:?} (type: {}) does not set maxDataPoints. Without this \
                     limit, the datasource may return unbounded data points for wide \
                     time ranges, causing slow rendering.",
                    panel.title, panel.kind
                ),
                fix: "Set maxDataPoints in the panel's query options (e.g., 1000 for \
                      timeseries panels)."
                    .to_string(),
                impact: "Bounds the data returned per query, reducing browser memory \
                         and render time"
                    .to_string(),
                validate: "Open panel edit → Query Options → verify maxDataPoints is set"
                    .to_string(),
                auto_fixable: true,
                confidence: 0.9,
            });
        }
        findings
    }
}
