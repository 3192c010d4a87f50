//! D5: auto-refresh intervals that hammer the backend

use super::{AnalysisContext, Rule};
use crate::dashboard::parse_grafana_duration;
use crate::models::{Finding, Severity};
use crate::promql::format_duration_secs;
use std::time::Duration;

/// Detects dashboards with an auto-refresh interval shorter than a safe
/// minimum. Frequent refreshes cause continuous query load even when the
/// dashboard sits idle in a browser tab.
pub struct RefreshTooFrequent {
    pub min_refresh: Duration,
}

impl Default for RefreshTooFrequent {
    fn default() -> Self {
        Self {
            min_refresh: Duration::from_secs(30),
        }
    }
}

impl Rule for RefreshTooFrequent {
    fn id(&self) -> &'static str {
        "D5"
    }

    fn severity(&self) -> Severity {
        Severity::Medium
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Finding> {
        let raw = ctx.dashboard.refresh.as_str();
        if raw.is_empty() {
            return Vec::new();
        }
        let Some(interval) = parse_grafana_duration(raw) else {
            return Vec::new();
        };
        if interval >= self.min_refresh {
            return Vec::new();
        }

        let min_display = format_duration_secs(self.min_refresh.as_secs_f64());
        let reduction =
            (1.0 - interval.as_secs_f64() / self.min_refresh.as_secs_f64()) * 100.0;
        vec![Finding {
            rule_id: "D5".to_string(),
            severity: Severity::Medium,
            panel_ids: Vec::new(),
            panel_titles: Vec::new(),
            title: "Auto-refresh interval too frequent".to_string(),
            why: format!(
                "Dashboard refresh is set to {raw}. Intervals below {min_display} \
                 cause continuous backend query load, especially when many users have \
                 the dashboard open."
            ),
            fix: format!(
                "Set the dashboard refresh interval to {min_display} or longer."
            ),
            impact: format!(
                "Changing refresh from {raw} to {min_display} reduces query rate by \
                 {reduction:.0}%"
            ),
            validate: "Open dashboard settings → verify the refresh interval is updated"
                .to_string(),
            auto_fixable: true,
            confidence: 1.0,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::context_from_json;
    use super::*;

    fn dashboard_with_refresh(refresh: &str) -> String {
        format!(
            r#"{{"uid": "t", "title": "T", "refresh": "{refresh}", "panels": []}}"#
        )
    }

    #[test]
    fn frequent_refresh_fires() {
        let ctx = context_from_json(&dashboard_with_refresh("10s"));
        let findings = RefreshTooFrequent::default().check(&ctx);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].auto_fixable);
        assert!(findings[0].impact.contains("67%"));
    }

    #[test]
    fn slow_refresh_passes() {
        let ctx = context_from_json(&dashboard_with_refresh("1m"));
        assert!(RefreshTooFrequent::default().check(&ctx).is_empty());
    }

    #[test]
    fn boundary_value_passes() {
        let ctx = context_from_json(&dashboard_with_refresh("30s"));
        assert!(RefreshTooFrequent::default().check(&ctx).is_empty());
    }

    #[test]
    fn no_refresh_configured_passes() {
        let ctx = context_from_json(r#"{"uid": "t", "title": "T", "panels": []}"#);
        assert!(RefreshTooFrequent::default().check(&ctx).is_empty());
    }

    #[test]
    fn unparseable_refresh_ignored() {
        let ctx = context_from_json(&dashboard_with_refresh("auto"));
        assert!(RefreshTooFrequent::default().check(&ctx).is_empty());
    }
}
