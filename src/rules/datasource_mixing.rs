//! D9: dashboards spread across too many datasources

use super::{AnalysisContext, Rule};
use crate::dashboard;
use crate::models::{Finding, Severity};

/// Detects dashboards querying more distinct datasources than the
/// threshold. Each datasource needs a separate connection, slowing loads
/// and complicating maintenance.
pub struct DatasourceMixing {
    pub max_datasources: usize,
}

impl Default for DatasourceMixing {
    fn default() -> Self {
        Self { max_datasources: 2 }
    }
}

impl Rule for DatasourceMixing {
    fn id(&self) -> &'static str {
        "D9"
    }

    fn severity(&self) -> Severity {
        Severity::Low
    }

    fn check(&self, ctx: &AnalysisContext) -> Vec<Finding> {
        let uids = dashboard::all_datasource_uids(&ctx.dashboard);
        if uids.len() <= self.max_datasources {
            return Vec::new();
        }
        vec![Finding {
            rule_id: "D9".to_string(),
            severity: Severity::Low,
            panel_ids: Vec::new(),
            panel_titles: Vec::new(),
            title: "Too many distinct datasources".to_string(),
            why: format!(
                "Dashboard uses {} distinct datasources [{}] (threshold: {}). Each \
                 datasource requires a separate connection, increasing load time and \
                 complexity.",
                uids.len(),
                uids.join(", "),
                self.max_datasources
            ),
            fix: "Split the dashboard by datasource, or consolidate queries to fewer \
                  backends."
                .to_string(),
            impact: format!(
                "Reducing from {} to ≤{} datasources simplifies connection management \
                 and may reduce load time",
                uids.len(),
                self.max_datasources
            ),
            validate: "Check dashboard settings and panel datasource configurations"
                .to_string(),
            auto_fixable: false,
            confidence: 0.8,
        }]
    }
}
