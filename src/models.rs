//! Core data models for dashlint
//!
//! These models are the stable contract between the analysis engine and
//! every presentation layer (text/JSON reporters, the --fail-on gate).
//! Adding a field to `Finding` requires updating every consumer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Severity levels for findings, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Scoring weight used by the penalty sum in `scoring::compute_score`.
    pub fn weight(self) -> u32 {
        match self {
            Severity::Low => 2,
            Severity::Medium => 5,
            Severity::High => 10,
            Severity::Critical => 15,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(anyhow::anyhow!(
                "unknown severity '{s}'. Valid: low, medium, high, critical"
            )),
        }
    }
}

/// A single detected issue in a dashboard.
///
/// Findings are immutable once created. `rule_id` is stable and never
/// renumbered; suppression and fix dispatch key off it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// "Q1", "D2", etc.
    pub rule_id: String,
    pub severity: Severity,
    /// Affected panel IDs; empty for dashboard-level findings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub panel_ids: Vec<i64>,
    /// Human-readable panel names, parallel to `panel_ids`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub panel_titles: Vec<String>,
    /// Short summary, e.g. "Missing label filters".
    pub title: String,
    /// Why this is a problem.
    pub why: String,
    /// What to change.
    pub fix: String,
    /// Expected improvement.
    pub impact: String,
    /// How to verify the fix worked.
    pub validate: String,
    /// True if --fix can patch this automatically.
    pub auto_fixable: bool,
    /// 0.0-1.0; lower for static-only heuristics, higher with cardinality data.
    pub confidence: f64,
}

/// Count of findings per severity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindingsSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub total: usize,
}

impl FindingsSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self::default();
        for f in findings {
            match f.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
            }
            summary.total += 1;
        }
        summary
    }
}

/// The output of analyzing one dashboard. Created once per run, never
/// mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub dashboard_uid: String,
    pub dashboard_title: String,
    /// Composite health score in (0, 100].
    pub score: i32,
    pub findings: Vec<Finding>,
    /// Panel ID → per-panel score, for panels with at least one finding.
    pub panel_scores: HashMap<i64, i32>,
    pub metadata: ReportMetadata,
}

/// Supplementary info about the analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub total_panels: usize,
    pub total_targets: usize,
    pub parse_errors: usize,
    pub analyzer_version: String,
    /// True if TSDB status data was fetched for this run.
    pub cardinality_available: bool,
    /// Raw expression → estimated relative cost.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub query_costs: HashMap<String, f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_weights() {
        assert_eq!(Severity::Low.weight(), 2);
        assert_eq!(Severity::Medium.weight(), 5);
        assert_eq!(Severity::High.weight(), 10);
        assert_eq!(Severity::Critical.weight(), 15);
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn severity_from_str() {
        assert_eq!("critical".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert!("bogus".parse::<Severity>().is_err());
    }

    #[test]
    fn findings_summary_counts() {
        let f = |sev| Finding {
            rule_id: "Q1".into(),
            severity: sev,
            panel_ids: vec![],
            panel_titles: vec![],
            title: "t".into(),
            why: "w".into(),
            fix: "f".into(),
            impact: "i".into(),
            validate: "v".into(),
            auto_fixable: false,
            confidence: 0.9,
        };
        let findings = vec![f(Severity::Critical), f(Severity::Low), f(Severity::Low)];
        let summary = FindingsSummary::from_findings(&findings);
        assert_eq!(summary.critical, 1);
        assert_eq!(summary.low, 2);
        assert_eq!(summary.total, 3);
    }
}
