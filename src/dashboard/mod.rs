//! Typed read model for Grafana dashboard JSON
//!
//! This is the strongly-typed view used by analysis rules. The auto-fixer
//! deliberately does NOT use these types; it patches the raw
//! `serde_json::Value` tree so fields this model does not know about are
//! preserved. Keep the two views separate.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// A parsed Grafana dashboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Dashboard {
    pub uid: String,
    pub title: String,
    pub refresh: String,
    #[serde(rename = "schemaVersion")]
    pub schema_version: i64,
    pub time: TimeRange,
    pub panels: Vec<Panel>,
    pub templating: Templating,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeRange {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Templating {
    pub list: Vec<Variable>,
}

/// A single panel. Row panels carry their deferred children in `nested`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Panel {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub collapsed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat: Option<String>,
    #[serde(rename = "maxDataPoints", skip_serializing_if = "Option::is_none")]
    pub max_data_points: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    pub targets: Vec<Target>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource: Option<DatasourceRef>,
    /// Panels nested inside a row.
    #[serde(rename = "panels", skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<Panel>,
}

impl Panel {
    pub fn is_row(&self) -> bool {
        self.kind == "row"
    }
}

/// A single query target within a panel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Target {
    pub expr: String,
    #[serde(rename = "legendFormat", skip_serializing_if = "Option::is_none")]
    pub legend_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource: Option<DatasourceRef>,
    #[serde(rename = "refId", skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
}

/// A datasource reference. Modern dashboards use `{"type": ..., "uid": ...}`;
/// pre-schema-v36 dashboards store a bare name string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatasourceRef {
    Ref {
        #[serde(rename = "type", default)]
        kind: String,
        #[serde(default)]
        uid: String,
    },
    Name(String),
}

impl DatasourceRef {
    /// The identifier used for distinct-datasource counting.
    pub fn uid(&self) -> &str {
        match self {
            DatasourceRef::Ref { uid, .. } => uid,
            DatasourceRef::Name(name) => name,
        }
    }
}

/// A template variable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// String or object depending on the datasource plugin.
    pub query: serde_json::Value,
    #[serde(rename = "includeAll")]
    pub include_all: bool,
    pub multi: bool,
}

impl Variable {
    /// The backing query as a string, handling both plain-string queries
    /// and object queries like `{"query": "...", "refId": "..."}`.
    pub fn query_string(&self) -> &str {
        match &self.query {
            serde_json::Value::String(s) => s,
            serde_json::Value::Object(map) => map
                .get("query")
                .and_then(serde_json::Value::as_str)
                .unwrap_or(""),
            _ => "",
        }
    }
}

/// Parse raw dashboard JSON bytes.
pub fn parse_dashboard(data: &[u8]) -> Result<Dashboard> {
    serde_json::from_slice(data).context("parsing dashboard JSON")
}

/// Load a dashboard JSON file.
pub fn load_dashboard(path: &Path) -> Result<Dashboard> {
    let data = std::fs::read(path)
        .with_context(|| format!("reading dashboard file {}", path.display()))?;
    parse_dashboard(&data)
}

/// All panels in the dashboard, including panels nested inside rows.
/// The row panels themselves are included.
pub fn all_panels(dash: &Dashboard) -> Vec<&Panel> {
    let mut all = Vec::new();
    for p in &dash.panels {
        all.push(p);
        all.extend(p.nested.iter());
    }
    all
}

/// Panels that fire queries on dashboard load: top-level, non-row panels.
/// Panels inside collapsed rows are deferred and never double-counted here.
pub fn visible_panels(dash: &Dashboard) -> Vec<&Panel> {
    dash.panels.iter().filter(|p| !p.is_row()).collect()
}

/// Non-row panels with at least one non-empty target expression,
/// including panels nested in rows.
pub fn panels_with_targets(dash: &Dashboard) -> Vec<&Panel> {
    all_panels(dash)
        .into_iter()
        .filter(|p| !p.is_row() && p.targets.iter().any(|t| !t.expr.is_empty()))
        .collect()
}

/// All distinct target expressions across all panels, in document order.
pub fn all_target_exprs(dash: &Dashboard) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    let mut exprs = Vec::new();
    for p in all_panels(dash) {
        for t in &p.targets {
            if !t.expr.is_empty() && seen.insert(t.expr.as_str()) {
                exprs.push(t.expr.as_str());
            }
        }
    }
    exprs
}

/// All distinct datasource UIDs used across panels and targets, in document
/// order. Template variable references (`$ds`) are excluded.
pub fn all_datasource_uids(dash: &Dashboard) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    let mut uids = Vec::new();
    for p in all_panels(dash) {
        for ds in std::iter::once(&p.datasource).chain(p.targets.iter().map(|t| &t.datasource)) {
            if let Some(ds) = ds {
                let uid = ds.uid();
                if !uid.is_empty() && !uid.starts_with('$') && seen.insert(uid) {
                    uids.push(uid);
                }
            }
        }
    }
    uids
}

/// Parse a Grafana-style duration such as "30s", "5m", "1h", "7d", "2w",
/// or a compound form like "1h30m". Returns `None` for anything else.
pub fn parse_grafana_duration(s: &str) -> Option<Duration> {
    if s.is_empty() {
        return None;
    }
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut total_ms: u64 = 0;
    while i < bytes.len() {
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == start {
            return None;
        }
        let n: u64 = s[start..i].parse().ok()?;
        let unit_start = i;
        while i < bytes.len() && !bytes[i].is_ascii_digit() {
            i += 1;
        }
        let per_unit_ms = match &s[unit_start..i] {
            "ms" => 1,
            "s" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            "d" => 86_400_000,
            "w" => 604_800_000,
            _ => return None,
        };
        total_ms += n * per_unit_ms;
    }
    Some(Duration::from_millis(total_ms))
}

/// Parse a Grafana relative time string like "now-7d" into the duration
/// it reaches back. Returns `None` for absolute or malformed values.
pub fn parse_relative_range(from: &str) -> Option<Duration> {
    let rest = from.strip_prefix("now-")?;
    parse_grafana_duration(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dash_json() -> &'static str {
        r#"{
            "uid": "abc123",
            "title": "API Overview",
            "refresh": "10s",
            "schemaVersion": 39,
            "time": {"from": "now-6h", "to": "now"},
            "templating": {"list": [
                {"name": "namespace", "type": "query", "query": "label_values(up, namespace)", "includeAll": true, "multi": true}
            ]},
            "panels": [
                {"id": 1, "title": "Requests", "type": "timeseries",
                 "datasource": {"type": "prometheus", "uid": "prom-main"},
                 "targets": [{"expr": "rate(http_requests_total[5m])", "refId": "A"}]},
                {"id": 2, "title": "Details", "type": "row", "collapsed": true,
                 "panels": [
                    {"id": 3, "title": "Errors", "type": "timeseries",
                     "targets": [{"expr": "rate(http_errors_total[5m])"}]}
                 ]}
            ]
        }"#
    }

    #[test]
    fn parses_dashboard() {
        let dash = parse_dashboard(dash_json().as_bytes()).unwrap();
        assert_eq!(dash.uid, "abc123");
        assert_eq!(dash.panels.len(), 2);
        assert!(dash.panels[1].is_row());
        assert_eq!(dash.panels[1].nested.len(), 1);
        assert_eq!(dash.templating.list[0].query_string(), "label_values(up, namespace)");
    }

    #[test]
    fn datasource_accepts_legacy_string() {
        let json = r#"{"panels": [{"id": 1, "type": "graph", "datasource": "Prometheus", "targets": []}]}"#;
        let dash = parse_dashboard(json.as_bytes()).unwrap();
        assert_eq!(dash.panels[0].datasource.as_ref().unwrap().uid(), "Prometheus");
    }

    #[test]
    fn traversal_helpers() {
        let dash = parse_dashboard(dash_json().as_bytes()).unwrap();
        assert_eq!(all_panels(&dash).len(), 3);
        assert_eq!(visible_panels(&dash).len(), 1);
        assert_eq!(panels_with_targets(&dash).len(), 2);
        assert_eq!(all_target_exprs(&dash).len(), 2);
        assert_eq!(all_datasource_uids(&dash), vec!["prom-main"]);
    }

    #[test]
    fn duplicate_exprs_deduplicated() {
        let json = r#"{"panels": [
            {"id": 1, "type": "graph", "targets": [{"expr": "up"}]},
            {"id": 2, "type": "graph", "targets": [{"expr": "up"}]}
        ]}"#;
        let dash = parse_dashboard(json.as_bytes()).unwrap();
        assert_eq!(all_target_exprs(&dash), vec!["up"]);
    }

    #[test]
    fn grafana_durations() {
        assert_eq!(parse_grafana_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_grafana_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_grafana_duration("7d"), Some(Duration::from_secs(604_800)));
        assert_eq!(parse_grafana_duration("1w"), Some(Duration::from_secs(604_800)));
        assert_eq!(parse_grafana_duration("1h30m"), Some(Duration::from_secs(5_400)));
        assert_eq!(parse_grafana_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_grafana_duration(""), None);
        assert_eq!(parse_grafana_duration("banana"), None);
        assert_eq!(parse_grafana_duration("5x"), None);
    }

    #[test]
    fn relative_ranges() {
        assert_eq!(parse_relative_range("now-6h"), Some(Duration::from_secs(21_600)));
        assert_eq!(parse_relative_range("now-7d"), Some(Duration::from_secs(604_800)));
        assert_eq!(parse_relative_range("2024-01-01"), None);
    }
}
