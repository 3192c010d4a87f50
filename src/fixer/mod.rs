//! Automatic fixes for auto-fixable findings
//!
//! The fixer patches the raw `serde_json::Value` tree rather than the
//! typed dashboard model, so every field the model does not know about
//! survives a round trip. Each fix is idempotent; applying the same fix
//! twice leaves the document unchanged.

use crate::models::Finding;
use crate::rules::contains_regex_meta;
use anyhow::{Context, Result};
use regex::{Captures, Regex};
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

/// Panel types that get a maxDataPoints default from the D7 fix.
const VIZ_TYPES: &[&str] = &["timeseries", "graph", "barchart", "heatmap"];

fn regex_matcher_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(=~)"([^"]*)""#).expect("valid regex"))
}

fn hardcoded_interval_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"((?:rate|irate|increase)\s*\([^\[]*)\[(\d+[smhd])\]").expect("valid regex")
    })
}

/// Apply auto-fixes for every finding with `auto_fixable` set and return
/// the patched document plus the number of fixes applied. Findings whose
/// rule has no fix procedure are skipped.
pub fn apply_fixes(dashboard_json: &[u8], findings: &[Finding]) -> Result<(Value, usize)> {
    let mut dash: Value =
        serde_json::from_slice(dashboard_json).context("parsing dashboard JSON")?;

    let mut fix_count = 0;
    for finding in findings {
        if !finding.auto_fixable {
            continue;
        }
        match finding.rule_id.as_str() {
            "Q3" => fix_regex_equality(&mut dash),
            "Q7" => fix_hardcoded_intervals(&mut dash),
            "D5" => fix_refresh(&mut dash),
            "D6" => fix_time_range(&mut dash),
            "D7" => fix_max_data_points(&mut dash),
            _ => continue,
        }
        fix_count += 1;
    }
    Ok((dash, fix_count))
}

/// Run `f` on every panel object, including panels nested inside rows.
fn for_each_panel(dash: &mut Value, f: &mut impl FnMut(&mut Map<String, Value>)) {
    let Some(panels) = dash.get_mut("panels").and_then(Value::as_array_mut) else {
        return;
    };
    for panel in panels {
        let Some(obj) = panel.as_object_mut() else {
            continue;
        };
        f(obj);
        if let Some(nested) = obj.get_mut("panels").and_then(Value::as_array_mut) {
            for inner in nested {
                if let Some(inner_obj) = inner.as_object_mut() {
                    f(inner_obj);
                }
            }
        }
    }
}

/// Run `f` on every target expression string, replacing it with the
/// returned value.
fn rewrite_exprs(dash: &mut Value, f: impl Fn(&str) -> Option<String>) {
    for_each_panel(dash, &mut |panel| {
        let Some(targets) = panel.get_mut("targets").and_then(Value::as_array_mut) else {
            return;
        };
        for target in targets {
            let Some(obj) = target.as_object_mut() else {
                continue;
            };
            let Some(expr) = obj.get("expr").and_then(Value::as_str) else {
                continue;
            };
            if let Some(rewritten) = f(expr) {
                obj.insert("expr".to_string(), Value::String(rewritten));
            }
        }
    });
}

/// Q3: rewrite =~"value" to ="value" where the value has no regex
/// metacharacters.
fn fix_regex_equality(dash: &mut Value) {
    rewrite_exprs(dash, |expr| {
        let rewritten = regex_matcher_re().replace_all(expr, |caps: &Captures| {
            let value = &caps[2];
            if contains_regex_meta(value) {
                caps[0].to_string()
            } else {
                format!("=\"{value}\"")
            }
        });
        (rewritten != expr).then(|| rewritten.into_owned())
    });
}

/// Q7: rewrite hardcoded durations in rate/irate/increase calls to
/// $__rate_interval. Expressions already using the template macros are
/// left alone.
fn fix_hardcoded_intervals(dash: &mut Value) {
    rewrite_exprs(dash, |expr| {
        if expr.contains("$__rate_interval") || expr.contains("$__interval") {
            return None;
        }
        let rewritten = hardcoded_interval_re().replace_all(expr, "${1}[$$__rate_interval]");
        (rewritten != expr).then(|| rewritten.into_owned())
    });
}

/// D5: set the refresh interval to a safe 1m.
fn fix_refresh(dash: &mut Value) {
    if let Some(obj) = dash.as_object_mut() {
        obj.insert("refresh".to_string(), json!("1m"));
    }
}

/// D6: narrow the default time range to now-1h, creating the time object
/// when the dashboard lacks one.
fn fix_time_range(dash: &mut Value) {
    let Some(obj) = dash.as_object_mut() else {
        return;
    };
    match obj.get_mut("time").and_then(Value::as_object_mut) {
        Some(time) => {
            time.insert("from".to_string(), json!("now-1h"));
        }
        None => {
            obj.insert("time".to_string(), json!({"from": "now-1h", "to": "now"}));
        }
    }
}

/// D7: set maxDataPoints to 1000 on visualization panels where it is
/// missing or zero.
fn fix_max_data_points(dash: &mut Value) {
    for_each_panel(dash, &mut |panel| {
        let kind = panel.get("type").and_then(Value::as_str).unwrap_or("");
        if !VIZ_TYPES.contains(&kind) {
            return;
        }
        let needs_limit = match panel.get("maxDataPoints") {
            None => true,
            Some(v) => v.as_f64() == Some(0.0),
        };
        if needs_limit {
            panel.insert("maxDataPoints".to_string(), json!(1000));
        }
    });
}
