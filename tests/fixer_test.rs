//! Fix-then-reanalyze round trips over a complete dashboard fixture.

use dashlint::analyzer::Engine;
use dashlint::fixer;

const BAD: &str = include_str!("fixtures/bad_dashboard.json");

fn auto_fixable_count(report: &dashlint::models::Report) -> usize {
    report.findings.iter().filter(|f| f.auto_fixable).count()
}

#[test]
fn applying_fixes_reduces_fixable_findings() {
    let engine = Engine::default();
    let before = engine.analyze_bytes(BAD.as_bytes()).unwrap();
    let fixable_before = auto_fixable_count(&before);
    assert!(fixable_before > 0);

    let (patched, fix_count) = fixer::apply_fixes(BAD.as_bytes(), &before.findings).unwrap();
    assert!(fix_count > 0);

    let patched_bytes = serde_json::to_vec(&patched).unwrap();
    let after = engine.analyze_bytes(&patched_bytes).unwrap();
    assert!(auto_fixable_count(&after) < fixable_before);
    assert!(after.score > before.score);
}

#[test]
fn fixes_patch_the_expected_fields() {
    let engine = Engine::default();
    let report = engine.analyze_bytes(BAD.as_bytes()).unwrap();
    let (patched, _) = fixer::apply_fixes(BAD.as_bytes(), &report.findings).unwrap();

    assert_eq!(patched["refresh"], "1m");
    assert_eq!(patched["time"]["from"], "now-1h");
    for panel in patched["panels"].as_array().unwrap() {
        assert_eq!(panel["maxDataPoints"], 1000);
    }

    // The literal regex matcher became an equality matcher and the
    // hardcoded rate range became the template macro.
    let expr = patched["panels"][1]["targets"][0]["expr"].as_str().unwrap();
    assert_eq!(expr, "rate(http_requests_total{job=\"api\"}[$__rate_interval])");
}

#[test]
fn fixed_dashboard_no_longer_triggers_fixable_rules() {
    let engine = Engine::default();
    let report = engine.analyze_bytes(BAD.as_bytes()).unwrap();
    let (patched, _) = fixer::apply_fixes(BAD.as_bytes(), &report.findings).unwrap();
    let patched_bytes = serde_json::to_vec(&patched).unwrap();

    let after = engine.analyze_bytes(&patched_bytes).unwrap();
    let fired: Vec<&str> = after.findings.iter().map(|f| f.rule_id.as_str()).collect();
    for fixed in ["Q3", "Q7", "D5", "D6", "D7"] {
        assert!(!fired.contains(&fixed), "{fixed} survived the fix: {fired:?}");
    }
    // Structural issues the fixer does not touch are still reported.
    assert!(fired.contains(&"Q1"));
    assert!(fired.contains(&"D10"));
}

#[test]
fn fixing_is_idempotent() {
    let engine = Engine::default();
    let report = engine.analyze_bytes(BAD.as_bytes()).unwrap();
    let (once, _) = fixer::apply_fixes(BAD.as_bytes(), &report.findings).unwrap();
    let once_bytes = serde_json::to_vec(&once).unwrap();

    let report_after = engine.analyze_bytes(&once_bytes).unwrap();
    let (twice, count) = fixer::apply_fixes(&once_bytes, &report_after.findings).unwrap();
    assert_eq!(count, 0);
    assert_eq!(once, twice);
}

#[test]
fn unknown_fields_survive_fixing() {
    let mut doc: serde_json::Value = serde_json::from_str(BAD).unwrap();
    doc["annotations"] = serde_json::json!({"list": [{"name": "custom"}]});
    let bytes = serde_json::to_vec(&doc).unwrap();

    let report = Engine::default().analyze_bytes(&bytes).unwrap();
    let (patched, _) = fixer::apply_fixes(&bytes, &report.findings).unwrap();
    assert_eq!(patched["annotations"]["list"][0]["name"], "custom");
    assert_eq!(patched["schemaVersion"], 39);
}
