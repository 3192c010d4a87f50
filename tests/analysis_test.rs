//! End-to-end analysis over complete dashboard fixtures.

use dashlint::analyzer::Engine;
use dashlint::models::Severity;
use std::io::Write;

const BAD: &str = include_str!("fixtures/bad_dashboard.json");
const GOOD: &str = include_str!("fixtures/good_dashboard.json");

#[test]
fn clean_dashboard_scores_perfect() {
    let report = Engine::default().analyze_bytes(GOOD.as_bytes()).unwrap();
    assert_eq!(report.score, 100, "unexpected findings: {:#?}", report.findings);
    assert!(report.findings.is_empty());
    assert_eq!(report.metadata.parse_errors, 0);
    assert!(report.panel_scores.is_empty());
}

#[test]
fn problem_dashboard_is_penalized() {
    let report = Engine::default().analyze_bytes(BAD.as_bytes()).unwrap();
    assert_eq!(report.dashboard_uid, "slow-demo");
    assert!(report.score < 50, "score {} too lenient", report.score);
    assert_eq!(report.metadata.total_panels, 6);
    assert_eq!(report.metadata.parse_errors, 0);

    let fired: Vec<&str> = report.findings.iter().map(|f| f.rule_id.as_str()).collect();
    for expected in ["Q1", "Q3", "Q4", "Q5", "Q7", "Q9", "D2", "D3", "D4", "D5", "D6", "D7", "D8", "D10"] {
        assert!(fired.contains(&expected), "{expected} missing from {fired:?}");
    }
    // Nothing in this dashboard uses regexes with metacharacters, wide
    // rate ranges, or subqueries.
    for absent in ["Q2", "Q6", "Q8", "D1", "D9"] {
        assert!(!fired.contains(&absent), "{absent} fired unexpectedly");
    }
}

#[test]
fn bare_selector_flagged_on_its_panel_only() {
    let report = Engine::default().analyze_bytes(BAD.as_bytes()).unwrap();
    let q1: Vec<_> = report.findings.iter().filter(|f| f.rule_id == "Q1").collect();
    assert!(q1.iter().any(|f| f.panel_ids == vec![1]));
    // The filtered errors_total query on panel 3 stays clean.
    assert!(q1.iter().all(|f| !f.panel_ids.contains(&3)));
}

#[test]
fn grouping_rule_reports_count_and_labels() {
    let report = Engine::default().analyze_bytes(BAD.as_bytes()).unwrap();
    let q4: Vec<_> = report.findings.iter().filter(|f| f.rule_id == "Q4").collect();
    // One finding for the 4-label grouping plus one per known
    // high-cardinality label (pod, container, instance).
    assert_eq!(q4.len(), 4);
    assert!(q4.iter().all(|f| f.panel_ids == vec![3]));
}

#[test]
fn duplicate_expression_rules_list_all_panels() {
    let report = Engine::default().analyze_bytes(BAD.as_bytes()).unwrap();
    let q9 = report
        .findings
        .iter()
        .find(|f| f.rule_id == "Q9")
        .expect("Q9 finding");
    assert_eq!(q9.panel_ids, vec![4, 5, 6]);

    let d8 = report
        .findings
        .iter()
        .find(|f| f.rule_id == "D8")
        .expect("D8 finding");
    assert_eq!(d8.panel_ids, vec![4, 5, 6]);
}

#[test]
fn severity_ordering_supports_fail_on_thresholds() {
    let report = Engine::default().analyze_bytes(BAD.as_bytes()).unwrap();
    assert!(report.findings.iter().any(|f| f.severity >= Severity::Critical));
    let high_or_worse = report
        .findings
        .iter()
        .filter(|f| f.severity >= Severity::High)
        .count();
    let critical = report
        .findings
        .iter()
        .filter(|f| f.severity >= Severity::Critical)
        .count();
    assert!(high_or_worse >= critical);
}

#[test]
fn analyze_file_matches_analyze_bytes() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(BAD.as_bytes()).unwrap();

    let from_file = Engine::default().analyze_file(file.path()).unwrap();
    let from_bytes = Engine::default().analyze_bytes(BAD.as_bytes()).unwrap();
    assert_eq!(from_file.score, from_bytes.score);
    assert_eq!(from_file.findings.len(), from_bytes.findings.len());
}

#[test]
fn report_serializes_with_camel_case_keys() {
    let report = Engine::default().analyze_bytes(BAD.as_bytes()).unwrap();
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"dashboardUid\":\"slow-demo\""));
    assert!(json.contains("\"ruleId\""));
    assert!(json.contains("\"autoFixable\""));
    assert!(json.contains("\"queryCosts\""));
}
