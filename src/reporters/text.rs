//! Text (terminal) reporter with colors and a score bar

use crate::models::{Finding, Report, Severity};
use anyhow::Result;
use std::collections::HashMap;
use std::fmt::Write;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "\x1b[31m", // Red
        Severity::High => "\x1b[91m",     // Light red
        Severity::Medium => "\x1b[33m",   // Yellow
        Severity::Low => "\x1b[34m",      // Blue
    }
}

fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "!!",
        Severity::High => "! ",
        Severity::Medium => "~ ",
        Severity::Low => "- ",
    }
}

/// Render a report as formatted terminal output. Findings are grouped by
/// rule so twenty Q3 hits read as one block with an occurrence count.
pub fn render(report: &Report) -> Result<String> {
    let mut out = String::new();

    writeln!(
        out,
        "\n{BOLD}Dashboard:{RESET} {} {DIM}({}){RESET}",
        report.dashboard_title, report.dashboard_uid
    )?;
    writeln!(out, "{BOLD}Score:{RESET}     {}", score_bar(report.score))?;
    writeln!(
        out,
        "{BOLD}Panels:{RESET}    {}  |  Targets: {}  |  Parse errors: {}",
        report.metadata.total_panels, report.metadata.total_targets, report.metadata.parse_errors
    )?;
    if report.metadata.cardinality_available {
        writeln!(out, "{DIM}Cardinality data: live from Prometheus{RESET}")?;
    }
    writeln!(out, "{DIM}{}{RESET}", "─".repeat(70))?;

    if report.findings.is_empty() {
        writeln!(out, "No issues found. Dashboard looks healthy!")?;
        return Ok(out);
    }

    writeln!(out, "Found {} issue(s):\n", report.findings.len())?;

    let grouped = group_by_rule(&report.findings);
    let mut rule_ids: Vec<&str> = grouped.keys().copied().collect();
    rule_ids.sort_unstable();

    for rule_id in rule_ids {
        let findings = &grouped[rule_id];
        let first = findings[0];
        let color = severity_color(first.severity);
        let plural = if findings.len() == 1 { "" } else { "s" };
        writeln!(
            out,
            "  {color}{}{RESET}  {BOLD}{rule_id}{RESET} [{}] ({} occurrence{plural})",
            severity_icon(first.severity),
            first.title,
            findings.len()
        )?;

        let panels = collect_panels(findings);
        if !panels.is_empty() {
            writeln!(out, "       Panels: {panels}")?;
        }
        writeln!(out, "       Why:    {}", first.why)?;
        writeln!(out, "       Fix:    {}", first.fix)?;
        writeln!(out, "       Impact: {}", first.impact)?;
        writeln!(out, "       Check:  {}", first.validate)?;
        writeln!(
            out,
            "       {DIM}Confidence: {:.0}%{RESET}",
            first.confidence * 100.0
        )?;
        if first.auto_fixable {
            writeln!(out, "       Auto-fixable: yes (use --fix)")?;
        }
        writeln!(out)?;
    }

    Ok(out)
}

fn score_bar(score: i32) -> String {
    let label = if score >= 80 {
        "GOOD"
    } else if score >= 60 {
        "FAIR"
    } else if score >= 40 {
        "POOR"
    } else {
        "CRITICAL"
    };
    let filled = (score.clamp(0, 100) / 5) as usize; // 20 chars max
    format!(
        "{score}/100 [{}{}] {label}",
        "█".repeat(filled),
        "░".repeat(20 - filled)
    )
}

fn group_by_rule(findings: &[Finding]) -> HashMap<&str, Vec<&Finding>> {
    let mut grouped: HashMap<&str, Vec<&Finding>> = HashMap::new();
    for f in findings {
        grouped.entry(f.rule_id.as_str()).or_default().push(f);
    }
    grouped
}

/// Unique panel titles across a rule's findings, capped at five.
fn collect_panels(findings: &[&Finding]) -> String {
    let mut seen = Vec::new();
    for f in findings {
        for title in &f.panel_titles {
            if !title.is_empty() && !seen.contains(title) {
                seen.push(title.clone());
            }
        }
    }
    if seen.len() > 5 {
        format!("{}, ... (+{} more)", seen[..5].join(", "), seen.len() - 5)
    } else {
        seen.join(", ")
    }
}
