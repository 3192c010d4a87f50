//! Health scoring
//!
//! Findings reduce to a 0-100 composite score through an asymptotic
//! formula: every fix visibly improves the score, and no dashboard can
//! reach exactly 0.
//!
//! ```text
//! score = round(100 × k / (penalty + k))
//! ```
//!
//! where penalty = Σ severity_weight and k = 100. Properties:
//! - penalty 0 → 100 (perfect)
//! - penalty = k → 50 (roughly 10 High or 7 Critical findings)
//! - score stays in (0, 100]; only an empty finding set yields 100

use crate::models::Finding;
use std::collections::HashMap;

const K: f64 = 100.0;

/// Composite health score for a set of findings.
pub fn compute_score(findings: &[Finding]) -> i32 {
    let penalty: u32 = findings.iter().map(|f| f.severity.weight()).sum();
    if penalty == 0 {
        return 100;
    }
    (100.0 * K / (penalty as f64 + K)).round() as i32
}

/// Per-panel scores: the same formula applied to the subset of findings
/// referencing each panel. Panels without findings are absent.
pub fn compute_panel_scores(findings: &[Finding]) -> HashMap<i64, i32> {
    let mut by_panel: HashMap<i64, Vec<&Finding>> = HashMap::new();
    for f in findings {
        for &pid in &f.panel_ids {
            by_panel.entry(pid).or_default().push(f);
        }
    }

    by_panel
        .into_iter()
        .map(|(pid, fs)| {
            let penalty: u32 = fs.iter().map(|f| f.severity.weight()).sum();
            let score = if penalty == 0 {
                100
            } else {
                (100.0 * K / (penalty as f64 + K)).round() as i32
            };
            (pid, score)
        })
        .collect()
}
