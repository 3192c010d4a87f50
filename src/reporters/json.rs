//! JSON reporter
//!
//! Outputs the full Report as pretty-printed JSON for machine
//! consumption, piping to jq, or further processing.

use crate::models::Report;
use anyhow::Result;

/// Render report as pretty-printed JSON
pub fn render(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
