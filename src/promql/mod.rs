//! PromQL parsing for dashboard analysis
//!
//! The analysis engine consumes this module through two pure functions:
//! [`substitute`] rewrites Grafana template references into parseable
//! placeholders, and [`parse`] turns the result into an [`ast::Expr`].
//! Parse failure is a first-class, non-fatal outcome for the engine.

pub mod ast;
mod lexer;
mod parser;
mod substitute;

pub use ast::{BinOp, Expr, LabelMatcher, MatchOp, VectorMatching, VectorSelector};
pub use parser::parse;
pub use substitute::substitute;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid duration {0:?}")]
    BadDuration(String),
    #[error("invalid number {0:?}")]
    BadNumber(String),
    #[error("{0}")]
    Unexpected(String),
    #[error("trailing input after expression")]
    TrailingInput,
}

/// Parse a PromQL duration string like "5m", "90s", or "1h30m" into
/// seconds. Units: ms, s, m, h, d, w, y.
pub fn parse_duration_secs(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut total: f64 = 0.0;
    while i < bytes.len() {
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == start {
            return None;
        }
        let n: f64 = s[start..i].parse().ok()?;
        let unit_start = i;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        let per_unit = match &s[unit_start..i] {
            "ms" => 0.001,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            "d" => 86_400.0,
            "w" => 604_800.0,
            "y" => 31_536_000.0,
            _ => return None,
        };
        total += n * per_unit;
    }
    Some(total)
}

/// Format a second count as a compact PromQL-style duration for messages.
pub fn format_duration_secs(secs: f64) -> String {
    let secs = secs.round() as u64;
    if secs == 0 {
        return "0s".to_string();
    }
    let mut remaining = secs;
    let mut out = String::new();
    for (unit, label) in [(86_400, "d"), (3_600, "h"), (60, "m"), (1, "s")] {
        let n = remaining / unit;
        if n > 0 {
            out.push_str(&format!("{n}{label}"));
            remaining %= unit;
        }
    }
    out
}
