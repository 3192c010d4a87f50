//! Recursive query-cost estimation
//!
//! Walks a parsed expression bottom-up and returns a unit-less relative
//! cost. Higher means more expensive; the value is only meaningful for
//! ranking queries against each other.
//!
//! Formula sketch:
//!
//! ```text
//! selector          = estimated_series(metric)        [default 1000]
//! matrix            = inner × (range / step)
//! aggregation       = inner × (1 + 0.2·depth + 0.1·|grouping|)
//! call              = Σ(args) × function_weight        [default 1.0]
//! binary            = lhs + rhs
//! subquery          = inner × max(1, range / inner_step)
//! literals          = 0
//! ```

use crate::cardinality::{CardinalityData, DEFAULT_HEURISTIC_SERIES};
use crate::promql::Expr;

/// Per-function cost multiplier. Unlisted functions default to 1.0.
fn function_weight(name: &str) -> f64 {
    match name {
        "rate" | "irate" | "increase" | "delta" | "idelta" => 1.0,
        "histogram_quantile" | "quantile_over_time" => 2.0,
        "sort" | "sort_desc" => 0.5,
        "label_replace" | "label_join" => 0.3,
        "avg_over_time" | "sum_over_time" | "max_over_time" | "min_over_time"
        | "count_over_time" | "stddev_over_time" => 1.5,
        "absent" | "absent_over_time" => 0.1,
        "vector" | "scalar" | "time" => 0.01,
        _ => 1.0,
    }
}

/// Estimate the relative execution cost of a parsed expression.
///
/// `step_secs` defaults to 15 when unspecified or non-positive. A `None`
/// expression (unparsed query) costs 0.
pub fn estimate_cost(
    expr: Option<&Expr>,
    cardinality: Option<&CardinalityData>,
    step_secs: f64,
) -> f64 {
    let Some(expr) = expr else {
        return 0.0;
    };
    let step = if step_secs > 0.0 { step_secs } else { 15.0 };
    walk_cost(expr, cardinality, step, 0)
}

fn walk_cost(expr: &Expr, card: Option<&CardinalityData>, step: f64, depth: u32) -> f64 {
    match expr {
        Expr::Selector(vs) => selector_cost(vs, card),

        Expr::Matrix {
            selector,
            range_secs,
        } => {
            let range = if *range_secs > 0.0 { *range_secs } else { step };
            selector_cost(selector, card) * (range / step)
        }

        Expr::Aggregate { expr, grouping, .. } => {
            // depth increments only across aggregation boundaries.
            let inner = walk_cost(expr, card, step, depth + 1);
            let factor = 1.0 + 0.2 * f64::from(depth) + 0.1 * grouping.len() as f64;
            inner * factor
        }

        Expr::Call { func, args } => {
            let children: f64 = args.iter().map(|a| walk_cost(a, card, step, depth)).sum();
            children * function_weight(func)
        }

        Expr::Binary { lhs, rhs, .. } => {
            walk_cost(lhs, card, step, depth) + walk_cost(rhs, card, step, depth)
        }

        Expr::Subquery {
            expr,
            range_secs,
            step_secs,
        } => {
            let inner = walk_cost(expr, card, step, depth);
            let sub_step = match step_secs {
                Some(s) if *s > 0.0 => *s,
                _ => step,
            };
            let evaluations = (range_secs / sub_step).max(1.0);
            inner * evaluations
        }

        Expr::Paren(inner) | Expr::Unary(inner) => walk_cost(inner, card, step, depth),

        Expr::NumberLiteral(_) | Expr::StringLiteral(_) => 0.0,
    }
}

fn selector_cost(vs: &crate::promql::VectorSelector, card: Option<&CardinalityData>) -> f64 {
    let metric = vs.metric_name().unwrap_or("");
    let series = match card {
        Some(card) => card.estimated_series(metric, DEFAULT_HEURISTIC_SERIES),
        None => DEFAULT_HEURISTIC_SERIES,
    };
    series as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promql::parse;

    fn cost(q: &str) -> f64 {
        let expr = parse(q).unwrap();
        estimate_cost(Some(&expr), None, 15.0)
    }

    #[test]
    fn absent_expression_is_free() {
        assert_eq!(estimate_cost(None, None, 15.0), 0.0);
    }

    #[test]
    fn bare_selector_uses_heuristic_default() {
        assert_eq!(cost("some_unknown_metric"), 1000.0);
    }

    #[test]
    fn matrix_scales_by_range_over_step() {
        // 300s range / 15s step = 20× the selector cost.
        assert_eq!(cost("m[5m]"), 20_000.0);
    }

    #[test]
    fn step_defaults_when_non_positive() {
        let expr = parse("m[5m]").unwrap();
        assert_eq!(estimate_cost(Some(&expr), None, 0.0), 20_000.0);
        assert_eq!(estimate_cost(Some(&expr), None, -3.0), 20_000.0);
    }

    #[test]
    fn aggregation_factor() {
        // sum by (job) at depth 0: 1000 × (1 + 0 + 0.1) = 1100
        assert!((cost("sum by (job) (m)") - 1100.0).abs() < 1e-9);
        // Nested aggregation: inner runs at depth 1 → 1000 × 1.2 = 1200,
        // outer at depth 0 with no grouping → × 1.0.
        assert!((cost("sum(max(m))") - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn function_weights() {
        assert_eq!(cost("rate(m[5m])"), 20_000.0);
        assert_eq!(cost("sort(m)"), 500.0);
        assert_eq!(cost("absent(m)"), 100.0);
        assert_eq!(cost("histogram_quantile(0.9, m)"), 2000.0);
        assert_eq!(cost("vector(1)"), 0.0);
    }

    #[test]
    fn binary_adds_sides() {
        assert_eq!(cost("a + b"), 2000.0);
    }

    #[test]
    fn subquery_multiplies_evaluations() {
        // 1h range / 60s step = 60 inner evaluations over rate(m[1m]) = 4000.
        assert_eq!(cost("max_over_time(rate(m[1m])[1h:1m])"), 360_000.0);
        // Missing step falls back to ambient 15s: 3600/15 = 240.
        assert_eq!(cost("max_over_time(m[1h:])"), 360_000.0);
    }

    #[test]
    fn measured_series_override_heuristic() {
        let mut card = CardinalityData::default();
        card.series_by_metric.insert("up".into(), 50);
        let expr = parse("up").unwrap();
        assert_eq!(estimate_cost(Some(&expr), Some(&card), 15.0), 50.0);
    }

    #[test]
    fn literals_are_free() {
        assert_eq!(cost("42"), 0.0);
    }
}
