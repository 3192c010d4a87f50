//! Detection rule catalog
//!
//! Two families of rules share one read-only [`AnalysisContext`]:
//! expression rules (Q1-Q12) walk parsed PromQL trees looking for specific
//! node shapes, structural rules (D1-D10) walk the dashboard model
//! directly. Rules are stateless values; the engine runs them in
//! registration order so the emitted finding list is deterministic. A rule
//! that cannot confidently classify a condition emits nothing; rule
//! predicates never error.

mod missing_filters;
mod unbounded_regex;
mod regex_equality;
mod high_cardinality_grouping;
mod late_aggregation;
mod long_rate_range;
mod hardcoded_interval;
mod subquery_abuse;
mod duplicate_expressions;
mod incorrect_aggregation;
mod rate_on_gauge;
mod vector_matching;

mod too_many_panels;
mod repeat_with_all;
mod variable_explosion;
mod expensive_variable_query;
mod refresh_too_frequent;
mod range_too_wide;
mod missing_max_data_points;
mod duplicate_queries;
mod datasource_mixing;
mod no_collapsed_rows;

pub use missing_filters::MissingFilters;
pub use unbounded_regex::UnboundedRegex;
pub use regex_equality::RegexEquality;
pub use high_cardinality_grouping::HighCardinalityGrouping;
pub use late_aggregation::LateAggregation;
pub use long_rate_range::LongRateRange;
pub use hardcoded_interval::HardcodedInterval;
pub use subquery_abuse::SubqueryAbuse;
pub use duplicate_expressions::DuplicateExpressions;
pub use incorrect_aggregation::IncorrectAggregation;
pub use rate_on_gauge::RateOnGauge;
pub use vector_matching::AmbiguousVectorMatching;

pub use too_many_panels::TooManyPanels;
pub use repeat_with_all::RepeatWithAll;
pub use variable_explosion::VariableExplosion;
pub use expensive_variable_query::ExpensiveVariableQuery;
pub use refresh_too_frequent::RefreshTooFrequent;
pub use range_too_wide::RangeTooWide;
pub use missing_max_data_points::MissingMaxDataPoints;
pub use duplicate_queries::DuplicateQueries;
pub use datasource_mixing::DatasourceMixing;
pub use no_collapsed_rows::NoCollapsedRows;

use crate::cardinality::CardinalityData;
use crate::dashboard::{self, Dashboard, Panel, Variable};
use crate::models::{Finding, Severity};
use crate::promql::Expr;
use std::collections::HashMap;

/// Read-only bundle shared by all rules in one analysis run. Built once
/// by the engine and discarded after the run.
pub struct AnalysisContext {
    pub dashboard: Dashboard,
    /// Raw expression string → parsed AST. Keyed by the *original* raw
    /// string; two targets with identical text share one entry. Absent
    /// keys are expressions that failed to parse.
    pub parsed_exprs: HashMap<String, Expr>,
    /// Live cardinality data; `None` for static-only runs.
    pub cardinality: Option<CardinalityData>,
}

impl AnalysisContext {
    /// Non-row panels with at least one non-empty expression, nested
    /// panels included.
    pub fn panels_with_targets(&self) -> Vec<&Panel> {
        dashboard::panels_with_targets(&self.dashboard)
    }

    /// Every panel including rows and nested panels.
    pub fn all_panels(&self) -> Vec<&Panel> {
        dashboard::all_panels(&self.dashboard)
    }

    pub fn variables(&self) -> &[Variable] {
        &self.dashboard.templating.list
    }

    /// Parsed AST for a raw expression, `None` if it failed to parse.
    pub fn expr(&self, raw: &str) -> Option<&Expr> {
        self.parsed_exprs.get(raw)
    }
}

/// The interface every detection rule implements.
///
/// `check` must be pure with respect to the context and must not panic on
/// any input; an unclassifiable condition yields no finding.
pub trait Rule: Send + Sync {
    /// Stable identifier ("Q1", "D2", ...); never renumbered.
    fn id(&self) -> &'static str;
    /// The severity this rule assigns to its findings.
    fn severity(&self) -> Severity;
    fn check(&self, ctx: &AnalysisContext) -> Vec<Finding>;
}

/// The built-in rule catalog, in registration (and therefore output)
/// order. An explicit constructed list, no global registry.
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        // Q-series: PromQL expression rules
        Box::new(MissingFilters),
        Box::new(UnboundedRegex),
        Box::new(RegexEquality),
        Box::new(HighCardinalityGrouping::default()),
        Box::new(LateAggregation),
        Box::new(LongRateRange::default()),
        Box::new(HardcodedInterval),
        Box::new(SubqueryAbuse::default()),
        Box::new(DuplicateExpressions::default()),
        Box::new(IncorrectAggregation),
        Box::new(RateOnGauge),
        Box::new(AmbiguousVectorMatching),
        // D-series: dashboard design rules
        Box::new(TooManyPanels::default()),
        Box::new(RepeatWithAll),
        Box::new(VariableExplosion::default()),
        Box::new(ExpensiveVariableQuery),
        Box::new(RefreshTooFrequent::default()),
        Box::new(RangeTooWide::default()),
        Box::new(MissingMaxDataPoints),
        Box::new(DuplicateQueries::default()),
        Box::new(DatasourceMixing::default()),
        Box::new(NoCollapsedRows::default()),
    ]
}

/// Functions that take a range vector as their first argument.
pub(crate) const RATE_RANGE_FUNCS: &[&str] = &["rate", "irate", "increase", "delta", "idelta"];

/// Functions that should use `$__rate_interval` instead of a hardcoded
/// duration.
pub(crate) const RATE_INTERVAL_FUNCS: &[&str] = &["rate", "irate", "increase"];

/// True if `s` contains regex metacharacters.
pub(crate) fn contains_regex_meta(s: &str) -> bool {
    s.chars().any(|c| {
        matches!(
            c,
            '.' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '^' | '$' | '\\'
        )
    })
}

/// Shorten a query string for display in finding text.
pub(crate) fn truncate_query(q: &str, max_len: usize) -> String {
    if q.chars().count() <= max_len {
        return q.to_string();
    }
    let cut: String = q.chars().take(max_len.saturating_sub(3)).collect();
    format!("{cut}...")
}

/// True if any selector in the tree has zero non-`__name__` matchers.
pub(crate) fn has_unfiltered_selector(expr: &Expr) -> bool {
    expr.any(|node| match node {
        Expr::Selector(vs) | Expr::Matrix { selector: vs, .. } => vs.real_matcher_count() == 0,
        _ => false,
    })
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_meta_detection() {
        assert!(!contains_regex_meta("200"));
        assert!(!contains_regex_meta("api-server"));
        assert!(contains_regex_meta(".*error.*"));
        assert!(contains_regex_meta("a|b"));
        assert!(contains_regex_meta(r"foo\d"));
    }

    #[test]
    fn default_rules_ids_are_unique_and_ordered() {
        let rules = default_rules();
        assert_eq!(rules.len(), 22);
        let ids: Vec<_> = rules.iter().map(|r| r.id()).collect();
        let mut dedup = ids.clone();
        dedup.dedup();
        assert_eq!(ids, dedup);
        assert_eq!(ids[0], "Q1");
        assert_eq!(ids[12], "D1");
        assert_eq!(ids[21], "D10");
    }

    #[test]
    fn truncation() {
        assert_eq!(truncate_query("short", 80), "short");
        let long = "x".repeat(100);
        let cut = truncate_query(&long, 10);
        assert_eq!(cut.len(), 10);
        assert!(cut.ends_with("..."));
    }
}
