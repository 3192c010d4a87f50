//! Grafana dashboard analysis library
//!
//! The pipeline: [`dashboard`] parses the JSON into a typed model,
//! [`promql`] turns target expressions into ASTs, [`rules`] detect
//! anti-patterns, [`scoring`] condenses findings into a health score,
//! and [`reporters`] render the result. [`fixer`] patches the raw JSON
//! for auto-fixable findings, and [`cardinality`] optionally enriches
//! the run with live TSDB data.

pub mod analyzer;
pub mod cardinality;
pub mod cli;
pub mod dashboard;
pub mod fixer;
pub mod models;
pub mod promql;
pub mod reporters;
pub mod rules;
pub mod scoring;
