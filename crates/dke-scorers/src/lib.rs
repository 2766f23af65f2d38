//! dke-scorers — Criterion scorer backends and configuration.
//!
//! Implements the `CriterionScorer` trait for a remote HTTP grading service
//! and a canned mock, and loads the `dke.toml` configuration that selects
//! the grader and the assessment parameters.

pub mod config;
pub mod error;
pub mod http;
pub mod mock;

pub use config::{create_grader, load_config, load_config_from, DkeConfig, ScorerConfig};
pub use error::ScorerError;
