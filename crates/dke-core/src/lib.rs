//! dke-core — Adaptive testing engine, knowledge tracing, and grading.
//!
//! This crate defines the item model, the 2PL computerized adaptive testing
//! loop, Bayesian Knowledge Tracing, and the assessment pipeline that the
//! rest of the dke workspace builds on.

pub mod assessment;
pub mod engine;
pub mod error;
pub mod gaps;
pub mod grading;
pub mod knowledge;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod statistics;
pub mod traits;
