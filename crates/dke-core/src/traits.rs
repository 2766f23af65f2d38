//! Trait definitions for response sources and criterion scorers.
//!
//! Response sources are implemented in `dke-sim` (simulated, scripted, and
//! console learners); external criterion scorers live in `dke-scorers`.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::grading::Rubric;
use crate::model::Item;

// ---------------------------------------------------------------------------
// Response source
// ---------------------------------------------------------------------------

/// Supplies the binary outcome for an administered item.
///
/// This is the adaptive loop's only suspension point: it may block on a
/// human. Returning `None` means the response was cancelled or the source is
/// exhausted, and the loop terminates exactly as if no candidate item were
/// left.
pub trait ResponseSource {
    /// Outcome for `item`: `Some(true)` correct, `Some(false)` incorrect.
    fn respond(&mut self, item: &Item) -> Option<bool>;
}

impl<F> ResponseSource for F
where
    F: FnMut(&Item) -> bool,
{
    fn respond(&mut self, item: &Item) -> Option<bool> {
        Some(self(item))
    }
}

// ---------------------------------------------------------------------------
// Criterion scorer
// ---------------------------------------------------------------------------

/// Externally supplied scorer for free-text responses.
///
/// Implementations return a score in `[0, 1]` per rubric criterion. Missing
/// criteria count as zero when the grader combines them.
#[async_trait]
pub trait CriterionScorer: Send + Sync {
    /// Human-readable scorer name (e.g. "http").
    fn name(&self) -> &str;

    /// Score a free-text response against the rubric.
    async fn score(&self, request: &ScoreRequest) -> anyhow::Result<HashMap<String, f64>>;
}

/// Everything an external scorer needs to grade one response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRequest {
    /// The learner's free-text answer.
    pub response: String,
    /// Reference text the answer is judged against.
    pub reference: String,
    /// Criteria and weights in effect.
    pub rubric: Rubric,
}
