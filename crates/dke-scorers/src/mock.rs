//! Mock scorer for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use dke_core::traits::{CriterionScorer, ScoreRequest};

/// A criterion scorer that returns canned scores without any network call.
///
/// Scores are chosen by matching substrings of the learner response; the
/// first matching key wins, otherwise the default scores are returned.
pub struct MockScorer {
    /// Response substring → scores.
    responses: Vec<(String, HashMap<String, f64>)>,
    /// Scores when no substring matches.
    default_scores: HashMap<String, f64>,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last request received.
    last_request: Mutex<Option<ScoreRequest>>,
}

impl MockScorer {
    /// Create a mock scorer with the given response→scores mappings.
    pub fn new(responses: Vec<(String, HashMap<String, f64>)>) -> Self {
        Self {
            responses,
            default_scores: HashMap::new(),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same scores.
    pub fn with_fixed_scores(scores: HashMap<String, f64>) -> Self {
        Self {
            default_scores: scores,
            ..Self::new(Vec::new())
        }
    }

    /// Give every criterion of the default rubric the same score.
    pub fn uniform(score: f64) -> Self {
        let scores = dke_core::grading::Rubric::default()
            .criteria
            .into_keys()
            .map(|c| (c, score))
            .collect();
        Self::with_fixed_scores(scores)
    }

    /// Get the number of calls made to this scorer.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this scorer.
    pub fn last_request(&self) -> Option<ScoreRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl CriterionScorer for MockScorer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn score(&self, request: &ScoreRequest) -> anyhow::Result<HashMap<String, f64>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self
            .last_request
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(request.clone());

        let scores = self
            .responses
            .iter()
            .find(|(key, _)| request.response.contains(key.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_scores.clone());

        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dke_core::grading::{Grader, Rubric};
    use std::sync::Arc;

    fn request(response: &str) -> ScoreRequest {
        ScoreRequest {
            response: response.into(),
            reference: "reference".into(),
            rubric: Rubric::default(),
        }
    }

    #[tokio::test]
    async fn fixed_scores() {
        let scorer = MockScorer::uniform(0.7);
        let scores = scorer.score(&request("anything")).await.unwrap();
        assert_eq!(scores.len(), 4);
        assert_eq!(scores["completeness"], 0.7);
        assert_eq!(scorer.call_count(), 1);
        assert_eq!(scorer.last_request().unwrap().response, "anything");
    }

    #[tokio::test]
    async fn response_matching() {
        let strong: HashMap<String, f64> = [("factual_accuracy".to_string(), 0.9)].into();
        let weak: HashMap<String, f64> = [("factual_accuracy".to_string(), 0.1)].into();
        let scorer = MockScorer::new(vec![("theorem".into(), strong), ("guess".into(), weak)]);

        let scores = scorer.score(&request("by the theorem")).await.unwrap();
        assert_eq!(scores["factual_accuracy"], 0.9);
        let scores = scorer.score(&request("just a guess")).await.unwrap();
        assert_eq!(scores["factual_accuracy"], 0.1);
        assert!(scorer.score(&request("other")).await.unwrap().is_empty());
        assert_eq!(scorer.call_count(), 3);
    }

    #[tokio::test]
    async fn drives_external_grader() {
        let scorer = Arc::new(MockScorer::uniform(1.0));
        let grader = Grader::external(scorer.clone());
        let grade = grader.grade("x", &Rubric::default(), "y").await.unwrap();
        assert!((grade.overall - 1.0).abs() < 1e-12);
        assert_eq!(scorer.call_count(), 1);
    }
}
