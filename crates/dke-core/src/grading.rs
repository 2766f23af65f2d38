//! Rubric grading of free-text responses.
//!
//! A [`Grader`] is chosen once at construction: either the offline keyword
//! coverage scorer or an external [`CriterionScorer`]. Either way the
//! per-criterion scores are combined by the rubric weights.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::statistics::EPS;
use crate::traits::{CriterionScorer, ScoreRequest};

/// Score assigned to a criterion that lists no keywords.
const NEUTRAL_SCORE: f64 = 0.5;

/// Grading criteria with their keywords and weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rubric {
    /// Criterion name → keywords that evidence it.
    pub criteria: BTreeMap<String, Vec<String>>,
    /// Criterion name → weight in the overall score.
    pub weights: BTreeMap<String, f64>,
}

impl Default for Rubric {
    fn default() -> Self {
        let defaults: [(&str, [&str; 3], f64); 4] = [
            ("context_relevance", ["define", "apply", "example"], 0.25),
            ("factual_accuracy", ["theory", "model", "parameter"], 0.35),
            ("completeness", ["assumption", "limitation", "implication"], 0.20),
            ("logical_consistency", ["because", "therefore", "however"], 0.20),
        ];
        let mut criteria = BTreeMap::new();
        let mut weights = BTreeMap::new();
        for (name, keywords, weight) in defaults {
            criteria.insert(
                name.to_string(),
                keywords.iter().map(|k| k.to_string()).collect(),
            );
            weights.insert(name.to_string(), weight);
        }
        Self { criteria, weights }
    }
}

impl Rubric {
    /// Weighted mean of `scores` over the rubric weights.
    ///
    /// Criteria without a score contribute zero.
    pub fn combine(&self, scores: &BTreeMap<String, f64>) -> f64 {
        let total_weight: f64 = self.weights.values().sum();
        let weighted: f64 = self
            .weights
            .iter()
            .map(|(criterion, w)| w * scores.get(criterion).copied().unwrap_or(0.0))
            .sum();
        weighted / total_weight.max(EPS)
    }
}

/// Offline scorer: fraction of each criterion's keywords that appear in both
/// the response and the reference text (case-insensitive).
pub fn keyword_coverage(response: &str, rubric: &Rubric, reference: &str) -> BTreeMap<String, f64> {
    let text = response.to_lowercase();
    let reference = reference.to_lowercase();

    rubric
        .criteria
        .iter()
        .map(|(criterion, keywords)| {
            if keywords.is_empty() {
                return (criterion.clone(), NEUTRAL_SCORE);
            }
            let hits = keywords
                .iter()
                .map(|kw| kw.to_lowercase())
                .filter(|kw| text.contains(kw.as_str()) && reference.contains(kw.as_str()))
                .count();
            (criterion.clone(), hits as f64 / keywords.len() as f64)
        })
        .collect()
}

/// Outcome of grading one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    /// Weighted overall score in `[0, 1]`.
    pub overall: f64,
    /// Per-criterion scores in `[0, 1]`.
    pub criteria: BTreeMap<String, f64>,
}

/// Free-text grader.
#[derive(Clone, Default)]
pub enum Grader {
    /// Offline keyword coverage against the reference text.
    #[default]
    KeywordCoverage,
    /// Externally supplied criterion scorer.
    External(Arc<dyn CriterionScorer>),
}

impl fmt::Debug for Grader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grader::KeywordCoverage => f.write_str("KeywordCoverage"),
            Grader::External(scorer) => f.debug_tuple("External").field(&scorer.name()).finish(),
        }
    }
}

impl Grader {
    pub fn external(scorer: Arc<dyn CriterionScorer>) -> Self {
        Grader::External(scorer)
    }

    /// Short name for logs and reports.
    pub fn name(&self) -> &str {
        match self {
            Grader::KeywordCoverage => "keyword",
            Grader::External(scorer) => scorer.name(),
        }
    }

    /// Grade `response` against `rubric` and `reference`.
    ///
    /// Only the external variant can fail; its scores are clamped to `[0, 1]`.
    pub async fn grade(&self, response: &str, rubric: &Rubric, reference: &str) -> Result<Grade> {
        let criteria = match self {
            Grader::KeywordCoverage => keyword_coverage(response, rubric, reference),
            Grader::External(scorer) => {
                let request = ScoreRequest {
                    response: response.to_string(),
                    reference: reference.to_string(),
                    rubric: rubric.clone(),
                };
                let raw: HashMap<String, f64> = scorer
                    .score(&request)
                    .await
                    .with_context(|| format!("scorer '{}' failed", scorer.name()))?;
                raw.into_iter()
                    .map(|(criterion, score)| {
                        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
                        (criterion, score)
                    })
                    .collect()
            }
        };
        let overall = rubric.combine(&criteria);
        Ok(Grade { overall, criteria })
    }
}
