//! Learner self-assessment and concept-map scoring.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Likert confidence ratings (1..=5) keyed by skill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, u8>", into = "BTreeMap<String, u8>")]
pub struct SelfAssessment {
    confidence: BTreeMap<String, u8>,
}

impl SelfAssessment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rating for `skill`, replacing any earlier one.
    pub fn rate(&mut self, skill: impl Into<String>, value: u8) -> Result<(), ValidationError> {
        let skill = skill.into();
        if !(1..=5).contains(&value) {
            return Err(ValidationError::LikertOutOfRange { skill, value });
        }
        self.confidence.insert(skill, value);
        Ok(())
    }

    pub fn confidence(&self) -> &BTreeMap<String, u8> {
        &self.confidence
    }

    pub fn is_empty(&self) -> bool {
        self.confidence.is_empty()
    }

    /// Normalize each rating to `[0, 1]` as `(v - 1) / 4`.
    pub fn to_scores(&self) -> BTreeMap<String, f64> {
        self.confidence
            .iter()
            .map(|(skill, &v)| (skill.clone(), (f64::from(v) - 1.0) / 4.0))
            .collect()
    }
}

impl TryFrom<BTreeMap<String, u8>> for SelfAssessment {
    type Error = ValidationError;

    fn try_from(ratings: BTreeMap<String, u8>) -> Result<Self, Self::Error> {
        let mut sa = SelfAssessment::new();
        for (skill, value) in ratings {
            sa.rate(skill, value)?;
        }
        Ok(sa)
    }
}

impl From<SelfAssessment> for BTreeMap<String, u8> {
    fn from(sa: SelfAssessment) -> Self {
        sa.confidence
    }
}

/// A directed relation between two concepts, e.g. `("derivative", "slope")`.
pub type ConceptEdge = (String, String);

fn normalize(edges: &[ConceptEdge]) -> HashSet<(String, String)> {
    edges
        .iter()
        .map(|(from, to)| (from.trim().to_lowercase(), to.trim().to_lowercase()))
        .collect()
}

/// Fraction of the required relations present in the learner's map.
///
/// Matching ignores case and surrounding whitespace. With nothing required
/// the score is a neutral 0.5.
pub fn concept_map_score(edges: &[ConceptEdge], required: &[ConceptEdge]) -> f64 {
    let required = normalize(required);
    if required.is_empty() {
        return 0.5;
    }
    let got = normalize(edges);
    required.intersection(&got).count() as f64 / required.len() as f64
}
