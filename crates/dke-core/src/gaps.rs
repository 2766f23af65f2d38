//! Learning-gap analysis: turns a finished assessment into a study plan.
//!
//! Skills below the mastery target become prioritized gaps with a content
//! difficulty level, a time budget, and a search query for content
//! discovery. Running the search itself is left to the caller.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Skills at or above this mastery produce no gap.
pub const MASTERY_TARGET: f64 = 0.8;

/// Ability below this triggers an early re-assessment.
const REASSESS_THETA: f64 = -0.3;

const MIN_STUDY_MINUTES: u32 = 15;
const MAX_STUDY_MINUTES: u32 = 120;

/// Content difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Level matching a BKT mastery probability.
    pub fn for_mastery(mastery: f64) -> Self {
        if mastery < 0.4 {
            Difficulty::Beginner
        } else if mastery < 0.7 {
            Difficulty::Intermediate
        } else {
            Difficulty::Advanced
        }
    }

    /// Level matching an IRT ability estimate.
    pub fn for_theta(theta: f64) -> Self {
        if theta < -0.5 {
            Difficulty::Beginner
        } else if theta < 0.5 {
            Difficulty::Intermediate
        } else {
            Difficulty::Advanced
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        })
    }
}

/// Urgency of a gap. Orders `High < Medium < Low`, so sorting puts the most
/// urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn for_mastery(mastery: f64) -> Self {
        if mastery < 0.4 {
            Priority::High
        } else if mastery < 0.6 {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        })
    }
}

/// A skill that needs further study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningGap {
    pub skill: String,
    pub mastery_level: f64,
    pub theta_estimate: f64,
    pub priority: Priority,
    pub recommended_difficulty: Difficulty,
    /// Minutes.
    pub estimated_study_time: u32,
    pub rationale: String,
}

/// Search query handed to a content discovery service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryQuery {
    pub query: String,
    pub difficulty: Difficulty,
    /// Minutes available for this gap.
    pub time_budget: u32,
}

/// When the learner should be assessed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextAssessment {
    #[serde(rename = "after_completing_3_items")]
    AfterThreeItems,
    #[serde(rename = "weekly")]
    Weekly,
}

impl fmt::Display for NextAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NextAssessment::AfterThreeItems => "after completing 3 items",
            NextAssessment::Weekly => "weekly",
        })
    }
}

/// Prioritized gaps plus the queries and schedule derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyPlan {
    pub gaps: Vec<LearningGap>,
    pub queries: Vec<DiscoveryQuery>,
    /// Sum of the gaps' study time, in minutes.
    pub estimated_completion_time: u32,
    pub next_assessment_trigger: NextAssessment,
    /// Content level suggested by overall ability.
    pub ability_level: Difficulty,
}

/// Minutes needed to close a mastery gap: 30 per 0.1 missing, clamped.
pub fn estimate_study_time(mastery: f64) -> u32 {
    let minutes = ((1.0 - mastery) * 300.0).max(0.0) as u32;
    minutes.clamp(MIN_STUDY_MINUTES, MAX_STUDY_MINUTES)
}

/// Skills ordered most urgent first: by priority, then lowest mastery, then name.
pub fn prioritize_skills(mastery: &BTreeMap<String, f64>) -> Vec<String> {
    let mut ranked: Vec<(&String, Priority, f64)> = mastery
        .iter()
        .map(|(skill, &m)| (skill, Priority::for_mastery(m), m))
        .collect();
    ranked.sort_by(|x, y| {
        x.1.cmp(&y.1)
            .then(x.2.total_cmp(&y.2))
            .then_with(|| x.0.cmp(y.0))
    });
    ranked.into_iter().map(|(skill, _, _)| skill.clone()).collect()
}

/// One gap per skill below [`MASTERY_TARGET`], most urgent first.
pub fn identify_learning_gaps(theta: f64, mastery: &BTreeMap<String, f64>) -> Vec<LearningGap> {
    prioritize_skills(mastery)
        .into_iter()
        .filter_map(|skill| {
            let m = mastery[&skill];
            if m >= MASTERY_TARGET {
                return None;
            }
            let difficulty = Difficulty::for_mastery(m);
            Some(LearningGap {
                rationale: format!(
                    "Current mastery at {:.1}%. Recommended practice with {difficulty} level content.",
                    m * 100.0
                ),
                skill,
                mastery_level: m,
                theta_estimate: theta,
                priority: Priority::for_mastery(m),
                recommended_difficulty: difficulty,
                estimated_study_time: estimate_study_time(m),
            })
        })
        .collect()
}

/// Content search queries for `gaps`, optionally narrowed by `context`.
pub fn discovery_queries(gaps: &[LearningGap], context: Option<&str>) -> Vec<DiscoveryQuery> {
    let context = context.map(str::trim).filter(|c| !c.is_empty());
    gaps.iter()
        .map(|gap| DiscoveryQuery {
            query: match context {
                Some(ctx) => format!("{} {ctx} tutorial practice", gap.skill),
                None => format!("{} tutorial practice exercises", gap.skill),
            },
            difficulty: gap.recommended_difficulty,
            time_budget: gap.estimated_study_time,
        })
        .collect()
}

impl StudyPlan {
    /// Build a plan from the final ability estimate and mastery snapshot.
    pub fn build(theta: f64, mastery: &BTreeMap<String, f64>, context: Option<&str>) -> Self {
        let gaps = identify_learning_gaps(theta, mastery);
        let queries = discovery_queries(&gaps, context);
        let estimated_completion_time = gaps.iter().map(|g| g.estimated_study_time).sum();
        let next_assessment_trigger =
            if theta < REASSESS_THETA || gaps.iter().any(|g| g.priority == Priority::High) {
                NextAssessment::AfterThreeItems
            } else {
                NextAssessment::Weekly
            };
        Self {
            gaps,
            queries,
            estimated_completion_time,
            next_assessment_trigger,
            ability_level: Difficulty::for_theta(theta),
        }
    }
}
