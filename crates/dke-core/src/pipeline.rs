//! End-to-end assessment: adaptive test, knowledge tracing, rubric grading,
//! self-assessment and concept map, folded into one result and dashboard.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assessment::{concept_map_score, ConceptEdge, SelfAssessment};
use crate::engine::{CatEngine, CatState, NoopObserver, SessionObserver, StopReason};
use crate::error::ValidationError;
use crate::grading::{Grader, Rubric};
use crate::knowledge::KnowledgeTracer;
use crate::model::{BktParams, CatConfig, ItemBank};
use crate::statistics::{round3, serde_se};
use crate::traits::ResponseSource;

/// Mastery below this is flagged for practice.
const PRACTICE_THRESHOLD: f64 = 0.60;
/// Ability below this suggests easier items.
const LOW_THETA: f64 = -0.3;
const FACTUAL_ACCURACY_THRESHOLD: f64 = 0.6;
const CONCEPT_MAP_THRESHOLD: f64 = 0.5;
const LOW_CONFIDENCE: f64 = 0.5;

/// Learner inputs collected outside the adaptive loop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssessmentInputs {
    /// Free-text answer to grade.
    pub response_text: String,
    /// Reference text the answer is graded against.
    pub reference_text: String,
    pub self_assessment: SelfAssessment,
    /// Relations the learner drew.
    pub concept_edges: Vec<ConceptEdge>,
    /// Relations the concept map is expected to contain.
    pub required_edges: Vec<ConceptEdge>,
}

/// One administered item with its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemLogEntry {
    pub item_id: String,
    pub skill: String,
    pub a: f64,
    pub b: f64,
    pub correct: bool,
    /// Probability of a correct response at the final θ, to 3 decimals.
    pub p_at_theta: f64,
}

/// Rounded summary for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub ability_estimate: f64,
    #[serde(with = "serde_se")]
    pub ability_se: f64,
    pub mastery: BTreeMap<String, f64>,
    pub criteria: BTreeMap<String, f64>,
    pub overall: f64,
    pub self_assessment: BTreeMap<String, f64>,
    pub concept_map_score: f64,
    pub recommendations: Vec<String>,
}

/// Everything one assessment produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub theta: f64,
    #[serde(with = "serde_se")]
    pub theta_se: f64,
    pub stop_reason: StopReason,
    /// Administered items in order.
    pub item_log: Vec<ItemLogEntry>,
    pub mastery: BTreeMap<String, f64>,
    pub criteria: BTreeMap<String, f64>,
    pub overall: f64,
    pub self_assessment: BTreeMap<String, f64>,
    pub concept_map_score: f64,
    pub dashboard: Dashboard,
}

impl AssessmentResult {
    pub fn correct_count(&self) -> usize {
        self.item_log.iter().filter(|e| e.correct).count()
    }
}

/// Remediation advice derived from the assessment signals.
///
/// Always returns at least one entry.
pub fn recommendations(
    theta: f64,
    mastery: &BTreeMap<String, f64>,
    criteria: &BTreeMap<String, f64>,
    self_assessment: &BTreeMap<String, f64>,
    concept_map_score: f64,
) -> Vec<String> {
    let mut recs = Vec::new();

    let low_skills: Vec<&str> = mastery
        .iter()
        .filter(|(_, &p)| p < PRACTICE_THRESHOLD)
        .map(|(s, _)| s.as_str())
        .collect();
    if !low_skills.is_empty() {
        recs.push(format!(
            "Practice items for skills: {} (BKT < 0.60)",
            low_skills.join(", ")
        ));
    }
    if theta < LOW_THETA {
        recs.push("Assign easier adaptive items (theta below cohort mean)".to_string());
    }
    // An absent criterion is not evidence of a problem.
    if criteria.get("factual_accuracy").copied().unwrap_or(1.0) < FACTUAL_ACCURACY_THRESHOLD {
        recs.push("Provide targeted reading to improve factual accuracy".to_string());
    }
    if concept_map_score < CONCEPT_MAP_THRESHOLD {
        recs.push("Concept-map activity to connect core relations".to_string());
    }
    for (skill, &score) in self_assessment {
        if score < LOW_CONFIDENCE {
            recs.push(format!("Confidence low for {skill}: add reflective quiz + hints"));
        }
    }

    if recs.is_empty() {
        recs.push("Keep progressing to more challenging material".to_string());
    }
    recs
}

fn rounded(map: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
    map.iter().map(|(k, &v)| (k.clone(), round3(v))).collect()
}

/// Orchestrates a full assessment over an owned item bank.
#[derive(Debug, Clone)]
pub struct AssessmentPipeline {
    bank: ItemBank,
    cat_config: CatConfig,
    skills: Vec<String>,
    bkt_params: BktParams,
    rubric: Rubric,
    grader: Grader,
}

impl AssessmentPipeline {
    /// Validate the configuration and that every bank skill is tracked.
    pub fn new(
        bank: ItemBank,
        cat_config: CatConfig,
        skills: Vec<String>,
        bkt_params: BktParams,
        rubric: Rubric,
        grader: Grader,
    ) -> Result<Self, ValidationError> {
        cat_config.validate()?;
        bkt_params.validate()?;
        if let Some(missing) = bank.skills().into_iter().find(|s| !skills.contains(s)) {
            return Err(ValidationError::UnknownSkill(missing));
        }
        Ok(Self {
            bank,
            cat_config,
            skills,
            bkt_params,
            rubric,
            grader,
        })
    }

    /// Pipeline tracking exactly the skills present in `bank`.
    pub fn for_bank(
        bank: ItemBank,
        cat_config: CatConfig,
        bkt_params: BktParams,
        rubric: Rubric,
        grader: Grader,
    ) -> Result<Self, ValidationError> {
        let skills = bank.skills();
        Self::new(bank, cat_config, skills, bkt_params, rubric, grader)
    }

    pub fn bank(&self) -> &ItemBank {
        &self.bank
    }

    pub fn cat_config(&self) -> &CatConfig {
        &self.cat_config
    }

    pub fn skills(&self) -> &[String] {
        &self.skills
    }

    pub fn grader(&self) -> &Grader {
        &self.grader
    }

    pub async fn run<R>(&self, inputs: &AssessmentInputs, responder: &mut R) -> Result<AssessmentResult>
    where
        R: ResponseSource + ?Sized,
    {
        self.run_with_observer(inputs, responder, &NoopObserver).await
    }

    /// Run the adaptive session, then grade and summarize it.
    pub async fn run_with_observer<R>(
        &self,
        inputs: &AssessmentInputs,
        responder: &mut R,
        observer: &dyn SessionObserver,
    ) -> Result<AssessmentResult>
    where
        R: ResponseSource + ?Sized,
    {
        let engine = CatEngine::new(&self.bank, self.cat_config)?;
        let state = engine.run_with_observer(responder, observer);

        let mastery = self.trace_mastery(&state)?;

        let grade = self
            .grader
            .grade(&inputs.response_text, &self.rubric, &inputs.reference_text)
            .await?;

        let sa_scores = inputs.self_assessment.to_scores();
        let cm_score = concept_map_score(&inputs.concept_edges, &inputs.required_edges);

        let item_log = self.item_log(&state);

        let dashboard = Dashboard {
            ability_estimate: round3(state.theta),
            ability_se: round3(state.se),
            mastery: rounded(&mastery),
            criteria: rounded(&grade.criteria),
            overall: round3(grade.overall),
            self_assessment: rounded(&sa_scores),
            concept_map_score: round3(cm_score),
            recommendations: recommendations(
                state.theta,
                &mastery,
                &grade.criteria,
                &sa_scores,
                cm_score,
            ),
        };

        let stop_reason = state.stop_reason.unwrap_or(StopReason::BankExhausted);
        info!(
            items = state.len(),
            theta = state.theta,
            se = state.se,
            overall = grade.overall,
            ?stop_reason,
            grader = self.grader.name(),
            "assessment complete"
        );

        Ok(AssessmentResult {
            theta: state.theta,
            theta_se: state.se,
            stop_reason,
            item_log,
            mastery,
            criteria: grade.criteria,
            overall: grade.overall,
            self_assessment: sa_scores,
            concept_map_score: cm_score,
            dashboard,
        })
    }

    /// Replay the session's outcomes, in the order asked, through a fresh tracer.
    fn trace_mastery(&self, state: &CatState) -> Result<BTreeMap<String, f64>, ValidationError> {
        let mut tracer = KnowledgeTracer::new(self.skills.iter().cloned(), self.bkt_params)?;
        for (item_id, correct) in state.responses() {
            if let Some(item) = self.bank.get(item_id) {
                tracer.update(&item.skill, correct)?;
            }
        }
        Ok(tracer.mastery_snapshot())
    }

    fn item_log(&self, state: &CatState) -> Vec<ItemLogEntry> {
        state
            .responses()
            .filter_map(|(item_id, correct)| {
                let item = self.bank.get(item_id)?;
                Some(ItemLogEntry {
                    item_id: item.id.clone(),
                    skill: item.skill.clone(),
                    a: item.a,
                    b: item.b,
                    correct,
                    p_at_theta: round3(item.p_correct(state.theta)),
                })
            })
            .collect()
    }
}
