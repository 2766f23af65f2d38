//! Per-skill Bayesian Knowledge Tracing.
//!
//! Each tracked skill carries a mastery probability. An observed outcome
//! first conditions that belief on the evidence (slip and guess rates) and
//! then applies the learning transition.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::BktParams;
use crate::statistics::EPS;

/// Mastery probability per tracked skill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BktState {
    pub mastery: BTreeMap<String, f64>,
}

/// Posterior probability of mastery after observing one outcome, before the
/// learning transition.
pub fn bkt_posterior(p_k: f64, correct: bool, params: &BktParams) -> f64 {
    let (num, den) = if correct {
        let num = p_k * (1.0 - params.p_slip);
        (num, num + (1.0 - p_k) * params.p_guess)
    } else {
        let num = p_k * params.p_slip;
        (num, num + (1.0 - p_k) * (1.0 - params.p_guess))
    };
    num / den.max(EPS)
}

/// Learning transition applied after the evidence update.
pub fn bkt_transition(p_given: f64, params: &BktParams) -> f64 {
    p_given + (1.0 - p_given) * params.p_transit
}

/// Tracks mastery for a fixed set of skills.
#[derive(Debug, Clone)]
pub struct KnowledgeTracer {
    default_params: BktParams,
    skill_params: HashMap<String, BktParams>,
    state: BktState,
}

impl KnowledgeTracer {
    /// Track `skills`, each starting at `params.p_init`.
    pub fn new<I, S>(skills: I, params: BktParams) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        params.validate()?;
        let mastery = skills
            .into_iter()
            .map(|s| (s.into(), params.p_init))
            .collect();
        Ok(Self {
            default_params: params,
            skill_params: HashMap::new(),
            state: BktState { mastery },
        })
    }

    /// Use dedicated parameters for one skill, resetting it to their prior.
    pub fn with_skill_params(
        mut self,
        skill: &str,
        params: BktParams,
    ) -> Result<Self, ValidationError> {
        params.validate()?;
        let Some(mastery) = self.state.mastery.get_mut(skill) else {
            return Err(ValidationError::UnknownSkill(skill.to_string()));
        };
        *mastery = params.p_init;
        self.skill_params.insert(skill.to_string(), params);
        Ok(self)
    }

    /// Parameters in effect for `skill`.
    pub fn params(&self, skill: &str) -> &BktParams {
        self.skill_params.get(skill).unwrap_or(&self.default_params)
    }

    pub fn is_tracked(&self, skill: &str) -> bool {
        self.state.mastery.contains_key(skill)
    }

    /// Current mastery for `skill`, if tracked.
    pub fn mastery(&self, skill: &str) -> Option<f64> {
        self.state.mastery.get(skill).copied()
    }

    /// Fold one observed outcome into `skill`'s mastery and return the new value.
    pub fn update(&mut self, skill: &str, correct: bool) -> Result<f64, ValidationError> {
        let params = *self.params(skill);
        let Some(p_k) = self.state.mastery.get_mut(skill) else {
            return Err(ValidationError::UnknownSkill(skill.to_string()));
        };
        let p_given = bkt_posterior(*p_k, correct, &params);
        let p_next = bkt_transition(p_given, &params);
        tracing::trace!(skill, correct, prior = *p_k, posterior = p_given, next = p_next, "bkt update");
        *p_k = p_next;
        Ok(p_next)
    }

    /// Copy of the current mastery mapping.
    pub fn mastery_snapshot(&self) -> BTreeMap<String, f64> {
        self.state.mastery.clone()
    }

    pub fn state(&self) -> &BktState {
        &self.state
    }
}
