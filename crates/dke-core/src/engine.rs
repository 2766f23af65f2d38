//! Computerized adaptive testing engine.
//!
//! Selects items by maximum Fisher information at the current ability
//! estimate, refits ability by Newton-Raphson maximum likelihood after every
//! response, and stops on session length, estimate precision, bank
//! exhaustion, or a cancelled response.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::{CatConfig, Item, ItemBank};
use crate::statistics::EPS;
use crate::traits::ResponseSource;

/// Newton-Raphson iteration cap used by the adaptive loop.
pub const DEFAULT_MAX_ITER: usize = 25;

/// Newton steps smaller than this end the refit.
const CONVERGENCE_STEP: f64 = 1e-3;

/// Why an adaptive session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// `max_items` responses were recorded.
    MaxItems,
    /// The standard error reached `se_stop`.
    Precision,
    /// Every bank item has been asked.
    BankExhausted,
    /// The response source returned no outcome.
    Cancelled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StopReason::MaxItems => "max items reached",
            StopReason::Precision => "precision reached",
            StopReason::BankExhausted => "bank exhausted",
            StopReason::Cancelled => "cancelled",
        })
    }
}

/// Ability estimate and its standard error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub theta: f64,
    /// `+∞` when the likelihood carries no curvature.
    #[serde(with = "crate::statistics::serde_se")]
    pub se: f64,
}

/// Mutable record of one adaptive session, owned by its caller.
///
/// `asked` and the keys of `responses` always hold the same ids in the same
/// order: both are only written through [`CatState::record`].
#[derive(Debug, Clone, PartialEq)]
pub struct CatState {
    asked: Vec<String>,
    responses: HashMap<String, bool>,
    /// Current ability estimate.
    pub theta: f64,
    /// Standard error of `theta`.
    pub se: f64,
    /// Set once the loop reaches `Done`.
    pub stop_reason: Option<StopReason>,
}

impl CatState {
    /// Fresh state with no responses and infinite standard error.
    pub fn new(start_theta: f64) -> Self {
        Self {
            asked: Vec::new(),
            responses: HashMap::new(),
            theta: start_theta,
            se: f64::INFINITY,
            stop_reason: None,
        }
    }

    /// Record an outcome. Returns `false` and leaves the state untouched if
    /// the item was already answered.
    pub fn record(&mut self, item_id: impl Into<String>, correct: bool) -> bool {
        let item_id = item_id.into();
        if self.responses.contains_key(&item_id) {
            return false;
        }
        self.responses.insert(item_id.clone(), correct);
        self.asked.push(item_id);
        true
    }

    /// Item ids in the order they were administered.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    /// Outcome recorded for `item_id`, if any.
    pub fn response(&self, item_id: &str) -> Option<bool> {
        self.responses.get(item_id).copied()
    }

    /// `(item id, outcome)` pairs in administration order.
    pub fn responses(&self) -> impl Iterator<Item = (&str, bool)> + '_ {
        self.asked
            .iter()
            .map(move |id| (id.as_str(), self.responses[id.as_str()]))
    }

    pub fn has_asked(&self, item_id: &str) -> bool {
        self.responses.contains_key(item_id)
    }

    pub fn len(&self) -> usize {
        self.asked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.asked.is_empty()
    }
}

/// Observer hooks for an adaptive session.
pub trait SessionObserver {
    fn on_item_selected(&self, item: &Item, state: &CatState);
    fn on_response(&self, item: &Item, correct: bool);
    fn on_estimate(&self, estimate: &Estimate, answered: usize);
    fn on_session_complete(&self, state: &CatState);
}

/// No-op session observer.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_item_selected(&self, _: &Item, _: &CatState) {}
    fn on_response(&self, _: &Item, _: bool) {}
    fn on_estimate(&self, _: &Estimate, _: usize) {}
    fn on_session_complete(&self, _: &CatState) {}
}

/// 2PL adaptive testing engine over a borrowed item bank.
#[derive(Debug, Clone, Copy)]
pub struct CatEngine<'a> {
    bank: &'a ItemBank,
    config: CatConfig,
}

impl<'a> CatEngine<'a> {
    /// Build an engine, rejecting invalid stopping policy.
    pub fn new(bank: &'a ItemBank, config: CatConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self { bank, config })
    }

    pub fn config(&self) -> &CatConfig {
        &self.config
    }

    pub fn bank(&self) -> &'a ItemBank {
        self.bank
    }

    /// The unused item with maximal information at `state.theta`.
    ///
    /// Ties are broken by the lexicographically smallest item id. Returns
    /// `None` once every bank item has been asked.
    pub fn select_next(&self, state: &CatState) -> Option<&'a Item> {
        let mut best: Option<(&'a Item, f64)> = None;
        for item in self.bank.all() {
            if state.has_asked(&item.id) {
                continue;
            }
            let info = item.information(state.theta);
            let better = match best {
                None => true,
                Some((current, best_info)) => {
                    info > best_info || (info == best_info && item.id < current.id)
                }
            };
            if better {
                best = Some((item, info));
            }
        }
        best.map(|(item, _)| item)
    }

    /// Newton-Raphson MLE of ability over every recorded response.
    ///
    /// Starts from `state.theta` and refits from scratch each call. A
    /// vanishing second derivative stops refinement and keeps the current
    /// θ. The standard error comes from the second derivative of the last
    /// executed iteration, which precedes the final Newton step.
    pub fn estimate(&self, state: &CatState, max_iter: usize) -> Estimate {
        let mut theta = state.theta;
        let mut l2 = 0.0;

        for _ in 0..max_iter {
            let mut l1 = 0.0;
            l2 = 0.0;
            for (item_id, correct) in state.responses() {
                let Some(item) = self.bank.get(item_id) else {
                    tracing::debug!("response for unknown item '{item_id}' ignored");
                    continue;
                };
                let u = if correct { 1.0 } else { 0.0 };
                let p = item.p_correct(theta);
                l1 += item.a * (u - p);
                l2 -= item.a * item.a * p * (1.0 - p);
            }
            if l2.abs() < EPS {
                break;
            }
            let step = l1 / l2;
            theta -= step;
            if step.abs() < CONVERGENCE_STEP {
                break;
            }
        }

        let se = if l2 < -EPS {
            (1.0 / (-l2).max(EPS)).sqrt()
        } else {
            f64::INFINITY
        };
        Estimate { theta, se }
    }

    /// Refit ability and store the estimate in `state`.
    pub fn update_theta(&self, state: &mut CatState, max_iter: usize) -> Estimate {
        let estimate = self.estimate(state, max_iter);
        state.theta = estimate.theta;
        state.se = estimate.se;
        estimate
    }

    /// Run a full adaptive session.
    pub fn run<R>(&self, responder: &mut R) -> CatState
    where
        R: ResponseSource + ?Sized,
    {
        self.run_with_observer(responder, &NoopObserver)
    }

    /// Run a full adaptive session, reporting progress to `observer`.
    ///
    /// Selecting → Responding → Updating → CheckStop, looping back to
    /// Selecting until a stop condition holds.
    pub fn run_with_observer<R>(&self, responder: &mut R, observer: &dyn SessionObserver) -> CatState
    where
        R: ResponseSource + ?Sized,
    {
        let mut state = CatState::new(self.config.start_theta);

        let reason = loop {
            let Some(item) = self.select_next(&state) else {
                break StopReason::BankExhausted;
            };
            observer.on_item_selected(item, &state);

            let Some(correct) = responder.respond(item) else {
                break StopReason::Cancelled;
            };
            observer.on_response(item, correct);

            state.record(item.id.as_str(), correct);
            let estimate = self.update_theta(&mut state, DEFAULT_MAX_ITER);
            observer.on_estimate(&estimate, state.len());
            tracing::debug!(
                item = %item.id,
                correct,
                theta = estimate.theta,
                se = estimate.se,
                "recorded response"
            );

            if state.len() >= self.config.max_items {
                break StopReason::MaxItems;
            }
            if state.se <= self.config.se_stop {
                break StopReason::Precision;
            }
        };

        state.stop_reason = Some(reason);
        observer.on_session_complete(&state);
        state
    }
}
