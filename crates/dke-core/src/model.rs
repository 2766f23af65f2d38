//! Core data model types for dke.
//!
//! Items and the item bank are built once and read-only for the duration of
//! a session. `CatConfig` and `BktParams` are session-independent policy.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::statistics::{fisher_information_2pl, p_correct_2pl};

/// A single calibrated 2PL test item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier within a bank.
    pub id: String,
    /// Skill (knowledge component) this item measures.
    pub skill: String,
    /// Discrimination, strictly positive.
    pub a: f64,
    /// Difficulty on the ability scale.
    pub b: f64,
    /// Question stem shown to the learner.
    #[serde(default)]
    pub text: String,
    /// Answer options for multiple-choice items.
    #[serde(default)]
    pub choices: Option<Vec<String>>,
    /// Index into `choices` of the keyed answer.
    #[serde(default)]
    pub correct_index: Option<usize>,
}

impl Item {
    /// Create a validated item with no stem or choices.
    pub fn new(
        id: impl Into<String>,
        skill: impl Into<String>,
        a: f64,
        b: f64,
    ) -> Result<Self, ValidationError> {
        let item = Self {
            id: id.into(),
            skill: skill.into(),
            a,
            b,
            text: String::new(),
            choices: None,
            correct_index: None,
        };
        item.validate()?;
        Ok(item)
    }

    /// Attach a question stem.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Attach multiple-choice options and the keyed answer.
    ///
    /// The key is checked by [`Item::validate`] when the item enters a bank.
    pub fn with_choices(mut self, choices: Vec<String>, correct_index: usize) -> Self {
        self.choices = Some(choices);
        self.correct_index = Some(correct_index);
        self
    }

    /// Check the invariants every bank item must satisfy.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyItemId);
        }
        if !(self.a.is_finite() && self.a > 0.0) {
            return Err(ValidationError::NonPositiveDiscrimination {
                id: self.id.clone(),
                a: self.a,
            });
        }
        if !self.b.is_finite() {
            return Err(ValidationError::NonFiniteDifficulty {
                id: self.id.clone(),
                b: self.b,
            });
        }
        if let Some(index) = self.correct_index {
            let choices = self.choices.as_ref().map_or(0, Vec::len);
            if index >= choices {
                return Err(ValidationError::InvalidCorrectIndex {
                    id: self.id.clone(),
                    index,
                    choices,
                });
            }
        }
        Ok(())
    }

    /// Probability of a correct response at ability `theta`.
    pub fn p_correct(&self, theta: f64) -> f64 {
        p_correct_2pl(self.a, self.b, theta)
    }

    /// Fisher information contributed by this item at ability `theta`.
    pub fn information(&self, theta: f64) -> f64 {
        fisher_information_2pl(self.a, self.b, theta)
    }
}

/// Keyed repository of items, iterated in insertion order.
///
/// Re-adding an existing id through [`ItemBank::add`] is rejected;
/// [`ItemBank::upsert`] is the explicit overwrite path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Item>", into = "Vec<Item>")]
pub struct ItemBank {
    items: Vec<Item>,
    index: HashMap<String, usize>,
}

impl ItemBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new item. Fails if the item is invalid or its id is taken.
    pub fn add(&mut self, item: Item) -> Result<(), ValidationError> {
        item.validate()?;
        if self.index.contains_key(&item.id) {
            return Err(ValidationError::DuplicateItem(item.id));
        }
        self.index.insert(item.id.clone(), self.items.len());
        self.items.push(item);
        Ok(())
    }

    /// Insert or replace an item, keeping the original position on replace.
    ///
    /// Returns the replaced item, if any.
    pub fn upsert(&mut self, item: Item) -> Result<Option<Item>, ValidationError> {
        item.validate()?;
        match self.index.get(&item.id) {
            Some(&pos) => Ok(Some(std::mem::replace(&mut self.items[pos], item))),
            None => {
                self.index.insert(item.id.clone(), self.items.len());
                self.items.push(item);
                Ok(None)
            }
        }
    }

    /// Look up an item by id.
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All items tagged with `skill`, in bank order.
    pub fn by_skill(&self, skill: &str) -> Vec<&Item> {
        self.items.iter().filter(|it| it.skill == skill).collect()
    }

    /// Every item, in bank order.
    pub fn all(&self) -> &[Item] {
        &self.items
    }

    /// Distinct skills in first-seen order.
    pub fn skills(&self) -> Vec<String> {
        let mut skills: Vec<String> = Vec::new();
        for item in &self.items {
            if !skills.contains(&item.skill) {
                skills.push(item.skill.clone());
            }
        }
        skills
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl TryFrom<Vec<Item>> for ItemBank {
    type Error = ValidationError;

    fn try_from(items: Vec<Item>) -> Result<Self, Self::Error> {
        let mut bank = ItemBank::new();
        for item in items {
            bank.add(item)?;
        }
        Ok(bank)
    }
}

impl From<ItemBank> for Vec<Item> {
    fn from(bank: ItemBank) -> Self {
        bank.items
    }
}

/// Stopping policy for an adaptive session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CatConfig {
    /// Hard cap on the number of items administered.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Stop once the standard error of θ falls to or below this value.
    /// Zero means only `max_items` or bank exhaustion ends the session.
    #[serde(default = "default_se_stop")]
    pub se_stop: f64,
    /// Ability estimate before any response.
    #[serde(default)]
    pub start_theta: f64,
}

fn default_max_items() -> usize {
    10
}

fn default_se_stop() -> f64 {
    0.35
}

impl Default for CatConfig {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
            se_stop: default_se_stop(),
            start_theta: 0.0,
        }
    }
}

impl CatConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_items == 0 {
            return Err(ValidationError::NonPositiveMaxItems);
        }
        // Zero disables the precision stop.
        if !self.se_stop.is_finite() || self.se_stop < 0.0 {
            return Err(ValidationError::InvalidSeStop(self.se_stop));
        }
        if !self.start_theta.is_finite() {
            return Err(ValidationError::NonFiniteStartTheta(self.start_theta));
        }
        Ok(())
    }
}

/// Bayesian Knowledge Tracing parameters for one skill (or shared).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BktParams {
    /// Prior probability of mastery.
    #[serde(default = "default_p_init")]
    pub p_init: f64,
    /// Probability of learning between opportunities.
    #[serde(default = "default_p_transit")]
    pub p_transit: f64,
    /// Probability of answering wrong despite mastery.
    #[serde(default = "default_p_slip")]
    pub p_slip: f64,
    /// Probability of answering right without mastery.
    #[serde(default = "default_p_guess")]
    pub p_guess: f64,
}

fn default_p_init() -> f64 {
    0.2
}

fn default_p_transit() -> f64 {
    0.2
}

fn default_p_slip() -> f64 {
    0.1
}

fn default_p_guess() -> f64 {
    0.2
}

impl Default for BktParams {
    fn default() -> Self {
        Self {
            p_init: default_p_init(),
            p_transit: default_p_transit(),
            p_slip: default_p_slip(),
            p_guess: default_p_guess(),
        }
    }
}

impl BktParams {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("p_init", self.p_init),
            ("p_transit", self.p_transit),
            ("p_slip", self.p_slip),
            ("p_guess", self.p_guess),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ValidationError::ProbabilityOutOfRange { name, value });
            }
        }
        Ok(())
    }
}
