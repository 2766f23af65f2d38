//! Construction-time validation errors.
//!
//! Only genuinely invalid configuration is reported here. Numeric
//! degeneracy inside the adaptive loop or the knowledge tracer is handled
//! by epsilon guards and never surfaces as an error.

use thiserror::Error;

/// Errors raised when building items, banks, configs, or pipelines.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// `max_items` must be at least 1.
    #[error("max_items must be positive")]
    NonPositiveMaxItems,

    /// The standard-error stop threshold must be finite and non-negative.
    #[error("se_stop must be finite and non-negative, got {0}")]
    InvalidSeStop(f64),

    /// The starting ability must be finite.
    #[error("start_theta must be finite, got {0}")]
    NonFiniteStartTheta(f64),

    /// Item ids may not be empty.
    #[error("item id must not be empty")]
    EmptyItemId,

    /// Discrimination `a` must be strictly positive and finite.
    #[error("item '{id}' has non-positive discrimination a={a}")]
    NonPositiveDiscrimination { id: String, a: f64 },

    /// Difficulty `b` must be finite.
    #[error("item '{id}' has non-finite difficulty b={b}")]
    NonFiniteDifficulty { id: String, b: f64 },

    /// The keyed answer must index into the item's choices.
    #[error("item '{id}' has correct_index {index} but {choices} choices")]
    InvalidCorrectIndex {
        id: String,
        index: usize,
        choices: usize,
    },

    /// An item with this id is already in the bank.
    #[error("duplicate item id: {0}")]
    DuplicateItem(String),

    /// A BKT probability lies outside `[0, 1]`.
    #[error("{name} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },

    /// A skill referenced by the bank or an update is not tracked.
    #[error("skill '{0}' is not tracked")]
    UnknownSkill(String),

    /// Likert confidence must be in `1..=5`.
    #[error("confidence for '{skill}' must be within 1..=5, got {value}")]
    LikertOutOfRange { skill: String, value: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = ValidationError::NonPositiveDiscrimination {
            id: "I1".into(),
            a: -0.5,
        };
        assert_eq!(err.to_string(), "item 'I1' has non-positive discrimination a=-0.5");

        let err = ValidationError::ProbabilityOutOfRange {
            name: "p_slip",
            value: 1.5,
        };
        assert!(err.to_string().contains("p_slip"));
    }
}
