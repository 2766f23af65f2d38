//! Numeric primitives for the 2PL item response model.
//!
//! The response model is `P(correct | θ) = logistic(a·(θ − b))` and the
//! Fisher information of a 2PL item is `a²·p·(1 − p)`.

/// Guard used wherever a denominator or curvature could vanish.
pub const EPS: f64 = 1e-8;

/// Logistic arguments are clipped to this magnitude before exponentiation.
const LOGIT_CLIP: f64 = 500.0;

/// Overflow-safe logistic function.
pub fn logistic(x: f64) -> f64 {
    let x = x.clamp(-LOGIT_CLIP, LOGIT_CLIP);
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let exp_x = x.exp();
        exp_x / (1.0 + exp_x)
    }
}

/// Probability of a correct response under the 2PL model.
pub fn p_correct_2pl(a: f64, b: f64, theta: f64) -> f64 {
    logistic(a * (theta - b))
}

/// Fisher information of a 2PL item at `theta`.
pub fn fisher_information_2pl(a: f64, b: f64, theta: f64) -> f64 {
    let p = p_correct_2pl(a, b, theta);
    a * a * p * (1.0 - p)
}

/// Round to three decimals, the precision used by dashboards and item logs.
pub fn round3(x: f64) -> f64 {
    if x.is_finite() {
        (x * 1000.0).round() / 1000.0
    } else {
        x
    }
}

/// Serde adapter for standard errors, which may be `+∞`.
///
/// JSON has no infinity, so non-finite values are written as `null` and
/// `null` reads back as `+∞`.
pub mod serde_se {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}
