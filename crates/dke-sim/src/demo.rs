//! Reproducible demo item bank.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use dke_core::error::ValidationError;
use dke_core::model::{Item, ItemBank};

/// Skills covered by the demo bank, six items each.
pub const DEMO_SKILLS: [&str; 3] = ["algebra", "probability", "functions"];

const ITEMS_PER_SKILL: usize = 6;
const CHOICES: [&str; 4] = ["A", "B", "C", "D"];

/// Build the 18-item demo bank (`I1`..`I18`) from `seed`.
///
/// Discrimination is drawn from U(0.7, 2.0) and difficulty from U(-2, 2),
/// both rounded to two decimals.
pub fn demo_bank(seed: u64) -> Result<ItemBank, ValidationError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bank = ItemBank::new();
    let mut next_id = 1;

    for skill in DEMO_SKILLS {
        for _ in 0..ITEMS_PER_SKILL {
            let a = round2(rng.gen_range(0.7..=2.0));
            let b = round2(rng.gen_range(-2.0..=2.0));
            let key = rng.gen_range(0..CHOICES.len());
            let item = Item::new(format!("I{next_id}"), skill, a, b)?
                .with_text(format!("[{skill}] Solve sub-problem with parameters a={a}, b={b}"))
                .with_choices(CHOICES.iter().map(|c| c.to_string()).collect(), key);
            bank.add(item)?;
            next_id += 1;
        }
    }

    Ok(bank)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
