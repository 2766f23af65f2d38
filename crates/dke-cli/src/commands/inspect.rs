//! The `dke inspect` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use dke_core::model::Item;
use dke_core::parser::load_item_bank;

pub fn execute(bank_path: PathBuf, theta: f64) -> Result<()> {
    anyhow::ensure!(theta.is_finite(), "theta must be finite");

    let (summary, bank) = load_item_bank(&bank_path)?;
    let ranked = rank_by_information(bank.all(), theta);

    println!(
        "Item bank: {} ({} items) at θ = {:+.2}",
        summary.name, summary.item_count, theta
    );

    let mut table = Table::new();
    table.set_header(vec!["Rank", "Item", "Skill", "a", "b", "P(correct)", "Information"]);
    for (rank, item) in ranked.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&item.id),
            Cell::new(&item.skill),
            Cell::new(format!("{:.2}", item.a)),
            Cell::new(format!("{:+.2}", item.b)),
            Cell::new(format!("{:.3}", item.p_correct(theta))),
            Cell::new(format!("{:.4}", item.information(theta))),
        ]);
    }
    println!("{table}");

    Ok(())
}

/// Items by descending information at `theta`, ties by id.
fn rank_by_information(items: &[Item], theta: f64) -> Vec<&Item> {
    let mut ranked: Vec<&Item> = items.iter().collect();
    ranked.sort_by(|x, y| {
        y.information(theta)
            .total_cmp(&x.information(theta))
            .then_with(|| x.id.cmp(&y.id))
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranking_matches_adaptive_selection_order() {
        let items = vec![
            Item::new("I1", "algebra", 0.8, 0.0).unwrap(),
            Item::new("I2", "algebra", 1.2, 0.3).unwrap(),
            Item::new("I3", "algebra", 1.2, 0.3).unwrap(),
            Item::new("I4", "algebra", 2.0, 3.0).unwrap(),
        ];
        let ids: Vec<&str> = rank_by_information(&items, 0.0)
            .iter()
            .map(|it| it.id.as_str())
            .collect();
        assert_eq!(ids, vec!["I2", "I3", "I1", "I4"]);
    }
}
