//! The `dke validate` command.

use std::path::PathBuf;

use anyhow::Result;

use dke_core::parser;

pub fn execute(bank_path: PathBuf) -> Result<()> {
    let files = if bank_path.is_dir() {
        parser::load_bank_directory(&bank_path)?
    } else {
        vec![parser::parse_item_bank(&bank_path)?]
    };
    anyhow::ensure!(
        !files.is_empty(),
        "no item bank files found in {}",
        bank_path.display()
    );

    let mut total_warnings = 0;

    for file in &files {
        let mut skills: Vec<&str> = Vec::new();
        for item in &file.items {
            if !skills.contains(&item.skill.as_str()) {
                skills.push(&item.skill);
            }
        }
        println!(
            "Item bank: {} ({} items, {} skills: {})",
            file.name,
            file.items.len(),
            skills.len(),
            skills.join(", ")
        );

        let warnings = parser::validate_item_bank(file);
        for w in &warnings {
            let prefix = w
                .item_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All item banks valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
