//! TOML item bank parser.
//!
//! Loads item banks from TOML files and directories, and validates them.
//! Parsing is lenient so that [`validate_item_bank`] can report every
//! problem at once; building an [`ItemBank`] is strict.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{Item, ItemBank};
use crate::report::BankSummary;

/// Difficulties beyond this magnitude are almost never informative.
const DIFFICULTY_RANGE: f64 = 4.0;

/// Intermediate TOML structure for parsing item bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    bank: TomlBankHeader,
    #[serde(default)]
    items: Vec<TomlItem>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TomlItem {
    id: String,
    skill: String,
    a: f64,
    b: f64,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    choices: Option<Vec<String>>,
    #[serde(default)]
    correct_index: Option<usize>,
}

/// A parsed, not yet validated, item bank file.
#[derive(Debug, Clone)]
pub struct ItemBankFile {
    pub id: String,
    pub name: String,
    pub description: String,
    pub items: Vec<Item>,
}

impl ItemBankFile {
    /// Build a validated bank. Fails on the first invalid or duplicate item.
    pub fn to_bank(&self) -> Result<ItemBank> {
        ItemBank::try_from(self.items.clone())
            .with_context(|| format!("invalid item bank '{}'", self.id))
    }

    pub fn summary(&self, bank: &ItemBank) -> BankSummary {
        BankSummary::new(&self.id, &self.name, bank)
    }
}

/// Parse a single TOML file into an `ItemBankFile`.
pub fn parse_item_bank(path: &Path) -> Result<ItemBankFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read item bank file: {}", path.display()))?;

    parse_item_bank_str(&content, path)
}

/// Parse a TOML string into an `ItemBankFile` (useful for testing).
pub fn parse_item_bank_str(content: &str, source_path: &Path) -> Result<ItemBankFile> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let items = parsed
        .items
        .into_iter()
        .map(|it| Item {
            id: it.id,
            skill: it.skill,
            a: it.a,
            b: it.b,
            text: it.text.unwrap_or_default(),
            choices: it.choices,
            correct_index: it.correct_index,
        })
        .collect();

    Ok(ItemBankFile {
        id: parsed.bank.id,
        name: parsed.bank.name,
        description: parsed.bank.description,
        items,
    })
}

/// Recursively load all `.toml` item bank files from a directory.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<ItemBankFile>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_item_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(banks)
}

/// Load a bank file, or merge every bank file under a directory.
///
/// Item ids must be unique across the merged files.
pub fn load_item_bank(path: &Path) -> Result<(BankSummary, ItemBank)> {
    if !path.is_dir() {
        let file = parse_item_bank(path)?;
        let bank = file.to_bank()?;
        return Ok((file.summary(&bank), bank));
    }

    let files = load_bank_directory(path)?;
    if files.is_empty() {
        anyhow::bail!("no item bank files found in {}", path.display());
    }
    let mut bank = ItemBank::new();
    for file in &files {
        for item in &file.items {
            bank.add(item.clone())
                .with_context(|| format!("invalid item in bank '{}'", file.id))?;
        }
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let ids: Vec<&str> = files.iter().map(|f| f.id.as_str()).collect();
    Ok((BankSummary::new(ids.join("+"), name, &bank), bank))
}

/// A warning from item bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The item ID (if applicable).
    pub item_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate an item bank file for common issues.
pub fn validate_item_bank(file: &ItemBankFile) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let warn = |id: &str, message: String| ValidationWarning {
        item_id: Some(id.to_string()),
        message,
    };

    let mut seen_ids = HashSet::new();
    for item in &file.items {
        if !seen_ids.insert(&item.id) {
            warnings.push(warn(&item.id, format!("duplicate item ID: {}", item.id)));
        }
    }

    for item in &file.items {
        if item.id.trim().is_empty() {
            warnings.push(ValidationWarning {
                item_id: None,
                message: format!("item for skill '{}' has an empty id", item.skill),
            });
        }
        if !(item.a.is_finite() && item.a > 0.0) {
            warnings.push(warn(
                &item.id,
                format!("discrimination must be positive, got a={}", item.a),
            ));
        }
        if !item.b.is_finite() {
            warnings.push(warn(&item.id, format!("difficulty is not finite: b={}", item.b)));
        } else if item.b.abs() > DIFFICULTY_RANGE {
            warnings.push(warn(
                &item.id,
                format!("difficulty b={} is outside [-4, 4]", item.b),
            ));
        }
        match (&item.choices, item.correct_index) {
            (Some(choices), Some(idx)) if idx >= choices.len() => {
                warnings.push(warn(
                    &item.id,
                    format!("correct_index {idx} is out of range for {} choices", choices.len()),
                ));
            }
            (None, Some(_)) => {
                warnings.push(warn(&item.id, "correct_index given without choices".into()));
            }
            _ => {}
        }
        if item.text.trim().is_empty() {
            warnings.push(warn(&item.id, "text is empty".into()));
        }
    }

    let mut per_skill: HashMap<&str, usize> = HashMap::new();
    for item in &file.items {
        *per_skill.entry(item.skill.as_str()).or_default() += 1;
    }
    let mut thin: Vec<(&str, usize)> = per_skill.into_iter().filter(|&(_, n)| n < 2).collect();
    thin.sort();
    for (skill, n) in thin {
        warnings.push(ValidationWarning {
            item_id: None,
            message: format!("skill '{skill}' has only {n} item; mastery will rest on one response"),
        });
    }

    if file.items.is_empty() {
        warnings.push(ValidationWarning {
            item_id: None,
            message: "bank has no items".into(),
        });
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[bank]
id = "math-basics"
name = "Math Basics"
description = "Algebra and probability warm-up"

[[items]]
id = "ALG-1"
skill = "algebra"
a = 1.2
b = -0.5
text = "Solve 2x + 3 = 7."
choices = ["x = 1", "x = 2", "x = 3", "x = 4"]
correct_index = 1

[[items]]
id = "ALG-2"
skill = "algebra"
a = 0.9
b = 0.4
text = "Factor x^2 - 9."

[[items]]
id = "PRB-1"
skill = "probability"
a = 1.5
b = 0.0
text = "P(heads) for a fair coin?"

[[items]]
id = "PRB-2"
skill = "probability"
a = 1.1
b = 1.2
text = "P(two sixes) with two dice?"
"#;

    #[test]
    fn parse_valid_toml() {
        let file = parse_item_bank_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(file.id, "math-basics");
        assert_eq!(file.name, "Math Basics");
        assert_eq!(file.items.len(), 4);
        assert_eq!(file.items[0].correct_index, Some(1));
        assert_eq!(file.items[1].choices, None);

        let bank = file.to_bank().unwrap();
        assert_eq!(bank.skills(), vec!["algebra", "probability"]);
        assert!(validate_item_bank(&file).is_empty());
    }

    #[test]
    fn parse_missing_optional_fields() {
        let toml = r#"
[bank]
id = "minimal"
name = "Minimal"

[[items]]
id = "I1"
skill = "s"
a = 1.0
b = 0.0
"#;
        let file = parse_item_bank_str(toml, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(file.description, "");
        assert_eq!(file.items[0].text, "");
        let warnings = validate_item_bank(&file);
        assert!(warnings.iter().any(|w| w.message.contains("text is empty")));
        assert!(warnings.iter().any(|w| w.message.contains("skill 's' has only 1 item")));
    }

    #[test]
    fn validate_flags_bad_items() {
        let toml = r#"
[bank]
id = "bad"
name = "Bad"

[[items]]
id = "same"
skill = "s"
a = 0.0
b = 5.5
text = "q"

[[items]]
id = "same"
skill = "s"
a = 1.0
b = 0.0
text = "q"
choices = ["a", "b"]
correct_index = 2
"#;
        let file = parse_item_bank_str(toml, &PathBuf::from("test.toml")).unwrap();
        let warnings = validate_item_bank(&file);
        let has = |s: &str| warnings.iter().any(|w| w.message.contains(s));
        assert!(has("duplicate item ID"));
        assert!(has("discrimination must be positive"));
        assert!(has("outside [-4, 4]"));
        assert!(has("correct_index 2 is out of range"));

        assert!(file.to_bank().is_err());
    }

    #[test]
    fn to_bank_rejects_out_of_range_key() {
        let toml = r#"
[bank]
id = "keys"
name = "Keys"

[[items]]
id = "Q1"
skill = "s"
a = 1.0
b = 0.0
text = "q"
choices = ["a", "b"]
correct_index = 2

[[items]]
id = "Q2"
skill = "s"
a = 1.0
b = 0.0
text = "q"
correct_index = 0
"#;
        let file = parse_item_bank_str(toml, &PathBuf::from("keys.toml")).unwrap();
        let warnings = validate_item_bank(&file);
        assert!(warnings.iter().any(|w| w.message.contains("correct_index 2 is out of range")));
        assert!(warnings.iter().any(|w| w.message.contains("without choices")));

        let err = format!("{:#}", file.to_bank().unwrap_err());
        assert!(err.contains("item 'Q1' has correct_index 2 but 2 choices"), "got {err}");
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        let result = parse_item_bank_str(bad, &PathBuf::from("bad.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn load_directory_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("broken.toml"), "[bank").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let banks = load_bank_directory(dir.path()).unwrap();
        assert_eq!(banks.len(), 1);
        assert_eq!(banks[0].id, "math-basics");
    }

    #[test]
    fn load_item_bank_merges_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.toml"), VALID_TOML).unwrap();
        let nested = dir.path().join("extra");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(
            nested.join("b.toml"),
            r#"
[bank]
id = "extra"
name = "Extra"

[[items]]
id = "FN-1"
skill = "functions"
a = 1.0
b = 0.0
"#,
        )
        .unwrap();

        let (summary, bank) = load_item_bank(dir.path()).unwrap();
        assert_eq!(bank.len(), 5);
        assert_eq!(summary.item_count, 5);
        assert_eq!(summary.id, "math-basics+extra");
        assert!(summary.skills.contains(&"functions".to_string()));
    }

    #[test]
    fn load_item_bank_rejects_cross_file_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("b.toml"), VALID_TOML).unwrap();
        let err = load_item_bank(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("duplicate item id"));
    }
}
