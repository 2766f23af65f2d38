//! The `dke init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create dke.toml
    if std::path::Path::new("dke.toml").exists() {
        println!("dke.toml already exists, skipping.");
    } else {
        std::fs::write("dke.toml", SAMPLE_CONFIG)?;
        println!("Created dke.toml");
    }

    // Create example item bank
    std::fs::create_dir_all("banks")?;
    let example_path = std::path::Path::new("banks/example.toml");
    if example_path.exists() {
        println!("banks/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_BANK)?;
        println!("Created banks/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: dke validate --bank banks/example.toml");
    println!("  2. Run: dke run --bank banks/example.toml --interactive");
    println!("  3. Or simulate a learner: dke run --bank banks/example.toml --simulate-theta 0.5");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# dke configuration
output_dir = "./dke-results"

[cat]
max_items = 10
se_stop = 0.35
start_theta = 0.0

[bkt]
p_init = 0.2
p_transit = 0.2
p_slip = 0.1
p_guess = 0.2

[scorer]
type = "keyword"

# Grade free-text answers with a remote service instead:
# [scorer]
# type = "http"
# base_url = "http://localhost:8080"
# api_key = "${DKE_SCORER_API_KEY}"
# model = "rubric-grader"
"#;

const EXAMPLE_BANK: &str = r#"[bank]
id = "example"
name = "Example Bank"
description = "A small algebra, probability, and functions bank to get started"

[[items]]
id = "alg-1"
skill = "algebra"
a = 1.1
b = -1.2
text = "Solve for x: x + 3 = 5"
choices = ["1", "2", "3", "8"]
correct_index = 1

[[items]]
id = "alg-2"
skill = "algebra"
a = 1.4
b = 0.1
text = "Solve for x: 3x - 7 = 11"
choices = ["4", "6", "18", "-6"]
correct_index = 1

[[items]]
id = "alg-3"
skill = "algebra"
a = 1.7
b = 1.3
text = "Which value of x satisfies x^2 - 5x + 6 = 0 and x > 2?"
choices = ["1", "2", "3", "6"]
correct_index = 2

[[items]]
id = "prob-1"
skill = "probability"
a = 0.9
b = -0.8
text = "A fair coin is flipped once. What is P(heads)?"
choices = ["0", "1/4", "1/2", "1"]
correct_index = 2

[[items]]
id = "prob-2"
skill = "probability"
a = 1.3
b = 0.4
text = "Two fair dice are rolled. What is P(sum = 7)?"
choices = ["1/6", "1/12", "7/36", "1/36"]
correct_index = 0

[[items]]
id = "prob-3"
skill = "probability"
a = 1.6
b = 1.5
text = "X ~ Binomial(4, 1/2). What is E[X]?"
choices = ["1", "2", "4", "1/2"]
correct_index = 1

[[items]]
id = "fn-1"
skill = "functions"
a = 1.0
b = -1.5
text = "If f(x) = 2x, what is f(3)?"
choices = ["5", "6", "8", "9"]
correct_index = 1

[[items]]
id = "fn-2"
skill = "functions"
a = 1.2
b = -0.2
text = "If f(x) = x + 1 and g(x) = 2x, what is f(g(2))?"
choices = ["5", "6", "3", "4"]
correct_index = 0

[[items]]
id = "fn-3"
skill = "functions"
a = 1.8
b = 1.0
text = "What is the inverse of f(x) = 3x - 2?"
choices = ["(x + 2) / 3", "3x + 2", "(x - 2) / 3", "1 / (3x - 2)"]
correct_index = 0
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use dke_core::parser::{parse_item_bank_str, validate_item_bank};
    use std::path::Path;

    #[test]
    fn templates_are_valid() {
        let file = parse_item_bank_str(EXAMPLE_BANK, Path::new("example.toml")).unwrap();
        assert_eq!(file.items.len(), 9);
        assert!(validate_item_bank(&file).is_empty());
        assert_eq!(file.to_bank().unwrap().skills().len(), 3);

        let config: dke_scorers::DkeConfig = toml::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.cat.max_items, 10);
    }
}
