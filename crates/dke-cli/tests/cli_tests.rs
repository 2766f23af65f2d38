//! CLI integration tests using assert_cmd.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn dke() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("dke").unwrap()
}

fn banks_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../banks")
}

/// Files in `dir` with the given extension.
fn outputs(dir: &Path, ext: &str) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|x| x == ext))
        .collect()
}

#[test]
fn validate_example_bank() {
    dke()
        .arg("validate")
        .arg("--bank")
        .arg(banks_dir().join("example.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Example Bank (9 items, 3 skills: algebra, probability, functions)",
        ))
        .stdout(predicate::str::contains("All item banks valid"));
}

#[test]
fn validate_directory() {
    dke()
        .arg("validate")
        .arg("--bank")
        .arg(banks_dir())
        .assert()
        .success()
        .stdout(predicate::str::contains("Example Bank"))
        .stdout(predicate::str::contains("Descriptive Statistics"));
}

#[test]
fn validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("thin.toml");
    std::fs::write(
        &path,
        r#"
[bank]
id = "thin"
name = "Thin"

[[items]]
id = "q1"
skill = "algebra"
a = 1.0
b = 5.5
text = "Too hard"
"#,
    )
    .unwrap();

    dke()
        .arg("validate")
        .arg("--bank")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("[q1] WARNING: difficulty b=5.5"))
        .stdout(predicate::str::contains("skill 'algebra' has only 1 item"))
        .stdout(predicate::str::contains("2 warning(s) found"));
}

#[test]
fn validate_nonexistent_file() {
    dke()
        .arg("validate")
        .arg("--bank")
        .arg("nonexistent.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    dke()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created dke.toml"))
        .stdout(predicate::str::contains("Created banks/example.toml"));

    assert!(dir.path().join("dke.toml").exists());

    dke()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--bank")
        .arg("banks/example.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("All item banks valid"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    // First init
    dke().current_dir(dir.path()).arg("init").assert().success();

    // Second init should skip
    dke()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn run_simulated_writes_json_report() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("results");

    dke()
        .current_dir(dir.path())
        .arg("run")
        .arg("--bank")
        .arg(banks_dir().join("example.toml"))
        .args(["--simulate-theta", "-0.5", "--seed", "3", "--learner", "ada"])
        .args(["--max-items", "5", "--se-stop", "0"])
        .args(["--self-assess", "algebra=2", "--format", "json"])
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("θ ="))
        .stdout(predicate::str::contains("Recommendations:"))
        .stdout(predicate::str::contains(
            "Confidence low for algebra: add reflective quiz + hints",
        ))
        .stderr(predicate::str::contains("Session complete: 5 items (max items reached)"));

    let reports = outputs(&out, "json");
    assert_eq!(reports.len(), 1);
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&reports[0]).unwrap()).unwrap();
    assert_eq!(report["learner"], "ada");
    assert_eq!(report["bank"]["id"], "example");
    assert_eq!(report["config"]["cat"]["max_items"], 5);
    assert_eq!(report["config"]["grader"], "keyword");
    assert_eq!(report["result"]["item_log"].as_array().unwrap().len(), 5);
    assert_eq!(report["result"]["stop_reason"], "max_items");
    assert_eq!(report["result"]["mastery"].as_object().unwrap().len(), 3);
}

#[test]
fn run_demo_bank_with_html() {
    let dir = TempDir::new().unwrap();

    dke()
        .current_dir(dir.path())
        .args(["run", "--simulate-theta", "0.2", "--format", "all", "--output", "out"])
        .assert()
        .success()
        .stdout(predicate::str::contains("algebra"))
        .stdout(predicate::str::contains("functions"));

    let out = dir.path().join("out");
    assert_eq!(outputs(&out, "json").len(), 1);
    let html = outputs(&out, "html");
    assert_eq!(html.len(), 1);
    let content = std::fs::read_to_string(&html[0]).unwrap();
    assert!(content.contains("Demo bank"));
}

#[test]
fn run_grades_free_text() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("answer.txt"),
        "I define the model and apply it to an example. However, there are limitations. \
         Therefore the parameter choice matters.",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("reference.txt"),
        "This module introduces the theory of functions and models. \
         We define parameters and discuss assumptions, limitations, and implications. \
         Examples show how to apply the model.",
    )
    .unwrap();

    dke()
        .current_dir(dir.path())
        .args(["run", "--simulate-theta", "0.2", "--output", "out"])
        .args(["--response-file", "answer.txt", "--reference-file", "reference.txt"])
        .args(["--concept-edges", "variable>function,equation>solution"])
        .args(["--required-edges", "variable>function,random variable>expectation,equation>solution"])
        .assert()
        .success()
        .stdout(predicate::str::contains("concept map 66.7%"));

    let reports = outputs(&dir.path().join("out"), "json");
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&reports[0]).unwrap()).unwrap();
    assert_eq!(report["result"]["dashboard"]["criteria"]["context_relevance"], 1.0);
    assert_eq!(report["result"]["dashboard"]["criteria"]["logical_consistency"], 0.0);
}

#[test]
fn run_rejects_unknown_format() {
    let dir = TempDir::new().unwrap();

    dke()
        .current_dir(dir.path())
        .args(["run", "--simulate-theta", "0", "--format", "sarif"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown format 'sarif'"));
}

#[test]
fn run_rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("dke.toml"), "[cat]\nmax_items = 0\n").unwrap();

    dke()
        .current_dir(dir.path())
        .args(["run", "--simulate-theta", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid [cat] section"));
}

#[test]
fn run_rejects_infinite_se_stop() {
    let dir = TempDir::new().unwrap();

    dke()
        .current_dir(dir.path())
        .args(["run", "--simulate-theta", "0", "--se-stop", "inf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("se_stop must be finite"));
    assert!(!dir.path().join("dke-results").exists());
}

#[test]
fn run_rejects_out_of_range_answer_key() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(
        &path,
        r#"
[bank]
id = "broken"
name = "Broken"

[[items]]
id = "q1"
skill = "algebra"
a = 1.0
b = 0.0
text = "Pick one"
choices = ["A", "B"]
correct_index = 7
"#,
    )
    .unwrap();

    dke()
        .current_dir(dir.path())
        .args(["run", "--simulate-theta", "0", "--bank"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("correct_index 7 but 2 choices"));
}

#[test]
fn run_interactive_reads_stdin() {
    let dir = TempDir::new().unwrap();

    // Two answers, then end of input cancels the session.
    dke()
        .current_dir(dir.path())
        .arg("run")
        .arg("--bank")
        .arg(banks_dir().join("example.toml"))
        .args(["--interactive", "--output", "out"])
        .write_stdin("A\nB\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Q1 ["))
        .stderr(predicate::str::contains("Session complete: 2 items (cancelled)"));
}

#[test]
fn inspect_ranks_items() {
    dke()
        .arg("inspect")
        .arg("--bank")
        .arg(banks_dir().join("example.toml"))
        .args(["--theta", "-1.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Example Bank (9 items) at θ = -1.00"))
        .stdout(predicate::str::contains("alg-1"));
}

#[test]
fn compare_reports() {
    let dir = TempDir::new().unwrap();

    let baseline_path = dir.path().join("baseline.json");
    let current_path = dir.path().join("current.json");
    std::fs::write(&baseline_path, make_test_report(0.4, 0.85, 0.3)).unwrap();
    std::fs::write(&current_path, make_test_report(0.1, 0.40, 0.7)).unwrap();

    dke()
        .arg("compare")
        .arg("--baseline")
        .arg(&baseline_path)
        .arg("--current")
        .arg(&current_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 regressions, 1 improvements"))
        .stdout(predicate::str::contains("algebra 85.0% -> 40.0% (-45.0%)"));

    dke()
        .arg("compare")
        .arg("--baseline")
        .arg(&baseline_path)
        .arg("--current")
        .arg(&current_path)
        .args(["--format", "markdown"])
        .assert()
        .success()
        .stdout(predicate::str::contains("### Regressions"));

    dke()
        .arg("compare")
        .arg("--baseline")
        .arg(&baseline_path)
        .arg("--current")
        .arg(&current_path)
        .arg("--fail-on-regression")
        .assert()
        .code(1);
}

#[test]
fn compare_nonexistent_report() {
    dke()
        .arg("compare")
        .arg("--baseline")
        .arg("no_such_file.json")
        .arg("--current")
        .arg("also_no_file.json")
        .assert()
        .failure();
}

#[test]
fn help_output() {
    dke()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Adaptive knowledge evaluation"));
}

#[test]
fn version_output() {
    dke()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dke"));
}

/// Create a minimal valid JSON report for testing.
fn make_test_report(theta: f64, algebra: f64, probability: f64) -> String {
    format!(
        r#"{{
    "id": "00000000-0000-0000-0000-000000000000",
    "created_at": "2025-01-01T00:00:00Z",
    "learner": "ada",
    "bank": {{ "id": "test", "name": "Test", "item_count": 4, "skills": ["algebra", "probability"] }},
    "config": {{
        "cat": {{ "max_items": 4, "se_stop": 0.35, "start_theta": 0.0 }},
        "bkt": {{ "p_init": 0.2, "p_transit": 0.2, "p_slip": 0.1, "p_guess": 0.2 }},
        "grader": "keyword"
    }},
    "result": {{
        "theta": {theta},
        "theta_se": null,
        "stop_reason": "max_items",
        "item_log": [],
        "mastery": {{ "algebra": {algebra}, "probability": {probability} }},
        "criteria": {{}},
        "overall": 0.5,
        "self_assessment": {{}},
        "concept_map_score": 0.5,
        "dashboard": {{
            "ability_estimate": {theta},
            "ability_se": null,
            "mastery": {{ "algebra": {algebra}, "probability": {probability} }},
            "criteria": {{}},
            "overall": 0.5,
            "self_assessment": {{}},
            "concept_map_score": 0.5,
            "recommendations": []
        }}
    }},
    "study_plan": {{
        "gaps": [],
        "queries": [],
        "estimated_completion_time": 0,
        "next_assessment_trigger": "weekly",
        "ability_level": "intermediate"
    }},
    "duration_ms": 10
}}"#
    )
}
