//! The `dke compare` command.

use std::path::PathBuf;

use anyhow::Result;

use dke_core::report::AssessmentReport;

pub fn execute(
    baseline_path: PathBuf,
    current_path: PathBuf,
    threshold: f64,
    fail_on_regression: bool,
    format: String,
) -> Result<()> {
    anyhow::ensure!(
        threshold.is_finite() && threshold >= 0.0,
        "threshold must be a non-negative number"
    );

    let baseline = AssessmentReport::load_json(&baseline_path)?;
    let current = AssessmentReport::load_json(&current_path)?;

    if baseline.learner != current.learner {
        eprintln!(
            "Warning: comparing different learners ('{}' vs '{}')",
            baseline.learner, current.learner
        );
    }

    let report = current.compare(&baseline, threshold);

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", report.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            // text format
            println!(
                "Comparison: {} regressions, {} improvements, {} unchanged (θ {:+.3})",
                report.regressions.len(),
                report.improvements.len(),
                report.unchanged,
                report.theta_delta
            );

            if !report.regressions.is_empty() {
                println!("\nRegressions:");
                for r in &report.regressions {
                    println!(
                        "  {} {:.1}% -> {:.1}% ({:+.1}%)",
                        r.skill,
                        r.baseline * 100.0,
                        r.current * 100.0,
                        r.delta * 100.0
                    );
                }
            }

            if !report.improvements.is_empty() {
                println!("\nImprovements:");
                for i in &report.improvements {
                    println!(
                        "  {} {:.1}% -> {:.1}% ({:+.1}%)",
                        i.skill,
                        i.baseline * 100.0,
                        i.current * 100.0,
                        i.delta * 100.0
                    );
                }
            }

            if !report.new_skills.is_empty() {
                println!("\nNew skills: {}", report.new_skills.join(", "));
            }
            if !report.dropped_skills.is_empty() {
                println!("Dropped skills: {}", report.dropped_skills.join(", "));
            }
        }
    }

    if fail_on_regression && report.has_regressions() {
        std::process::exit(1);
    }

    Ok(())
}
