//! HTML report generator.
//!
//! Produces a self-contained dashboard with all CSS inlined.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::Path;

use dke_core::report::AssessmentReport;

/// Escape a string for safe HTML insertion.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn format_se(se: f64) -> String {
    if se.is_finite() {
        format!("{se:.3}")
    } else {
        "∞".to_string()
    }
}

fn level_class(value: f64) -> &'static str {
    if value >= 0.8 {
        "high"
    } else if value >= 0.5 {
        "mid"
    } else {
        "low"
    }
}

/// Generate an HTML dashboard from an assessment report.
pub fn generate_html(report: &AssessmentReport) -> String {
    let result = &report.result;
    let dash = &result.dashboard;
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    let _ = writeln!(
        html,
        "<title>dke report: {}</title>",
        html_escape(&report.learner)
    );
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    // Header
    html.push_str("<header>\n");
    html.push_str("<h1>Knowledge evaluation</h1>\n");
    let _ = writeln!(
        html,
        "<p class=\"meta\">Learner: <strong>{}</strong> | Bank: {} ({} items) | Grader: {} | {}</p>",
        html_escape(&report.learner),
        html_escape(&report.bank.name),
        report.bank.item_count,
        html_escape(&report.config.grader),
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(
        html,
        "<div class=\"ability\"><span class=\"theta\">θ = {:.3}</span> <span class=\"se\">SE {}</span> <span class=\"meta\">{} items, {} correct, {}</span></div>",
        dash.ability_estimate,
        format_se(dash.ability_se),
        result.item_log.len(),
        result.correct_count(),
        result.stop_reason
    );
    html.push_str("</header>\n");

    // Mastery
    html.push_str("<section>\n<h2>Skill mastery</h2>\n");
    html.push_str("<table>\n<thead><tr><th>Skill</th><th>Mastery</th><th></th></tr></thead>\n<tbody>\n");
    for (skill, &m) in &dash.mastery {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{:.1}%</td><td class=\"bar-cell\"><div class=\"bar {}\" style=\"width: {:.1}%\"></div></td></tr>",
            html_escape(skill),
            m * 100.0,
            level_class(m),
            (m * 100.0).clamp(0.0, 100.0)
        );
    }
    html.push_str("</tbody></table>\n</section>\n");

    // Rubric
    html.push_str("<section>\n<h2>Free-text response</h2>\n");
    let _ = writeln!(
        html,
        "<p>Overall: <strong>{:.1}%</strong> | Concept map: {:.1}%</p>",
        dash.overall * 100.0,
        dash.concept_map_score * 100.0
    );
    html.push_str("<table>\n<thead><tr><th>Criterion</th><th>Score</th><th>Weight</th></tr></thead>\n<tbody>\n");
    for (criterion, &score) in &dash.criteria {
        let weight = report
            .config
            .rubric_weight(criterion)
            .map(|w| format!("{w:.2}"))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td class=\"{}\">{:.3}</td><td>{}</td></tr>",
            html_escape(criterion),
            level_class(score),
            score,
            weight
        );
    }
    html.push_str("</tbody></table>\n");
    if !dash.self_assessment.is_empty() {
        html.push_str("<h3>Self-assessment</h3>\n<ul>\n");
        for (skill, &score) in &dash.self_assessment {
            let _ = writeln!(
                html,
                "<li>{}: {:.2}</li>",
                html_escape(skill),
                score
            );
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</section>\n");

    // Item log
    html.push_str("<section>\n<h2>Item log</h2>\n");
    html.push_str("<table id=\"items\">\n<thead><tr><th>#</th><th>Item</th><th>Skill</th><th>a</th><th>b</th><th>Correct</th><th>P(θ)</th></tr></thead>\n<tbody>\n");
    for (i, entry) in result.item_log.iter().enumerate() {
        let (class, mark) = if entry.correct {
            ("pass", "yes")
        } else {
            ("fail", "no")
        };
        let _ = writeln!(
            html,
            "<tr class=\"{}\"><td>{}</td><td>{}</td><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{}</td><td>{:.3}</td></tr>",
            class,
            i + 1,
            html_escape(&entry.item_id),
            html_escape(&entry.skill),
            entry.a,
            entry.b,
            mark,
            entry.p_at_theta
        );
    }
    html.push_str("</tbody></table>\n</section>\n");

    // Recommendations
    html.push_str("<section>\n<h2>Recommendations</h2>\n<ul>\n");
    for rec in &dash.recommendations {
        let _ = writeln!(html, "<li>{}</li>", html_escape(rec));
    }
    html.push_str("</ul>\n</section>\n");

    // Study plan
    let plan = &report.study_plan;
    html.push_str("<section>\n<h2>Study plan</h2>\n");
    let _ = writeln!(
        html,
        "<p class=\"meta\">Ability level: {} | Estimated time: {} min | Next assessment: {}</p>",
        plan.ability_level, plan.estimated_completion_time, plan.next_assessment_trigger
    );
    if plan.gaps.is_empty() {
        html.push_str("<p>No learning gaps identified.</p>\n");
    } else {
        html.push_str("<table>\n<thead><tr><th>Skill</th><th>Priority</th><th>Difficulty</th><th>Minutes</th><th>Rationale</th></tr></thead>\n<tbody>\n");
        for gap in &plan.gaps {
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td class=\"priority-{}\">{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                html_escape(&gap.skill),
                gap.priority,
                gap.priority,
                gap.recommended_difficulty,
                gap.estimated_study_time,
                html_escape(&gap.rationale)
            );
        }
        html.push_str("</tbody></table>\n");
    }
    html.push_str("</section>\n");

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(report).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &AssessmentReport, path: &Path) -> Result<()> {
    let html = generate_html(report);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
    Ok(())
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --pass: #dcfce7; --fail: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --pass: #064e3b; --fail: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; }
.ability { font-size: 1.4rem; margin: 1rem 0; }
.ability .se { color: #6b7280; margin-left: 1rem; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); }
.bar-cell { width: 50%; }
.bar { height: 1rem; border-radius: 4px; }
.bar.high { background: #22c55e; }
.bar.mid { background: #eab308; }
.bar.low { background: #ef4444; }
.pass { background: var(--pass); }
.fail { background: var(--fail); }
.priority-high { font-weight: bold; color: #ef4444; }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use dke_core::engine::StopReason;
    use dke_core::gaps::StudyPlan;
    use dke_core::model::{BktParams, CatConfig};
    use dke_core::pipeline::{AssessmentResult, Dashboard, ItemLogEntry};
    use dke_core::report::{BankSummary, SessionConfig};
    use std::collections::BTreeMap;

    fn map(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|&(k, v)| (k.to_string(), v)).collect()
    }

    fn make_test_report(learner: &str) -> AssessmentReport {
        let mastery = map(&[("algebra", 0.35), ("functions", 0.91)]);
        let criteria = map(&[("completeness", 0.333), ("factual_accuracy", 0.667)]);
        let recommendations = vec!["Practice items for skills: algebra (BKT < 0.60)".to_string()];
        let result = AssessmentResult {
            theta: -0.42,
            theta_se: 0.61,
            stop_reason: StopReason::MaxItems,
            item_log: vec![
                ItemLogEntry {
                    item_id: "I7".into(),
                    skill: "algebra".into(),
                    a: 1.2,
                    b: 0.3,
                    correct: false,
                    p_at_theta: 0.29,
                },
                ItemLogEntry {
                    item_id: "I3".into(),
                    skill: "functions".into(),
                    a: 0.9,
                    b: -1.1,
                    correct: true,
                    p_at_theta: 0.64,
                },
            ],
            mastery: mastery.clone(),
            criteria: criteria.clone(),
            overall: 0.52,
            self_assessment: map(&[("algebra", 0.25)]),
            concept_map_score: 0.667,
            dashboard: Dashboard {
                ability_estimate: -0.42,
                ability_se: 0.61,
                mastery: mastery.clone(),
                criteria,
                overall: 0.52,
                self_assessment: map(&[("algebra", 0.25)]),
                concept_map_score: 0.667,
                recommendations,
            },
        };
        let plan = StudyPlan::build(result.theta, &result.mastery, None);
        AssessmentReport::new(
            learner,
            BankSummary {
                id: "demo".into(),
                name: "Demo bank".into(),
                item_count: 18,
                skills: vec!["algebra".into(), "functions".into()],
            },
            SessionConfig {
                cat: CatConfig::default(),
                bkt: BktParams::default(),
                grader: "keyword".into(),
                rubric: Default::default(),
            },
            result,
            plan,
            12,
        )
    }

    #[test]
    fn html_report_contains_required_elements() {
        let html = generate_html(&make_test_report("learner-1"));

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.ends_with("</html>"));
        assert!(html.contains("learner-1"));
        assert!(html.contains("θ = -0.420"));
        assert!(html.contains("SE 0.610"));
        assert!(html.contains("<td>algebra</td><td>35.0%</td>"));
        assert!(html.contains("class=\"bar high\" style=\"width: 91.0%\""));
        assert!(html.contains("<td>I7</td>"));
        assert!(html.contains("Practice items for skills: algebra"));
        assert!(html.contains("Current mastery at 35.0%"));
        assert!(html.contains("<td>factual_accuracy</td><td class=\"mid\">0.667</td><td>0.35</td>"));
    }

    #[test]
    fn html_escapes_user_text() {
        let html = generate_html(&make_test_report("<script>alert('x')</script>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;"));
    }

    #[test]
    fn infinite_se_is_rendered() {
        let mut report = make_test_report("learner-1");
        report.result.dashboard.ability_se = f64::INFINITY;
        assert!(generate_html(&report).contains("SE ∞"));
    }

    #[test]
    fn html_report_write_to_file() {
        let report = make_test_report("learner-1");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.html");

        write_html_report(&report, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("<html"));
    }
}
