//! The `dke run` command.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};

use dke_core::assessment::{ConceptEdge, SelfAssessment};
use dke_core::engine::{CatState, Estimate, SessionObserver};
use dke_core::gaps::StudyPlan;
use dke_core::model::Item;
use dke_core::parser::load_item_bank;
use dke_core::pipeline::{AssessmentInputs, AssessmentPipeline};
use dke_core::report::{AssessmentReport, BankSummary, SessionConfig};
use dke_core::traits::ResponseSource;
use dke_report::html::write_html_report;
use dke_scorers::config::{create_grader, load_config_from};
use dke_sim::{demo_bank, ConsoleResponder, SimulatedStudent};

/// Options for `dke run`, one per command-line flag.
#[derive(Debug)]
pub struct RunOptions {
    pub bank: Option<PathBuf>,
    pub simulate_theta: Option<f64>,
    pub seed: u64,
    pub interactive: bool,
    pub learner: String,
    pub response_file: Option<PathBuf>,
    pub reference_file: Option<PathBuf>,
    pub self_assess: Option<String>,
    pub concept_edges: Option<String>,
    pub required_edges: Option<String>,
    pub context: Option<String>,
    pub max_items: Option<usize>,
    pub se_stop: Option<f64>,
    pub output: Option<PathBuf>,
    pub format: String,
    pub config: Option<PathBuf>,
}

/// Console progress reporter.
struct ConsoleObserver {
    /// Echo outcomes; interactive sessions already show them.
    echo_responses: bool,
}

impl SessionObserver for ConsoleObserver {
    fn on_item_selected(&self, _item: &Item, _state: &CatState) {}

    fn on_response(&self, item: &Item, correct: bool) {
        if self.echo_responses {
            let mark = if correct { "correct" } else { "wrong" };
            eprint!("  {} [{}] a={:.2} b={:+.2} {mark}", item.id, item.skill, item.a, item.b);
        }
    }

    fn on_estimate(&self, estimate: &Estimate, answered: usize) {
        if self.echo_responses {
            eprintln!(" -> θ={:+.3} SE={:.3} ({answered})", estimate.theta, estimate.se);
        }
    }

    fn on_session_complete(&self, state: &CatState) {
        let reason = state
            .stop_reason
            .map(|r| r.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        eprintln!("\nSession complete: {} items ({reason})", state.len());
    }
}

pub async fn execute(options: RunOptions) -> Result<()> {
    let formats = parse_formats(&options.format)?;

    // Load config and apply overrides
    let mut config = load_config_from(options.config.as_deref())?;
    if let Some(max_items) = options.max_items {
        config.cat.max_items = max_items;
    }
    if let Some(se_stop) = options.se_stop {
        config.cat.se_stop = se_stop;
    }
    config.validate()?;
    tracing::debug!(?config, "loaded config");

    // Load bank
    let (summary, bank) = match &options.bank {
        Some(path) => load_item_bank(path)?,
        None => {
            let bank = demo_bank(options.seed)?;
            (BankSummary::new("demo", "Demo bank", &bank), bank)
        }
    };
    anyhow::ensure!(!bank.is_empty(), "item bank '{}' has no items", summary.id);

    let inputs = AssessmentInputs {
        response_text: read_optional(options.response_file.as_deref())?,
        reference_text: read_optional(options.reference_file.as_deref())?,
        self_assessment: parse_self_assessment(options.self_assess.as_deref())?,
        concept_edges: parse_edges(options.concept_edges.as_deref())?,
        required_edges: parse_edges(options.required_edges.as_deref())?,
    };

    let grader = create_grader(&config.scorer)?;
    let grader_name = grader.name().to_string();
    let pipeline = AssessmentPipeline::for_bank(
        bank,
        config.cat,
        config.bkt,
        config.rubric.clone(),
        grader,
    )?;

    let mut responder: Box<dyn ResponseSource> = if options.interactive {
        Box::new(ConsoleResponder::new(
            std::io::stdin().lock(),
            std::io::stderr(),
        ))
    } else {
        let theta = options.simulate_theta.unwrap_or(0.0);
        anyhow::ensure!(theta.is_finite(), "--simulate-theta must be finite");
        Box::new(SimulatedStudent::new(theta, options.seed))
    };
    let observer = ConsoleObserver {
        echo_responses: !options.interactive,
    };

    eprintln!(
        "dke v{} — {} items in '{}', up to {} administered (SE stop {})",
        env!("CARGO_PKG_VERSION"),
        summary.item_count,
        summary.name,
        config.cat.max_items,
        config.cat.se_stop
    );
    eprintln!();

    let start = Instant::now();
    let result = pipeline
        .run_with_observer(&inputs, responder.as_mut(), &observer)
        .await?;
    let duration_ms = start.elapsed().as_millis() as u64;

    let plan = StudyPlan::build(result.theta, &result.mastery, options.context.as_deref());
    let session = SessionConfig {
        cat: config.cat,
        bkt: config.bkt,
        rubric: config.rubric.clone(),
        grader: grader_name,
    };
    let report = AssessmentReport::new(options.learner, summary, session, result, plan, duration_ms);

    print_summary(&report);

    // Save outputs
    let output = options.output.unwrap_or_else(|| config.output_dir.clone());
    std::fs::create_dir_all(&output)
        .with_context(|| format!("failed to create output directory {}", output.display()))?;
    let timestamp = report.created_at.format("%Y-%m-%dT%H%M%S");

    for fmt in formats {
        match fmt {
            "json" => {
                let path = output.join(format!("report-{timestamp}.json"));
                report.save_json(&path)?;
                eprintln!("Results saved to: {}", path.display());
            }
            "html" => {
                let path = output.join(format!("report-{timestamp}.html"));
                write_html_report(&report, &path)?;
                eprintln!("HTML report: {}", path.display());
            }
            other => anyhow::bail!("unknown format '{other}'"),
        }
    }

    Ok(())
}

fn parse_formats(format: &str) -> Result<Vec<&'static str>> {
    if format == "all" {
        return Ok(vec!["json", "html"]);
    }
    format
        .split(',')
        .map(|f| -> Result<&'static str> {
            match f.trim() {
                "json" => Ok("json"),
                "html" => Ok("html"),
                other => anyhow::bail!("unknown format '{other}' (expected json, html, all)"),
            }
        })
        .collect()
}

fn read_optional(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p)
            .with_context(|| format!("failed to read {}", p.display())),
        None => Ok(String::new()),
    }
}

/// Parse `"algebra=3, probability=2"`.
fn parse_self_assessment(arg: Option<&str>) -> Result<SelfAssessment> {
    let mut sa = SelfAssessment::new();
    let Some(arg) = arg else {
        return Ok(sa);
    };
    for pair in arg.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (skill, value) = pair
            .split_once('=')
            .with_context(|| format!("invalid self-assessment '{pair}' (expected skill=N)"))?;
        let value: u8 = value
            .trim()
            .parse()
            .with_context(|| format!("invalid rating in '{pair}'"))?;
        sa.rate(skill.trim(), value)?;
    }
    Ok(sa)
}

/// Parse `"variable>function, equation>solution"`.
fn parse_edges(arg: Option<&str>) -> Result<Vec<ConceptEdge>> {
    let Some(arg) = arg else {
        return Ok(Vec::new());
    };
    arg.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(|edge| -> Result<ConceptEdge> {
            let (from, to) = edge
                .split_once('>')
                .with_context(|| format!("invalid edge '{edge}' (expected a>b)"))?;
            Ok((from.trim().to_string(), to.trim().to_string()))
        })
        .collect()
}

fn print_summary(report: &AssessmentReport) {
    use comfy_table::{Cell, Table};

    let result = &report.result;
    let dash = &result.dashboard;

    println!(
        "\nθ = {:+.3} (SE {}) | {} / {} correct | rubric {:.1}% | concept map {:.1}%",
        dash.ability_estimate,
        if dash.ability_se.is_finite() {
            format!("{:.3}", dash.ability_se)
        } else {
            "∞".to_string()
        },
        result.correct_count(),
        result.item_log.len(),
        dash.overall * 100.0,
        dash.concept_map_score * 100.0
    );

    let mut table = Table::new();
    table.set_header(vec!["Skill", "Mastery", "Priority", "Difficulty", "Study (min)"]);
    for (skill, &mastery) in &dash.mastery {
        let gap = report.study_plan.gaps.iter().find(|g| &g.skill == skill);
        table.add_row(vec![
            Cell::new(skill),
            Cell::new(format!("{:.1}%", mastery * 100.0)),
            Cell::new(gap.map(|g| g.priority.to_string()).unwrap_or_else(|| "-".into())),
            Cell::new(
                gap.map(|g| g.recommended_difficulty.to_string())
                    .unwrap_or_else(|| "-".into()),
            ),
            Cell::new(
                gap.map(|g| g.estimated_study_time.to_string())
                    .unwrap_or_else(|| "-".into()),
            ),
        ]);
    }
    println!("{table}");

    println!("\nRecommendations:");
    for rec in &dash.recommendations {
        println!("  - {rec}");
    }
    println!(
        "\nNext assessment: {}",
        report.study_plan.next_assessment_trigger
    );
}
