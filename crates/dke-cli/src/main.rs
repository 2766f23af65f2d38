//! dke CLI — the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dke", version, about = "Adaptive knowledge evaluation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an adaptive assessment
    Run {
        /// Path to a .toml item bank or directory (default: built-in demo bank)
        #[arg(long)]
        bank: Option<PathBuf>,

        /// Simulate a learner with this true ability
        #[arg(long, allow_hyphen_values = true, conflicts_with = "interactive")]
        simulate_theta: Option<f64>,

        /// Seed for the simulated learner and the demo bank
        #[arg(long, default_value = "7")]
        seed: u64,

        /// Answer items at the terminal
        #[arg(long)]
        interactive: bool,

        /// Learner identifier recorded in the report
        #[arg(long, default_value = "learner")]
        learner: String,

        /// File with the learner's free-text answer
        #[arg(long)]
        response_file: Option<PathBuf>,

        /// File with the reference text for grading
        #[arg(long)]
        reference_file: Option<PathBuf>,

        /// Self-ratings, e.g. "algebra=3,probability=2" (1-5)
        #[arg(long)]
        self_assess: Option<String>,

        /// Concept-map edges drawn by the learner, e.g. "variable>function"
        #[arg(long)]
        concept_edges: Option<String>,

        /// Concept-map edges the map should contain
        #[arg(long)]
        required_edges: Option<String>,

        /// Learning context used in content discovery queries
        #[arg(long)]
        context: Option<String>,

        /// Override the maximum number of items
        #[arg(long)]
        max_items: Option<usize>,

        /// Override the standard-error stopping threshold
        #[arg(long)]
        se_stop: Option<f64>,

        /// Output directory (default: from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: json, html, all
        #[arg(long, default_value = "json")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Compare two assessment reports
    Compare {
        /// Baseline report JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Current report JSON
        #[arg(long)]
        current: PathBuf,

        /// Minimum mastery change that counts
        #[arg(long, default_value = "0.05")]
        threshold: f64,

        /// Exit code 1 if regressions found
        #[arg(long)]
        fail_on_regression: bool,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Validate item bank TOML files
    Validate {
        /// Path to item bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// List items ordered by information at an ability level
    Inspect {
        /// Path to item bank file or directory
        #[arg(long)]
        bank: PathBuf,

        /// Ability level to evaluate information at
        #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
        theta: f64,
    },

    /// Create starter config and example item bank
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("dke=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            bank,
            simulate_theta,
            seed,
            interactive,
            learner,
            response_file,
            reference_file,
            self_assess,
            concept_edges,
            required_edges,
            context,
            max_items,
            se_stop,
            output,
            format,
            config,
        } => {
            let options = commands::run::RunOptions {
                bank,
                simulate_theta,
                seed,
                interactive,
                learner,
                response_file,
                reference_file,
                self_assess,
                concept_edges,
                required_edges,
                context,
                max_items,
                se_stop,
                output,
                format,
                config,
            };
            commands::run::execute(options).await
        }
        Commands::Compare {
            baseline,
            current,
            threshold,
            fail_on_regression,
            format,
        } => commands::compare::execute(baseline, current, threshold, fail_on_regression, format),
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Inspect { bank, theta } => commands::inspect::execute(bank, theta),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
