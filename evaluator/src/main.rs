use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use common::config::Config;
use common::logger::{Console, init_logging};
use grader::evaluation::EvaluationOutcome;
use grader::submission::Submission;
use services::repository::InMemorySubmissionRepository;
use services::submission_service::SubmissionService;
use std::fs::{File, create_dir_all};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(ValueEnum, Clone, Debug)]
enum OutputFormat {
    Full,
    Summary,
}

#[derive(Parser, Debug)]
#[command(version, about = "Measures flagging accuracy against human-labeled submissions")]
struct Args {
    /// JSON array of exported submissions
    input: PathBuf,
    /// Labeled submissions required before metrics are reported (defaults to EVALUATION_MIN_LABELED)
    #[arg(long)]
    min_labeled: Option<usize>,
    /// Also write the report to this path
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output format: full (with per-session rows) or summary
    #[arg(long, value_enum, default_value_t = OutputFormat::Full)]
    format: OutputFormat,
    /// Env file read before the process environment
    #[arg(long, default_value = ".env")]
    env_file: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::init(&args.env_file);
    let _guard = init_logging(&config.log_file, &config.log_level, console(config));

    let submissions = load_submissions(&args.input)?;
    let min_labeled = args.min_labeled.unwrap_or(config.evaluation_min_labeled);
    info!(
        input = %args.input.display(),
        submissions = submissions.len(),
        min_labeled,
        "evaluating export"
    );

    let outcome = evaluate(submissions, config, min_labeled).await?;
    let outcome = shape(outcome, &args.format);

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if let Some(path) = &args.out {
        save_json(&outcome, path)?;
        eprintln!("Saved report to {}", path.display());
    }
    Ok(())
}

/// Stdout carries the report, so console logs go to stderr.
fn console(config: &Config) -> Option<Console> {
    Console::for_cli(config.log_to_stdout)
}

fn load_submissions(path: &Path) -> Result<Vec<Submission>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing submissions from {}", path.display()))
}

async fn evaluate(
    submissions: Vec<Submission>,
    config: &Config,
    min_labeled: usize,
) -> Result<EvaluationOutcome> {
    let config = Config {
        evaluation_min_labeled: min_labeled,
        ..config.clone()
    };
    let repo = Arc::new(InMemorySubmissionRepository::with_submissions(submissions));
    let service = SubmissionService::from_config(repo, &config);
    service.evaluate().await.context("evaluating submissions")
}

fn shape(mut outcome: EvaluationOutcome, format: &OutputFormat) -> EvaluationOutcome {
    if let (OutputFormat::Summary, EvaluationOutcome::Report(report)) = (format, &mut outcome) {
        report.sessions.clear();
    }
    outcome
}

fn save_json(outcome: &EvaluationOutcome, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent).with_context(|| format!("creating dir {}", parent.display()))?;
        }
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, outcome).context("writing JSON")
}
