//! Gradeflow - AI-assisted assessment evaluation
//!
//! A CLI tool that parses Q&A documents, scores answers with a local
//! Ollama model, routes low-confidence evaluations to human review, and
//! generates detailed assessment reports.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (parse failure, connection, config, etc.)
//!   2 - Human review required (--require-review)

mod analysis;
mod cli;
mod config;
mod error;
mod evaluator;
mod models;
mod parser;
mod report;
mod workflow;

use anyhow::{anyhow, Context, Result};
use cli::{Args, OutputFormat};
use config::Config;
use evaluator::{OllamaConfig, OllamaEvaluator};
use indicatif::{ProgressBar, ProgressStyle};
use parser::PlainTextExtractor;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use workflow::{DocumentInput, MachineConfig, WorkflowDriver, WorkflowMachine, WorkflowState};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Gradeflow v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the evaluation
    match run_assessment(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Assessment failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .gradeflow.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".gradeflow.toml");

    if path.exists() {
        eprintln!("⚠️  .gradeflow.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .gradeflow.toml")?;

    println!("✅ Created .gradeflow.toml with default settings.");
    println!("   Edit it to customize model, threshold, scoring, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete evaluation workflow. Returns exit code (0 or 2).
async fn run_assessment(args: Args) -> Result<i32> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let input = match (&args.document, &args.text) {
        (Some(path), _) => DocumentInput::path(path.clone()),
        (None, Some(text)) => DocumentInput::text(text.clone()),
        (None, None) => return Err(anyhow!("no document or text provided")),
    };
    let title = args.effective_title();

    println!("🤖 Initializing evaluator...");
    println!("   Model: {}", config.evaluator.model);
    println!("   Ollama: {}", config.evaluator.ollama_url);
    println!("   Confidence threshold: {}", config.evaluator.confidence_threshold);

    let oracle = OllamaEvaluator::new(OllamaConfig {
        ollama_url: config.evaluator.ollama_url.clone(),
        model_name: config.evaluator.model.clone(),
        temperature: config.evaluator.temperature,
        timeout_seconds: config.evaluator.timeout_seconds,
        retries: config.evaluator.retries,
    })
    .map_err(|e| anyhow!("failed to initialize evaluator: {}", e))?;

    let machine = WorkflowMachine::new(
        Arc::new(oracle),
        Arc::new(PlainTextExtractor),
        MachineConfig {
            confidence_threshold: config.evaluator.confidence_threshold,
            concurrency: config.general.concurrency,
            default_max_score: config.parser.default_max_score,
        },
    );
    let driver = WorkflowDriver::new(machine);

    let workflow_id = driver.start(&title, input).await;

    println!("\n📝 Evaluating answers...");
    let spinner = make_spinner(&args, "Scoring answers with the model");
    let mut state = driver.advance(&workflow_id).await?;
    spinner.finish_and_clear();

    fail_on_state_error(&state)?;

    // The workflow suspends when evaluations need human review.
    if state.awaiting_review() {
        print_review_queue(&state);

        if args.require_review {
            eprintln!(
                "\n⛔ {} question(s) require human review. Failing (exit code 2).",
                state.questions_needing_review.len()
            );
            return Ok(2);
        }

        warn!("Continuing without human review; flagged questions keep their AI scores");
        state = driver.advance(&workflow_id).await?;
        fail_on_state_error(&state)?;
    }

    let report = driver.report(&workflow_id).await?;

    // Generate and save the report
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Text => report::generate_text_report(&report),
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    report::write_report(&output, &args.output)
        .with_context(|| format!("Failed to write report to {}", args.output.display()))?;

    // Print summary
    let stats = &report.statistics;
    println!("\n📊 Assessment Summary:");
    println!(
        "   Score: {:.1}/{:.1} ({:.1}%)",
        stats.total_score, stats.max_possible_score, stats.percentage
    );
    println!(
        "   Correct: {}/{} | Avg confidence: {:.2} | Human reviewed: {}",
        stats.correct_count, stats.total_questions, stats.average_confidence,
        stats.human_reviewed_count
    );
    println!(
        "\n✅ Evaluation complete! Report saved to: {}",
        args.output.display()
    );

    Ok(0)
}

/// Surface a recorded stage failure as a runtime error.
fn fail_on_state_error(state: &WorkflowState) -> Result<()> {
    if let Some(ref message) = state.error {
        return Err(anyhow!(
            "workflow stopped at {}: {}",
            state.current_step,
            message
        ));
    }
    Ok(())
}

/// Print the questions waiting for a human reviewer.
fn print_review_queue(state: &WorkflowState) {
    println!(
        "\n⚠️  {} question(s) flagged for human review:",
        state.questions_needing_review.len()
    );

    for id in &state.questions_needing_review {
        let question = state.questions.iter().find(|q| q.id == *id);
        let evaluation = state.evaluations.iter().find(|e| e.question_id == *id);

        if let (Some(question), Some(evaluation)) = (question, evaluation) {
            println!(
                "   {} [confidence {:.2}] {}",
                id, evaluation.confidence, question.text
            );
        }
    }
}

/// Spinner shown while the model scores answers. Hidden in quiet mode.
fn make_spinner(args: &Args, message: &str) -> ProgressBar {
    if args.quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .gradeflow.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
