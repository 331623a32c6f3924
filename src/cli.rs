//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Gradeflow - AI-assisted assessment evaluation
///
/// Parse a Q&A document, score every answer with a local AI model,
/// route low-confidence evaluations to human review, and generate a
/// Markdown or JSON report.
///
/// Examples:
///   gradeflow quiz.txt
///   gradeflow quiz.txt --model qwen2.5:14b --threshold 0.85
///   gradeflow --text "Q: What is 2+2?\nA: 4" --format json
///   gradeflow quiz.txt --require-review
///   gradeflow --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Assessment document to evaluate
    ///
    /// Plain-text file with Q:/Expected:/A: blocks. Not required when
    /// using --text or --init-config.
    #[arg(value_name = "FILE", required_unless_present_any = ["text", "init_config"])]
    pub document: Option<PathBuf>,

    /// Evaluate raw text instead of a file
    #[arg(long, value_name = "TEXT", conflicts_with = "document")]
    pub text: Option<String>,

    /// Assessment title
    ///
    /// Defaults to the document file name, or "Assessment" for raw text.
    #[arg(long, value_name = "TITLE")]
    pub title: Option<String>,

    /// Ollama model to use for evaluation
    ///
    /// Can also be set via GRADEFLOW_MODEL env var or .gradeflow.toml config.
    #[arg(short, long, default_value = "llama3.2:latest", env = "GRADEFLOW_MODEL")]
    pub model: String,

    /// Output file path for the report
    #[arg(
        short,
        long,
        default_value = "assessment_report.md",
        value_name = "FILE"
    )]
    pub output: PathBuf,

    /// Output format (markdown, text, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Ollama API endpoint URL
    #[arg(long, default_value = "http://localhost:11434", env = "OLLAMA_URL")]
    pub ollama_url: String,

    /// Temperature for model responses (0.0 - 1.0)
    ///
    /// Lower values produce more consistent scoring
    #[arg(long, default_value = "0.3")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Number of retries per question on oracle failure
    #[arg(long, value_name = "COUNT")]
    pub retries: Option<usize>,

    /// Confidence threshold for human review (0.0 - 1.0)
    ///
    /// Evaluations below this confidence are flagged for review.
    /// Default: from config or 0.7.
    #[arg(long, value_name = "VALUE")]
    pub threshold: Option<f64>,

    /// Max score per parsed question
    #[arg(long, value_name = "SCORE")]
    pub max_score: Option<f64>,

    /// Number of concurrent answer evaluations
    #[arg(long, default_value = "4", value_name = "NUM")]
    pub concurrency: usize,

    /// Stop when questions need human review instead of keeping AI scores
    ///
    /// Useful for CI-style gating. Exit code 2 when review is required.
    #[arg(long)]
    pub require_review: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .gradeflow.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .gradeflow.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// Plain text format
    Text,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref document) = self.document {
            if !document.exists() {
                return Err(format!("Document does not exist: {}", document.display()));
            }
            if !document.is_file() {
                return Err(format!("Document is not a file: {}", document.display()));
            }
        }

        if let Some(ref text) = self.text {
            if text.trim().is_empty() {
                return Err("--text must not be empty".to_string());
            }
        }

        // Validate Ollama URL format
        if !self.ollama_url.starts_with("http://") && !self.ollama_url.starts_with("https://") {
            return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
        }

        // Validate temperature range
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err("Temperature must be between 0.0 and 1.0".to_string());
        }

        // Validate threshold if provided
        if let Some(threshold) = self.threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err("Threshold must be between 0.0 and 1.0".to_string());
            }
        }

        // Validate max score if provided
        if let Some(max_score) = self.max_score {
            if max_score <= 0.0 {
                return Err("Max score must be positive".to_string());
            }
        }

        // Validate concurrency
        if self.concurrency == 0 {
            return Err("Concurrency must be at least 1".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Returns the effective assessment title.
    pub fn effective_title(&self) -> String {
        if let Some(ref title) = self.title {
            return title.clone();
        }

        self.document
            .as_ref()
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
            .map(String::from)
            .unwrap_or_else(|| "Assessment".to_string())
    }
}
