//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.gradeflow.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Evaluator settings.
    #[serde(default)]
    pub evaluator: EvaluatorConfig,

    /// Document parser settings.
    #[serde(default)]
    pub parser: ParserConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Number of concurrent answer evaluations.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_output() -> String {
    "assessment_report.md".to_string()
}

fn default_concurrency() -> usize {
    4
}

/// AI evaluator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Default model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Number of retries on failure.
    #[serde(default = "default_retries")]
    pub retries: usize,

    /// Confidence below this routes an evaluation to human review.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
            retries: default_retries(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_timeout() -> u64 {
    120
}

fn default_retries() -> usize {
    3
}

fn default_confidence_threshold() -> f64 {
    crate::models::DEFAULT_CONFIDENCE_THRESHOLD
}

/// Document parser settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Max score assigned to each parsed question.
    #[serde(default = "default_max_score")]
    pub default_max_score: f64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            default_max_score: default_max_score(),
        }
    }
}

fn default_max_score() -> f64 {
    10.0
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".gradeflow.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        // Evaluator settings - always override since they have defaults in CLI
        self.evaluator.model = args.model.clone();
        self.evaluator.ollama_url = args.ollama_url.clone();
        self.evaluator.temperature = args.temperature;

        // Optional settings - only override if explicitly provided via CLI
        if let Some(timeout) = args.timeout {
            self.evaluator.timeout_seconds = timeout;
        }
        if let Some(retries) = args.retries {
            self.evaluator.retries = retries;
        }
        if let Some(threshold) = args.threshold {
            self.evaluator.confidence_threshold = threshold;
        }
        if let Some(max_score) = args.max_score {
            self.parser.default_max_score = max_score;
        }

        // General settings
        self.general.concurrency = args.concurrency;

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
