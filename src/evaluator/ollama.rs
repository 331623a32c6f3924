//! Ollama-backed answer oracle.
//!
//! Sends one chat request per answer and parses the structured
//! `SCORE:` / `CONFIDENCE:` / `IS_CORRECT:` / `EXPLANATION:` fields out of
//! the response. Parsing is forgiving: a response missing fields falls back
//! to defaults with low confidence, which routes the evaluation to human
//! review instead of failing the question.

use crate::error::OracleError;
use crate::evaluator::{AnswerOracle, OracleScore};
use crate::models::{Question, QuestionType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Connection and generation settings for the Ollama oracle.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub retries: usize,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.3,
            timeout_seconds: 120,
            retries: 3,
        }
    }
}

/// Chat message for the Ollama API.
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

const SYSTEM_PROMPT: &str = "You are an expert educational evaluator. \
Provide fair, objective, and constructive assessments.";

/// The Ollama-backed oracle.
pub struct OllamaEvaluator {
    config: OllamaConfig,
    http_client: reqwest::Client,
}

impl OllamaEvaluator {
    pub fn new(config: OllamaConfig) -> Result<Self, OracleError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| OracleError::Request {
                endpoint: config.ollama_url.clone(),
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Build the grading prompt for one question.
    fn build_prompt(question: &Question) -> String {
        let mut prompt = format!(
            "You are assessing a student answer.\n\n\
             **Question Type**: {}\n\
             **Maximum Score**: {}\n\n\
             **Question**: {}\n\n",
            question.question_type, question.max_score, question.text
        );

        if let Some(ref reference) = question.reference_answer {
            prompt.push_str(&format!("**Expected Answer**: {}\n\n", reference));
        }

        prompt.push_str(&format!("**Student's Answer**: {}\n\n", question.user_answer));
        prompt.push_str(type_instructions(question.question_type));
        prompt.push_str(
            "\nProvide your evaluation in exactly this format:\n\n\
             SCORE: [number between 0 and the maximum score]\n\
             CONFIDENCE: [number between 0.0 and 1.0]\n\
             IS_CORRECT: [true or false]\n\
             EXPLANATION: [why you gave this score]\n\n\
             Be objective, fair, and provide constructive feedback.\n",
        );

        prompt
    }

    /// Parse the structured fields out of the oracle's response.
    ///
    /// Missing fields fall back to score 0 / confidence 0.3 / incorrect,
    /// with the whole response as the explanation, so a malformed reply is
    /// routed to human review rather than dropped.
    fn parse_verdict(response: &str, question: &Question) -> OracleScore {
        let mut verdict = OracleScore {
            score: 0.0,
            confidence: 0.3,
            is_correct: false,
            explanation: response.to_string(),
        };

        for line in response.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("SCORE:") {
                if let Some(value) = first_number(rest) {
                    verdict.score = value.min(question.max_score).max(0.0);
                }
            } else if let Some(rest) = line.strip_prefix("CONFIDENCE:") {
                if let Some(value) = first_number(rest) {
                    verdict.confidence = value.clamp(0.0, 1.0);
                }
            } else if let Some(rest) = line.strip_prefix("IS_CORRECT:") {
                verdict.is_correct = rest.trim().to_lowercase().starts_with("true");
            }
        }

        if let Some(idx) = response.find("EXPLANATION:") {
            let explanation = response[idx + "EXPLANATION:".len()..].trim();
            if !explanation.is_empty() {
                verdict.explanation = explanation.to_string();
            }
        }

        verdict
    }

    async fn chat(&self, prompt: &str) -> Result<String, OracleError> {
        let url = format!("{}/api/chat", self.config.ollama_url);

        let request = ChatRequest {
            model: self.config.model_name.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: self.config.temperature,
            },
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout {
                        seconds: self.config.timeout_seconds,
                    }
                } else {
                    OracleError::Request {
                        endpoint: url.clone(),
                        message: e.to_string(),
                    }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::BadStatus { status, body });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| OracleError::MalformedResponse(e.to_string()))?;

        Ok(chat_response.message.content)
    }
}

#[async_trait]
impl AnswerOracle for OllamaEvaluator {
    async fn score_answer(&self, question: &Question) -> Result<OracleScore, OracleError> {
        let prompt = Self::build_prompt(question);
        let attempts = self.config.retries.max(1);

        let mut last_error = None;
        for attempt in 1..=attempts {
            debug!(
                "Scoring question {} (attempt {}/{})",
                question.id, attempt, attempts
            );

            match self.chat(&prompt).await {
                Ok(content) => return Ok(Self::parse_verdict(&content, question)),
                Err(e) => {
                    warn!(
                        "Oracle attempt {}/{} for question {} failed: {}",
                        attempt, attempts, question.id, e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            OracleError::MalformedResponse("oracle produced no response".into())
        }))
    }
}

/// First whitespace-separated token of `s`, parsed as a number.
fn first_number(s: &str) -> Option<f64> {
    s.trim().split_whitespace().next()?.parse().ok()
}

/// Grading rubric text per question type.
fn type_instructions(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::TrueFalse => {
            "**Evaluation Criteria**:\n\
             - Answer must be exactly correct (True/False)\n\
             - No partial credit\n\
             - Confidence should be very high (0.9+) for clear answers\n"
        }
        QuestionType::MultipleChoice => {
            "**Evaluation Criteria**:\n\
             - Answer must match the correct option\n\
             - No partial credit unless the answer shows understanding\n\
             - High confidence for exact matches\n"
        }
        QuestionType::ShortAnswer => {
            "**Evaluation Criteria**:\n\
             - Check for key concepts and accuracy\n\
             - Award partial credit for partially correct answers\n\
             - Consider different phrasings of correct answers\n\
             - Confidence depends on clarity and completeness\n"
        }
        QuestionType::LongAnswer => {
            "**Evaluation Criteria**:\n\
             - Assess depth of understanding\n\
             - Check for key points and examples\n\
             - Award partial credit generously\n\
             - Lower confidence if the answer is ambiguous\n"
        }
        QuestionType::Coding => {
            "**Evaluation Criteria**:\n\
             - Check if the code logic is correct\n\
             - Syntax errors reduce the score but do not eliminate it\n\
             - Consider alternative solutions\n\
             - High confidence only if the code is clearly correct or incorrect\n"
        }
        QuestionType::Essay => {
            "**Evaluation Criteria**:\n\
             - Assess argument quality and evidence\n\
             - Check for coherence and organization\n\
             - This is subjective: use lower confidence (0.5-0.7)\n\
             - Recommend human review for final grading\n"
        }
    }
}
