//! Data models for the assessment evaluator.
//!
//! This module contains the core entities flowing through the pipeline:
//! questions, their AI evaluations, the assessment rollup, and the final
//! report. Invariants are enforced at construction and never silently
//! coerced afterwards.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Confidence below this value always forces human review, regardless of
/// what the caller supplied. The pipeline threshold is configurable; this
/// floor is the model-level default.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Kind of question being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    TrueFalse,
    MultipleChoice,
    ShortAnswer,
    LongAnswer,
    Coding,
    Essay,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::TrueFalse => write!(f, "true/false"),
            QuestionType::MultipleChoice => write!(f, "multiple choice"),
            QuestionType::ShortAnswer => write!(f, "short answer"),
            QuestionType::LongAnswer => write!(f, "long answer"),
            QuestionType::Coding => write!(f, "coding"),
            QuestionType::Essay => write!(f, "essay"),
        }
    }
}

/// Lifecycle of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    Pending,
    AiEvaluated,
    HumanReviewed,
    Completed,
}

impl fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationStatus::Pending => write!(f, "pending"),
            EvaluationStatus::AiEvaluated => write!(f, "ai_evaluated"),
            EvaluationStatus::HumanReviewed => write!(f, "human_reviewed"),
            EvaluationStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A single question with the answer under evaluation.
///
/// Created once by the extractor; immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Identifier, unique within an assessment.
    pub id: String,
    /// The question text.
    pub text: String,
    /// Kind of question.
    pub question_type: QuestionType,
    /// Expected/correct answer, when the document provides one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_answer: Option<String>,
    /// Answer provided by the user.
    pub user_answer: String,
    /// Maximum points for this question. Always positive.
    pub max_score: f64,
    /// Subject area or topic label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl Question {
    /// Create a question, trimming text fields and rejecting empty ones.
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        user_answer: impl Into<String>,
        max_score: f64,
    ) -> Result<Self, ValidationError> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(ValidationError::EmptyField { field: "text" });
        }

        let user_answer = user_answer.into().trim().to_string();
        if user_answer.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "user_answer",
            });
        }

        if max_score <= 0.0 {
            return Err(ValidationError::NonPositiveMaxScore { value: max_score });
        }

        Ok(Self {
            id: id.into(),
            text,
            question_type: QuestionType::ShortAnswer,
            reference_answer: None,
            user_answer,
            max_score,
            topic: None,
        })
    }

    /// Set the question type.
    pub fn with_type(mut self, question_type: QuestionType) -> Self {
        self.question_type = question_type;
        self
    }

    /// Attach a reference answer.
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference_answer = Some(reference.into());
        self
    }

    /// Attach a topic label.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }
}

/// The AI's evaluation of one answer.
///
/// `needs_human_review` is a derived field: it is forced true whenever
/// confidence falls below [`DEFAULT_CONFIDENCE_THRESHOLD`], no matter what
/// the constructor was given. Human override fields are additive
/// annotations; the AI score and explanation are never replaced in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    /// Question this evaluation belongs to.
    pub question_id: String,
    /// Points awarded by the oracle.
    pub score: f64,
    /// Oracle's self-reported certainty, in [0, 1].
    pub confidence: f64,
    /// Explanation of the score.
    pub explanation: String,
    /// Whether the answer is considered correct.
    pub is_correct: bool,
    /// Whether a human must confirm this evaluation.
    pub needs_human_review: bool,
    /// Lifecycle status.
    pub status: EvaluationStatus,
    /// When the oracle produced this evaluation.
    pub evaluated_at: DateTime<Utc>,
    /// Whether a human has reviewed this evaluation.
    pub reviewed_by_human: bool,
    /// Score set by the human reviewer, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_override_score: Option<f64>,
    /// Notes from the human reviewer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_notes: Option<String>,
}

impl Evaluation {
    /// Create an AI evaluation, validating ranges and deriving the review
    /// flag from confidence.
    pub fn new(
        question_id: impl Into<String>,
        score: f64,
        confidence: f64,
        explanation: impl Into<String>,
        is_correct: bool,
    ) -> Result<Self, ValidationError> {
        if score < 0.0 {
            return Err(ValidationError::NegativeScore { value: score });
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ValidationError::ConfidenceOutOfRange { value: confidence });
        }

        let explanation = explanation.into();
        if explanation.trim().is_empty() {
            return Err(ValidationError::EmptyField {
                field: "explanation",
            });
        }

        Ok(Self {
            question_id: question_id.into(),
            score,
            confidence,
            explanation,
            is_correct,
            needs_human_review: confidence < DEFAULT_CONFIDENCE_THRESHOLD,
            status: EvaluationStatus::AiEvaluated,
            evaluated_at: Utc::now(),
            reviewed_by_human: false,
            human_override_score: None,
            human_notes: None,
        })
    }

    /// Placeholder substituted when the oracle fails for a question.
    /// Always flagged for human review.
    pub fn degraded(question_id: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            score: 0.0,
            confidence: 0.0,
            explanation: explanation.into(),
            is_correct: false,
            needs_human_review: true,
            status: EvaluationStatus::Pending,
            evaluated_at: Utc::now(),
            reviewed_by_human: false,
            human_override_score: None,
            human_notes: None,
        }
    }

    /// Request or clear human review. The derived flag still wins: low
    /// confidence cannot be cleared.
    pub fn set_needs_review(&mut self, flag: bool) {
        self.needs_human_review = flag || self.confidence < DEFAULT_CONFIDENCE_THRESHOLD;
    }

    /// The score that counts towards totals: the human override when
    /// present, the AI score otherwise.
    pub fn final_score(&self) -> f64 {
        self.human_override_score.unwrap_or(self.score)
    }

    /// Record a human reviewer's verdict.
    pub fn apply_human_feedback(&mut self, score: f64, notes: Option<String>) {
        self.human_override_score = Some(score);
        self.human_notes = notes;
        self.reviewed_by_human = true;
        self.status = EvaluationStatus::HumanReviewed;
    }
}

/// Feedback supplied by a human reviewer for one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanFeedback {
    /// Replacement score for the totals.
    pub score: f64,
    /// Free-text notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A complete assessment: questions plus their evaluations and the score
/// rollup. Totals are recomputed from scratch by the aggregator, never
/// cached stale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub id: String,
    pub title: String,
    pub questions: Vec<Question>,
    pub evaluations: Vec<Evaluation>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub total_score: f64,
    pub max_possible_score: f64,
    pub percentage: f64,
}

impl Assessment {
    /// Create an assessment over a set of questions, with no evaluations yet.
    pub fn new(id: impl Into<String>, title: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            questions,
            evaluations: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
            total_score: 0.0,
            max_possible_score: 0.0,
            percentage: 0.0,
        }
    }

    /// Questions flagged for review that a human has not yet looked at.
    pub fn questions_needing_review(&self) -> Vec<&Question> {
        let review_ids: Vec<&str> = self
            .evaluations
            .iter()
            .filter(|e| e.needs_human_review && !e.reviewed_by_human)
            .map(|e| e.question_id.as_str())
            .collect();

        self.questions
            .iter()
            .filter(|q| review_ids.contains(&q.id.as_str()))
            .collect()
    }
}

/// A derived strength or weakness for one topic.
///
/// Ephemeral: computed fresh per report generation, never persisted on its
/// own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceArea {
    /// Topic label, "General" when questions carry none.
    pub category: String,
    /// Human-readable description.
    pub description: String,
    /// Supporting evidence lines.
    pub evidence: Vec<String>,
    /// The topic's average percentage.
    pub score_impact: f64,
}

/// Per-question entry in the report's detailed results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question: String,
    pub user_answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_answer: Option<String>,
    pub score: f64,
    pub max_score: f64,
    pub is_correct: bool,
    pub explanation: String,
    pub confidence: f64,
    pub human_reviewed: bool,
}

/// Statistical summary attached to a report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub total_questions: usize,
    pub correct_count: usize,
    pub average_confidence: f64,
    pub human_reviewed_count: usize,
    pub total_score: f64,
    pub max_possible_score: f64,
    pub percentage: f64,
}

/// The final assessment report. Immutable once generated; regenerating
/// replaces it wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub assessment_id: String,
    pub generated_at: DateTime<Utc>,
    pub summary: String,
    pub strengths: Vec<PerformanceArea>,
    pub weaknesses: Vec<PerformanceArea>,
    pub recommendations: Vec<String>,
    pub detailed_results: BTreeMap<String, QuestionResult>,
    pub statistics: Statistics,
}
