//! Workflow state: the checkpointable record of one assessment run.
//!
//! The state is plain serializable data. Everything the machine needs to
//! resume a run lives here; nothing is reconstructed from outside the
//! state except the oracle and extractor handles.

use crate::models::{Assessment, Evaluation, HumanFeedback, Question, Report};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Where the assessment document comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentInput {
    /// A file on disk, format inferred from the extension.
    Path { path: PathBuf },
    /// Raw text submitted directly.
    Text { text: String },
}

impl DocumentInput {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        DocumentInput::Path { path: path.into() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        DocumentInput::Text { text: text.into() }
    }
}

/// Stages of the evaluation workflow.
///
/// The only branch point is [`Stage::CheckConfidence`], which routes to
/// human review or straight to finalization. [`Stage::HumanReview`] is the
/// suspension point: the machine stops there and waits for the caller to
/// advance again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Ingest,
    Evaluate,
    CheckConfidence,
    HumanReview,
    Finalize,
    GenerateReport,
    Done,
}

impl Stage {
    /// Stages this stage may transition to.
    pub fn successors(self) -> &'static [Stage] {
        match self {
            Stage::Ingest => &[Stage::Evaluate],
            Stage::Evaluate => &[Stage::CheckConfidence],
            Stage::CheckConfidence => &[Stage::HumanReview, Stage::Finalize],
            Stage::HumanReview => &[Stage::Finalize],
            Stage::Finalize => &[Stage::GenerateReport],
            Stage::GenerateReport => &[Stage::Done],
            Stage::Done => &[],
        }
    }

    /// Whether `next` is a legal transition out of this stage.
    pub fn can_transition_to(self, next: Stage) -> bool {
        self.successors().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Ingest => "ingest",
            Stage::Evaluate => "evaluate",
            Stage::CheckConfidence => "check_confidence",
            Stage::HumanReview => "human_review",
            Stage::Finalize => "finalize",
            Stage::GenerateReport => "generate_report",
            Stage::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// The complete, serializable state of one workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Opaque workflow identifier, assigned at start.
    pub id: String,
    /// Assessment title, usually derived from the document name.
    pub title: String,
    /// The document being evaluated.
    pub input: DocumentInput,
    /// Questions extracted during ingest.
    pub questions: Vec<Question>,
    /// Per-question evaluations, in question order once evaluated.
    pub evaluations: Vec<Evaluation>,
    /// The finalized assessment, present after the finalize stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<Assessment>,
    /// The generated report, present after the generate_report stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Report>,
    /// Question ids the confidence gate flagged for review.
    pub questions_needing_review: Vec<String>,
    /// Reviewer feedback keyed by question id, applied at finalize.
    pub human_feedback: HashMap<String, HumanFeedback>,
    /// The stage the machine will execute next.
    pub current_step: Stage,
    /// Message from the last failed stage, cleared when the stage is retried.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// True once the workflow has reached the terminal stage.
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowState {
    /// Fresh state at the start of the pipeline.
    pub fn new(id: impl Into<String>, title: impl Into<String>, input: DocumentInput) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            input,
            questions: Vec::new(),
            evaluations: Vec::new(),
            assessment: None,
            report: None,
            questions_needing_review: Vec::new(),
            human_feedback: HashMap::new(),
            current_step: Stage::Ingest,
            error: None,
            completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the machine is suspended waiting for human review.
    pub fn awaiting_review(&self) -> bool {
        self.current_step == Stage::HumanReview && self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        assert!(Stage::Ingest.can_transition_to(Stage::Evaluate));
        assert!(Stage::CheckConfidence.can_transition_to(Stage::HumanReview));
        assert!(Stage::CheckConfidence.can_transition_to(Stage::Finalize));
        assert!(Stage::HumanReview.can_transition_to(Stage::Finalize));
        assert!(Stage::GenerateReport.can_transition_to(Stage::Done));

        // No skipping and no going back.
        assert!(!Stage::Ingest.can_transition_to(Stage::CheckConfidence));
        assert!(!Stage::Evaluate.can_transition_to(Stage::Ingest));
        assert!(!Stage::HumanReview.can_transition_to(Stage::GenerateReport));
        assert!(Stage::Done.successors().is_empty());
        assert!(Stage::Done.is_terminal());
    }

    #[test]
    fn test_new_state_starts_at_ingest() {
        let state = WorkflowState::new("w1", "Quiz", DocumentInput::text("Q: x\nA: y"));
        assert_eq!(state.current_step, Stage::Ingest);
        assert!(!state.completed);
        assert!(state.error.is_none());
        assert!(state.questions.is_empty());
        assert!(!state.awaiting_review());
    }

    #[test]
    fn test_state_serde_round_trip() {
        let mut state = WorkflowState::new("w1", "Quiz", DocumentInput::path("/tmp/quiz.txt"));
        state.current_step = Stage::HumanReview;
        state.questions_needing_review = vec!["q2".to_string()];
        state
            .human_feedback
            .insert("q2".to_string(), HumanFeedback { score: 7.0, notes: None });

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"human_review\""));

        let back: WorkflowState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "w1");
        assert_eq!(back.current_step, Stage::HumanReview);
        assert!(back.awaiting_review());
        assert_eq!(back.human_feedback["q2"].score, 7.0);
    }

    #[test]
    fn test_stage_display_names() {
        assert_eq!(Stage::CheckConfidence.to_string(), "check_confidence");
        assert_eq!(Stage::GenerateReport.to_string(), "generate_report");
    }
}
