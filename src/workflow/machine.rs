//! The workflow state machine.
//!
//! Each stage is a function from state to state. [`WorkflowMachine::advance`]
//! runs stages in order until the run finishes, suspends for human review,
//! or a stage fails. A stage failure is recorded in `state.error` and never
//! propagates past the machine; advancing again retries the failed stage.

use crate::analysis::{self, analyze};
use crate::error::GradeflowError;
use crate::evaluator::{batch_evaluate, AnswerOracle};
use crate::models::{
    Assessment, Evaluation, EvaluationStatus, HumanFeedback, QuestionResult, Report, Statistics,
};
use crate::parser::{QuestionParser, TextExtractor};
use crate::workflow::state::{DocumentInput, Stage, WorkflowState};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tunables for the machine.
#[derive(Debug, Clone)]
pub struct MachineConfig {
    /// Confidence below this routes an evaluation to human review.
    pub confidence_threshold: f64,
    /// Oracle calls in flight at once during evaluation.
    pub concurrency: usize,
    /// Max score assigned to parsed questions.
    pub default_max_score: f64,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: crate::models::DEFAULT_CONFIDENCE_THRESHOLD,
            concurrency: 4,
            default_max_score: 10.0,
        }
    }
}

/// Executes workflow stages against a [`WorkflowState`].
pub struct WorkflowMachine {
    oracle: Arc<dyn AnswerOracle>,
    extractor: Arc<dyn TextExtractor>,
    parser: QuestionParser,
    config: MachineConfig,
}

impl WorkflowMachine {
    pub fn new(
        oracle: Arc<dyn AnswerOracle>,
        extractor: Arc<dyn TextExtractor>,
        config: MachineConfig,
    ) -> Self {
        let parser = QuestionParser::new(config.default_max_score);
        Self {
            oracle,
            extractor,
            parser,
            config,
        }
    }

    /// Run stages until the workflow completes, suspends at human review,
    /// or a stage fails.
    ///
    /// Calling this on a state suspended at human review resumes past it:
    /// pending feedback is applied and the run continues to completion.
    /// Calling it on a state with a recorded error clears the error and
    /// retries the stage that failed.
    pub async fn advance(&self, state: &mut WorkflowState) {
        state.error = None;

        while !state.current_step.is_terminal() {
            let stage = state.current_step;
            debug!("Workflow {}: running stage {}", state.id, stage);

            let outcome = match stage {
                Stage::Ingest => self.ingest(state),
                Stage::Evaluate => self.evaluate(state).await,
                Stage::CheckConfidence => self.check_confidence(state),
                Stage::HumanReview => self.human_review(state),
                Stage::Finalize => self.finalize(state),
                Stage::GenerateReport => self.generate_report(state),
                Stage::Done => break,
            };

            state.updated_at = Utc::now();

            match outcome {
                Ok(next) => {
                    debug_assert!(stage.can_transition_to(next));
                    state.current_step = next;

                    if next == Stage::Done {
                        state.completed = true;
                        info!("Workflow {} completed", state.id);
                        return;
                    }
                    // Landing at the suspension point hands control back to
                    // the caller; the stage itself runs on the next advance.
                    if next == Stage::HumanReview {
                        info!(
                            "Workflow {} suspended: {} question(s) need review",
                            state.id,
                            state.questions_needing_review.len()
                        );
                        return;
                    }
                }
                Err(e) => {
                    warn!("Workflow {}: stage {} failed: {}", state.id, stage, e);
                    state.error = Some(e.to_string());
                    return;
                }
            }
        }
    }

    /// Extract questions from the input document.
    fn ingest(&self, state: &mut WorkflowState) -> Result<Stage, GradeflowError> {
        let questions = match &state.input {
            DocumentInput::Path { path } => {
                self.parser.parse_file(self.extractor.as_ref(), path)?
            }
            DocumentInput::Text { text } => self.parser.parse(text),
        };

        if questions.is_empty() {
            return Err(GradeflowError::Input(
                "no questions found in document".to_string(),
            ));
        }

        info!(
            "Workflow {}: ingested {} questions",
            state.id,
            questions.len()
        );
        state.questions = questions;
        Ok(Stage::Evaluate)
    }

    /// Score every answer through the oracle.
    async fn evaluate(&self, state: &mut WorkflowState) -> Result<Stage, GradeflowError> {
        state.evaluations = batch_evaluate(
            self.oracle.as_ref(),
            &state.questions,
            self.config.confidence_threshold,
            self.config.concurrency,
        )
        .await;

        Ok(Stage::CheckConfidence)
    }

    /// Apply the confidence gate and pick the branch.
    fn check_confidence(&self, state: &mut WorkflowState) -> Result<Stage, GradeflowError> {
        analysis::apply_threshold(&mut state.evaluations, self.config.confidence_threshold);
        state.questions_needing_review =
            analysis::review_ids(&state.evaluations, self.config.confidence_threshold);

        if state.questions_needing_review.is_empty() {
            Ok(Stage::Finalize)
        } else {
            Ok(Stage::HumanReview)
        }
    }

    /// Apply reviewer feedback collected while suspended. Flagged questions
    /// without feedback keep their AI score.
    fn human_review(&self, state: &mut WorkflowState) -> Result<Stage, GradeflowError> {
        apply_feedback(&mut state.evaluations, &state.human_feedback);

        for id in &state.questions_needing_review {
            if !state.human_feedback.contains_key(id) {
                warn!(
                    "Workflow {}: question {} flagged for review but received no feedback",
                    state.id, id
                );
            }
        }

        Ok(Stage::Finalize)
    }

    /// Assemble the assessment and compute final totals.
    fn finalize(&self, state: &mut WorkflowState) -> Result<Stage, GradeflowError> {
        // Feedback supplied after the review stage ran still counts, up to
        // this point.
        apply_feedback(&mut state.evaluations, &state.human_feedback);

        let mut assessment =
            Assessment::new(state.id.clone(), state.title.clone(), state.questions.clone());
        assessment.evaluations = state.evaluations.clone();

        analysis::aggregate(&mut assessment);

        for evaluation in &mut assessment.evaluations {
            if !evaluation.reviewed_by_human {
                evaluation.status = EvaluationStatus::Completed;
            }
        }
        assessment.completed_at = Some(Utc::now());

        info!(
            "Workflow {}: finalized at {:.1}% ({:.1}/{:.1})",
            state.id,
            assessment.percentage,
            assessment.total_score,
            assessment.max_possible_score
        );

        state.evaluations = assessment.evaluations.clone();
        state.assessment = Some(assessment);
        Ok(Stage::GenerateReport)
    }

    /// Build the report from the finalized assessment.
    fn generate_report(&self, state: &mut WorkflowState) -> Result<Stage, GradeflowError> {
        let assessment = state.assessment.as_ref().ok_or_else(|| {
            GradeflowError::Input("cannot generate a report before finalization".to_string())
        })?;

        state.report = Some(build_report(assessment));
        Ok(Stage::Done)
    }
}

fn apply_feedback(evaluations: &mut [Evaluation], feedback: &HashMap<String, HumanFeedback>) {
    for evaluation in evaluations.iter_mut() {
        if let Some(entry) = feedback.get(&evaluation.question_id) {
            evaluation.apply_human_feedback(entry.score, entry.notes.clone());
        }
    }
}

/// Assemble the full report for a finalized assessment.
pub fn build_report(assessment: &Assessment) -> Report {
    let analysis = analyze(assessment);

    let mut detailed_results = BTreeMap::new();
    for question in &assessment.questions {
        let Some(evaluation) = assessment
            .evaluations
            .iter()
            .find(|e| e.question_id == question.id)
        else {
            continue;
        };

        detailed_results.insert(
            question.id.clone(),
            QuestionResult {
                question: question.text.clone(),
                user_answer: question.user_answer.clone(),
                reference_answer: question.reference_answer.clone(),
                score: evaluation.final_score(),
                max_score: question.max_score,
                is_correct: evaluation.is_correct,
                explanation: evaluation.explanation.clone(),
                confidence: evaluation.confidence,
                human_reviewed: evaluation.reviewed_by_human,
            },
        );
    }

    let statistics = build_statistics(assessment);

    Report {
        assessment_id: assessment.id.clone(),
        generated_at: Utc::now(),
        summary: analysis.summary,
        strengths: analysis.strengths,
        weaknesses: analysis.weaknesses,
        recommendations: analysis.recommendations,
        detailed_results,
        statistics,
    }
}

fn build_statistics(assessment: &Assessment) -> Statistics {
    let total_questions = assessment.questions.len();
    let correct_count = assessment
        .evaluations
        .iter()
        .filter(|e| e.is_correct)
        .count();
    let human_reviewed_count = assessment
        .evaluations
        .iter()
        .filter(|e| e.reviewed_by_human)
        .count();
    let average_confidence = if assessment.evaluations.is_empty() {
        0.0
    } else {
        assessment.evaluations.iter().map(|e| e.confidence).sum::<f64>()
            / assessment.evaluations.len() as f64
    };

    Statistics {
        total_questions,
        correct_count,
        average_confidence,
        human_reviewed_count,
        total_score: assessment.total_score,
        max_possible_score: assessment.max_possible_score,
        percentage: assessment.percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OracleError;
    use crate::evaluator::OracleScore;
    use crate::models::Question;
    use crate::parser::PlainTextExtractor;
    use async_trait::async_trait;

    /// Oracle returning a fixed confidence and a score proportional to the
    /// question's max.
    struct FixedOracle {
        confidence: f64,
        fraction: f64,
    }

    #[async_trait]
    impl AnswerOracle for FixedOracle {
        async fn score_answer(&self, question: &Question) -> Result<OracleScore, OracleError> {
            Ok(OracleScore {
                score: question.max_score * self.fraction,
                confidence: self.confidence,
                is_correct: self.fraction >= 0.5,
                explanation: "fixed verdict".to_string(),
            })
        }
    }

    fn machine(confidence: f64, fraction: f64) -> WorkflowMachine {
        WorkflowMachine::new(
            Arc::new(FixedOracle {
                confidence,
                fraction,
            }),
            Arc::new(PlainTextExtractor),
            MachineConfig::default(),
        )
    }

    const DOC: &str = "Q: What is 2 + 2?\nA: 4\n\nQ: What is 3 + 3?\nA: 6\n";

    #[tokio::test]
    async fn test_confident_run_completes_without_review() {
        let machine = machine(0.95, 0.8);
        let mut state = WorkflowState::new("w1", "Quiz", DocumentInput::text(DOC));

        machine.advance(&mut state).await;

        assert_eq!(state.current_step, Stage::Done);
        assert!(state.completed);
        assert!(state.error.is_none());
        assert!(state.questions_needing_review.is_empty());
        assert_eq!(state.questions.len(), 2);
        assert_eq!(state.evaluations.len(), 2);

        let assessment = state.assessment.as_ref().unwrap();
        assert_eq!(assessment.total_score, 16.0);
        assert_eq!(assessment.max_possible_score, 20.0);
        assert!(assessment.completed_at.is_some());

        let report = state.report.as_ref().unwrap();
        assert_eq!(report.assessment_id, "w1");
        assert_eq!(report.statistics.total_questions, 2);
        assert_eq!(report.detailed_results.len(), 2);
    }

    #[tokio::test]
    async fn test_low_confidence_suspends_at_review() {
        let machine = machine(0.4, 0.8);
        let mut state = WorkflowState::new("w1", "Quiz", DocumentInput::text(DOC));

        machine.advance(&mut state).await;

        assert_eq!(state.current_step, Stage::HumanReview);
        assert!(state.awaiting_review());
        assert!(!state.completed);
        assert_eq!(
            state.questions_needing_review,
            vec!["q1".to_string(), "q2".to_string()]
        );
        assert!(state.report.is_none());
    }

    #[tokio::test]
    async fn test_resume_applies_feedback_and_completes() {
        let machine = machine(0.4, 0.3);
        let mut state = WorkflowState::new("w1", "Quiz", DocumentInput::text(DOC));

        machine.advance(&mut state).await;
        assert!(state.awaiting_review());

        state.human_feedback.insert(
            "q1".to_string(),
            HumanFeedback {
                score: 10.0,
                notes: Some("Correct after all".to_string()),
            },
        );

        machine.advance(&mut state).await;

        assert_eq!(state.current_step, Stage::Done);
        assert!(state.completed);

        let assessment = state.assessment.as_ref().unwrap();
        // q1 overridden to 10, q2 keeps its AI score of 3.
        assert_eq!(assessment.total_score, 13.0);

        let q1 = &assessment.evaluations[0];
        assert!(q1.reviewed_by_human);
        assert_eq!(q1.status, EvaluationStatus::HumanReviewed);
        assert_eq!(q1.score, 3.0);

        let q2 = &assessment.evaluations[1];
        assert!(!q2.reviewed_by_human);
        assert_eq!(q2.status, EvaluationStatus::Completed);

        let report = state.report.as_ref().unwrap();
        assert_eq!(report.statistics.human_reviewed_count, 1);
        assert!(report.detailed_results["q1"].human_reviewed);
        assert_eq!(report.detailed_results["q1"].score, 10.0);
    }

    #[tokio::test]
    async fn test_empty_document_records_error_and_halts() {
        let machine = machine(0.95, 0.8);
        let mut state =
            WorkflowState::new("w1", "Quiz", DocumentInput::text("no markers here"));

        machine.advance(&mut state).await;

        assert_eq!(state.current_step, Stage::Ingest);
        assert!(!state.completed);
        let error = state.error.as_ref().unwrap();
        assert!(error.contains("no questions found"));

        // Retrying clears the old error before re-running the stage.
        machine.advance(&mut state).await;
        assert!(state.error.is_some());
        assert_eq!(state.current_step, Stage::Ingest);
    }

    #[tokio::test]
    async fn test_oracle_failure_degrades_not_halts() {
        struct FailingOracle;

        #[async_trait]
        impl AnswerOracle for FailingOracle {
            async fn score_answer(&self, _: &Question) -> Result<OracleScore, OracleError> {
                Err(OracleError::MalformedResponse("down".into()))
            }
        }

        let machine = WorkflowMachine::new(
            Arc::new(FailingOracle),
            Arc::new(PlainTextExtractor),
            MachineConfig::default(),
        );
        let mut state = WorkflowState::new("w1", "Quiz", DocumentInput::text(DOC));

        machine.advance(&mut state).await;

        // Degraded evaluations flow through the gate and suspend for review.
        assert!(state.error.is_none());
        assert!(state.awaiting_review());
        assert_eq!(state.evaluations.len(), 2);
        assert!(state.evaluations.iter().all(|e| e.score == 0.0));
    }

    #[tokio::test]
    async fn test_resume_without_feedback_keeps_ai_scores() {
        let machine = machine(0.4, 0.6);
        let mut state = WorkflowState::new("w1", "Quiz", DocumentInput::text(DOC));

        machine.advance(&mut state).await;
        assert!(state.awaiting_review());

        machine.advance(&mut state).await;

        assert!(state.completed);
        let assessment = state.assessment.as_ref().unwrap();
        assert_eq!(assessment.total_score, 12.0);
        assert_eq!(
            assessment.evaluations.iter().filter(|e| e.reviewed_by_human).count(),
            0
        );
    }

    #[tokio::test]
    async fn test_ingest_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::with_suffix(".txt").unwrap();
        file.write_all(DOC.as_bytes()).unwrap();

        let machine = machine(0.95, 1.0);
        let mut state =
            WorkflowState::new("w1", "Quiz", DocumentInput::path(file.path()));

        machine.advance(&mut state).await;

        assert!(state.completed);
        assert_eq!(state.assessment.as_ref().unwrap().percentage, 100.0);
    }
}
