//! Answer evaluation: the oracle seam and batch orchestration.
//!
//! The oracle itself sits behind [`AnswerOracle`]; the shipped
//! implementation talks to Ollama. Batch evaluation issues per-question
//! calls concurrently but re-associates results by question id, never by
//! completion order, and a failure for one question degrades only that
//! question.

mod ollama;

pub use ollama::{OllamaConfig, OllamaEvaluator};

use crate::error::OracleError;
use crate::models::{Evaluation, Question};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Raw verdict from the oracle for one answer.
#[derive(Debug, Clone)]
pub struct OracleScore {
    pub score: f64,
    pub confidence: f64,
    pub is_correct: bool,
    pub explanation: String,
}

/// Scores a single answer. Implementations must be safe to call
/// concurrently.
#[async_trait]
pub trait AnswerOracle: Send + Sync {
    async fn score_answer(&self, question: &Question) -> Result<OracleScore, OracleError>;
}

/// Evaluate every question, up to `concurrency` calls in flight at once.
///
/// Always returns exactly one evaluation per question, in question order.
/// A failed oracle call resolves to a degraded placeholder (score 0,
/// confidence 0, flagged for review) without affecting the other questions.
pub async fn batch_evaluate(
    oracle: &dyn AnswerOracle,
    questions: &[Question],
    threshold: f64,
    concurrency: usize,
) -> Vec<Evaluation> {
    debug!(
        "Evaluating {} questions (concurrency {})",
        questions.len(),
        concurrency
    );

    let calls = questions.iter().map(|q| async move {
        let verdict = oracle.score_answer(q).await;
        (q, verdict)
    });

    let mut by_id: HashMap<String, Evaluation> = stream::iter(calls)
        .buffer_unordered(concurrency.max(1))
        .map(|(question, verdict)| {
            let evaluation = match verdict {
                Ok(score) => into_evaluation(question, score, threshold),
                Err(e) => {
                    warn!("Oracle failed for question {}: {}", question.id, e);
                    Evaluation::degraded(&question.id, format!("Evaluation failed: {}", e))
                }
            };
            (question.id.clone(), evaluation)
        })
        .collect()
        .await;

    // Re-associate by id so the output order matches the question order.
    questions
        .iter()
        .map(|q| {
            by_id
                .remove(&q.id)
                .unwrap_or_else(|| Evaluation::degraded(&q.id, "No evaluation was produced"))
        })
        .collect()
}

/// Convert an oracle verdict into an evaluation, clamping out-of-range
/// values the oracle may emit and applying the configured review threshold.
fn into_evaluation(question: &Question, verdict: OracleScore, threshold: f64) -> Evaluation {
    let score = verdict.score.clamp(0.0, question.max_score);
    let confidence = verdict.confidence.clamp(0.0, 1.0);
    let explanation = if verdict.explanation.trim().is_empty() {
        "No explanation provided".to_string()
    } else {
        verdict.explanation
    };

    match Evaluation::new(&question.id, score, confidence, explanation, verdict.is_correct) {
        Ok(mut evaluation) => {
            evaluation.set_needs_review(confidence < threshold);
            evaluation
        }
        Err(e) => Evaluation::degraded(&question.id, format!("Evaluation failed: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Oracle scripted per question id; unknown or listed ids fail.
    struct ScriptedOracle {
        scores: HashMap<String, (f64, f64, bool)>,
        fail_ids: Vec<String>,
    }

    #[async_trait]
    impl AnswerOracle for ScriptedOracle {
        async fn score_answer(&self, question: &Question) -> Result<OracleScore, OracleError> {
            if self.fail_ids.contains(&question.id) {
                return Err(OracleError::MalformedResponse("scripted failure".into()));
            }
            let (score, confidence, is_correct) = self
                .scores
                .get(&question.id)
                .copied()
                .ok_or_else(|| OracleError::MalformedResponse("no script entry".into()))?;
            Ok(OracleScore {
                score,
                confidence,
                is_correct,
                explanation: format!("scripted verdict for {}", question.id),
            })
        }
    }

    fn make_questions(n: usize) -> Vec<Question> {
        (1..=n)
            .map(|i| Question::new(format!("q{}", i), format!("Question {}", i), "answer", 10.0).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_batch_preserves_question_order() {
        let questions = make_questions(3);
        let oracle = ScriptedOracle {
            scores: [
                ("q1".to_string(), (8.0, 0.9, true)),
                ("q2".to_string(), (6.0, 0.8, true)),
                ("q3".to_string(), (4.0, 0.95, false)),
            ]
            .into_iter()
            .collect(),
            fail_ids: vec![],
        };

        let evaluations = batch_evaluate(&oracle, &questions, 0.7, 2).await;

        assert_eq!(evaluations.len(), 3);
        assert_eq!(evaluations[0].question_id, "q1");
        assert_eq!(evaluations[1].question_id, "q2");
        assert_eq!(evaluations[2].question_id, "q3");
        assert_eq!(evaluations[0].score, 8.0);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_poison_batch() {
        let questions = make_questions(3);
        let oracle = ScriptedOracle {
            scores: [
                ("q1".to_string(), (8.0, 0.9, true)),
                ("q3".to_string(), (7.0, 0.85, true)),
            ]
            .into_iter()
            .collect(),
            fail_ids: vec!["q2".to_string()],
        };

        let evaluations = batch_evaluate(&oracle, &questions, 0.7, 4).await;

        assert_eq!(evaluations.len(), 3);
        assert_eq!(evaluations[0].score, 8.0);
        assert_eq!(evaluations[2].score, 7.0);

        let degraded = &evaluations[1];
        assert_eq!(degraded.score, 0.0);
        assert_eq!(degraded.confidence, 0.0);
        assert!(degraded.needs_human_review);
        assert!(degraded.explanation.contains("Evaluation failed"));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let oracle = ScriptedOracle {
            scores: HashMap::new(),
            fail_ids: vec![],
        };
        let evaluations = batch_evaluate(&oracle, &[], 0.7, 4).await;
        assert!(evaluations.is_empty());
    }

    #[tokio::test]
    async fn test_oracle_values_are_clamped() {
        let questions = make_questions(1);
        let oracle = ScriptedOracle {
            scores: [("q1".to_string(), (25.0, 0.9, true))].into_iter().collect(),
            fail_ids: vec![],
        };

        let evaluations = batch_evaluate(&oracle, &questions, 0.7, 1).await;
        assert_eq!(evaluations[0].score, 10.0);
    }

    #[tokio::test]
    async fn test_custom_threshold_flags_review() {
        let questions = make_questions(1);
        let oracle = ScriptedOracle {
            scores: [("q1".to_string(), (8.0, 0.85, true))].into_iter().collect(),
            fail_ids: vec![],
        };

        // Confidence 0.85 is fine at the default threshold but not at 0.9.
        let evaluations = batch_evaluate(&oracle, &questions, 0.9, 1).await;
        assert!(evaluations[0].needs_human_review);
    }
}
