//! Score aggregation: rolls per-question evaluations up into assessment
//! totals.

use crate::models::{Assessment, Evaluation};
use std::collections::HashMap;
use tracing::warn;

/// Recompute an assessment's totals from scratch.
///
/// Evaluations are re-aligned to questions by id, in question order. A
/// question without a matching evaluation gets a degraded placeholder
/// (score 0, confidence 0, flagged for review); an evaluation without a
/// matching question is discarded. Score bounds are enforced here: the AI
/// score is clamped into [0, max_score]. The human override replaces the
/// AI score in the totals only; `is_correct` and the explanation are left
/// alone. Repeated calls over unchanged inputs produce identical totals.
pub fn aggregate(assessment: &mut Assessment) {
    let mut by_id: HashMap<String, Evaluation> = assessment
        .evaluations
        .drain(..)
        .map(|e| (e.question_id.clone(), e))
        .collect();

    let mut aligned = Vec::with_capacity(assessment.questions.len());
    for question in &assessment.questions {
        let mut evaluation = by_id.remove(&question.id).unwrap_or_else(|| {
            warn!(
                "Question {} has no evaluation; scoring it as zero",
                question.id
            );
            Evaluation::degraded(
                &question.id,
                format!("No evaluation was recorded for question {}", question.id),
            )
        });

        evaluation.score = evaluation.score.clamp(0.0, question.max_score);
        aligned.push(evaluation);
    }

    for orphan_id in by_id.keys() {
        warn!("Discarding evaluation for unknown question {}", orphan_id);
    }

    assessment.evaluations = aligned;
    assessment.max_possible_score = assessment.questions.iter().map(|q| q.max_score).sum();
    assessment.total_score = assessment
        .evaluations
        .iter()
        .map(|e| e.final_score())
        .sum();
    assessment.percentage = if assessment.max_possible_score > 0.0 {
        (assessment.total_score / assessment.max_possible_score) * 100.0
    } else {
        0.0
    };
}
