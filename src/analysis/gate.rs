//! Confidence gate: decides which evaluations require human review.
//!
//! The threshold is fixed at pipeline construction and applied uniformly;
//! an evaluation below it is never auto-accepted, no matter what flag it
//! was constructed with.

use crate::models::Evaluation;

/// Force the review flag on every evaluation whose confidence falls below
/// `threshold`. Flags already set stay set; this never clears one.
pub fn apply_threshold(evaluations: &mut [Evaluation], threshold: f64) {
    for evaluation in evaluations.iter_mut() {
        if evaluation.confidence < threshold {
            evaluation.needs_human_review = true;
        }
    }
}

/// Partition question ids into (needs review, auto-accept).
///
/// An evaluation needs review when its confidence is strictly below
/// `threshold` or it is already flagged (degraded evaluations arrive
/// pre-flagged). Confidence exactly at the threshold auto-accepts.
pub fn partition(evaluations: &[Evaluation], threshold: f64) -> (Vec<String>, Vec<String>) {
    let mut needs_review = Vec::new();
    let mut auto_accept = Vec::new();

    for evaluation in evaluations {
        if evaluation.needs_human_review || evaluation.confidence < threshold {
            needs_review.push(evaluation.question_id.clone());
        } else {
            auto_accept.push(evaluation.question_id.clone());
        }
    }

    (needs_review, auto_accept)
}

/// Question ids whose evaluations require human review.
pub fn review_ids(evaluations: &[Evaluation], threshold: f64) -> Vec<String> {
    partition(evaluations, threshold).0
}
