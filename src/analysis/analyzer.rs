//! Performance analysis: topic strengths, weaknesses, recommendations,
//! and the executive summary.

use crate::models::{Assessment, PerformanceArea};
use std::collections::BTreeMap;

/// Topic average at or above this is a strength.
pub const STRENGTH_THRESHOLD: f64 = 80.0;
/// Topic average strictly below this is a weakness.
pub const WEAKNESS_THRESHOLD: f64 = 60.0;

/// Fallback bucket for questions without a topic label.
const GENERAL_TOPIC: &str = "General";

/// Everything the analyzer derives from a finalized assessment.
#[derive(Debug, Clone)]
pub struct PerformanceAnalysis {
    pub strengths: Vec<PerformanceArea>,
    pub weaknesses: Vec<PerformanceArea>,
    pub recommendations: Vec<String>,
    pub summary: String,
}

/// Derive topic-level strengths and weaknesses, recommendations, and a
/// summary paragraph.
///
/// The topic breakdown uses the raw AI score; the headline percentage on
/// the assessment reflects human overrides. Topic average >= 80 is a
/// strength, < 60 a weakness, the band between is neutral.
pub fn analyze(assessment: &Assessment) -> PerformanceAnalysis {
    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();

    for (topic, scores) in topic_percentages(assessment) {
        let avg = scores.iter().sum::<f64>() / scores.len() as f64;

        if avg >= STRENGTH_THRESHOLD {
            strengths.push(PerformanceArea {
                category: topic.clone(),
                description: format!(
                    "Strong performance in {} with {:.1}% average",
                    topic, avg
                ),
                evidence: vec![format!("{} questions answered well", scores.len())],
                score_impact: avg,
            });
        } else if avg < WEAKNESS_THRESHOLD {
            weaknesses.push(PerformanceArea {
                category: topic.clone(),
                description: format!(
                    "Needs improvement in {} with {:.1}% average",
                    topic, avg
                ),
                evidence: vec![format!("{} questions need review", scores.len())],
                score_impact: avg,
            });
        }
    }

    let recommendations = build_recommendations(assessment, &weaknesses);
    let summary = build_summary(assessment);

    PerformanceAnalysis {
        strengths,
        weaknesses,
        recommendations,
        summary,
    }
}

/// Per-question percentages grouped by topic. Questions without a topic
/// collapse into the "General" bucket. Topics come back in a stable
/// (alphabetical) order so report output is deterministic.
fn topic_percentages(assessment: &Assessment) -> BTreeMap<String, Vec<f64>> {
    let mut buckets: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for question in &assessment.questions {
        let Some(evaluation) = assessment
            .evaluations
            .iter()
            .find(|e| e.question_id == question.id)
        else {
            continue;
        };

        let topic = question
            .topic
            .clone()
            .unwrap_or_else(|| GENERAL_TOPIC.to_string());
        let pct = (evaluation.score / question.max_score) * 100.0;
        buckets.entry(topic).or_default().push(pct);
    }

    buckets
}

fn build_recommendations(assessment: &Assessment, weaknesses: &[PerformanceArea]) -> Vec<String> {
    let mut recommendations = Vec::new();

    if assessment.percentage < WEAKNESS_THRESHOLD {
        recommendations
            .push("Review fundamental concepts before proceeding to advanced topics".to_string());
    }

    for weakness in weaknesses {
        recommendations.push(format!("Focus additional study on {}", weakness.category));
    }

    if recommendations.is_empty() {
        recommendations.push("Continue building on this strong foundation".to_string());
    }

    recommendations
}

fn build_summary(assessment: &Assessment) -> String {
    let total_questions = assessment.questions.len();
    let correct = assessment
        .evaluations
        .iter()
        .filter(|e| e.is_correct)
        .count();

    let tier = if assessment.percentage >= STRENGTH_THRESHOLD {
        "strong"
    } else if assessment.percentage >= WEAKNESS_THRESHOLD {
        "moderate"
    } else {
        "developing"
    };

    format!(
        "Assessment completed with {:.1}% overall score.\n\n\
         - Total Questions: {}\n\
         - Correct Answers: {}\n\
         - Score: {:.1}/{:.1}\n\n\
         The assessment demonstrates {} understanding of the material.",
        assessment.percentage,
        total_questions,
        correct,
        assessment.total_score,
        assessment.max_possible_score,
        tier
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregate;
    use crate::models::{Assessment, Evaluation, Question};

    fn question(id: &str, topic: Option<&str>, max: f64) -> Question {
        let q = Question::new(id, format!("Question {}", id), "answer", max).unwrap();
        match topic {
            Some(t) => q.with_topic(t),
            None => q,
        }
    }

    fn evaluation(id: &str, score: f64, is_correct: bool) -> Evaluation {
        Evaluation::new(id, score, 0.9, "ok", is_correct).unwrap()
    }

    fn finalized(questions: Vec<Question>, evaluations: Vec<Evaluation>) -> Assessment {
        let mut assessment = Assessment::new("a1", "Test", questions);
        assessment.evaluations = evaluations;
        aggregate(&mut assessment);
        assessment
    }

    #[test]
    fn test_strength_and_weakness_classification() {
        let assessment = finalized(
            vec![
                question("q1", Some("Math"), 10.0),
                question("q2", Some("Math"), 10.0),
                question("q3", Some("History"), 10.0),
            ],
            vec![
                evaluation("q1", 10.0, true),
                evaluation("q2", 10.0, true),
                evaluation("q3", 4.0, false),
            ],
        );

        let analysis = analyze(&assessment);

        assert_eq!(analysis.strengths.len(), 1);
        assert_eq!(analysis.strengths[0].category, "Math");
        assert_eq!(analysis.strengths[0].score_impact, 100.0);

        assert_eq!(analysis.weaknesses.len(), 1);
        assert_eq!(analysis.weaknesses[0].category, "History");
        assert_eq!(analysis.weaknesses[0].score_impact, 40.0);
    }

    #[test]
    fn test_boundary_exactly_eighty_is_strength() {
        let assessment = finalized(
            vec![question("q1", Some("Math"), 10.0)],
            vec![evaluation("q1", 8.0, true)],
        );

        let analysis = analyze(&assessment);
        assert_eq!(analysis.strengths.len(), 1);
        assert!(analysis.weaknesses.is_empty());
    }

    #[test]
    fn test_boundary_exactly_sixty_is_neutral() {
        let assessment = finalized(
            vec![question("q1", Some("Math"), 10.0)],
            vec![evaluation("q1", 6.0, true)],
        );

        let analysis = analyze(&assessment);
        assert!(analysis.strengths.is_empty());
        assert!(analysis.weaknesses.is_empty());
    }

    #[test]
    fn test_missing_topic_collapses_into_general() {
        let assessment = finalized(
            vec![question("q1", None, 10.0), question("q2", None, 10.0)],
            vec![evaluation("q1", 9.0, true), evaluation("q2", 10.0, true)],
        );

        let analysis = analyze(&assessment);
        assert_eq!(analysis.strengths.len(), 1);
        assert_eq!(analysis.strengths[0].category, "General");
    }

    #[test]
    fn test_topic_breakdown_ignores_human_override() {
        // The override lifts the headline percentage, not the topic
        // diagnostics.
        let mut assessment = finalized(
            vec![question("q1", Some("Math"), 10.0)],
            vec![evaluation("q1", 4.0, false)],
        );
        assessment.evaluations[0].apply_human_feedback(10.0, None);
        aggregate(&mut assessment);
        assert_eq!(assessment.percentage, 100.0);

        let analysis = analyze(&assessment);
        assert_eq!(analysis.weaknesses.len(), 1);
        assert_eq!(analysis.weaknesses[0].score_impact, 40.0);
    }

    #[test]
    fn test_recommendations_prepend_fundamentals_when_low() {
        let assessment = finalized(
            vec![question("q1", Some("Math"), 10.0)],
            vec![evaluation("q1", 3.0, false)],
        );

        let analysis = analyze(&assessment);
        assert_eq!(
            analysis.recommendations[0],
            "Review fundamental concepts before proceeding to advanced topics"
        );
        assert!(analysis
            .recommendations
            .contains(&"Focus additional study on Math".to_string()));
    }

    #[test]
    fn test_recommendations_never_empty() {
        let assessment = finalized(
            vec![question("q1", Some("Math"), 10.0)],
            vec![evaluation("q1", 10.0, true)],
        );

        let analysis = analyze(&assessment);
        assert_eq!(
            analysis.recommendations,
            vec!["Continue building on this strong foundation".to_string()]
        );
    }

    #[test]
    fn test_summary_tiers() {
        let strong = finalized(
            vec![question("q1", None, 10.0)],
            vec![evaluation("q1", 9.0, true)],
        );
        assert!(analyze(&strong).summary.contains("strong understanding"));

        let moderate = finalized(
            vec![question("q1", None, 10.0)],
            vec![evaluation("q1", 7.0, true)],
        );
        assert!(analyze(&moderate).summary.contains("moderate understanding"));

        let developing = finalized(
            vec![question("q1", None, 10.0)],
            vec![evaluation("q1", 3.0, false)],
        );
        assert!(analyze(&developing)
            .summary
            .contains("developing understanding"));
    }

    #[test]
    fn test_empty_assessment() {
        let assessment = finalized(vec![], vec![]);
        let analysis = analyze(&assessment);

        assert!(analysis.strengths.is_empty());
        assert!(analysis.weaknesses.is_empty());
        assert_eq!(analysis.recommendations.len(), 1);
        assert!(analysis.summary.contains("0.0%"));
    }
}
