//! Markdown and JSON rendering of assessment reports.
//!
//! Rendering is the only place scores are rounded for display; the model
//! keeps full precision. Section order is fixed so regenerating a report
//! over the same assessment produces the same document.

use crate::models::{PerformanceArea, QuestionResult, Report, Statistics};
use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# Assessment Report\n\n");

    output.push_str(&generate_header_section(report));
    output.push_str(&generate_summary_section(&report.summary));
    output.push_str(&generate_statistics_section(&report.statistics));
    output.push_str(&generate_areas_section("Strengths", &report.strengths));
    output.push_str(&generate_areas_section(
        "Areas for Improvement",
        &report.weaknesses,
    ));
    output.push_str(&generate_recommendations_section(&report.recommendations));
    output.push_str(&generate_detailed_results_section(report));

    output
}

/// Generate the header with assessment metadata.
fn generate_header_section(report: &Report) -> String {
    let mut section = String::new();

    section.push_str(&format!("- **Assessment:** {}\n", report.assessment_id));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Score:** {:.1}/{:.1} ({:.1}%)\n\n",
        report.statistics.total_score,
        report.statistics.max_possible_score,
        report.statistics.percentage
    ));

    section
}

/// Generate the summary section.
fn generate_summary_section(summary: &str) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(summary);
    section.push_str("\n\n");

    section
}

/// Generate the statistics table.
fn generate_statistics_section(statistics: &Statistics) -> String {
    let mut section = String::new();

    section.push_str("## Statistics\n\n");
    section.push_str("| Metric | Value |\n");
    section.push_str("|:---|:---:|\n");
    section.push_str(&format!(
        "| Total Questions | {} |\n",
        statistics.total_questions
    ));
    section.push_str(&format!(
        "| Correct Answers | {} |\n",
        statistics.correct_count
    ));
    section.push_str(&format!(
        "| Average Confidence | {:.2} |\n",
        statistics.average_confidence
    ));
    section.push_str(&format!(
        "| Human Reviewed | {} |\n",
        statistics.human_reviewed_count
    ));
    section.push_str(&format!("| Percentage | {:.1}% |\n\n", statistics.percentage));

    section
}

/// Generate a strengths or weaknesses section. Empty lists render a short
/// note instead of an empty heading.
fn generate_areas_section(title: &str, areas: &[PerformanceArea]) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", title));

    if areas.is_empty() {
        section.push_str("*None identified.*\n\n");
        return section;
    }

    for area in areas {
        section.push_str(&format!(
            "### {} ({:.1}%)\n\n{}\n\n",
            area.category, area.score_impact, area.description
        ));
        for evidence in &area.evidence {
            section.push_str(&format!("- {}\n", evidence));
        }
        section.push('\n');
    }

    section
}

/// Generate the numbered recommendations list.
fn generate_recommendations_section(recommendations: &[String]) -> String {
    let mut section = String::new();

    section.push_str("## Recommendations\n\n");

    for (i, recommendation) in recommendations.iter().enumerate() {
        section.push_str(&format!("{}. {}\n", i + 1, recommendation));
    }
    section.push('\n');

    section
}

/// Generate the per-question results.
fn generate_detailed_results_section(report: &Report) -> String {
    let mut section = String::new();

    section.push_str("## Detailed Results\n\n");

    for (question_id, result) in &report.detailed_results {
        section.push_str(&generate_question_block(question_id, result));
    }

    section
}

/// Generate one question's block.
fn generate_question_block(question_id: &str, result: &QuestionResult) -> String {
    let mut block = String::new();

    let verdict = if result.is_correct { "✅" } else { "❌" };
    block.push_str(&format!(
        "### {} {} ({:.1}/{:.1})\n\n",
        verdict, question_id, result.score, result.max_score
    ));

    block.push_str(&format!("**Question:** {}\n\n", result.question));
    block.push_str(&format!("**Answer:** {}\n\n", result.user_answer));

    if let Some(ref reference) = result.reference_answer {
        block.push_str(&format!("**Expected:** {}\n\n", reference));
    }

    block.push_str(&format!("**Evaluation:** {}\n\n", result.explanation));
    block.push_str(&format!("*Confidence: {:.2}", result.confidence));
    if result.human_reviewed {
        block.push_str(" | Human reviewed");
    }
    block.push_str("*\n\n---\n\n");

    block
}

/// Generate the plain-text rendering.
///
/// Fixed section order: title, generated timestamp, summary, strengths,
/// weaknesses, numbered recommendations.
pub fn generate_text_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("ASSESSMENT REPORT\n");
    output.push_str("=================\n\n");
    output.push_str(&format!(
        "Generated: {}\n\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output.push_str(&report.summary);
    output.push_str("\n\n");

    output.push_str("Strengths:\n");
    if report.strengths.is_empty() {
        output.push_str("  (none identified)\n");
    }
    for area in &report.strengths {
        output.push_str(&format!("  - {}\n", area.description));
    }
    output.push('\n');

    output.push_str("Weaknesses:\n");
    if report.weaknesses.is_empty() {
        output.push_str("  (none identified)\n");
    }
    for area in &report.weaknesses {
        output.push_str(&format!("  - {}\n", area.description));
    }
    output.push('\n');

    output.push_str("Recommendations:\n");
    for (i, recommendation) in report.recommendations.iter().enumerate() {
        output.push_str(&format!("  {}. {}\n", i + 1, recommendation));
    }

    output
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write a rendered report to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
