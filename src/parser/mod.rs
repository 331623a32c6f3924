//! Document parsing: text extraction and question/answer pair parsing.
//!
//! Text extraction from raw bytes sits behind the [`TextExtractor`] trait so
//! that PDF/DOCX support can be plugged in by the caller; the built-in
//! extractor handles plain text only. Question parsing is deterministic:
//! identical input text always yields the same questions with the same
//! sequential ids.

use crate::error::{ExtractionError, GradeflowError};
use crate::models::{Question, QuestionType};
use regex::Regex;
use std::path::Path;
use tracing::{debug, warn};

/// Document formats the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Txt,
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Infer the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" => Some(DocumentFormat::Txt),
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            _ => None,
        }
    }
}

/// Turns raw document bytes into text.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, bytes: &[u8], format: DocumentFormat)
        -> Result<String, ExtractionError>;
}

/// Built-in extractor: plain text only. Binary formats require an external
/// extractor implementation.
#[derive(Debug, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_text(
        &self,
        bytes: &[u8],
        format: DocumentFormat,
    ) -> Result<String, ExtractionError> {
        match format {
            DocumentFormat::Txt => Ok(String::from_utf8_lossy(bytes).into_owned()),
            DocumentFormat::Pdf => Err(ExtractionError::UnsupportedFormat {
                format: "pdf".to_string(),
            }),
            DocumentFormat::Docx => Err(ExtractionError::UnsupportedFormat {
                format: "docx".to_string(),
            }),
        }
    }
}

/// Parses `Q:` / `Expected:` / `A:` blocks out of document text.
///
/// Expected input shape:
///
/// ```text
/// Q: Question text?
/// Expected: Reference answer   (optional)
/// A: User's answer
/// ```
pub struct QuestionParser {
    block_start: Regex,
    block_body: Regex,
    default_max_score: f64,
}

impl QuestionParser {
    pub fn new(default_max_score: f64) -> Self {
        Self {
            // One block per Q: marker at a line start.
            block_start: Regex::new(r"(?mi)^\s*Q:").expect("invalid block regex"),
            // Within a block: question, optional reference, answer.
            block_body: Regex::new(r"(?si)\A\s*(.+?)(?:Expected:\s*(.+?))?\s*A:\s*(.+)\z")
                .expect("invalid body regex"),
            default_max_score,
        }
    }

    /// Parse all question/answer pairs from text. Pairs missing either side
    /// are skipped; an input with no markers yields an empty list.
    pub fn parse(&self, text: &str) -> Vec<Question> {
        let mut questions = Vec::new();

        // Everything before the first Q: is preamble.
        let mut blocks = self.block_start.split(text);
        blocks.next();

        for block in blocks {
            let Some(caps) = self.block_body.captures(block) else {
                continue;
            };

            let question_text = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            let reference = caps.get(2).map(|m| m.as_str().trim()).filter(|s| !s.is_empty());
            let user_answer = caps.get(3).map(|m| m.as_str().trim()).unwrap_or("");

            if question_text.is_empty() || user_answer.is_empty() {
                continue;
            }

            let id = format!("q{}", questions.len() + 1);
            let question_type = detect_question_type(question_text, user_answer);

            match Question::new(&id, question_text, user_answer, self.default_max_score) {
                Ok(mut q) => {
                    q = q.with_type(question_type);
                    if let Some(r) = reference {
                        q = q.with_reference(r);
                    }
                    questions.push(q);
                }
                Err(e) => {
                    warn!("Skipping malformed question block: {}", e);
                }
            }
        }

        debug!("Parsed {} questions from document text", questions.len());
        questions
    }

    /// Read a file, extract its text, and parse questions from it.
    pub fn parse_file(
        &self,
        extractor: &dyn TextExtractor,
        path: &Path,
    ) -> Result<Vec<Question>, GradeflowError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        let format =
            DocumentFormat::from_extension(ext).ok_or_else(|| ExtractionError::UnsupportedFormat {
                format: ext.to_string(),
            })?;

        let bytes = std::fs::read(path).map_err(|source| ExtractionError::ReadError {
            path: path.display().to_string(),
            source,
        })?;

        let text = extractor.extract_text(&bytes, format)?;
        Ok(self.parse(&text))
    }
}

/// Classify a question from its text and answer.
fn detect_question_type(question_text: &str, answer_text: &str) -> QuestionType {
    let question_lower = question_text.to_lowercase();
    let answer_lower = answer_text.to_lowercase();

    if ["true or false", "t/f", "true/false"]
        .iter()
        .any(|kw| question_lower.contains(kw))
    {
        return QuestionType::TrueFalse;
    }

    if ["true", "false", "t", "f"].contains(&answer_lower.as_str()) {
        return QuestionType::TrueFalse;
    }

    if ["A)", "B)", "C)", "D)"]
        .iter()
        .any(|opt| question_text.contains(opt))
    {
        return QuestionType::MultipleChoice;
    }

    if ["def ", "function", "class ", "import ", "return"]
        .iter()
        .any(|kw| answer_lower.contains(kw))
    {
        return QuestionType::Coding;
    }

    let word_count = answer_text.split_whitespace().count();
    if word_count > 100 {
        return QuestionType::Essay;
    }
    if word_count > 30 {
        return QuestionType::LongAnswer;
    }

    QuestionType::ShortAnswer
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "
Q: What is Python?
Expected: Python is a high-level, interpreted programming language
A: Python is a programming language

Q: What is 2 + 2?
A: 4

Q: True or False: Python is compiled
A: False

Q: Write a function to add two numbers
A: def add(a, b):
    return a + b
";

    #[test]
    fn test_parse_sample_text() {
        let parser = QuestionParser::new(10.0);
        let questions = parser.parse(SAMPLE);

        assert_eq!(questions.len(), 4);
        assert_eq!(questions[0].id, "q1");
        assert_eq!(questions[0].text, "What is Python?");
        assert_eq!(
            questions[0].reference_answer.as_deref(),
            Some("Python is a high-level, interpreted programming language")
        );
        assert_eq!(questions[1].user_answer, "4");
        assert!(questions[1].reference_answer.is_none());
        assert_eq!(questions[3].id, "q4");
    }

    #[test]
    fn test_parse_is_deterministic() {
        let parser = QuestionParser::new(10.0);
        let a = parser.parse(SAMPLE);
        let b = parser.parse(SAMPLE);

        let ids_a: Vec<_> = a.iter().map(|q| q.id.clone()).collect();
        let ids_b: Vec<_> = b.iter().map(|q| q.id.clone()).collect();
        assert_eq!(ids_a, ids_b);
        assert_eq!(ids_a, vec!["q1", "q2", "q3", "q4"]);
    }

    #[test]
    fn test_parse_no_markers() {
        let parser = QuestionParser::new(10.0);
        assert!(parser.parse("just some prose with no markers").is_empty());
        assert!(parser.parse("").is_empty());
    }

    #[test]
    fn test_type_detection() {
        assert_eq!(
            detect_question_type("True or False: the sky is blue", "True"),
            QuestionType::TrueFalse
        );
        assert_eq!(
            detect_question_type("Pick one: A) foo B) bar C) baz D) qux", "B"),
            QuestionType::MultipleChoice
        );
        assert_eq!(
            detect_question_type("Write a sort", "def sort(xs): return sorted(xs)"),
            QuestionType::Coding
        );
        assert_eq!(
            detect_question_type("Explain briefly", "a short phrase"),
            QuestionType::ShortAnswer
        );

        let long_answer = "word ".repeat(40);
        assert_eq!(
            detect_question_type("Explain at length", &long_answer),
            QuestionType::LongAnswer
        );

        let essay = "word ".repeat(120);
        assert_eq!(
            detect_question_type("Discuss", &essay),
            QuestionType::Essay
        );
    }

    #[test]
    fn test_parse_file_txt() {
        let mut file = tempfile::NamedTempFile::with_suffix(".txt").unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let parser = QuestionParser::new(10.0);
        let questions = parser
            .parse_file(&PlainTextExtractor, file.path())
            .unwrap();
        assert_eq!(questions.len(), 4);
    }

    #[test]
    fn test_parse_fixture_document() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/sample_assessment.txt");

        let parser = QuestionParser::new(10.0);
        let questions = parser.parse_file(&PlainTextExtractor, &path).unwrap();

        assert_eq!(questions.len(), 4);
        assert_eq!(questions[0].question_type, QuestionType::TrueFalse);
        assert!(questions[1].reference_answer.is_some());
        assert_eq!(questions[2].question_type, QuestionType::MultipleChoice);
        assert_eq!(questions[3].question_type, QuestionType::Coding);
    }

    #[test]
    fn test_parse_file_unsupported_format() {
        let file = tempfile::NamedTempFile::with_suffix(".xlsx").unwrap();

        let parser = QuestionParser::new(10.0);
        let err = parser
            .parse_file(&PlainTextExtractor, file.path())
            .unwrap_err();
        assert!(matches!(
            err,
            GradeflowError::Extraction(ExtractionError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_plain_text_extractor_rejects_pdf() {
        let err = PlainTextExtractor
            .extract_text(b"%PDF-1.4", DocumentFormat::Pdf)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedFormat { .. }));
    }
}
