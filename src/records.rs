//! Typed records for structured generation results.
//!
//! Generated JSON is untrusted: [`parse_json_or`] turns any shape mismatch
//! into a caller-chosen default instead of an error.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;

use crate::generator::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub source_lesson: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    pub term: String,
    pub definition: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAnalysis {
    pub main_topics_of_weakness: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonSolution {
    pub question: String,
    pub solution: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Article,
    Video,
    Book,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedSource {
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Intermediate,
    Hard,
    Advanced,
}

impl Difficulty {
    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Intermediate => "intermediate",
            Difficulty::Hard => "hard",
            Difficulty::Advanced => "advanced",
        }
    }
}

/// Describes the JSON a generator must produce for a record type.
pub trait ResponseSchema {
    fn schema() -> Value;

    /// Schema for a JSON array of this record.
    fn list_schema() -> Value {
        json!({ "type": "array", "items": Self::schema() })
    }
}

fn string() -> Value {
    json!({ "type": "string" })
}

fn object(properties: Value, required: &[&str]) -> Value {
    json!({ "type": "object", "properties": properties, "required": required })
}

impl ResponseSchema for Flashcard {
    fn schema() -> Value {
        object(
            json!({ "question": string(), "answer": string() }),
            &["question", "answer"],
        )
    }
}

impl ResponseSchema for QuizQuestion {
    fn schema() -> Value {
        object(
            json!({
                "question": string(),
                "type": {
                    "type": "string",
                    "enum": ["multiple-choice", "true-false", "short-answer"]
                },
                "options": { "type": "array", "items": string() },
                "correctAnswer": string(),
                "explanation": string(),
                "sourceLesson": string(),
            }),
            &[
                "question",
                "type",
                "options",
                "correctAnswer",
                "explanation",
                "sourceLesson",
            ],
        )
    }
}

impl ResponseSchema for GlossaryTerm {
    fn schema() -> Value {
        object(
            json!({ "term": string(), "definition": string() }),
            &["term", "definition"],
        )
    }
}

impl ResponseSchema for QuizAnalysis {
    fn schema() -> Value {
        object(
            json!({ "main_topics_of_weakness": { "type": "array", "items": string() } }),
            &["main_topics_of_weakness"],
        )
    }
}

impl ResponseSchema for LessonSolution {
    fn schema() -> Value {
        object(
            json!({ "question": string(), "solution": string() }),
            &["question", "solution"],
        )
    }
}

impl ResponseSchema for SuggestedSource {
    fn schema() -> Value {
        object(
            json!({
                "title": string(),
                "url": string(),
                "type": { "type": "string", "enum": ["article", "video", "book"] },
            }),
            &["title", "url", "type"],
        )
    }
}

/// Parse generated JSON, falling back to `default` on any failure.
///
/// A surrounding Markdown code fence (`` ```json `` ... `` ``` ``) is removed
/// first, since generators often wrap JSON in one.
pub fn parse_json_or<T: DeserializeOwned>(raw: &str, default: T) -> T {
    match serde_json::from_str(strip_code_fence(raw)) {
        Ok(value) => value,
        Err(e) => {
            error!(error = %e, raw, "failed to parse generated JSON");
            default
        }
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}
