// src/models/question.rs

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Difficulty mode. Partitions the question bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Easy,
    Normal,
    Hard,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Easy => "easy",
            Mode::Normal => "normal",
            Mode::Hard => "hard",
        }
    }

    /// The fixed subtopic group belonging to this mode. The "random"
    /// sentinel draws from the whole group.
    pub fn subtopics(&self) -> &'static [&'static str] {
        match self {
            Mode::Easy => &["Linear DS", "Sorting Algo"],
            Mode::Normal => &["Tree", "Merge Sort"],
            Mode::Hard => &["Divide & Conquer", "Greedy Algorithm"],
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a mode string is not one of easy/normal/hard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidMode(pub String);

impl fmt::Display for InvalidMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid mode '{}' (expected easy, normal or hard)", self.0)
    }
}

impl std::error::Error for InvalidMode {}

impl FromStr for Mode {
    type Err = InvalidMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Mode::Easy),
            "normal" => Ok(Mode::Normal),
            "hard" => Ok(Mode::Hard),
            other => Err(InvalidMode(other.to_string())),
        }
    }
}

/// The subtopic sentinel meaning "any subtopic under this mode".
pub const RANDOM_SUBTOPIC: &str = "random";

/// Represents the 'questions' table in the database.
///
/// `correct_answer` is canonically an option index into `options`.
/// Immutable during a quiz session; mutated only through the admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// The text content of the question.
    pub question_text: String,

    /// List of options (e.g., ["Option A", "Option B"]). Stored as a
    /// JSON array in the database; some upstream producers encode it as
    /// a JSON string, so ingestion normalizes both forms once.
    #[serde(deserialize_with = "deserialize_options")]
    pub options: Vec<String>,

    pub difficulty: Mode,

    pub subtopic: String,

    /// Index of the correct option.
    pub correct_answer: i64,

    /// Explanation of the correct answer.
    pub explanation: Option<String>,

    pub image_url: Option<String>,

    pub created_at: Option<chrono::NaiveDateTime>,
}

/// Accepts either a JSON array of strings or a JSON-encoded string
/// containing such an array, and yields a plain `Vec<String>`.
pub fn normalize_options(value: &serde_json::Value) -> Result<Vec<String>, String> {
    let array = match value {
        serde_json::Value::Array(items) => items.clone(),
        serde_json::Value::String(inner) => match serde_json::from_str(inner) {
            Ok(serde_json::Value::Array(items)) => items,
            _ => return Err(format!("options string is not a JSON array: {}", inner)),
        },
        other => return Err(format!("options must be an array, got: {}", other)),
    };

    array
        .into_iter()
        .map(|item| match item {
            serde_json::Value::String(s) => Ok(s),
            other => Err(format!("option is not a string: {}", other)),
        })
        .collect()
}

fn deserialize_options<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    normalize_options(&value).map_err(serde::de::Error::custom)
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub question_text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    pub difficulty: Mode,
    #[validate(length(min = 1, max = 50))]
    pub subtopic: String,
    #[validate(range(min = 0))]
    pub correct_answer: i64,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    pub image_url: Option<String>,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateQuestionRequest {
    pub question_text: Option<String>,
    pub options: Option<Vec<String>>,
    pub difficulty: Option<Mode>,
    pub subtopic: Option<String>,
    pub correct_answer: Option<i64>,
    pub explanation: Option<String>,
    pub image_url: Option<String>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.is_empty() {
        return Err(validator::ValidationError::new("options_cannot_be_empty"));
    }
    for opt in options {
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}
