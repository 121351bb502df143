use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("question text cannot be empty")]
    EmptyQuestion,

    #[error("a question needs at least two options")]
    TooFewOptions,

    #[error("option {0:?} appears more than once")]
    DuplicateOption(String),

    #[error("answer {answer:?} is not one of the options")]
    AnswerNotAmongOptions { answer: String },

    #[error("quiz payload is not a question or a list of questions: {0}")]
    MalformedPayload(String),
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question attached to a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    question: String,
    options: Vec<String>,
    answer: String,
}

impl QuizQuestion {
    /// Creates a question authored by a teacher.
    ///
    /// Text is trimmed. The answer must match one of the options exactly
    /// (after trimming) and options must be unique, otherwise the question
    /// could never be graded correctly.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` when the question is blank, has fewer than two
    /// options, contains duplicates, or the answer is not an option.
    pub fn new(
        question: impl Into<String>,
        options: Vec<String>,
        answer: impl Into<String>,
    ) -> Result<Self, QuizError> {
        let question = question.into().trim().to_owned();
        if question.is_empty() {
            return Err(QuizError::EmptyQuestion);
        }

        let options: Vec<String> = options
            .into_iter()
            .map(|o| o.trim().to_owned())
            .filter(|o| !o.is_empty())
            .collect();
        if options.len() < 2 {
            return Err(QuizError::TooFewOptions);
        }

        let mut seen = HashSet::new();
        for option in &options {
            if !seen.insert(option.as_str()) {
                return Err(QuizError::DuplicateOption(option.clone()));
            }
        }

        let answer = answer.into().trim().to_owned();
        if !options.contains(&answer) {
            return Err(QuizError::AnswerNotAmongOptions { answer });
        }

        Ok(Self {
            question,
            options,
            answer,
        })
    }

    /// Rebuilds a question from storage without authoring validation.
    ///
    /// Older content may carry an answer that matches none of the options;
    /// such a question stays renderable but grades every option as wrong.
    #[must_use]
    pub fn from_persisted(question: String, options: Vec<String>, answer: String) -> Self {
        Self {
            question,
            options,
            answer,
        }
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// True when the recorded answer is one of the options.
    #[must_use]
    pub fn is_gradable(&self) -> bool {
        self.options.iter().any(|o| o == &self.answer)
    }
}

//
// ─── AUTHORING FORM FORMAT ─────────────────────────────────────────────────────
//

/// Splits the comma-joined option field of the authoring form.
#[must_use]
pub fn parse_option_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_owned)
        .collect()
}

//
// ─── LEGACY PAYLOADS ───────────────────────────────────────────────────────────
//

#[derive(Deserialize)]
struct RawQuestion {
    #[serde(default)]
    question: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    answer: String,
}

impl From<RawQuestion> for QuizQuestion {
    fn from(raw: RawQuestion) -> Self {
        QuizQuestion::from_persisted(raw.question, raw.options, raw.answer)
    }
}

/// Decodes a stored quiz payload into a list of questions.
///
/// Accepts `null` (no quiz), a single question object, or an array of
/// question objects. Entries with blank question text are dropped.
///
/// # Errors
///
/// Returns `QuizError::MalformedPayload` for any other JSON shape.
pub fn decode_quiz_payload(value: &Value) -> Result<Vec<QuizQuestion>, QuizError> {
    let raw: Vec<RawQuestion> = match value {
        Value::Null => Vec::new(),
        Value::Object(_) => vec![
            serde_json::from_value(value.clone())
                .map_err(|e| QuizError::MalformedPayload(e.to_string()))?,
        ],
        Value::Array(_) => serde_json::from_value(value.clone())
            .map_err(|e| QuizError::MalformedPayload(e.to_string()))?,
        other => return Err(QuizError::MalformedPayload(other.to_string())),
    };

    Ok(raw
        .into_iter()
        .filter(|q| !q.question.trim().is_empty())
        .map(QuizQuestion::from)
        .collect())
}
