use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{LessonId, ModuleId};
use crate::model::quiz::QuizQuestion;

/// Separator of the legacy single-string exercise encoding.
pub const EXERCISE_DELIMITER: &str = "||";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson title cannot be empty")]
    EmptyTitle,
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// Atomic unit of course content: an optional video, exercise blocks, and a quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    id: LessonId,
    module_id: ModuleId,
    title: String,
    video_url: Option<String>,
    exercises: Vec<String>,
    quiz: Vec<QuizQuestion>,
    created_at: DateTime<Utc>,
}

impl Lesson {
    /// Creates a lesson.
    ///
    /// Blank video URLs become `None`; blank exercise blocks are dropped.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::EmptyTitle` if the title is blank.
    pub fn new(
        id: LessonId,
        module_id: ModuleId,
        title: impl Into<String>,
        video_url: Option<String>,
        exercises: Vec<String>,
        quiz: Vec<QuizQuestion>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, LessonError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(LessonError::EmptyTitle);
        }

        let video_url = video_url
            .map(|u| u.trim().to_owned())
            .filter(|u| !u.is_empty());

        let exercises = exercises
            .into_iter()
            .map(|e| e.trim().to_owned())
            .filter(|e| !e.is_empty())
            .collect();

        Ok(Self {
            id,
            module_id,
            title: title.trim().to_owned(),
            video_url,
            exercises,
            quiz,
            created_at,
        })
    }

    #[must_use]
    pub fn with_id(mut self, id: LessonId) -> Self {
        self.id = id;
        self
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn video_url(&self) -> Option<&str> {
        self.video_url.as_deref()
    }

    #[must_use]
    pub fn exercises(&self) -> &[String] {
        &self.exercises
    }

    #[must_use]
    pub fn quiz(&self) -> &[QuizQuestion] {
        &self.quiz
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── LEGACY EXERCISE ENCODING ──────────────────────────────────────────────────
//

/// Splits a legacy `"||"`-joined exercise string, dropping blank blocks.
#[must_use]
pub fn decode_legacy_exercises(raw: &str) -> Vec<String> {
    raw.split(EXERCISE_DELIMITER)
        .map(str::trim)
        .filter(|block| !block.is_empty())
        .map(str::to_owned)
        .collect()
}
