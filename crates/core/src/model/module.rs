use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::color::DisplayColor;
use crate::model::ids::{ModuleId, ProgramId};
use crate::model::lesson::Lesson;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModuleError {
    #[error("module title cannot be empty")]
    EmptyTitle,

    #[error("lesson {lesson} belongs to module {found}, not {expected}")]
    ForeignLesson {
        lesson: u64,
        expected: ModuleId,
        found: ModuleId,
    },
}

/// A themed chapter of a program, owning its lessons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    id: ModuleId,
    program_id: ProgramId,
    title: String,
    color: DisplayColor,
    created_at: DateTime<Utc>,
    lessons: Vec<Lesson>,
}

impl Module {
    /// Creates a module without lessons.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::EmptyTitle` if the title is blank.
    pub fn new(
        id: ModuleId,
        program_id: ProgramId,
        title: impl Into<String>,
        color: DisplayColor,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ModuleError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ModuleError::EmptyTitle);
        }
        Ok(Self {
            id,
            program_id,
            title: title.trim().to_owned(),
            color,
            created_at,
            lessons: Vec::new(),
        })
    }

    /// Attaches lessons, in the order given.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::ForeignLesson` if a lesson points at another module.
    pub fn with_lessons(mut self, lessons: Vec<Lesson>) -> Result<Self, ModuleError> {
        if let Some(stray) = lessons.iter().find(|l| l.module_id() != self.id) {
            return Err(ModuleError::ForeignLesson {
                lesson: stray.id().value(),
                expected: self.id,
                found: stray.module_id(),
            });
        }
        self.lessons = lessons;
        Ok(self)
    }

    #[must_use]
    pub fn with_id(mut self, id: ModuleId) -> Self {
        self.id = id;
        self
    }

    pub(crate) fn sort_lessons_by_creation(&mut self) {
        self.lessons
            .sort_by(|a, b| (a.created_at(), a.id()).cmp(&(b.created_at(), b.id())));
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    #[must_use]
    pub fn program_id(&self) -> ProgramId {
        self.program_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn color(&self) -> &DisplayColor {
        &self.color
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }
}
