use std::sync::Arc;

use chrono::{DateTime, Utc};
use koda_core::model::{
    Lesson, LessonId, ModuleId, QuizQuestion, decode_legacy_exercises, parse_option_list,
};
use koda_core::video::{self, EmbedKind};
use storage::repository::{
    LessonRepository, ModuleRepository, NewLessonRecord, StorageError,
};

use crate::Clock;
use crate::error::LessonServiceError;

/// One quiz question as typed into the authoring form.
///
/// `options` is the comma-joined option field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizDraft {
    pub question: String,
    pub options: String,
    pub answer: String,
}

impl QuizDraft {
    #[must_use]
    pub fn new(
        question: impl Into<String>,
        options: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            options: options.into(),
            answer: answer.into(),
        }
    }

    fn is_blank(&self) -> bool {
        self.question.trim().is_empty()
    }
}

impl From<&QuizQuestion> for QuizDraft {
    fn from(question: &QuizQuestion) -> Self {
        Self {
            question: question.question().to_owned(),
            options: question.options().join(", "),
            answer: question.answer().to_owned(),
        }
    }
}

/// Unvalidated lesson content from the authoring form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LessonDraft {
    pub title: String,
    pub video_url: String,
    pub exercises: Vec<String>,
    pub quiz: Vec<QuizDraft>,
}

impl LessonDraft {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_video(mut self, url: impl Into<String>) -> Self {
        self.video_url = url.into();
        self
    }

    #[must_use]
    pub fn with_exercise(mut self, block: impl Into<String>) -> Self {
        self.exercises.push(block.into());
        self
    }

    /// Appends the blocks of a `"||"`-joined exercise field.
    #[must_use]
    pub fn with_exercise_text(mut self, raw: &str) -> Self {
        self.exercises.extend(decode_legacy_exercises(raw));
        self
    }

    #[must_use]
    pub fn with_question(mut self, draft: QuizDraft) -> Self {
        self.quiz.push(draft);
        self
    }

    /// Prefills the form from a stored lesson.
    #[must_use]
    pub fn from_lesson(lesson: &Lesson) -> Self {
        Self {
            title: lesson.title().to_owned(),
            video_url: lesson.video_url().unwrap_or_default().to_owned(),
            exercises: lesson.exercises().to_vec(),
            quiz: lesson.quiz().iter().map(QuizDraft::from).collect(),
        }
    }

    /// Validates the draft into a lesson.
    ///
    /// Drafts with a blank question are skipped; the index in a
    /// `LessonServiceError::Quiz` counts only the questions that were kept.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Lesson` for a blank title and
    /// `LessonServiceError::Quiz` for the first invalid question.
    pub fn into_lesson(
        self,
        id: LessonId,
        module_id: ModuleId,
        created_at: DateTime<Utc>,
    ) -> Result<Lesson, LessonServiceError> {
        let quiz = self
            .quiz
            .iter()
            .filter(|draft| !draft.is_blank())
            .enumerate()
            .map(|(index, draft)| {
                QuizQuestion::new(
                    draft.question.as_str(),
                    parse_option_list(&draft.options),
                    draft.answer.as_str(),
                )
                .map_err(|source| LessonServiceError::Quiz { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let video_url = Some(self.video_url);
        Ok(Lesson::new(
            id,
            module_id,
            self.title,
            video_url,
            self.exercises,
            quiz,
            created_at,
        )?)
    }
}

fn note_video(lesson: &Lesson) {
    if video::resolve_opt(lesson.video_url()) == EmbedKind::Unsupported {
        tracing::warn!(
            lesson = %lesson.id(),
            url = lesson.video_url().unwrap_or_default(),
            "video link is not a YouTube or .mp4 link; learners will see a notice"
        );
    }
}

/// Orchestrates lesson authoring inside an existing module.
#[derive(Clone)]
pub struct LessonService {
    clock: Clock,
    modules: Arc<dyn ModuleRepository>,
    lessons: Arc<dyn LessonRepository>,
}

impl LessonService {
    #[must_use]
    pub fn new(
        clock: Clock,
        modules: Arc<dyn ModuleRepository>,
        lessons: Arc<dyn LessonRepository>,
    ) -> Self {
        Self {
            clock,
            modules,
            lessons,
        }
    }

    /// Validate and persist a new lesson.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::ModuleNotFound` if the parent is missing.
    /// Returns `LessonServiceError::Lesson` or `::Quiz` for validation failures.
    /// Returns `LessonServiceError::Storage` if persistence fails.
    pub async fn create_lesson(
        &self,
        module_id: ModuleId,
        draft: LessonDraft,
    ) -> Result<LessonId, LessonServiceError> {
        if self.modules.get_module(module_id).await?.is_none() {
            return Err(LessonServiceError::ModuleNotFound(module_id));
        }

        let lesson = draft.into_lesson(LessonId::new(1), module_id, self.clock.now())?;
        let lesson_id = match self
            .lessons
            .insert_new_lesson(NewLessonRecord::from_lesson(&lesson))
            .await
        {
            Ok(id) => id,
            Err(StorageError::NotFound) => {
                return Err(LessonServiceError::ModuleNotFound(module_id));
            }
            Err(other) => return Err(other.into()),
        };
        note_video(&lesson.with_id(lesson_id));
        tracing::info!(module = %module_id, lesson = %lesson_id, "lesson created");
        Ok(lesson_id)
    }

    /// Replace a lesson's content; module and creation time are kept.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Lesson` or `::Quiz` if validation fails.
    /// Returns `LessonServiceError::Storage` if the lesson is missing or storage fails.
    pub async fn update_lesson(
        &self,
        lesson_id: LessonId,
        draft: LessonDraft,
    ) -> Result<(), LessonServiceError> {
        let existing = self
            .lessons
            .get_lesson(lesson_id)
            .await?
            .ok_or(StorageError::NotFound)?;

        let updated = draft.into_lesson(existing.id(), existing.module_id(), existing.created_at())?;
        self.lessons.update_lesson(&updated).await?;
        note_video(&updated);
        Ok(())
    }

    /// Fetch a lesson by ID.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Storage` if repository access fails.
    pub async fn get_lesson(&self, lesson_id: LessonId) -> Result<Option<Lesson>, LessonServiceError> {
        Ok(self.lessons.get_lesson(lesson_id).await?)
    }

    /// Lessons of a module in creation order.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Storage` if repository access fails.
    pub async fn list_lessons(&self, module_id: ModuleId) -> Result<Vec<Lesson>, LessonServiceError> {
        Ok(self.lessons.list_lessons(module_id).await?)
    }

    /// Delete a lesson.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Storage` if the lesson is missing or storage fails.
    pub async fn delete_lesson(&self, lesson_id: LessonId) -> Result<(), LessonServiceError> {
        self.lessons.delete_lesson(lesson_id).await?;
        tracing::info!(lesson = %lesson_id, "lesson deleted");
        Ok(())
    }
}
