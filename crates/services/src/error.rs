//! Shared error types for the services crate.

use thiserror::Error;

use koda_core::model::{
    ColorError, LessonError, LessonId, ModuleError, ModuleId, ProgramError, ProgramId, QuizError,
};
use koda_core::navigation::NavError;
use storage::local::ProgressStoreError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgramService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgramServiceError {
    #[error(transparent)]
    Program(#[from] ProgramError),
    #[error(transparent)]
    Color(#[from] ColorError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ModuleService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModuleServiceError {
    #[error("program {0} does not exist")]
    ProgramNotFound(ProgramId),
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error(transparent)]
    Color(#[from] ColorError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `LessonService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LessonServiceError {
    #[error("module {0} does not exist")]
    ModuleNotFound(ModuleId),
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error("quiz question {index}: {source}")]
    Quiz {
        index: usize,
        #[source]
        source: QuizError,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while assembling a course.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseError {
    #[error("program {0} does not exist")]
    ProgramNotFound(ProgramId),
    #[error("load was superseded by a newer one")]
    Cancelled,
    #[error(transparent)]
    Program(#[from] ProgramError),
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressTracker`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("lesson {0} is not part of this program")]
    UnknownLesson(LessonId),
}

/// Errors emitted by `StudySession`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudyError {
    #[error(transparent)]
    Nav(#[from] NavError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    ProgressStore(#[from] ProgressStoreError),
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
