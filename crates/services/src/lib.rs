#![forbid(unsafe_code)]

pub mod app_services;
pub mod course_loader;
pub mod error;
pub mod lesson_service;
pub mod module_service;
pub mod program_service;
pub mod progress_tracker;
pub mod study_session;

pub use koda_core::Clock;

pub use app_services::AppServices;
pub use course_loader::{CourseLoader, LoadGuard, LoadTicket};
pub use error::{
    AppServicesError, CourseError, LessonServiceError, ModuleServiceError, ProgramServiceError,
    ProgressError, StudyError,
};
pub use lesson_service::{LessonDraft, LessonService, QuizDraft};
pub use module_service::ModuleService;
pub use program_service::ProgramService;
pub use progress_tracker::ProgressTracker;
pub use study_session::{
    LessonView, OptionView, Outline, OutlineLesson, OutlineModule, QuestionView, StudySession,
};
