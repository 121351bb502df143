use std::path::Path;
use std::sync::Arc;

use koda_core::grading::QuizMode;
use koda_core::model::{LearnerId, ProgramId};
use storage::local::{FileProgressStore, MemoryProgressStore, ProgressStore};
use storage::repository::{ProgramRepository, Storage};
use tracing::{debug, info};

use crate::Clock;
use crate::course_loader::CourseLoader;
use crate::error::AppServicesError;
use crate::lesson_service::LessonService;
use crate::module_service::ModuleService;
use crate::program_service::ProgramService;
use crate::study_session::StudySession;

/// Assembles app-facing services over one storage backend and one progress store.
#[derive(Clone)]
pub struct AppServices {
    programs: Arc<dyn ProgramRepository>,
    program_service: Arc<ProgramService>,
    module_service: Arc<ModuleService>,
    lesson_service: Arc<LessonService>,
    loader: CourseLoader,
    progress_store: Arc<dyn ProgressStore>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and a progress directory.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database or the progress directory
    /// cannot be opened.
    pub async fn new_sqlite(
        db_url: &str,
        progress_dir: impl AsRef<Path>,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let store = FileProgressStore::open(progress_dir.as_ref())?;
        info!(db = db_url, progress = %store.dir().display(), "services ready");
        Ok(Self::assemble(&storage, Arc::new(store), clock))
    }

    /// Build services with nothing persisted, for tests and demos.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::assemble(
            &Storage::in_memory(),
            Arc::new(MemoryProgressStore::new()),
            clock,
        )
    }

    fn assemble(storage: &Storage, progress_store: Arc<dyn ProgressStore>, clock: Clock) -> Self {
        Self {
            programs: Arc::clone(&storage.programs),
            program_service: Arc::new(ProgramService::new(clock, Arc::clone(&storage.programs))),
            module_service: Arc::new(ModuleService::new(
                clock,
                Arc::clone(&storage.programs),
                Arc::clone(&storage.modules),
            )),
            lesson_service: Arc::new(LessonService::new(
                clock,
                Arc::clone(&storage.modules),
                Arc::clone(&storage.lessons),
            )),
            loader: CourseLoader::from_storage(storage),
            progress_store,
        }
    }

    #[must_use]
    pub fn program_service(&self) -> Arc<ProgramService> {
        Arc::clone(&self.program_service)
    }

    #[must_use]
    pub fn module_service(&self) -> Arc<ModuleService> {
        Arc::clone(&self.module_service)
    }

    #[must_use]
    pub fn lesson_service(&self) -> Arc<LessonService> {
        Arc::clone(&self.lesson_service)
    }

    #[must_use]
    pub fn course_loader(&self) -> &CourseLoader {
        &self.loader
    }

    #[must_use]
    pub fn progress_store(&self) -> Arc<dyn ProgressStore> {
        Arc::clone(&self.progress_store)
    }

    /// Picks the program to open: `preferred` when it exists, otherwise the
    /// oldest program. `None` when the catalog is empty.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Storage` if the lookup fails.
    pub async fn resolve_program(
        &self,
        preferred: Option<ProgramId>,
    ) -> Result<Option<ProgramId>, AppServicesError> {
        if let Some(id) = preferred {
            if self.programs.get_program(id).await?.is_some() {
                return Ok(Some(id));
            }
            debug!(program = %id, "preferred program missing; falling back");
        }
        let programs = self.programs.list_programs().await?;
        Ok(programs.first().map(|p| p.id()))
    }

    /// Loads a program and opens a study session with the learner's saved progress.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Course` if the program cannot be loaded.
    pub async fn start_study(
        &self,
        program_id: ProgramId,
        learner: LearnerId,
        quiz_mode: QuizMode,
    ) -> Result<StudySession, AppServicesError> {
        let course = self.loader.load(program_id).await?;
        Ok(StudySession::open(
            course,
            Arc::clone(&self.progress_store),
            learner,
            quiz_mode,
        ))
    }
}
