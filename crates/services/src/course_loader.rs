use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use koda_core::curriculum::Course;
use koda_core::model::{Lesson, ModuleId, ProgramId};
use storage::repository::{LessonRepository, ModuleRepository, ProgramRepository, Storage};
use tracing::debug;

use crate::error::CourseError;

/// Hands out load tickets; only the most recent ticket is current.
///
/// Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct LoadGuard {
    generation: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

impl LoadGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new load, superseding every earlier ticket.
    pub fn issue(&self) -> LoadTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        LoadTicket { generation }
    }

    #[must_use]
    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.generation
    }
}

/// Assembles a program tree from the repositories.
#[derive(Clone)]
pub struct CourseLoader {
    programs: Arc<dyn ProgramRepository>,
    modules: Arc<dyn ModuleRepository>,
    lessons: Arc<dyn LessonRepository>,
    guard: LoadGuard,
}

impl CourseLoader {
    #[must_use]
    pub fn new(
        programs: Arc<dyn ProgramRepository>,
        modules: Arc<dyn ModuleRepository>,
        lessons: Arc<dyn LessonRepository>,
    ) -> Self {
        Self {
            programs,
            modules,
            lessons,
            guard: LoadGuard::new(),
        }
    }

    #[must_use]
    pub fn from_storage(storage: &Storage) -> Self {
        Self::new(
            Arc::clone(&storage.programs),
            Arc::clone(&storage.modules),
            Arc::clone(&storage.lessons),
        )
    }

    /// Shares an existing guard, so loads from several loaders supersede each other.
    #[must_use]
    pub fn with_guard(mut self, guard: LoadGuard) -> Self {
        self.guard = guard;
        self
    }

    #[must_use]
    pub fn guard(&self) -> &LoadGuard {
        &self.guard
    }

    /// Load a course, discarding the result if a newer load started meanwhile.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::Cancelled` when superseded, otherwise the errors
    /// of [`CourseLoader::fetch`].
    pub async fn load(&self, program_id: ProgramId) -> Result<Course, CourseError> {
        let ticket = self.guard.issue();
        let course = self.fetch(program_id).await?;
        if !self.guard.is_current(ticket) {
            debug!(program = %program_id, "discarding superseded course load");
            return Err(CourseError::Cancelled);
        }
        Ok(course)
    }

    /// Fetch and assemble a course without ticket checks.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::ProgramNotFound` if the program is missing and
    /// `CourseError::Storage` if a repository call fails.
    pub async fn fetch(&self, program_id: ProgramId) -> Result<Course, CourseError> {
        let program = self
            .programs
            .get_program(program_id)
            .await?
            .ok_or(CourseError::ProgramNotFound(program_id))?;
        let modules = self.modules.list_modules(program_id).await?;
        let lessons = self.lessons.lessons_for_program(program_id).await?;

        let mut by_module: HashMap<ModuleId, Vec<Lesson>> = HashMap::new();
        for lesson in lessons {
            by_module.entry(lesson.module_id()).or_default().push(lesson);
        }

        let module_count = modules.len();
        let modules = modules
            .into_iter()
            .map(|module| {
                let lessons = by_module.remove(&module.id()).unwrap_or_default();
                module.with_lessons(lessons)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let course = Course::new(program.with_modules(modules)?);
        debug!(
            program = %program_id,
            modules = module_count,
            lessons = course.sequence().len(),
            "course assembled"
        );
        Ok(course)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use chrono::Duration;
    use koda_core::model::{DisplayColor, LessonId, Program};
    use koda_core::time::fixed_now;
    use storage::repository::{
        InMemoryRepository, NewLessonRecord, NewModuleRecord, NewProgramRecord, StorageError,
    };

    async fn seeded() -> (InMemoryRepository, ProgramId, Vec<LessonId>) {
        let repo = InMemoryRepository::new();
        let program_id = repo
            .insert_new_program(NewProgramRecord {
                title: "Mathématiques 3ᵉ".into(),
                description: None,
                color: DisplayColor::default(),
                created_at: fixed_now(),
            })
            .await
            .unwrap();

        let mut lesson_ids = Vec::new();
        // Geometry is inserted first but created later.
        for (title, minutes) in [("Géométrie plane", 10), ("Nombres et calculs", 1)] {
            let module_id = repo
                .insert_new_module(NewModuleRecord {
                    program_id,
                    title: title.into(),
                    color: DisplayColor::default(),
                    created_at: fixed_now() + Duration::minutes(minutes),
                })
                .await
                .unwrap();
            for offset in [2, 1] {
                let id = repo
                    .insert_new_lesson(NewLessonRecord {
                        module_id,
                        title: format!("{title} {offset}"),
                        video_url: None,
                        exercises: Vec::new(),
                        quiz: Vec::new(),
                        created_at: fixed_now() + Duration::minutes(minutes + offset),
                    })
                    .await
                    .unwrap();
                lesson_ids.push(id);
            }
        }
        (repo, program_id, lesson_ids)
    }

    fn loader(repo: &InMemoryRepository) -> CourseLoader {
        let repo = Arc::new(repo.clone());
        CourseLoader::new(repo.clone(), repo.clone(), repo)
    }

    #[tokio::test]
    async fn fetch_assembles_tree_in_creation_order() {
        let (repo, program_id, ids) = seeded().await;
        let course = loader(&repo).fetch(program_id).await.unwrap();

        let titles: Vec<&str> = course
            .program()
            .modules()
            .iter()
            .map(|m| m.title())
            .collect();
        assert_eq!(titles, vec!["Nombres et calculs", "Géométrie plane"]);

        let order: Vec<LessonId> = course.sequence().iter().map(|e| e.lesson_id).collect();
        assert_eq!(order, vec![ids[3], ids[2], ids[1], ids[0]]);
    }

    #[tokio::test]
    async fn missing_program_is_reported() {
        let (repo, _, _) = seeded().await;
        assert!(matches!(
            loader(&repo).load(ProgramId::new(404)).await,
            Err(CourseError::ProgramNotFound(_))
        ));
    }

    #[test]
    fn newer_ticket_supersedes_older() {
        let guard = LoadGuard::new();
        let first = guard.issue();
        assert!(guard.is_current(first));
        let second = guard.clone().issue();
        assert!(!guard.is_current(first));
        assert!(guard.is_current(second));
    }

    /// Starts a competing load while the first one is still reading the program.
    struct Interrupting {
        inner: InMemoryRepository,
        guard: LoadGuard,
    }

    #[async_trait]
    impl ProgramRepository for Interrupting {
        async fn insert_new_program(
            &self,
            program: NewProgramRecord,
        ) -> Result<ProgramId, StorageError> {
            self.inner.insert_new_program(program).await
        }

        async fn update_program(&self, program: &Program) -> Result<(), StorageError> {
            self.inner.update_program(program).await
        }

        async fn get_program(&self, id: ProgramId) -> Result<Option<Program>, StorageError> {
            self.guard.issue();
            self.inner.get_program(id).await
        }

        async fn list_programs(&self) -> Result<Vec<Program>, StorageError> {
            self.inner.list_programs().await
        }

        async fn delete_program(&self, id: ProgramId) -> Result<(), StorageError> {
            self.inner.delete_program(id).await
        }
    }

    #[tokio::test]
    async fn superseded_load_is_cancelled() {
        let (repo, program_id, _) = seeded().await;
        let guard = LoadGuard::new();
        let shared = Arc::new(repo.clone());
        let loader = CourseLoader::new(
            Arc::new(Interrupting {
                inner: repo,
                guard: guard.clone(),
            }),
            shared.clone(),
            shared,
        )
        .with_guard(guard);

        assert!(matches!(
            loader.load(program_id).await,
            Err(CourseError::Cancelled)
        ));
        assert!(loader.fetch(program_id).await.is_ok());
    }
}
