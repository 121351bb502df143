use async_trait::async_trait;
use chrono::{DateTime, Utc};
use koda_core::model::{
    DisplayColor, Lesson, LessonId, Module, ModuleId, Program, ProgramId, QuizQuestion,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Insert shape for a program; the repository assigns the id.
#[derive(Debug, Clone)]
pub struct NewProgramRecord {
    pub title: String,
    pub description: Option<String>,
    pub color: DisplayColor,
    pub created_at: DateTime<Utc>,
}

impl NewProgramRecord {
    #[must_use]
    pub fn from_program(program: &Program) -> Self {
        Self {
            title: program.title().to_owned(),
            description: program.description().map(str::to_owned),
            color: program.color().clone(),
            created_at: program.created_at(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewModuleRecord {
    pub program_id: ProgramId,
    pub title: String,
    pub color: DisplayColor,
    pub created_at: DateTime<Utc>,
}

impl NewModuleRecord {
    #[must_use]
    pub fn from_module(module: &Module) -> Self {
        Self {
            program_id: module.program_id(),
            title: module.title().to_owned(),
            color: module.color().clone(),
            created_at: module.created_at(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewLessonRecord {
    pub module_id: ModuleId,
    pub title: String,
    pub video_url: Option<String>,
    pub exercises: Vec<String>,
    pub quiz: Vec<QuizQuestion>,
    pub created_at: DateTime<Utc>,
}

impl NewLessonRecord {
    #[must_use]
    pub fn from_lesson(lesson: &Lesson) -> Self {
        Self {
            module_id: lesson.module_id(),
            title: lesson.title().to_owned(),
            video_url: lesson.video_url().map(str::to_owned),
            exercises: lesson.exercises().to_vec(),
            quiz: lesson.quiz().to_vec(),
            created_at: lesson.created_at(),
        }
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Repository contract for programs.
///
/// Programs come back without their modules; the course loader assembles
/// the tree.
#[async_trait]
pub trait ProgramRepository: Send + Sync {
    /// Persist a new program and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the program cannot be stored.
    async fn insert_new_program(&self, program: NewProgramRecord)
    -> Result<ProgramId, StorageError>;

    /// Overwrite an existing program's fields.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the program does not exist.
    async fn update_program(&self, program: &Program) -> Result<(), StorageError>;

    /// Fetch a program by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_program(&self, id: ProgramId) -> Result<Option<Program>, StorageError>;

    /// List programs in creation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_programs(&self) -> Result<Vec<Program>, StorageError>;

    /// Delete a program together with its modules and lessons.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the program does not exist.
    async fn delete_program(&self, id: ProgramId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ModuleRepository: Send + Sync {
    /// Persist a new module under an existing program.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the parent program is missing.
    async fn insert_new_module(&self, module: NewModuleRecord) -> Result<ModuleId, StorageError>;

    /// Overwrite an existing module's title and color.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the module does not exist.
    async fn update_module(&self, module: &Module) -> Result<(), StorageError>;

    /// Fetch a module by ID, without lessons.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>, StorageError>;

    /// Modules of one program, in creation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_modules(&self, program_id: ProgramId) -> Result<Vec<Module>, StorageError>;

    /// Delete a module and every lesson it owns.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the module does not exist.
    async fn delete_module(&self, id: ModuleId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// Persist a new lesson under an existing module.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the parent module is missing.
    async fn insert_new_lesson(&self, lesson: NewLessonRecord) -> Result<LessonId, StorageError>;

    /// Overwrite an existing lesson's content.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lesson does not exist.
    async fn update_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Fetch a lesson by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError>;

    /// Lessons of one module, in creation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_lessons(&self, module_id: ModuleId) -> Result<Vec<Lesson>, StorageError>;

    /// Every lesson of every module of a program, in creation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn lessons_for_program(&self, program_id: ProgramId)
    -> Result<Vec<Lesson>, StorageError>;

    /// Delete one lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lesson does not exist.
    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct Tables {
    next_id: u64,
    programs: HashMap<ProgramId, Program>,
    modules: HashMap<ModuleId, Module>,
    lessons: HashMap<LessonId, Lesson>,
}

impl Tables {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn drop_module(&mut self, id: ModuleId) {
        self.modules.remove(&id);
        self.lessons.retain(|_, lesson| lesson.module_id() != id);
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// All three tables live behind one lock so cascading deletes stay atomic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

fn rebuild<T, E: std::fmt::Display>(built: Result<T, E>) -> Result<T, StorageError> {
    built.map_err(|e| StorageError::Serialization(e.to_string()))
}

#[async_trait]
impl ProgramRepository for InMemoryRepository {
    async fn insert_new_program(
        &self,
        program: NewProgramRecord,
    ) -> Result<ProgramId, StorageError> {
        let mut guard = self.lock()?;
        let id = ProgramId::new(guard.allocate());
        let stored = rebuild(Program::new(
            id,
            program.title,
            program.description,
            program.color,
            program.created_at,
        ))?;
        guard.programs.insert(id, stored);
        Ok(id)
    }

    async fn update_program(&self, program: &Program) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard
            .programs
            .get_mut(&program.id())
            .ok_or(StorageError::NotFound)?;
        *slot = rebuild(Program::new(
            program.id(),
            program.title(),
            program.description().map(str::to_owned),
            program.color().clone(),
            slot.created_at(),
        ))?;
        Ok(())
    }

    async fn get_program(&self, id: ProgramId) -> Result<Option<Program>, StorageError> {
        Ok(self.lock()?.programs.get(&id).cloned())
    }

    async fn list_programs(&self) -> Result<Vec<Program>, StorageError> {
        let mut programs: Vec<Program> = self.lock()?.programs.values().cloned().collect();
        programs.sort_by_key(|p| (p.created_at(), p.id()));
        Ok(programs)
    }

    async fn delete_program(&self, id: ProgramId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.programs.remove(&id).ok_or(StorageError::NotFound)?;
        let owned: Vec<ModuleId> = guard
            .modules
            .values()
            .filter(|m| m.program_id() == id)
            .map(Module::id)
            .collect();
        for module_id in owned {
            guard.drop_module(module_id);
        }
        Ok(())
    }
}

#[async_trait]
impl ModuleRepository for InMemoryRepository {
    async fn insert_new_module(&self, module: NewModuleRecord) -> Result<ModuleId, StorageError> {
        let mut guard = self.lock()?;
        if !guard.programs.contains_key(&module.program_id) {
            return Err(StorageError::NotFound);
        }
        let id = ModuleId::new(guard.allocate());
        let stored = rebuild(Module::new(
            id,
            module.program_id,
            module.title,
            module.color,
            module.created_at,
        ))?;
        guard.modules.insert(id, stored);
        Ok(id)
    }

    async fn update_module(&self, module: &Module) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard
            .modules
            .get_mut(&module.id())
            .ok_or(StorageError::NotFound)?;
        *slot = rebuild(Module::new(
            module.id(),
            slot.program_id(),
            module.title(),
            module.color().clone(),
            slot.created_at(),
        ))?;
        Ok(())
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>, StorageError> {
        Ok(self.lock()?.modules.get(&id).cloned())
    }

    async fn list_modules(&self, program_id: ProgramId) -> Result<Vec<Module>, StorageError> {
        let mut modules: Vec<Module> = self
            .lock()?
            .modules
            .values()
            .filter(|m| m.program_id() == program_id)
            .cloned()
            .collect();
        modules.sort_by_key(|m| (m.created_at(), m.id()));
        Ok(modules)
    }

    async fn delete_module(&self, id: ModuleId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.modules.contains_key(&id) {
            return Err(StorageError::NotFound);
        }
        guard.drop_module(id);
        Ok(())
    }
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn insert_new_lesson(&self, lesson: NewLessonRecord) -> Result<LessonId, StorageError> {
        let mut guard = self.lock()?;
        if !guard.modules.contains_key(&lesson.module_id) {
            return Err(StorageError::NotFound);
        }
        let id = LessonId::new(guard.allocate());
        let stored = rebuild(Lesson::new(
            id,
            lesson.module_id,
            lesson.title,
            lesson.video_url,
            lesson.exercises,
            lesson.quiz,
            lesson.created_at,
        ))?;
        guard.lessons.insert(id, stored);
        Ok(id)
    }

    async fn update_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard
            .lessons
            .get_mut(&lesson.id())
            .ok_or(StorageError::NotFound)?;
        *slot = rebuild(Lesson::new(
            lesson.id(),
            slot.module_id(),
            lesson.title(),
            lesson.video_url().map(str::to_owned),
            lesson.exercises().to_vec(),
            lesson.quiz().to_vec(),
            slot.created_at(),
        ))?;
        Ok(())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        Ok(self.lock()?.lessons.get(&id).cloned())
    }

    async fn list_lessons(&self, module_id: ModuleId) -> Result<Vec<Lesson>, StorageError> {
        let mut lessons: Vec<Lesson> = self
            .lock()?
            .lessons
            .values()
            .filter(|l| l.module_id() == module_id)
            .cloned()
            .collect();
        lessons.sort_by_key(|l| (l.created_at(), l.id()));
        Ok(lessons)
    }

    async fn lessons_for_program(
        &self,
        program_id: ProgramId,
    ) -> Result<Vec<Lesson>, StorageError> {
        let guard = self.lock()?;
        let mut lessons: Vec<Lesson> = guard
            .lessons
            .values()
            .filter(|l| {
                guard
                    .modules
                    .get(&l.module_id())
                    .is_some_and(|m| m.program_id() == program_id)
            })
            .cloned()
            .collect();
        lessons.sort_by_key(|l| (l.created_at(), l.id()));
        Ok(lessons)
    }

    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        self.lock()?
            .lessons
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

/// Aggregates the content repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub programs: Arc<dyn ProgramRepository>,
    pub modules: Arc<dyn ModuleRepository>,
    pub lessons: Arc<dyn LessonRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let programs: Arc<dyn ProgramRepository> = Arc::new(repo.clone());
        let modules: Arc<dyn ModuleRepository> = Arc::new(repo.clone());
        let lessons: Arc<dyn LessonRepository> = Arc::new(repo);
        Self {
            programs,
            modules,
            lessons,
        }
    }
}
