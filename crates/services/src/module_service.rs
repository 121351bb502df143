use std::sync::Arc;

use koda_core::model::{DisplayColor, Module, ModuleId, ProgramId};
use storage::repository::{ModuleRepository, NewModuleRecord, ProgramRepository, StorageError};

use crate::Clock;
use crate::error::ModuleServiceError;

/// Orchestrates module creation inside an existing program.
#[derive(Clone)]
pub struct ModuleService {
    clock: Clock,
    programs: Arc<dyn ProgramRepository>,
    modules: Arc<dyn ModuleRepository>,
}

impl ModuleService {
    #[must_use]
    pub fn new(
        clock: Clock,
        programs: Arc<dyn ProgramRepository>,
        modules: Arc<dyn ModuleRepository>,
    ) -> Self {
        Self {
            clock,
            programs,
            modules,
        }
    }

    /// Create a module under `program_id`.
    ///
    /// # Errors
    ///
    /// Returns `ModuleServiceError::ProgramNotFound` if the parent is missing.
    /// Returns `ModuleServiceError::Module` or `::Color` for validation failures.
    /// Returns `ModuleServiceError::Storage` if persistence fails.
    pub async fn create_module(
        &self,
        program_id: ProgramId,
        title: String,
        color: Option<String>,
    ) -> Result<ModuleId, ModuleServiceError> {
        if self.programs.get_program(program_id).await?.is_none() {
            return Err(ModuleServiceError::ProgramNotFound(program_id));
        }

        let color = DisplayColor::parse_or_default(color.as_deref())?;
        let module = Module::new(ModuleId::new(1), program_id, title, color, self.clock.now())?;
        let module_id = match self
            .modules
            .insert_new_module(NewModuleRecord::from_module(&module))
            .await
        {
            Ok(id) => id,
            // The program vanished between the check and the insert.
            Err(StorageError::NotFound) => {
                return Err(ModuleServiceError::ProgramNotFound(program_id));
            }
            Err(other) => return Err(other.into()),
        };
        tracing::info!(program = %program_id, module = %module_id, "module created");
        Ok(module_id)
    }

    /// Update title and color; parent and creation time are kept.
    ///
    /// # Errors
    ///
    /// Returns `ModuleServiceError::Module` or `::Color` if validation fails.
    /// Returns `ModuleServiceError::Storage` if the module is missing or storage fails.
    pub async fn update_module(
        &self,
        module_id: ModuleId,
        title: String,
        color: Option<String>,
    ) -> Result<(), ModuleServiceError> {
        let existing = self
            .modules
            .get_module(module_id)
            .await?
            .ok_or(StorageError::NotFound)?;

        let color = DisplayColor::parse_or_default(color.as_deref())?;
        let updated = Module::new(
            existing.id(),
            existing.program_id(),
            title,
            color,
            existing.created_at(),
        )?;
        self.modules.update_module(&updated).await?;
        Ok(())
    }

    /// Fetch a module by ID, without lessons.
    ///
    /// # Errors
    ///
    /// Returns `ModuleServiceError::Storage` if repository access fails.
    pub async fn get_module(&self, module_id: ModuleId) -> Result<Option<Module>, ModuleServiceError> {
        Ok(self.modules.get_module(module_id).await?)
    }

    /// Modules of a program in creation order.
    ///
    /// # Errors
    ///
    /// Returns `ModuleServiceError::Storage` if repository access fails.
    pub async fn list_modules(
        &self,
        program_id: ProgramId,
    ) -> Result<Vec<Module>, ModuleServiceError> {
        Ok(self.modules.list_modules(program_id).await?)
    }

    /// Delete a module; its lessons go with it.
    ///
    /// # Errors
    ///
    /// Returns `ModuleServiceError::Storage` if the module is missing or storage fails.
    pub async fn delete_module(&self, module_id: ModuleId) -> Result<(), ModuleServiceError> {
        self.modules.delete_module(module_id).await?;
        tracing::info!(module = %module_id, "module deleted");
        Ok(())
    }
}
