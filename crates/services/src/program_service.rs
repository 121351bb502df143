use std::sync::Arc;

use koda_core::model::{DisplayColor, Program, ProgramId};
use storage::repository::{NewProgramRecord, ProgramRepository, StorageError};

use crate::Clock;
use crate::error::ProgramServiceError;

/// Orchestrates program creation and persistence.
#[derive(Clone)]
pub struct ProgramService {
    clock: Clock,
    programs: Arc<dyn ProgramRepository>,
}

impl ProgramService {
    #[must_use]
    pub fn new(clock: Clock, programs: Arc<dyn ProgramRepository>) -> Self {
        Self { clock, programs }
    }

    /// Create a program; a blank color falls back to the default accent.
    ///
    /// # Errors
    ///
    /// Returns `ProgramServiceError::Program` or `::Color` for validation failures.
    /// Returns `ProgramServiceError::Storage` if persistence fails.
    pub async fn create_program(
        &self,
        title: String,
        description: Option<String>,
        color: Option<String>,
    ) -> Result<ProgramId, ProgramServiceError> {
        let color = DisplayColor::parse_or_default(color.as_deref())?;
        let program = Program::new(ProgramId::new(1), title, description, color, self.clock.now())?;
        let program_id = self
            .programs
            .insert_new_program(NewProgramRecord::from_program(&program))
            .await?;
        tracing::info!(program = %program_id, title = program.title(), "program created");
        Ok(program_id)
    }

    /// Update title, description and color; the creation time is kept.
    ///
    /// # Errors
    ///
    /// Returns `ProgramServiceError::Program` or `::Color` if validation fails.
    /// Returns `ProgramServiceError::Storage` if the program is missing or storage fails.
    pub async fn update_program(
        &self,
        program_id: ProgramId,
        title: String,
        description: Option<String>,
        color: Option<String>,
    ) -> Result<(), ProgramServiceError> {
        let existing = self
            .programs
            .get_program(program_id)
            .await?
            .ok_or(StorageError::NotFound)?;

        let color = DisplayColor::parse_or_default(color.as_deref())?;
        let updated = Program::new(
            existing.id(),
            title,
            description,
            color,
            existing.created_at(),
        )?;
        self.programs.update_program(&updated).await?;
        Ok(())
    }

    /// Fetch a program by ID, without modules.
    ///
    /// # Errors
    ///
    /// Returns `ProgramServiceError::Storage` if repository access fails.
    pub async fn get_program(
        &self,
        program_id: ProgramId,
    ) -> Result<Option<Program>, ProgramServiceError> {
        Ok(self.programs.get_program(program_id).await?)
    }

    /// List programs in creation order.
    ///
    /// # Errors
    ///
    /// Returns `ProgramServiceError::Storage` if repository access fails.
    pub async fn list_programs(&self) -> Result<Vec<Program>, ProgramServiceError> {
        Ok(self.programs.list_programs().await?)
    }

    /// Delete a program and everything under it.
    ///
    /// # Errors
    ///
    /// Returns `ProgramServiceError::Storage` if the program is missing or storage fails.
    pub async fn delete_program(&self, program_id: ProgramId) -> Result<(), ProgramServiceError> {
        self.programs.delete_program(program_id).await?;
        tracing::info!(program = %program_id, "program deleted");
        Ok(())
    }
}
