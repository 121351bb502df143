use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::color::DisplayColor;
use crate::model::ids::ProgramId;
use crate::model::module::Module;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgramError {
    #[error("program title cannot be empty")]
    EmptyTitle,

    #[error("module {module} belongs to another program")]
    ForeignModule { module: u64 },
}

/// Top-level course, owning its modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    id: ProgramId,
    title: String,
    description: Option<String>,
    color: DisplayColor,
    created_at: DateTime<Utc>,
    modules: Vec<Module>,
}

impl Program {
    /// Creates a program without modules.
    ///
    /// # Errors
    ///
    /// Returns `ProgramError::EmptyTitle` if the title is blank.
    pub fn new(
        id: ProgramId,
        title: impl Into<String>,
        description: Option<String>,
        color: DisplayColor,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ProgramError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ProgramError::EmptyTitle);
        }

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            description,
            color,
            created_at,
            modules: Vec::new(),
        })
    }

    /// Attaches modules, in the order given.
    ///
    /// # Errors
    ///
    /// Returns `ProgramError::ForeignModule` if a module points at another program.
    pub fn with_modules(mut self, modules: Vec<Module>) -> Result<Self, ProgramError> {
        if let Some(stray) = modules.iter().find(|m| m.program_id() != self.id) {
            return Err(ProgramError::ForeignModule {
                module: stray.id().value(),
            });
        }
        self.modules = modules;
        Ok(self)
    }

    #[must_use]
    pub fn with_id(mut self, id: ProgramId) -> Self {
        self.id = id;
        self
    }

    /// Sorts modules, and lessons inside each module, by creation order.
    ///
    /// Ties on the timestamp fall back to the identifier so the result is total.
    pub(crate) fn sort_by_creation(&mut self) {
        self.modules
            .sort_by(|a, b| (a.created_at(), a.id()).cmp(&(b.created_at(), b.id())));
        for module in &mut self.modules {
            module.sort_lessons_by_creation();
        }
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> ProgramId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
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
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }
}
