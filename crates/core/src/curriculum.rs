//! Program → module → lesson tree, normalized into one reading order.
//!
//! Modules are ordered by creation time, then lessons by creation time inside
//! each module; identifiers only break ties. The flattened sequence is what
//! unlock gating and next/previous navigation walk over.

use std::collections::HashMap;

use crate::model::{Lesson, LessonId, Module, ModuleId, Program};

/// Concatenates each module's lessons, module order then lesson order.
///
/// Uses the order the program currently holds; build a [`Course`] first to
/// get creation order.
#[must_use]
pub fn flatten(program: &Program) -> Vec<&Lesson> {
    program
        .modules()
        .iter()
        .flat_map(|module| module.lessons().iter())
        .collect()
}

//
// ─── SEQUENCE ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceEntry {
    pub lesson_id: LessonId,
    pub module_id: ModuleId,
}

/// Flattened lesson order of one program, with O(1) position lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LessonSequence {
    entries: Vec<SequenceEntry>,
    positions: HashMap<LessonId, usize>,
}

impl LessonSequence {
    #[must_use]
    pub fn from_program(program: &Program) -> Self {
        let entries: Vec<SequenceEntry> = flatten(program)
            .into_iter()
            .map(|lesson| SequenceEntry {
                lesson_id: lesson.id(),
                module_id: lesson.module_id(),
            })
            .collect();
        Self::from_entries(entries)
    }

    #[must_use]
    pub fn from_entries(entries: Vec<SequenceEntry>) -> Self {
        let positions = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.lesson_id, idx))
            .collect();
        Self { entries, positions }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<SequenceEntry> {
        self.entries.first().copied()
    }

    #[must_use]
    pub fn get(&self, position: usize) -> Option<SequenceEntry> {
        self.entries.get(position).copied()
    }

    #[must_use]
    pub fn position(&self, lesson_id: LessonId) -> Option<usize> {
        self.positions.get(&lesson_id).copied()
    }

    #[must_use]
    pub fn contains(&self, lesson_id: LessonId) -> bool {
        self.positions.contains_key(&lesson_id)
    }

    #[must_use]
    pub fn module_of(&self, lesson_id: LessonId) -> Option<ModuleId> {
        self.position(lesson_id).map(|idx| self.entries[idx].module_id)
    }

    /// The lesson right after `lesson_id`, or `None` at the end (or if unknown).
    #[must_use]
    pub fn next_after(&self, lesson_id: LessonId) -> Option<SequenceEntry> {
        self.position(lesson_id)
            .and_then(|idx| self.entries.get(idx + 1))
            .copied()
    }

    /// The lesson right before `lesson_id`, or `None` at the start (or if unknown).
    #[must_use]
    pub fn previous_before(&self, lesson_id: LessonId) -> Option<SequenceEntry> {
        self.position(lesson_id)
            .and_then(|idx| idx.checked_sub(1))
            .and_then(|idx| self.entries.get(idx))
            .copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SequenceEntry> {
        self.entries.iter()
    }
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A program normalized for study: sorted tree plus its flattened sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    program: Program,
    sequence: LessonSequence,
}

impl Course {
    #[must_use]
    pub fn new(mut program: Program) -> Self {
        program.sort_by_creation();
        let sequence = LessonSequence::from_program(&program);
        Self { program, sequence }
    }

    #[must_use]
    pub fn program(&self) -> &Program {
        &self.program
    }

    #[must_use]
    pub fn sequence(&self) -> &LessonSequence {
        &self.sequence
    }

    #[must_use]
    pub fn lessons(&self) -> Vec<&Lesson> {
        flatten(&self.program)
    }

    #[must_use]
    pub fn module(&self, module_id: ModuleId) -> Option<&Module> {
        self.program.modules().iter().find(|m| m.id() == module_id)
    }

    #[must_use]
    pub fn lesson(&self, lesson_id: LessonId) -> Option<&Lesson> {
        let module_id = self.sequence.module_of(lesson_id)?;
        self.module(module_id)?
            .lessons()
            .iter()
            .find(|l| l.id() == lesson_id)
    }
}
