use std::sync::Arc;

use koda_core::curriculum::LessonSequence;
use koda_core::model::LessonId;
use koda_core::progress::{CompletedSet, ProgressKey, ProgressSummary, is_unlocked};
use storage::local::ProgressStore;
use tracing::{debug, warn};

use crate::error::ProgressError;

/// One learner's completion state for one program, written through to a
/// local store.
///
/// Store failures never surface to the learner: reads fall back to an empty
/// set and failed writes keep the in-memory state.
#[derive(Clone)]
pub struct ProgressTracker {
    store: Arc<dyn ProgressStore>,
    key: ProgressKey,
    sequence: LessonSequence,
    completed: CompletedSet,
}

impl ProgressTracker {
    #[must_use]
    pub fn load(store: Arc<dyn ProgressStore>, key: ProgressKey, sequence: LessonSequence) -> Self {
        let storage_key = key.storage_key();
        let raw = store.load(&storage_key).unwrap_or_else(|err| {
            warn!(key = %storage_key, error = %err, "progress unreadable; starting fresh");
            None
        });
        let completed = CompletedSet::decode_lossy(raw.as_deref());
        debug!(key = %storage_key, completed = completed.len(), "progress loaded");

        Self {
            store,
            key,
            sequence,
            completed,
        }
    }

    #[must_use]
    pub fn key(&self) -> &ProgressKey {
        &self.key
    }

    #[must_use]
    pub fn completed(&self) -> &CompletedSet {
        &self.completed
    }

    #[must_use]
    pub fn is_completed(&self, lesson_id: LessonId) -> bool {
        self.completed.contains(lesson_id)
    }

    #[must_use]
    pub fn is_unlocked(&self, lesson_id: LessonId) -> bool {
        is_unlocked(&self.sequence, &self.completed, lesson_id)
    }

    #[must_use]
    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary::of(&self.sequence, &self.completed)
    }

    /// Swaps in the sequence of a reloaded course. Completed ids that no
    /// longer exist stay in the set but stop counting.
    pub fn set_sequence(&mut self, sequence: LessonSequence) {
        self.sequence = sequence;
    }

    /// Marks a lesson done and persists; returns `true` if it was newly added.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::UnknownLesson` if the lesson is not in the program.
    pub fn mark_complete(&mut self, lesson_id: LessonId) -> Result<bool, ProgressError> {
        if !self.sequence.contains(lesson_id) {
            return Err(ProgressError::UnknownLesson(lesson_id));
        }
        let added = self.completed.insert(lesson_id);
        if added {
            self.persist();
        }
        Ok(added)
    }

    /// Forgets every completion for this program and drops the stored entry.
    pub fn reset(&mut self) {
        self.completed.clear();
        let storage_key = self.key.storage_key();
        if let Err(err) = self.store.remove(&storage_key) {
            warn!(key = %storage_key, error = %err, "failed to clear progress");
        }
    }

    fn persist(&self) {
        let storage_key = self.key.storage_key();
        if let Err(err) = self.store.save(&storage_key, &self.completed.encode()) {
            warn!(key = %storage_key, error = %err, "failed to persist progress");
        }
    }
}
