//! Completed-lesson sets and the unlock rule derived from them.
//!
//! Persisted shape, one entry per (learner, program):
//!
//! ```text
//! progress:<learner>:<program_id>  =>  {"12":true,"15":true}
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::curriculum::LessonSequence;
use crate::model::{LearnerId, LessonId, ProgramId};

#[derive(Debug, Error)]
pub enum ProgressDecodeError {
    #[error("progress payload is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lessons a learner has marked done within one program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedSet(BTreeSet<LessonId>);

impl CompletedSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a lesson; returns `false` if it was already there.
    pub fn insert(&mut self, lesson_id: LessonId) -> bool {
        self.0.insert(lesson_id)
    }

    #[must_use]
    pub fn contains(&self, lesson_id: LessonId) -> bool {
        self.0.contains(&lesson_id)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = LessonId> + '_ {
        self.0.iter().copied()
    }

    /// Serializes to `{"<lesson id>": true, ...}`.
    #[must_use]
    pub fn encode(&self) -> String {
        let map: BTreeMap<String, bool> = self.0.iter().map(|id| (id.to_string(), true)).collect();
        // A map of strings to bools always serializes.
        serde_json::to_string(&map).unwrap_or_else(|_| "{}".to_owned())
    }

    /// Parses the persisted form.
    ///
    /// Entries set to anything but `true`, and keys that are not lesson ids,
    /// are skipped.
    ///
    /// # Errors
    ///
    /// Returns `ProgressDecodeError` if the payload is not a JSON object.
    pub fn decode(raw: &str) -> Result<Self, ProgressDecodeError> {
        let map: BTreeMap<String, serde_json::Value> = serde_json::from_str(raw)?;
        let mut set = Self::new();
        for (key, value) in map {
            if value != serde_json::Value::Bool(true) {
                continue;
            }
            match key.parse::<LessonId>() {
                Ok(id) => {
                    set.insert(id);
                }
                Err(_) => warn!(key = %key, "skipping progress entry with a non-lesson key"),
            }
        }
        Ok(set)
    }

    /// Like `decode`, but absent or corrupt data yields an empty set.
    #[must_use]
    pub fn decode_lossy(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::new();
        };
        Self::decode(raw).unwrap_or_else(|err| {
            warn!(error = %err, "discarding unreadable progress data");
            Self::new()
        })
    }
}

/// Storage key for one learner's progress in one program.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressKey {
    pub program_id: ProgramId,
    pub learner: LearnerId,
}

impl ProgressKey {
    #[must_use]
    pub fn new(program_id: ProgramId, learner: LearnerId) -> Self {
        Self {
            program_id,
            learner,
        }
    }

    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("progress:{}:{}", self.learner, self.program_id)
    }
}

/// Unlock gating over the flattened order.
///
/// The first lesson is always open. Any later lesson opens once the lesson
/// right before it is completed. Lessons outside the sequence are locked.
#[must_use]
pub fn is_unlocked(sequence: &LessonSequence, completed: &CompletedSet, lesson_id: LessonId) -> bool {
    match sequence.position(lesson_id) {
        None => false,
        Some(0) => true,
        Some(_) => sequence
            .previous_before(lesson_id)
            .is_some_and(|prev| completed.contains(prev.lesson_id)),
    }
}

/// Completed / total counts for a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSummary {
    pub completed: usize,
    pub total: usize,
}

impl ProgressSummary {
    /// Only lessons still present in the sequence count; stale ids are ignored.
    #[must_use]
    pub fn of(sequence: &LessonSequence, completed: &CompletedSet) -> Self {
        let done = sequence
            .iter()
            .filter(|entry| completed.contains(entry.lesson_id))
            .count();
        Self {
            completed: done,
            total: sequence.len(),
        }
    }

    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = self.completed * 100 / self.total;
        u8::try_from(pct).unwrap_or(100)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}
