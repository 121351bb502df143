use chrono::{DateTime, Utc};
use koda_core::model::{
    DisplayColor, Lesson, LessonId, Module, ModuleId, Program, ProgramId, QuizQuestion,
    decode_legacy_exercises, decode_quiz_payload,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::warn;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps a query failure; a broken foreign key means the parent row is gone.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    match e.as_database_error() {
        Some(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        Some(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn program_id_from_i64(v: i64) -> Result<ProgramId, StorageError> {
    Ok(ProgramId::new(i64_to_u64("program_id", v)?))
}

pub(crate) fn module_id_from_i64(v: i64) -> Result<ModuleId, StorageError> {
    Ok(ModuleId::new(i64_to_u64("module_id", v)?))
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

fn color_from_db(raw: &str) -> DisplayColor {
    DisplayColor::parse_or_default(Some(raw)).unwrap_or_else(|err| {
        warn!(error = %err, "stored color is not a hex value; using default");
        DisplayColor::default()
    })
}

//
// ─── LESSON PAYLOADS ───────────────────────────────────────────────────────────
//

pub(crate) fn encode_exercises(blocks: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(blocks).map_err(ser)
}

/// JSON array first, then the legacy `"||"`-joined string.
pub(crate) fn decode_exercises(raw: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(blocks) => blocks
            .into_iter()
            .map(|b| b.trim().to_owned())
            .filter(|b| !b.is_empty())
            .collect(),
        Err(_) => decode_legacy_exercises(raw),
    }
}

pub(crate) fn encode_quiz(questions: &[QuizQuestion]) -> Result<Option<String>, StorageError> {
    if questions.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(questions).map(Some).map_err(ser)
}

/// Unreadable quiz payloads degrade to "no quiz" rather than failing the lesson.
pub(crate) fn decode_quiz(lesson_id: LessonId, raw: Option<&str>) -> Vec<QuizQuestion> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Vec::new();
    };
    let decoded = serde_json::from_str::<serde_json::Value>(raw)
        .map_err(|e| e.to_string())
        .and_then(|value| decode_quiz_payload(&value).map_err(|e| e.to_string()));
    match decoded {
        Ok(questions) => {
            for (index, question) in questions.iter().enumerate() {
                if !question.is_gradable() {
                    warn!(lesson = %lesson_id, index, "quiz answer matches none of the options");
                }
            }
            questions
        }
        Err(error) => {
            warn!(lesson = %lesson_id, %error, "dropping unreadable quiz payload");
            Vec::new()
        }
    }
}

//
// ─── ROWS ──────────────────────────────────────────────────────────────────────
//

pub(crate) fn map_program_row(row: &SqliteRow) -> Result<Program, StorageError> {
    let color: String = row.try_get("color").map_err(ser)?;
    Program::new(
        program_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description").map_err(ser)?,
        color_from_db(&color),
        row.try_get::<DateTime<Utc>, _>("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_module_row(row: &SqliteRow) -> Result<Module, StorageError> {
    let color: String = row.try_get("color").map_err(ser)?;
    Module::new(
        module_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        program_id_from_i64(row.try_get::<i64, _>("program_id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        color_from_db(&color),
        row.try_get::<DateTime<Utc>, _>("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    let id = lesson_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let exercises: String = row.try_get("exercises").map_err(ser)?;
    let quiz: Option<String> = row.try_get("quiz").map_err(ser)?;

    Lesson::new(
        id,
        module_id_from_i64(row.try_get::<i64, _>("module_id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("video_url").map_err(ser)?,
        decode_exercises(&exercises),
        decode_quiz(id, quiz.as_deref()),
        row.try_get::<DateTime<Utc>, _>("created_at").map_err(ser)?,
    )
    .map_err(ser)
}
