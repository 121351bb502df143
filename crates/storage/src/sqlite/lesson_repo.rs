use koda_core::model::{Lesson, LessonId, ModuleId, ProgramId};

use super::SqliteRepository;
use super::mapping::{
    db_err, encode_exercises, encode_quiz, id_to_i64, lesson_id_from_i64, map_lesson_row,
};
use crate::repository::{LessonRepository, NewLessonRecord, StorageError};

#[async_trait::async_trait]
impl LessonRepository for SqliteRepository {
    async fn insert_new_lesson(&self, lesson: NewLessonRecord) -> Result<LessonId, StorageError> {
        let exercises = encode_exercises(&lesson.exercises)?;
        let quiz = encode_quiz(&lesson.quiz)?;

        let res = sqlx::query(
            r"
            INSERT INTO lessons (module_id, title, video_url, exercises, quiz, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(id_to_i64("module_id", lesson.module_id.value())?)
        .bind(lesson.title)
        .bind(lesson.video_url)
        .bind(exercises)
        .bind(quiz)
        .bind(lesson.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        lesson_id_from_i64(res.last_insert_rowid())
    }

    async fn update_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE lessons
            SET title = ?1, video_url = ?2, exercises = ?3, quiz = ?4
            WHERE id = ?5
            ",
        )
        .bind(lesson.title().to_owned())
        .bind(lesson.video_url().map(ToString::to_string))
        .bind(encode_exercises(lesson.exercises())?)
        .bind(encode_quiz(lesson.quiz())?)
        .bind(id_to_i64("lesson_id", lesson.id().value())?)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, module_id, title, video_url, exercises, quiz, created_at
            FROM lessons WHERE id = ?1
            ",
        )
        .bind(id_to_i64("lesson_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_lesson_row).transpose()
    }

    async fn list_lessons(&self, module_id: ModuleId) -> Result<Vec<Lesson>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, module_id, title, video_url, exercises, quiz, created_at
            FROM lessons
            WHERE module_id = ?1
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(id_to_i64("module_id", module_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_lesson_row).collect()
    }

    async fn lessons_for_program(
        &self,
        program_id: ProgramId,
    ) -> Result<Vec<Lesson>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT l.id, l.module_id, l.title, l.video_url, l.exercises, l.quiz, l.created_at
            FROM lessons l
            JOIN modules m ON m.id = l.module_id
            WHERE m.program_id = ?1
            ORDER BY l.created_at ASC, l.id ASC
            ",
        )
        .bind(id_to_i64("program_id", program_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_lesson_row).collect()
    }

    async fn delete_lesson(&self, id: LessonId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM lessons WHERE id = ?1")
            .bind(id_to_i64("lesson_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
