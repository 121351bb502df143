use koda_core::model::{Program, ProgramId};

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, map_program_row, program_id_from_i64};
use crate::repository::{NewProgramRecord, ProgramRepository, StorageError};

#[async_trait::async_trait]
impl ProgramRepository for SqliteRepository {
    async fn insert_new_program(
        &self,
        program: NewProgramRecord,
    ) -> Result<ProgramId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO programs (title, description, color, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(program.title)
        .bind(program.description)
        .bind(program.color.as_str().to_owned())
        .bind(program.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        program_id_from_i64(res.last_insert_rowid())
    }

    async fn update_program(&self, program: &Program) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE programs
            SET title = ?1, description = ?2, color = ?3
            WHERE id = ?4
            ",
        )
        .bind(program.title().to_owned())
        .bind(program.description().map(ToString::to_string))
        .bind(program.color().as_str().to_owned())
        .bind(id_to_i64("program_id", program.id().value())?)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_program(&self, id: ProgramId) -> Result<Option<Program>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, description, color, created_at
            FROM programs WHERE id = ?1
            ",
        )
        .bind(id_to_i64("program_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_program_row).transpose()
    }

    async fn list_programs(&self) -> Result<Vec<Program>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, description, color, created_at
            FROM programs
            ORDER BY created_at ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_program_row).collect()
    }

    async fn delete_program(&self, id: ProgramId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM programs WHERE id = ?1")
            .bind(id_to_i64("program_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
