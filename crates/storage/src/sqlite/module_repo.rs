use koda_core::model::{Module, ModuleId, ProgramId};

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, map_module_row, module_id_from_i64};
use crate::repository::{ModuleRepository, NewModuleRecord, StorageError};

#[async_trait::async_trait]
impl ModuleRepository for SqliteRepository {
    async fn insert_new_module(&self, module: NewModuleRecord) -> Result<ModuleId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO modules (program_id, title, color, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(id_to_i64("program_id", module.program_id.value())?)
        .bind(module.title)
        .bind(module.color.as_str().to_owned())
        .bind(module.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        module_id_from_i64(res.last_insert_rowid())
    }

    async fn update_module(&self, module: &Module) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE modules SET title = ?1, color = ?2 WHERE id = ?3")
            .bind(module.title().to_owned())
            .bind(module.color().as_str().to_owned())
            .bind(id_to_i64("module_id", module.id().value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<Module>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, program_id, title, color, created_at
            FROM modules WHERE id = ?1
            ",
        )
        .bind(id_to_i64("module_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_module_row).transpose()
    }

    async fn list_modules(&self, program_id: ProgramId) -> Result<Vec<Module>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, program_id, title, color, created_at
            FROM modules
            WHERE program_id = ?1
            ORDER BY created_at ASC, id ASC
            ",
        )
        .bind(id_to_i64("program_id", program_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_module_row).collect()
    }

    async fn delete_module(&self, id: ModuleId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM modules WHERE id = ?1")
            .bind(id_to_i64("module_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
