use async_trait::async_trait;
use shipyard_core::{StoreResult, TaskSequenceRepository};
use sqlx::SqlitePool;

use crate::error::DbError;

#[derive(Clone)]
pub struct SqliteTaskSequenceRepository {
    pool: SqlitePool,
}

impl SqliteTaskSequenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn delete_by_project(&self, project: &str) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM task_sequences WHERE project = ?")
            .bind(project)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TaskSequenceRepository for SqliteTaskSequenceRepository {
    async fn delete_task_sequence_collection(&self, project_name: &str) -> StoreResult<()> {
        let removed = self.delete_by_project(project_name).await?;
        tracing::debug!(project = %project_name, removed, "Deleted project task sequences");
        Ok(())
    }
}
