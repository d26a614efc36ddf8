use async_trait::async_trait;
use shipyard_core::{EventRepository, StoreResult};
use sqlx::SqlitePool;

use crate::error::DbError;

#[derive(Clone)]
pub struct SqliteEventRepository {
    pool: SqlitePool,
}

impl SqliteEventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Remove every event bucket of the project. Returns the number of rows removed.
    pub async fn delete_by_project(&self, project: &str) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM events WHERE project = ?")
            .bind(project)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl EventRepository for SqliteEventRepository {
    async fn delete_event_collections(&self, project_name: &str) -> StoreResult<()> {
        let removed = self.delete_by_project(project_name).await?;
        tracing::debug!(project = %project_name, removed, "Deleted project events");
        Ok(())
    }
}
