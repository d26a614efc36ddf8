use async_trait::async_trait;
use chrono::Utc;
use shipyard_core::{ExpandedProject, ProjectRepository, StoreResult};
use sqlx::SqlitePool;

use crate::error::DbError;
use crate::models::ProjectRow;

#[derive(Clone)]
pub struct SqliteProjectRepository {
    pool: SqlitePool,
}

impl SqliteProjectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, project: &ExpandedProject) -> Result<(), DbError> {
        let row = ProjectRow::from_domain(project, Utc::now().timestamp())?;

        let result = sqlx::query(
            r#"
            INSERT INTO projects (project_name, creation_date, git_remote_uri, git_user, shipyard, shipyard_version, stages, last_event_context, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.project_name)
        .bind(&row.creation_date)
        .bind(&row.git_remote_uri)
        .bind(&row.git_user)
        .bind(&row.shipyard)
        .bind(&row.shipyard_version)
        .bind(&row.stages)
        .bind(&row.last_event_context)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(DbError::ProjectExists(project.project_name.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_name(&self, project_name: &str) -> Result<Option<ExpandedProject>, DbError> {
        let row: Option<ProjectRow> = sqlx::query_as(
            r#"
            SELECT project_name, creation_date, git_remote_uri, git_user, shipyard, shipyard_version, stages, last_event_context, created_at, updated_at
            FROM projects
            WHERE project_name = ?
            "#,
        )
        .bind(project_name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_domain()).transpose()
    }

    pub async fn find_all(&self) -> Result<Vec<ExpandedProject>, DbError> {
        let rows: Vec<ProjectRow> = sqlx::query_as(
            r#"
            SELECT project_name, creation_date, git_remote_uri, git_user, shipyard, shipyard_version, stages, last_event_context, created_at, updated_at
            FROM projects
            ORDER BY project_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.into_domain()).collect()
    }

    pub async fn update_upstream(
        &self,
        project_name: &str,
        uri: &str,
        user: &str,
    ) -> Result<(), DbError> {
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET git_remote_uri = ?, git_user = ?, updated_at = ?
            WHERE project_name = ?
            "#,
        )
        .bind(uri)
        .bind(user)
        .bind(Utc::now().timestamp())
        .bind(project_name)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::ProjectNotFound(project_name.to_string()));
        }
        Ok(())
    }

    pub async fn delete(&self, project_name: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM projects WHERE project_name = ?")
            .bind(project_name)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProjectRepository for SqliteProjectRepository {
    async fn create_project(&self, project: &ExpandedProject) -> StoreResult<()> {
        Ok(self.create(project).await?)
    }

    async fn get_projects(&self) -> StoreResult<Vec<ExpandedProject>> {
        Ok(self.find_all().await?)
    }

    async fn get_project(&self, project_name: &str) -> StoreResult<Option<ExpandedProject>> {
        Ok(self.find_by_name(project_name).await?)
    }

    async fn update_project_upstream(
        &self,
        project_name: &str,
        uri: &str,
        user: &str,
    ) -> StoreResult<()> {
        Ok(self.update_upstream(project_name, uri, user).await?)
    }

    async fn delete_project(&self, project_name: &str) -> StoreResult<()> {
        if !self.delete(project_name).await? {
            tracing::debug!(project = %project_name, "Project record already absent");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect;
    use shipyard_core::{ExpandedStage, StoreError};

    async fn setup_repo() -> SqliteProjectRepository {
        let pool = connect("sqlite::memory:").await.unwrap();
        SqliteProjectRepository::new(pool)
    }

    fn sample_project(name: &str) -> ExpandedProject {
        ExpandedProject {
            project_name: name.to_string(),
            creation_date: "1700000000000000000".to_string(),
            git_remote_uri: "http://remote/repo.git".to_string(),
            git_user: "git-user".to_string(),
            shipyard: "c3RhZ2VzOgogIC0gbmFtZTogZGV2Cg==".to_string(),
            shipyard_version: "spec.keptn.sh/0.2.0".to_string(),
            stages: vec![ExpandedStage {
                stage_name: "dev".to_string(),
                services: Vec::new(),
            }],
            last_event_context: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_find_project() {
        let repo = setup_repo().await;
        let project = sample_project("my-project");

        repo.create_project(&project).await.unwrap();

        let found = repo.get_project("my-project").await.unwrap();
        assert_eq!(found, Some(project));
        assert!(repo.get_project("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_fails() {
        let repo = setup_repo().await;
        repo.create_project(&sample_project("dup")).await.unwrap();

        let err = repo.create_project(&sample_project("dup")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(name) if name == "dup"));
    }

    #[tokio::test]
    async fn test_get_projects_sorted() {
        let repo = setup_repo().await;
        repo.create_project(&sample_project("zeta")).await.unwrap();
        repo.create_project(&sample_project("alpha")).await.unwrap();

        let names: Vec<String> = repo
            .get_projects()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.project_name)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_update_upstream() {
        let repo = setup_repo().await;
        repo.create_project(&sample_project("my-project")).await.unwrap();

        repo.update_project_upstream("my-project", "http://new/repo.git", "new-user")
            .await
            .unwrap();

        let found = repo.get_project("my-project").await.unwrap().unwrap();
        assert_eq!(found.git_remote_uri, "http://new/repo.git");
        assert_eq!(found.git_user, "new-user");
        assert_eq!(found.shipyard_version, "spec.keptn.sh/0.2.0");

        let err = repo
            .update_project_upstream("missing", "http://x", "y")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let repo = setup_repo().await;
        repo.create_project(&sample_project("my-project")).await.unwrap();

        repo.delete_project("my-project").await.unwrap();
        repo.delete_project("my-project").await.unwrap();

        assert!(repo.get_project("my-project").await.unwrap().is_none());
    }
}
