//! Contracts of the backing stores a project lifecycle touches.
//!
//! None of these stores share a transaction; callers that need all-or-nothing
//! behaviour across them have to compensate explicitly.

use async_trait::async_trait;

use crate::domain::{ExpandedProject, Project, Resource, SecretData};
use crate::error::StoreResult;

/// Git-backed system of record for project configuration.
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    /// `Ok(None)` when the project does not exist.
    async fn get_project(&self, project_name: &str) -> StoreResult<Option<Project>>;

    /// Fails if a project with the same name already exists.
    async fn create_project(&self, project: &Project) -> StoreResult<()>;

    /// Full overwrite of the record with the same name.
    async fn update_project(&self, project: &Project) -> StoreResult<()>;

    /// Deleting an absent project is not an error.
    async fn delete_project(&self, project_name: &str) -> StoreResult<()>;

    async fn create_stage(&self, project_name: &str, stage_name: &str) -> StoreResult<()>;

    async fn create_project_shipyard(
        &self,
        project_name: &str,
        resources: &[Resource],
    ) -> StoreResult<()>;

    async fn get_project_resource(
        &self,
        project_name: &str,
        resource_uri: &str,
    ) -> StoreResult<Option<Resource>>;
}

/// Named, opaque key/value containers holding credential material.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Empty map when the container does not exist.
    async fn get_secret(&self, name: &str) -> StoreResult<SecretData>;

    /// Create-or-replace.
    async fn update_secret(&self, name: &str, content: &SecretData) -> StoreResult<()>;

    /// Deleting an absent container is not an error.
    async fn delete_secret(&self, name: &str) -> StoreResult<()>;
}

/// Document store holding the runtime project records.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn create_project(&self, project: &ExpandedProject) -> StoreResult<()>;

    async fn get_projects(&self) -> StoreResult<Vec<ExpandedProject>>;

    async fn get_project(&self, project_name: &str) -> StoreResult<Option<ExpandedProject>>;

    async fn update_project_upstream(
        &self,
        project_name: &str,
        uri: &str,
        user: &str,
    ) -> StoreResult<()>;

    /// Deleting an absent project is not an error.
    async fn delete_project(&self, project_name: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Drops every event collection scoped to the project. Idempotent.
    async fn delete_event_collections(&self, project_name: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait TaskSequenceRepository: Send + Sync {
    /// Drops the task-sequence collection scoped to the project. Idempotent.
    async fn delete_task_sequence_collection(&self, project_name: &str) -> StoreResult<()>;
}
