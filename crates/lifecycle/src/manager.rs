//! Project lifecycle across the configuration store, the secret store and the
//! runtime repositories.
//!
//! `create` and `update` are compensated: every step that changed a store
//! registers its undo, and a failure unwinds the registered steps before the
//! error is returned. `delete` is best-effort teardown that runs every step
//! and reports every failure.

use shipyard_core::{
    git_credentials_secret_name, validate_project_name, ConfigurationStore, EventRepository,
    ExpandedProject, GitCredentials, Project, ProjectRepository, Resource, SecretStore, Shipyard,
    StoreError, StoreResult, TaskSequenceRepository, SHIPYARD_RESOURCE_URI,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Phase, PhaseFailure, ProjectError, Result};
use crate::locks::{ProjectLockGuard, ProjectLocks};
use crate::params::{CreateProjectParams, DeleteSummary, UpdateProjectParams};
use crate::rollback::{Rollback, SagaResult, UndoStep};

struct DeleteContext {
    git_remote_uri: Option<String>,
    stages: Vec<String>,
}

#[derive(Clone)]
pub struct ProjectManager {
    configuration_store: Arc<dyn ConfigurationStore>,
    secret_store: Arc<dyn SecretStore>,
    project_repo: Arc<dyn ProjectRepository>,
    task_sequence_repo: Arc<dyn TaskSequenceRepository>,
    event_repo: Arc<dyn EventRepository>,
    locks: Option<ProjectLocks>,
}

impl ProjectManager {
    pub fn new(
        configuration_store: Arc<dyn ConfigurationStore>,
        secret_store: Arc<dyn SecretStore>,
        project_repo: Arc<dyn ProjectRepository>,
        task_sequence_repo: Arc<dyn TaskSequenceRepository>,
        event_repo: Arc<dyn EventRepository>,
    ) -> Self {
        Self {
            configuration_store,
            secret_store,
            project_repo,
            task_sequence_repo,
            event_repo,
            locks: Some(ProjectLocks::new()),
        }
    }

    /// Replace the advisory locks; `None` lets same-name operations overlap.
    pub fn with_locks(mut self, locks: Option<ProjectLocks>) -> Self {
        self.locks = locks;
        self
    }

    async fn lock(&self, project_name: &str) -> Option<ProjectLockGuard> {
        match &self.locks {
            Some(locks) => Some(locks.acquire(project_name).await),
            None => None,
        }
    }

    fn rollback(&self) -> Rollback {
        Rollback::new(self.configuration_store.clone(), self.secret_store.clone())
    }

    /// All runtime project records.
    pub async fn get(&self) -> Result<Vec<ExpandedProject>> {
        self.project_repo
            .get_projects()
            .await
            .map_err(|e| ProjectError::store(Phase::ListProjects, e))
    }

    pub async fn get_by_name(&self, project_name: &str) -> Result<ExpandedProject> {
        self.project_repo
            .get_project(project_name)
            .await
            .map_err(|e| ProjectError::store(Phase::GetProject, e))?
            .ok_or_else(|| ProjectError::NotFound(project_name.to_string()))
    }

    /// Create a project in all three stores, or in none of them.
    pub async fn create(&self, params: CreateProjectParams) -> SagaResult<ExpandedProject> {
        let _guard = self.lock(&params.name).await;
        info!(project = %params.name, "Creating project");

        let mut rollback = self.rollback();
        let result = self.create_steps(&params, &mut rollback).await;
        self.settle(&params.name, "create", result, rollback).await
    }

    async fn create_steps(
        &self,
        params: &CreateProjectParams,
        rollback: &mut Rollback,
    ) -> Result<ExpandedProject> {
        let name = params.name.as_str();

        validate_project_name(name)?;
        let shipyard = Shipyard::decode(&params.shipyard)?;

        let existing = self
            .configuration_store
            .get_project(name)
            .await
            .map_err(|e| ProjectError::store(Phase::LookupProject, e))?;
        if existing.is_some() {
            return Err(ProjectError::AlreadyExists(name.to_string()));
        }

        let secret_name = git_credentials_secret_name(name);
        let secret = params.credentials().to_secret_data()?;
        self.secret_store
            .update_secret(&secret_name, &secret)
            .await
            .map_err(|e| ProjectError::store(Phase::WriteSecret, e))?;
        rollback.push(UndoStep::DeleteSecret { name: secret_name });

        let project = Project::new(name, &params.git_remote_uri, &params.git_user);
        self.configuration_store
            .create_project(&project)
            .await
            .map_err(|e| ProjectError::store(Phase::CreateProject, e))?;
        rollback.push(UndoStep::DeleteConfigurationProject {
            project_name: name.to_string(),
        });

        for stage in shipyard.stage_names() {
            debug!(project = %name, stage = %stage, "Creating stage");
            self.configuration_store
                .create_stage(name, stage)
                .await
                .map_err(|e| ProjectError::store(Phase::CreateStage, e))?;
        }

        self.configuration_store
            .create_project_shipyard(name, &[Resource::shipyard(params.shipyard.as_str())])
            .await
            .map_err(|e| ProjectError::store(Phase::UploadShipyard, e))?;

        let expanded = ExpandedProject::from_shipyard(
            name,
            &params.git_remote_uri,
            &params.git_user,
            params.shipyard.as_str(),
            &shipyard,
        );
        self.project_repo
            .create_project(&expanded)
            .await
            .map_err(|e| ProjectError::store(Phase::PersistProject, e))?;

        Ok(expanded)
    }

    /// Point a project at a new upstream repository.
    ///
    /// Returns the configuration-store record as written.
    pub async fn update(&self, params: UpdateProjectParams) -> SagaResult<Project> {
        let _guard = self.lock(&params.name).await;
        info!(project = %params.name, "Updating project upstream");

        let mut rollback = self.rollback();
        let result = self.update_steps(&params, &mut rollback).await;
        self.settle(&params.name, "update", result, rollback).await
    }

    async fn update_steps(
        &self,
        params: &UpdateProjectParams,
        rollback: &mut Rollback,
    ) -> Result<Project> {
        let name = params.name.as_str();
        validate_project_name(name)?;

        let secret_name = git_credentials_secret_name(name);
        let previous_secret = self
            .secret_store
            .get_secret(&secret_name)
            .await
            .map_err(|e| ProjectError::store(Phase::ReadSecret, e))?;
        let previous_credentials = GitCredentials::from_secret_data(&previous_secret)
            .map_err(|e| {
                ProjectError::store(Phase::DecodeSecret, StoreError::InvalidResponse(e.to_string()))
            })?;
        if previous_credentials.is_none() {
            debug!(project = %name, "No previous git credentials");
        }

        let secret = params.credentials().to_secret_data()?;
        self.secret_store
            .update_secret(&secret_name, &secret)
            .await
            .map_err(|e| ProjectError::store(Phase::WriteSecret, e))?;
        if previous_secret.is_empty() {
            rollback.push(UndoStep::DeleteSecret { name: secret_name });
        } else {
            rollback.push(UndoStep::RestoreSecret {
                name: secret_name,
                content: previous_secret,
            });
        }

        let previous_project = self
            .configuration_store
            .get_project(name)
            .await
            .map_err(|e| ProjectError::store(Phase::ReadProject, e))?;

        // A missing record is written from scratch and removed again on unwind.
        let updated = match &previous_project {
            Some(project) => project.with_upstream(&params.git_remote_uri, &params.git_user),
            None => {
                debug!(project = %name, "No configuration record, writing a fresh one");
                Project::new(name, &params.git_remote_uri, &params.git_user)
            }
        };
        self.configuration_store
            .update_project(&updated)
            .await
            .map_err(|e| ProjectError::store(Phase::UpdateProject, e))?;
        rollback.push(match previous_project {
            Some(project) => UndoStep::RestoreConfigurationProject { project },
            None => UndoStep::DeleteConfigurationProject {
                project_name: name.to_string(),
            },
        });

        self.project_repo
            .update_project_upstream(name, &params.git_remote_uri, &params.git_user)
            .await
            .map_err(|e| ProjectError::store(Phase::UpdateUpstream, e))?;

        Ok(updated)
    }

    async fn settle<T>(
        &self,
        project_name: &str,
        operation: &'static str,
        result: Result<T>,
        rollback: Rollback,
    ) -> SagaResult<T> {
        match result {
            Ok(value) => {
                info!(project = %project_name, operation, "Project operation committed");
                SagaResult {
                    result: Ok(value),
                    rollback: rollback.disarm(),
                    compensation_failures: Vec::new(),
                }
            }
            Err(e) => {
                warn!(
                    project = %project_name,
                    operation,
                    error = %e,
                    steps = rollback.steps().len(),
                    "Project operation failed, rolling back"
                );
                let compensation_failures = rollback.run().await;
                SagaResult {
                    result: Err(e),
                    rollback,
                    compensation_failures,
                }
            }
        }
    }

    /// Tear a project down in every store.
    ///
    /// Every step runs even if an earlier one failed. The upstream git
    /// repository is left untouched.
    pub async fn delete(&self, project_name: &str) -> Result<DeleteSummary> {
        validate_project_name(project_name)?;
        let _guard = self.lock(project_name).await;
        info!(project = %project_name, "Deleting project");

        let secret_name = git_credentials_secret_name(project_name);
        let context = self.delete_context(project_name, &secret_name).await;

        let mut failures = Vec::new();
        record(
            &mut failures,
            project_name,
            Phase::DeleteEvents,
            self.event_repo.delete_event_collections(project_name).await,
        );
        record(
            &mut failures,
            project_name,
            Phase::DeleteTaskSequences,
            self.task_sequence_repo
                .delete_task_sequence_collection(project_name)
                .await,
        );
        record(
            &mut failures,
            project_name,
            Phase::DeleteProjectRecord,
            self.project_repo.delete_project(project_name).await,
        );
        record(
            &mut failures,
            project_name,
            Phase::DeleteSecret,
            self.secret_store.delete_secret(&secret_name).await,
        );
        record(
            &mut failures,
            project_name,
            Phase::DeleteConfigurationProject,
            self.configuration_store.delete_project(project_name).await,
        );

        if !failures.is_empty() {
            return Err(ProjectError::DeleteFailed {
                project: project_name.to_string(),
                failures,
            });
        }

        info!(project = %project_name, "Project deleted");
        Ok(DeleteSummary::new(
            project_name,
            context.git_remote_uri,
            context.stages,
        ))
    }

    // Read-only context for the delete summary; failures here are not fatal.
    async fn delete_context(&self, project_name: &str, secret_name: &str) -> DeleteContext {
        let from_project = match self.configuration_store.get_project(project_name).await {
            Ok(project) => project.map(|p| p.git_remote_uri),
            Err(e) => {
                warn!(project = %project_name, error = %e, "Could not read configuration project before delete");
                None
            }
        };

        let from_secret = match self.secret_store.get_secret(secret_name).await {
            Ok(data) => GitCredentials::from_secret_data(&data)
                .ok()
                .flatten()
                .map(|c| c.remote_uri),
            Err(e) => {
                warn!(project = %project_name, error = %e, "Could not read git credentials before delete");
                None
            }
        };

        let stages = match self
            .configuration_store
            .get_project_resource(project_name, SHIPYARD_RESOURCE_URI)
            .await
        {
            Ok(Some(resource)) => match Shipyard::decode(&resource.resource_content) {
                Ok(shipyard) => shipyard.stage_names().map(str::to_string).collect(),
                Err(e) => {
                    warn!(project = %project_name, error = %e, "Stored shipyard is unreadable");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(project = %project_name, error = %e, "Could not read shipyard before delete");
                Vec::new()
            }
        };

        DeleteContext {
            git_remote_uri: from_project
                .into_iter()
                .chain(from_secret)
                .find(|uri| !uri.is_empty()),
            stages,
        }
    }
}

fn record(
    failures: &mut Vec<PhaseFailure>,
    project_name: &str,
    phase: Phase,
    outcome: StoreResult<()>,
) {
    match outcome {
        Ok(()) => debug!(project = %project_name, phase = %phase, "Teardown step done"),
        Err(error) => {
            warn!(project = %project_name, phase = %phase, error = %error, "Teardown step failed");
            failures.push(PhaseFailure { phase, error });
        }
    }
}
