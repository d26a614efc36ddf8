use shipyard_core::{CoreError, StoreError};
use std::fmt;
use thiserror::Error;

/// Step of a lifecycle operation a store failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    LookupProject,
    WriteSecret,
    CreateProject,
    CreateStage,
    UploadShipyard,
    PersistProject,
    ReadSecret,
    DecodeSecret,
    ReadProject,
    UpdateProject,
    UpdateUpstream,
    ListProjects,
    GetProject,
    DeleteEvents,
    DeleteTaskSequences,
    DeleteProjectRecord,
    DeleteSecret,
    DeleteConfigurationProject,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LookupProject => "lookup_project",
            Self::WriteSecret => "write_secret",
            Self::CreateProject => "create_project",
            Self::CreateStage => "create_stage",
            Self::UploadShipyard => "upload_shipyard",
            Self::PersistProject => "persist_project",
            Self::ReadSecret => "read_secret",
            Self::DecodeSecret => "decode_secret",
            Self::ReadProject => "read_project",
            Self::UpdateProject => "update_project",
            Self::UpdateUpstream => "update_upstream",
            Self::ListProjects => "list_projects",
            Self::GetProject => "get_project",
            Self::DeleteEvents => "delete_events",
            Self::DeleteTaskSequences => "delete_task_sequences",
            Self::DeleteProjectRecord => "delete_project_record",
            Self::DeleteSecret => "delete_secret",
            Self::DeleteConfigurationProject => "delete_configuration_project",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed teardown step of a delete.
#[derive(Debug)]
pub struct PhaseFailure {
    pub phase: Phase,
    pub error: StoreError,
}

impl fmt::Display for PhaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.phase, self.error)
    }
}

fn summarize(failures: &[PhaseFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Project already exists: {0}")]
    AlreadyExists(String),

    #[error("Project not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(#[from] CoreError),

    #[error("Step {phase} failed: {source}")]
    Store {
        phase: Phase,
        #[source]
        source: StoreError,
    },

    #[error("Failed to delete project {project}: {}", summarize(.failures))]
    DeleteFailed {
        project: String,
        failures: Vec<PhaseFailure>,
    },
}

impl ProjectError {
    pub fn store(phase: Phase, source: StoreError) -> Self {
        Self::Store { phase, source }
    }

    /// Phase the error is attributed to, if it came from a store.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Store { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProjectError>;
