//! Compensated project lifecycle: create, update and delete a project across
//! independent stores.

pub mod error;
pub mod locks;
pub mod manager;
pub mod params;
pub mod rollback;

pub use error::{Phase, PhaseFailure, ProjectError, Result};
pub use locks::{ProjectLockGuard, ProjectLocks};
pub use manager::ProjectManager;
pub use params::{CreateProjectParams, DeleteSummary, UpdateProjectParams};
pub use rollback::{CompensationFailure, Rollback, SagaResult, UndoStep};
