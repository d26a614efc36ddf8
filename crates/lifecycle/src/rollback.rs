//! Compensation stack for multi-store operations.
//!
//! Every forward step that changes a store pushes the step that undoes it.
//! On failure the stack is unwound strictly last-in-first-out. All undo steps
//! are idempotent, so a [`Rollback`] may be replayed any number of times.

use shipyard_core::{ConfigurationStore, Project, SecretData, SecretStore, StoreError, StoreResult};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::{ProjectError, Result};

#[derive(Clone, PartialEq, Eq)]
pub enum UndoStep {
    DeleteSecret { name: String },
    RestoreSecret { name: String, content: SecretData },
    DeleteConfigurationProject { project_name: String },
    RestoreConfigurationProject { project: Project },
}

impl fmt::Display for UndoStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeleteSecret { name } => write!(f, "delete secret {}", name),
            Self::RestoreSecret { name, .. } => write!(f, "restore secret {}", name),
            Self::DeleteConfigurationProject { project_name } => {
                write!(f, "delete configuration project {}", project_name)
            }
            Self::RestoreConfigurationProject { project } => {
                write!(f, "restore configuration project {}", project.project_name)
            }
        }
    }
}

// Secret content stays out of logs.
impl fmt::Debug for UndoStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UndoStep({})", self)
    }
}

/// Undo step that failed while unwinding.
#[derive(Debug)]
pub struct CompensationFailure {
    pub step: UndoStep,
    pub error: StoreError,
}

#[derive(Clone)]
pub struct Rollback {
    configuration_store: Arc<dyn ConfigurationStore>,
    secret_store: Arc<dyn SecretStore>,
    steps: Vec<UndoStep>,
}

impl Rollback {
    pub(crate) fn new(
        configuration_store: Arc<dyn ConfigurationStore>,
        secret_store: Arc<dyn SecretStore>,
    ) -> Self {
        Self {
            configuration_store,
            secret_store,
            steps: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, step: UndoStep) {
        debug!(step = %step, "Registered compensation");
        self.steps.push(step);
    }

    /// Drop every registered step; used once an operation committed.
    pub(crate) fn disarm(mut self) -> Self {
        self.steps.clear();
        self
    }

    /// Registered steps in push order.
    pub fn steps(&self) -> &[UndoStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Unwind every step, newest first.
    ///
    /// A failing step is logged and collected; the remaining steps still run.
    pub async fn run(&self) -> Vec<CompensationFailure> {
        let mut failures = Vec::new();

        for step in self.steps.iter().rev() {
            match self.apply(step).await {
                Ok(()) => debug!(step = %step, "Compensation applied"),
                Err(e) => {
                    error!(step = %step, error = %e, "Compensation failed");
                    failures.push(CompensationFailure {
                        step: step.clone(),
                        error: e,
                    });
                }
            }
        }

        failures
    }

    async fn apply(&self, step: &UndoStep) -> StoreResult<()> {
        match step {
            UndoStep::DeleteSecret { name } => self.secret_store.delete_secret(name).await,
            UndoStep::RestoreSecret { name, content } => {
                self.secret_store.update_secret(name, content).await
            }
            UndoStep::DeleteConfigurationProject { project_name } => {
                self.configuration_store.delete_project(project_name).await
            }
            UndoStep::RestoreConfigurationProject { project } => {
                self.configuration_store.update_project(project).await
            }
        }
    }
}

impl fmt::Debug for Rollback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rollback").field("steps", &self.steps).finish()
    }
}

/// Outcome of a compensated operation.
///
/// `rollback` is empty when the operation committed. When it failed, the
/// stack has already been unwound once and `compensation_failures` holds the
/// undo steps that did not apply; the rollback can be run again.
#[derive(Debug)]
pub struct SagaResult<T> {
    pub result: Result<T>,
    pub rollback: Rollback,
    pub compensation_failures: Vec<CompensationFailure>,
}

impl<T> SagaResult<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn is_err(&self) -> bool {
        self.result.is_err()
    }

    pub fn error(&self) -> Option<&ProjectError> {
        self.result.as_ref().err()
    }

    pub fn into_result(self) -> Result<T> {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shipyard_core::Resource;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Journal {
        calls: Mutex<Vec<String>>,
        fail_secret_delete: bool,
    }

    impl Journal {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SecretStore for Journal {
        async fn get_secret(&self, _name: &str) -> StoreResult<SecretData> {
            Ok(SecretData::new())
        }

        async fn update_secret(&self, name: &str, _content: &SecretData) -> StoreResult<()> {
            self.record(format!("update_secret {}", name));
            Ok(())
        }

        async fn delete_secret(&self, name: &str) -> StoreResult<()> {
            self.record(format!("delete_secret {}", name));
            if self.fail_secret_delete {
                return Err(StoreError::backend("secret store down"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ConfigurationStore for Journal {
        async fn get_project(&self, _name: &str) -> StoreResult<Option<Project>> {
            Ok(None)
        }

        async fn create_project(&self, _project: &Project) -> StoreResult<()> {
            Ok(())
        }

        async fn update_project(&self, project: &Project) -> StoreResult<()> {
            self.record(format!("update_project {}", project.project_name));
            Ok(())
        }

        async fn delete_project(&self, name: &str) -> StoreResult<()> {
            self.record(format!("delete_project {}", name));
            Ok(())
        }

        async fn create_stage(&self, _project: &str, _stage: &str) -> StoreResult<()> {
            Ok(())
        }

        async fn create_project_shipyard(
            &self,
            _project: &str,
            _resources: &[Resource],
        ) -> StoreResult<()> {
            Ok(())
        }

        async fn get_project_resource(
            &self,
            _project: &str,
            _uri: &str,
        ) -> StoreResult<Option<Resource>> {
            Ok(None)
        }
    }

    fn rollback_with(journal: Arc<Journal>) -> Rollback {
        let mut rollback = Rollback::new(journal.clone(), journal);
        rollback.push(UndoStep::DeleteSecret {
            name: "git-credentials-p".to_string(),
        });
        rollback.push(UndoStep::DeleteConfigurationProject {
            project_name: "p".to_string(),
        });
        rollback
    }

    #[tokio::test]
    async fn test_run_unwinds_lifo() {
        let journal = Arc::new(Journal::default());
        let rollback = rollback_with(journal.clone());

        let failures = rollback.run().await;

        assert!(failures.is_empty());
        assert_eq!(
            journal.calls(),
            vec!["delete_project p", "delete_secret git-credentials-p"]
        );
    }

    #[tokio::test]
    async fn test_failing_step_does_not_stop_unwind() {
        let journal = Arc::new(Journal {
            fail_secret_delete: true,
            ..Default::default()
        });
        let mut rollback = rollback_with(journal.clone());
        rollback.push(UndoStep::RestoreConfigurationProject {
            project: Project::new("p", "http://old", "old"),
        });

        let failures = rollback.run().await;

        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0].step, UndoStep::DeleteSecret { .. }));
        assert_eq!(
            journal.calls(),
            vec![
                "update_project p",
                "delete_project p",
                "delete_secret git-credentials-p"
            ]
        );
    }

    #[tokio::test]
    async fn test_disarmed_rollback_does_nothing() {
        let journal = Arc::new(Journal::default());
        let rollback = rollback_with(journal.clone()).disarm();

        assert!(rollback.is_empty());
        assert!(rollback.run().await.is_empty());
        assert!(journal.calls().is_empty());
    }

    #[test]
    fn test_debug_hides_secret_content() {
        let mut content = SecretData::new();
        content.insert("git-credentials".to_string(), b"super-secret".to_vec());
        let step = UndoStep::RestoreSecret {
            name: "git-credentials-p".to_string(),
            content,
        };

        let rendered = format!("{:?}", step);
        assert_eq!(rendered, "UndoStep(restore secret git-credentials-p)");
    }
}
