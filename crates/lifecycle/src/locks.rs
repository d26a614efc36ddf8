//! Per-project advisory locks.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

/// Serializes lifecycle operations that target the same project name.
///
/// Operations on different names never contend.
#[derive(Clone, Default)]
pub struct ProjectLocks {
    entries: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

/// Held for the duration of one operation; released on drop.
pub struct ProjectLockGuard {
    project_name: String,
    _guard: OwnedMutexGuard<()>,
}

impl ProjectLockGuard {
    pub fn project_name(&self) -> &str {
        &self.project_name
    }
}

impl Drop for ProjectLockGuard {
    fn drop(&mut self) {
        trace!(project = %self.project_name, "Released project lock");
    }
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, project_name: &str) -> ProjectLockGuard {
        let lock = {
            let mut entries = self.entries.lock().await;
            // Entries referenced only by the map are idle.
            entries.retain(|_, lock| Arc::strong_count(lock) > 1);
            entries
                .entry(project_name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let guard = lock.lock_owned().await;
        trace!(project = %project_name, "Acquired project lock");

        ProjectLockGuard {
            project_name: project_name.to_string(),
            _guard: guard,
        }
    }

    /// Number of names currently tracked.
    pub async fn tracked(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_name_is_serialized() {
        let locks = ProjectLocks::new();
        let first = locks.acquire("p").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let guard = locks.acquire("p").await;
                guard.project_name().to_string()
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(first);
        assert_eq!(contender.await.unwrap(), "p");
    }

    #[tokio::test]
    async fn test_different_names_do_not_contend() {
        let locks = ProjectLocks::new();
        let _a = locks.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_idle_entries_are_pruned() {
        let locks = ProjectLocks::new();
        drop(locks.acquire("a").await);
        drop(locks.acquire("b").await);

        let _c = locks.acquire("c").await;
        assert_eq!(locks.tracked().await, 1);
    }
}
