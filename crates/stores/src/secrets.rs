//! Secret containers persisted as one JSON document per container.
//!
//! Values are stored base64-encoded under `<root>/<name>.json`. Writes go
//! through a temp file and a rename so a crashed write never leaves a
//! half-written container behind.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use shipyard_core::{SecretData, SecretStore, StoreResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{ClientError, Result};

#[derive(Debug, Clone)]
pub struct FileSecretStore {
    root: PathBuf,
}

impl FileSecretStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn container_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
            || name.starts_with('.')
        {
            return Err(ClientError::InvalidSecretName(name.to_string()));
        }
        Ok(self.root.join(format!("{}.json", name)))
    }

    pub async fn read(&self, name: &str) -> Result<SecretData> {
        let path = self.container_path(name)?;

        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SecretData::new()),
            Err(e) => return Err(e.into()),
        };

        let encoded: BTreeMap<String, String> =
            serde_json::from_slice(&raw).map_err(|e| ClientError::CorruptSecret {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        encoded
            .into_iter()
            .map(|(key, value)| {
                STANDARD
                    .decode(value.as_bytes())
                    .map(|bytes| (key.clone(), bytes))
                    .map_err(|e| ClientError::CorruptSecret {
                        path: path.display().to_string(),
                        reason: format!("key '{}': {}", key, e),
                    })
            })
            .collect()
    }

    pub async fn write(&self, name: &str, content: &SecretData) -> Result<()> {
        let path = self.container_path(name)?;
        fs::create_dir_all(&self.root).await?;

        let encoded: BTreeMap<&str, String> = content
            .iter()
            .map(|(key, value)| (key.as_str(), STANDARD.encode(value)))
            .collect();
        let body = serde_json::to_vec_pretty(&encoded)?;

        let tmp = self.root.join(format!(".{}.json.tmp", name));
        let written = async {
            write_private(&tmp, &body).await?;
            fs::rename(&tmp, &path).await
        }
        .await;
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::debug!(secret = %name, keys = content.len(), "Wrote secret container");
        Ok(())
    }

    pub async fn remove(&self, name: &str) -> Result<()> {
        let path = self.container_path(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(secret = %name, "Removed secret container");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// Owner-only from the moment the file exists.
async fn write_private(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let _ = fs::remove_file(path).await;

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(path).await?;
    file.write_all(body).await?;
    file.sync_all().await
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get_secret(&self, name: &str) -> StoreResult<SecretData> {
        Ok(self.read(name).await?)
    }

    async fn update_secret(&self, name: &str, content: &SecretData) -> StoreResult<()> {
        Ok(self.write(name, content).await?)
    }

    async fn delete_secret(&self, name: &str) -> StoreResult<()> {
        Ok(self.remove(name).await?)
    }
}
