use shipyard_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Resource already exists: {0}")]
    Conflict(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Invalid secret name: {0}")]
    InvalidSecretName(String),

    #[error("Corrupt secret file {path}: {reason}")]
    CorruptSecret { path: String, reason: String },

    #[error("JSON serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ClientError> for StoreError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Conflict(what) => StoreError::AlreadyExists(what),
            ClientError::NotFound(what) => StoreError::NotFound(what),
            ClientError::InvalidResponse(msg) => StoreError::InvalidResponse(msg),
            ClientError::Serialization(e) => StoreError::Serialization(e),
            ClientError::Io(e) => StoreError::Io(e),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
