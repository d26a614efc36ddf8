use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid project name '{0}': must start with a lowercase letter and contain only lowercase letters, digits and '-'")]
    InvalidProjectName(String),

    #[error("Invalid shipyard: {0}")]
    InvalidShipyard(String),

    #[error("Invalid git credentials: {0}")]
    InvalidCredentials(String),
}

/// Error surfaced by any of the backing store collaborators.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend request failed: {0}")]
    Backend(String),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
