use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::CoreError;

/// Key under which the credentials blob is stored in the secret container.
pub const GIT_CREDENTIALS_KEY: &str = "git-credentials";

const SECRET_NAME_PREFIX: &str = "git-credentials-";

/// Raw content of a named secret container.
pub type SecretData = BTreeMap<String, Vec<u8>>;

/// Name of the secret container holding a project's git credentials.
pub fn git_credentials_secret_name(project_name: &str) -> String {
    format!("{}{}", SECRET_NAME_PREFIX, project_name)
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GitCredentials {
    pub user: String,
    pub token: String,
    #[serde(rename = "remoteURI")]
    pub remote_uri: String,
}

impl GitCredentials {
    pub fn new(
        user: impl Into<String>,
        token: impl Into<String>,
        remote_uri: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            token: token.into(),
            remote_uri: remote_uri.into(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(self).map_err(|e| CoreError::InvalidCredentials(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(bytes).map_err(|e| CoreError::InvalidCredentials(e.to_string()))
    }

    /// Wrap the encoded credentials into secret container content.
    pub fn to_secret_data(&self) -> Result<SecretData, CoreError> {
        let mut data = SecretData::new();
        data.insert(GIT_CREDENTIALS_KEY.to_string(), self.encode()?);
        Ok(data)
    }

    /// Extract credentials from secret container content.
    ///
    /// Returns `Ok(None)` when the container carries no credentials entry.
    pub fn from_secret_data(data: &SecretData) -> Result<Option<Self>, CoreError> {
        data.get(GIT_CREDENTIALS_KEY)
            .map(|bytes| Self::decode(bytes))
            .transpose()
    }
}

// Keeps the token out of logs.
impl std::fmt::Debug for GitCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitCredentials")
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .field("remote_uri", &self.remote_uri)
            .finish()
    }
}
