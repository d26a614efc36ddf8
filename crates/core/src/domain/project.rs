use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::credentials::git_credentials_secret_name;
use super::shipyard::Shipyard;
use crate::error::CoreError;

/// URI under which the shipyard is stored as a project resource.
pub const SHIPYARD_RESOURCE_URI: &str = "shipyard.yaml";

const MAX_PROJECT_NAME_LEN: usize = 200;

fn project_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z][a-z0-9-]*$").expect("static pattern"))
}

pub fn validate_project_name(name: &str) -> Result<(), CoreError> {
    if name.len() > MAX_PROJECT_NAME_LEN || !project_name_pattern().is_match(name) {
        return Err(CoreError::InvalidProjectName(name.to_string()));
    }
    Ok(())
}

/// Creation timestamp in the format the rest of the control plane expects
/// (unix nanoseconds, rendered as a string).
pub fn creation_timestamp() -> String {
    Utc::now().timestamp_nanos_opt().unwrap_or_default().to_string()
}

/// Stage entry of a configuration-store project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub stage_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub service_name: String,
}

/// Project record held by the configuration store.
///
/// The git token is never part of this record; `git_token_ref` names the
/// secret container that holds it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub project_name: String,
    #[serde(default, rename = "gitRemoteURI")]
    pub git_remote_uri: String,
    #[serde(default)]
    pub git_user: String,
    #[serde(default)]
    pub git_token_ref: String,
    #[serde(default)]
    pub creation_date: String,
    #[serde(default)]
    pub shipyard_version: String,
    #[serde(default)]
    pub stages: Vec<Stage>,
}

impl Project {
    pub fn new(
        project_name: impl Into<String>,
        git_remote_uri: impl Into<String>,
        git_user: impl Into<String>,
    ) -> Self {
        let project_name = project_name.into();
        Self {
            git_token_ref: git_credentials_secret_name(&project_name),
            project_name,
            git_remote_uri: git_remote_uri.into(),
            git_user: git_user.into(),
            ..Default::default()
        }
    }

    /// Copy of this record with a new upstream; every other field is kept.
    pub fn with_upstream(&self, git_remote_uri: &str, git_user: &str) -> Self {
        Self {
            git_remote_uri: git_remote_uri.to_string(),
            git_user: git_user.to_string(),
            git_token_ref: git_credentials_secret_name(&self.project_name),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resource {
    #[serde(rename = "resourceURI")]
    pub resource_uri: String,
    #[serde(rename = "resourceContent")]
    pub resource_content: String,
}

impl Resource {
    pub fn shipyard(encoded: impl Into<String>) -> Self {
        Self {
            resource_uri: SHIPYARD_RESOURCE_URI.to_string(),
            resource_content: encoded.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedService {
    pub service_name: String,
    #[serde(default)]
    pub creation_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedStage {
    pub stage_name: String,
    #[serde(default)]
    pub services: Vec<ExpandedService>,
}

/// Runtime project record held by the project repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedProject {
    pub project_name: String,
    #[serde(default)]
    pub creation_date: String,
    #[serde(default, rename = "gitRemoteURI")]
    pub git_remote_uri: String,
    #[serde(default)]
    pub git_user: String,
    /// Shipyard payload exactly as it was submitted (base64).
    #[serde(default)]
    pub shipyard: String,
    #[serde(default)]
    pub shipyard_version: String,
    #[serde(default)]
    pub stages: Vec<ExpandedStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_event_context: Option<String>,
}

impl ExpandedProject {
    pub fn from_shipyard(
        project_name: impl Into<String>,
        git_remote_uri: impl Into<String>,
        git_user: impl Into<String>,
        encoded_shipyard: impl Into<String>,
        shipyard: &Shipyard,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            creation_date: creation_timestamp(),
            git_remote_uri: git_remote_uri.into(),
            git_user: git_user.into(),
            shipyard: encoded_shipyard.into(),
            shipyard_version: shipyard.api_version.clone(),
            stages: shipyard
                .stage_names()
                .map(|name| ExpandedStage {
                    stage_name: name.to_string(),
                    services: Vec::new(),
                })
                .collect(),
            last_event_context: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_project_name() {
        assert!(validate_project_name("my-project").is_ok());
        assert!(validate_project_name("p1").is_ok());
        assert!(validate_project_name("").is_err());
        assert!(validate_project_name("1project").is_err());
        assert!(validate_project_name("My-Project").is_err());
        assert!(validate_project_name("my_project").is_err());
        assert!(validate_project_name(&"a".repeat(201)).is_err());
    }

    #[test]
    fn test_project_new_references_secret() {
        let project = Project::new("my-project", "http://remote", "me");
        assert_eq!(project.git_token_ref, "git-credentials-my-project");
        assert!(project.creation_date.is_empty());
    }

    #[test]
    fn test_with_upstream_preserves_other_fields() {
        let old = Project {
            project_name: "my-project".to_string(),
            git_remote_uri: "http://my-old-remote.uri".to_string(),
            git_user: "my-old-user".to_string(),
            git_token_ref: "git-credentials-my-project".to_string(),
            creation_date: "old-creationdate".to_string(),
            shipyard_version: "v1".to_string(),
            stages: vec![Stage {
                stage_name: "dev".to_string(),
                services: Vec::new(),
            }],
        };

        let updated = old.with_upstream("git-url", "git-user");

        assert_eq!(updated.git_remote_uri, "git-url");
        assert_eq!(updated.git_user, "git-user");
        assert_eq!(updated.creation_date, "old-creationdate");
        assert_eq!(updated.shipyard_version, "v1");
        assert_eq!(updated.stages, old.stages);
    }

    #[test]
    fn test_project_wire_names() {
        let project = Project::new("p", "http://remote", "me");
        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(json["projectName"], "p");
        assert_eq!(json["gitRemoteURI"], "http://remote");
        assert_eq!(json["gitUser"], "me");
        assert_eq!(json["gitTokenRef"], "git-credentials-p");
    }
}
