use shipyard_core::GitCredentials;
use std::fmt;

#[derive(Clone)]
pub struct CreateProjectParams {
    pub name: String,
    pub git_remote_uri: String,
    pub git_user: String,
    pub git_token: String,
    /// Base64-encoded shipyard YAML; padding is optional.
    pub shipyard: String,
}

impl CreateProjectParams {
    pub fn credentials(&self) -> GitCredentials {
        GitCredentials::new(&self.git_user, &self.git_token, &self.git_remote_uri)
    }
}

impl fmt::Debug for CreateProjectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateProjectParams")
            .field("name", &self.name)
            .field("git_remote_uri", &self.git_remote_uri)
            .field("git_user", &self.git_user)
            .field("git_token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// New upstream for a project. The name identifies the project and is never
/// changed.
#[derive(Clone)]
pub struct UpdateProjectParams {
    pub name: String,
    pub git_remote_uri: String,
    pub git_user: String,
    pub git_token: String,
}

impl UpdateProjectParams {
    pub fn credentials(&self) -> GitCredentials {
        GitCredentials::new(&self.git_user, &self.git_token, &self.git_remote_uri)
    }
}

impl fmt::Debug for UpdateProjectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateProjectParams")
            .field("name", &self.name)
            .field("git_remote_uri", &self.git_remote_uri)
            .field("git_user", &self.git_user)
            .field("git_token", &"<redacted>")
            .finish()
    }
}

/// Result of a successful delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteSummary {
    pub project_name: String,
    pub git_remote_uri: Option<String>,
    /// Stages declared by the shipyard the project had before deletion.
    pub stages: Vec<String>,
    pub message: String,
}

impl DeleteSummary {
    pub fn new(project_name: &str, git_remote_uri: Option<String>, stages: Vec<String>) -> Self {
        let mut message = format!("Project {} deleted.", project_name);
        if !stages.is_empty() {
            message.push_str(&format!(" Removed stages: {}.", stages.join(", ")));
        }
        if let Some(uri) = &git_remote_uri {
            message.push_str(&format!(
                " The upstream repository {} was not deleted; remove it manually if it is no longer needed.",
                uri
            ));
        }

        Self {
            project_name: project_name.to_string(),
            git_remote_uri,
            stages,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let params = CreateProjectParams {
            name: "p".to_string(),
            git_remote_uri: "http://remote".to_string(),
            git_user: "me".to_string(),
            git_token: "super-secret".to_string(),
            shipyard: String::new(),
        };
        assert!(!format!("{:?}", params).contains("super-secret"));
        assert_eq!(params.credentials().token, "super-secret");
    }

    #[test]
    fn test_delete_summary_mentions_upstream() {
        let summary = DeleteSummary::new("p", Some("http://remote".to_string()), Vec::new());
        assert!(summary.message.contains("http://remote"));
        assert!(summary.message.contains("was not deleted"));

        let summary = DeleteSummary::new("p", None, Vec::new());
        assert_eq!(summary.message, "Project p deleted.");
    }

    #[test]
    fn test_delete_summary_lists_stages() {
        let stages = vec!["dev".to_string(), "production".to_string()];
        let summary = DeleteSummary::new("p", None, stages.clone());

        assert_eq!(summary.stages, stages);
        assert_eq!(summary.message, "Project p deleted. Removed stages: dev, production.");
    }
}
