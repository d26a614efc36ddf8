use shipyard_core::{ExpandedProject, ExpandedStage};

use crate::error::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProjectRow {
    pub project_name: String,
    pub creation_date: String,
    pub git_remote_uri: String,
    pub git_user: String,
    pub shipyard: String,
    pub shipyard_version: String,
    pub stages: String,
    pub last_event_context: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ProjectRow {
    pub fn into_domain(self) -> Result<ExpandedProject, DbError> {
        let stages: Vec<ExpandedStage> = serde_json::from_str(&self.stages)?;
        Ok(ExpandedProject {
            project_name: self.project_name,
            creation_date: self.creation_date,
            git_remote_uri: self.git_remote_uri,
            git_user: self.git_user,
            shipyard: self.shipyard,
            shipyard_version: self.shipyard_version,
            stages,
            last_event_context: self.last_event_context,
        })
    }

    pub fn from_domain(project: &ExpandedProject, now: i64) -> Result<Self, DbError> {
        Ok(Self {
            project_name: project.project_name.clone(),
            creation_date: project.creation_date.clone(),
            git_remote_uri: project.git_remote_uri.clone(),
            git_user: project.git_user.clone(),
            shipyard: project.shipyard.clone(),
            shipyard_version: project.shipyard_version.clone(),
            stages: serde_json::to_string(&project.stages)?,
            last_event_context: project.last_event_context.clone(),
            created_at: now,
            updated_at: now,
        })
    }
}
