use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

const DATA_DIR: &str = ".shipyard-projects";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_DB_NAME: &str = "projects.db";
const DEFAULT_SECRETS_DIR: &str = "secrets";

/// Settings read from `~/.shipyard-projects/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CliConfig {
    pub database_url: String,
    pub configuration_service_url: String,
    pub secrets_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub log_filter: String,
    /// Hold a per-project lock for the duration of each operation.
    pub serialize_same_project: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        let data_dir = data_dir();
        Self {
            database_url: format!("sqlite:{}", data_dir.join(DEFAULT_DB_NAME).display()),
            configuration_service_url: "http://localhost:8080".to_string(),
            secrets_dir: data_dir.join(DEFAULT_SECRETS_DIR),
            request_timeout_secs: 30,
            log_filter: "shipyard_projects=info,lifecycle=info,stores=info,db=info".to_string(),
            serialize_same_project: true,
        }
    }
}

/// Config together with the reason it fell back to defaults, if it did.
///
/// The problem is reported once logging is up.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: CliConfig,
    pub path: PathBuf,
    pub problem: Option<String>,
}

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR)
}

pub fn default_config_path() -> PathBuf {
    data_dir().join(CONFIG_FILE)
}

impl CliConfig {
    pub async fn load(path: Option<&Path>) -> LoadedConfig {
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);

        if !path.exists() {
            return LoadedConfig {
                config: Self::default(),
                path,
                problem: None,
            };
        }

        let (config, problem) = match fs::read_to_string(&path).await {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => (config, None),
                Err(e) => (Self::default(), Some(format!("Failed to parse config: {}", e))),
            },
            Err(e) => (
                Self::default(),
                Some(format!("Failed to read config file: {}", e)),
            ),
        };

        LoadedConfig {
            config,
            path,
            problem,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = CliConfig::load(Some(&dir.path().join("absent.toml"))).await;

        assert_eq!(loaded.config, CliConfig::default());
        assert!(loaded.problem.is_none());
    }

    #[tokio::test]
    async fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
configuration_service_url = "http://configuration-service:8080"
request_timeout_secs = 5
serialize_same_project = false
"#,
        )
        .unwrap();

        let loaded = CliConfig::load(Some(&path)).await;

        assert!(loaded.problem.is_none());
        assert_eq!(
            loaded.config.configuration_service_url,
            "http://configuration-service:8080"
        );
        assert_eq!(loaded.config.request_timeout_secs, 5);
        assert!(!loaded.config.serialize_same_project);
        assert_eq!(loaded.config.database_url, CliConfig::default().database_url);
    }

    #[tokio::test]
    async fn test_unparsable_file_falls_back_with_problem() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "request_timeout_secs = \"soon\"").unwrap();

        let loaded = CliConfig::load(Some(&path)).await;

        assert_eq!(loaded.config, CliConfig::default());
        assert!(loaded.problem.unwrap().starts_with("Failed to parse config"));
    }
}
