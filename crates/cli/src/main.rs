mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use db::{SqliteEventRepository, SqliteProjectRepository, SqliteTaskSequenceRepository};
use lifecycle::{
    CreateProjectParams, ProjectLocks, ProjectManager, SagaResult, UpdateProjectParams,
};
use shipyard_core::{ExpandedProject, Shipyard};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use stores::{ConfigurationServiceClient, FileSecretStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "shipyard-projects")]
#[command(about = "Manage shipyard projects and their git upstreams", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.shipyard-projects/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a project from a shipyard file
    Create {
        name: String,

        #[arg(long)]
        shipyard: PathBuf,

        #[arg(long)]
        git_remote_uri: String,

        #[arg(long)]
        git_user: String,

        #[arg(long, env = "GIT_TOKEN", hide_env_values = true)]
        git_token: String,
    },
    /// Point a project at a new git upstream
    Update {
        name: String,

        #[arg(long)]
        git_remote_uri: String,

        #[arg(long)]
        git_user: String,

        #[arg(long, env = "GIT_TOKEN", hide_env_values = true)]
        git_token: String,
    },
    /// Delete a project everywhere except its upstream repository
    Delete { name: String },
    /// Show one project
    Get { name: String },
    /// List all projects
    List {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = CliConfig::load(cli.config.as_deref()).await;
    init_tracing(&loaded.config.log_filter);
    if let Some(problem) = &loaded.problem {
        tracing::warn!(path = %loaded.path.display(), "{}, using defaults", problem);
    }

    let manager = build_manager(&loaded.config).await?;

    match cli.command {
        Commands::Create {
            name,
            shipyard,
            git_remote_uri,
            git_user,
            git_token,
        } => {
            let shipyard = read_shipyard(&shipyard).await?;
            let outcome = manager
                .create(CreateProjectParams {
                    name,
                    git_remote_uri,
                    git_user,
                    git_token,
                    shipyard,
                })
                .await;
            let project = settle(outcome)?;
            println!("Created project '{}'", project.project_name);
            print_stages(&project);
        }
        Commands::Update {
            name,
            git_remote_uri,
            git_user,
            git_token,
        } => {
            let outcome = manager
                .update(UpdateProjectParams {
                    name,
                    git_remote_uri,
                    git_user,
                    git_token,
                })
                .await;
            let project = settle(outcome)?;
            println!(
                "Updated project '{}': upstream {} (user {})",
                project.project_name, project.git_remote_uri, project.git_user
            );
        }
        Commands::Delete { name } => {
            let summary = manager.delete(&name).await?;
            println!("{}", summary.message);
        }
        Commands::Get { name } => {
            let project = manager.get_by_name(&name).await?;
            println!("{}", serde_json::to_string_pretty(&project)?);
        }
        Commands::List { json } => {
            let projects = manager.get().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&projects)?);
            } else if projects.is_empty() {
                println!("No projects yet.");
            } else {
                for project in &projects {
                    println!(
                        "  {:<30} {:<40} {}",
                        project.project_name,
                        project.git_remote_uri,
                        stage_list(project)
                    );
                }
            }
        }
    }

    Ok(())
}

async fn build_manager(config: &CliConfig) -> Result<ProjectManager> {
    if let Some(parent) = config.secrets_dir.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    ensure_database_dir(&config.database_url).await?;

    tracing::debug!(database_url = %config.database_url, "Opening project database");
    let pool = db::connect(&config.database_url)
        .await
        .context("Failed to open project database")?;

    let configuration = ConfigurationServiceClient::with_timeout(
        &config.configuration_service_url,
        Duration::from_secs(config.request_timeout_secs),
    )
    .context("Failed to build configuration service client")?;

    let locks = config.serialize_same_project.then(ProjectLocks::new);

    Ok(ProjectManager::new(
        Arc::new(configuration),
        Arc::new(FileSecretStore::new(&config.secrets_dir)),
        Arc::new(SqliteProjectRepository::new(pool.clone())),
        Arc::new(SqliteTaskSequenceRepository::new(pool.clone())),
        Arc::new(SqliteEventRepository::new(pool)),
    )
    .with_locks(locks))
}

async fn ensure_database_dir(database_url: &str) -> Result<()> {
    let Some(path) = database_url.strip_prefix("sqlite:") else {
        return Ok(());
    };
    if path.contains(":memory:") {
        return Ok(());
    }
    let path = Path::new(path.trim_start_matches("//"));
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

async fn read_shipyard(path: &Path) -> Result<String> {
    let yaml = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read shipyard file {}", path.display()))?;
    Ok(Shipyard::encode_yaml(&yaml))
}

fn settle<T>(outcome: SagaResult<T>) -> Result<T> {
    for failure in &outcome.compensation_failures {
        eprintln!(
            "warning: rollback step '{}' failed: {}",
            failure.step, failure.error
        );
    }
    Ok(outcome.into_result()?)
}

fn stage_list(project: &ExpandedProject) -> String {
    project
        .stages
        .iter()
        .map(|s| s.stage_name.as_str())
        .collect::<Vec<_>>()
        .join(" → ")
}

fn print_stages(project: &ExpandedProject) {
    println!("  Stages: {}", stage_list(project));
    println!("  Shipyard version: {}", project.shipyard_version);
}

fn init_tracing(fallback_filter: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback_filter.into()),
        )
        .init();
}
