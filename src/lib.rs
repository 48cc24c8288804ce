//! Project Manager
//!
//! Data and consistency core of a project-management application:
//! - Record store client for a generic CRUD service over HTTP
//! - Task normalization, hierarchy building and parent validation
//! - Optimistic single-field updates backed by a durable pending queue
//! - Task and project services on top of the above

pub mod pending;
pub mod projects;
pub mod store;
pub mod sync;
pub mod tasks;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use pending::{FilePendingStore, PendingChangeStore};
use projects::ProjectManager;
use store::{HttpRecordStore, RecordStore, Table};
use sync::{FieldUpdateController, RetryReport, TracingObserver, UpdateObserver};
use tasks::TaskManager;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub store: StoreYamlConfig,
    pub pending: PendingYamlConfig,
}

/// Record store section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreYamlConfig {
    pub url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for StoreYamlConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:3001/api".into(),
            token: None,
            timeout_secs: 15,
        }
    }
}

/// Pending queue section
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PendingYamlConfig {
    /// Directory holding one JSON file per queue; `~/.project-manager/pending`
    /// when unset
    pub dir: Option<PathBuf>,
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub store_url: String,
    pub store_token: Option<String>,
    pub store_timeout: Duration,
    pub pending_dir: PathBuf,
}

impl Config {
    /// Equivalent to `from_yaml_and_env(None)`
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. A missing file
    /// means env vars / defaults only.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);

        let store_timeout_secs = match std::env::var("PM_STORE_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("PM_STORE_TIMEOUT_SECS is not a number: {:?}", raw))?,
            Err(_) => yaml.store.timeout_secs,
        };

        let pending_dir = std::env::var("PM_PENDING_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .or(yaml.pending.dir)
            .unwrap_or_else(default_pending_dir);

        Ok(Self {
            store_url: std::env::var("PM_STORE_URL").unwrap_or(yaml.store.url),
            store_token: std::env::var("PM_STORE_TOKEN")
                .ok()
                .or(yaml.store.token)
                .filter(|t| !t.trim().is_empty()),
            store_timeout: Duration::from_secs(store_timeout_secs),
            pending_dir,
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

fn default_pending_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".project-manager")
        .join("pending")
}

// ============================================================================
// Application state
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub pending: Arc<dyn PendingChangeStore>,
    pub tasks: Arc<TaskManager>,
    pub projects: Arc<ProjectManager>,
    /// One field update controller per table, in `Table::ALL` order
    controllers: Vec<Arc<FieldUpdateController>>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Create application state talking to the configured record service,
    /// with the pending queue on disk
    pub fn new(config: Config) -> Result<Self> {
        let store = HttpRecordStore::new(
            &config.store_url,
            config.store_token.clone(),
            config.store_timeout,
        )
        .with_context(|| format!("Failed to create record store client for {}", config.store_url))?;
        let pending = FilePendingStore::new(config.pending_dir.clone());

        Ok(Self::with_backends(
            config,
            Arc::new(store),
            Arc::new(pending),
            Arc::new(TracingObserver),
        ))
    }

    /// Assemble state around existing backends
    pub fn with_backends(
        config: Config,
        store: Arc<dyn RecordStore>,
        pending: Arc<dyn PendingChangeStore>,
        observer: Arc<dyn UpdateObserver>,
    ) -> Self {
        let controllers: Vec<Arc<FieldUpdateController>> = Table::ALL
            .into_iter()
            .map(|table| {
                Arc::new(FieldUpdateController::new(
                    store.clone(),
                    pending.clone(),
                    observer.clone(),
                    table,
                ))
            })
            .collect();

        let tasks = Arc::new(TaskManager::new(
            store.clone(),
            controllers[table_index(Table::Tasks)].clone(),
        ));
        let projects = Arc::new(ProjectManager::new(
            store.clone(),
            controllers[table_index(Table::Projects)].clone(),
        ));

        Self {
            store,
            pending,
            tasks,
            projects,
            controllers,
            config: Arc::new(config),
        }
    }

    /// Field update controller for a table
    pub fn controller(&self, table: Table) -> &Arc<FieldUpdateController> {
        &self.controllers[table_index(table)]
    }

    /// Replay the pending queue of every table. A table whose queue cannot be
    /// read is reported as an error without stopping the others.
    pub async fn retry_all(&self) -> Vec<(Table, Result<RetryReport>)> {
        let mut reports = Vec::with_capacity(self.controllers.len());
        for controller in &self.controllers {
            let report = controller
                .retry_failed_updates()
                .await
                .with_context(|| format!("Failed to replay {}", controller.table().pending_key()));
            reports.push((controller.table(), report));
        }
        reports
    }
}

fn table_index(table: Table) -> usize {
    Table::ALL
        .iter()
        .position(|t| *t == table)
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================
