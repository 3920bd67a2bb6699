//! Configuration types for completed-import

use crate::error::{Error, Result};
use crate::types::ClientId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Largest accepted `max_concurrent_imports`
///
/// Bounded by what the import semaphore can hold and by what shutdown can drain in
/// one `acquire_many` call.
pub const MAX_CONCURRENT_IMPORTS: usize = if Semaphore::MAX_PERMITS < u32::MAX as usize {
    Semaphore::MAX_PERMITS
} else {
    u32::MAX as usize
};

/// Import behavior configuration (intake folder, concurrency, retry policy)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Intake folder watched by the separate folder scanner ("downloaded episodes" folder)
    ///
    /// Downloads whose output lands directly inside this folder are left to the
    /// scanner and never imported by the pipeline. None = no intake folder.
    #[serde(default)]
    pub downloaded_episodes_folder: Option<PathBuf>,

    /// Maximum import attempts running at the same time (default: 2)
    #[serde(default = "default_max_concurrent_imports")]
    pub max_concurrent_imports: usize,

    /// Give up on a download after this many failed attempts (None = retry forever)
    ///
    /// A download that runs out of attempts moves to `ImportFailed` and stays there
    /// until its client re-queues it.
    #[serde(default)]
    pub max_import_attempts: Option<u32>,

    /// What to do with tracked downloads that disappear from their client
    #[serde(default)]
    pub removal_policy: RemovalPolicy,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            downloaded_episodes_folder: None,
            max_concurrent_imports: default_max_concurrent_imports(),
            max_import_attempts: None,
            removal_policy: RemovalPolicy::default(),
        }
    }
}

/// What happens to tracked downloads whose item is no longer reported by its client
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Keep every tracked download for the lifetime of the process
    #[default]
    Retain,
    /// Forget downloads that a reachable client stopped reporting
    ForgetMissing,
}

/// Poll loop configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Run the background poller (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Time between poll cycles (default: 60 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval: default_poll_interval(),
        }
    }
}

/// Download client registration and per-client policy
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Unique client ID (must match [`DownloadClient::id`](crate::client::DownloadClient::id))
    pub id: ClientId,

    /// Display name
    pub name: String,

    /// Category the application assigns to its grabs in this client
    #[serde(default)]
    pub category: Option<String>,

    /// Whether the client is polled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite database path for history (default: "./completed-import.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Main configuration for the import pipeline
///
/// Every field has a sensible default, so `Config::default()` is a working
/// configuration with no intake folder and no registered client policies.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Import behavior
    #[serde(default)]
    pub import: ImportConfig,

    /// Poll loop settings
    #[serde(default)]
    pub polling: PollingConfig,

    /// Per-client settings
    #[serde(default)]
    pub clients: Vec<ClientConfig>,

    /// History storage
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Config {
    /// Parse a JSON configuration document and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        Self::from_json_str(&raw)
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.import.max_concurrent_imports == 0 {
            return Err(Error::config(
                "max_concurrent_imports",
                "max_concurrent_imports must be at least 1",
            ));
        }

        if self.import.max_concurrent_imports > MAX_CONCURRENT_IMPORTS {
            return Err(Error::config(
                "max_concurrent_imports",
                format!("max_concurrent_imports must be at most {MAX_CONCURRENT_IMPORTS}"),
            ));
        }

        if self.import.max_import_attempts == Some(0) {
            return Err(Error::config(
                "max_import_attempts",
                "max_import_attempts must be at least 1 when set",
            ));
        }

        if self.polling.poll_interval.is_zero() {
            return Err(Error::config(
                "poll_interval",
                "poll_interval must be greater than zero",
            ));
        }

        let mut seen = HashSet::new();
        for client in &self.clients {
            if !seen.insert(&client.id) {
                return Err(Error::config(
                    "clients",
                    format!("duplicate client id '{}'", client.id),
                ));
            }
        }

        Ok(())
    }

    /// Intake folder, if configured
    pub fn intake_folder(&self) -> Option<&Path> {
        self.import
            .downloaded_episodes_folder
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Settings for a client, if it was registered in the config
    pub fn client(&self, id: &ClientId) -> Option<&ClientConfig> {
        self.clients.iter().find(|c| &c.id == id)
    }

    /// Category policy for a client
    pub fn client_category(&self, id: &ClientId) -> Option<&str> {
        self.client(id).and_then(|c| c.category.as_deref())
    }

    /// Clients explicitly disabled in config (unlisted clients are enabled)
    pub fn is_client_enabled(&self, id: &ClientId) -> bool {
        self.client(id).is_none_or(|c| c.enabled)
    }
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_imports() -> usize {
    2
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./completed-import.db")
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
