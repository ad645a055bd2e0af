//! Configuration module for FileVault.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation and defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::newtypes::{SyncType, UserId};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for FileVault.
///
/// Every section is optional in the YAML file; missing sections and fields
/// take their default values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub scan: ScanConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Local directory mirrored by `filevault init` when none is given.
    pub root: PathBuf,
    /// Seconds between polling ticks in `watch` mode.
    pub poll_interval: u64,
    /// Owner of the sync configuration and every item it creates.
    pub user: String,
    /// Label selecting one of the user's sync configurations.
    pub sync_type: String,
}

/// Local scanning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Follow symbolic links while walking the sync root.
    pub follow_links: bool,
    /// Entry names to leave out of snapshots: exact names, `*suffix` or `prefix*`.
    pub ignore: Vec<String>,
}

/// Reference adapter storage locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database holding item metadata and sync configurations.
    pub database: PathBuf,
    /// Directory holding file payloads.
    pub objects_dir: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Using default configuration");
                Self::default()
            }
        }
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/filevault/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("filevault")
            .join("config.yaml")
    }

    /// The configured user as a validated [`UserId`].
    pub fn user_id(&self) -> Result<UserId, DomainError> {
        UserId::new(self.sync.user.clone())
    }

    /// The configured sync type as a validated [`SyncType`].
    pub fn sync_type(&self) -> Result<SyncType, DomainError> {
        SyncType::new(self.sync.sync_type.clone())
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("filevault")
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("FileVault"),
            poll_interval: 30,
            user: std::env::var("USER").unwrap_or_else(|_| "local".to_string()),
            sync_type: SyncType::default().to_string(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_links: false,
            ignore: vec![".DS_Store".to_string(), "*.swp".to_string(), "~*".to_string()],
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = data_dir();
        Self {
            database: data_dir.join("filevault.db"),
            objects_dir: data_dir.join("objects"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.poll_interval"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.poll_interval == 0 {
            errors.push(ValidationError {
                field: "sync.poll_interval".into(),
                message: "must be greater than 0".into(),
            });
        }
        if let Err(e) = self.user_id() {
            errors.push(ValidationError {
                field: "sync.user".into(),
                message: e.to_string(),
            });
        }
        if let Err(e) = self.sync_type() {
            errors.push(ValidationError {
                field: "sync.sync_type".into(),
                message: e.to_string(),
            });
        }

        // --- scan ---
        // Patterns match single entry names, so '/' can never match
        for (index, pattern) in self.scan.ignore.iter().enumerate() {
            let problem = if pattern.is_empty() || pattern == "*" {
                Some("would ignore every entry".to_string())
            } else if pattern.contains('/') {
                Some("must match a single entry name".to_string())
            } else {
                glob::Pattern::new(pattern).err().map(|e| e.to_string())
            };
            if let Some(reason) = problem {
                errors.push(ValidationError {
                    field: format!("scan.ignore[{index}]"),
                    message: format!("invalid pattern '{pattern}': {reason}"),
                });
            }
        }

        // --- storage ---
        if self.storage.database.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.database".into(),
                message: "must not be empty".into(),
            });
        }
        if self.storage.objects_dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.objects_dir".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}
