//! Configuration module for the file manager.

use serde::Deserialize;
use std::path::Path;

use crate::{FilesError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Document store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/files_manager.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Key-value store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// In-process store, lost on restart.
    #[default]
    Memory,
    /// Redis server (requires the `redis` feature).
    Redis,
}

/// Key-value store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Which backend to use.
    #[serde(default)]
    pub backend: CacheBackend,
    /// Connection URL for the redis backend.
    #[serde(default = "default_redis_url")]
    pub url: String,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            url: default_redis_url(),
        }
    }
}

/// File storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Directory where uploaded bytes and derivatives are written.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
}

fn default_storage_path() -> String {
    "/tmp/files_manager".to_string()
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
        }
    }
}

/// Thumbnail worker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Number of jobs processed at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Deliveries of one job before it is dropped.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_concurrency() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional path to a log file.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Document store configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Key-value store configuration.
    #[serde(default)]
    pub cache: CacheConfig,
    /// File storage configuration.
    #[serde(default)]
    pub files: FilesConfig,
    /// Thumbnail worker configuration.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FilesError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FilesError::Config(format!("parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `PORT`: HTTP port
    /// - `DB_DATABASE`: database name, stored as `data/<name>.db`
    /// - `DB_PATH`: full database path (wins over `DB_DATABASE`)
    /// - `FOLDER_PATH`: storage directory for uploaded bytes
    /// - `REDIS_URL`: switches the key-value store to redis at this URL
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| var(name).filter(|v| !v.is_empty());

        if let Some(port) = var("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(name) = var("DB_DATABASE") {
            self.database.path = format!("data/{name}.db");
        }
        if let Some(path) = var("DB_PATH") {
            self.database.path = path;
        }
        if let Some(folder) = var("FOLDER_PATH") {
            self.files.storage_path = folder;
        }
        if let Some(url) = var("REDIS_URL") {
            self.cache.backend = CacheBackend::Redis;
            self.cache.url = url;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.files.storage_path.trim().is_empty() {
            return Err(FilesError::Config("files.storage_path is empty".to_string()));
        }
        if self.worker.concurrency == 0 {
            return Err(FilesError::Config(
                "worker.concurrency must be at least 1".to_string(),
            ));
        }
        if self.worker.max_attempts == 0 {
            return Err(FilesError::Config(
                "worker.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.cache.backend == CacheBackend::Redis && !cfg!(feature = "redis") {
            return Err(FilesError::Config(
                "cache.backend = \"redis\" requires the `redis` feature".to_string(),
            ));
        }
        Ok(())
    }
}
