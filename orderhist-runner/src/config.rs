//! Pipeline configuration.
//!
//! Loaded from an optional TOML file, then overlaid with environment
//! variables (after reading `.env`). Exchange credentials only ever come from
//! the environment.

use orderhist_core::upstream::{Credentials, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_BUCKET: &str = "ORDERHIST_BUCKET";
pub const ENV_STORAGE_ROOT: &str = "ORDERHIST_STORAGE_ROOT";
pub const ENV_BASE_URL: &str = "ORDERHIST_BASE_URL";
pub const ENV_MAX_PARALLEL: &str = "ORDERHIST_MAX_PARALLEL";
pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_API_SECRET: &str = "API_SECRET";
pub const ENV_PASSPHRASE: &str = "PASSPHRASE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bucket that artifacts and reports are written to.
    pub bucket: String,
    pub storage: StorageConfig,
    pub upstream: UpstreamConfig,
    pub coordinator: CoordinatorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory of the filesystem object store.
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
    pub breaker_cooldown_secs: u64,
    pub breaker_failure_threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Symbols fetched concurrently.
    pub max_parallel_tasks: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bucket: "orders-history-data".to_string(),
            storage: StorageConfig::default(),
            upstream: UpstreamConfig::default(),
            coordinator: CoordinatorConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            breaker_cooldown_secs: 300,
            breaker_failure_threshold: 3,
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_parallel_tasks: 4,
        }
    }
}

impl PipelineConfig {
    /// Parse from a TOML string. Missing sections take their defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Load `.env`, then the optional config file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Overlay values from `lookup` (normally the process environment).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bucket) = lookup(ENV_BUCKET) {
            self.bucket = bucket;
        }
        if let Some(root) = lookup(ENV_STORAGE_ROOT) {
            self.storage.root = PathBuf::from(root);
        }
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.upstream.base_url = url;
        }
        if let Some(raw) = lookup(ENV_MAX_PARALLEL) {
            self.coordinator.max_parallel_tasks = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{ENV_MAX_PARALLEL} must be a positive integer, got '{raw}'"))
            })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid("bucket must not be empty".into()));
        }
        if self.coordinator.max_parallel_tasks == 0 {
            return Err(ConfigError::Invalid(
                "coordinator.max_parallel_tasks must be at least 1".into(),
            ));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::Invalid("upstream.timeout_secs must be at least 1".into()));
        }
        Ok(())
    }
}

/// Read exchange credentials from `lookup`.
pub fn credentials_from<F>(lookup: F) -> Result<Credentials, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let require = |name: &'static str| {
        lookup(name)
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingVar(name))
    };
    Ok(Credentials {
        api_key: require(ENV_API_KEY)?,
        secret_key: require(ENV_API_SECRET)?,
        passphrase: require(ENV_PASSPHRASE)?,
    })
}

/// Read exchange credentials from the process environment.
pub fn credentials_from_env() -> Result<Credentials, ConfigError> {
    credentials_from(|name| std::env::var(name).ok())
}
