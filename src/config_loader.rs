use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::admission::DEFAULT_DEDUP_WINDOW_SECS;
use crate::errors::{LifeLogError, LifeLogResult};
use crate::log_store::DEFAULT_CAPACITY;
use crate::query::DEFAULT_TOP_DOMAINS;
use crate::retention::DEFAULT_RETENTION_DAYS;

pub const DEFAULT_CONFIG_FILE: &str = "lifelog.toml";
pub const ENV_PREFIX: &str = "LIFELOG_";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: i64,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_dedup_window_secs() -> i64 {
    DEFAULT_DEDUP_WINDOW_SECS
}

fn default_retention_days() -> i64 {
    DEFAULT_RETENTION_DAYS
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            capacity: default_capacity(),
            dedup_window_secs: default_dedup_window_secs(),
            retention_days: default_retention_days(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5_000
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryConfig {
    #[serde(default = "default_recent_limit")]
    pub default_recent_limit: i64,
    #[serde(default = "default_top_domains")]
    pub top_domains: usize,
}

fn default_recent_limit() -> i64 {
    10
}

fn default_top_domains() -> usize {
    DEFAULT_TOP_DOMAINS
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            default_recent_limit: default_recent_limit(),
            top_domains: default_top_domains(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LifeLogConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("lifelog"))
        .unwrap_or_else(|| PathBuf::from("data/lifelog"))
}

impl Default for LifeLogConfig {
    fn default() -> Self {
        LifeLogConfig {
            data_dir: default_data_dir(),
            log: LogConfig::default(),
            storage: StorageConfig::default(),
            query: QueryConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl LifeLogConfig {
    /// Configuration for a throwaway instance rooted at `data_dir`.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        LifeLogConfig {
            data_dir: data_dir.into(),
            ..LifeLogConfig::default()
        }
    }

    pub fn validate(&self) -> LifeLogResult<()> {
        if self.log.capacity == 0 {
            return Err(LifeLogError::config("log.capacity must be greater than zero"));
        }
        if self.log.dedup_window_secs < 0 {
            return Err(LifeLogError::config("log.dedup_window_secs cannot be negative"));
        }
        if self.log.retention_days <= 0 {
            return Err(LifeLogError::config("log.retention_days must be greater than zero"));
        }
        if self.storage.timeout_ms == 0 {
            return Err(LifeLogError::config("storage.timeout_ms must be greater than zero"));
        }
        if self.data_dir.as_os_str().is_empty() {
            return Err(LifeLogError::config("data_dir cannot be empty"));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> LifeLogResult<String> {
        toml::to_string_pretty(self).map_err(|e| LifeLogError::config(e.to_string()))
    }
}

/// Build the layered figment: defaults, then the TOML file, then `LIFELOG_*`
/// environment variables (nested keys split on `__`).
pub fn figment(path: Option<&Path>) -> Figment {
    let file = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    Figment::from(Serialized::defaults(LifeLogConfig::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["config_path"]).split("__"))
}

pub fn load_config(path: Option<&Path>) -> LifeLogResult<LifeLogConfig> {
    let config: LifeLogConfig = figment(path)
        .extract()
        .map_err(|e| LifeLogError::config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
