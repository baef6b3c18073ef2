use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::{AppError, AppResult};
use crate::store::SetSemantics;

pub const DEFAULT_MAX_CONCURRENT: usize = 100;
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 1;
pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 5;

/// Whole seconds as a duration; anything ≤ 0 becomes one second
pub fn at_least_one_second(secs: i64) -> Duration {
    Duration::from_secs(u64::try_from(secs).unwrap_or(0).max(1))
}

/// Main configuration structure for the push gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// platform name -> provider settings
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,
}

/// Fan-out and retry defaults
///
/// Signed on purpose: `max_concurrent` ≤ 0 means the default of 100 and
/// `retry_interval_secs` ≤ 0 means one second.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: i64,
    /// Extra attempts after the first when a request doesn't say
    #[serde(default)]
    pub retry: u32,
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: i64,
    /// Retry the first failure without waiting
    #[serde(default = "default_true")]
    pub immediate_first_retry: bool,
}

fn default_max_concurrent() -> i64 {
    DEFAULT_MAX_CONCURRENT as i64
}

fn default_retry_interval_secs() -> i64 {
    DEFAULT_RETRY_INTERVAL_SECS as i64
}

fn default_flush_interval_secs() -> i64 {
    DEFAULT_FLUSH_INTERVAL_SECS as i64
}

fn default_true() -> bool {
    true
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            retry: 0,
            retry_interval_secs: default_retry_interval_secs(),
            immediate_first_retry: true,
        }
    }
}

impl DispatchConfig {
    /// Effective fan-out bound
    pub fn concurrency_limit(&self) -> usize {
        usize::try_from(self.max_concurrent)
            .ok()
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_MAX_CONCURRENT)
    }

    pub fn retry_interval(&self) -> Duration {
        at_least_one_second(self.retry_interval_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageEngine {
    #[default]
    Memory,
    File,
}

/// Counter store selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub engine: StorageEngine,
    /// Snapshot file for the `file` engine, defaults to `~/.push-gateway/counters.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// ≤ 0 flushes every second
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: i64,
    #[serde(default)]
    pub set_semantics: SetSemantics,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            engine: StorageEngine::Memory,
            path: None,
            flush_interval_secs: default_flush_interval_secs(),
            set_semantics: SetSemantics::Assign,
        }
    }
}

impl StorageConfig {
    pub fn resolved_path(&self) -> AppResult<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Ok(super::gateway_home()?.join("counters.json")),
        }
    }

    pub fn flush_interval(&self) -> Duration {
        at_least_one_second(self.flush_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_path: None,
        }
    }
}

/// Settings for one platform's relay adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// When set, requests carrying a different app id are rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Config {
    /// Check values that serde alone can't
    pub fn validate(&self) -> AppResult<()> {
        for (name, provider) in &self.providers {
            name.parse::<crate::stats::Platform>()?;
            url::Url::parse(&provider.endpoint).map_err(|_| {
                AppError::invalid_config_value(
                    format!("providers.{name}.endpoint"),
                    provider.endpoint.clone(),
                )
            })?;
        }

        Ok(())
    }
}
