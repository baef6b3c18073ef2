//! Configuration loading
//!
//! The gateway reads one TOML file. Its location is resolved in order:
//!
//! 1. an explicit path (`--config`)
//! 2. the `PUSH_GATEWAY_CONFIG` environment variable
//! 3. `~/.push-gateway/config.toml`
//!
//! A missing file is created with defaults on first use.

mod types;

use directories::BaseDirs;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{AppError, AppResult};

pub use types::{
    at_least_one_second, Config, DispatchConfig, LoggingConfig, ProviderConfig, StorageConfig,
    StorageEngine, DEFAULT_FLUSH_INTERVAL_SECS, DEFAULT_MAX_CONCURRENT,
    DEFAULT_RETRY_INTERVAL_SECS,
};

pub const CONFIG_ENV_VAR: &str = "PUSH_GATEWAY_CONFIG";

/// Base directory for gateway state in the user's home
pub fn gateway_home() -> AppResult<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| AppError::config("Failed to get base directories"))?;
    Ok(base_dirs.home_dir().join(".push-gateway"))
}

/// Owns the loaded configuration and the file it came from
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Load (or create) the configuration at the resolved location
    ///
    /// # Errors
    ///
    /// Fails when the directory can't be created, the file can't be read or
    /// parsed, or the parsed values don't validate.
    pub fn new(explicit_path: Option<PathBuf>) -> AppResult<Self> {
        let config_path = Self::resolve_path(explicit_path)?;
        let config = Self::load_or_create(&config_path)?;
        config.validate()?;

        Ok(ConfigManager {
            config_path,
            config,
        })
    }

    /// Write defaults to the resolved location, replacing any existing file when `force`
    pub fn init(explicit_path: Option<PathBuf>, force: bool) -> AppResult<Self> {
        let config_path = Self::resolve_path(explicit_path)?;
        if config_path.exists() && !force {
            return Err(AppError::config(format!(
                "Configuration already exists at {} (use --force to overwrite)",
                config_path.display()
            )));
        }

        let manager = ConfigManager {
            config_path,
            config: Config::default(),
        };
        manager.save()?;
        Ok(manager)
    }

    pub fn resolve_path(explicit_path: Option<PathBuf>) -> AppResult<PathBuf> {
        if let Some(path) = explicit_path {
            return Ok(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        Ok(gateway_home()?.join("config.toml"))
    }

    fn load_or_create(path: &Path) -> AppResult<Config> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| AppError::io_with_source(path, "read config file", e))?;
            Ok(toml::from_str(&content)?)
        } else {
            let config = Config::default();
            write_config(path, &config)?;
            Ok(config)
        }
    }

    /// Write the current configuration back to its file
    pub fn save(&self) -> AppResult<()> {
        write_config(&self.config_path, &self.config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

fn write_config(path: &Path, config: &Config) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io_with_source(parent, "create config directory", e))?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| AppError::config_with_source("Failed to serialize config", e))?;
    fs::write(path, content).map_err(|e| AppError::io_with_source(path, "write config file", e))
}
