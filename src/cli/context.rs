//! CLI context: configuration, logging and the shared counter store

use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::ConfigManager;
use crate::errors::{AppError, AppResult};
use crate::gateway::Gateway;
use crate::providers::{DefaultProviderFactory, ProviderFactory, ProviderRegistry};
use crate::stats::Stats;
use crate::store::{open_store, CounterStore};

/// CLI execution context containing shared dependencies and configuration
#[derive(Clone)]
pub struct CliContext {
    pub verbose: bool,
    pub config_manager: Arc<ConfigManager>,
}

impl CliContext {
    pub fn new(config_path: Option<PathBuf>, verbose: bool) -> AppResult<Self> {
        let config_manager = Arc::new(ConfigManager::new(config_path)?);
        Ok(Self {
            verbose,
            config_manager,
        })
    }

    /// Console logs go to stderr; `logging.log_path` adds a daily-rolled file
    ///
    /// Keep the returned guard alive until exit or buffered file lines are lost.
    pub fn init_logging(&self) -> AppResult<Option<WorkerGuard>> {
        let logging = &self.config_manager.config().logging;
        let level = if self.verbose { "debug" } else { logging.level.as_str() };
        let env_filter = EnvFilter::from_default_env()
            .add_directive(level.parse().unwrap_or_else(|_| tracing::Level::INFO.into()));

        let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

        let (file_layer, guard) = match &logging.log_path {
            Some(log_path) => {
                let directory = log_path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| std::path::Path::new("."));
                std::fs::create_dir_all(directory).map_err(|e| {
                    AppError::io_with_source(directory, "create log directory", e)
                })?;
                let file_name = log_path
                    .file_name()
                    .unwrap_or_else(|| std::ffi::OsStr::new("push-gateway.log"));

                let appender = tracing_appender::rolling::daily(directory, file_name);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false);
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        // A subscriber may already be installed when embedded; keep it
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init();

        tracing::debug!(
            config = %self.config_manager.config_path().display(),
            "Logging initialized"
        );
        Ok(guard)
    }

    /// Open the configured counter store
    pub fn open_store(&self) -> AppResult<Arc<dyn CounterStore>> {
        open_store(&self.config_manager.config().storage)
    }

    /// Gateway wired to `stats` with relay providers from configuration
    pub fn build_gateway(&self, stats: Stats) -> AppResult<Gateway> {
        Gateway::from_config(
            self.config_manager.config(),
            stats,
            &DefaultProviderFactory::new(),
        )
    }

    /// Registry built from the enabled `[providers.*]` entries
    pub fn provider_registry(&self) -> AppResult<ProviderRegistry> {
        DefaultProviderFactory::new().build_registry(self.config_manager.config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_creates_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let context = CliContext::new(Some(path.clone()), false).unwrap();
        assert!(path.exists());
        assert!(!context.verbose);
        assert_eq!(context.config_manager.config_path(), path.as_path());
    }

    #[test]
    fn test_context_opens_memory_store_by_default() {
        let temp_dir = TempDir::new().unwrap();
        let context = CliContext::new(Some(temp_dir.path().join("config.toml")), true).unwrap();

        let store = context.open_store().unwrap();
        store.set("hipush-ios-total", 3);
        assert_eq!(store.get("hipush-ios-total"), 3);
    }

    #[test]
    fn test_context_rejects_broken_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[dispatch\nretry = ").unwrap();

        assert!(CliContext::new(Some(path), false).is_err());
    }
}
