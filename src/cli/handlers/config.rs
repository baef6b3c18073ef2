//! Configuration commands

use anyhow::{Context, Result};
use std::path::PathBuf;

use super::super::{CliContext, ConfigAction};
use crate::config::ConfigManager;
use crate::stats::Platform;

const REDACTED: &str = "<redacted>";

pub struct ConfigHandler<'a> {
    context: &'a CliContext,
}

impl<'a> ConfigHandler<'a> {
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    /// Runs before any context exists so an existing file is never loaded first
    pub fn handle_init(config_path: Option<PathBuf>, force: bool) -> Result<()> {
        let path = ConfigManager::resolve_path(config_path.clone())?;
        if path.exists() && !force {
            println!("Configuration already initialized at: {}", path.display());
            println!("Use --force to overwrite");
            return Ok(());
        }

        let manager = ConfigManager::init(config_path, force)
            .context("Failed to write default configuration")?;
        println!(
            "Configuration initialized successfully at: {}",
            manager.config_path().display()
        );
        Ok(())
    }

    pub fn handle_config(&self, action: ConfigAction) -> Result<()> {
        let manager = &self.context.config_manager;
        match action {
            ConfigAction::Show => {
                let mut config = manager.config().clone();
                for provider in config.providers.values_mut() {
                    if provider.auth_token.is_some() {
                        provider.auth_token = Some(REDACTED.to_string());
                    }
                }
                let rendered =
                    toml::to_string_pretty(&config).context("Failed to render configuration")?;
                println!("{rendered}");
            }
            ConfigAction::Path => {
                println!("{}", manager.config_path().display());
            }
        }
        Ok(())
    }

    /// List the providers the current configuration registers
    pub fn handle_platforms(&self) -> Result<()> {
        let registry = self.context.provider_registry()?;
        if registry.is_empty() {
            println!("No providers configured.");
            println!(
                "Add a [providers.<platform>] section to {}",
                self.context.config_manager.config_path().display()
            );
            return Ok(());
        }

        let providers = &self.context.config_manager.config().providers;
        for platform in registry.platforms() {
            let endpoint = providers
                .iter()
                .find(|(name, _)| name.parse::<Platform>().ok() == Some(platform))
                .map(|(_, p)| p.endpoint.as_str())
                .unwrap_or("-");
            println!("{:<8} {:<6} {}", platform.as_str(), platform.vendor(), endpoint);
        }
        Ok(())
    }
}
