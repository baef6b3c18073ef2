use std::sync::Arc;
use tracing::{debug, info};

use super::registry::ProviderRegistry;
use super::relay::{RelayProvider, DEFAULT_USER_AGENT};
use super::traits::PushProvider;
use crate::config::{Config, ProviderConfig};
use crate::errors::AppResult;
use crate::stats::Platform;

/// Builds provider adapters from configuration; swap it out in tests
pub trait ProviderFactory: Send + Sync {
    /// Create the adapter for one configured platform
    fn create(&self, platform: Platform, config: &ProviderConfig) -> AppResult<Arc<dyn PushProvider>>;

    /// Adapter kinds this factory knows how to build
    fn supported_types(&self) -> Vec<&'static str>;

    /// Register every enabled `[providers.<platform>]` entry
    fn build_registry(&self, config: &Config) -> AppResult<ProviderRegistry> {
        let mut registry = ProviderRegistry::new();

        for (name, provider_config) in &config.providers {
            let platform: Platform = name.parse()?;
            if !provider_config.enabled {
                debug!(platform = %platform, "Provider disabled, skipping");
                continue;
            }

            let provider = self.create(platform, provider_config)?;
            if registry.register(provider).is_some() {
                debug!(platform = %platform, "Provider entry replaced an earlier alias");
            }
        }

        info!(providers = registry.len(), "Provider registry ready");
        Ok(registry)
    }
}

/// Factory producing [`RelayProvider`]s
pub struct DefaultProviderFactory {
    default_timeout: Option<u64>,
    user_agent: String,
}

impl DefaultProviderFactory {
    pub fn new() -> Self {
        Self {
            default_timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Factory-wide fallbacks for entries that leave them unset
    pub fn with_defaults(timeout_secs: u64, user_agent: impl Into<String>) -> Self {
        Self {
            default_timeout: Some(timeout_secs),
            user_agent: user_agent.into(),
        }
    }
}

impl Default for DefaultProviderFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderFactory for DefaultProviderFactory {
    fn create(&self, platform: Platform, config: &ProviderConfig) -> AppResult<Arc<dyn PushProvider>> {
        let mut config = config.clone();
        config.timeout_secs = config.timeout_secs.or(self.default_timeout);

        let provider = RelayProvider::new(platform, &config, &self.user_agent)?;
        debug!(platform = %platform, endpoint = %provider.endpoint(), "Created relay provider");
        Ok(Arc::new(provider))
    }

    fn supported_types(&self) -> Vec<&'static str> {
        vec!["relay"]
    }
}
