use std::collections::BTreeMap;
use std::sync::Arc;

use super::traits::PushProvider;
use crate::errors::{AppError, AppResult};
use crate::stats::Platform;

/// Platform → provider lookup, assembled once at startup
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<Platform, Arc<dyn PushProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, returning the one it replaced
    pub fn register(&mut self, provider: Arc<dyn PushProvider>) -> Option<Arc<dyn PushProvider>> {
        self.providers.insert(provider.platform(), provider)
    }

    /// Look up by platform name or vendor alias
    pub fn get(&self, name: &str) -> AppResult<Arc<dyn PushProvider>> {
        let platform: Platform = name.parse()?;
        self.get_platform(platform)
    }

    pub fn get_platform(&self, platform: Platform) -> AppResult<Arc<dyn PushProvider>> {
        self.providers
            .get(&platform)
            .cloned()
            .ok_or_else(|| AppError::ProviderNotRegistered {
                name: platform.to_string(),
            })
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.providers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
