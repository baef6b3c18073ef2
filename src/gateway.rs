//! Request entry point: provider lookup, validation, dispatch

use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::{at_least_one_second, Config};
use crate::dispatch::{DispatchReport, Dispatcher, RetryPolicy};
use crate::errors::AppResult;
use crate::providers::{
    ProviderFactory, ProviderRegistry, PushProvider, SendOptions, SendRequest, SendResponse,
};
use crate::stats::Stats;

/// Result of [`Gateway::deliver`]
#[derive(Debug)]
pub struct Delivery {
    pub response: SendResponse,
    /// `None` for a dry run
    pub report: Option<DispatchReport>,
}

impl Delivery {
    pub fn is_dry_run(&self) -> bool {
        self.report.is_none()
    }
}

/// Routes send requests to registered providers through the dispatcher
#[derive(Clone)]
pub struct Gateway {
    registry: ProviderRegistry,
    dispatcher: Dispatcher,
    defaults: RetryPolicy,
}

impl Gateway {
    pub fn new(registry: ProviderRegistry, dispatcher: Dispatcher, defaults: RetryPolicy) -> Self {
        Self {
            registry,
            dispatcher,
            defaults,
        }
    }

    /// Wire providers, dispatcher and counters from configuration
    pub fn from_config(config: &Config, stats: Stats, factory: &dyn ProviderFactory) -> AppResult<Self> {
        let registry = factory.build_registry(config)?;
        let dispatcher = Dispatcher::from_config(&config.dispatch).with_stats(stats);
        Ok(Self::new(
            registry,
            dispatcher,
            RetryPolicy::from_config(&config.dispatch),
        ))
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn provider(&self, platform: &str) -> AppResult<Arc<dyn PushProvider>> {
        self.registry.get(platform)
    }

    /// Per-call overrides on top of the configured retry defaults
    pub fn retry_policy(&self, options: &SendOptions) -> RetryPolicy {
        let mut policy = self.defaults.clone();
        if let Some(retry) = options.retry {
            policy.retry = retry;
        }
        if let Some(interval) = options.retry_interval {
            policy.interval = at_least_one_second(interval);
        }
        policy
    }

    /// Validate and dispatch, keeping the per-token report
    ///
    /// Validation failures return before any send and leave counters alone.
    /// A dry run stops after validation.
    #[instrument(name = "deliver", skip(self, request, options), fields(tokens = request.tokens.len()))]
    pub async fn deliver(
        &self,
        platform: &str,
        request: &SendRequest,
        options: &SendOptions,
    ) -> AppResult<Delivery> {
        let provider = self.registry.get(platform)?;
        provider.check_notification(request)?;

        if options.dry_run {
            info!(platform = %provider.platform(), "Dry run, nothing sent");
            return Ok(Delivery {
                response: SendResponse::default(),
                report: None,
            });
        }

        let sender = provider.prepare(request)?;
        let policy = self.retry_policy(options);
        let report = self
            .dispatcher
            .dispatch(provider.platform(), sender, &request.tokens, &policy)
            .await;

        let task_id = report
            .first_success()
            .and_then(|outcome| provider.task_id(outcome));

        Ok(Delivery {
            response: SendResponse { task_id },
            report: Some(report),
        })
    }

    /// Validate and dispatch; any failed token turns into the aggregate error
    pub async fn send(
        &self,
        platform: &str,
        request: &SendRequest,
        options: &SendOptions,
    ) -> AppResult<SendResponse> {
        let delivery = self.deliver(platform, request, options).await?;
        if let Some(err) = delivery.report.as_ref().and_then(DispatchReport::aggregate_error) {
            return Err(err);
        }
        Ok(delivery.response)
    }
}
