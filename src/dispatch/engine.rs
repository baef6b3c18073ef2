use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use super::outcome::DispatchOutcome;
use super::report::{DispatchReport, TokenReport};
use super::retry::RetryPolicy;
use crate::config::{DispatchConfig, DEFAULT_MAX_CONCURRENT};
use crate::errors::AppResult;
use crate::stats::{Platform, Stats};

/// Sends one already-built notification to a single token
#[async_trait]
pub trait TokenSender: Send + Sync {
    async fn send(&self, token: &str) -> AppResult<DispatchOutcome>;
}

/// [`TokenSender`] backed by a closure
pub struct FnSender<F> {
    send: F,
}

#[async_trait]
impl<F, Fut> TokenSender for FnSender<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = AppResult<DispatchOutcome>> + Send,
{
    async fn send(&self, token: &str) -> AppResult<DispatchOutcome> {
        (self.send)(token.to_string()).await
    }
}

/// Wrap a closure as a shareable [`TokenSender`]
pub fn sender_fn<F, Fut>(send: F) -> Arc<FnSender<F>>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = AppResult<DispatchOutcome>> + Send,
{
    Arc::new(FnSender { send })
}

/// Bounded-concurrency fan-out with independent per-token retry
///
/// At most `max_concurrent` tokens are in flight. Results are collected
/// through a [`JoinSet`] and merged once every task has finished; dropping
/// the `dispatch` future aborts whatever is still running.
#[derive(Clone)]
pub struct Dispatcher {
    max_concurrent: usize,
    stats: Option<Stats>,
}

impl Dispatcher {
    /// `0` means the default of 100
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = if max_concurrent == 0 {
            DEFAULT_MAX_CONCURRENT
        } else {
            max_concurrent
        };

        Self {
            max_concurrent,
            stats: None,
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(config.concurrency_limit())
    }

    /// Record every terminal token outcome into `stats`
    pub fn with_stats(mut self, stats: Stats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    #[instrument(name = "dispatch", skip_all, fields(platform = %platform, tokens = tokens.len()))]
    pub async fn dispatch(
        &self,
        platform: Platform,
        sender: Arc<dyn TokenSender>,
        tokens: &[String],
        policy: &RetryPolicy,
    ) -> DispatchReport {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();

        for (index, token) in tokens.iter().enumerate() {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!("Dispatch semaphore closed: {}", e);
                    break;
                }
            };

            let sender = Arc::clone(&sender);
            let token = token.clone();
            let policy = policy.clone();
            tasks.spawn(async move {
                let report = deliver_token(sender.as_ref(), token, &policy).await;
                drop(permit);
                (index, report)
            });
        }

        let mut slots: Vec<Option<TokenReport>> = tokens.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => slots[index] = Some(report),
                Err(e) => error!("Dispatch task failed: {}", e),
            }
        }

        let reports = slots
            .into_iter()
            .zip(tokens)
            .map(|(slot, token)| slot.unwrap_or_else(|| TokenReport::aborted(token, "dispatch task aborted")))
            .collect();
        let report = DispatchReport::new(platform, reports);

        self.record(&report);
        info!(
            success = report.success_count(),
            failed = report.failure_count(),
            "Dispatch finished"
        );
        report
    }

    fn record(&self, report: &DispatchReport) {
        let Some(stats) = &self.stats else {
            return;
        };

        for token in &report.tokens {
            stats.add_total(report.platform, 1);
            if token.succeeded() {
                stats.add_success(report.platform, 1);
            } else {
                stats.add_failed(report.platform, 1);
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT)
    }
}

async fn deliver_token(sender: &dyn TokenSender, token: String, policy: &RetryPolicy) -> TokenReport {
    let attempts = policy.attempts();
    let mut errors = Vec::new();

    for attempt in 0..attempts {
        if let Some(delay) = policy.delay_before(attempt) {
            sleep(delay).await;
        }

        let failure = match sender.send(&token).await {
            Ok(outcome) if outcome.is_success() => {
                debug!(token = %token, attempt, "Token delivered");
                return TokenReport::delivered(token, attempt + 1, outcome, errors);
            }
            Ok(outcome) => outcome.to_error(),
            Err(e) => e,
        };

        if attempt + 1 < attempts {
            warn!(
                token = %token,
                category = failure.category(),
                "Send failed (attempt {}/{}): {}",
                attempt + 1,
                attempts,
                failure
            );
        } else {
            error!(
                token = %token,
                category = failure.category(),
                "Send failed after {} attempts: {}",
                attempts,
                failure
            );
        }
        errors.push(failure.to_string());
    }

    TokenReport::failed(token, attempts, errors)
}
