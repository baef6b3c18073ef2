use std::time::Duration;

use crate::config::{at_least_one_second, DispatchConfig};

/// Per-token retry schedule
///
/// `retry` extra attempts follow the first one. The wait before attempt `n`:
///
/// | attempt | wait |
/// |---|---|
/// | 0 | none |
/// | 1 | none if `immediate_first_retry`, else `interval` |
/// | ≥ 2 | `interval` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retry: u32,
    pub interval: Duration,
    pub immediate_first_retry: bool,
}

impl RetryPolicy {
    /// Build a policy; an interval ≤ 0 seconds becomes `1`
    pub fn new(retry: u32, interval_secs: i64) -> Self {
        Self {
            retry,
            interval: at_least_one_second(interval_secs),
            immediate_first_retry: true,
        }
    }

    pub fn no_retry() -> Self {
        Self::new(0, 1)
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            retry: config.retry,
            interval: config.retry_interval(),
            immediate_first_retry: config.immediate_first_retry,
        }
    }

    pub fn immediate_first_retry(mut self, immediate: bool) -> Self {
        self.immediate_first_retry = immediate;
        self
    }

    /// Total attempts per token
    pub fn attempts(&self) -> u32 {
        self.retry.saturating_add(1)
    }

    /// How long to wait before `attempt` (0-based)
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        match attempt {
            0 => None,
            1 if self.immediate_first_retry => None,
            _ => Some(self.interval),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::no_retry()
    }
}
