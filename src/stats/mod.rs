//! Typed counter operations over a [`CounterStore`]
//!
//! One counter family per (platform, metric). Cross-platform figures are
//! summed at read time, so they always reflect the store's current state.

mod keys;

use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::Arc;

use crate::store::CounterStore;

pub use keys::{counter_key, Metric, Platform, KEY_PREFIX};

/// Shared statistics facade, one instance per process
#[derive(Clone)]
pub struct Stats {
    store: Arc<dyn CounterStore>,
}

impl Stats {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CounterStore> {
        &self.store
    }

    pub fn add(&self, platform: Platform, metric: Metric, n: i64) {
        self.store.add(&counter_key(platform, metric), n);
    }

    pub fn set(&self, platform: Platform, metric: Metric, n: i64) {
        self.store.set(&counter_key(platform, metric), n);
    }

    pub fn get(&self, platform: Platform, metric: Metric) -> i64 {
        self.store.get(&counter_key(platform, metric))
    }

    pub fn add_total(&self, platform: Platform, n: i64) {
        self.add(platform, Metric::Total, n);
    }

    pub fn add_success(&self, platform: Platform, n: i64) {
        self.add(platform, Metric::Success, n);
    }

    pub fn add_failed(&self, platform: Platform, n: i64) {
        self.add(platform, Metric::Failed, n);
    }

    /// Sum of one metric over every platform
    pub fn sum(&self, metric: Metric) -> i64 {
        Platform::ALL.iter().map(|p| self.get(*p, metric)).sum()
    }

    pub fn total_count(&self) -> i64 {
        self.sum(Metric::Total)
    }

    pub fn success_count(&self) -> i64 {
        self.sum(Metric::Success)
    }

    pub fn failed_count(&self) -> i64 {
        self.sum(Metric::Failed)
    }

    pub fn send_count(&self) -> i64 {
        self.sum(Metric::Send)
    }

    pub fn receive_count(&self) -> i64 {
        self.sum(Metric::Receive)
    }

    pub fn display_count(&self) -> i64 {
        self.sum(Metric::Display)
    }

    pub fn click_count(&self) -> i64 {
        self.sum(Metric::Click)
    }

    /// Zero every known counter
    ///
    /// Keys are deleted rather than set to `0` so the result is the same under
    /// either file-store set semantics.
    pub fn reset(&self) {
        for platform in Platform::ALL {
            for metric in Metric::ALL {
                self.store.del(&counter_key(platform, metric));
            }
        }
    }

    /// Read every counter once into a printable report
    pub fn report(&self) -> StatsReport {
        let platforms: Vec<PlatformStats> = Platform::ALL
            .iter()
            .map(|p| self.platform_stats(*p))
            .collect();

        let mut totals = MetricValues::default();
        for row in &platforms {
            totals.accumulate(&row.values);
        }

        StatsReport {
            generated_at: Local::now(),
            platforms,
            totals,
        }
    }

    pub fn platform_stats(&self, platform: Platform) -> PlatformStats {
        PlatformStats {
            platform,
            values: MetricValues {
                total: self.get(platform, Metric::Total),
                success: self.get(platform, Metric::Success),
                failed: self.get(platform, Metric::Failed),
                send: self.get(platform, Metric::Send),
                receive: self.get(platform, Metric::Receive),
                display: self.get(platform, Metric::Display),
                click: self.get(platform, Metric::Click),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricValues {
    pub total: i64,
    pub success: i64,
    pub failed: i64,
    pub send: i64,
    pub receive: i64,
    pub display: i64,
    pub click: i64,
}

impl MetricValues {
    fn accumulate(&mut self, other: &MetricValues) {
        self.total += other.total;
        self.success += other.success;
        self.failed += other.failed;
        self.send += other.send;
        self.receive += other.receive;
        self.display += other.display;
        self.click += other.click;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlatformStats {
    pub platform: Platform,
    #[serde(flatten)]
    pub values: MetricValues,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub generated_at: DateTime<Local>,
    pub platforms: Vec<PlatformStats>,
    pub totals: MetricValues,
}
