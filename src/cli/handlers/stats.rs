//! Counter commands

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use super::super::{CliContext, StatsAction};
use crate::config::StorageEngine;
use crate::stats::{Metric, MetricValues, Platform, Stats};
use crate::store::CounterStore;

pub struct StatsHandler<'a> {
    context: &'a CliContext,
}

impl<'a> StatsHandler<'a> {
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    pub fn handle_stats(&self, action: StatsAction) -> Result<()> {
        let engine = self.context.config_manager.config().storage.engine;
        if engine == StorageEngine::Memory && !matches!(action, StatsAction::Show { .. }) {
            warn!(
                "storage.engine is \"memory\": this change is dropped when the process exits, \
                 set engine = \"file\" to keep counters between runs"
            );
        }

        let store = self.context.open_store()?;
        let result = self.run(Stats::new(Arc::clone(&store)), action);
        // Closing flushes buffered file-store writes
        close_store(store.as_ref())?;
        result
    }

    fn run(&self, stats: Stats, action: StatsAction) -> Result<()> {
        match action {
            StatsAction::Show { platform, json } => show(&stats, platform.as_deref(), json),
            StatsAction::Set {
                platform,
                metric,
                value,
            } => {
                let (platform, metric) = parse_counter(&platform, &metric)?;
                stats.set(platform, metric, value);
                info!(platform = %platform, metric = %metric, value, "Counter set");
                println!("{platform} {metric} = {value}");
                Ok(())
            }
            StatsAction::Add {
                platform,
                metric,
                delta,
            } => {
                let (platform, metric) = parse_counter(&platform, &metric)?;
                stats.add(platform, metric, delta);
                println!("{platform} {metric} += {delta}");
                Ok(())
            }
            StatsAction::Reset => {
                stats.reset();
                println!("All counters reset");
                Ok(())
            }
        }
    }
}

pub(crate) fn close_store(store: &dyn CounterStore) -> Result<()> {
    store.close()?;
    Ok(())
}

fn parse_counter(platform: &str, metric: &str) -> Result<(Platform, Metric)> {
    Ok((platform.parse()?, metric.parse()?))
}

fn show(stats: &Stats, platform: Option<&str>, json: bool) -> Result<()> {
    if let Some(name) = platform {
        let row = stats.platform_stats(name.parse()?);
        if json {
            println!("{}", serde_json::to_string_pretty(&row)?);
        } else {
            print_header();
            print_row(row.platform.as_str(), &row.values);
        }
        return Ok(());
    }

    let report = stats.report();
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Counters at {}", report.generated_at.format("%Y-%m-%d %H:%M:%S"));
    print_header();
    for row in &report.platforms {
        print_row(row.platform.as_str(), &row.values);
    }
    print_row("all", &report.totals);
    Ok(())
}

fn print_header() {
    println!(
        "{:<8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
        "platform", "total", "success", "failed", "send", "receive", "display", "click"
    );
}

fn print_row(label: &str, v: &MetricValues) {
    println!(
        "{:<8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
        label, v.total, v.success, v.failed, v.send, v.receive, v.display, v.click
    );
}
