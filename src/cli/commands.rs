//! Command definitions and structures for the CLI

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure
#[derive(Parser)]
#[command(name = "push-gateway")]
#[command(about = "Multi-provider push notification gateway")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: $PUSH_GATEWAY_CONFIG or ~/.push-gateway/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List registered providers
    Platforms,

    /// Send a notification to one or more device tokens
    Send(SendArgs),

    /// Inspect or edit delivery counters
    Stats {
        #[command(subcommand)]
        action: StatsAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file location
    Path,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Target platform or vendor alias (ios, apns, android, fcm, huawei, hms, ...)
    #[arg(short, long)]
    pub platform: String,

    /// Device token, repeat for several
    #[arg(short = 'T', long = "token")]
    pub tokens: Vec<String>,

    /// JSON file holding a full request; flags override its fields
    #[arg(long)]
    pub request: Option<PathBuf>,

    #[arg(short, long)]
    pub title: Option<String>,

    #[arg(short = 'm', long)]
    pub content: Option<String>,

    #[arg(long)]
    pub priority: Option<String>,

    /// Time to live in seconds
    #[arg(long)]
    pub ttl: Option<u64>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub click_action: Option<String>,

    #[arg(long)]
    pub icon: Option<String>,

    #[arg(long)]
    pub app_id: Option<String>,

    #[arg(long)]
    pub app_name: Option<String>,

    /// Custom data entry as key=value, repeatable
    #[arg(short, long = "data", value_parser = parse_key_val)]
    pub data: Vec<(String, String)>,

    /// Validate without sending
    #[arg(long)]
    pub dry_run: bool,

    /// Extra attempts per token after the first
    #[arg(long)]
    pub retry: Option<u32>,

    /// Seconds between retries, values ≤ 0 mean one second
    #[arg(long, allow_negative_numbers = true)]
    pub retry_interval: Option<i64>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum StatsAction {
    /// Show counters
    Show {
        /// Only this platform
        #[arg(short, long)]
        platform: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Overwrite one counter
    Set {
        platform: String,
        metric: String,
        value: i64,
    },
    /// Add to one counter (receipt callbacks: send, receive, display, click)
    Add {
        platform: String,
        metric: String,
        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },
    /// Delete every counter
    Reset,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}
