//! Command-line front end
//!
//! Parses arguments, builds a [`CliContext`] and routes to the handlers.

pub mod commands;
pub mod context;
pub mod handlers;

use anyhow::Result;
use clap::Parser;

pub use commands::{Cli, Commands, ConfigAction, SendArgs, StatsAction};
pub use context::CliContext;
pub use handlers::CommandHandler;

pub struct CliApp;

impl CliApp {
    /// Parse command line arguments and execute the requested command
    pub async fn run() -> Result<()> {
        let cli = Cli::parse();

        // `init` must not load (and thereby create) the file it is about to write
        if let Commands::Init { force } = cli.command {
            return handlers::config::ConfigHandler::handle_init(cli.config, force);
        }

        let context = CliContext::new(cli.config, cli.verbose)?;
        let _log_guard = context.init_logging()?;

        CommandHandler::new(context).handle_command(cli.command).await
    }
}
