//! Command handlers for all CLI operations

pub mod config;
pub mod send;
pub mod stats;

use anyhow::Result;

use self::config::ConfigHandler;
use self::send::SendHandler;
use self::stats::StatsHandler;
use super::{CliContext, Commands};

/// Routes parsed commands to their handlers
pub struct CommandHandler {
    context: CliContext,
}

impl CommandHandler {
    pub fn new(context: CliContext) -> Self {
        Self { context }
    }

    pub async fn handle_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Init { force } => ConfigHandler::handle_init(
                Some(self.context.config_manager.config_path().to_path_buf()),
                force,
            ),
            Commands::Config { action } => ConfigHandler::new(&self.context).handle_config(action),
            Commands::Platforms => ConfigHandler::new(&self.context).handle_platforms(),
            Commands::Send(args) => SendHandler::new(&self.context).handle_send(args).await,
            Commands::Stats { action } => StatsHandler::new(&self.context).handle_stats(action),
        }
    }
}
