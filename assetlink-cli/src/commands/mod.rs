//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod report;
mod source;

pub use report::ReportCommands;
pub use source::SourceCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Inspect the assets derived from a source manifest
    Source {
        #[command(subcommand)]
        command: SourceCommands,
    },
    /// Inspect run reports
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Source { command } => source::handle_source_command(command, config).await,
        Commands::Report { command } => report::handle_report_command(command, config).await,
    }
}
