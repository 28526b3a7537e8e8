use super::commands::analytics::AnalyticsArgs;
use super::commands::auth::AuthCommands;
use super::commands::bulk::BulkCommands;
use super::commands::settings::SettingsCommands;
use super::commands::workflow::WorkflowCommands;
use super::output::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gh-projects")]
#[command(version)]
#[command(about = "Bulk updates, automation workflows and analytics for GitHub Projects")]
pub struct Cli {
    /// Output format (defaults to the `default-format` setting)
    #[arg(long, short, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log to stderr instead of gh-projects.log
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Update, delete or archive many project items at once
    Bulk(BulkCommands),
    /// Manage and run automation workflows
    Workflow(WorkflowCommands),
    /// Status, assignee, velocity and timeline analytics
    Analytics(AnalyticsArgs),
    /// Authentication management
    Auth(AuthCommands),
    /// Application settings management
    Settings(SettingsCommands),
}
