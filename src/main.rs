use anyhow::Result;
use clap::Parser;
use colored::*;
use log::{debug, info};
use std::process::ExitCode;

mod cli;

use cli::commands::{
    analytics::analytics_command, auth::auth_command, bulk::bulk_command,
    settings::settings_command, workflow::workflow_command,
};
use cli::{Cli, CommandContext, Commands, Outcome};
use gh_projects::config::Config;

const LOG_FILE: &str = "gh-projects.log";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("{} {:#}", "Warning:".yellow().bold(), e);
    }
    info!("Starting gh-projects");

    match run(cli).await {
        Ok(outcome) => {
            debug!("Finished with {:?}", outcome);
            outcome.exit_code()
        }
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("{} {:#}", "Error:".bright_red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Log to a file truncated on each run, or to stderr with `--verbose`
fn init_logging(verbose: bool) -> Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
        builder.target(env_logger::Target::Stderr);
    } else {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(LOG_FILE)?;
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }
    builder.try_init()?;
    Ok(())
}

async fn run(cli: Cli) -> Result<Outcome> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let mut ctx = CommandContext::new(config, cli.format);

    match cli.command {
        Commands::Bulk(args) => bulk_command(args, &ctx).await,
        Commands::Workflow(args) => workflow_command(args, &ctx).await,
        Commands::Analytics(args) => analytics_command(args, &ctx).await,
        Commands::Auth(args) => auth_command(args, &mut ctx).await,
        Commands::Settings(args) => settings_command(args, &mut ctx).await,
    }
}
