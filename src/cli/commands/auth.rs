//! Token management: status, login and logout

use crate::cli::{CommandContext, Outcome};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::*;
use gh_projects::auth::{Credentials, TokenSource};
use gh_projects::config::Config;
use gh_projects::ui::prompts::prompt_token;
use gh_projects::ui::spinner::with_spinner;
use log::{info, warn};
use std::path::PathBuf;

#[derive(Args)]
pub struct AuthCommands {
    #[command(subcommand)]
    pub command: AuthSubcommands,
}

#[derive(Subcommand)]
pub enum AuthSubcommands {
    /// Show which token is in use and whether GitHub accepts it
    Status,
    /// Verify a token and store it in the config file
    Login {
        /// Import GITHUB_TOKEN or GH_TOKEN from this .env file instead of prompting
        #[arg(long, value_name = "PATH")]
        env_file: Option<PathBuf>,
    },
    /// Remove the stored token
    Logout,
}

pub async fn auth_command(args: AuthCommands, ctx: &mut CommandContext) -> Result<Outcome> {
    match args.command {
        AuthSubcommands::Status => status(ctx).await,
        AuthSubcommands::Login { env_file } => login(env_file, ctx).await,
        AuthSubcommands::Logout => logout(&mut ctx.config),
    }
}

async fn status(ctx: &CommandContext) -> Result<Outcome> {
    println!("{}", "Authentication Status".bright_blue().bold());
    println!("{}", "═".repeat(40).bright_blue());

    let credentials = match Credentials::resolve(&ctx.config) {
        Ok(credentials) => credentials,
        Err(e) => {
            println!("  {} {}", "Token:".bold(), "not configured".bright_red());
            println!("  {}", e.to_string().dimmed());
            return Ok(Outcome::Failure);
        }
    };

    println!("  {} {}", "Token:".bold(), credentials.masked().bright_white());
    println!("  {} {}", "Source:".bold(), credentials.source.to_string().bright_cyan());
    println!("  {} {}", "API:".bold(), ctx.config.auth.api_url.dimmed());

    let client = ctx.client_with(&credentials.token)?;
    match with_spinner("Checking token...", client.viewer_login()).await {
        Ok(login) => {
            println!("  {} {}", "User:".bold(), login.bright_green().bold());
            Ok(Outcome::Success)
        }
        Err(e) => {
            warn!("Token check failed: {}", e);
            println!("  {} {}", "Status:".bold(), format!("rejected ({})", e).bright_red());
            Ok(Outcome::Failure)
        }
    }
}

async fn login(env_file: Option<PathBuf>, ctx: &mut CommandContext) -> Result<Outcome> {
    let credentials = match env_file {
        Some(path) => Credentials::from_env_file(&path)?,
        None => Credentials::new(prompt_token()?, TokenSource::Prompt),
    };

    let client = ctx.client_with(&credentials.token)?;
    let login = with_spinner("Verifying token...", client.viewer_login())
        .await
        .context("GitHub rejected the token")?;
    info!("Token verified for {}", login);

    ctx.config.set_token(credentials.token)?;
    println!(
        "{} Logged in as {}",
        "✓".bright_green().bold(),
        login.bright_green().bold()
    );
    Ok(Outcome::Success)
}

fn logout(config: &mut Config) -> Result<Outcome> {
    if config.clear_token()? {
        println!("{} Stored token removed", "✓".bright_green().bold());
    } else {
        println!("{}", "No stored token".dimmed());
    }
    Ok(Outcome::Success)
}
