use crate::cli::{CommandContext, Outcome};
use anyhow::Result;
use clap::{Args, Subcommand};
use colored::*;
use gh_projects::config::{Config, Settings};
use gh_projects::ui::prompts::prompt_confirmation;

#[derive(Args)]
pub struct SettingsCommands {
    #[command(subcommand)]
    pub command: SettingsSubcommands,
}

#[derive(Subcommand)]
pub enum SettingsSubcommands {
    /// Show current settings
    Show,
    /// Get the value of a specific setting
    Get {
        /// Setting name
        name: String,
    },
    /// Set the value of a specific setting
    Set {
        /// Setting name
        name: String,
        /// Setting value
        value: String,
    },
    /// Reset a setting to its default value
    Reset {
        /// Setting name
        name: String,
    },
    /// Reset all settings to default values
    ResetAll {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

pub async fn settings_command(args: SettingsCommands, ctx: &mut CommandContext) -> Result<Outcome> {
    let config = &mut ctx.config;
    match args.command {
        SettingsSubcommands::Show => show(config)?,
        SettingsSubcommands::Get { name } => println!("{}", config.settings.get(&name)?),
        SettingsSubcommands::Set { name, value } => {
            config.update_setting(&name, &value)?;
            println!(
                "{} {} = {}",
                "✓".bright_green().bold(),
                name.bold(),
                config.settings.get(&name)?.bright_white()
            );
        }
        SettingsSubcommands::Reset { name } => {
            config.reset_setting(&name)?;
            println!(
                "{} {} reset to {}",
                "✓".bright_green().bold(),
                name.bold(),
                config.settings.get(&name)?.bright_white()
            );
        }
        SettingsSubcommands::ResetAll { yes } => {
            if !yes && !prompt_confirmation("Reset all settings to their defaults?", false)? {
                println!("Operation cancelled.");
                return Ok(Outcome::Success);
            }
            config.reset_all_settings()?;
            println!("{} All settings reset", "✓".bright_green().bold());
        }
    }
    Ok(Outcome::Success)
}

fn show(config: &Config) -> Result<()> {
    println!("{}", "Settings".bright_blue().bold());
    println!("{}", "═".repeat(40).bright_blue());

    let defaults = Settings::default();
    for name in Settings::NAMES {
        let value = config.settings.get(name)?;
        let marker = if value == defaults.get(name)? {
            "".normal()
        } else {
            " (changed)".yellow()
        };
        println!("  {:<22} {}{}", name.bold(), value.bright_white(), marker);
    }

    if let Some(path) = config.path() {
        println!();
        println!("  {} {}", "Config file:".dimmed(), path.display());
    }
    Ok(())
}
