use crate::cli::{CommandContext, Outcome, ProjectArgs, output};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::*;
use gh_projects::api::{FieldUpdate, FieldValue, ItemMutation};
use gh_projects::bulk::{BulkConfig, BulkCoordinator, BulkOperation, BulkRequest, BulkStatus};
use gh_projects::ui::prompts::confirm_destructive;
use is_terminal::IsTerminal;
use log::{info, warn};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Args)]
pub struct BulkCommands {
    #[command(subcommand)]
    pub command: BulkSubcommands,
}

#[derive(Subcommand)]
pub enum BulkSubcommands {
    /// Set or clear field values on many items
    Update {
        #[command(flatten)]
        target: BulkTarget,
        /// Field assignment, repeatable
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
        /// Field to clear, repeatable
        #[arg(long = "clear", value_name = "FIELD")]
        clear: Vec<String>,
    },
    /// Remove items from the project
    Delete {
        #[command(flatten)]
        target: BulkTarget,
    },
    /// Archive items
    Archive {
        #[command(flatten)]
        target: BulkTarget,
    },
}

#[derive(Args, Debug)]
pub struct BulkTarget {
    #[command(flatten)]
    pub project: ProjectArgs,
    /// Project item id (PVTI_...), repeatable
    #[arg(long = "item", value_name = "ITEM_ID")]
    pub items: Vec<String>,
    /// File with one item id per line; blank lines and `#` comments are skipped
    #[arg(long, value_name = "PATH")]
    pub items_file: Option<PathBuf>,
    /// Skip the confirmation prompt for delete and archive
    #[arg(short, long)]
    pub yes: bool,
}

impl BulkTarget {
    fn item_ids(&self) -> Result<Vec<String>> {
        let mut ids = self.items.clone();
        if let Some(path) = &self.items_file {
            ids.extend(read_item_ids(path)?);
        }
        Ok(ids)
    }
}

pub fn read_item_ids(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read items file: {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .collect())
}

pub fn field_updates(set: &[String], clear: &[String]) -> Result<Vec<FieldUpdate>> {
    let mut updates = Vec::with_capacity(set.len() + clear.len());
    for spec in set {
        let update = FieldUpdate::parse(spec)
            .ok_or_else(|| anyhow::anyhow!("Invalid --set '{}': expected FIELD=VALUE", spec))?;
        updates.push(update);
    }
    for field in clear {
        updates.push(FieldUpdate::new(field.trim(), FieldValue::Clear));
    }
    Ok(updates)
}

pub async fn bulk_command(args: BulkCommands, ctx: &CommandContext) -> Result<Outcome> {
    let (target, mutation) = match args.command {
        BulkSubcommands::Update { target, set, clear } => {
            (target, ItemMutation::Update(field_updates(&set, &clear)?))
        }
        BulkSubcommands::Delete { target } => (target, ItemMutation::Delete),
        BulkSubcommands::Archive { target } => (target, ItemMutation::Archive),
    };

    // Checked before any remote call; the node id replaces the reference below
    let mut request = BulkRequest {
        project_id: target.project.project_ref().to_string(),
        item_ids: target.item_ids()?,
        mutation,
    };
    request.validate()?;

    let client = ctx.client()?;
    request.project_id = target.project.resolve(client.as_ref()).await?;

    let destructive = !matches!(request.mutation, ItemMutation::Update(_));
    if destructive && !target.yes {
        let prompt = format!(
            "{} {} items in {}?",
            capitalize(&request.operation_type().to_string()),
            request.item_ids.len(),
            target.project.project_ref()
        );
        if !confirm_destructive(&prompt)? {
            println!("Operation cancelled.");
            return Ok(Outcome::Success);
        }
    }

    let coordinator = BulkCoordinator::new(
        client,
        BulkConfig::new(
            ctx.config.settings.bulk_concurrency,
            ctx.config.settings.item_timeout(),
        ),
    );
    let operation = run_with_progress(&coordinator, request).await?;

    ctx.emit(&operation, output::bulk_operation)?;
    Ok(outcome(&operation))
}

/// Run in the background, showing progress on a terminal and cancelling on Ctrl-C
async fn run_with_progress<P>(
    coordinator: &BulkCoordinator<P>,
    request: BulkRequest,
) -> Result<BulkOperation>
where
    P: gh_projects::api::ProjectDataProvider + ?Sized + 'static,
{
    let handle = coordinator.spawn(request)?;
    info!("Started bulk operation {}", handle.id());

    let show_progress = std::io::stderr().is_terminal();
    let mut ticker = tokio::time::interval(Duration::from_millis(200));
    let mut cancel_requested = false;

    while !handle.is_finished() {
        tokio::select! {
            _ = tokio::signal::ctrl_c(), if !cancel_requested => {
                warn!("Interrupt received, cancelling bulk operation {}", handle.id());
                eprintln!("\r\x1b[K{}", "Cancelling; waiting for items in flight...".bright_yellow());
                handle.cancel();
                cancel_requested = true;
            }
            _ = ticker.tick() => {
                if show_progress {
                    let snapshot = handle.snapshot();
                    eprint!(
                        "\r{} {}/{} ({} failed)",
                        "Processing".cyan(),
                        snapshot.processed_items,
                        snapshot.total_items,
                        snapshot.failed_items
                    );
                    let _ = std::io::stderr().flush();
                }
            }
        }
    }
    if show_progress {
        eprint!("\r\x1b[K");
    }

    Ok(handle.wait().await)
}

fn outcome(operation: &BulkOperation) -> Outcome {
    match operation.status {
        BulkStatus::Completed => Outcome::Success,
        BulkStatus::PartiallyFailed => Outcome::PartialFailure,
        _ => Outcome::Failure,
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_updates_from_flags() {
        let updates = field_updates(
            &["Status=Done".to_string(), "Estimate = 3".to_string()],
            &["Due".to_string()],
        )
        .unwrap();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0], FieldUpdate::new("Status", FieldValue::text("Done")));
        assert_eq!(updates[1], FieldUpdate::new("Estimate", FieldValue::text("3")));
        assert_eq!(updates[2], FieldUpdate::new("Due", FieldValue::Clear));

        assert!(field_updates(&["Status".to_string()], &[]).is_err());
    }

    #[test]
    fn test_items_file_skips_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.txt");
        fs::write(&path, "PVTI_1\n\n# done later\n  PVTI_2  \n").unwrap();
        assert_eq!(read_item_ids(&path).unwrap(), vec!["PVTI_1", "PVTI_2"]);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("archive"), "Archive");
        assert_eq!(capitalize(""), "");
    }
}
