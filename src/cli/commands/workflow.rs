use crate::cli::{CommandContext, Outcome, output};
use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use colored::*;
use gh_projects::api::{FieldValue, ItemRef, ProjectAction, ProjectDataProvider};
use gh_projects::automation::{
    AutomationEngine, Condition, ProjectEvent, Trigger, WorkflowDocument, WorkflowDraft,
    WorkflowUpdate, parse_workflow_id,
};
use gh_projects::ui::prompts::confirm_destructive;
use log::debug;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Args)]
pub struct WorkflowCommands {
    /// Workflow definitions file (defaults to workflows.json next to the config)
    #[arg(long, global = true, value_name = "PATH")]
    pub definitions: Option<PathBuf>,

    #[command(subcommand)]
    pub command: WorkflowSubcommands,
}

#[derive(Subcommand)]
pub enum WorkflowSubcommands {
    /// List workflows
    List {
        #[command(flatten)]
        project: WorkflowProject,
    },
    /// Define a new workflow
    Create {
        #[command(flatten)]
        project: WorkflowProject,
        /// Workflow name
        #[arg(long)]
        name: String,
        /// Trigger, e.g. item_added, issue_closed or custom:<tag>
        #[arg(long)]
        trigger: Trigger,
        /// Condition, e.g. "Status=Done" or "Priority in High|Urgent"
        #[arg(long)]
        condition: Option<Condition>,
        #[command(flatten)]
        action: ActionArgs,
        /// Create the workflow disabled
        #[arg(long)]
        disabled: bool,
    },
    /// Change an existing workflow
    Update {
        /// Workflow id
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        trigger: Option<Trigger>,
        #[arg(long, conflicts_with = "clear_condition")]
        condition: Option<Condition>,
        /// Remove the condition so the workflow always runs
        #[arg(long)]
        clear_condition: bool,
        #[command(flatten)]
        action: OptionalActionArgs,
        #[arg(long)]
        enable: bool,
        /// Takes precedence over --enable
        #[arg(long)]
        disable: bool,
    },
    /// Remove a workflow
    Delete {
        /// Workflow id
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Run matching workflows for an event on one item
    Evaluate {
        #[command(flatten)]
        project: WorkflowProject,
        #[arg(long)]
        trigger: Trigger,
        /// Project item id the event happened to
        #[arg(long)]
        item: String,
        /// Event payload entry, repeatable
        #[arg(long = "value", value_name = "FIELD=VALUE")]
        values: Vec<String>,
        /// Read the payload from the item's current field values
        #[arg(long)]
        from_item: bool,
    },
    /// Workflow counts, success rate and recent executions
    Status {
        #[command(flatten)]
        project: WorkflowProject,
    },
}

/// Project a workflow belongs to: a node id, or an owner/number pair
#[derive(Args, Debug, Clone, Default)]
pub struct WorkflowProject {
    /// Project node id (PVT_...)
    #[arg(long, conflicts_with_all = ["owner", "project"])]
    pub project_id: Option<String>,
    /// User or organization login that owns the project
    #[arg(long, requires = "project")]
    pub owner: Option<String>,
    /// Project number
    #[arg(long, requires = "owner")]
    pub project: Option<u32>,
}

impl WorkflowProject {
    fn is_given(&self) -> bool {
        self.project_id.is_some() || self.owner.is_some()
    }

    async fn resolve(&self, ctx: &CommandContext) -> Result<String> {
        if let Some(id) = &self.project_id {
            return Ok(id.clone());
        }
        match (&self.owner, self.project) {
            (Some(owner), Some(number)) => {
                let args = crate::cli::ProjectArgs {
                    owner: owner.clone(),
                    project: number,
                };
                args.resolve(ctx.client()?.as_ref()).await
            }
            _ => anyhow::bail!("Specify --project-id or --owner with --project"),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    SetField,
    MoveToStatus,
    Assign,
    Archive,
}

#[derive(Args, Debug, Clone)]
pub struct ActionArgs {
    /// Action to run when the workflow matches
    #[arg(long, value_enum)]
    pub action: ActionKind,
    /// Field for set-field
    #[arg(long)]
    pub field: Option<String>,
    /// Value for set-field (empty clears the field)
    #[arg(long)]
    pub value: Option<String>,
    /// Status for move-to-status
    #[arg(long)]
    pub status: Option<String>,
    /// User login for assign
    #[arg(long)]
    pub login: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct OptionalActionArgs {
    /// Replace the action
    #[arg(long, value_enum)]
    pub action: Option<ActionKind>,
    #[arg(long)]
    pub field: Option<String>,
    #[arg(long)]
    pub value: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub login: Option<String>,
}

impl OptionalActionArgs {
    fn into_action(self) -> Result<Option<ProjectAction>> {
        match self.action {
            None => Ok(None),
            Some(kind) => build_action(ActionArgs {
                action: kind,
                field: self.field,
                value: self.value,
                status: self.status,
                login: self.login,
            })
            .map(Some),
        }
    }
}

pub fn build_action(args: ActionArgs) -> Result<ProjectAction> {
    let required = |value: Option<String>, flag: &str| {
        value
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("--{} is required for this action", flag))
    };

    Ok(match args.action {
        ActionKind::SetField => {
            let field = required(args.field, "field")?;
            let value = match args.value.as_deref().map(str::trim) {
                None | Some("") => FieldValue::Clear,
                Some(v) => FieldValue::text(v),
            };
            ProjectAction::SetField { field, value }
        }
        ActionKind::MoveToStatus => ProjectAction::MoveToStatus {
            status: required(args.status, "status")?,
        },
        ActionKind::Assign => ProjectAction::Assign {
            login: required(args.login, "login")?.trim_start_matches('@').to_string(),
        },
        ActionKind::Archive => ProjectAction::Archive,
    })
}

pub fn parse_payload(values: &[String]) -> Result<BTreeMap<String, String>> {
    values
        .iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| anyhow::anyhow!("Invalid --value '{}': expected FIELD=VALUE", entry))
        })
        .collect()
}

pub async fn workflow_command(args: WorkflowCommands, ctx: &CommandContext) -> Result<Outcome> {
    let path = match args.definitions {
        Some(path) => path,
        None => ctx.config.workflows_path()?,
    };
    debug!("Using workflow definitions at {:?}", path);

    let document = WorkflowDocument::load(&path)?;
    let settings = &ctx.config.settings;
    let engine = AutomationEngine::new()
        .with_recent_window(settings.recent_executions)
        .with_history_limit(settings.execution_history());
    engine.load(document.workflows, document.executions);

    let save = |engine: &AutomationEngine| -> Result<()> {
        WorkflowDocument {
            workflows: engine.list(None),
            executions: engine.executions(),
            ..WorkflowDocument::default()
        }
        .save(&path)
    };

    match args.command {
        WorkflowSubcommands::List { project } => {
            let filter = if project.is_given() {
                Some(project.resolve(ctx).await?)
            } else {
                None
            };
            let workflows = engine.list(filter.as_deref());
            ctx.emit(&workflows, |w| output::workflow_list(w))?;
        }

        WorkflowSubcommands::Create {
            project,
            name,
            trigger,
            condition,
            action,
            disabled,
        } => {
            let action = build_action(action)?;
            let project_id = project.resolve(ctx).await?;
            let created = engine.create(WorkflowDraft {
                project_id,
                name,
                trigger,
                condition,
                action,
                enabled: !disabled,
            })?;
            save(&engine)?;
            ctx.emit(&created, output::workflow_detail)?;
        }

        WorkflowSubcommands::Update {
            id,
            name,
            trigger,
            condition,
            clear_condition,
            action,
            enable,
            disable,
        } => {
            let id = parse_workflow_id(&id)?;
            let updated = engine.update(
                id,
                WorkflowUpdate {
                    name,
                    trigger,
                    condition,
                    clear_condition,
                    action: action.into_action()?,
                    enable,
                    disable,
                },
            )?;
            save(&engine)?;
            ctx.emit(&updated, output::workflow_detail)?;
        }

        WorkflowSubcommands::Delete { id, yes } => {
            let id = parse_workflow_id(&id)?;
            let existing = engine.get(id)?;
            if !yes
                && !confirm_destructive(&format!("Delete workflow '{}'?", existing.name))?
            {
                println!("Operation cancelled.");
                return Ok(Outcome::Success);
            }
            let removed = engine.delete(id)?;
            save(&engine)?;
            println!(
                "{} Workflow '{}' deleted",
                "✓".bright_green().bold(),
                removed.name.bright_green().bold()
            );
        }

        WorkflowSubcommands::Evaluate {
            project,
            trigger,
            item,
            values,
            from_item,
        } => {
            let mut payload = parse_payload(&values)?;
            let client = ctx.client()?;
            let project_id = project.resolve(ctx).await?;

            let mut item_ref = ItemRef::new(item.trim());
            if from_item {
                let items = client
                    .fetch_all_items(&project_id)
                    .await
                    .map_err(gh_projects::error::CoreError::from)?;
                let found = items
                    .iter()
                    .find(|i| i.id == item_ref.item_id)
                    .ok_or_else(|| anyhow::anyhow!("Item {} not found in project", item_ref.item_id))?;
                item_ref = found.item_ref();
                for (field, value) in found.payload() {
                    payload.entry(field).or_insert(value);
                }
            }

            let event = ProjectEvent::new(project_id, trigger, item_ref).with_payload(payload);
            let executions = engine.evaluate(client.as_ref(), &event).await?;
            save(&engine)?;

            let failed = executions.iter().any(|e| !e.succeeded());
            ctx.emit(&executions, |e| output::executions(e))?;
            if failed {
                return Ok(Outcome::PartialFailure);
            }
        }

        WorkflowSubcommands::Status { project } => {
            let project_id = project.resolve(ctx).await?;
            let status = engine.status(&project_id);
            ctx.emit(&status, output::workflow_status)?;
        }
    }

    Ok(Outcome::Success)
}
