//! Workflow storage, event matching and execution history

use super::model::{
    ExecutionStatus, ProjectEvent, WorkflowDefinition, WorkflowDraft, WorkflowExecution,
    WorkflowState, WorkflowStatus, WorkflowUpdate,
};
use crate::api::models::ProjectAction;
use crate::api::provider::ProjectDataProvider;
use crate::error::{CoreError, CoreResult};
use chrono::Utc;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use uuid::Uuid;

pub const DEFAULT_RECENT_EXECUTIONS: usize = 10;
/// History kept per project, as a multiple of the recent window
pub const DEFAULT_HISTORY_MULTIPLE: usize = 50;

#[derive(Debug, Default)]
struct Registry {
    workflows: Vec<WorkflowDefinition>,
    executions: Vec<WorkflowExecution>,
}

impl Registry {
    /// Keep only the newest `limit` executions of each project.
    fn prune(&mut self, limit: usize) {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut keep = vec![false; self.executions.len()];
        for (index, execution) in self.executions.iter().enumerate().rev() {
            let count = seen.entry(execution.project_id.as_str()).or_insert(0);
            if *count < limit {
                *count += 1;
                keep[index] = true;
            }
        }
        let before = self.executions.len();
        let mut flags = keep.into_iter();
        self.executions.retain(|_| flags.next().unwrap_or(false));
        if self.executions.len() < before {
            debug!("Dropped {} old executions", before - self.executions.len());
        }
    }
}

/// Holds a set of workflow definitions and their execution history.
/// Actions run through whichever provider is handed to [`evaluate`](Self::evaluate).
pub struct AutomationEngine {
    recent_window: usize,
    history_limit: usize,
    registry: Mutex<Registry>,
}

impl Default for AutomationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AutomationEngine {
    pub fn new() -> Self {
        Self {
            recent_window: DEFAULT_RECENT_EXECUTIONS,
            history_limit: DEFAULT_RECENT_EXECUTIONS * DEFAULT_HISTORY_MULTIPLE,
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Bound on `recentExecutions` in status reports
    pub fn with_recent_window(mut self, window: usize) -> Self {
        self.recent_window = window;
        self
    }

    /// Executions kept per project; older ones are dropped and no longer
    /// count toward the success rate
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    /// Seed the engine with previously saved definitions and history
    pub fn load(&self, workflows: Vec<WorkflowDefinition>, executions: Vec<WorkflowExecution>) {
        let mut registry = self.registry();
        registry.workflows = workflows;
        registry.executions = executions;
        registry.prune(self.history_limit);
        debug!(
            "Loaded {} workflows and {} executions",
            registry.workflows.len(),
            registry.executions.len()
        );
    }

    pub fn create(&self, draft: WorkflowDraft) -> CoreResult<WorkflowDefinition> {
        if draft.project_id.trim().is_empty() {
            return Err(CoreError::InvalidRequest("project id is required".into()));
        }
        if draft.name.trim().is_empty() {
            return Err(CoreError::InvalidRequest("workflow name is required".into()));
        }
        validate_action(&draft.action)?;

        let now = Utc::now();
        let definition = WorkflowDefinition {
            id: Uuid::new_v4(),
            project_id: draft.project_id,
            name: draft.name.trim().to_string(),
            trigger: draft.trigger,
            condition: draft.condition,
            action: draft.action,
            status: if draft.enabled {
                WorkflowState::Enabled
            } else {
                WorkflowState::Disabled
            },
            created_at: now,
            updated_at: now,
        };

        info!(
            "Created workflow '{}' ({}) on {} for {}",
            definition.name, definition.id, definition.project_id, definition.trigger
        );
        self.registry().workflows.push(definition.clone());
        Ok(definition)
    }

    pub fn update(&self, id: Uuid, update: WorkflowUpdate) -> CoreResult<WorkflowDefinition> {
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(CoreError::InvalidRequest("workflow name must not be blank".into()));
            }
        }
        if let Some(action) = &update.action {
            validate_action(action)?;
        }
        if update.enable && update.disable {
            warn!("Workflow {} update sets both enable and disable; disabling", id);
        }

        let mut registry = self.registry();
        let definition = registry
            .workflows
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| workflow_not_found(id))?;

        if let Some(name) = update.name {
            definition.name = name.trim().to_string();
        }
        if let Some(trigger) = update.trigger {
            definition.trigger = trigger;
        }
        if update.clear_condition {
            definition.condition = None;
        }
        if let Some(condition) = update.condition {
            definition.condition = Some(condition);
        }
        if let Some(action) = update.action {
            definition.action = action;
        }
        definition.status = WorkflowState::resolve(definition.status, update.enable, update.disable);
        definition.updated_at = Utc::now();

        info!("Updated workflow {} ({})", definition.id, definition.status);
        Ok(definition.clone())
    }

    pub fn delete(&self, id: Uuid) -> CoreResult<WorkflowDefinition> {
        let mut registry = self.registry();
        let index = registry
            .workflows
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| workflow_not_found(id))?;
        let removed = registry.workflows.remove(index);
        registry.executions.retain(|e| e.workflow_id != id);
        info!("Deleted workflow '{}' ({})", removed.name, removed.id);
        Ok(removed)
    }

    pub fn get(&self, id: Uuid) -> CoreResult<WorkflowDefinition> {
        self.registry()
            .workflows
            .iter()
            .find(|w| w.id == id)
            .cloned()
            .ok_or_else(|| workflow_not_found(id))
    }

    /// Workflows of a project (all projects for `None`), oldest first
    pub fn list(&self, project_id: Option<&str>) -> Vec<WorkflowDefinition> {
        let mut workflows: Vec<WorkflowDefinition> = self
            .registry()
            .workflows
            .iter()
            .filter(|w| project_id.is_none_or(|p| w.project_id == p))
            .cloned()
            .collect();
        // Stable: equal timestamps keep insertion order
        workflows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        workflows
    }

    /// Every recorded execution, oldest first
    pub fn executions(&self) -> Vec<WorkflowExecution> {
        self.registry().executions.clone()
    }

    /// Run every enabled workflow of the event's project whose trigger and
    /// condition match. Action failures are recorded, not returned.
    pub async fn evaluate<P>(
        &self,
        provider: &P,
        event: &ProjectEvent,
    ) -> CoreResult<Vec<WorkflowExecution>>
    where
        P: ProjectDataProvider + ?Sized,
    {
        if event.project_id.trim().is_empty() {
            return Err(CoreError::InvalidRequest("event has no project id".into()));
        }
        if event.item.item_id.trim().is_empty() {
            return Err(CoreError::InvalidRequest("event has no item id".into()));
        }

        let matching: Vec<WorkflowDefinition> = self
            .list(Some(&event.project_id))
            .into_iter()
            .filter(|w| w.is_enabled() && w.trigger == event.trigger)
            .filter(|w| {
                let holds = w
                    .condition
                    .as_ref()
                    .is_none_or(|condition| condition.evaluate(&event.payload));
                if !holds {
                    debug!("Workflow '{}' condition not met, skipping", w.name);
                }
                holds
            })
            .collect();

        debug!(
            "Event {} on item {} matched {} workflows",
            event.trigger,
            event.item.item_id,
            matching.len()
        );

        let mut executions = Vec::with_capacity(matching.len());
        for workflow in matching {
            let started = Instant::now();
            let result = provider
                .invoke_action(&event.project_id, &workflow.action, &event.item)
                .await;
            let duration_ms = started.elapsed().as_millis() as u64;

            let (status, error) = match result {
                Ok(()) => {
                    info!(
                        "Workflow '{}' applied '{}' to {}",
                        workflow.name, workflow.action, event.item.item_id
                    );
                    (ExecutionStatus::Success, None)
                }
                Err(e) => {
                    warn!(
                        "Workflow '{}' failed on {}: {}",
                        workflow.name, event.item.item_id, e
                    );
                    (ExecutionStatus::Failure, Some(e.to_string()))
                }
            };

            executions.push(WorkflowExecution {
                workflow_id: workflow.id,
                project_id: event.project_id.clone(),
                trigger: event.trigger.clone(),
                item_id: event.item.item_id.clone(),
                status,
                duration_ms,
                executed_at: Utc::now(),
                error,
            });
        }

        let mut registry = self.registry();
        registry.executions.extend(executions.iter().cloned());
        registry.prune(self.history_limit);
        Ok(executions)
    }

    pub fn status(&self, project_id: &str) -> WorkflowStatus {
        let registry = self.registry();

        let workflows: Vec<&WorkflowDefinition> = registry
            .workflows
            .iter()
            .filter(|w| w.project_id == project_id)
            .collect();
        let history: Vec<&WorkflowExecution> = registry
            .executions
            .iter()
            .filter(|e| e.project_id == project_id)
            .collect();

        let successes = history.iter().filter(|e| e.succeeded()).count();
        let success_rate = if history.is_empty() {
            0.0
        } else {
            successes as f64 / history.len() as f64
        };

        let mut recent: Vec<WorkflowExecution> = history.iter().map(|e| (*e).clone()).collect();
        // Stable sort keeps later-recorded entries ahead on equal timestamps
        recent.reverse();
        recent.sort_by(|a, b| b.executed_at.cmp(&a.executed_at));
        recent.truncate(self.recent_window);

        WorkflowStatus {
            project_id: project_id.to_string(),
            total_workflows: workflows.len(),
            active_workflows: workflows.iter().filter(|w| w.is_enabled()).count(),
            total_executions: history.len(),
            success_rate,
            recent_executions: recent,
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn workflow_not_found(id: Uuid) -> CoreError {
    CoreError::NotFound(format!("workflow {}", id))
}

fn validate_action(action: &ProjectAction) -> CoreResult<()> {
    let blank = match action {
        ProjectAction::SetField { field, .. } => field.trim().is_empty(),
        ProjectAction::MoveToStatus { status } => status.trim().is_empty(),
        ProjectAction::Assign { login } => login.trim().is_empty(),
        ProjectAction::Archive => false,
    };
    if blank {
        return Err(CoreError::InvalidRequest(format!(
            "'{}' action is missing its parameter",
            action.tag()
        )));
    }
    Ok(())
}

/// Parse a workflow id given on the command line
pub fn parse_workflow_id(raw: &str) -> CoreResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| CoreError::InvalidRequest(format!("'{}' is not a workflow id", raw)))
}
