use super::condition::{self, Condition};
use crate::api::models::{ItemRef, ProjectAction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Event class that can activate a workflow
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Trigger {
    ItemAdded,
    ItemArchived,
    FieldChanged,
    IssueOpened,
    IssueClosed,
    PullRequestMerged,
    Custom(String),
}

impl Trigger {
    pub const BUILT_IN: [Trigger; 6] = [
        Trigger::ItemAdded,
        Trigger::ItemArchived,
        Trigger::FieldChanged,
        Trigger::IssueOpened,
        Trigger::IssueClosed,
        Trigger::PullRequestMerged,
    ];

    pub fn tag(&self) -> &str {
        match self {
            Self::ItemAdded => "item_added",
            Self::ItemArchived => "item_archived",
            Self::FieldChanged => "field_changed",
            Self::IssueOpened => "issue_opened",
            Self::IssueClosed => "issue_closed",
            Self::PullRequestMerged => "pull_request_merged",
            Self::Custom(tag) => tag,
        }
    }
}

impl FromStr for Trigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        if normalized.is_empty() {
            return Err("trigger must not be empty".to_string());
        }

        if let Some(known) = Self::BUILT_IN.iter().find(|t| t.tag() == normalized) {
            return Ok(known.clone());
        }

        let custom = s
            .trim()
            .get(..7)
            .filter(|prefix| prefix.eq_ignore_ascii_case("custom:"))
            .map(|_| s.trim()[7..].trim());
        match custom {
            Some(tag) if !tag.is_empty() => Ok(Self::Custom(tag.to_string())),
            _ => Err(format!(
                "unknown trigger '{}' (expected one of {}, or custom:<tag>)",
                s,
                Self::BUILT_IN
                    .iter()
                    .map(|t| t.tag())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

impl TryFrom<String> for Trigger {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Trigger> for String {
    fn from(trigger: Trigger) -> Self {
        trigger.to_string()
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(tag) => write!(f, "custom:{}", tag),
            other => f.write_str(other.tag()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowState {
    Enabled,
    Disabled,
}

impl WorkflowState {
    /// Resolve the two update flags against the current state. A request
    /// carrying both flags ends up disabled.
    pub fn resolve(current: Self, enable: bool, disable: bool) -> Self {
        if disable {
            Self::Disabled
        } else if enable {
            Self::Enabled
        } else {
            current
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled => f.write_str("enabled"),
            Self::Disabled => f.write_str("disabled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    pub id: Uuid,
    pub project_id: String,
    pub name: String,
    pub trigger: Trigger,
    #[serde(
        default,
        deserialize_with = "condition::deserialize_optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub condition: Option<Condition>,
    pub action: ProjectAction,
    pub status: WorkflowState,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl WorkflowDefinition {
    pub fn is_enabled(&self) -> bool {
        self.status == WorkflowState::Enabled
    }
}

/// Input for creating a workflow
#[derive(Debug, Clone)]
pub struct WorkflowDraft {
    pub project_id: String,
    pub name: String,
    pub trigger: Trigger,
    pub condition: Option<Condition>,
    pub action: ProjectAction,
    pub enabled: bool,
}

/// Partial update; `None` leaves the attribute unchanged
#[derive(Debug, Clone, Default)]
pub struct WorkflowUpdate {
    pub name: Option<String>,
    pub trigger: Option<Trigger>,
    pub condition: Option<Condition>,
    pub clear_condition: bool,
    pub action: Option<ProjectAction>,
    pub enable: bool,
    pub disable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecution {
    pub workflow_id: Uuid,
    pub project_id: String,
    pub trigger: Trigger,
    pub item_id: String,
    pub status: ExecutionStatus,
    pub duration_ms: u64,
    #[serde(with = "crate::timestamp")]
    pub executed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowExecution {
    pub fn succeeded(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStatus {
    pub project_id: String,
    pub total_workflows: usize,
    pub active_workflows: usize,
    pub total_executions: usize,
    /// Fraction in `0..=1`
    pub success_rate: f64,
    pub recent_executions: Vec<WorkflowExecution>,
}

/// Something that happened to an item in a project
#[derive(Debug, Clone)]
pub struct ProjectEvent {
    pub project_id: String,
    pub trigger: Trigger,
    pub item: ItemRef,
    /// Field name to current value
    pub payload: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl ProjectEvent {
    pub fn new(project_id: impl Into<String>, trigger: Trigger, item: ItemRef) -> Self {
        Self {
            project_id: project_id.into(),
            trigger,
            item,
            payload: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_payload(mut self, payload: BTreeMap<String, String>) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_value(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.payload.insert(field.into(), value.into());
        self
    }
}
