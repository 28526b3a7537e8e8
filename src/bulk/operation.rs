//! Bulk operation records and the request that creates them

use crate::api::models::{FieldUpdate, ItemMutation};
use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulkOperationType {
    Update,
    Delete,
    Archive,
}

impl fmt::Display for BulkOperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Archive => "archive",
        };
        f.write_str(name)
    }
}

/// `Pending -> Running -> {Completed | Failed | PartiallyFailed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulkStatus {
    Pending,
    Running,
    Completed,
    Failed,
    PartiallyFailed,
}

impl BulkStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::PartiallyFailed)
    }
}

impl fmt::Display for BulkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::PartiallyFailed => "partially failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub item_id: String,
    pub message: String,
}

/// Snapshot of a bulk operation; the terminal snapshot is the final record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperation {
    #[serde(rename = "operationId")]
    pub id: Uuid,
    #[serde(rename = "type")]
    pub operation_type: BulkOperationType,
    pub status: BulkStatus,
    pub total_items: usize,
    pub processed_items: usize,
    pub failed_items: usize,
    pub progress: f64,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(
        with = "crate::timestamp::option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ItemFailure>,
}

impl BulkOperation {
    pub fn succeeded_items(&self) -> usize {
        self.processed_items - self.failed_items
    }

    /// Error to report for a terminal record that is not fully successful
    pub fn outcome_error(&self) -> Option<CoreError> {
        match self.status {
            BulkStatus::PartiallyFailed => Some(CoreError::PartialFailure {
                failed: self.failed_items,
                total: self.total_items,
            }),
            BulkStatus::Failed => Some(CoreError::Remote(crate::error::ProviderError::Rejected(
                self.error_message
                    .clone()
                    .unwrap_or_else(|| "bulk operation failed".to_string()),
            ))),
            _ => None,
        }
    }
}

/// `processed / total`, 0 for an empty batch
pub fn progress_ratio(processed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        processed as f64 / total as f64
    }
}

/// Terminal status from final counts
pub fn terminal_status(
    total: usize,
    processed: usize,
    failed: usize,
    cancelled: bool,
    first_error: Option<&str>,
) -> (BulkStatus, Option<String>) {
    if cancelled {
        return (
            BulkStatus::Failed,
            Some(format!(
                "operation cancelled after {} of {} items ({} failed)",
                processed, total, failed
            )),
        );
    }
    if processed == 0 {
        return (
            BulkStatus::Failed,
            Some("no item could be attempted".to_string()),
        );
    }

    match failed {
        0 => (BulkStatus::Completed, None),
        f if f >= total => {
            let cause = first_error.map(|e| format!(": {}", e)).unwrap_or_default();
            (
                BulkStatus::Failed,
                Some(format!("all {} items failed{}", total, cause)),
            )
        }
        f => (
            BulkStatus::PartiallyFailed,
            Some(format!("{} of {} items failed", f, total)),
        ),
    }
}

/// A batch of item ids plus the mutation to apply to each
#[derive(Debug, Clone)]
pub struct BulkRequest {
    pub project_id: String,
    pub item_ids: Vec<String>,
    pub mutation: ItemMutation,
}

impl BulkRequest {
    pub fn update(
        project_id: impl Into<String>,
        item_ids: Vec<String>,
        updates: Vec<FieldUpdate>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            item_ids,
            mutation: ItemMutation::Update(updates),
        }
    }

    pub fn delete(project_id: impl Into<String>, item_ids: Vec<String>) -> Self {
        Self {
            project_id: project_id.into(),
            item_ids,
            mutation: ItemMutation::Delete,
        }
    }

    pub fn archive(project_id: impl Into<String>, item_ids: Vec<String>) -> Self {
        Self {
            project_id: project_id.into(),
            item_ids,
            mutation: ItemMutation::Archive,
        }
    }

    pub fn operation_type(&self) -> BulkOperationType {
        match self.mutation {
            ItemMutation::Update(_) => BulkOperationType::Update,
            ItemMutation::Delete => BulkOperationType::Delete,
            ItemMutation::Archive => BulkOperationType::Archive,
        }
    }

    /// Preconditions checked before anything touches the remote system
    pub fn validate(&self) -> CoreResult<()> {
        if self.project_id.trim().is_empty() {
            return Err(CoreError::InvalidRequest("project id is required".into()));
        }
        if self.item_ids.is_empty() {
            return Err(CoreError::InvalidRequest(
                "at least one item id is required".into(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.item_ids.len());
        for id in &self.item_ids {
            if id.trim().is_empty() {
                return Err(CoreError::InvalidRequest("item ids must not be blank".into()));
            }
            if !seen.insert(id.as_str()) {
                return Err(CoreError::InvalidRequest(format!(
                    "item id '{}' appears more than once",
                    id
                )));
            }
        }

        if let ItemMutation::Update(updates) = &self.mutation {
            if updates.is_empty() {
                return Err(CoreError::InvalidRequest(
                    "an update needs at least one field change".into(),
                ));
            }
            if updates.iter().any(|u| u.field.trim().is_empty()) {
                return Err(CoreError::InvalidRequest("field names must not be blank".into()));
            }
        }
        Ok(())
    }
}
