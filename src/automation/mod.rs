//! Automation Rule Engine
//!
//! Workflows pair a [`Trigger`] with an optional [`Condition`] and a
//! [`ProjectAction`](crate::api::models::ProjectAction). The engine keeps
//! definitions in memory; [`WorkflowDocument`] reads and writes them as JSON.

pub mod condition;
pub mod engine;
pub mod model;
pub mod store;

pub use condition::Condition;
pub use engine::{
    AutomationEngine, DEFAULT_HISTORY_MULTIPLE, DEFAULT_RECENT_EXECUTIONS, parse_workflow_id,
};
pub use model::{
    ExecutionStatus, ProjectEvent, Trigger, WorkflowDefinition, WorkflowDraft, WorkflowExecution,
    WorkflowState, WorkflowStatus, WorkflowUpdate,
};
pub use store::WorkflowDocument;
