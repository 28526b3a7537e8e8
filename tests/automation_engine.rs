//! Integration tests for workflow definitions, evaluation and status

mod common;

use common::{MockProvider, PROJECT_ID};
use gh_projects::api::{FieldValue, ItemRef, ProjectAction};
use gh_projects::automation::{
    AutomationEngine, Condition, ExecutionStatus, ProjectEvent, Trigger, WorkflowDocument,
    WorkflowDraft, WorkflowState, WorkflowUpdate,
};
use gh_projects::error::CoreError;
use uuid::Uuid;

fn draft(name: &str, trigger: Trigger, condition: Option<Condition>, action: ProjectAction) -> WorkflowDraft {
    WorkflowDraft {
        project_id: PROJECT_ID.to_string(),
        name: name.to_string(),
        trigger,
        condition,
        action,
        enabled: true,
    }
}

fn move_to(status: &str) -> ProjectAction {
    ProjectAction::MoveToStatus {
        status: status.to_string(),
    }
}

fn closed_event(item: &str, status: &str) -> ProjectEvent {
    ProjectEvent::new(PROJECT_ID, Trigger::IssueClosed, ItemRef::new(item)).with_value("Status", status)
}

#[tokio::test]
async fn test_only_matching_conditions_execute() {
    let engine = AutomationEngine::new();
    let provider = MockProvider::new();

    engine
        .create(draft(
            "Close to done",
            Trigger::IssueClosed,
            Some(Condition::equals("Status", "In Review")),
            move_to("Done"),
        ))
        .unwrap();
    engine
        .create(draft(
            "Archive backlog",
            Trigger::IssueClosed,
            Some(Condition::equals("Status", "Backlog")),
            ProjectAction::Archive,
        ))
        .unwrap();
    engine
        .create(draft("Other trigger", Trigger::ItemAdded, None, ProjectAction::Archive))
        .unwrap();

    let executions = engine
        .evaluate(&provider, &closed_event("PVTI_1", "In Review"))
        .await
        .unwrap();

    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].status, ExecutionStatus::Success);
    assert_eq!(executions[0].item_id, "PVTI_1");
    assert_eq!(
        provider.recorded_actions(),
        vec![("PVTI_1".to_string(), move_to("Done"))]
    );
}

#[tokio::test]
async fn test_disabled_workflows_never_run() {
    let engine = AutomationEngine::new();
    let provider = MockProvider::new();

    let mut paused = draft("Paused", Trigger::IssueClosed, None, move_to("Done"));
    paused.enabled = false;
    engine.create(paused).unwrap();

    let both = engine
        .create(draft("Toggled", Trigger::IssueClosed, None, move_to("Done")))
        .unwrap();
    let updated = engine
        .update(
            both.id,
            WorkflowUpdate {
                enable: true,
                disable: true,
                ..WorkflowUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(updated.status, WorkflowState::Disabled);

    let executions = engine
        .evaluate(&provider, &closed_event("PVTI_1", "Todo"))
        .await
        .unwrap();
    assert!(executions.is_empty());
    assert!(provider.recorded_actions().is_empty());
}

#[tokio::test]
async fn test_failing_action_does_not_stop_others() {
    let engine = AutomationEngine::new();
    let provider = MockProvider::new().failing_action("archive");

    let archive = engine
        .create(draft("Archive", Trigger::IssueClosed, None, ProjectAction::Archive))
        .unwrap();
    let assign = engine
        .create(draft(
            "Assign lead",
            Trigger::IssueClosed,
            None,
            ProjectAction::Assign {
                login: "octocat".into(),
            },
        ))
        .unwrap();

    let executions = engine
        .evaluate(&provider, &closed_event("PVTI_9", "Done"))
        .await
        .unwrap();

    assert_eq!(executions.len(), 2);
    // Creation order is evaluation order
    assert_eq!(executions[0].workflow_id, archive.id);
    assert_eq!(executions[0].status, ExecutionStatus::Failure);
    assert!(executions[0].error.as_deref().unwrap().contains("not permitted"));
    assert_eq!(executions[1].workflow_id, assign.id);
    assert_eq!(executions[1].status, ExecutionStatus::Success);
}

#[tokio::test]
async fn test_status_reports_success_rate() {
    let engine = AutomationEngine::new();
    let provider = MockProvider::new().failing_action("set_field");

    engine
        .create(draft("Move", Trigger::IssueClosed, None, move_to("Done")))
        .unwrap();
    engine
        .create(draft(
            "Clear estimate",
            Trigger::IssueClosed,
            Some(Condition::equals("Status", "Blocked")),
            ProjectAction::SetField {
                field: "Estimate".into(),
                value: FieldValue::Clear,
            },
        ))
        .unwrap();
    let mut off = draft("Off", Trigger::ItemAdded, None, ProjectAction::Archive);
    off.enabled = false;
    engine.create(off).unwrap();

    // Two successes from "Move", one failure from "Clear estimate"
    engine.evaluate(&provider, &closed_event("PVTI_1", "Done")).await.unwrap();
    engine.evaluate(&provider, &closed_event("PVTI_2", "Blocked")).await.unwrap();

    let status = engine.status(PROJECT_ID);
    assert_eq!(status.total_workflows, 3);
    assert_eq!(status.active_workflows, 2);
    assert_eq!(status.total_executions, 3);
    assert!((status.success_rate - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(status.recent_executions.len(), 3);

    let empty = engine.status("PVT_other");
    assert_eq!(empty.total_workflows, 0);
    assert_eq!(empty.success_rate, 0.0);
    assert!(empty.recent_executions.is_empty());
}

#[tokio::test]
async fn test_recent_executions_are_bounded_newest_first() {
    let engine = AutomationEngine::new().with_recent_window(2);
    let provider = MockProvider::new();
    engine
        .create(draft("Move", Trigger::IssueClosed, None, move_to("Done")))
        .unwrap();

    for item in ["PVTI_1", "PVTI_2", "PVTI_3"] {
        engine.evaluate(&provider, &closed_event(item, "Todo")).await.unwrap();
    }

    let status = engine.status(PROJECT_ID);
    assert_eq!(status.total_executions, 3);
    let recent: Vec<&str> = status
        .recent_executions
        .iter()
        .map(|e| e.item_id.as_str())
        .collect();
    assert_eq!(recent, vec!["PVTI_3", "PVTI_2"]);
}

#[tokio::test]
async fn test_history_keeps_newest_executions_per_project() {
    let engine = AutomationEngine::new().with_history_limit(3);
    let provider = MockProvider::new();
    engine
        .create(draft("Move", Trigger::IssueClosed, None, move_to("Done")))
        .unwrap();
    let mut other = draft("Elsewhere", Trigger::IssueClosed, None, ProjectAction::Archive);
    other.project_id = "PVT_other".into();
    engine.create(other).unwrap();

    let elsewhere = ProjectEvent::new("PVT_other", Trigger::IssueClosed, ItemRef::new("PVTI_x"));
    engine.evaluate(&provider, &elsewhere).await.unwrap();
    for i in 1..=5 {
        let item = format!("PVTI_{}", i);
        engine.evaluate(&provider, &closed_event(&item, "Todo")).await.unwrap();
    }

    let kept: Vec<String> = engine
        .executions()
        .into_iter()
        .filter(|e| e.project_id == PROJECT_ID)
        .map(|e| e.item_id)
        .collect();
    assert_eq!(kept, vec!["PVTI_3", "PVTI_4", "PVTI_5"]);
    assert_eq!(engine.status(PROJECT_ID).total_executions, 3);
    assert_eq!(engine.status("PVT_other").total_executions, 1);

    // Saved history is bounded too
    let reloaded = AutomationEngine::new().with_history_limit(2);
    reloaded.load(engine.list(None), engine.executions());
    assert_eq!(reloaded.status(PROJECT_ID).total_executions, 2);
    assert_eq!(reloaded.status("PVT_other").total_executions, 1);
}

#[tokio::test]
async fn test_deleting_workflow_drops_its_executions() {
    let engine = AutomationEngine::new();
    let provider = MockProvider::new().failing_action("archive");
    let archive = engine
        .create(draft("Archive", Trigger::IssueClosed, None, ProjectAction::Archive))
        .unwrap();
    let keep = engine
        .create(draft("Move", Trigger::IssueClosed, None, move_to("Done")))
        .unwrap();

    engine.evaluate(&provider, &closed_event("PVTI_1", "Todo")).await.unwrap();
    assert_eq!(engine.status(PROJECT_ID).total_executions, 2);
    assert_eq!(engine.status(PROJECT_ID).success_rate, 0.5);

    engine.delete(archive.id).unwrap();

    let status = engine.status(PROJECT_ID);
    assert_eq!(status.total_executions, 1);
    assert_eq!(status.success_rate, 1.0);
    assert!(engine.executions().iter().all(|e| e.workflow_id == keep.id));
}

#[tokio::test]
async fn test_invalid_event_is_rejected() {
    let engine = AutomationEngine::new();
    let provider = MockProvider::new();

    let no_item = ProjectEvent::new(PROJECT_ID, Trigger::ItemAdded, ItemRef::new(""));
    assert!(matches!(
        engine.evaluate(&provider, &no_item).await,
        Err(CoreError::InvalidRequest(_))
    ));
}

#[test]
fn test_unknown_workflow_is_not_found() {
    let engine = AutomationEngine::new();
    let id = Uuid::new_v4();

    assert!(matches!(engine.get(id), Err(CoreError::NotFound(_))));
    assert!(matches!(engine.delete(id), Err(CoreError::NotFound(_))));
    assert!(matches!(
        engine.update(id, WorkflowUpdate::default()),
        Err(CoreError::NotFound(_))
    ));
}

#[test]
fn test_create_rejects_missing_parameters() {
    let engine = AutomationEngine::new();
    assert!(matches!(
        engine.create(draft("", Trigger::ItemAdded, None, ProjectAction::Archive)),
        Err(CoreError::InvalidRequest(_))
    ));
    assert!(matches!(
        engine.create(draft("Move", Trigger::ItemAdded, None, move_to(" "))),
        Err(CoreError::InvalidRequest(_))
    ));
    assert!(engine.list(None).is_empty());
}

#[tokio::test]
async fn test_document_round_trip_restores_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("workflows.json");
    let provider = MockProvider::new();

    let engine = AutomationEngine::new();
    let created = engine
        .create(draft(
            "Triage",
            Trigger::Custom("sla-breached".into()),
            Some("Priority in High|Urgent".parse().unwrap()),
            move_to("Escalated"),
        ))
        .unwrap();
    let event = ProjectEvent::new(
        PROJECT_ID,
        Trigger::Custom("sla-breached".into()),
        ItemRef::new("PVTI_4"),
    )
    .with_value("priority", "Urgent");
    engine.evaluate(&provider, &event).await.unwrap();

    WorkflowDocument {
        workflows: engine.list(None),
        executions: engine.executions(),
        ..WorkflowDocument::default()
    }
    .save(&path)
    .unwrap();

    let document = WorkflowDocument::load(&path).unwrap();
    let restored = AutomationEngine::new();
    restored.load(document.workflows, document.executions);

    // Timestamps are stored at second precision
    let loaded = restored.get(created.id).unwrap();
    assert_eq!(loaded.name, created.name);
    assert_eq!(loaded.trigger, created.trigger);
    assert_eq!(loaded.condition, created.condition);
    assert_eq!(loaded.action, created.action);
    assert_eq!(loaded.created_at.timestamp(), created.created_at.timestamp());
    assert_eq!(restored.status(PROJECT_ID).total_executions, 1);
}
