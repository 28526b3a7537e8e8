//! Executes bulk requests against a [`ProjectDataProvider`]
//!
//! Items are attempted with bounded parallelism. Each item gets exactly one
//! attempt; a failed or timed-out item is recorded and the batch continues.
//! Progress is tracked with atomics so a concurrent observer never sees
//! `failed > processed` or `processed > total`.

use super::operation::{
    BulkOperation, BulkOperationType, BulkRequest, BulkStatus, ItemFailure, progress_ratio,
    terminal_status,
};
use crate::api::provider::ProjectDataProvider;
use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const LATE_CANCEL: &str = "cancel requested after every item had started";

#[derive(Debug, Clone)]
pub struct BulkConfig {
    /// Upper bound on items in flight at once
    pub concurrency: usize,
    /// Budget for a single item's mutation
    pub item_timeout: Duration,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            item_timeout: Duration::from_secs(30),
        }
    }
}

impl BulkConfig {
    pub fn new(concurrency: usize, item_timeout: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            item_timeout,
        }
    }
}

#[derive(Debug)]
struct Phase {
    status: BulkStatus,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    /// (submission index, failure)
    failures: Vec<(usize, ItemFailure)>,
}

/// Live state of one operation, shared between the worker and observers
#[derive(Debug)]
struct OperationState {
    id: Uuid,
    operation_type: BulkOperationType,
    created_at: DateTime<Utc>,
    total: usize,
    processed: AtomicUsize,
    failed: AtomicUsize,
    phase: Mutex<Phase>,
}

impl OperationState {
    fn new(operation_type: BulkOperationType, total: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            operation_type,
            created_at: Utc::now(),
            total,
            processed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            phase: Mutex::new(Phase {
                status: BulkStatus::Pending,
                completed_at: None,
                error_message: None,
                failures: Vec::new(),
            }),
        }
    }

    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn mark_running(&self) {
        let mut phase = self.phase();
        if phase.status == BulkStatus::Pending {
            phase.status = BulkStatus::Running;
        }
    }

    fn record_success(&self) {
        self.processed.fetch_add(1, Ordering::SeqCst);
    }

    fn record_failure(&self, index: usize, item_id: &str, message: String) {
        // The failure entry lands before the counters move so a snapshot
        // that counts a failure can also list it.
        self.phase().failures.push((
            index,
            ItemFailure {
                item_id: item_id.to_string(),
                message,
            },
        ));
        self.processed.fetch_add(1, Ordering::SeqCst);
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    /// Move to the terminal status exactly once; later calls return the
    /// already-final record. A cancel that skipped nothing is noted in the
    /// message but leaves the status to the item counts.
    fn finish(&self, cancelled: bool, cancel_requested: bool) -> BulkOperation {
        {
            let mut phase = self.phase();
            if !phase.status.is_terminal() {
                phase.failures.sort_by_key(|(index, _)| *index);
                let processed = self.processed.load(Ordering::SeqCst);
                let failed = self.failed.load(Ordering::SeqCst);
                let first_error = phase.failures.first().map(|(_, f)| f.message.clone());
                let (status, message) = terminal_status(
                    self.total,
                    processed,
                    failed,
                    cancelled,
                    first_error.as_deref(),
                );
                phase.status = status;
                phase.error_message = match (message, cancel_requested && !cancelled) {
                    (message, false) => message,
                    (Some(message), true) => Some(format!("{}; {}", message, LATE_CANCEL)),
                    (None, true) => Some(LATE_CANCEL.to_string()),
                };
                phase.completed_at = Some(Utc::now());
            }
        }
        self.snapshot()
    }

    fn abort(&self, message: String) -> BulkOperation {
        {
            let mut phase = self.phase();
            if !phase.status.is_terminal() {
                phase.status = BulkStatus::Failed;
                phase.error_message = Some(message);
                phase.completed_at = Some(Utc::now());
            }
        }
        self.snapshot()
    }

    fn snapshot(&self) -> BulkOperation {
        let phase = self.phase();
        // failed is read before processed, and both only grow, so the pair
        // always satisfies failed <= processed.
        let failed = self.failed.load(Ordering::SeqCst);
        let processed = self.processed.load(Ordering::SeqCst).min(self.total);

        let mut failures: Vec<(usize, ItemFailure)> = phase.failures.clone();
        failures.sort_by_key(|(index, _)| *index);

        BulkOperation {
            id: self.id,
            operation_type: self.operation_type,
            status: phase.status,
            total_items: self.total,
            processed_items: processed,
            failed_items: failed,
            progress: progress_ratio(processed, self.total),
            created_at: self.created_at,
            completed_at: phase.completed_at,
            error_message: phase.error_message.clone(),
            failures: failures.into_iter().map(|(_, f)| f).collect(),
        }
    }
}

enum ItemOutcome {
    Succeeded,
    Failed(String),
    Skipped,
}

/// A bulk operation running in the background
pub struct BulkOperationHandle {
    state: Arc<OperationState>,
    cancel: CancellationToken,
    task: JoinHandle<BulkOperation>,
}

impl BulkOperationHandle {
    pub fn id(&self) -> Uuid {
        self.state.id
    }

    /// Current progress; safe to call at any time
    pub fn snapshot(&self) -> BulkOperation {
        self.state.snapshot()
    }

    /// Stop starting new items. Items already in flight run to completion.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the terminal record
    pub async fn wait(self) -> BulkOperation {
        match self.task.await {
            Ok(operation) => operation,
            Err(e) => {
                error!("Bulk operation {} worker stopped: {}", self.state.id, e);
                self.state.abort(format!("worker stopped unexpectedly: {}", e))
            }
        }
    }
}

pub struct BulkCoordinator<P: ?Sized> {
    provider: Arc<P>,
    config: BulkConfig,
    operations: Mutex<HashMap<Uuid, Arc<OperationState>>>,
}

impl<P> BulkCoordinator<P>
where
    P: ProjectDataProvider + ?Sized + 'static,
{
    pub fn new(provider: Arc<P>, config: BulkConfig) -> Self {
        Self {
            provider,
            config: BulkConfig::new(config.concurrency, config.item_timeout),
            operations: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &BulkConfig {
        &self.config
    }

    /// Run a bulk request to its terminal record
    pub async fn submit(&self, request: BulkRequest) -> CoreResult<BulkOperation> {
        self.submit_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Like [`submit`](Self::submit), stopping early once `cancel` fires
    pub async fn submit_with_cancel(
        &self,
        request: BulkRequest,
        cancel: CancellationToken,
    ) -> CoreResult<BulkOperation> {
        request.validate()?;
        let state = self.register(&request);
        Ok(execute(
            Arc::clone(&self.provider),
            state,
            request,
            self.config.clone(),
            cancel,
        )
        .await)
    }

    /// Start a bulk request in the background. Must be called inside a tokio runtime.
    pub fn spawn(&self, request: BulkRequest) -> CoreResult<BulkOperationHandle> {
        request.validate()?;
        let state = self.register(&request);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(execute(
            Arc::clone(&self.provider),
            Arc::clone(&state),
            request,
            self.config.clone(),
            cancel.clone(),
        ));

        Ok(BulkOperationHandle {
            state,
            cancel,
            task,
        })
    }

    /// Latest snapshot of an operation started by this coordinator
    pub fn status(&self, id: Uuid) -> CoreResult<BulkOperation> {
        self.registry()
            .get(&id)
            .map(|state| state.snapshot())
            .ok_or_else(|| CoreError::NotFound(format!("bulk operation {}", id)))
    }

    /// All operations started by this coordinator, oldest first
    pub fn operations(&self) -> Vec<BulkOperation> {
        let mut all: Vec<BulkOperation> =
            self.registry().values().map(|state| state.snapshot()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        all
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<OperationState>>> {
        self.operations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn register(&self, request: &BulkRequest) -> Arc<OperationState> {
        let state = Arc::new(OperationState::new(
            request.operation_type(),
            request.item_ids.len(),
        ));
        self.registry().insert(state.id, Arc::clone(&state));
        debug!(
            "Registered bulk {} operation {} for {} items",
            state.operation_type, state.id, state.total
        );
        state
    }
}

async fn execute<P>(
    provider: Arc<P>,
    state: Arc<OperationState>,
    request: BulkRequest,
    config: BulkConfig,
    cancel: CancellationToken,
) -> BulkOperation
where
    P: ProjectDataProvider + ?Sized,
{
    state.mark_running();
    info!(
        "Bulk {} {} started: {} items in project {}, concurrency {}",
        state.operation_type,
        state.id,
        state.total,
        request.project_id,
        config.concurrency
    );

    let item_timeout = config.item_timeout;
    let items = request.item_ids.clone().into_iter().enumerate();

    let mut outcomes = stream::iter(items)
        .map(|(index, item_id)| {
            let provider = Arc::clone(&provider);
            let project_id = request.project_id.clone();
            let mutation = request.mutation.clone();
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return (index, item_id, ItemOutcome::Skipped);
                }
                let attempt = provider.mutate_item(&project_id, &item_id, &mutation);
                let outcome = match tokio::time::timeout(item_timeout, attempt).await {
                    Ok(Ok(())) => ItemOutcome::Succeeded,
                    Ok(Err(e)) => ItemOutcome::Failed(e.to_string()),
                    Err(_) => ItemOutcome::Failed(format!("timed out after {:?}", item_timeout)),
                };
                (index, item_id, outcome)
            }
        })
        .buffer_unordered(config.concurrency.max(1));

    let mut skipped = 0usize;
    while let Some((index, item_id, outcome)) = outcomes.next().await {
        match outcome {
            ItemOutcome::Succeeded => {
                debug!("Bulk {}: item {} done", state.id, item_id);
                state.record_success();
            }
            ItemOutcome::Failed(message) => {
                warn!("Bulk {}: item {} failed: {}", state.id, item_id, message);
                state.record_failure(index, &item_id, message);
            }
            ItemOutcome::Skipped => skipped += 1,
        }
    }

    let operation = state.finish(skipped > 0, cancel.is_cancelled());
    match operation.status {
        BulkStatus::Completed => info!(
            "Bulk {} completed: {} items",
            operation.id, operation.total_items
        ),
        _ => warn!(
            "Bulk {} {}: {}",
            operation.id,
            operation.status,
            operation.error_message.as_deref().unwrap_or("")
        ),
    }
    operation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts_stay_consistent() {
        let state = OperationState::new(BulkOperationType::Delete, 3);
        assert_eq!(state.snapshot().status, BulkStatus::Pending);

        state.mark_running();
        state.record_failure(2, "c", "boom".into());
        state.record_success();

        let snapshot = state.snapshot();
        assert_eq!(snapshot.status, BulkStatus::Running);
        assert_eq!(snapshot.processed_items, 2);
        assert_eq!(snapshot.failed_items, 1);
        assert!(snapshot.failed_items <= snapshot.processed_items);
        assert!((snapshot.progress - 2.0 / 3.0).abs() < 1e-9);
        assert!(snapshot.completed_at.is_none());
    }

    #[test]
    fn test_finish_is_idempotent_and_orders_failures() {
        let state = OperationState::new(BulkOperationType::Archive, 3);
        state.mark_running();
        state.record_failure(2, "c", "late".into());
        state.record_failure(0, "a", "early".into());
        state.record_success();

        let first = state.finish(false, false);
        assert_eq!(first.status, BulkStatus::PartiallyFailed);
        assert_eq!(first.failures[0].item_id, "a");
        assert_eq!(first.failures[1].item_id, "c");

        let second = state.finish(true, true);
        assert_eq!(second.status, BulkStatus::PartiallyFailed);
        assert_eq!(second.completed_at, first.completed_at);
    }

    #[test]
    fn test_cancel_after_last_item_started_is_noted() {
        let state = OperationState::new(BulkOperationType::Delete, 2);
        state.mark_running();
        state.record_success();
        state.record_success();

        let operation = state.finish(false, true);
        assert_eq!(operation.status, BulkStatus::Completed);
        assert_eq!(operation.processed_items, 2);
        assert_eq!(operation.error_message.as_deref(), Some(LATE_CANCEL));

        let partial = OperationState::new(BulkOperationType::Delete, 2);
        partial.mark_running();
        partial.record_success();
        partial.record_failure(1, "b", "boom".into());
        let message = partial.finish(false, true).error_message.unwrap();
        assert!(message.starts_with("1 of 2 items failed"), "{}", message);
        assert!(message.ends_with(LATE_CANCEL), "{}", message);
    }

    #[test]
    fn test_config_floor_on_concurrency() {
        let config = BulkConfig::new(0, Duration::from_secs(1));
        assert_eq!(config.concurrency, 1);
    }
}
