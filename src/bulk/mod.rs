//! Bulk Operation Coordinator
//!
//! Applies one mutation (update, delete or archive) to many project items and
//! reports the outcome as a single [`BulkOperation`] record.

pub mod coordinator;
pub mod operation;

pub use coordinator::{BulkConfig, BulkCoordinator, BulkOperationHandle};
pub use operation::{
    BulkOperation, BulkOperationType, BulkRequest, BulkStatus, ItemFailure,
};
