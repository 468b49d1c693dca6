//! Access to the remote task API.

mod cache;
mod linear;

use std::future::Future;

use crate::error::Result;
use crate::models::{FieldChanges, Task, TaskId, WorkflowState};

pub use cache::WorkflowStateCache;
pub use linear::LinearGateway;

/// Remote operations the sync layer depends on.
///
/// Failures surface as `Error::Network`, `Error::Api` or `Error::Timeout`.
pub trait RemoteGateway: Send + Sync {
    /// Read the current remote state of a task
    fn fetch_task(&self, id: &TaskId) -> impl Future<Output = Result<Task>> + Send;

    /// Apply a partial update and return the post-write task
    fn update_task(
        &self,
        id: &TaskId,
        changes: &FieldChanges,
    ) -> impl Future<Output = Result<Task>> + Send;

    /// Workflow states of a team, in board order
    fn list_workflow_states(
        &self,
        team_id: &str,
    ) -> impl Future<Output = Result<Vec<WorkflowState>>> + Send;

    /// Move a task to another workflow state
    fn set_task_state(
        &self,
        id: &TaskId,
        state_id: &str,
    ) -> impl Future<Output = Result<Task>> + Send;
}
