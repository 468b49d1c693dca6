//! Data models for tasksync

mod fields;
mod snapshot;
mod task;

pub use fields::{FieldChanges, TaskFields};
pub use snapshot::{Baseline, Draft};
pub use task::{StateKind, Task, TaskId, WorkflowState};
