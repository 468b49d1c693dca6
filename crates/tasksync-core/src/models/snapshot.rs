//! Baseline and draft snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::fields::TaskFields;
use super::task::Task;

/// Last field values known to match the remote system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    pub fields: TaskFields,
    /// Remote `updatedAt` at the moment of agreement
    pub updated_at: DateTime<Utc>,
}

impl From<&Task> for Baseline {
    fn from(task: &Task) -> Self {
        Self {
            fields: TaskFields::from(task),
            updated_at: task.updated_at,
        }
    }
}

/// Locally persisted, not yet confirmed edit intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub fields: TaskFields,
    /// Local wall-clock time of the write
    pub saved_at: DateTime<Utc>,
}

impl Draft {
    pub fn new(fields: TaskFields) -> Self {
        Self {
            fields,
            saved_at: Utc::now(),
        }
    }
}
