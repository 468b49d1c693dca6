//! Detection of remote drift and the choices offered to the user.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::{Baseline, FieldChanges, Task, TaskFields};

/// Outcome of comparing a fresh remote read against the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictCheck {
    /// Nobody else touched the tracked fields
    Clean,
    /// The remote moved past the baseline on a tracked field
    Drifted,
}

/// Compare the remote task with the baseline.
///
/// A newer timestamp alone is not a conflict: metadata-only changes (state,
/// labels, comments) bump `updatedAt` without touching the tracked fields.
pub fn detect(baseline: &Baseline, remote: &Task) -> ConflictCheck {
    if remote.updated_at <= baseline.updated_at {
        return ConflictCheck::Clean;
    }

    if TaskFields::from(remote) == baseline.fields {
        tracing::debug!(
            "Remote {} is newer but tracked fields match the baseline",
            remote.id
        );
        ConflictCheck::Clean
    } else {
        ConflictCheck::Drifted
    }
}

/// A detected divergence waiting for a user decision. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Remote state at detection time
    pub remote: Task,
    /// Local changes relative to the baseline
    pub pending: FieldChanges,
}

impl Conflict {
    /// Local changes whose field was also changed remotely.
    pub fn overlapping_fields(&self, baseline: &Baseline) -> Vec<&'static str> {
        let remote_changes = FieldChanges::between(&baseline.fields, &TaskFields::from(&self.remote));
        let remote_names = remote_changes.changed_field_names();
        self.pending
            .changed_field_names()
            .into_iter()
            .filter(|name| remote_names.contains(name))
            .collect()
    }
}

/// The user's answer to a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Overwrite the remote with the local changes
    KeepMine,
    /// Drop the local changes and adopt the remote values
    KeepTheirs,
    /// Dismiss; nothing changes
    Cancel,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::KeepMine => "mine",
            Self::KeepTheirs => "theirs",
            Self::Cancel => "cancel",
        })
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mine" | "keep-mine" | "keep_mine" => Ok(Self::KeepMine),
            "theirs" | "keep-theirs" | "keep_theirs" => Ok(Self::KeepTheirs),
            "cancel" => Ok(Self::Cancel),
            other => Err(Error::InvalidInput(format!(
                "unknown resolution '{other}' (expected mine, theirs or cancel)"
            ))),
        }
    }
}
