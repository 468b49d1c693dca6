//! Task model

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Identifier of a remote task.
///
/// Accepts either the canonical UUID or the human team key form (`ENG-123`);
/// the remote API resolves both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    /// Parse and validate a task identifier.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::InvalidInput("Task ID cannot be empty".to_string()));
        }

        if let Ok(uuid) = Uuid::parse_str(raw) {
            return Ok(Self(uuid.hyphenated().to_string()));
        }

        if team_key_pattern().is_match(raw) {
            return Ok(Self(raw.to_ascii_uppercase()));
        }

        Err(Error::InvalidInput(format!(
            "'{raw}' is neither a task UUID nor a key like ENG-123"
        )))
    }

    /// Get the string representation of this ID
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn team_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]{0,9}-[0-9]+$").expect("Invalid regex"))
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TaskId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<TaskId> for String {
    fn from(value: TaskId) -> Self {
        value.0
    }
}

/// Category a workflow state belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    Triage,
    Backlog,
    Unstarted,
    Started,
    Completed,
    Canceled,
}

impl StateKind {
    /// Whether tasks in this state count as finished.
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }
}

/// A team's workflow state (status column)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub id: String,
    pub name: String,
    pub kind: StateKind,
}

/// A task as known by the remote system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Canonical identifier
    pub id: TaskId,
    /// Human key, e.g. `ENG-123`
    pub identifier: String,
    /// Owning team
    pub team_id: String,
    pub title: String,
    /// Markdown body
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub state: WorkflowState,
    /// Last remote modification time
    pub updated_at: DateTime<Utc>,
}
