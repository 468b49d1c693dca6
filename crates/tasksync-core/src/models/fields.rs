//! Editable field set and partial updates

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::task::Task;
use crate::error::{Error, Result};

/// Message for a save refused because the title is blank
const EMPTY_TITLE_MESSAGE: &str = "Title cannot be empty";

/// The fields a user can edit on a task.
///
/// This is the shape of the edit buffer, of a baseline and of a draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
}

impl TaskFields {
    /// Title is blank (whitespace-only counts as blank)
    pub fn has_blank_title(&self) -> bool {
        self.title.trim().is_empty()
    }

    /// Check the fields can be sent to the remote API.
    pub fn validate(&self) -> Result<()> {
        if self.has_blank_title() {
            return Err(Error::Validation(EMPTY_TITLE_MESSAGE.to_string()));
        }
        Ok(())
    }
}

impl From<&Task> for TaskFields {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            due_date: task.due_date,
        }
    }
}

/// A partial update: only the fields that changed are set.
///
/// `due_date` is doubly optional so that clearing a due date
/// (`Some(None)`) differs from leaving it untouched (`None`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
}

impl FieldChanges {
    /// Diff `current` against `base`, keeping only differing fields.
    pub fn between(base: &TaskFields, current: &TaskFields) -> Self {
        Self {
            title: (base.title != current.title).then(|| current.title.clone()),
            description: (base.description != current.description)
                .then(|| current.description.clone()),
            due_date: (base.due_date != current.due_date).then_some(current.due_date),
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.due_date.is_none()
    }

    /// Write the changed fields into `fields`.
    pub fn apply_to(&self, fields: &mut TaskFields) {
        if let Some(title) = &self.title {
            fields.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            fields.description.clone_from(description);
        }
        if let Some(due_date) = self.due_date {
            fields.due_date = due_date;
        }
    }

    /// Names of the changed fields, in a stable order.
    pub fn changed_field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.title.is_some() {
            names.push("title");
        }
        if self.description.is_some() {
            names.push("description");
        }
        if self.due_date.is_some() {
            names.push("due_date");
        }
        names
    }
}
