//! Save status shown next to the editor.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Display state of an edit session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    #[default]
    Idle,
    Editing,
    Draft,
    Syncing,
    Synced,
    Error,
}

impl SaveStatus {
    /// Short label for a status indicator
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Editing => "Unsaved",
            Self::Draft => "Saved locally",
            Self::Syncing => "Syncing…",
            Self::Synced => "Synced",
            Self::Error => "Sync error",
        }
    }
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Transition rules between [`SaveStatus`] values.
///
/// Only `begin_save` can fail: one save at a time.
#[derive(Debug, Clone, Default)]
pub struct SaveStateMachine {
    status: SaveStatus,
    message: Option<String>,
}

impl SaveStateMachine {
    pub const fn new() -> Self {
        Self {
            status: SaveStatus::Idle,
            message: None,
        }
    }

    pub const fn status(&self) -> SaveStatus {
        self.status
    }

    /// Message attached to the last failure or rejection
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub const fn is_syncing(&self) -> bool {
        matches!(self.status, SaveStatus::Syncing)
    }

    fn transition(&mut self, to: SaveStatus) {
        if self.status != to {
            tracing::debug!("Save status {:?} -> {:?}", self.status, to);
            self.status = to;
        }
    }

    /// A task finished loading; `from_draft` when a local draft was restored.
    pub fn on_loaded(&mut self, from_draft: bool) {
        self.message = None;
        self.transition(if from_draft {
            SaveStatus::Draft
        } else {
            SaveStatus::Synced
        });
    }

    /// A field changed; `dirty` when the buffer now differs from the
    /// baseline. Ignored while a save is in flight.
    pub fn on_edit(&mut self, dirty: bool) {
        if self.is_syncing() {
            return;
        }
        self.message = None;
        self.transition(if dirty {
            SaveStatus::Editing
        } else {
            SaveStatus::Synced
        });
    }

    /// A debounced draft write landed.
    pub fn on_draft_persisted(&mut self) {
        if self.status == SaveStatus::Editing {
            self.transition(SaveStatus::Draft);
        }
    }

    pub fn begin_save(&mut self) -> Result<()> {
        if self.is_syncing() {
            return Err(Error::SaveInFlight);
        }
        self.message = None;
        self.transition(SaveStatus::Syncing);
        Ok(())
    }

    /// The save was rejected locally before any remote call.
    pub fn on_rejected(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
        if !self.is_syncing() {
            self.transition(SaveStatus::Editing);
        }
    }

    /// The save went through; `still_dirty` when edits arrived meanwhile.
    pub fn on_save_succeeded(&mut self, still_dirty: bool) {
        self.message = None;
        self.transition(if still_dirty {
            SaveStatus::Editing
        } else {
            SaveStatus::Synced
        });
    }

    pub fn on_save_failed(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
        self.transition(SaveStatus::Error);
    }

    /// The result of the running save was discarded; settle on what the
    /// buffer says now.
    pub fn on_save_abandoned(&mut self, dirty: bool) {
        if self.is_syncing() {
            self.transition(if dirty {
                SaveStatus::Editing
            } else {
                SaveStatus::Synced
            });
        }
    }

    /// A conflict needs a decision; this is not an error.
    pub fn on_conflict(&mut self) {
        self.message = None;
        self.transition(SaveStatus::Editing);
    }

    /// A conflict was settled without a write.
    pub fn on_resolved(&mut self, dirty: bool) {
        self.message = None;
        self.transition(if dirty {
            SaveStatus::Editing
        } else {
            SaveStatus::Synced
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(SaveStatus::Editing.label(), "Unsaved");
        assert_eq!(SaveStatus::Draft.to_string(), "Saved locally");
        assert_eq!(SaveStatus::Error.label(), "Sync error");
    }

    #[test]
    fn test_edit_then_draft_then_save() {
        let mut machine = SaveStateMachine::new();
        machine.on_loaded(false);
        assert_eq!(machine.status(), SaveStatus::Synced);

        machine.on_edit(true);
        assert_eq!(machine.status(), SaveStatus::Editing);

        machine.on_draft_persisted();
        assert_eq!(machine.status(), SaveStatus::Draft);

        machine.begin_save().unwrap();
        assert_eq!(machine.status(), SaveStatus::Syncing);

        machine.on_save_succeeded(false);
        assert_eq!(machine.status(), SaveStatus::Synced);
    }

    #[test]
    fn test_second_save_is_rejected_while_syncing() {
        let mut machine = SaveStateMachine::new();
        machine.begin_save().unwrap();
        assert!(matches!(machine.begin_save(), Err(Error::SaveInFlight)));
    }

    #[test]
    fn test_edits_during_sync_keep_syncing() {
        let mut machine = SaveStateMachine::new();
        machine.begin_save().unwrap();
        machine.on_edit(true);
        assert_eq!(machine.status(), SaveStatus::Syncing);

        machine.on_save_succeeded(true);
        assert_eq!(machine.status(), SaveStatus::Editing);
    }

    #[test]
    fn test_abandoned_save_leaves_syncing() {
        let mut machine = SaveStateMachine::new();
        machine.begin_save().unwrap();
        machine.on_save_abandoned(true);
        assert_eq!(machine.status(), SaveStatus::Editing);
        assert!(machine.begin_save().is_ok());

        let mut settled = SaveStateMachine::new();
        settled.on_loaded(true);
        settled.on_save_abandoned(false);
        assert_eq!(settled.status(), SaveStatus::Draft);
    }

    #[test]
    fn test_edit_back_to_baseline_is_synced() {
        let mut machine = SaveStateMachine::new();
        machine.on_edit(true);
        machine.on_edit(false);
        assert_eq!(machine.status(), SaveStatus::Synced);
    }

    #[test]
    fn test_draft_label_only_from_editing() {
        let mut machine = SaveStateMachine::new();
        machine.on_loaded(false);
        machine.on_draft_persisted();
        assert_eq!(machine.status(), SaveStatus::Synced);
    }

    #[test]
    fn test_failure_keeps_message_until_next_edit() {
        let mut machine = SaveStateMachine::new();
        machine.begin_save().unwrap();
        machine.on_save_failed("Network error: offline");
        assert_eq!(machine.status(), SaveStatus::Error);
        assert_eq!(machine.message(), Some("Network error: offline"));

        machine.on_edit(true);
        assert_eq!(machine.status(), SaveStatus::Editing);
        assert_eq!(machine.message(), None);
    }

    #[test]
    fn test_rejection_returns_to_editing() {
        let mut machine = SaveStateMachine::new();
        machine.on_edit(true);
        machine.on_rejected("Title cannot be empty");
        assert_eq!(machine.status(), SaveStatus::Editing);
        assert_eq!(machine.message(), Some("Title cannot be empty"));
    }
}
