//! Tracking of the last agreed remote state.

use crate::models::{Baseline, FieldChanges, Task, TaskFields};

/// Holds the last point of confirmed agreement with the remote system.
///
/// Only loads, successful saves and conflict resolutions move it; keystrokes
/// never do.
#[derive(Debug, Clone, Default)]
pub struct BaselineTracker {
    baseline: Option<Baseline>,
}

impl BaselineTracker {
    pub const fn new() -> Self {
        Self { baseline: None }
    }

    pub fn set_baseline(&mut self, task: &Task) {
        self.baseline = Some(Baseline::from(task));
    }

    pub const fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    /// Any tracked field differs from the baseline.
    ///
    /// Without a baseline nothing can be compared, so nothing is dirty.
    pub fn is_dirty(&self, current: &TaskFields) -> bool {
        self.baseline
            .as_ref()
            .is_some_and(|baseline| baseline.fields != *current)
    }

    /// Fields of `current` that differ from the baseline.
    pub fn changes(&self, current: &TaskFields) -> FieldChanges {
        self.baseline
            .as_ref()
            .map(|baseline| FieldChanges::between(&baseline.fields, current))
            .unwrap_or_default()
    }
}
