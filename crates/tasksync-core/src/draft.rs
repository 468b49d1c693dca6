//! Local draft persistence.
//!
//! Drafts hold edits that were never confirmed by the remote API. Every
//! failure in here is logged and swallowed: losing a draft write must never
//! stop the user from editing.

use std::sync::Arc;

use crate::models::{Draft, TaskFields, TaskId};
use crate::store::KeyValueStore;

/// Draft persistence keyed by task id.
pub struct DraftStore<S> {
    store: Arc<S>,
    prefix: String,
}

impl<S> Clone for DraftStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            prefix: self.prefix.clone(),
        }
    }
}

impl<S: KeyValueStore> DraftStore<S> {
    pub fn new(store: Arc<S>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn key(&self, id: &TaskId) -> String {
        format!("{}{}", self.prefix, id)
    }

    /// Persist the current edit buffer. Returns whether the write landed.
    pub fn save_draft(&self, id: &TaskId, fields: &TaskFields) -> bool {
        let draft = Draft::new(fields.clone());
        let payload = match serde_json::to_string(&draft) {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!("Failed to encode draft for {}: {}", id, error);
                return false;
            }
        };

        match self.store.put(&self.key(id), &payload) {
            Ok(()) => {
                tracing::debug!("Draft saved for {}", id);
                true
            }
            Err(error) => {
                tracing::warn!("Failed to save draft for {}: {}", id, error);
                false
            }
        }
    }

    /// Read a previously saved draft, if any.
    pub fn load_draft(&self, id: &TaskId) -> Option<Draft> {
        let raw = match self.store.get(&self.key(id)) {
            Ok(raw) => raw?,
            Err(error) => {
                tracing::warn!("Failed to read draft for {}: {}", id, error);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(draft) => Some(draft),
            Err(error) => {
                tracing::warn!("Ignoring undecodable draft for {}: {}", id, error);
                None
            }
        }
    }

    /// Every stored draft, most recently written first.
    ///
    /// Keys that no longer parse as task ids are skipped.
    pub fn pending_drafts(&self) -> Vec<(TaskId, Draft)> {
        let keys = match self.store.keys_with_prefix(&self.prefix) {
            Ok(keys) => keys,
            Err(error) => {
                tracing::warn!("Failed to list drafts: {}", error);
                return Vec::new();
            }
        };

        keys.iter()
            .filter_map(|key| {
                let id = key
                    .strip_prefix(&self.prefix)
                    .and_then(|raw| TaskId::parse(raw).ok())?;
                let draft = self.load_draft(&id)?;
                Some((id, draft))
            })
            .collect()
    }

    /// Drop the draft after a confirmed save.
    pub fn clear_draft(&self, id: &TaskId) {
        if let Err(error) = self.store.remove(&self.key(id)) {
            tracing::warn!("Failed to clear draft for {}: {}", id, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKeyValueStore;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn setup() -> (Arc<MemoryKeyValueStore>, DraftStore<MemoryKeyValueStore>) {
        let store = Arc::new(MemoryKeyValueStore::new());
        let drafts = DraftStore::new(Arc::clone(&store), "tasksync:draft:");
        (store, drafts)
    }

    fn sample_fields() -> TaskFields {
        TaskFields {
            title: "Write report".to_string(),
            description: "Draft text.".to_string(),
            due_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        }
    }

    #[test]
    fn test_save_and_load_draft() {
        let (_, drafts) = setup();
        let id = TaskId::parse("ENG-1").unwrap();

        assert!(drafts.save_draft(&id, &sample_fields()));
        let loaded = drafts.load_draft(&id).unwrap();
        assert_eq!(loaded.fields, sample_fields());
    }

    #[test]
    fn test_key_uses_prefix() {
        let (store, drafts) = setup();
        let id = TaskId::parse("ENG-1").unwrap();
        drafts.save_draft(&id, &sample_fields());

        assert!(store.get("tasksync:draft:ENG-1").unwrap().is_some());
    }

    #[test]
    fn test_clear_draft() {
        let (_, drafts) = setup();
        let id = TaskId::parse("ENG-1").unwrap();
        drafts.save_draft(&id, &sample_fields());

        drafts.clear_draft(&id);
        assert!(drafts.load_draft(&id).is_none());
    }

    #[test]
    fn test_write_failures_are_swallowed() {
        let (store, drafts) = setup();
        let id = TaskId::parse("ENG-1").unwrap();
        store.fail_writes(true);

        assert!(!drafts.save_draft(&id, &sample_fields()));
        drafts.clear_draft(&id);
        assert!(drafts.load_draft(&id).is_none());
    }

    #[test]
    fn test_pending_drafts_skip_foreign_keys() {
        let (store, drafts) = setup();
        let first = TaskId::parse("ENG-1").unwrap();
        let second = TaskId::parse("ENG-2").unwrap();
        drafts.save_draft(&first, &sample_fields());
        drafts.save_draft(&second, &sample_fields());
        store.put("tasksync:draft:not a key", "{}").unwrap();
        store.put("settings:theme", "dark").unwrap();

        let ids = drafts
            .pending_drafts()
            .into_iter()
            .map(|(id, _)| id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn test_corrupt_draft_is_ignored() {
        let (store, drafts) = setup();
        let id = TaskId::parse("ENG-1").unwrap();
        store.put(&drafts.key(&id), "not json").unwrap();

        assert!(drafts.load_draft(&id).is_none());
    }
}
