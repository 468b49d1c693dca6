//! Local durable key-value storage.
//!
//! Drafts are the only tenant today. Callers decide how to treat failures;
//! the draft layer swallows them.

mod migrations;
mod sqlite;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::{Error, Result};

pub use sqlite::SqliteKeyValueStore;

/// Trait for local key-value storage operations
pub trait KeyValueStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Delete `key`; deleting a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    /// Keys starting with `prefix`, most recently written first
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

/// In-process store, mainly for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, (u64, String)>>,
    writes: AtomicU64,
    fail_writes: AtomicBool,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `put`/`remove` fail, simulating a full or locked store.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(Error::Storage("store is read-only".to_string()))
        } else {
            Ok(())
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, (u64, String)>>> {
        self.entries
            .lock()
            .map_err(|error| Error::Storage(error.to_string()))
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.check_writable()?;
        let sequence = self.writes.fetch_add(1, Ordering::SeqCst);
        self.lock()?
            .insert(key.to_string(), (sequence, value.to_string()));
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).map(|(_, value)| value.clone()))
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.check_writable()?;
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self.lock()?;
        let mut matching = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, (sequence, _))| (*sequence, key.clone()))
            .collect::<Vec<_>>();
        matching.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        Ok(matching.into_iter().map(|(_, key)| key).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryKeyValueStore::new();
        store.put("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));

        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
        store.remove("a").unwrap();
    }

    #[test]
    fn test_memory_store_failing_writes() {
        let store = MemoryKeyValueStore::new();
        store.put("a", "1").unwrap();
        store.fail_writes(true);

        assert!(store.put("a", "2").is_err());
        assert!(store.remove("a").is_err());
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_memory_store_keys_newest_first() {
        let store = MemoryKeyValueStore::new();
        store.put("draft:ENG-1", "a").unwrap();
        store.put("other", "b").unwrap();
        store.put("draft:ENG-2", "c").unwrap();

        assert_eq!(
            store.keys_with_prefix("draft:").unwrap(),
            vec!["draft:ENG-2", "draft:ENG-1"]
        );
    }
}
