//! store::memory
//!
//! In-memory store implementation for deterministic testing.
//!
//! # Design
//!
//! A shared map guarded by a mutex, with a per-key version counter standing
//! in for Redis's watched-key change detection. `Clone` produces a new
//! handle over the same data with its own (empty) watch state, so two
//! `Lock` instances built on clones contend exactly the way two processes
//! contend on one Redis: the data races, the watches don't.
//!
//! A one-shot failure can be injected to exercise store-error propagation
//! through the lock layer.
//!
//! # Example
//!
//! ```
//! use relock::store::{MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! let mut writer = store.clone();
//! let mut reader = store.clone();
//!
//! writer.set("greeting", "hello")?;
//! assert_eq!(reader.get("greeting")?, Some("hello".to_string()));
//! # Ok::<(), relock::StoreError>(())
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::traits::{Store, StoreError};

/// Shared state behind every handle.
#[derive(Debug, Default)]
struct Shared {
    /// Current values by key.
    entries: HashMap<String, String>,
    /// Modification counter per key; bumped on every write or delete.
    versions: HashMap<String, u64>,
    /// Error returned by the next store call, if injected.
    fail_next: Option<StoreError>,
}

impl Shared {
    fn version(&self, key: &str) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    fn bump(&mut self, key: &str) {
        *self.versions.entry(key.to_string()).or_insert(0) += 1;
    }

    fn take_fault(&mut self) -> Result<(), StoreError> {
        match self.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// In-memory store for tests.
///
/// Cloning shares the data but not the watch state.
#[derive(Debug)]
pub struct MemoryStore {
    shared: Arc<Mutex<Shared>>,
    /// Versions snapshotted at `watch` time, keyed by watched key.
    watched: Option<HashMap<String, u64>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared::default())),
            watched: None,
        }
    }

    /// Make the next store call (on any handle) fail with `err`.
    pub fn fail_next(&self, err: StoreError) {
        self.shared.lock().unwrap().fail_next = Some(err);
    }

    /// Test inspection: the current value of `key`, bypassing fault injection.
    pub fn value(&self, key: &str) -> Option<String> {
        self.shared.lock().unwrap().entries.get(key).cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            watched: None,
        }
    }
}

impl Store for MemoryStore {
    fn get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        let mut shared = self.shared.lock().unwrap();
        shared.take_fault()?;
        Ok(shared.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut shared = self.shared.lock().unwrap();
        shared.take_fault()?;
        shared.entries.insert(key.to_string(), value.to_string());
        shared.bump(key);
        Ok(())
    }

    fn set_if_all_absent(&mut self, entries: &[(&str, &str)]) -> Result<bool, StoreError> {
        let mut shared = self.shared.lock().unwrap();
        shared.take_fault()?;
        if entries.iter().any(|(key, _)| shared.entries.contains_key(*key)) {
            return Ok(false);
        }
        for (key, value) in entries {
            shared.entries.insert(key.to_string(), value.to_string());
            shared.bump(key);
        }
        Ok(true)
    }

    fn watch(&mut self, keys: &[&str]) -> Result<(), StoreError> {
        let mut shared = self.shared.lock().unwrap();
        shared.take_fault()?;
        let snapshot = keys
            .iter()
            .map(|key| (key.to_string(), shared.version(key)))
            .collect();
        self.watched = Some(snapshot);
        Ok(())
    }

    fn unwatch(&mut self) -> Result<(), StoreError> {
        self.shared.lock().unwrap().take_fault()?;
        self.watched = None;
        Ok(())
    }

    fn delete_if_unchanged(&mut self, keys: &[&str]) -> Result<bool, StoreError> {
        let mut shared = self.shared.lock().unwrap();
        shared.take_fault()?;
        // The watch is consumed whether the transaction commits or aborts.
        if let Some(snapshot) = self.watched.take() {
            let changed = snapshot
                .iter()
                .any(|(key, version)| shared.version(key) != *version);
            if changed {
                return Ok(false);
            }
        }
        for key in keys {
            if shared.entries.remove(*key).is_some() {
                shared.bump(key);
            }
        }
        Ok(true)
    }
}
