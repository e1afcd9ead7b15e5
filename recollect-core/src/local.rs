use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::SystemTime;

use crate::entry::Entry;

/// In-process history backend
///
/// A map from tracked value to its [`Entry`], guarded by one mutex per store.
/// Every operation takes the lock for the duration of its map access only and
/// never calls another operation while holding it. All operations are O(1)
/// except [`LocalStore::purge_before`], which scans the whole map.
#[derive(Debug, Default)]
pub struct LocalStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl LocalStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` at `recorded_at`, overwriting any previous instant
    pub fn insert(&self, value: &str, recorded_at: SystemTime) {
        self.entries.lock().insert(value.to_string(), Entry::new(recorded_at));
    }

    /// Returns the recorded instant for `value`, ignoring staleness
    pub fn recorded_at(&self, value: &str) -> Option<SystemTime> {
        self.entries.lock().get(value).map(Entry::recorded_at)
    }

    /// Checks if `value` is present and recorded at or after `cutoff`
    pub fn contains_since(&self, value: &str, cutoff: SystemTime) -> bool {
        self.entries
            .lock()
            .get(value)
            .is_some_and(|entry| entry.is_live(cutoff))
    }

    /// Removes `value`. Returns `true` if it was present.
    pub fn remove(&self, value: &str) -> bool {
        self.entries.lock().remove(value).is_some()
    }

    /// Removes every entry recorded strictly before `cutoff`.
    ///
    /// Returns the number of entries removed.
    pub fn purge_before(&self, cutoff: SystemTime) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(cutoff));
        before - entries.len()
    }

    /// Returns the number of entries (including stale ones)
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
