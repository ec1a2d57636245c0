use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{Entry, Result};

/// Session-scoped cache of entries keyed by real path.
///
/// Lookups hand out clones, so callers never hold the lock while probing the
/// filesystem. Two requested paths with the same real path share one slot.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Mutex<HashMap<PathBuf, Entry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached entry for `path`, resolving and caching it on a miss.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<Entry> {
        let entry = Entry::open(path)?;
        let mut entries = self.lock();
        Ok(entries
            .entry(entry.path().to_path_buf())
            .or_insert(entry)
            .clone())
    }

    pub fn get(&self, real: &Path) -> Option<Entry> {
        self.lock().get(real).cloned()
    }

    /// Replaces the cached copy, e.g. after a mutation re-derived its fields.
    pub fn store(&self, entry: &Entry) {
        self.lock().insert(entry.path().to_path_buf(), entry.clone());
    }

    pub fn forget(&self, real: &Path) -> Option<Entry> {
        self.lock().remove(real)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
