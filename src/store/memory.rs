//! In-memory store

use super::{DeleteOutcome, SecureStore};
use crate::bundle::Identity;
use crate::error::StoreError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Identities held in a process-local map. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Identity>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored identities.
    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Identity>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl SecureStore for MemoryStore {
    fn add(&self, label: &str, identity: &Identity) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        if entries.contains_key(label) {
            return Err(StoreError::Duplicate(label.to_string()));
        }
        entries.insert(label.to_string(), identity.clone());
        Ok(())
    }

    fn query(&self, label: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self.lock()?.get(label).cloned())
    }

    fn delete(&self, label: &str) -> Result<DeleteOutcome, StoreError> {
        Ok(match self.lock()?.remove(label) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }
}
