use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{ChangeListener, StorageBackend, StorageChange, WriterId};
use crate::errors::StorageError;
use crate::notify::{Emitter, Subscription};

/// Process-local backend. Several stores sharing one instance behave like several
/// windows over the same profile.
#[derive(Default)]
pub struct InMemoryStorage {
    values: Mutex<HashMap<String, String>>,
    changes: Emitter<StorageChange>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `value` as if another process had changed the profile.
    pub fn set_external(&self, key: &str, value: impl Into<String>) {
        self.write(key, value.into());
        self.changes.fire(&StorageChange { key: key.to_string(), writer: None });
    }

    /// Current raw value, bypassing the async interface.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    fn write(&self, key: &str, value: String) {
        self.values.lock().unwrap_or_else(PoisonError::into_inner).insert(key.to_string(), value);
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: String, writer: WriterId) -> Result<(), StorageError> {
        self.write(key, value);
        self.changes.fire(&StorageChange { key: key.to_string(), writer: Some(writer) });
        Ok(())
    }

    fn on_did_change_value(&self, key: &str, listener: ChangeListener) -> Subscription {
        let key = key.to_string();
        self.changes.subscribe(move |change| {
            if change.key == key {
                listener(change);
            }
        })
    }
}
