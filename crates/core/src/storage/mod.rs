//! Durable key-value seam the approval store persists through.
//!
//! A backend is scoped to a single profile: every key it exposes belongs to that
//! profile and is never visible from another one.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::errors::StorageError;
use crate::notify::Subscription;

pub mod memory;

pub use memory::InMemoryStorage;

/// Key under which the full approval list is stored as one JSON array.
pub const APPROVALS_STORAGE_KEY: &str = "signoff.approvals.items";

static NEXT_WRITER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one writer within this process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WriterId(u64);

impl WriterId {
    pub fn next() -> Self {
        Self(NEXT_WRITER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageChange {
    pub key: String,
    /// `None` when the write happened outside this process.
    pub writer: Option<WriterId>,
}

impl StorageChange {
    pub fn is_external_to(&self, writer: WriterId) -> bool {
        self.writer != Some(writer)
    }
}

pub type ChangeListener = Box<dyn Fn(&StorageChange) + Send + Sync>;

#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: String, writer: WriterId) -> Result<(), StorageError>;

    /// Registers `listener` for every change to `key`, whether written through this
    /// backend instance or detected from another process.
    fn on_did_change_value(&self, key: &str, listener: ChangeListener) -> Subscription;
}
