//! Authoritative owner of the persisted approval list.
//!
//! Every mutation reads the full list from the backend, transforms it in memory and
//! writes it back as one value before observers are notified. Observers carry no
//! payload and always re-read through [`ApprovalStore::list`].

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::approval::{ApprovalId, ApprovalItem, ApprovalStatus};
use crate::errors::{ApplicationError, DomainError};
use crate::notify::{Emitter, Subscription};
use crate::storage::{StorageBackend, StorageChange, WriterId, APPROVALS_STORAGE_KEY};

pub struct ApprovalStore {
    backend: Arc<dyn StorageBackend>,
    writer: WriterId,
    write_lock: Mutex<()>,
    changed: Arc<Emitter<()>>,
    _backend_subscription: Subscription,
}

impl ApprovalStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        let writer = WriterId::next();
        let changed = Arc::new(Emitter::new());

        // Writes from other stores or other processes arrive through the backend;
        // our own writes are announced directly after they land.
        let rebroadcast = Arc::clone(&changed);
        let backend_subscription = backend.on_did_change_value(
            APPROVALS_STORAGE_KEY,
            Box::new(move |change: &StorageChange| {
                if change.is_external_to(writer) {
                    debug!(
                        event_name = "approvals.store.external_change",
                        key = %change.key,
                        same_process = change.writer.is_some(),
                        "approval list changed outside this store"
                    );
                    rebroadcast.fire(&());
                }
            }),
        );

        Self {
            backend,
            writer,
            write_lock: Mutex::new(()),
            changed,
            _backend_subscription: backend_subscription,
        }
    }

    /// Registers `listener` to run after every change to the approval list.
    pub fn on_did_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.changed.subscribe(move |_| listener())
    }

    /// Current list, newest first. Missing or malformed data reads as empty.
    pub async fn list(&self) -> Result<Vec<ApprovalItem>, ApplicationError> {
        let raw = self.backend.get(APPROVALS_STORAGE_KEY).await?;
        Ok(decode_items(raw.as_deref()))
    }

    pub async fn find(&self, id: &ApprovalId) -> Result<Option<ApprovalItem>, ApplicationError> {
        Ok(self.list().await?.into_iter().find(|item| &item.id == id))
    }

    pub async fn add(
        &self,
        title: &str,
        details: Option<&str>,
    ) -> Result<ApprovalItem, ApplicationError> {
        let mut item = ApprovalItem::new_pending(title, details, Utc::now())?;

        let _guard = self.write_lock.lock().await;
        let mut items = self.list().await?;
        while items.iter().any(|existing| existing.id == item.id) {
            item.id = ApprovalId::generate(item.created_at);
        }
        items.insert(0, item.clone());
        self.persist(&items).await?;

        info!(
            event_name = "approvals.store.added",
            approval_id = %item.id,
            total = items.len(),
            "approval requested"
        );
        self.changed.fire(&());
        Ok(item)
    }

    /// Records a decision for `id`.
    ///
    /// Returns `None` when no item has that id (it may have been cleared from another
    /// surface); nothing is written and nobody is notified in that case. Re-applying
    /// the status an item already has is also a silent no-op.
    pub async fn set_status(
        &self,
        id: &ApprovalId,
        status: ApprovalStatus,
    ) -> Result<Option<ApprovalItem>, ApplicationError> {
        if status == ApprovalStatus::Pending {
            return Err(DomainError::InvalidArgument(
                "approval status cannot be set back to `pending`".to_string(),
            )
            .into());
        }

        let _guard = self.write_lock.lock().await;
        let mut items = self.list().await?;
        let Some(index) = items.iter().position(|item| &item.id == id) else {
            debug!(
                event_name = "approvals.store.unknown_id",
                approval_id = %id,
                "status update ignored for unknown approval"
            );
            return Ok(None);
        };

        let current = items[index].status;
        let next = current.transition_to(status)?;
        if next == current {
            return Ok(Some(items[index].clone()));
        }

        items[index].status = next;
        let updated = items[index].clone();
        self.persist(&items).await?;

        info!(
            event_name = "approvals.store.status_changed",
            approval_id = %id,
            from = %current,
            to = %next,
            "approval decided"
        );
        self.changed.fire(&());
        Ok(Some(updated))
    }

    /// Empties the list. Observers are notified even when it was already empty.
    pub async fn clear(&self) -> Result<(), ApplicationError> {
        let _guard = self.write_lock.lock().await;
        self.persist(&[]).await?;

        info!(event_name = "approvals.store.cleared", "approval list cleared");
        self.changed.fire(&());
        Ok(())
    }

    async fn persist(&self, items: &[ApprovalItem]) -> Result<(), ApplicationError> {
        let encoded = serde_json::to_string(items)
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;
        self.backend.set(APPROVALS_STORAGE_KEY, encoded, self.writer).await?;
        Ok(())
    }
}

fn decode_items(raw: Option<&str>) -> Vec<ApprovalItem> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    match serde_json::from_str::<Vec<ApprovalItem>>(raw) {
        Ok(items) => items,
        Err(error) => {
            warn!(
                event_name = "approvals.store.malformed_blob",
                key = APPROVALS_STORAGE_KEY,
                error = %error,
                "stored approval list is unreadable; treating it as empty"
            );
            Vec::new()
        }
    }
}
