//! Profile-scoped key-value storage on SQLite.
//!
//! Other processes sharing the database file are observed by polling the per-key
//! `revision` column; see [`SqliteProfileStorage::poll_external_changes`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use signoff_core::errors::StorageError;
use signoff_core::notify::{Emitter, Subscription};
use signoff_core::storage::{ChangeListener, StorageBackend, StorageChange, WriterId};

use crate::DbPool;

pub struct SqliteProfileStorage {
    pool: DbPool,
    profile: String,
    /// Last revision seen per key, by our own writes or by polling.
    revisions: Mutex<HashMap<String, i64>>,
    changes: Emitter<StorageChange>,
}

impl SqliteProfileStorage {
    /// Opens `profile`, taking the revisions currently on disk as already seen.
    pub async fn open(pool: DbPool, profile: impl Into<String>) -> Result<Self, StorageError> {
        let profile = profile.into();
        let revisions = load_revisions(&pool, &profile).await?;
        debug!(
            event_name = "storage.sqlite.opened",
            profile = %profile,
            keys = revisions.len(),
            "profile storage opened"
        );

        Ok(Self { pool, profile, revisions: Mutex::new(revisions), changes: Emitter::new() })
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Announces every key another process changed since the last poll. Returns how
    /// many keys changed.
    pub async fn poll_external_changes(&self) -> Result<usize, StorageError> {
        let changed = {
            let mut known = self.revisions.lock().await;
            let current = load_revisions(&self.pool, &self.profile).await?;

            let mut changed = Vec::new();
            for (key, revision) in current {
                let previous = known.get(&key).copied().unwrap_or(0);
                if revision > previous {
                    known.insert(key.clone(), revision);
                    changed.push(key);
                }
            }
            changed
        };

        for key in &changed {
            debug!(
                event_name = "storage.sqlite.external_change",
                profile = %self.profile,
                key = %key,
                "value changed by another process"
            );
            self.changes.fire(&StorageChange { key: key.clone(), writer: None });
        }

        Ok(changed.len())
    }

    /// Polls for external changes every `every` until the storage is dropped.
    pub fn spawn_watcher(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(storage) = weak.upgrade() else {
                    break;
                };
                if let Err(error) = storage.poll_external_changes().await {
                    warn!(
                        event_name = "storage.sqlite.poll_failed",
                        profile = %storage.profile,
                        error = %error,
                        "polling for external changes failed"
                    );
                }
            }

            debug!(event_name = "storage.sqlite.watcher_stopped", "storage watcher stopped");
        })
    }
}

#[async_trait]
impl StorageBackend for SqliteProfileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM profile_storage WHERE profile = ? AND key = ?")
            .bind(&self.profile)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| StorageError::Unavailable(error.to_string()))?;

        row.map(|row| row.try_get::<String, _>("value"))
            .transpose()
            .map_err(|error| StorageError::Unavailable(error.to_string()))
    }

    async fn set(&self, key: &str, value: String, writer: WriterId) -> Result<(), StorageError> {
        {
            let mut known = self.revisions.lock().await;
            let revision: i64 = sqlx::query_scalar(
                "INSERT INTO profile_storage (profile, key, value, revision, updated_at)
                 VALUES (?, ?, ?, 1, ?)
                 ON CONFLICT(profile, key) DO UPDATE SET
                     value = excluded.value,
                     revision = profile_storage.revision + 1,
                     updated_at = excluded.updated_at
                 RETURNING revision",
            )
            .bind(&self.profile)
            .bind(key)
            .bind(&value)
            .bind(Utc::now().to_rfc3339())
            .fetch_one(&self.pool)
            .await
            .map_err(|error| StorageError::Write {
                key: key.to_string(),
                message: error.to_string(),
            })?;

            known.insert(key.to_string(), revision);
        }

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

async fn load_revisions(
    pool: &DbPool,
    profile: &str,
) -> Result<HashMap<String, i64>, StorageError> {
    let rows = sqlx::query("SELECT key, revision FROM profile_storage WHERE profile = ?")
        .bind(profile)
        .fetch_all(pool)
        .await
        .map_err(|error| StorageError::Unavailable(error.to_string()))?;

    rows.iter()
        .map(|row| Ok((row.try_get::<String, _>("key")?, row.try_get::<i64, _>("revision")?)))
        .collect::<Result<HashMap<_, _>, sqlx::Error>>()
        .map_err(|error| StorageError::Unavailable(error.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use signoff_core::notify::Subscription;
    use signoff_core::storage::{StorageBackend, StorageChange, WriterId};
    use tempfile::TempDir;

    use super::SqliteProfileStorage;
    use crate::{connect_with_settings, migrations::run_pending, DbPool};

    async fn file_pool(dir: &TempDir) -> DbPool {
        let url = format!("sqlite://{}", dir.path().join("signoff.db").display());
        let pool = connect_with_settings(&url, 2, 5).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        pool
    }

    fn counter(storage: &SqliteProfileStorage, key: &str) -> (Arc<AtomicUsize>, Subscription) {
        let count = Arc::new(AtomicUsize::new(0));
        let sink = count.clone();
        let subscription = storage.on_did_change_value(
            key,
            Box::new(move |_: &StorageChange| {
                sink.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (count, subscription)
    }

    #[tokio::test]
    async fn set_then_get_round_trips_and_bumps_revision() {
        let dir = TempDir::new().expect("tempdir");
        let storage = SqliteProfileStorage::open(file_pool(&dir).await, "default")
            .await
            .expect("open");
        let writer = WriterId::next();

        assert_eq!(storage.get("k").await, Ok(None));
        storage.set("k", "one".to_string(), writer).await.expect("first set");
        storage.set("k", "two".to_string(), writer).await.expect("second set");

        assert_eq!(storage.get("k").await, Ok(Some("two".to_string())));
        assert_eq!(storage.poll_external_changes().await, Ok(0));
    }

    #[tokio::test]
    async fn profiles_sharing_a_database_are_isolated() {
        let dir = TempDir::new().expect("tempdir");
        let pool = file_pool(&dir).await;
        let alpha = SqliteProfileStorage::open(pool.clone(), "alpha").await.expect("alpha");
        let beta = SqliteProfileStorage::open(pool, "beta").await.expect("beta");
        let (beta_changes, _subscription) = counter(&beta, "k");

        alpha.set("k", "from alpha".to_string(), WriterId::next()).await.expect("set");

        assert_eq!(beta.get("k").await, Ok(None));
        assert_eq!(beta.poll_external_changes().await, Ok(0));
        assert_eq!(beta_changes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn polling_reports_writes_from_another_connection_once() {
        let dir = TempDir::new().expect("tempdir");
        let here = SqliteProfileStorage::open(file_pool(&dir).await, "default")
            .await
            .expect("open here");
        let there = SqliteProfileStorage::open(file_pool(&dir).await, "default")
            .await
            .expect("open there");
        let (seen, _subscription) = counter(&here, "k");

        there.set("k", "elsewhere".to_string(), WriterId::next()).await.expect("set");

        assert_eq!(here.poll_external_changes().await, Ok(1));
        assert_eq!(here.poll_external_changes().await, Ok(0));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(here.get("k").await, Ok(Some("elsewhere".to_string())));
    }

    #[tokio::test]
    async fn existing_rows_are_the_baseline_when_opening() {
        let dir = TempDir::new().expect("tempdir");
        let pool = file_pool(&dir).await;
        let first = SqliteProfileStorage::open(pool.clone(), "default").await.expect("first");
        first.set("k", "v".to_string(), WriterId::next()).await.expect("set");

        let second = SqliteProfileStorage::open(pool, "default").await.expect("second");
        assert_eq!(second.poll_external_changes().await, Ok(0));
    }

    #[tokio::test]
    async fn watcher_delivers_external_changes_and_stops_on_drop() {
        let dir = TempDir::new().expect("tempdir");
        let watched = Arc::new(
            SqliteProfileStorage::open(file_pool(&dir).await, "default")
                .await
                .expect("open watched"),
        );
        let writer = SqliteProfileStorage::open(file_pool(&dir).await, "default")
            .await
            .expect("open writer");

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let _subscription = watched.on_did_change_value(
            "k",
            Box::new(move |change: &StorageChange| {
                let _ = tx.send(change.writer);
            }),
        );
        let handle = watched.spawn_watcher(Duration::from_millis(50));

        writer.set("k", "v".to_string(), WriterId::next()).await.expect("set");

        let writer_seen = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("change should arrive before the timeout");
        assert_eq!(writer_seen, Some(None));

        drop(watched);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("watcher should stop once the storage is dropped")
            .expect("watcher task should not panic");
    }
}
