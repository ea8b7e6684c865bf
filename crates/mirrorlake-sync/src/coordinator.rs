//! Per-scope sync coordination
//!
//! The [`SyncCoordinator`] reconciles one cache scope at a time against the
//! remote store:
//!
//! 1. Validate the scope, then claim it in the in-memory active-set. A
//!    scope already claimed means a sync is running; the duplicate call
//!    returns immediately without fetching anything.
//! 2. Record `Syncing` in the durable sync metadata.
//! 3. Fetch the authoritative listing from the remote client.
//! 4. Atomically replace the scope's cached rows.
//! 5. Record the terminal status (`Completed`, or `Error` with a message).
//!
//! The active-set claim is held by an RAII guard, so the scope is released
//! on every exit path including fetch and persistence failures. Releasing
//! also wakes anyone waiting in [`SyncCoordinator::wait_until_idle`], which
//! is how suppressed callers observe the winning sync's completion.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use mirrorlake_cache::CacheRepository;
use mirrorlake_core::domain::{BucketRecord, ObjectRecord, Scope, SyncMetadata, SyncStatus};
use mirrorlake_core::ports::IObjectStoreClient;

use crate::SyncError;

/// Progress callback invoked at the start and terminal transition of a sync,
/// with the status and the scope key
pub type ProgressFn = Arc<dyn Fn(SyncStatus, &str) + Send + Sync>;

/// What a sync call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The scope was fetched and its cache replaced with `rows` entries
    Synced { rows: usize },
    /// Another sync already holds this scope; nothing was fetched
    AlreadyInProgress,
}

/// Releases the active-set claim when dropped and wakes waiters
struct ActiveGuard {
    active: Arc<DashMap<Scope, Arc<Notify>>>,
    scope: Scope,
    notify: Arc<Notify>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        // Remove before notifying so a woken waiter sees the scope as idle
        self.active.remove(&self.scope);
        self.notify.notify_waiters();
    }
}

/// Orchestrates cache synchronization, one scope at a time
///
/// The active-set is keyed on the [`Scope`] value itself rather than its
/// string key, so scopes whose display keys happen to collide can never
/// suppress each other.
pub struct SyncCoordinator {
    client: Arc<dyn IObjectStoreClient>,
    repo: Arc<CacheRepository>,
    active: Arc<DashMap<Scope, Arc<Notify>>>,
    progress: Option<ProgressFn>,
}

impl SyncCoordinator {
    pub fn new(client: Arc<dyn IObjectStoreClient>, repo: Arc<CacheRepository>) -> Self {
        Self {
            client,
            repo,
            active: Arc::new(DashMap::new()),
            progress: None,
        }
    }

    /// Installs a progress callback
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Synchronizes the bucket list of a profile
    ///
    /// Returns [`SyncOutcome::AlreadyInProgress`] without touching the
    /// remote when another sync currently holds the profile scope.
    pub async fn sync_buckets(&self, profile_id: i64) -> Result<SyncOutcome, SyncError> {
        let scope = Scope::profile(profile_id);
        scope.validate()?;

        let Some(_guard) = self.try_claim(&scope) else {
            debug!(scope = %scope, "Sync already in progress, skipping");
            return Ok(SyncOutcome::AlreadyInProgress);
        };

        self.mark(&scope, SyncStatus::Syncing, None).await?;
        self.emit(SyncStatus::Syncing, &scope);

        let remote = match self.client.list_buckets().await {
            Ok(remote) => remote,
            Err(err) => return Err(self.fetch_failed(&scope, err).await),
        };
        let records: Vec<BucketRecord> = remote.into_iter().map(Into::into).collect();
        let rows = records.len();

        if let Err(err) = self.repo.replace_buckets(profile_id, &records).await {
            return Err(self.persist_failed(&scope, err).await);
        }

        self.mark(&scope, SyncStatus::Completed, None).await?;
        self.emit(SyncStatus::Completed, &scope);
        info!(scope = %scope, rows, "Bucket sync completed");
        Ok(SyncOutcome::Synced { rows })
    }

    /// Synchronizes one object listing scope (bucket root or one prefix)
    pub async fn sync_objects(
        &self,
        profile_id: i64,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<SyncOutcome, SyncError> {
        let scope = match prefix {
            Some(p) => Scope::prefixed(profile_id, bucket, p),
            None => Scope::bucket(profile_id, bucket),
        };
        scope.validate()?;

        let Some(_guard) = self.try_claim(&scope) else {
            debug!(scope = %scope, "Sync already in progress, skipping");
            return Ok(SyncOutcome::AlreadyInProgress);
        };

        self.mark(&scope, SyncStatus::Syncing, None).await?;
        self.emit(SyncStatus::Syncing, &scope);

        let remote = match self.client.list_objects(bucket, prefix).await {
            Ok(remote) => remote,
            Err(err) => return Err(self.fetch_failed(&scope, err).await),
        };
        let records: Vec<ObjectRecord> = remote.into_iter().map(Into::into).collect();
        let rows = records.len();

        if let Err(err) = self
            .repo
            .replace_objects(profile_id, bucket, &records, prefix)
            .await
        {
            return Err(self.persist_failed(&scope, err).await);
        }

        self.mark(&scope, SyncStatus::Completed, None).await?;
        self.emit(SyncStatus::Completed, &scope);
        info!(scope = %scope, rows, "Object sync completed");
        Ok(SyncOutcome::Synced { rows })
    }

    /// Clears the profile's bucket cache, then syncs it from the remote
    pub async fn force_refresh_buckets(&self, profile_id: i64) -> Result<SyncOutcome, SyncError> {
        let scope = Scope::profile(profile_id);
        scope.validate()?;
        self.repo
            .clear_buckets(profile_id)
            .await
            .map_err(|err| SyncError::Persistence {
                scope: scope.key(),
                source: err,
            })?;
        self.sync_buckets(profile_id).await
    }

    /// Clears one object scope, then syncs it from the remote
    pub async fn force_refresh_objects(
        &self,
        profile_id: i64,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<SyncOutcome, SyncError> {
        let scope = match prefix {
            Some(p) => Scope::prefixed(profile_id, bucket, p),
            None => Scope::bucket(profile_id, bucket),
        };
        scope.validate()?;
        self.repo
            .clear_objects(profile_id, bucket, prefix)
            .await
            .map_err(|err| SyncError::Persistence {
                scope: scope.key(),
                source: err,
            })?;
        self.sync_objects(profile_id, bucket, prefix).await
    }

    /// Whether a sync currently holds the given scope
    pub fn is_sync_in_progress(&self, scope: &Scope) -> bool {
        self.active.contains_key(scope)
    }

    /// Waits until no sync holds the scope
    ///
    /// Returns immediately when the scope is idle. Callers that received
    /// [`SyncOutcome::AlreadyInProgress`] use this to observe the winning
    /// sync's completion before re-reading the cache.
    pub async fn wait_until_idle(&self, scope: &Scope) {
        let notify = match self.active.get(scope) {
            Some(entry) => entry.value().clone(),
            None => return,
        };
        let notified = notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        // The guard may have dropped between the lookup and registration;
        // re-check so a missed wakeup cannot strand us
        if !self.active.contains_key(scope) {
            return;
        }
        notified.await;
    }

    /// Durable sync metadata for a scope, `None` if never synced
    pub async fn sync_status(&self, scope: &Scope) -> Result<Option<SyncMetadata>, SyncError> {
        self.repo
            .get_sync_metadata(scope)
            .await
            .map_err(|err| SyncError::Persistence {
                scope: scope.key(),
                source: err,
            })
    }

    /// When the scope was last touched by a sync, `None` if never synced
    pub async fn last_sync_time(
        &self,
        scope: &Scope,
    ) -> Result<Option<DateTime<Utc>>, SyncError> {
        Ok(self.sync_status(scope).await?.and_then(|m| m.last_sync_at))
    }

    // --- Internals ---

    fn try_claim(&self, scope: &Scope) -> Option<ActiveGuard> {
        match self.active.entry(scope.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(vacant) => {
                let notify = Arc::new(Notify::new());
                vacant.insert(notify.clone());
                Some(ActiveGuard {
                    active: self.active.clone(),
                    scope: scope.clone(),
                    notify,
                })
            }
        }
    }

    async fn mark(
        &self,
        scope: &Scope,
        status: SyncStatus,
        message: Option<&str>,
    ) -> Result<(), SyncError> {
        self.repo
            .upsert_sync_metadata(scope, status, message)
            .await
            .map_err(|err| SyncError::Persistence {
                scope: scope.key(),
                source: err,
            })
    }

    /// Records the error status. Best effort: a failure to record must not
    /// mask the original sync error.
    async fn mark_error(&self, scope: &Scope, message: &str) {
        if let Err(err) = self
            .repo
            .upsert_sync_metadata(scope, SyncStatus::Error, Some(message))
            .await
        {
            warn!(scope = %scope, error = %err, "Failed to record sync error status");
        }
    }

    async fn fetch_failed(&self, scope: &Scope, err: anyhow::Error) -> SyncError {
        let message = format!("{err:#}");
        warn!(scope = %scope, error = %message, "Remote fetch failed");
        self.mark_error(scope, &message).await;
        self.emit(SyncStatus::Error, scope);
        SyncError::RemoteFetch {
            scope: scope.key(),
            source: err,
        }
    }

    async fn persist_failed(&self, scope: &Scope, err: anyhow::Error) -> SyncError {
        let message = format!("{err:#}");
        warn!(scope = %scope, error = %message, "Cache replace failed");
        self.mark_error(scope, &message).await;
        self.emit(SyncStatus::Error, scope);
        SyncError::Persistence {
            scope: scope.key(),
            source: err,
        }
    }

    fn emit(&self, status: SyncStatus, scope: &Scope) {
        if let Some(progress) = &self.progress {
            progress(status, &scope.key());
        }
    }
}
