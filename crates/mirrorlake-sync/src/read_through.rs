//! Read-through query layer
//!
//! Callers get the current cached rows immediately, never waiting on the
//! network; a background sync is spawned per call and its (re-read) result
//! is published on a `watch` channel. Concurrent subscribers to the same
//! scope share one remote fetch: the suppressed tasks wait for the winning
//! sync to release the scope, then re-read and publish independently. A
//! failed refresh keeps the stale rows and is only logged.
//!
//! With caching disabled the layer degrades to direct remote fetches: no
//! cache reads, no cache writes, no background work.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use mirrorlake_cache::CacheRepository;
use mirrorlake_core::domain::{BucketRecord, ObjectRecord, Scope};
use mirrorlake_core::ports::IObjectStoreClient;

use crate::coordinator::{SyncCoordinator, SyncOutcome};
use crate::SyncError;

/// Rows served now, plus an optional channel that yields the refreshed rows
/// once the background sync lands
pub struct ReadResult<T> {
    pub rows: Vec<T>,
    /// `None` when caching is disabled (the rows are already fresh)
    pub refresh: Option<watch::Receiver<Vec<T>>>,
}

/// Cache-first reads with background refresh
pub struct ReadThrough {
    client: Arc<dyn IObjectStoreClient>,
    repo: Arc<CacheRepository>,
    coordinator: Arc<SyncCoordinator>,
    cache_enabled: bool,
}

impl ReadThrough {
    pub fn new(
        client: Arc<dyn IObjectStoreClient>,
        repo: Arc<CacheRepository>,
        coordinator: Arc<SyncCoordinator>,
        cache_enabled: bool,
    ) -> Self {
        Self {
            client,
            repo,
            coordinator,
            cache_enabled,
        }
    }

    /// Buckets of a profile: cached rows now, refreshed rows on the channel
    pub async fn buckets(&self, profile_id: i64) -> Result<ReadResult<BucketRecord>, SyncError> {
        if !self.cache_enabled {
            let remote =
                self.client
                    .list_buckets()
                    .await
                    .map_err(|err| SyncError::RemoteFetch {
                        scope: format!("profile-{profile_id}"),
                        source: err,
                    })?;
            return Ok(ReadResult {
                rows: remote.into_iter().map(Into::into).collect(),
                refresh: None,
            });
        }

        let cached =
            self.repo
                .list_buckets(profile_id)
                .await
                .map_err(|err| SyncError::Persistence {
                    scope: format!("profile-{profile_id}"),
                    source: err,
                })?;

        let (tx, rx) = watch::channel(cached.clone());
        let coordinator = self.coordinator.clone();
        let repo = self.repo.clone();
        tokio::spawn(async move {
            match coordinator.sync_buckets(profile_id).await {
                Ok(outcome) => {
                    // A suppressed call shares the winning sync; re-read
                    // only once that sync has released the scope
                    if outcome == SyncOutcome::AlreadyInProgress {
                        coordinator.wait_until_idle(&Scope::profile(profile_id)).await;
                    }
                    match repo.list_buckets(profile_id).await {
                        Ok(rows) => {
                            let _ = tx.send(rows);
                        }
                        Err(err) => {
                            warn!(profile_id, error = %err, "Re-read after bucket sync failed");
                        }
                    }
                }
                Err(err) => {
                    warn!(profile_id, error = %err, "Background bucket refresh failed, serving cached rows");
                }
            }
        });

        Ok(ReadResult {
            rows: cached,
            refresh: Some(rx),
        })
    }

    /// Objects of one listing scope: cached rows now, refreshed rows on the
    /// channel
    pub async fn objects(
        &self,
        profile_id: i64,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<ReadResult<ObjectRecord>, SyncError> {
        if !self.cache_enabled {
            let remote = self
                .client
                .list_objects(bucket, prefix)
                .await
                .map_err(|err| SyncError::RemoteFetch {
                    scope: format!("profile-{profile_id}-bucket-{bucket}"),
                    source: err,
                })?;
            return Ok(ReadResult {
                rows: remote.into_iter().map(Into::into).collect(),
                refresh: None,
            });
        }

        let cached = self
            .repo
            .list_objects(profile_id, bucket, prefix)
            .await
            .map_err(|err| SyncError::Persistence {
                scope: format!("profile-{profile_id}-bucket-{bucket}"),
                source: err,
            })?;

        let (tx, rx) = watch::channel(cached.clone());
        let coordinator = self.coordinator.clone();
        let repo = self.repo.clone();
        let bucket_owned = bucket.to_string();
        let prefix_owned = prefix.map(str::to_string);
        tokio::spawn(async move {
            let prefix = prefix_owned.as_deref();
            match coordinator
                .sync_objects(profile_id, &bucket_owned, prefix)
                .await
            {
                Ok(outcome) => {
                    if outcome == SyncOutcome::AlreadyInProgress {
                        let scope = match prefix {
                            Some(p) => Scope::prefixed(profile_id, &bucket_owned, p),
                            None => Scope::bucket(profile_id, &bucket_owned),
                        };
                        coordinator.wait_until_idle(&scope).await;
                    }
                    match repo.list_objects(profile_id, &bucket_owned, prefix).await {
                        Ok(rows) => {
                            let _ = tx.send(rows);
                        }
                        Err(err) => {
                            warn!(
                                profile_id,
                                bucket = %bucket_owned,
                                error = %err,
                                "Re-read after object sync failed"
                            );
                        }
                    }
                }
                Err(err) => {
                    warn!(
                        profile_id,
                        bucket = %bucket_owned,
                        error = %err,
                        "Background object refresh failed, serving cached rows"
                    );
                }
            }
        });

        Ok(ReadResult {
            rows: cached,
            refresh: Some(rx),
        })
    }
}
