//! Cache repository: the single front door to the persistence adapter
//!
//! All reads and writes from the rest of the system go through
//! [`CacheRepository`]. It delegates storage to whichever
//! `IPersistenceAdapter` backend was configured and adds a short-lived
//! memo cache over the three search operations, so repeated identical
//! searches (debounced keystrokes land in bursts) hit the backend once.
//!
//! Memoized entries expire after [`SEARCH_CACHE_TTL`] and are proactively
//! dropped whenever a write through this repository touches rows the
//! entry was computed from. Writes that go around the repository,
//! straight to the adapter, are only visible after the TTL lapses.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use mirrorlake_core::domain::{
    BucketRecord, ConnectionProfile, NewProfile, ObjectMatch, ObjectRecord, Scope, SyncMetadata,
    SyncStatus,
};
use mirrorlake_core::ports::{IPersistenceAdapter, StoreStats};

/// How long a memoized search result stays valid
pub const SEARCH_CACHE_TTL: Duration = Duration::from_secs(5);

/// Which search operation a memo entry belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SearchOp {
    /// Object search within one bucket
    Objects { bucket: String },
    /// Object search across all buckets of a profile
    Global,
    /// Bucket name search
    Buckets,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SearchKey {
    profile_id: i64,
    op: SearchOp,
    /// Lowercased, so `"Report"` and `"report"` share an entry
    query: String,
}

enum SearchResult {
    Objects(Vec<ObjectRecord>),
    Matches(Vec<ObjectMatch>),
    Buckets(Vec<BucketRecord>),
}

struct MemoEntry {
    result: SearchResult,
    cached_at: Instant,
}

/// Adapter-backed repository with search memoization
pub struct CacheRepository {
    adapter: Arc<dyn IPersistenceAdapter>,
    memo: DashMap<SearchKey, MemoEntry>,
    ttl: Duration,
}

impl CacheRepository {
    pub fn new(adapter: Arc<dyn IPersistenceAdapter>) -> Self {
        Self::with_ttl(adapter, SEARCH_CACHE_TTL)
    }

    /// Constructor with an explicit memo TTL, used by tests to exercise
    /// expiry without sleeping for the full production window
    pub fn with_ttl(adapter: Arc<dyn IPersistenceAdapter>, ttl: Duration) -> Self {
        Self {
            adapter,
            memo: DashMap::new(),
            ttl,
        }
    }

    /// Direct access to the underlying adapter
    pub fn adapter(&self) -> &Arc<dyn IPersistenceAdapter> {
        &self.adapter
    }

    // --- Profiles ---

    pub async fn save_profile(&self, profile: &NewProfile) -> anyhow::Result<ConnectionProfile> {
        self.adapter.save_profile(profile).await
    }

    pub async fn list_profiles(&self) -> anyhow::Result<Vec<ConnectionProfile>> {
        self.adapter.list_profiles().await
    }

    pub async fn get_profile(&self, id: i64) -> anyhow::Result<Option<ConnectionProfile>> {
        self.adapter.get_profile(id).await
    }

    pub async fn update_profile(
        &self,
        id: i64,
        update: &NewProfile,
    ) -> anyhow::Result<Option<ConnectionProfile>> {
        self.adapter.update_profile(id, update).await
    }

    pub async fn delete_profile(&self, id: i64) -> anyhow::Result<()> {
        self.adapter.delete_profile(id).await?;
        self.memo.retain(|key, _| key.profile_id != id);
        Ok(())
    }

    // --- Buckets ---

    pub async fn list_buckets(&self, profile_id: i64) -> anyhow::Result<Vec<BucketRecord>> {
        self.adapter.list_buckets(profile_id).await
    }

    pub async fn bucket_exists(&self, profile_id: i64, name: &str) -> anyhow::Result<bool> {
        let buckets = self.adapter.list_buckets(profile_id).await?;
        Ok(buckets.iter().any(|b| b.name == name))
    }

    pub async fn save_bucket(
        &self,
        profile_id: i64,
        bucket: &BucketRecord,
    ) -> anyhow::Result<()> {
        self.adapter.save_bucket(profile_id, bucket).await?;
        self.invalidate_bucket_searches(profile_id);
        Ok(())
    }

    pub async fn replace_buckets(
        &self,
        profile_id: i64,
        buckets: &[BucketRecord],
    ) -> anyhow::Result<()> {
        self.adapter.replace_buckets(profile_id, buckets).await?;
        self.invalidate_bucket_searches(profile_id);
        Ok(())
    }

    pub async fn clear_buckets(&self, profile_id: i64) -> anyhow::Result<()> {
        self.adapter.clear_buckets(profile_id).await?;
        // Clearing buckets drops their cached objects too
        self.memo.retain(|key, _| key.profile_id != profile_id);
        Ok(())
    }

    pub async fn delete_bucket(&self, profile_id: i64, name: &str) -> anyhow::Result<()> {
        self.adapter.delete_bucket(profile_id, name).await?;
        self.invalidate_bucket_searches(profile_id);
        self.invalidate_object_searches(profile_id, name);
        Ok(())
    }

    // --- Objects ---

    pub async fn list_objects(
        &self,
        profile_id: i64,
        bucket: &str,
        prefix: Option<&str>,
    ) -> anyhow::Result<Vec<ObjectRecord>> {
        self.adapter.list_objects(profile_id, bucket, prefix).await
    }

    pub async fn object_exists(
        &self,
        profile_id: i64,
        bucket: &str,
        key: &str,
    ) -> anyhow::Result<bool> {
        let matches = self.adapter.search_objects(profile_id, bucket, key).await?;
        Ok(matches.iter().any(|o| o.key == key))
    }

    pub async fn save_object(
        &self,
        profile_id: i64,
        bucket: &str,
        object: &ObjectRecord,
        prefix: Option<&str>,
    ) -> anyhow::Result<()> {
        self.adapter
            .save_object(profile_id, bucket, object, prefix)
            .await?;
        self.invalidate_object_searches(profile_id, bucket);
        Ok(())
    }

    pub async fn replace_objects(
        &self,
        profile_id: i64,
        bucket: &str,
        objects: &[ObjectRecord],
        prefix: Option<&str>,
    ) -> anyhow::Result<()> {
        self.adapter
            .replace_objects(profile_id, bucket, objects, prefix)
            .await?;
        self.invalidate_object_searches(profile_id, bucket);
        Ok(())
    }

    pub async fn clear_objects(
        &self,
        profile_id: i64,
        bucket: &str,
        prefix: Option<&str>,
    ) -> anyhow::Result<()> {
        self.adapter.clear_objects(profile_id, bucket, prefix).await?;
        self.invalidate_object_searches(profile_id, bucket);
        Ok(())
    }

    pub async fn delete_object(
        &self,
        profile_id: i64,
        bucket: &str,
        key: &str,
    ) -> anyhow::Result<()> {
        self.adapter.delete_object(profile_id, bucket, key).await?;
        self.invalidate_object_searches(profile_id, bucket);
        Ok(())
    }

    // --- Sync metadata ---

    pub async fn get_sync_metadata(&self, scope: &Scope) -> anyhow::Result<Option<SyncMetadata>> {
        self.adapter.get_sync_metadata(scope).await
    }

    pub async fn upsert_sync_metadata(
        &self,
        scope: &Scope,
        status: SyncStatus,
        error_message: Option<&str>,
    ) -> anyhow::Result<()> {
        self.adapter
            .upsert_sync_metadata(scope, status, error_message)
            .await
    }

    pub async fn list_sync_metadata(&self, profile_id: i64) -> anyhow::Result<Vec<SyncMetadata>> {
        self.adapter.list_sync_metadata(profile_id).await
    }

    // --- Memoized searches ---

    pub async fn search_objects(
        &self,
        profile_id: i64,
        bucket: &str,
        query: &str,
    ) -> anyhow::Result<Vec<ObjectRecord>> {
        let key = SearchKey {
            profile_id,
            op: SearchOp::Objects {
                bucket: bucket.to_string(),
            },
            query: query.to_lowercase(),
        };

        if let Some(hit) = self.memo_lookup(&key) {
            if let SearchResult::Objects(objects) = hit {
                return Ok(objects);
            }
        }

        let objects = self.adapter.search_objects(profile_id, bucket, query).await?;
        self.memo.insert(
            key,
            MemoEntry {
                result: SearchResult::Objects(objects.clone()),
                cached_at: Instant::now(),
            },
        );
        Ok(objects)
    }

    pub async fn search_all_objects(
        &self,
        profile_id: i64,
        query: &str,
    ) -> anyhow::Result<Vec<ObjectMatch>> {
        let key = SearchKey {
            profile_id,
            op: SearchOp::Global,
            query: query.to_lowercase(),
        };

        if let Some(hit) = self.memo_lookup(&key) {
            if let SearchResult::Matches(matches) = hit {
                return Ok(matches);
            }
        }

        let matches = self.adapter.search_all_objects(profile_id, query).await?;
        self.memo.insert(
            key,
            MemoEntry {
                result: SearchResult::Matches(matches.clone()),
                cached_at: Instant::now(),
            },
        );
        Ok(matches)
    }

    pub async fn search_buckets(
        &self,
        profile_id: i64,
        query: &str,
    ) -> anyhow::Result<Vec<BucketRecord>> {
        let key = SearchKey {
            profile_id,
            op: SearchOp::Buckets,
            query: query.to_lowercase(),
        };

        if let Some(hit) = self.memo_lookup(&key) {
            if let SearchResult::Buckets(buckets) = hit {
                return Ok(buckets);
            }
        }

        let buckets = self.adapter.search_buckets(profile_id, query).await?;
        self.memo.insert(
            key,
            MemoEntry {
                result: SearchResult::Buckets(buckets.clone()),
                cached_at: Instant::now(),
            },
        );
        Ok(buckets)
    }

    // --- Settings and diagnostics ---

    pub async fn get_setting(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.adapter.get_setting(key).await
    }

    pub async fn set_setting(&self, key: &str, value: Option<&str>) -> anyhow::Result<()> {
        self.adapter.set_setting(key, value).await
    }

    pub async fn stats(&self) -> anyhow::Result<StoreStats> {
        self.adapter.stats().await
    }

    /// Number of live memo entries, for diagnostics
    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    // --- Internals ---

    fn memo_lookup(&self, key: &SearchKey) -> Option<SearchResult> {
        let entry = self.memo.get(key)?;
        if entry.cached_at.elapsed() > self.ttl {
            drop(entry);
            self.memo.remove(key);
            return None;
        }
        Some(match &entry.result {
            SearchResult::Objects(v) => SearchResult::Objects(v.clone()),
            SearchResult::Matches(v) => SearchResult::Matches(v.clone()),
            SearchResult::Buckets(v) => SearchResult::Buckets(v.clone()),
        })
    }

    /// Drops memoized object searches touching a bucket, plus every
    /// profile-wide search (those can contain rows from any bucket)
    fn invalidate_object_searches(&self, profile_id: i64, bucket: &str) {
        let before = self.memo.len();
        self.memo.retain(|key, _| {
            if key.profile_id != profile_id {
                return true;
            }
            match &key.op {
                SearchOp::Objects { bucket: b } => b != bucket,
                SearchOp::Global => false,
                SearchOp::Buckets => true,
            }
        });
        let dropped = before - self.memo.len();
        if dropped > 0 {
            tracing::trace!(profile_id, bucket, dropped, "Invalidated object search memos");
        }
    }

    fn invalidate_bucket_searches(&self, profile_id: i64) {
        self.memo.retain(|key, _| {
            key.profile_id != profile_id || !matches!(key.op, SearchOp::Buckets)
        });
    }
}
