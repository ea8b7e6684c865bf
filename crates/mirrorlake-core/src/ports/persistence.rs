//! Persistence adapter port (driven/secondary port)
//!
//! This module defines the interface for durable storage of connection
//! profiles and the cached mirror (buckets, objects, sync metadata).
//! Two conforming implementations exist in `mirrorlake-cache`: an embedded
//! SQLite backend and a key-value/JSON backend. Both must satisfy the same
//! external behavior, including cascade-on-delete, which the key-value
//! backend implements manually by scanning and filtering.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, filesystem) and don't need domain-level classification.
//! - Every batch-write method (`replace_*`) is atomic: a crash or write
//!   failure mid-batch must never leave a partial replace visible. A
//!   concurrent reader sees either the old complete set or the new one.
//! - Prefix scoping: `prefix = None` addresses the distinct root scope on
//!   every object method, `clear_objects` included; clearing the root scope
//!   leaves rows cached under named prefixes untouched. A whole-bucket wipe
//!   goes through `delete_bucket`.

use crate::domain::{
    BucketRecord, ConnectionProfile, NewProfile, ObjectMatch, ObjectRecord, Scope, SyncMetadata,
    SyncStatus,
};

/// Row caps applied by the search methods
pub const SEARCH_OBJECT_LIMIT: usize = 1000;
pub const SEARCH_BUCKET_LIMIT: usize = 100;

/// Row counts across the four stores, for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub profiles: u64,
    pub buckets: u64,
    pub objects: u64,
    pub sync_metadata: u64,
}

/// Port trait for persistent profile and cache storage
#[async_trait::async_trait]
pub trait IPersistenceAdapter: Send + Sync {
    // --- Profile operations ---

    /// Persists a new profile and returns it with its assigned id
    async fn save_profile(&self, profile: &NewProfile) -> anyhow::Result<ConnectionProfile>;

    /// Lists all profiles, newest first
    async fn list_profiles(&self) -> anyhow::Result<Vec<ConnectionProfile>>;

    /// Retrieves a profile by id
    async fn get_profile(&self, id: i64) -> anyhow::Result<Option<ConnectionProfile>>;

    /// Replaces the editable fields of a profile
    ///
    /// Returns the updated profile, or `None` if no profile has this id.
    async fn update_profile(
        &self,
        id: i64,
        update: &NewProfile,
    ) -> anyhow::Result<Option<ConnectionProfile>>;

    /// Deletes a profile, cascading deletion of all cached buckets,
    /// objects, and sync metadata scoped to it
    async fn delete_profile(&self, id: i64) -> anyhow::Result<()>;

    // --- Bucket cache operations ---

    /// Lists cached buckets for a profile, ordered by name
    async fn list_buckets(&self, profile_id: i64) -> anyhow::Result<Vec<BucketRecord>>;

    /// Inserts or updates one cached bucket
    async fn save_bucket(&self, profile_id: i64, bucket: &BucketRecord) -> anyhow::Result<()>;

    /// Atomically replaces the profile's cached bucket set
    ///
    /// Clear-then-insert in one transaction; an empty `buckets` slice
    /// leaves the profile with an empty cache.
    async fn replace_buckets(
        &self,
        profile_id: i64,
        buckets: &[BucketRecord],
    ) -> anyhow::Result<()>;

    /// Removes every cached bucket for a profile (objects under them are
    /// cascaded)
    async fn clear_buckets(&self, profile_id: i64) -> anyhow::Result<()>;

    /// Deletes one cached bucket, cascading its cached objects
    async fn delete_bucket(&self, profile_id: i64, name: &str) -> anyhow::Result<()>;

    // --- Object cache operations ---

    /// Lists cached objects for exactly one `(profile, bucket, prefix)`
    /// scope, ordered by key
    async fn list_objects(
        &self,
        profile_id: i64,
        bucket: &str,
        prefix: Option<&str>,
    ) -> anyhow::Result<Vec<ObjectRecord>>;

    /// Inserts or updates one cached object under the given prefix scope
    async fn save_object(
        &self,
        profile_id: i64,
        bucket: &str,
        object: &ObjectRecord,
        prefix: Option<&str>,
    ) -> anyhow::Result<()>;

    /// Atomically replaces the cached object set for exactly one
    /// `(profile, bucket, prefix)` scope
    ///
    /// Rows under other prefixes of the same bucket are untouched. An
    /// empty `objects` slice clears the scope (the remote listing truly
    /// returned nothing).
    async fn replace_objects(
        &self,
        profile_id: i64,
        bucket: &str,
        objects: &[ObjectRecord],
        prefix: Option<&str>,
    ) -> anyhow::Result<()>;

    /// Clears the cached objects of exactly one listing scope
    ///
    /// `prefix = None` clears the root scope only; rows cached under named
    /// prefixes of the same bucket are untouched. A whole-bucket wipe goes
    /// through [`Self::delete_bucket`].
    async fn clear_objects(
        &self,
        profile_id: i64,
        bucket: &str,
        prefix: Option<&str>,
    ) -> anyhow::Result<()>;

    /// Deletes one cached object by key, across all prefix scopes
    async fn delete_object(&self, profile_id: i64, bucket: &str, key: &str)
        -> anyhow::Result<()>;

    // --- Sync metadata operations ---

    /// Retrieves the durable sync record for a scope
    async fn get_sync_metadata(&self, scope: &Scope) -> anyhow::Result<Option<SyncMetadata>>;

    /// Inserts or replaces the sync record for a scope, stamping
    /// `last_sync_at` with the current time
    async fn upsert_sync_metadata(
        &self,
        scope: &Scope,
        status: SyncStatus,
        error_message: Option<&str>,
    ) -> anyhow::Result<()>;

    /// Lists every sync record belonging to a profile
    async fn list_sync_metadata(&self, profile_id: i64) -> anyhow::Result<Vec<SyncMetadata>>;

    // --- Search operations ---

    /// Case-insensitive substring search over cached object keys in one
    /// bucket, ordered by key, capped at [`SEARCH_OBJECT_LIMIT`] rows
    async fn search_objects(
        &self,
        profile_id: i64,
        bucket: &str,
        query: &str,
    ) -> anyhow::Result<Vec<ObjectRecord>>;

    /// Case-insensitive substring search across every bucket of a profile,
    /// ordered by bucket then key, capped at [`SEARCH_OBJECT_LIMIT`] rows
    async fn search_all_objects(
        &self,
        profile_id: i64,
        query: &str,
    ) -> anyhow::Result<Vec<ObjectMatch>>;

    /// Case-insensitive substring search over cached bucket names,
    /// ordered by name, capped at [`SEARCH_BUCKET_LIMIT`] rows
    async fn search_buckets(
        &self,
        profile_id: i64,
        query: &str,
    ) -> anyhow::Result<Vec<BucketRecord>>;

    // --- App settings ---

    /// Reads an application-level setting
    async fn get_setting(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Writes an application-level setting; `None` removes the key
    async fn set_setting(&self, key: &str, value: Option<&str>) -> anyhow::Result<()>;

    // --- Diagnostics ---

    /// Row counts across the stores
    async fn stats(&self) -> anyhow::Result<StoreStats>;
}
