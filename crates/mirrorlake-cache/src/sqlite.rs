//! SQLite implementation of IPersistenceAdapter
//!
//! This module provides the concrete SQLite-based implementation of the
//! persistence port defined in mirrorlake-core. It handles all row
//! mapping and SQL query construction.
//!
//! ## Type Mapping
//!
//! | Domain Type      | SQL Type | Strategy                                  |
//! |------------------|----------|-------------------------------------------|
//! | profile id       | INTEGER  | SQLite rowid via `last_insert_rowid()`    |
//! | DateTime<Utc>    | TEXT     | RFC 3339 via `to_rfc3339()` / tolerant parse |
//! | SyncStatus       | TEXT     | `as_str()` / `from_str_lossy()`           |
//! | prefix scope     | TEXT     | `NULL` is the distinct root scope, matched with `IS ?` |
//!
//! ## Atomicity
//!
//! Every `replace_*` call runs clear-then-insert inside one transaction,
//! so a write failure rolls back to the pre-replace rows and a concurrent
//! reader observes either the old complete set or the new one.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use mirrorlake_core::domain::{
    BucketRecord, ConnectionProfile, NewProfile, ObjectMatch, ObjectRecord, Scope, SyncMetadata,
    SyncStatus,
};
use mirrorlake_core::ports::{IPersistenceAdapter, StoreStats};

use crate::CacheError;

/// SQLite-based implementation of the persistence port
///
/// All operations are performed through a connection pool for concurrency.
/// Cascade-on-delete is delegated to the schema's foreign keys.
pub struct SqlitePersistenceAdapter {
    pool: SqlitePool,
}

impl SqlitePersistenceAdapter {
    /// Creates a new adapter instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Parse a DateTime<Utc> from an RFC 3339 string
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Try parsing without timezone (SQLite default format)
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
                .map(|ndt| ndt.and_utc())
        })
        .map_err(|e| {
            CacheError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

/// Parse an optional DateTime<Utc> from an optional string
fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, CacheError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

// ============================================================================
// Row mapping functions
// ============================================================================

fn profile_from_row(row: &SqliteRow) -> Result<ConnectionProfile, CacheError> {
    let created_at_str: String = row.get("created_at");

    Ok(ConnectionProfile {
        id: row.get("id"),
        name: row.get("name"),
        access_key_id: row.get("access_key_id"),
        secret_access_key: row.get("secret_access_key"),
        region: row.get("region"),
        endpoint: row.get("endpoint"),
        created_at: parse_datetime(&created_at_str)?,
    })
}

fn bucket_from_row(row: &SqliteRow) -> Result<BucketRecord, CacheError> {
    let creation_date_str: Option<String> = row.get("creation_date");

    Ok(BucketRecord {
        name: row.get("name"),
        creation_date: parse_optional_datetime(creation_date_str)?,
    })
}

fn object_from_row(row: &SqliteRow) -> Result<ObjectRecord, CacheError> {
    let last_modified_str: Option<String> = row.get("last_modified");

    Ok(ObjectRecord {
        key: row.get("key"),
        last_modified: parse_optional_datetime(last_modified_str)?,
        size: row.get("size"),
        etag: row.get("etag"),
        storage_class: row.get("storage_class"),
    })
}

fn sync_metadata_from_row(row: &SqliteRow) -> Result<SyncMetadata, CacheError> {
    let last_sync_str: Option<String> = row.get("last_sync_at");
    let status_str: String = row.get("sync_status");

    Ok(SyncMetadata {
        scope: Scope {
            profile_id: row.get("profile_id"),
            bucket: row.get("bucket_name"),
            prefix: row.get("prefix"),
        },
        last_sync_at: parse_optional_datetime(last_sync_str)?,
        status: SyncStatus::from_str_lossy(&status_str),
        error_message: row.get("error_message"),
    })
}

// ============================================================================
// IPersistenceAdapter implementation
// ============================================================================

#[async_trait::async_trait]
impl IPersistenceAdapter for SqlitePersistenceAdapter {
    // --- Profile operations ---

    async fn save_profile(&self, profile: &NewProfile) -> anyhow::Result<ConnectionProfile> {
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO profiles \
             (name, access_key_id, secret_access_key, region, endpoint, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&profile.name)
        .bind(&profile.access_key_id)
        .bind(&profile.secret_access_key)
        .bind(&profile.region)
        .bind(&profile.endpoint)
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        tracing::trace!(profile_id = id, "Saved profile");

        Ok(ConnectionProfile {
            id,
            name: profile.name.clone(),
            access_key_id: profile.access_key_id.clone(),
            secret_access_key: profile.secret_access_key.clone(),
            region: profile.region.clone(),
            endpoint: profile.endpoint.clone(),
            created_at,
        })
    }

    async fn list_profiles(&self) -> anyhow::Result<Vec<ConnectionProfile>> {
        let rows = sqlx::query("SELECT * FROM profiles ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await?;

        let mut profiles = Vec::with_capacity(rows.len());
        for row in &rows {
            profiles.push(profile_from_row(row)?);
        }
        Ok(profiles)
    }

    async fn get_profile(&self, id: i64) -> anyhow::Result<Option<ConnectionProfile>> {
        let row = sqlx::query("SELECT * FROM profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(profile_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn update_profile(
        &self,
        id: i64,
        update: &NewProfile,
    ) -> anyhow::Result<Option<ConnectionProfile>> {
        let result = sqlx::query(
            "UPDATE profiles \
             SET name = ?, access_key_id = ?, secret_access_key = ?, region = ?, endpoint = ? \
             WHERE id = ?",
        )
        .bind(&update.name)
        .bind(&update.access_key_id)
        .bind(&update.secret_access_key)
        .bind(&update.region)
        .bind(&update.endpoint)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        tracing::trace!(profile_id = id, "Updated profile");
        self.get_profile(id).await
    }

    async fn delete_profile(&self, id: i64) -> anyhow::Result<()> {
        // Buckets, objects, and sync metadata cascade via foreign keys
        sqlx::query("DELETE FROM profiles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::trace!(profile_id = id, "Deleted profile and cascaded caches");
        Ok(())
    }

    // --- Bucket cache operations ---

    async fn list_buckets(&self, profile_id: i64) -> anyhow::Result<Vec<BucketRecord>> {
        let rows = sqlx::query("SELECT * FROM buckets WHERE profile_id = ? ORDER BY name")
            .bind(profile_id)
            .fetch_all(&self.pool)
            .await?;

        let mut buckets = Vec::with_capacity(rows.len());
        for row in &rows {
            buckets.push(bucket_from_row(row)?);
        }
        Ok(buckets)
    }

    async fn save_bucket(&self, profile_id: i64, bucket: &BucketRecord) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO buckets (profile_id, name, creation_date) VALUES (?, ?, ?)",
        )
        .bind(profile_id)
        .bind(&bucket.name)
        .bind(bucket.creation_date.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        tracing::trace!(profile_id, bucket = %bucket.name, "Saved bucket");
        Ok(())
    }

    async fn replace_buckets(
        &self,
        profile_id: i64,
        buckets: &[BucketRecord],
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM buckets WHERE profile_id = ?")
            .bind(profile_id)
            .execute(&mut *tx)
            .await?;

        for bucket in buckets {
            sqlx::query(
                "INSERT INTO buckets (profile_id, name, creation_date) VALUES (?, ?, ?)",
            )
            .bind(profile_id)
            .bind(&bucket.name)
            .bind(bucket.creation_date.map(|dt| dt.to_rfc3339()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::trace!(profile_id, count = buckets.len(), "Replaced bucket cache");
        Ok(())
    }

    async fn clear_buckets(&self, profile_id: i64) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        // No bucket-level foreign key; object rows are scoped by name
        sqlx::query("DELETE FROM objects WHERE profile_id = ?")
            .bind(profile_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM buckets WHERE profile_id = ?")
            .bind(profile_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::trace!(profile_id, "Cleared bucket cache");
        Ok(())
    }

    async fn delete_bucket(&self, profile_id: i64, name: &str) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM objects WHERE profile_id = ? AND bucket_name = ?")
            .bind(profile_id)
            .bind(name)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM buckets WHERE profile_id = ? AND name = ?")
            .bind(profile_id)
            .bind(name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::trace!(profile_id, bucket = name, "Deleted bucket and its objects");
        Ok(())
    }

    // --- Object cache operations ---

    async fn list_objects(
        &self,
        profile_id: i64,
        bucket: &str,
        prefix: Option<&str>,
    ) -> anyhow::Result<Vec<ObjectRecord>> {
        // `IS ?` matches NULL when the root scope is requested
        let rows = sqlx::query(
            "SELECT * FROM objects \
             WHERE profile_id = ? AND bucket_name = ? AND prefix IS ? \
             ORDER BY key",
        )
        .bind(profile_id)
        .bind(bucket)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;

        let mut objects = Vec::with_capacity(rows.len());
        for row in &rows {
            objects.push(object_from_row(row)?);
        }
        Ok(objects)
    }

    async fn save_object(
        &self,
        profile_id: i64,
        bucket: &str,
        object: &ObjectRecord,
        prefix: Option<&str>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO objects \
             (profile_id, bucket_name, key, last_modified, size, etag, storage_class, prefix) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(profile_id)
        .bind(bucket)
        .bind(&object.key)
        .bind(object.last_modified.map(|dt| dt.to_rfc3339()))
        .bind(object.size)
        .bind(&object.etag)
        .bind(&object.storage_class)
        .bind(prefix)
        .execute(&self.pool)
        .await?;

        tracing::trace!(profile_id, bucket, key = %object.key, "Saved object");
        Ok(())
    }

    async fn replace_objects(
        &self,
        profile_id: i64,
        bucket: &str,
        objects: &[ObjectRecord],
        prefix: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM objects WHERE profile_id = ? AND bucket_name = ? AND prefix IS ?",
        )
        .bind(profile_id)
        .bind(bucket)
        .bind(prefix)
        .execute(&mut *tx)
        .await?;

        for object in objects {
            // OR REPLACE: the key may still exist under another prefix scope;
            // the fresh listing wins it for this scope
            sqlx::query(
                "INSERT OR REPLACE INTO objects \
                 (profile_id, bucket_name, key, last_modified, size, etag, storage_class, prefix) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(profile_id)
            .bind(bucket)
            .bind(&object.key)
            .bind(object.last_modified.map(|dt| dt.to_rfc3339()))
            .bind(object.size)
            .bind(&object.etag)
            .bind(&object.storage_class)
            .bind(prefix)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::trace!(
            profile_id,
            bucket,
            prefix = prefix.unwrap_or("<root>"),
            count = objects.len(),
            "Replaced object cache"
        );
        Ok(())
    }

    async fn clear_objects(
        &self,
        profile_id: i64,
        bucket: &str,
        prefix: Option<&str>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "DELETE FROM objects \
             WHERE profile_id = ? AND bucket_name = ? AND prefix IS ?",
        )
        .bind(profile_id)
        .bind(bucket)
        .bind(prefix)
        .execute(&self.pool)
        .await?;

        tracing::trace!(
            profile_id,
            bucket,
            prefix = prefix.unwrap_or("<root>"),
            "Cleared object cache scope"
        );
        Ok(())
    }

    async fn delete_object(
        &self,
        profile_id: i64,
        bucket: &str,
        key: &str,
    ) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM objects WHERE profile_id = ? AND bucket_name = ? AND key = ?")
            .bind(profile_id)
            .bind(bucket)
            .bind(key)
            .execute(&self.pool)
            .await?;

        tracing::trace!(profile_id, bucket, key, "Deleted object");
        Ok(())
    }

    // --- Sync metadata operations ---

    async fn get_sync_metadata(&self, scope: &Scope) -> anyhow::Result<Option<SyncMetadata>> {
        let row = sqlx::query(
            "SELECT * FROM sync_metadata \
             WHERE profile_id = ? AND bucket_name IS ? AND prefix IS ?",
        )
        .bind(scope.profile_id)
        .bind(&scope.bucket)
        .bind(&scope.prefix)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(sync_metadata_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn upsert_sync_metadata(
        &self,
        scope: &Scope,
        status: SyncStatus,
        error_message: Option<&str>,
    ) -> anyhow::Result<()> {
        // SQLite unique indexes treat NULLs as distinct, so the schema's
        // UNIQUE(profile_id, bucket_name, prefix) does not dedupe NULL
        // scopes. Delete-then-insert in one transaction keeps one row per
        // scope regardless.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM sync_metadata \
             WHERE profile_id = ? AND bucket_name IS ? AND prefix IS ?",
        )
        .bind(scope.profile_id)
        .bind(&scope.bucket)
        .bind(&scope.prefix)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO sync_metadata \
             (profile_id, bucket_name, prefix, last_sync_at, sync_status, error_message) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(scope.profile_id)
        .bind(&scope.bucket)
        .bind(&scope.prefix)
        .bind(Utc::now().to_rfc3339())
        .bind(status.as_str())
        .bind(error_message)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::trace!(scope = %scope, status = %status, "Upserted sync metadata");
        Ok(())
    }

    async fn list_sync_metadata(&self, profile_id: i64) -> anyhow::Result<Vec<SyncMetadata>> {
        let rows = sqlx::query(
            "SELECT * FROM sync_metadata WHERE profile_id = ? ORDER BY bucket_name, prefix",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(sync_metadata_from_row(row)?);
        }
        Ok(entries)
    }

    // --- Search operations ---

    async fn search_objects(
        &self,
        profile_id: i64,
        bucket: &str,
        query: &str,
    ) -> anyhow::Result<Vec<ObjectRecord>> {
        let pattern = format!("%{}%", query);

        let rows = sqlx::query(
            "SELECT * FROM objects \
             WHERE profile_id = ? AND bucket_name = ? AND key LIKE ? \
             ORDER BY key \
             LIMIT 1000",
        )
        .bind(profile_id)
        .bind(bucket)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        let mut objects = Vec::with_capacity(rows.len());
        for row in &rows {
            objects.push(object_from_row(row)?);
        }
        Ok(objects)
    }

    async fn search_all_objects(
        &self,
        profile_id: i64,
        query: &str,
    ) -> anyhow::Result<Vec<ObjectMatch>> {
        let pattern = format!("%{}%", query);

        let rows = sqlx::query(
            "SELECT * FROM objects \
             WHERE profile_id = ? AND key LIKE ? \
             ORDER BY bucket_name, key \
             LIMIT 1000",
        )
        .bind(profile_id)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        let mut matches = Vec::with_capacity(rows.len());
        for row in &rows {
            matches.push(ObjectMatch {
                bucket_name: row.get("bucket_name"),
                object: object_from_row(row)?,
            });
        }
        Ok(matches)
    }

    async fn search_buckets(
        &self,
        profile_id: i64,
        query: &str,
    ) -> anyhow::Result<Vec<BucketRecord>> {
        let pattern = format!("%{}%", query);

        let rows = sqlx::query(
            "SELECT * FROM buckets \
             WHERE profile_id = ? AND name LIKE ? \
             ORDER BY name \
             LIMIT 100",
        )
        .bind(profile_id)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        let mut buckets = Vec::with_capacity(rows.len());
        for row in &rows {
            buckets.push(bucket_from_row(row)?);
        }
        Ok(buckets)
    }

    // --- App settings ---

    async fn get_setting(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value: Option<Option<String>> =
            sqlx::query_scalar("SELECT value FROM app_settings WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value.flatten())
    }

    async fn set_setting(&self, key: &str, value: Option<&str>) -> anyhow::Result<()> {
        match value {
            Some(v) => {
                sqlx::query(
                    "INSERT INTO app_settings (key, value, updated_at) VALUES (?, ?, ?) \
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
                     updated_at = excluded.updated_at",
                )
                .bind(key)
                .bind(v)
                .bind(Utc::now().to_rfc3339())
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM app_settings WHERE key = ?")
                    .bind(key)
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    // --- Diagnostics ---

    async fn stats(&self) -> anyhow::Result<StoreStats> {
        let profiles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles")
            .fetch_one(&self.pool)
            .await?;
        let buckets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM buckets")
            .fetch_one(&self.pool)
            .await?;
        let objects: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM objects")
            .fetch_one(&self.pool)
            .await?;
        let sync_metadata: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sync_metadata")
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreStats {
            profiles: profiles as u64,
            buckets: buckets as u64,
            objects: objects as u64,
            sync_metadata: sync_metadata as u64,
        })
    }
}
