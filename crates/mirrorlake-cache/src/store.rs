//! Key-value store implementation of IPersistenceAdapter
//!
//! This is the "browser-local storage" backend: the whole cache lives in
//! one JSON document of flat row lists, queried by scanning and filtering.
//! It has no native foreign keys, so every cascade the SQLite backend gets
//! from its schema is implemented here by hand; the two backends must be
//! indistinguishable through the port.
//!
//! The document is guarded by a `tokio::sync::RwLock`. When opened with a
//! backing file, every mutation serializes the document and atomically
//! replaces the file (write to a temp path, then rename), so a crash
//! mid-write never leaves a torn store on disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use mirrorlake_core::domain::{
    BucketRecord, ConnectionProfile, NewProfile, ObjectMatch, ObjectRecord, Scope, SyncMetadata,
    SyncStatus,
};
use mirrorlake_core::ports::{IPersistenceAdapter, StoreStats};

use crate::CacheError;

/// A cached bucket row with its owning profile
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredBucket {
    profile_id: i64,
    #[serde(flatten)]
    record: BucketRecord,
}

/// A cached object row with its full scope triple
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredObject {
    profile_id: i64,
    bucket_name: String,
    prefix: Option<String>,
    #[serde(flatten)]
    record: ObjectRecord,
}

/// The whole store as one serializable document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreDocument {
    next_profile_id: i64,
    profiles: Vec<ConnectionProfile>,
    buckets: Vec<StoredBucket>,
    objects: Vec<StoredObject>,
    sync_metadata: Vec<SyncMetadata>,
    settings: BTreeMap<String, String>,
}

/// Key-value/JSON implementation of the persistence port
pub struct StorePersistenceAdapter {
    path: Option<PathBuf>,
    doc: RwLock<StoreDocument>,
}

impl StorePersistenceAdapter {
    /// Creates an adapter with no backing file (data lives only in memory)
    pub fn in_memory() -> Self {
        Self {
            path: None,
            doc: RwLock::new(StoreDocument::default()),
        }
    }

    /// Opens a file-backed store, loading the existing document if present
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the parent directory
    /// cannot be created, or `CacheError::SerializationError` if an
    /// existing file does not parse.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "Failed to create store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let doc = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "Failed to read store file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            serde_json::from_str(&content).map_err(|e| {
                CacheError::SerializationError(format!(
                    "Store file {} is not valid JSON: {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            StoreDocument::default()
        };

        tracing::info!(path = %path.display(), "Store opened");

        Ok(Self {
            path: Some(path.to_path_buf()),
            doc: RwLock::new(doc),
        })
    }

    /// Persists the document if a backing file is configured
    ///
    /// Called while the write lock is held, so readers can never observe
    /// a document that was not fully flushed.
    fn flush(&self, doc: &StoreDocument) -> Result<(), CacheError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = serde_json::to_string(doc)
            .map_err(|e| CacheError::SerializationError(e.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| CacheError::StoreWriteFailed(e.to_string()))?;
        std::fs::rename(&tmp, path)
            .map_err(|e| CacheError::StoreWriteFailed(e.to_string()))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl IPersistenceAdapter for StorePersistenceAdapter {
    // --- Profile operations ---

    async fn save_profile(&self, profile: &NewProfile) -> anyhow::Result<ConnectionProfile> {
        let mut doc = self.doc.write().await;

        doc.next_profile_id += 1;
        let saved = ConnectionProfile {
            id: doc.next_profile_id,
            name: profile.name.clone(),
            access_key_id: profile.access_key_id.clone(),
            secret_access_key: profile.secret_access_key.clone(),
            region: profile.region.clone(),
            endpoint: profile.endpoint.clone(),
            created_at: Utc::now(),
        };
        doc.profiles.push(saved.clone());

        self.flush(&doc)?;
        tracing::trace!(profile_id = saved.id, "Saved profile");
        Ok(saved)
    }

    async fn list_profiles(&self) -> anyhow::Result<Vec<ConnectionProfile>> {
        let doc = self.doc.read().await;
        let mut profiles = doc.profiles.clone();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(profiles)
    }

    async fn get_profile(&self, id: i64) -> anyhow::Result<Option<ConnectionProfile>> {
        let doc = self.doc.read().await;
        Ok(doc.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn update_profile(
        &self,
        id: i64,
        update: &NewProfile,
    ) -> anyhow::Result<Option<ConnectionProfile>> {
        let mut doc = self.doc.write().await;

        let Some(profile) = doc.profiles.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        profile.name = update.name.clone();
        profile.access_key_id = update.access_key_id.clone();
        profile.secret_access_key = update.secret_access_key.clone();
        profile.region = update.region.clone();
        profile.endpoint = update.endpoint.clone();
        let updated = profile.clone();

        self.flush(&doc)?;
        tracing::trace!(profile_id = id, "Updated profile");
        Ok(Some(updated))
    }

    async fn delete_profile(&self, id: i64) -> anyhow::Result<()> {
        let mut doc = self.doc.write().await;

        // Manual cascade: no foreign keys in a key-value store
        doc.profiles.retain(|p| p.id != id);
        doc.buckets.retain(|b| b.profile_id != id);
        doc.objects.retain(|o| o.profile_id != id);
        doc.sync_metadata.retain(|m| m.scope.profile_id != id);

        self.flush(&doc)?;
        tracing::trace!(profile_id = id, "Deleted profile and cascaded caches");
        Ok(())
    }

    // --- Bucket cache operations ---

    async fn list_buckets(&self, profile_id: i64) -> anyhow::Result<Vec<BucketRecord>> {
        let doc = self.doc.read().await;
        let mut buckets: Vec<BucketRecord> = doc
            .buckets
            .iter()
            .filter(|b| b.profile_id == profile_id)
            .map(|b| b.record.clone())
            .collect();
        buckets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(buckets)
    }

    async fn save_bucket(&self, profile_id: i64, bucket: &BucketRecord) -> anyhow::Result<()> {
        let mut doc = self.doc.write().await;

        doc.buckets
            .retain(|b| !(b.profile_id == profile_id && b.record.name == bucket.name));
        doc.buckets.push(StoredBucket {
            profile_id,
            record: bucket.clone(),
        });

        self.flush(&doc)?;
        tracing::trace!(profile_id, bucket = %bucket.name, "Saved bucket");
        Ok(())
    }

    async fn replace_buckets(
        &self,
        profile_id: i64,
        buckets: &[BucketRecord],
    ) -> anyhow::Result<()> {
        let mut doc = self.doc.write().await;

        doc.buckets.retain(|b| b.profile_id != profile_id);
        doc.buckets.extend(buckets.iter().map(|b| StoredBucket {
            profile_id,
            record: b.clone(),
        }));

        self.flush(&doc)?;
        tracing::trace!(profile_id, count = buckets.len(), "Replaced bucket cache");
        Ok(())
    }

    async fn clear_buckets(&self, profile_id: i64) -> anyhow::Result<()> {
        let mut doc = self.doc.write().await;

        doc.buckets.retain(|b| b.profile_id != profile_id);
        doc.objects.retain(|o| o.profile_id != profile_id);

        self.flush(&doc)?;
        tracing::trace!(profile_id, "Cleared bucket cache");
        Ok(())
    }

    async fn delete_bucket(&self, profile_id: i64, name: &str) -> anyhow::Result<()> {
        let mut doc = self.doc.write().await;

        doc.buckets
            .retain(|b| !(b.profile_id == profile_id && b.record.name == name));
        doc.objects
            .retain(|o| !(o.profile_id == profile_id && o.bucket_name == name));

        self.flush(&doc)?;
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
        let doc = self.doc.read().await;
        let mut objects: Vec<ObjectRecord> = doc
            .objects
            .iter()
            .filter(|o| {
                o.profile_id == profile_id
                    && o.bucket_name == bucket
                    && o.prefix.as_deref() == prefix
            })
            .map(|o| o.record.clone())
            .collect();
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn save_object(
        &self,
        profile_id: i64,
        bucket: &str,
        object: &ObjectRecord,
        prefix: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut doc = self.doc.write().await;

        // Keys are unique per (profile, bucket) across prefix scopes
        doc.objects.retain(|o| {
            !(o.profile_id == profile_id
                && o.bucket_name == bucket
                && o.record.key == object.key)
        });
        doc.objects.push(StoredObject {
            profile_id,
            bucket_name: bucket.to_string(),
            prefix: prefix.map(str::to_string),
            record: object.clone(),
        });

        self.flush(&doc)?;
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
        let mut doc = self.doc.write().await;

        // Drop the scope's rows, plus any row elsewhere in the bucket whose
        // key reappears in the fresh listing (key uniqueness spans scopes)
        doc.objects.retain(|o| {
            if o.profile_id != profile_id || o.bucket_name != bucket {
                return true;
            }
            if o.prefix.as_deref() == prefix {
                return false;
            }
            !objects.iter().any(|fresh| fresh.key == o.record.key)
        });
        doc.objects.extend(objects.iter().map(|o| StoredObject {
            profile_id,
            bucket_name: bucket.to_string(),
            prefix: prefix.map(str::to_string),
            record: o.clone(),
        }));

        self.flush(&doc)?;
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
        let mut doc = self.doc.write().await;

        doc.objects.retain(|o| {
            !(o.profile_id == profile_id
                && o.bucket_name == bucket
                && o.prefix.as_deref() == prefix)
        });

        self.flush(&doc)?;
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
        let mut doc = self.doc.write().await;

        doc.objects.retain(|o| {
            !(o.profile_id == profile_id && o.bucket_name == bucket && o.record.key == key)
        });

        self.flush(&doc)?;
        tracing::trace!(profile_id, bucket, key, "Deleted object");
        Ok(())
    }

    // --- Sync metadata operations ---

    async fn get_sync_metadata(&self, scope: &Scope) -> anyhow::Result<Option<SyncMetadata>> {
        let doc = self.doc.read().await;
        Ok(doc
            .sync_metadata
            .iter()
            .find(|m| &m.scope == scope)
            .cloned())
    }

    async fn upsert_sync_metadata(
        &self,
        scope: &Scope,
        status: SyncStatus,
        error_message: Option<&str>,
    ) -> anyhow::Result<()> {
        let mut doc = self.doc.write().await;

        doc.sync_metadata.retain(|m| &m.scope != scope);
        doc.sync_metadata.push(SyncMetadata {
            scope: scope.clone(),
            last_sync_at: Some(Utc::now()),
            status,
            error_message: error_message.map(str::to_string),
        });

        self.flush(&doc)?;
        tracing::trace!(scope = %scope, status = %status, "Upserted sync metadata");
        Ok(())
    }

    async fn list_sync_metadata(&self, profile_id: i64) -> anyhow::Result<Vec<SyncMetadata>> {
        let doc = self.doc.read().await;
        let mut entries: Vec<SyncMetadata> = doc
            .sync_metadata
            .iter()
            .filter(|m| m.scope.profile_id == profile_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            (&a.scope.bucket, &a.scope.prefix).cmp(&(&b.scope.bucket, &b.scope.prefix))
        });
        Ok(entries)
    }

    // --- Search operations ---

    async fn search_objects(
        &self,
        profile_id: i64,
        bucket: &str,
        query: &str,
    ) -> anyhow::Result<Vec<ObjectRecord>> {
        let needle = query.to_lowercase();
        let doc = self.doc.read().await;

        let mut objects: Vec<ObjectRecord> = doc
            .objects
            .iter()
            .filter(|o| {
                o.profile_id == profile_id
                    && o.bucket_name == bucket
                    && o.record.key.to_lowercase().contains(&needle)
            })
            .map(|o| o.record.clone())
            .collect();
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        objects.truncate(mirrorlake_core::ports::persistence::SEARCH_OBJECT_LIMIT);
        Ok(objects)
    }

    async fn search_all_objects(
        &self,
        profile_id: i64,
        query: &str,
    ) -> anyhow::Result<Vec<ObjectMatch>> {
        let needle = query.to_lowercase();
        let doc = self.doc.read().await;

        let mut matches: Vec<ObjectMatch> = doc
            .objects
            .iter()
            .filter(|o| {
                o.profile_id == profile_id && o.record.key.to_lowercase().contains(&needle)
            })
            .map(|o| ObjectMatch {
                bucket_name: o.bucket_name.clone(),
                object: o.record.clone(),
            })
            .collect();
        matches.sort_by(|a, b| {
            (&a.bucket_name, &a.object.key).cmp(&(&b.bucket_name, &b.object.key))
        });
        matches.truncate(mirrorlake_core::ports::persistence::SEARCH_OBJECT_LIMIT);
        Ok(matches)
    }

    async fn search_buckets(
        &self,
        profile_id: i64,
        query: &str,
    ) -> anyhow::Result<Vec<BucketRecord>> {
        let needle = query.to_lowercase();
        let doc = self.doc.read().await;

        let mut buckets: Vec<BucketRecord> = doc
            .buckets
            .iter()
            .filter(|b| {
                b.profile_id == profile_id && b.record.name.to_lowercase().contains(&needle)
            })
            .map(|b| b.record.clone())
            .collect();
        buckets.sort_by(|a, b| a.name.cmp(&b.name));
        buckets.truncate(mirrorlake_core::ports::persistence::SEARCH_BUCKET_LIMIT);
        Ok(buckets)
    }

    // --- App settings ---

    async fn get_setting(&self, key: &str) -> anyhow::Result<Option<String>> {
        let doc = self.doc.read().await;
        Ok(doc.settings.get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: Option<&str>) -> anyhow::Result<()> {
        let mut doc = self.doc.write().await;

        match value {
            Some(v) => {
                doc.settings.insert(key.to_string(), v.to_string());
            }
            None => {
                doc.settings.remove(key);
            }
        }

        self.flush(&doc)?;
        Ok(())
    }

    // --- Diagnostics ---

    async fn stats(&self) -> anyhow::Result<StoreStats> {
        let doc = self.doc.read().await;
        Ok(StoreStats {
            profiles: doc.profiles.len() as u64,
            buckets: doc.buckets.len() as u64,
            objects: doc.objects.len() as u64,
            sync_metadata: doc.sync_metadata.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let profile = NewProfile {
            name: "local".to_string(),
            access_key_id: "k".to_string(),
            secret_access_key: "s".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
        };

        let saved_id = {
            let store = StorePersistenceAdapter::open(&path).unwrap();
            let saved = store.save_profile(&profile).await.unwrap();
            store
                .save_bucket(saved.id, &BucketRecord::new("media"))
                .await
                .unwrap();
            saved.id
        };

        let reopened = StorePersistenceAdapter::open(&path).unwrap();
        let profiles = reopened.list_profiles().await.unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].id, saved_id);

        let buckets = reopened.list_buckets(saved_id).await.unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].name, "media");

        // Ids keep advancing after reopen
        let second = reopened.save_profile(&profile).await.unwrap();
        assert!(second.id > saved_id);
    }

    #[tokio::test]
    async fn test_no_tmp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = StorePersistenceAdapter::open(&path).unwrap();
        store.set_setting("theme", Some("dark")).await.unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
