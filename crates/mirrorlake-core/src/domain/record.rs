//! Cached bucket and object metadata records
//!
//! These are thin mirrors of remote listing entries, not rich entities:
//! the remote store is authoritative and the cache only replays what the
//! last reconciliation fetched. Scope columns (profile id, bucket name,
//! listing prefix) live in the storage layer, not on the records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached bucket listing entry, unique per `(profile, name)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketRecord {
    pub name: String,
    pub creation_date: Option<DateTime<Utc>>,
}

impl BucketRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            creation_date: None,
        }
    }
}

/// A cached object listing entry, unique per `(profile, bucket, key)`
///
/// All metadata fields are nullable because S3-compatible services differ
/// in what their listings return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub key: String,
    pub last_modified: Option<DateTime<Utc>>,
    /// Size in bytes, >= 0 when present
    pub size: Option<i64>,
    pub etag: Option<String>,
    pub storage_class: Option<String>,
}

impl ObjectRecord {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            last_modified: None,
            size: None,
            etag: None,
            storage_class: None,
        }
    }
}

/// A cross-bucket search hit: the object plus the bucket it lives in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMatch {
    pub bucket_name: String,
    pub object: ObjectRecord,
}
