//! Object store client port (driven/secondary port)
//!
//! This module defines the interface to the authoritative remote object
//! store. Implementations handle the service-specific API calls, request
//! signing, and transport concerns; the core treats the client purely as
//! an async data source and sink.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are
//!   adapter-specific and don't need domain-level classification.
//! - `RemoteBucket` and `RemoteObject` are port-level DTOs, not domain
//!   entities; the sync coordinator maps them to cache records.
//! - The client owns its own timeout policy. A timeout surfaces as an
//!   ordinary error and the coordinator records it like any other fetch
//!   failure; mid-flight cancellation is not part of this contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BucketRecord, ObjectRecord};

/// A bucket as reported by the remote listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteBucket {
    pub name: String,
    pub creation_date: Option<DateTime<Utc>>,
}

/// An object as reported by the remote listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteObject {
    pub key: String,
    pub last_modified: Option<DateTime<Utc>>,
    pub size: Option<i64>,
    pub etag: Option<String>,
    pub storage_class: Option<String>,
}

impl From<RemoteBucket> for BucketRecord {
    fn from(remote: RemoteBucket) -> Self {
        BucketRecord {
            name: remote.name,
            creation_date: remote.creation_date,
        }
    }
}

impl From<RemoteObject> for ObjectRecord {
    fn from(remote: RemoteObject) -> Self {
        ObjectRecord {
            key: remote.key,
            last_modified: remote.last_modified,
            size: remote.size,
            etag: remote.etag,
            storage_class: remote.storage_class,
        }
    }
}

/// Progress callback for uploads, called with `(bytes_sent, total_bytes)`
pub type UploadProgress = Box<dyn Fn(u64, u64) + Send>;

/// Port trait for remote object store operations
///
/// One client instance is bound to one connection profile (credentials,
/// region, endpoint). Listing calls return the complete authoritative set
/// for their scope; pagination is the implementation's concern.
#[async_trait::async_trait]
pub trait IObjectStoreClient: Send + Sync {
    /// Lists all buckets visible to the profile's credentials
    async fn list_buckets(&self) -> anyhow::Result<Vec<RemoteBucket>>;

    /// Creates a new bucket
    async fn create_bucket(&self, name: &str) -> anyhow::Result<()>;

    /// Deletes a bucket (the remote service decides whether non-empty
    /// buckets are rejected)
    async fn delete_bucket(&self, name: &str) -> anyhow::Result<()>;

    /// Lists objects in a bucket, optionally under a listing prefix
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> anyhow::Result<Vec<RemoteObject>>;

    /// Uploads an object
    ///
    /// # Arguments
    /// * `progress` - Optional callback reporting (bytes_sent, total_bytes)
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        progress: Option<UploadProgress>,
    ) -> anyhow::Result<()>;

    /// Deletes an object
    async fn delete_object(&self, bucket: &str, key: &str) -> anyhow::Result<()>;

    /// Generates a pre-signed URL valid for `expires_in_secs` seconds
    async fn signed_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in_secs: u64,
    ) -> anyhow::Result<String>;

    /// Builds the unsigned public URL for an object
    fn public_url(&self, bucket: &str, key: &str) -> String;
}
