//! Connection profiles
//!
//! A [`ConnectionProfile`] is a saved set of credentials, region, and
//! optional endpoint identifying one remote object-storage account.
//! Profiles own every cached row: deleting a profile cascades deletion
//! of all buckets, objects, and sync metadata scoped to it (the
//! persistence adapters enforce this, with or without native foreign keys).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// A persisted connection profile
///
/// The `id` is assigned by the persistence adapter on creation and is the
/// root of every cache scope. Credentials are stored as-is; encryption is
/// out of scope for this layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Adapter-assigned identity, > 0 once persisted
    pub id: i64,
    /// Human-readable profile name
    pub name: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    /// Custom endpoint for S3-compatible services (None = provider default)
    pub endpoint: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ConnectionProfile {
    /// Validates that this profile carries a persisted id usable as a
    /// cache scope root
    pub fn require_id(&self) -> Result<i64, DomainError> {
        if self.id <= 0 {
            return Err(DomainError::InvalidProfileId(self.id));
        }
        Ok(self.id)
    }
}

/// Payload for creating or updating a profile (no id, no timestamp)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProfile {
    pub name: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub endpoint: Option<String>,
}

impl NewProfile {
    /// Validates the user-supplied fields before handing the payload to
    /// a persistence adapter
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "Profile name must not be empty".to_string(),
            ));
        }
        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return Err(DomainError::ValidationFailed(
                "Access key id and secret must not be empty".to_string(),
            ));
        }
        if self.region.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "Region must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
