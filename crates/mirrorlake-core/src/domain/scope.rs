//! Cache scopes
//!
//! A [`Scope`] is the tuple `(profile_id, bucket?, prefix?)` that keys a
//! unit of cached data and its sync status. Three shapes are valid:
//!
//! - profile scope: all buckets of one profile
//! - bucket scope: the root object listing of one bucket
//! - prefix scope: one listing prefix within a bucket
//!
//! `prefix = None` is its own distinct scope ("root"), never merged with a
//! named prefix: clearing or replacing rows for `docs/` must not touch rows
//! cached under the root listing, and vice versa.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// The scope triple that qualifies every cache row and sync-metadata entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub profile_id: i64,
    pub bucket: Option<String>,
    pub prefix: Option<String>,
}

impl Scope {
    /// Scope covering a profile's bucket list
    pub fn profile(profile_id: i64) -> Self {
        Self {
            profile_id,
            bucket: None,
            prefix: None,
        }
    }

    /// Scope covering the root object listing of a bucket
    pub fn bucket(profile_id: i64, bucket: impl Into<String>) -> Self {
        Self {
            profile_id,
            bucket: Some(bucket.into()),
            prefix: None,
        }
    }

    /// Scope covering one listing prefix within a bucket
    pub fn prefixed(
        profile_id: i64,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            profile_id,
            bucket: Some(bucket.into()),
            prefix: Some(prefix.into()),
        }
    }

    /// Validates the scope shape before any I/O is attempted
    ///
    /// Rules: the profile id must be a persisted id (> 0), a bucket name
    /// (when present) must be non-empty, and a prefix requires a bucket.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.profile_id <= 0 {
            return Err(DomainError::InvalidProfileId(self.profile_id));
        }
        if let Some(bucket) = &self.bucket {
            if bucket.is_empty() {
                return Err(DomainError::MissingBucket);
            }
        } else if let Some(prefix) = &self.prefix {
            return Err(DomainError::PrefixWithoutBucket(prefix.clone()));
        }
        Ok(())
    }

    /// Canonical string key for this scope
    ///
    /// Used for display, logging, and progress callbacks. The format is not
    /// injective (a bucket name may itself contain `-prefix-`), so anything
    /// that must distinguish scopes compares [`Scope`] values, never keys.
    pub fn key(&self) -> String {
        match (&self.bucket, &self.prefix) {
            (Some(bucket), Some(prefix)) => {
                format!(
                    "profile-{}-bucket-{}-prefix-{}",
                    self.profile_id, bucket, prefix
                )
            }
            (Some(bucket), None) => {
                format!("profile-{}-bucket-{}-prefix-root", self.profile_id, bucket)
            }
            _ => format!("profile-{}", self.profile_id),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_keys_are_distinct_per_shape() {
        let profile = Scope::profile(1);
        let bucket = Scope::bucket(1, "media");
        let prefixed = Scope::prefixed(1, "media", "photos/");

        assert_eq!(profile.key(), "profile-1");
        assert_eq!(bucket.key(), "profile-1-bucket-media-prefix-root");
        assert_eq!(prefixed.key(), "profile-1-bucket-media-prefix-photos/");
    }

    #[test]
    fn test_root_and_named_prefix_never_alias() {
        let root = Scope::bucket(2, "b");
        let named = Scope::prefixed(2, "b", "a/");
        assert_ne!(root.key(), named.key());
        assert_ne!(root, named);
    }

    #[test]
    fn test_validate_rejects_bad_shapes() {
        assert!(Scope::profile(0).validate().is_err());
        assert!(Scope::bucket(1, "").validate().is_err());

        let orphan_prefix = Scope {
            profile_id: 1,
            bucket: None,
            prefix: Some("a/".to_string()),
        };
        assert!(matches!(
            orphan_prefix.validate(),
            Err(DomainError::PrefixWithoutBucket(_))
        ));

        assert!(Scope::prefixed(1, "b", "a/").validate().is_ok());
    }
}
