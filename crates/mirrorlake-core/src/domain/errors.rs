//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! primarily scope validation failures that must be caught before
//! any I/O is attempted.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A profile must have been persisted (id > 0) before its caches
    /// can be scoped to it
    #[error("Profile id {0} is not a valid persisted id")]
    InvalidProfileId(i64),

    /// A bucket name is required for this scope but was empty or missing
    #[error("Bucket name is required for this operation")]
    MissingBucket,

    /// A prefix scope was given without a bucket scope
    #[error("Prefix '{0}' requires a bucket scope")]
    PrefixWithoutBucket(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
