//! Domain entities and cache-scoping rules
//!
//! This module contains the core domain types for Mirrorlake:
//! - Connection profiles identifying one remote object-storage account
//! - Cached bucket and object metadata records
//! - Sync metadata tracking per-scope reconciliation state
//! - The scope triple that keys every unit of cached data
//! - Domain-specific error types

pub mod errors;
pub mod profile;
pub mod record;
pub mod scope;
pub mod sync_meta;

// Re-export commonly used types
pub use errors::DomainError;
pub use profile::{ConnectionProfile, NewProfile};
pub use record::{BucketRecord, ObjectMatch, ObjectRecord};
pub use scope::Scope;
pub use sync_meta::{SyncMetadata, SyncStatus};
