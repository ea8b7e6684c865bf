//! Mirrorlake Sync - Cache synchronization engine
//!
//! Provides:
//! - Scope-level reconciliation between the remote store and the cache
//! - At-most-one concurrent sync per scope
//! - Read-through queries with background refresh
//! - Debounced search over the cached rows
//!
//! ## Modules
//!
//! - [`coordinator`] - Per-scope sync orchestration and durable status
//! - [`read_through`] - Cache-first queries that refresh in the background
//! - [`search`] - Debounced, generation-checked search helpers

pub mod coordinator;
pub mod read_through;
pub mod search;

pub use coordinator::{SyncCoordinator, SyncOutcome};
pub use read_through::ReadThrough;
pub use search::{BucketSearcher, GlobalSearcher, ObjectSearcher};

use thiserror::Error;

/// Errors that can occur during synchronization operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// The requested scope is malformed; raised before any I/O
    #[error("Invalid scope: {0}")]
    InvalidScope(#[from] mirrorlake_core::domain::DomainError),

    /// The remote listing failed; the cache keeps its previous rows
    #[error("Remote fetch failed for {scope}: {source}")]
    RemoteFetch {
        scope: String,
        #[source]
        source: anyhow::Error,
    },

    /// A cache read or write failed
    #[error("Cache operation failed for {scope}: {source}")]
    Persistence {
        scope: String,
        #[source]
        source: anyhow::Error,
    },
}
