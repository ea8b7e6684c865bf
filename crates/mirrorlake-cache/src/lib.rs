//! Mirrorlake Cache - Local persistence for the cached mirror
//!
//! This crate implements the `IPersistenceAdapter` port from
//! `mirrorlake-core` with two interchangeable backends, plus the cache
//! repository that all higher layers talk to. It is a driven (secondary)
//! adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - SQLite connection pool with migration support
//! - [`SqlitePersistenceAdapter`] - SQLite-backed adapter (desktop/native)
//! - [`StorePersistenceAdapter`] - JSON key-value adapter (browser-local
//!   rendition; scan-and-filter, manual cascades)
//! - [`CacheRepository`] - adapter wrapper adding the short-TTL search
//!   memo cache and convenience predicates
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use mirrorlake_cache::{CacheRepository, DatabasePool, SqlitePersistenceAdapter};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/mirrorlake/mirrorlake.db")).await?;
//! let adapter = Arc::new(SqlitePersistenceAdapter::new(pool.pool().clone()));
//! let repo = CacheRepository::new(adapter);
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod repository;
pub mod sqlite;
pub mod store;

pub use pool::DatabasePool;
pub use repository::CacheRepository;
pub use sqlite::SqlitePersistenceAdapter;
pub use store::StorePersistenceAdapter;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection or open the store file
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of stored rows failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Writing the store file to disk failed
    #[error("Store write failed: {0}")]
    StoreWriteFailed(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}
