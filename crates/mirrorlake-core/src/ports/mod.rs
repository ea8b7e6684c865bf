//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IPersistenceAdapter`] - Durable storage for profiles and cached
//!   bucket/object/sync-metadata rows (SQLite or in-memory/JSON backends)
//! - [`IObjectStoreClient`] - The authoritative remote object store
//!   (external collaborator; request signing and transport live behind it)

pub mod object_store;
pub mod persistence;

pub use object_store::{IObjectStoreClient, RemoteBucket, RemoteObject, UploadProgress};
pub use persistence::{IPersistenceAdapter, StoreStats};
