//! Mirrorlake Core - Domain logic and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `ConnectionProfile`, `BucketRecord`, `ObjectRecord`,
//!   `SyncMetadata`, `Scope`
//! - **Port definitions** - Traits for adapters: `IPersistenceAdapter`,
//!   `IObjectStoreClient`
//! - **Configuration** - Typed YAML configuration with defaults
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure data types and scope rules with no I/O.
//! Ports define trait interfaces that adapter crates implement: the
//! persistence port is implemented by `mirrorlake-cache` (SQLite and
//! in-memory/JSON backends), while the object-store port is an external
//! collaborator consumed by `mirrorlake-sync`.

pub mod config;
pub mod domain;
pub mod ports;
