//! Durable sync metadata
//!
//! One [`SyncMetadata`] row exists per scope. It is upserted by the sync
//! coordinator at the start (Syncing) and terminal transition (Completed
//! or Error) of every reconciliation, and is the record a UI can query
//! even after restart to know whether a scope is stale or broken. The
//! coordinator's in-memory active-set is a separate, process-local guard;
//! a stale `Syncing` row after a crash is expected and harmless.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::scope::Scope;

/// Reconciliation state of one scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Completed,
    Error,
}

impl SyncStatus {
    /// Stable storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Idle => "idle",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Completed => "completed",
            SyncStatus::Error => "error",
        }
    }

    /// Parses the storage representation; unknown strings map to `Idle`
    /// so that a schema from a newer version degrades to "needs sync"
    /// rather than failing reads.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "syncing" => SyncStatus::Syncing,
            "completed" => SyncStatus::Completed,
            "error" => SyncStatus::Error,
            _ => SyncStatus::Idle,
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable per-scope sync record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncMetadata {
    pub scope: Scope,
    /// When the scope was last touched by a sync (start or finish)
    pub last_sync_at: Option<DateTime<Utc>>,
    pub status: SyncStatus,
    /// Populated only when `status == Error`
    pub error_message: Option<String>,
}
