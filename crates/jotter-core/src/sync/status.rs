//! Observable sync status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Engine state. Starts `Idle`; only the engine's operations move it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    #[default]
    Idle,
    Syncing,
    Synced,
    Error,
}

impl fmt::Display for SyncState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        };
        formatter.write_str(label)
    }
}

/// Snapshot published on every state change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub state: SyncState,
    /// Time of the last successful convergence seen by this engine
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Message of the most recent failure, cleared on success
    pub last_error: Option<String>,
    pub pushes: u64,
    pub pulls: u64,
    pub failures: u64,
}
