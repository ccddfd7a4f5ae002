//! Replica store contracts and their implementations.
//!
//! The sync engine only talks to [`LocalStore`] and [`RemoteStore`]; concrete
//! backends are injected at construction so tests can swap in the in-memory
//! stores from [`memory`].

use std::future::Future;

use chrono::Utc;

use crate::error::Result;
use crate::models::Record;

mod gist;
mod local;
pub mod memory;

pub use gist::GistStore;
pub use local::{LibSqlHandleStore, LibSqlLocalStore, GIST_HANDLE_KEY, RECORD_KEY};

/// Durable storage for the local copy of the record.
///
/// Never fails because of connectivity. A missing record loads as `None`;
/// a corrupted one loads as a decode error, which callers treat as missing.
pub trait LocalStore: Send + Sync {
    fn load(&self) -> impl Future<Output = Result<Option<Record>>> + Send;

    /// Persist the whole record atomically.
    fn save(&self, record: &Record) -> impl Future<Output = Result<()>> + Send;

    fn clear(&self) -> impl Future<Output = Result<()>> + Send;

    /// Create and persist the zero-state record.
    fn initialize(&self) -> impl Future<Output = Result<Record>> + Send {
        async move {
            let record = Record::new(Utc::now());
            self.save(&record).await?;
            Ok(record)
        }
    }
}

/// Auth-gated storage for the remote copy of the record.
///
/// Failures are returned as-is; implementations never retry.
pub trait RemoteStore: Send + Sync {
    /// Cheap check for a capability token. Performs no I/O.
    fn is_authenticated(&self) -> bool;

    /// Read the remote record. A remote object that was deleted reads as
    /// `None` and any cached handle to it is forgotten.
    fn read(&self) -> impl Future<Output = Result<Option<Record>>> + Send;

    /// Create the remote object on first write, update it afterwards, and
    /// recreate it when the cached handle has gone stale.
    fn write(&self, record: &Record) -> impl Future<Output = Result<()>> + Send;

    /// Best-effort existence probe; errors read as `false`.
    fn exists(&self) -> impl Future<Output = bool> + Send {
        async move { matches!(self.read().await, Ok(Some(_))) }
    }
}

/// Persistence for the remote object handle (e.g. a gist id).
pub trait HandleStore: Send + Sync {
    fn load_handle(&self) -> impl Future<Output = Result<Option<String>>> + Send;
    fn save_handle(&self, handle: &str) -> impl Future<Output = Result<()>> + Send;
    fn clear_handle(&self) -> impl Future<Output = Result<()>> + Send;
}
