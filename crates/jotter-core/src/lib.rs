//! jotter-core - Core library for Jotter
//!
//! This crate contains the record model, the local and remote replica stores,
//! and the sync engine that keeps one memo converged between a device and a
//! GitHub gist. The CLI is a thin layer over it.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod limit;
pub mod models;
pub mod store;
pub mod sync;
pub mod util;

#[cfg(test)]
mod test_support;

pub use error::{Error, ErrorKind, Result};
pub use limit::InputLimiter;
pub use models::{LimitType, ModifiedBy, Record, Settings};
pub use sync::{
    resolve, Connectivity, LocalEdit, PushScheduler, SyncEngine, SyncFailure, SyncState,
    SyncStatus,
};
