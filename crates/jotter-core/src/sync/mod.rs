//! Keeping the local and remote replicas converged.
//!
//! [`resolve`] decides which copy wins, [`SyncEngine`] moves records between
//! the stores, and [`PushScheduler`] debounces pushes after local edits.

mod engine;
mod resolve;
mod scheduler;
mod status;

#[cfg(test)]
mod tests;

pub use engine::{LocalEdit, SyncEngine, SyncFailure};
pub use resolve::{compare, resolve, Winner};
pub use scheduler::{Connectivity, PushScheduler};
pub use status::{SyncState, SyncStatus};
