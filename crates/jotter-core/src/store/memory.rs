//! In-memory replica stores.
//!
//! Both stores keep the record as serialized JSON so that every load goes
//! through the same decode path as the real backends. Clones share state,
//! which lets a test keep a handle after moving a store into an engine.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{HandleStore, LocalStore, RemoteStore};
use crate::error::{Error, Result};
use crate::models::Record;

fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct LocalState {
    raw: Option<String>,
    fail_saves: bool,
    saves: usize,
}

/// Local replica held in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLocalStore {
    state: Arc<Mutex<LocalState>>,
}

impl MemoryLocalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with an existing record.
    pub fn with_record(record: &Record) -> Result<Self> {
        let store = Self::new();
        lock(&store.state).raw = Some(record.to_json()?);
        Ok(store)
    }

    /// Replace the stored blob with something that will not decode.
    pub fn corrupt(&self) {
        lock(&self.state).raw = Some("{\"memo\":".to_string());
    }

    /// Make every subsequent `save` fail with a storage error.
    pub fn fail_saves(&self, fail: bool) {
        lock(&self.state).fail_saves = fail;
    }

    /// Number of successful saves
    pub fn saves(&self) -> usize {
        lock(&self.state).saves
    }

    /// Decoded snapshot, bypassing the store contract.
    pub fn snapshot(&self) -> Option<Record> {
        lock(&self.state)
            .raw
            .as_deref()
            .and_then(|raw| Record::from_json(raw).ok())
    }
}

impl LocalStore for MemoryLocalStore {
    async fn load(&self) -> Result<Option<Record>> {
        let raw = lock(&self.state).raw.clone();
        raw.map(|raw| Record::from_json(&raw)).transpose()
    }

    async fn save(&self, record: &Record) -> Result<()> {
        let raw = record.to_json()?;
        let mut state = lock(&self.state);
        if state.fail_saves {
            return Err(Error::Storage("local store is read-only".to_string()));
        }
        state.raw = Some(raw);
        state.saves += 1;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        lock(&self.state).raw = None;
        Ok(())
    }
}

/// Failure a [`MemoryRemoteStore`] can be told to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFailure {
    Auth,
    Network,
}

impl RemoteFailure {
    fn to_error(self, operation: &str) -> Error {
        match self {
            Self::Auth => Error::Auth(format!("{operation} rejected: bad credentials")),
            Self::Network => Error::Network(format!("{operation} failed: service unavailable")),
        }
    }
}

#[derive(Debug)]
struct RemoteState {
    authenticated: bool,
    /// Objects keyed by handle, the way a gist service holds them
    objects: Vec<(u64, String)>,
    /// Handle the client side has cached
    handle: Option<u64>,
    next_handle: u64,
    read_failure: Option<RemoteFailure>,
    write_failure: Option<RemoteFailure>,
    reads: usize,
    writes: usize,
    creates: usize,
}

impl Default for RemoteState {
    fn default() -> Self {
        Self {
            authenticated: true,
            objects: Vec::new(),
            handle: None,
            next_handle: 1,
            read_failure: None,
            write_failure: None,
            reads: 0,
            writes: 0,
            creates: 0,
        }
    }
}

impl RemoteState {
    fn current(&self) -> Option<&str> {
        let handle = self.handle?;
        self.objects
            .iter()
            .find(|(id, _)| *id == handle)
            .map(|(_, raw)| raw.as_str())
    }
}

/// Remote replica held in process memory.
///
/// Mimics handle semantics: the first write creates an object, later writes
/// update it, and an object deleted behind the store's back reads as absent
/// and is recreated on the next write.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemoteStore {
    state: Arc<Mutex<RemoteState>>,
}

impl MemoryRemoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Authenticated store already holding `record`.
    pub fn with_record(record: &Record) -> Result<Self> {
        let store = Self::new();
        store.put(record)?;
        Ok(store)
    }

    /// Overwrite the remote object directly, as another device would.
    pub fn put(&self, record: &Record) -> Result<()> {
        let raw = record.to_json()?;
        let mut state = lock(&self.state);
        if let Some(handle) = state.handle {
            if let Some(object) = state.objects.iter_mut().find(|(id, _)| *id == handle) {
                object.1 = raw;
                return Ok(());
            }
        }
        let handle = state.next_handle;
        state.next_handle += 1;
        state.objects.push((handle, raw));
        state.handle = Some(handle);
        Ok(())
    }

    /// Delete the remote object without telling the client side.
    pub fn delete_remote(&self) {
        let mut state = lock(&self.state);
        state.objects.clear();
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        lock(&self.state).authenticated = authenticated;
    }

    pub fn fail_reads(&self, failure: Option<RemoteFailure>) {
        lock(&self.state).read_failure = failure;
    }

    pub fn fail_writes(&self, failure: Option<RemoteFailure>) {
        lock(&self.state).write_failure = failure;
    }

    /// Read attempts, failed ones included
    pub fn reads(&self) -> usize {
        lock(&self.state).reads
    }

    /// Write attempts, failed ones included
    pub fn writes(&self) -> usize {
        lock(&self.state).writes
    }

    /// Writes that had to create a fresh object
    pub fn creates(&self) -> usize {
        lock(&self.state).creates
    }

    pub fn handle(&self) -> Option<u64> {
        lock(&self.state).handle
    }

    /// Decoded snapshot, bypassing auth and counters.
    pub fn snapshot(&self) -> Option<Record> {
        lock(&self.state)
            .current()
            .and_then(|raw| Record::from_json(raw).ok())
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn is_authenticated(&self) -> bool {
        lock(&self.state).authenticated
    }

    async fn read(&self) -> Result<Option<Record>> {
        let raw = {
            let mut state = lock(&self.state);
            state.reads += 1;
            if !state.authenticated {
                return Err(Error::Auth("not authenticated".to_string()));
            }
            if let Some(failure) = state.read_failure {
                return Err(failure.to_error("read"));
            }
            let raw = state.current().map(str::to_string);
            if raw.is_none() {
                state.handle = None;
            }
            raw
        };
        raw.map(|raw| Record::from_json(&raw)).transpose()
    }

    async fn write(&self, record: &Record) -> Result<()> {
        let raw = record.to_json()?;
        let mut state = lock(&self.state);
        state.writes += 1;
        if !state.authenticated {
            return Err(Error::Auth("not authenticated".to_string()));
        }
        if let Some(failure) = state.write_failure {
            return Err(failure.to_error("write"));
        }

        let handle = state.handle;
        if let Some(object) = handle.and_then(|handle| {
            state.objects.iter_mut().find(|(id, _)| *id == handle)
        }) {
            object.1 = raw;
            return Ok(());
        }

        let handle = state.next_handle;
        state.next_handle += 1;
        state.objects.push((handle, raw));
        state.handle = Some(handle);
        state.creates += 1;
        Ok(())
    }
}

/// Handle storage held in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryHandleStore {
    handle: Arc<Mutex<Option<String>>>,
}

impl MemoryHandleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl HandleStore for MemoryHandleStore {
    async fn load_handle(&self) -> Result<Option<String>> {
        Ok(lock(&self.handle).clone())
    }

    async fn save_handle(&self, handle: &str) -> Result<()> {
        *lock(&self.handle) = Some(handle.to_string());
        Ok(())
    }

    async fn clear_handle(&self) -> Result<()> {
        *lock(&self.handle) = None;
        Ok(())
    }
}
