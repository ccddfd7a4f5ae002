//! Two-replica sync engine.

use chrono::Utc;
use thiserror::Error;
use tokio::sync::watch;

use super::resolve::{compare, Winner};
use super::status::{SyncState, SyncStatus};
use crate::error::{Error, Result};
use crate::models::{Record, Settings};
use crate::store::{LocalStore, RemoteStore};

/// A failed reconcile or pull, with the best local snapshot available.
#[derive(Debug, Error)]
#[error("sync failed: {error}")]
pub struct SyncFailure {
    #[source]
    pub error: Error,
    /// Local record as it stood when the operation gave up
    pub local: Option<Record>,
}

/// A mutation applied to the local replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalEdit {
    SetBody(String),
    AppendBody(String),
    SetSettings(Settings),
}

/// Coordinates one local and one remote replica of the record.
///
/// Every operation takes `&mut self`, so a single engine can never run two
/// operations at once. Share it behind an async mutex when a scheduler needs
/// to call it from a background task.
pub struct SyncEngine<L, R> {
    local: L,
    remote: R,
    status: watch::Sender<SyncStatus>,
}

impl<L: LocalStore, R: RemoteStore> SyncEngine<L, R> {
    pub fn new(local: L, remote: R) -> Self {
        let (status, _) = watch::channel(SyncStatus::default());
        Self {
            local,
            remote,
            status,
        }
    }

    pub const fn local(&self) -> &L {
        &self.local
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    pub fn state(&self) -> SyncState {
        self.status.borrow().state
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// Receiver that sees every status change from now on.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Converge both replicas at session start.
    ///
    /// Without a token the local record is returned (created if missing) and
    /// the remote is never contacted. A remote failure leaves local untouched
    /// and is reported with the local snapshot attached.
    pub async fn reconcile_on_startup(&mut self) -> std::result::Result<Record, SyncFailure> {
        if !self.remote.is_authenticated() {
            return match self.load_or_initialize().await {
                Ok(record) => {
                    tracing::debug!("Not signed in; using local record only");
                    self.set_state(SyncState::Idle);
                    Ok(record)
                }
                Err(error) => Err(self.fail(error, None)),
            };
        }

        self.set_state(SyncState::Syncing);

        let local = match self.load_local().await {
            Ok(local) => local,
            Err(error) => return Err(self.fail(error, None)),
        };
        let remote = match self.read_remote().await {
            Ok(remote) => remote,
            Err(error) => return Err(self.fail(error, local)),
        };

        let result = match (local.clone(), remote) {
            (None, None) => match self.local.initialize().await {
                Ok(fresh) => self.push(&fresh).await,
                Err(error) => Err(error),
            },
            (Some(local), None) => self.push(&local).await,
            (None, Some(remote)) => self.adopt(remote, None).await,
            (Some(local), Some(remote)) => match compare(&local, &remote) {
                Winner::A => self.push(&local).await,
                Winner::B => self.adopt(remote, Some(&local)).await,
            },
        };

        match result {
            Ok(record) => Ok(record),
            Err(error) => {
                let snapshot = self.last_known_local(local).await;
                Err(self.fail(error, snapshot))
            }
        }
    }

    /// Publish the local record, unless the remote turns out to be newer, in
    /// which case the remote copy is adopted instead.
    ///
    /// Returns `true` when the replicas converged. Failures are recorded in
    /// the status and reported as `false`.
    pub async fn push_local_to_remote(&mut self) -> bool {
        if !self.remote.is_authenticated() {
            self.set_state(SyncState::Idle);
            return false;
        }

        let local = match self.load_local().await {
            Ok(Some(local)) => local,
            Ok(None) => {
                self.set_state(SyncState::Idle);
                return false;
            }
            Err(error) => {
                self.fail(error, None);
                return false;
            }
        };

        self.set_state(SyncState::Syncing);

        let remote = match self.read_remote().await {
            Ok(remote) => remote,
            Err(error) => {
                tracing::warn!("Remote read before push failed, pushing anyway: {error}");
                None
            }
        };

        let result = match remote {
            Some(remote) if compare(&local, &remote) == Winner::B => {
                self.adopt(remote, Some(&local)).await
            }
            _ => self.push(&local).await,
        };

        match result {
            Ok(_) => true,
            Err(error) => {
                self.fail(error, Some(local));
                false
            }
        }
    }

    /// Bring a newer remote copy down. Returns `Ok(false)` when signed out or
    /// when there is nothing remote to pull.
    pub async fn pull_remote_to_local(&mut self) -> std::result::Result<bool, SyncFailure> {
        if !self.remote.is_authenticated() {
            self.set_state(SyncState::Idle);
            return Ok(false);
        }

        self.set_state(SyncState::Syncing);

        let local = match self.load_local().await {
            Ok(local) => local,
            Err(error) => return Err(self.fail(error, None)),
        };
        let remote = match self.read_remote().await {
            Ok(Some(remote)) => remote,
            Ok(None) => {
                self.set_state(SyncState::Idle);
                return Ok(false);
            }
            Err(error) => return Err(self.fail(error, local)),
        };

        let result = match &local {
            Some(current) if compare(current, &remote) == Winner::A => {
                tracing::debug!("Local record is newer than remote; keeping it");
                Ok(self.keep(current))
            }
            _ => self.adopt(remote, local.as_ref()).await,
        };

        match result {
            Ok(_) => Ok(true),
            Err(error) => Err(self.fail(error, local)),
        }
    }

    /// True when the local record carries an edit the remote has not seen.
    /// An unreadable or missing local record never needs sync.
    pub async fn needs_sync(&self) -> bool {
        match self.load_local().await {
            Ok(Some(record)) => record.needs_sync(),
            Ok(None) | Err(_) => false,
        }
    }

    /// Apply a local mutation and persist it. The remote is not contacted;
    /// schedule a push afterwards.
    pub async fn apply_local_edit(&mut self, edit: LocalEdit) -> Result<Record> {
        let mut record = self.load_or_initialize().await?;
        let now = Utc::now();

        let changed = match edit {
            LocalEdit::SetBody(body) => record.set_body(body, now),
            LocalEdit::AppendBody(line) => record.append_body(&line, now),
            LocalEdit::SetSettings(settings) => record.set_settings(settings, now),
        };

        if changed {
            self.local.save(&record).await?;
            tracing::debug!("Saved local edit at revision {}", record.revision);
        }
        Ok(record)
    }

    /// Drop the local replica and start over from a zero-state record.
    pub async fn wipe_local(&mut self) -> Result<Record> {
        self.local.clear().await?;
        let record = self.local.initialize().await?;
        tracing::info!("Local record wiped");
        Ok(record)
    }

    /// Write a stamped copy to the remote, then the same copy locally, so
    /// both replicas end up identical.
    async fn push(&self, record: &Record) -> Result<Record> {
        let stamped = record.stamped_synced(Utc::now());
        self.remote.write(&stamped).await?;
        self.local.save(&stamped).await?;

        tracing::info!("Pushed local record at revision {}", stamped.revision);
        self.status.send_modify(|status| {
            status.state = SyncState::Synced;
            status.last_synced_at = stamped.last_synced_at;
            status.last_error = None;
            status.pushes += 1;
        });
        Ok(stamped)
    }

    /// Store a remote record locally, verbatim. A remote identical to
    /// `current` is not a pull.
    async fn adopt(&self, record: Record, current: Option<&Record>) -> Result<Record> {
        if current == Some(&record) {
            tracing::debug!("Replicas already identical at revision {}", record.revision);
            return Ok(self.keep(&record));
        }
        self.local.save(&record).await?;

        tracing::info!("Adopted remote record at revision {}", record.revision);
        self.status.send_modify(|status| {
            status.state = SyncState::Synced;
            status.last_synced_at = record.last_synced_at;
            status.last_error = None;
            status.pulls += 1;
        });
        Ok(record)
    }

    /// Leave the stored local record untouched and report it as current.
    fn keep(&self, record: &Record) -> Record {
        self.status.send_modify(|status| {
            status.state = SyncState::Synced;
            status.last_synced_at = record.last_synced_at;
            status.last_error = None;
        });
        record.clone()
    }

    async fn load_local(&self) -> Result<Option<Record>> {
        match self.local.load().await {
            Err(error) if error.is_decode() => {
                tracing::warn!("Local record is unreadable, treating it as absent: {error}");
                Ok(None)
            }
            other => other,
        }
    }

    async fn read_remote(&self) -> Result<Option<Record>> {
        match self.remote.read().await {
            Err(error) if error.is_decode() => {
                tracing::warn!("Remote record is unreadable, treating it as absent: {error}");
                Ok(None)
            }
            other => other,
        }
    }

    async fn load_or_initialize(&self) -> Result<Record> {
        match self.load_local().await? {
            Some(record) => Ok(record),
            None => self.local.initialize().await,
        }
    }

    /// Reload local after a failure, falling back to the pre-operation copy.
    async fn last_known_local(&self, fallback: Option<Record>) -> Option<Record> {
        match self.load_local().await {
            Ok(Some(record)) => Some(record),
            Ok(None) | Err(_) => fallback,
        }
    }

    fn set_state(&self, state: SyncState) {
        self.status.send_if_modified(|status| {
            let changed = status.state != state;
            status.state = state;
            changed
        });
    }

    fn fail(&self, error: Error, local: Option<Record>) -> SyncFailure {
        tracing::warn!("Sync failed: {error}");
        let message = error.to_string();
        self.status.send_modify(|status| {
            status.state = SyncState::Error;
            status.last_error = Some(message);
            status.failures += 1;
        });
        SyncFailure { error, local }
    }
}
