//! Debounced background pushes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use super::engine::SyncEngine;
use crate::store::{LocalStore, RemoteStore};

/// Shared online/offline flag. Scheduled pushes are skipped while offline.
#[derive(Debug, Clone)]
pub struct Connectivity(Arc<AtomicBool>);

impl Connectivity {
    #[must_use]
    pub fn new(online: bool) -> Self {
        Self(Arc::new(AtomicBool::new(online)))
    }

    pub fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set_online(&self, online: bool) {
        self.0.store(online, Ordering::SeqCst);
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

struct PendingPush {
    task: JoinHandle<bool>,
    /// Claimed either by the task when its window elapses or by a canceller,
    /// whichever comes first
    fired: Arc<AtomicBool>,
}

impl PendingPush {
    /// Abort only while still waiting; a push in flight runs to completion.
    fn cancel(self) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            false
        } else {
            self.task.abort();
            true
        }
    }
}

/// Coalesces bursts of local edits into one push after a quiet period.
///
/// Each [`schedule`](Self::schedule) call restarts the timer. The engine is
/// shared behind an async mutex, so a scheduled push never overlaps another
/// engine operation.
pub struct PushScheduler<L, R> {
    engine: Arc<AsyncMutex<SyncEngine<L, R>>>,
    debounce: Duration,
    connectivity: Connectivity,
    pending: Mutex<Option<PendingPush>>,
}

impl<L, R> PushScheduler<L, R>
where
    L: LocalStore + 'static,
    R: RemoteStore + 'static,
{
    pub fn new(
        engine: Arc<AsyncMutex<SyncEngine<L, R>>>,
        debounce: Duration,
        connectivity: Connectivity,
    ) -> Self {
        Self {
            engine,
            debounce,
            connectivity,
            pending: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &Arc<AsyncMutex<SyncEngine<L, R>>> {
        &self.engine
    }

    pub const fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// Schedule a push after the debounce window, replacing any push that
    /// has not fired yet. Must be called from within a Tokio runtime.
    pub fn schedule(&self) {
        let engine = Arc::clone(&self.engine);
        let connectivity = self.connectivity.clone();
        let debounce = self.debounce;
        let fired = Arc::new(AtomicBool::new(false));
        let task_fired = Arc::clone(&fired);

        let task = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if task_fired.swap(true, Ordering::SeqCst) {
                return false;
            }
            if !connectivity.is_online() {
                tracing::debug!("Offline; skipping scheduled push");
                return false;
            }
            let pushed = engine.lock().await.push_local_to_remote().await;
            tracing::debug!("Scheduled push finished (pushed: {pushed})");
            pushed
        });

        if let Some(previous) = self.replace_pending(Some(PendingPush { task, fired })) {
            previous.cancel();
        }
    }

    /// Drop the pending push, if it has not started. Returns whether one
    /// was cancelled.
    pub fn cancel(&self) -> bool {
        self.replace_pending(None)
            .is_some_and(PendingPush::cancel)
    }

    /// True while a scheduled push is waiting or running.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|pending| !pending.task.is_finished())
    }

    /// Run a waiting push now instead of at the end of its window, or wait
    /// for one that already started.
    ///
    /// Returns `false` without pushing when nothing was scheduled or when
    /// offline.
    pub async fn flush(&self) -> bool {
        let Some(pending) = self.replace_pending(None) else {
            return false;
        };
        if pending.fired.swap(true, Ordering::SeqCst) {
            return pending.task.await.unwrap_or(false);
        }

        pending.task.abort();
        if !self.connectivity.is_online() {
            tracing::debug!("Offline; dropping flushed push");
            return false;
        }
        self.engine.lock().await.push_local_to_remote().await
    }

    fn replace_pending(&self, next: Option<PendingPush>) -> Option<PendingPush> {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *pending, next)
    }
}

impl<L, R> Drop for PushScheduler<L, R> {
    fn drop(&mut self) {
        let pending = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(pending) = pending {
            pending.cancel();
        }
    }
}
