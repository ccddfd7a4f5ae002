use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use tokio::sync::Mutex as AsyncMutex;

use super::*;
use crate::models::{LimitType, ModifiedBy, Record, Settings};
use crate::store::memory::{MemoryLocalStore, MemoryRemoteStore, RemoteFailure};
use crate::store::LocalStore;
use crate::ErrorKind;

type MemoryEngine = SyncEngine<MemoryLocalStore, MemoryRemoteStore>;

fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
}

fn record(revision: u64, body: &str, updated_seconds: i64) -> Record {
    let mut record = Record::new(at(0));
    record.body = body.to_string();
    record.revision = revision;
    record.body_updated_at = at(updated_seconds);
    record
}

fn remote_record(revision: u64, body: &str, updated_seconds: i64) -> Record {
    let mut record = record(revision, body, updated_seconds);
    record.last_modified_by = ModifiedBy::Remote;
    record.last_synced_at = Some(at(updated_seconds));
    record
}

fn engine(
    local: Option<&Record>,
    remote: Option<&Record>,
) -> (MemoryEngine, MemoryLocalStore, MemoryRemoteStore) {
    let local_store = match local {
        Some(record) => MemoryLocalStore::with_record(record).unwrap(),
        None => MemoryLocalStore::new(),
    };
    let remote_store = match remote {
        Some(record) => MemoryRemoteStore::with_record(record).unwrap(),
        None => MemoryRemoteStore::new(),
    };
    let engine = SyncEngine::new(local_store.clone(), remote_store.clone());
    (engine, local_store, remote_store)
}

// ---------------------------------------------------------------------------
// reconcile_on_startup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reconcile_signed_out_creates_local_without_remote_calls() {
    let (mut engine, local, remote) = engine(None, None);
    remote.set_authenticated(false);

    let record = engine.reconcile_on_startup().await.unwrap();

    assert_eq!(record.revision, 0);
    assert_eq!(record.body, "");
    assert_eq!(local.snapshot(), Some(record));
    assert_eq!(remote.reads(), 0);
    assert_eq!(remote.writes(), 0);
    assert_eq!(engine.state(), SyncState::Idle);
}

#[tokio::test]
async fn reconcile_signed_out_returns_local_unchanged() {
    let existing = record(7, "offline notes", 10);
    let (mut engine, local, remote) = engine(Some(&existing), None);
    remote.set_authenticated(false);

    assert_eq!(engine.reconcile_on_startup().await.unwrap(), existing);
    assert_eq!(local.saves(), 0);
}

#[tokio::test]
async fn reconcile_both_absent_initializes_and_pushes() {
    let (mut engine, local, remote) = engine(None, None);

    let record = engine.reconcile_on_startup().await.unwrap();

    assert_eq!(record.revision, 0);
    assert!(record.last_synced_at.is_some());
    assert_eq!(remote.snapshot(), Some(record.clone()));
    assert_eq!(local.snapshot(), Some(record));
    assert_eq!(engine.state(), SyncState::Synced);
}

#[tokio::test]
async fn reconcile_local_only_pushes_and_stamps() {
    let existing = record(2, "draft", 5);
    let (mut engine, local, remote) = engine(Some(&existing), None);

    let record = engine.reconcile_on_startup().await.unwrap();

    assert_eq!(record.body, "draft");
    assert_eq!(record.revision, 2);
    assert!(record.last_synced_at.is_some());
    assert!(!record.needs_sync());
    assert_eq!(remote.snapshot(), Some(record.clone()));
    assert_eq!(local.snapshot(), Some(record));
}

#[tokio::test]
async fn reconcile_remote_only_adopts_verbatim() {
    let cloud = remote_record(9, "from phone", 30);
    let (mut engine, local, remote) = engine(None, Some(&cloud));

    let record = engine.reconcile_on_startup().await.unwrap();

    assert_eq!(record, cloud);
    assert_eq!(local.snapshot(), Some(cloud));
    assert_eq!(remote.writes(), 0);
}

#[tokio::test]
async fn reconcile_divergence_adopts_higher_revision() {
    let (mut engine, local, remote) = engine(
        Some(&record(3, "A", 100)),
        Some(&remote_record(5, "B", 0)),
    );

    let record = engine.reconcile_on_startup().await.unwrap();

    assert_eq!(record.revision, 5);
    assert_eq!(record.body, "B");
    assert_eq!(local.snapshot().unwrap().body, "B");
    assert_eq!(remote.writes(), 0);
    assert_eq!(engine.status().pulls, 1);
}

#[tokio::test]
async fn reconcile_local_newer_pushes() {
    let (mut engine, _local, remote) = engine(
        Some(&record(6, "mine", 0)),
        Some(&remote_record(5, "theirs", 0)),
    );

    let record = engine.reconcile_on_startup().await.unwrap();

    assert_eq!(record.body, "mine");
    assert_eq!(remote.snapshot().unwrap().body, "mine");
    assert_eq!(remote.writes(), 1);
}

#[tokio::test]
async fn reconcile_twice_is_idempotent() {
    let (mut engine, _local, remote) = engine(Some(&record(4, "stable", 3)), None);

    let first = engine.reconcile_on_startup().await.unwrap();
    let second = engine.reconcile_on_startup().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second.revision, 4);
    assert_eq!(remote.writes(), 1);
}

#[tokio::test]
async fn reconcile_identical_replicas_is_not_a_pull() {
    let (mut engine, local, remote) = engine(Some(&record(4, "stable", 3)), None);
    engine.reconcile_on_startup().await.unwrap();
    let saves = local.saves();

    let record = engine.reconcile_on_startup().await.unwrap();

    assert_eq!(local.saves(), saves);
    assert_eq!(remote.writes(), 1);
    assert_eq!(engine.status().pulls, 0);
    assert_eq!(engine.status().pushes, 1);
    assert_eq!(engine.status().last_synced_at, record.last_synced_at);
    assert_eq!(engine.state(), SyncState::Synced);
}

#[tokio::test]
async fn push_onto_identical_remote_saves_nothing() {
    let shared = remote_record(2, "same everywhere", 5);
    let (mut engine, local, remote) = engine(Some(&shared), Some(&shared));

    assert!(engine.push_local_to_remote().await);
    assert_eq!(local.saves(), 0);
    assert_eq!(remote.writes(), 0);
    assert_eq!(engine.status().pulls, 0);
    assert_eq!(engine.status().last_synced_at, Some(at(5)));
}

#[tokio::test]
async fn reconcile_remote_failure_keeps_local() {
    let existing = record(3, "local truth", 0);
    let (mut engine, local, remote) = engine(Some(&existing), None);
    remote.fail_reads(Some(RemoteFailure::Network));

    let failure = engine.reconcile_on_startup().await.unwrap_err();

    assert_eq!(failure.error.kind(), ErrorKind::Network);
    assert_eq!(failure.local, Some(existing.clone()));
    assert_eq!(local.snapshot(), Some(existing));
    assert_eq!(engine.state(), SyncState::Error);
    assert!(engine.status().last_error.is_some());
}

#[tokio::test]
async fn reconcile_rejected_token_is_reported() {
    let (mut engine, _local, remote) = engine(Some(&record(1, "x", 0)), None);
    remote.fail_reads(Some(RemoteFailure::Auth));

    let failure = engine.reconcile_on_startup().await.unwrap_err();
    assert_eq!(failure.error.kind(), ErrorKind::Auth);
}

#[tokio::test]
async fn reconcile_treats_corrupted_local_as_absent() {
    let cloud = remote_record(2, "remote copy", 0);
    let (mut engine, local, _remote) = engine(None, Some(&cloud));
    local.corrupt();

    let record = engine.reconcile_on_startup().await.unwrap();

    assert_eq!(record, cloud);
    assert_eq!(local.snapshot(), Some(cloud));
}

#[tokio::test]
async fn reconcile_storage_failure_keeps_previous_value() {
    let existing = record(1, "old", 0);
    let (mut engine, local, _remote) = engine(Some(&existing), Some(&remote_record(5, "new", 0)));
    local.fail_saves(true);

    let failure = engine.reconcile_on_startup().await.unwrap_err();

    assert_eq!(failure.error.kind(), ErrorKind::Storage);
    assert_eq!(failure.local, Some(existing.clone()));
    assert_eq!(local.snapshot(), Some(existing));
}

// ---------------------------------------------------------------------------
// push_local_to_remote
// ---------------------------------------------------------------------------

#[tokio::test]
async fn push_same_revision_later_local_wins() {
    let (mut engine, local, remote) = engine(
        Some(&record(4, "C", 60)),
        Some(&remote_record(4, "D", 0)),
    );

    assert!(engine.push_local_to_remote().await);

    let pushed = remote.snapshot().unwrap();
    assert_eq!(pushed.body, "C");
    assert_eq!(pushed.revision, 4);
    assert_eq!(local.snapshot(), Some(pushed));
    assert_eq!(engine.status().pushes, 1);
}

#[tokio::test]
async fn push_adopts_strictly_newer_remote() {
    let cloud = remote_record(8, "newer elsewhere", 0);
    let (mut engine, local, remote) = engine(Some(&record(4, "stale", 60)), Some(&cloud));

    assert!(engine.push_local_to_remote().await);

    assert_eq!(remote.writes(), 0);
    assert_eq!(local.snapshot(), Some(cloud));
    assert_eq!(engine.state(), SyncState::Synced);
}

#[tokio::test]
async fn push_ignores_read_failure() {
    let (mut engine, _local, remote) = engine(Some(&record(1, "x", 0)), None);
    remote.fail_reads(Some(RemoteFailure::Network));

    assert!(engine.push_local_to_remote().await);
    assert_eq!(remote.writes(), 1);
}

#[tokio::test]
async fn push_write_failure_leaves_local_untouched() {
    let existing = record(2, "unsent", 0);
    let (mut engine, local, remote) = engine(Some(&existing), None);
    remote.fail_writes(Some(RemoteFailure::Network));

    assert!(!engine.push_local_to_remote().await);

    assert_eq!(local.snapshot(), Some(existing));
    assert_eq!(engine.state(), SyncState::Error);
    assert_eq!(engine.status().failures, 1);
    assert!(engine.needs_sync().await);
}

#[tokio::test]
async fn push_signed_out_is_noop() {
    let (mut engine, _local, remote) = engine(Some(&record(1, "x", 0)), None);
    remote.set_authenticated(false);

    assert!(!engine.push_local_to_remote().await);
    assert_eq!(remote.reads(), 0);
    assert_eq!(engine.state(), SyncState::Idle);
}

#[tokio::test]
async fn push_without_local_record_is_noop() {
    let (mut engine, _local, remote) = engine(None, None);

    assert!(!engine.push_local_to_remote().await);
    assert_eq!(remote.writes(), 0);
    assert_eq!(engine.state(), SyncState::Idle);
}

#[tokio::test]
async fn push_recreates_remote_deleted_mid_session() {
    let (mut engine, _local, remote) = engine(None, None);
    engine.reconcile_on_startup().await.unwrap();
    let first_handle = remote.handle();

    remote.delete_remote();
    engine
        .apply_local_edit(LocalEdit::SetBody("after deletion".to_string()))
        .await
        .unwrap();

    assert!(engine.push_local_to_remote().await);
    assert_eq!(remote.creates(), 2);
    assert_ne!(remote.handle(), first_handle);
    assert_eq!(remote.snapshot().unwrap().body, "after deletion");
}

// ---------------------------------------------------------------------------
// pull_remote_to_local
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pull_without_remote_is_idle() {
    let (mut engine, _local, _remote) = engine(Some(&record(1, "x", 0)), None);

    assert!(!engine.pull_remote_to_local().await.unwrap());
    assert_eq!(engine.state(), SyncState::Idle);
}

#[tokio::test]
async fn pull_signed_out_is_idle() {
    let (mut engine, _local, remote) = engine(None, Some(&remote_record(1, "x", 0)));
    remote.set_authenticated(false);

    assert!(!engine.pull_remote_to_local().await.unwrap());
    assert_eq!(remote.reads(), 0);
}

#[tokio::test]
async fn pull_adopts_newer_remote() {
    let cloud = remote_record(3, "pulled", 0);
    let (mut engine, local, _remote) = engine(Some(&record(1, "old", 0)), Some(&cloud));

    assert!(engine.pull_remote_to_local().await.unwrap());
    assert_eq!(local.snapshot(), Some(cloud));
}

#[tokio::test]
async fn pull_keeps_newer_local_without_writing_remote() {
    let existing = record(5, "mine", 0);
    let (mut engine, local, remote) = engine(Some(&existing), Some(&remote_record(3, "old", 0)));

    assert!(engine.pull_remote_to_local().await.unwrap());
    assert_eq!(local.snapshot(), Some(existing));
    assert_eq!(remote.writes(), 0);
}

#[tokio::test]
async fn pull_keeping_local_does_not_rewrite_it() {
    let mut existing = record(5, "mine", 4);
    existing.last_synced_at = Some(at(2));
    let (mut engine, local, _remote) = engine(Some(&existing), Some(&remote_record(3, "old", 1)));

    assert!(engine.pull_remote_to_local().await.unwrap());
    assert_eq!(local.saves(), 0);
    assert_eq!(engine.status().pulls, 0);
    assert_eq!(engine.status().last_synced_at, Some(at(2)));
    assert_eq!(engine.state(), SyncState::Synced);
}

#[tokio::test]
async fn pull_failure_is_reported() {
    let (mut engine, _local, remote) = engine(None, Some(&remote_record(1, "x", 0)));
    remote.fail_reads(Some(RemoteFailure::Auth));

    let failure = engine.pull_remote_to_local().await.unwrap_err();
    assert_eq!(failure.error.kind(), ErrorKind::Auth);
    assert_eq!(failure.local, None);
    assert_eq!(engine.state(), SyncState::Error);
}

// ---------------------------------------------------------------------------
// Local edits and status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn local_edits_bump_revision_once_each() {
    let (mut engine, local, _remote) = engine(None, None);

    let first = engine
        .apply_local_edit(LocalEdit::SetBody("one".to_string()))
        .await
        .unwrap();
    let second = engine
        .apply_local_edit(LocalEdit::AppendBody("two".to_string()))
        .await
        .unwrap();
    let unchanged = engine
        .apply_local_edit(LocalEdit::SetBody("one\ntwo".to_string()))
        .await
        .unwrap();
    let settings = engine
        .apply_local_edit(LocalEdit::SetSettings(Settings::new(LimitType::Byte, 64)))
        .await
        .unwrap();

    assert_eq!(first.revision, 1);
    assert_eq!(second.revision, 2);
    assert_eq!(unchanged.revision, 2);
    assert_eq!(settings.revision, 3);
    assert_eq!(local.snapshot().unwrap().body, "one\ntwo");
}

#[tokio::test]
async fn needs_sync_tracks_edits_and_pushes() {
    let (mut engine, _local, _remote) = engine(None, None);
    assert!(!engine.needs_sync().await);

    engine
        .apply_local_edit(LocalEdit::SetBody("pending".to_string()))
        .await
        .unwrap();
    assert!(engine.needs_sync().await);

    assert!(engine.push_local_to_remote().await);
    assert!(!engine.needs_sync().await);
}

#[tokio::test]
async fn adopting_remote_keeps_its_revision() {
    let cloud = remote_record(42, "carried", 0);
    let (mut engine, local, _remote) = engine(None, Some(&cloud));

    engine.reconcile_on_startup().await.unwrap();

    let adopted = local.snapshot().unwrap();
    assert_eq!(adopted.revision, 42);
    assert_eq!(adopted.last_modified_by, ModifiedBy::Remote);
    assert!(!adopted.needs_sync());
}

#[tokio::test]
async fn wipe_local_resets_to_zero_state() {
    let (mut engine, local, remote) = engine(Some(&record(9, "gone", 0)), None);

    let fresh = engine.wipe_local().await.unwrap();

    assert_eq!(fresh.revision, 0);
    assert_eq!(fresh.body, "");
    assert_eq!(local.load().await.unwrap(), Some(fresh));
    assert_eq!(remote.writes(), 0);
}

#[tokio::test]
async fn subscribers_see_state_changes() {
    let (mut engine, _local, _remote) = engine(Some(&record(1, "x", 0)), None);
    let mut updates = engine.subscribe();

    engine.push_local_to_remote().await;

    assert!(updates.has_changed().unwrap());
    let status = updates.borrow_and_update().clone();
    assert_eq!(status.state, SyncState::Synced);
    assert_eq!(status.pushes, 1);
    assert!(status.last_synced_at.is_some());
}

// ---------------------------------------------------------------------------
// PushScheduler
// ---------------------------------------------------------------------------

const DEBOUNCE: Duration = Duration::from_secs(3);

async fn scheduler(
    online: bool,
) -> (
    PushScheduler<MemoryLocalStore, MemoryRemoteStore>,
    MemoryRemoteStore,
) {
    let (mut engine, _local, remote) = engine(None, None);
    engine
        .apply_local_edit(LocalEdit::SetBody("typed".to_string()))
        .await
        .unwrap();
    let scheduler = PushScheduler::new(
        Arc::new(AsyncMutex::new(engine)),
        DEBOUNCE,
        Connectivity::new(online),
    );
    (scheduler, remote)
}

#[tokio::test(start_paused = true)]
async fn scheduler_coalesces_bursts() {
    let (scheduler, remote) = scheduler(true).await;

    scheduler.schedule();
    tokio::time::sleep(Duration::from_secs(1)).await;
    scheduler.schedule();
    tokio::time::sleep(Duration::from_secs(1)).await;
    scheduler.schedule();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(remote.writes(), 0);
    assert!(scheduler.is_pending());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(remote.writes(), 1);
    assert!(!scheduler.is_pending());
}

#[tokio::test(start_paused = true)]
async fn scheduler_skips_while_offline() {
    let (scheduler, remote) = scheduler(false).await;

    scheduler.schedule();
    tokio::time::sleep(DEBOUNCE * 2).await;

    assert_eq!(remote.reads(), 0);
    assert_eq!(remote.writes(), 0);

    scheduler.connectivity().set_online(true);
    scheduler.schedule();
    tokio::time::sleep(DEBOUNCE * 2).await;
    assert_eq!(remote.writes(), 1);
}

#[tokio::test(start_paused = true)]
async fn scheduler_cancel_drops_pending_push() {
    let (scheduler, remote) = scheduler(true).await;

    scheduler.schedule();
    assert!(scheduler.cancel());
    assert!(!scheduler.cancel());

    tokio::time::sleep(DEBOUNCE * 2).await;
    assert_eq!(remote.writes(), 0);
}

#[tokio::test(start_paused = true)]
async fn scheduler_flush_pushes_immediately() {
    let (scheduler, remote) = scheduler(true).await;

    assert!(!scheduler.flush().await);

    scheduler.schedule();
    assert!(scheduler.flush().await);
    assert_eq!(remote.writes(), 1);

    tokio::time::sleep(DEBOUNCE * 2).await;
    assert_eq!(remote.writes(), 1);
}
