//! Integration tests for the coordinator and stopwatch working together.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{TimeZone, Utc};
use cravingstop_core::timer::{Stopwatch, TimerState};
use cravingstop_core::{
    AppendOutcome, Authority, Identity, ManualClock, MemoryLocalStore, MemoryRemoteStore,
    NoticeKind, RemoteError, SyncCoordinator,
};
use serde_json::json;

fn clock() -> Rc<ManualClock> {
    Rc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap(),
    ))
}

#[test]
fn test_identity_never_available_logs_locally() {
    let mut sync = SyncCoordinator::new(MemoryLocalStore::new()).with_remote(MemoryRemoteStore::new());
    let authorities = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&authorities);
    let _handle = sync.subscribe(move |view| seen.borrow_mut().push(view.authority));

    sync.on_identity_unavailable();
    let outcome = sync.append(5000);

    assert!(matches!(outcome, AppendOutcome::Local { .. }));
    assert_eq!(sync.records().len(), 1);
    assert_eq!(sync.records()[0].duration_ms, 5000);
    assert!(authorities.borrow().iter().all(|a| *a == Authority::Local));
}

#[test]
fn test_remote_append_arrives_with_next_snapshot() {
    let remote = MemoryRemoteStore::new();
    let handle = remote.clone();
    let me = Identity::new("craving-user");
    let mut sync = SyncCoordinator::new(MemoryLocalStore::new()).with_remote(remote);

    sync.on_identity_available(me.clone());
    assert_eq!(sync.authority(), Authority::Remote);
    assert!(sync.records().is_empty());

    assert_eq!(sync.append(1200), AppendOutcome::Remote);
    assert_eq!(sync.records().len(), 1);
    assert_eq!(sync.records()[0].duration_ms, 1200);
    assert_eq!(sync.authority(), Authority::Remote);
    assert_eq!(handle.collection(&me).len(), 1);
}

#[test]
fn test_subscription_error_falls_back_and_appends_locally() {
    let remote = MemoryRemoteStore::new();
    let handle = remote.clone();
    let me = Identity::new("craving-user");
    let local = Rc::new(MemoryLocalStore::new());
    let mut sync = SyncCoordinator::new(Rc::clone(&local)).with_remote(remote);

    sync.on_identity_available(me.clone());
    handle.push_error(&me, RemoteError::Rejected("permission denied".into()));
    sync.pump();

    assert_eq!(sync.authority(), Authority::Local);
    assert_eq!(sync.notice().unwrap().kind, NoticeKind::SubscribeFailed);

    assert!(matches!(sync.append(3000), AppendOutcome::Local { .. }));
    assert_eq!(sync.records()[0].duration_ms, 3000);

    // Visible to a fresh session with no identity at all.
    let mut later = SyncCoordinator::new(Rc::clone(&local));
    later.on_identity_unavailable();
    assert_eq!(later.records().len(), 1);
    assert_eq!(later.records()[0].duration_ms, 3000);
}

#[test]
fn test_double_click_never_appends() {
    let mut sync = SyncCoordinator::new(MemoryLocalStore::new());
    sync.on_identity_unavailable();
    let mut sw = Stopwatch::new();

    sw.click(10_000, &mut sync);
    sw.click(10_200, &mut sync);
    sw.tick(11_000);

    assert_eq!(sw.state(), TimerState::Idle);
    assert_eq!(sw.elapsed_ms(), 0);
    assert!(sync.records().is_empty());
}

#[test]
fn test_single_click_runs_and_stop_appends() {
    let mut sync = SyncCoordinator::new(MemoryLocalStore::new());
    sync.on_identity_unavailable();
    let mut sw = Stopwatch::new();

    sw.click(0, &mut sync);
    let mut now = 0;
    while now < 550 {
        now += 10;
        sw.tick(now);
    }
    assert_eq!(sw.state(), TimerState::Running);
    let elapsed = sw.elapsed_ms();
    assert!((290..=310).contains(&elapsed), "elapsed {elapsed}");

    sw.click(now, &mut sync);
    assert_eq!(sw.state(), TimerState::Idle);
    assert_eq!(sync.records().len(), 1);
    assert_eq!(sync.records()[0].duration_ms, elapsed);
}

#[test]
fn test_malformed_remote_items_are_excluded() {
    let remote = MemoryRemoteStore::new();
    let handle = remote.clone();
    let me = Identity::new("craving-user");
    handle.insert_raw(&me, json!({"id": "ok", "durationMs": 10, "occurredAt": "2025-01-01T00:00:00Z"}));
    handle.insert_raw(&me, json!({"id": "no-date", "durationMs": 10}));
    handle.insert_raw(&me, json!({"id": "bad-date", "durationMs": 10, "occurredAt": "yesterday"}));
    handle.insert_raw(&me, json!("just a string"));

    let mut sync = SyncCoordinator::new(MemoryLocalStore::new()).with_remote(remote);
    let views = Rc::new(RefCell::new(0));
    let seen = Rc::clone(&views);
    let _handle = sync.subscribe(move |_| *seen.borrow_mut() += 1);

    sync.on_identity_available(me);
    assert_eq!(sync.authority(), Authority::Remote);
    let ids: Vec<&str> = sync.records().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["ok"]);
    assert!(*views.borrow() >= 2);
}

#[test]
fn test_snapshots_replace_rather_than_merge() {
    let clock = clock();
    let local = MemoryLocalStore::new();
    let remote = MemoryRemoteStore::with_clock(clock.clone());
    let me = Identity::new("craving-user");
    let mut sync = SyncCoordinator::new(local)
        .with_remote(remote.clone())
        .with_clock(Rc::clone(&clock));

    sync.on_identity_unavailable();
    sync.append(111);
    sync.append(222);
    assert_eq!(sync.records().len(), 2);

    sync.on_identity_available(me.clone());
    assert!(sync.records().is_empty());

    clock.advance_ms(1_000);
    sync.append(333);
    let durations: Vec<u64> = sync.records().iter().map(|r| r.duration_ms).collect();
    assert_eq!(durations, vec![333]);

    // Back to local: the remote record is gone, the local ones return.
    sync.on_identity_unavailable();
    let durations: Vec<u64> = sync.records().iter().map(|r| r.duration_ms).collect();
    assert_eq!(durations, vec![222, 111]);
}

#[test]
fn test_each_disposer_stops_only_its_observer() {
    let mut sync = SyncCoordinator::new(MemoryLocalStore::new());
    sync.on_identity_unavailable();

    let counts = Rc::new(RefCell::new([0usize; 3]));
    let mut handles = Vec::new();
    for i in 0..3 {
        let c = Rc::clone(&counts);
        handles.push(sync.subscribe(move |_| c.borrow_mut()[i] += 1));
    }
    assert_eq!(sync.observer_count(), 3);

    let middle = handles.remove(1);
    middle.unsubscribe();
    sync.append(5);

    assert_eq!(*counts.borrow(), [2, 1, 2]);
    assert_eq!(sync.observer_count(), 2);
}

#[test]
fn test_identity_switch_cancels_previous_subscription() {
    let remote = MemoryRemoteStore::new();
    let handle = remote.clone();
    let mut sync = SyncCoordinator::new(MemoryLocalStore::new()).with_remote(remote);

    sync.on_identity_available(Identity::new("a"));
    sync.on_identity_available(Identity::new("b"));
    assert_eq!(handle.subscriber_count(), 1);

    sync.on_identity_unavailable();
    assert_eq!(handle.subscriber_count(), 0);
}

#[test]
fn test_shutdown_and_drop_release_subscription() {
    let remote = MemoryRemoteStore::new();
    let handle = remote.clone();

    let mut sync = SyncCoordinator::new(MemoryLocalStore::new()).with_remote(remote.clone());
    sync.on_identity_available(Identity::new("a"));
    sync.shutdown();
    assert_eq!(handle.subscriber_count(), 0);

    let mut other = SyncCoordinator::new(MemoryLocalStore::new()).with_remote(remote);
    other.on_identity_available(Identity::new("a"));
    assert_eq!(handle.subscriber_count(), 1);
    drop(other);
    assert_eq!(handle.subscriber_count(), 0);
}
