//! Client Lifecycle Tests
//!
//! Degraded single-context mode, destroy semantics, and the
//! clean-then-restart round trip.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use crosslog::{
    ClientConfig, ClientError, ClientEvent, Clock, CoordinatedClient, ElectionTiming, EventKind,
    MemoryMedium, MutationKind, NullSyncEngine, Role, SyncEngine,
};

async fn advance_ms(total: u64) {
    // Let tasks spawned just before this call (e.g. by start()) get polled
    // so they register their timers against the pre-advance clock.
    settle().await;
    let mut remaining = total;
    while remaining > 0 {
        let step = remaining.min(250);
        tokio::time::advance(Duration::from_millis(step)).await;
        remaining -= step;
        // Let woken timer callbacks run (and re-arm) before the next step.
        settle().await;
    }
}

/// Drive the current-thread paused-time runtime so spawned timer tasks
/// register and fire their callbacks before we observe state.
async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

fn paused_clock() -> Clock {
    let origin = tokio::time::Instant::now();
    Clock::from_fn(move || origin.elapsed().as_millis() as i64)
}

fn client_on(medium: &MemoryMedium, clock: &Clock) -> (CoordinatedClient, Arc<NullSyncEngine>) {
    let sync = Arc::new(NullSyncEngine::new());
    let mut config = ClientConfig::new("wss://example.com", "1.0.0");
    config.user_scope = Some("user".to_string());
    config.medium = Some(Arc::new(medium.attach()));
    config.clock = clock.clone();
    config.sync = Some(Arc::clone(&sync) as Arc<dyn SyncEngine>);
    config.timing = ElectionTiming {
        watchdog_jitter_ms: 0,
        ..ElectionTiming::default()
    };
    (CoordinatedClient::new(config).unwrap(), sync)
}

// =============================================================================
// Degraded mode
// =============================================================================

/// Without a medium there is nobody to coordinate with: start() leads
/// unconditionally, emits exactly one role event, and connects.
#[tokio::test(start_paused = true)]
async fn test_no_medium_means_unconditional_leader() {
    let sync = Arc::new(NullSyncEngine::new());
    let mut config = ClientConfig::new("wss://example.com", "1.0.0");
    config.sync = Some(Arc::clone(&sync) as Arc<dyn SyncEngine>);
    let client = CoordinatedClient::new(config).unwrap();

    let roles = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&roles);
    let _ = client.on(
        EventKind::Role,
        Arc::new(move |event| {
            if let ClientEvent::Role(role) = event {
                sink.lock().unwrap().push(*role);
            }
        }),
    );

    client.start();

    assert_eq!(client.role(), Role::Leader);
    assert_eq!(*roles.lock().unwrap(), vec![Role::Leader]);
    assert_eq!(sync.connect_count(), 1);
}

/// Degraded mode still logs mutations locally and notifies listeners.
#[tokio::test(start_paused = true)]
async fn test_degraded_mode_keeps_local_log_working() {
    let client = CoordinatedClient::new(ClientConfig::new("wss://example.com", "1.0.0")).unwrap();
    client.start();

    let adds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&adds);
    let _ = client.on(
        EventKind::Add,
        Arc::new(move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    client.append(MutationKind::Add, json!({"n": 1})).unwrap();
    client.append(MutationKind::Add, json!({"n": 2})).unwrap();

    assert_eq!(client.store().unwrap().len(), 2);
    assert_eq!(adds.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Construction
// =============================================================================

/// Missing required parameters abort construction synchronously.
#[test]
fn test_configuration_errors_are_fatal() {
    for config in [
        ClientConfig::new("", "1.0.0"),
        ClientConfig::new("wss://example.com", ""),
    ] {
        let err = CoordinatedClient::new(config).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }
}

/// One-shot listeners fire once and unsubscribe themselves.
#[tokio::test(start_paused = true)]
async fn test_once_listener_fires_once() {
    let client = CoordinatedClient::new(ClientConfig::new("wss://example.com", "1.0.0")).unwrap();
    client.start();

    let adds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&adds);
    let _ = client.once(
        EventKind::Add,
        Arc::new(move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    client.append(MutationKind::Add, json!({"n": 1})).unwrap();
    client.append(MutationKind::Add, json!({"n": 2})).unwrap();

    assert_eq!(adds.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Destroy
// =============================================================================

/// A destroyed client stops heartbeating, stops replicating its own
/// writes, and stops observing peers.
#[tokio::test(start_paused = true)]
async fn test_destroy_severs_all_coordination() {
    let medium = MemoryMedium::new();
    let clock = paused_clock();
    let (a, a_sync) = client_on(&medium, &clock);
    let (b, _b_sync) = client_on(&medium, &clock);

    a.start();
    b.start();
    advance_ms(1001).await;
    assert_eq!(a.role(), Role::Leader);

    let a_adds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&a_adds);
    let _ = a.on(
        EventKind::Add,
        Arc::new(move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    a.destroy();
    assert!(a_sync.disconnect_count() >= 1);

    // Peer mutations no longer reach a
    b.append(MutationKind::Add, json!({"n": 1})).unwrap();
    assert_eq!(a_adds.load(Ordering::SeqCst), 0);
    assert_eq!(a.store().unwrap().len(), 0);

    // Local writes no longer reach the medium
    a.append(MutationKind::Add, json!({"n": 2})).unwrap();
    assert_eq!(b.store().unwrap().len(), 1);
}

// =============================================================================
// Clean round trip
// =============================================================================

/// clean() destroys, wipes the owned broadcast keys, and purges the
/// store; a new client with a new store starts from scratch.
#[tokio::test(start_paused = true)]
async fn test_clean_then_fresh_start() {
    let medium = MemoryMedium::new();
    let clock = paused_clock();
    let (a, _a_sync) = client_on(&medium, &clock);

    a.start();
    advance_ms(1001).await;
    a.append(MutationKind::Add, json!({"n": 1})).unwrap();
    assert!(medium.get("crosslog:user:leader").is_some());
    assert!(medium.get("crosslog:user:add").is_some());

    a.clean().await.unwrap();
    assert!(medium.get("crosslog:user:leader").is_none());
    assert!(medium.get("crosslog:user:add").is_none());
    assert!(medium.get("crosslog:user:clean").is_none());

    let (fresh, fresh_sync) = client_on(&medium, &clock);
    fresh.start();
    assert_eq!(fresh.role(), Role::Candidate);

    advance_ms(1001).await;
    assert_eq!(fresh.role(), Role::Leader);
    assert_eq!(fresh_sync.connect_count(), 1);
    assert!(fresh.store().unwrap().is_empty());
}
