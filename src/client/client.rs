//! # Coordinated Client
//!
//! Composes the election coordinator, the log replicator, and the
//! store/sync collaborators behind one lifecycle and one event surface.
//! Exactly one context per origin acts as leader and holds the live
//! server connection; every other context replicates.

use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;

use super::config::ClientConfig;
use super::errors::{ClientError, ClientResult};
use super::events::{ClientEvent, EventBus, EventKind, EventListener, EventSubscription};
use crate::broadcast::{BroadcastMedium, KeyPurpose, KeySet, SubscriberId};
use crate::election::{ElectionCoordinator, Role, RoleCell};
use crate::observability::{log_event, Event, Severity};
use crate::replication::LogReplicator;
use crate::store::{ContextId, MemoryStore, MutationKind, Record, RecordMeta, Store, StoreError};
use crate::sync::{NullSyncEngine, SyncEngine};

/// One context's handle on the shared log
pub struct CoordinatedClient {
    context_id: ContextId,
    node_id: String,
    url: String,
    subprotocol: String,
    keys: KeySet,
    medium: Option<Arc<dyn BroadcastMedium>>,
    store: RwLock<Option<Arc<dyn Store>>>,
    sync: Arc<dyn SyncEngine>,
    bus: EventBus,
    role: Arc<RoleCell>,
    coordinator: Option<ElectionCoordinator>,
    replicator: LogReplicator,
    medium_subscription: Mutex<Option<SubscriberId>>,
}

impl CoordinatedClient {
    /// Build a client from a validated configuration
    ///
    /// Configuration errors are fatal and abort startup here; nothing
    /// is scheduled until [`start`](Self::start).
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;

        let ClientConfig {
            url,
            subprotocol,
            user_scope,
            prefix,
            allow_insecure_url,
            context_id,
            timing,
            clock,
            medium,
            store,
            sync,
        } = config;

        if url.starts_with("ws://") && !allow_insecure_url {
            log_event(Severity::Warn, Event::InsecureUrl, &[("url", &url)]);
        }

        let context_id = context_id.unwrap_or_else(ContextId::generate);
        let node_id = match &user_scope {
            Some(scope) => format!("{scope}:{context_id}"),
            None => context_id.to_string(),
        };
        let keys = KeySet::new(&prefix, user_scope.as_deref());

        let store: Arc<dyn Store> = store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let sync: Arc<dyn SyncEngine> = sync.unwrap_or_else(|| Arc::new(NullSyncEngine::new()));
        let bus = EventBus::new();
        let role = Arc::new(RoleCell::new());

        {
            let bus = bus.clone();
            let context = context_id.to_string();
            role.set_on_change(Arc::new(move |new_role: Role| {
                log_event(
                    Severity::Info,
                    Event::RoleChange,
                    &[("context", &context), ("role", new_role.as_str())],
                );
                bus.emit(&ClientEvent::Role(new_role));
            }));
        }

        {
            let context = context_id.to_string();
            sync.on_error(Arc::new(move |message: &str| {
                log_event(
                    Severity::Error,
                    Event::SyncError,
                    &[("context", &context), ("error", message)],
                );
            }));
        }

        let replicator = LogReplicator::new(
            context_id,
            keys.clone(),
            medium.clone(),
            Arc::clone(&store),
            bus.clone(),
        );
        replicator.install();

        let coordinator = medium.as_ref().map(|medium| {
            ElectionCoordinator::new(
                context_id,
                keys.clone(),
                Arc::clone(medium),
                Arc::clone(&sync),
                Arc::clone(&role),
                clock,
                timing,
            )
        });

        let medium_subscription = match (&medium, &coordinator) {
            (Some(medium), Some(coordinator)) => {
                let keys = keys.clone();
                let coordinator = coordinator.clone();
                let replicator = replicator.clone();
                Some(medium.subscribe(Arc::new(move |key: &str, value: &Value| {
                    match keys.purpose_of(key) {
                        Some(KeyPurpose::Leader) => coordinator.on_leader_notice(value),
                        Some(KeyPurpose::Add) => {
                            replicator.on_envelope(MutationKind::Add, value)
                        }
                        Some(KeyPurpose::Clean) => {
                            replicator.on_envelope(MutationKind::Clean, value)
                        }
                        None => {}
                    }
                })))
            }
            _ => None,
        };

        Ok(Self {
            context_id,
            node_id,
            url,
            subprotocol,
            keys,
            medium,
            store: RwLock::new(Some(store)),
            sync,
            bus,
            role,
            coordinator,
            replicator,
            medium_subscription: Mutex::new(medium_subscription),
        })
    }

    /// Join the group: run an election, or lead unconditionally when no
    /// medium is available
    ///
    /// Must be called from within a tokio runtime. Safe to call again.
    pub fn start(&self) {
        log_event(
            Severity::Info,
            Event::ClientStart,
            &[("context", &self.context_id.to_string())],
        );

        match &self.coordinator {
            Some(coordinator) => coordinator.start(),
            None => {
                self.role.set(Role::Leader);
                self.sync.connect();
            }
        }
    }

    /// Disconnect and stop all coordination; idempotent
    ///
    /// No role transition and no resignation: the broadcast medium is
    /// left untouched, so peers take over via their watchdogs.
    pub fn destroy(&self) {
        log_event(
            Severity::Info,
            Event::ClientDestroy,
            &[("context", &self.context_id.to_string())],
        );

        self.sync.disconnect();
        if let Some(coordinator) = &self.coordinator {
            coordinator.destroy();
        }
        self.replicator.release();

        if let Some(medium) = &self.medium {
            let id = self
                .medium_subscription
                .lock()
                .ok()
                .and_then(|mut slot| slot.take());
            if let Some(id) = id {
                medium.unsubscribe(id);
            }
        }
    }

    /// Destroy, then wipe every piece of state this client owns
    ///
    /// Removes the client's broadcast keys so a later `start` runs a
    /// fresh election, then purges the store; a store without purge
    /// support is dropped instead.
    pub async fn clean(&self) -> ClientResult<()> {
        self.destroy();
        log_event(
            Severity::Info,
            Event::ClientClean,
            &[("context", &self.context_id.to_string())],
        );

        if let Some(medium) = &self.medium {
            for key in self.keys.all() {
                medium.remove(&key);
            }
        }

        let store = self.store.read().ok().and_then(|slot| slot.clone());
        if let Some(store) = store {
            match store.purge() {
                Ok(()) => {}
                Err(StoreError::PurgeUnsupported) => {
                    if let Ok(mut slot) = self.store.write() {
                        *slot = None;
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(())
    }

    /// Apply a local mutation visible to every context
    pub fn append(&self, kind: MutationKind, payload: Value) -> ClientResult<Record> {
        self.append_with(kind, payload, None)
    }

    /// Apply a local mutation restricted to one context
    ///
    /// Scoped to `self.context_id()`, the mutation never leaves this
    /// context; scoped to a peer, only that peer observes it.
    pub fn append_scoped(
        &self,
        kind: MutationKind,
        payload: Value,
        scope: ContextId,
    ) -> ClientResult<Record> {
        self.append_with(kind, payload, Some(scope))
    }

    fn append_with(
        &self,
        kind: MutationKind,
        payload: Value,
        scope: Option<ContextId>,
    ) -> ClientResult<Record> {
        let store = self
            .store
            .read()
            .ok()
            .and_then(|slot| slot.clone())
            .ok_or(ClientError::StoreReleased)?;

        let meta = match scope {
            Some(scope) => RecordMeta::scoped(self.context_id, scope),
            None => RecordMeta::local(self.context_id),
        };
        Ok(store.append(kind, payload, meta)?)
    }

    /// Subscribe to an event
    pub fn on(&self, kind: EventKind, listener: EventListener) -> EventSubscription {
        self.bus.on(kind, listener)
    }

    /// Subscribe to the next occurrence of an event
    pub fn once(&self, kind: EventKind, listener: EventListener) -> EventSubscription {
        self.bus.once(kind, listener)
    }

    /// This context's identifier
    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    /// Identity handed to the sync engine
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Configured server URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Configured subprotocol version
    pub fn subprotocol(&self) -> &str {
        &self.subprotocol
    }

    /// Current role
    pub fn role(&self) -> Role {
        self.role.get()
    }

    /// The log store, unless released by `clean()`
    pub fn store(&self) -> Option<Arc<dyn Store>> {
        self.store.read().ok().and_then(|slot| slot.clone())
    }
}

impl std::fmt::Debug for CoordinatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatedClient")
            .field("context_id", &self.context_id)
            .field("node_id", &self.node_id)
            .field("url", &self.url)
            .field("subprotocol", &self.subprotocol)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::broadcast::MemoryMedium;
    use crate::election::{Clock, ElectionTiming};

    fn paused_clock() -> Clock {
        let origin = tokio::time::Instant::now();
        Clock::from_fn(move || origin.elapsed().as_millis() as i64)
    }

    /// Drive the current-thread paused-time runtime so spawned timer
    /// tasks register and fire their callbacks before we observe state.
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    fn config_without_medium() -> ClientConfig {
        ClientConfig::new("wss://example.com", "1.0.0")
    }

    fn config_on(medium: &MemoryMedium) -> ClientConfig {
        let mut config = ClientConfig::new("wss://example.com", "1.0.0");
        config.user_scope = Some("user".to_string());
        config.medium = Some(Arc::new(medium.attach()));
        config.clock = paused_clock();
        config.timing = ElectionTiming {
            watchdog_jitter_ms: 0,
            ..ElectionTiming::default()
        };
        config
    }

    #[test]
    fn test_invalid_config_aborts_construction() {
        let err = CoordinatedClient::new(ClientConfig::new("", "1.0.0")).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_node_id_includes_user_scope() {
        let mut config = config_without_medium();
        config.user_scope = Some("alice".to_string());
        let client = CoordinatedClient::new(config).unwrap();
        assert!(client.node_id().starts_with("alice:"));
        assert!(client
            .node_id()
            .ends_with(&client.context_id().to_string()));
    }

    #[test]
    fn test_node_id_without_user_scope_is_context_id() {
        let client = CoordinatedClient::new(config_without_medium()).unwrap();
        assert_eq!(client.node_id(), client.context_id().to_string());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_medium_start_leads_immediately() {
        let sync = Arc::new(NullSyncEngine::new());
        let mut config = config_without_medium();
        config.sync = Some(Arc::clone(&sync) as Arc<dyn SyncEngine>);
        let client = CoordinatedClient::new(config).unwrap();

        let roles = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&roles);
        let _sub = client.on(
            EventKind::Role,
            Arc::new(move |_event| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        client.start();

        assert_eq!(client.role(), Role::Leader);
        assert_eq!(roles.load(Ordering::SeqCst), 1);
        assert_eq!(sync.connect_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_append_applies_exactly_once() {
        let client = CoordinatedClient::new(config_without_medium()).unwrap();
        client.start();

        client.append(MutationKind::Add, json!({"n": 1})).unwrap();
        assert_eq!(client.store().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_removes_owned_broadcast_keys() {
        let medium = MemoryMedium::new();
        let client = CoordinatedClient::new(config_on(&medium)).unwrap();

        client.start();
        settle().await;
        tokio::time::advance(std::time::Duration::from_millis(1001)).await;
        settle().await;
        assert_eq!(client.role(), Role::Leader);
        client.append(MutationKind::Add, json!({"n": 1})).unwrap();

        assert!(medium.get("crosslog:user:leader").is_some());
        assert!(medium.get("crosslog:user:add").is_some());

        client.clean().await.unwrap();

        assert!(medium.get("crosslog:user:leader").is_none());
        assert!(medium.get("crosslog:user:add").is_none());
        assert!(medium.get("crosslog:user:clean").is_none());
        assert!(client.store().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_drops_store_without_purge_support() {
        struct NoPurgeStore(MemoryStore);
        impl Store for NoPurgeStore {
            fn append(
                &self,
                kind: MutationKind,
                payload: Value,
                meta: RecordMeta,
            ) -> crate::store::StoreResult<Record> {
                self.0.append(kind, payload, meta)
            }
            fn subscribe(&self, listener: crate::store::MutationListener) -> u64 {
                self.0.subscribe(listener)
            }
            fn unsubscribe(&self, id: u64) {
                self.0.unsubscribe(id)
            }
            fn records(&self) -> Vec<Record> {
                self.0.records()
            }
            fn len(&self) -> usize {
                self.0.len()
            }
        }

        let mut config = config_without_medium();
        config.store = Some(Arc::new(NoPurgeStore(MemoryStore::new())));
        let client = CoordinatedClient::new(config).unwrap();

        client.start();
        client.clean().await.unwrap();

        assert!(client.store().is_none());
        assert!(matches!(
            client.append(MutationKind::Add, json!({})),
            Err(ClientError::StoreReleased)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_is_idempotent() {
        let medium = MemoryMedium::new();
        let client = CoordinatedClient::new(config_on(&medium)).unwrap();
        client.start();
        client.destroy();
        client.destroy();
    }

    #[tokio::test(start_paused = true)]
    async fn test_scoped_append_does_not_reach_the_medium() {
        let medium = MemoryMedium::new();
        let client = CoordinatedClient::new(config_on(&medium)).unwrap();
        client.start();

        client
            .append_scoped(MutationKind::Add, json!({"n": 1}), client.context_id())
            .unwrap();

        assert!(medium.get("crosslog:user:add").is_none());
        assert_eq!(client.store().unwrap().len(), 1);
    }
}
