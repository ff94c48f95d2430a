//! Session engagement engine
//!
//! One engine per signed-in session ties the pipeline together: the
//! store arbitrates, the controller toggles, the guard screens refetches,
//! and per-channel pump tasks feed the reconciler from the realtime bus.
//! Observing a key hands back an [`EngagementHandle`] that carries both
//! the store subscription and the bus channel registration; dropping the
//! handle releases both.
//!
//! The engine spawns its pump tasks with `tokio::spawn`, so it has to
//! live inside a Tokio runtime.

use crate::config::EngageConfig;
use crate::metrics::{EngageMetrics, MetricsSnapshot};
use crate::reconciler::{EventDisposition, RealtimeReconciler};
use crate::saved::SavedPosts;
use crate::staleness::{FetchOrigin, FetchStamp, GuardVerdict, StalenessGuard};
use crate::store::{EngagementStore, StoreSubscription};
use crate::toggle::{ToggleAction, ToggleController, ToggleOutcome};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use wander_core::{
    BusError, ChannelName, Clock, EngagementApi, EngagementDelta, EngagementState, EntityKey,
    EventReceiver, PushEvent, RealtimeBus, ViewerId,
};

// =============================================================================
// Engine
// =============================================================================

struct PumpEntry {
    refcount: usize,
    task: JoinHandle<()>,
}

/// Session-scoped engagement pipeline.
///
/// Holds the store, toggle controller, staleness guard, and reconciler
/// for one viewer, and manages one bus pump task per observed channel.
pub struct EngagementEngine {
    store: EngagementStore,
    bus: Arc<dyn RealtimeBus>,
    controller: ToggleController<Arc<dyn EngagementApi>, Arc<dyn Clock>>,
    guard: StalenessGuard<Arc<dyn Clock>>,
    reconciler: Arc<RealtimeReconciler<Arc<dyn Clock>>>,
    saved: SavedPosts,
    metrics: Arc<EngageMetrics>,
    pumps: Arc<Mutex<HashMap<ChannelName, PumpEntry>>>,
    viewer: ViewerId,
    config: EngageConfig,
}

impl EngagementEngine {
    /// Engine for `viewer`'s session, wired to the given backend, bus,
    /// and clock.
    pub fn new(
        api: impl EngagementApi + 'static,
        bus: impl RealtimeBus + 'static,
        clock: impl Clock + 'static,
        viewer: ViewerId,
        config: EngageConfig,
    ) -> Self {
        let api: Arc<dyn EngagementApi> = Arc::new(api);
        let bus: Arc<dyn RealtimeBus> = Arc::new(bus);
        let clock: Arc<dyn Clock> = Arc::new(clock);

        let store = EngagementStore::new();
        let saved = SavedPosts::new();
        let metrics = Arc::new(EngageMetrics::new());
        let controller = ToggleController::new(
            store.clone(),
            Arc::clone(&api),
            Arc::clone(&clock),
            saved.clone(),
        );
        let guard = StalenessGuard::new(store.clone(), Arc::clone(&clock));
        let reconciler = Arc::new(RealtimeReconciler::new(
            store.clone(),
            Arc::clone(&clock),
            viewer,
            config.clone(),
            Arc::clone(&metrics),
        ));

        Self {
            store,
            bus,
            controller,
            guard,
            reconciler,
            saved,
            metrics,
            pumps: Arc::new(Mutex::new(HashMap::new())),
            viewer,
            config,
        }
    }

    /// Observe one key: subscribe to its store record and keep its
    /// entity's bus channel pumped while the handle lives.
    ///
    /// The store subscription always succeeds. The bus side is best
    /// effort: when the subscribe fails the pump logs and exits, and
    /// refetches through the staleness guard keep the record honest.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn observe(&self, key: &EntityKey) -> EngagementHandle {
        let subscription = self.store.subscribe(key);
        let registration = self.register_channel(ChannelName::entity(&key.entity));
        EngagementHandle {
            subscription,
            registration,
            store: self.store.clone(),
        }
    }

    fn register_channel(&self, channel: ChannelName) -> ChannelRegistration {
        let mut pumps = self.pumps.lock();
        match pumps.get_mut(&channel) {
            Some(entry) => entry.refcount += 1,
            None => {
                let task = self.spawn_pump(channel.clone());
                pumps.insert(channel.clone(), PumpEntry { refcount: 1, task });
            }
        }
        ChannelRegistration {
            channel,
            pumps: Arc::clone(&self.pumps),
            bus: Arc::clone(&self.bus),
        }
    }

    fn spawn_pump(&self, channel: ChannelName) -> JoinHandle<()> {
        let bus = Arc::clone(&self.bus);
        let reconciler = Arc::clone(&self.reconciler);
        tokio::spawn(async move {
            match bus.subscribe(channel.clone()).await {
                Ok(receiver) => reconciler.run(receiver).await,
                Err(error) => {
                    tracing::warn!(
                        channel = %channel,
                        error = %error,
                        "realtime subscribe failed; falling back to refetches"
                    );
                }
            }
        })
    }

    /// Toggle `action` on `key`.
    pub async fn toggle(&self, key: &EntityKey, action: ToggleAction) -> ToggleOutcome {
        self.metrics.toggle_started();
        let outcome = self.controller.toggle(key, action).await;
        self.metrics.record_toggle(&outcome);
        outcome
    }

    /// Stamp a refetch at issue time. Call before sending the request.
    pub async fn begin_fetch(&self) -> FetchStamp {
        self.guard.begin_fetch().await
    }

    /// Offer a refetch response for `key` through the staleness guard.
    pub fn apply_fetch(
        &self,
        key: &EntityKey,
        fields: &EngagementDelta,
        origin: FetchOrigin,
        stamp: FetchStamp,
    ) -> GuardVerdict {
        let verdict = self.guard.apply(key, fields, origin, stamp);
        self.metrics.record_fetch(&verdict);
        verdict
    }

    /// Run one push event through the reconciler directly, for events
    /// delivered outside the bus.
    pub async fn apply_event(&self, event: PushEvent) -> EventDisposition {
        self.reconciler.handle_event(event).await
    }

    /// Current record for `key` without subscribing.
    pub fn read(&self, key: &EntityKey) -> EngagementState {
        self.store.read(key)
    }

    /// Subscribe to coarse feed invalidation pushes.
    ///
    /// These carry no engagement fields; hosts use them to schedule a
    /// feed refetch through [`EngagementEngine::begin_fetch`].
    pub async fn feed_events(&self) -> Result<EventReceiver, BusError> {
        self.bus.subscribe(ChannelName::feed_invalidation()).await
    }

    /// The device-local saved posts ledger.
    pub fn saved_posts(&self) -> &SavedPosts {
        &self.saved
    }

    /// Snapshot of pipeline metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// The underlying store.
    pub fn store(&self) -> &EngagementStore {
        &self.store
    }

    /// Viewer this session belongs to.
    pub fn viewer(&self) -> ViewerId {
        self.viewer
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngageConfig {
        &self.config
    }

    /// Tear the session down: stop every pump, unsubscribe from the bus,
    /// and drop all records (sign-out path).
    pub async fn shutdown(&self) {
        let entries: Vec<(ChannelName, PumpEntry)> = self.pumps.lock().drain().collect();
        for (channel, entry) in entries {
            entry.task.abort();
            if let Err(error) = self.bus.unsubscribe(channel.clone()).await {
                tracing::debug!(channel = %channel, error = %error, "bus unsubscribe failed");
            }
        }
        self.reconciler.forget_all();
        self.store.clear();
        tracing::debug!(viewer = %self.viewer, "engagement engine shut down");
    }
}

// =============================================================================
// Handles
// =============================================================================

/// Refcounted claim on one bus channel's pump task.
struct ChannelRegistration {
    channel: ChannelName,
    pumps: Arc<Mutex<HashMap<ChannelName, PumpEntry>>>,
    bus: Arc<dyn RealtimeBus>,
}

impl Drop for ChannelRegistration {
    fn drop(&mut self) {
        let task = {
            let mut pumps = self.pumps.lock();
            let released = match pumps.get_mut(&self.channel) {
                Some(entry) => {
                    entry.refcount -= 1;
                    entry.refcount == 0
                }
                None => false,
            };
            if released {
                pumps.remove(&self.channel).map(|entry| entry.task)
            } else {
                None
            }
        };
        if let Some(task) = task {
            task.abort();
            // Unsubscribing is async; hand it to the runtime when one is
            // still around, otherwise the dropped receiver is enough.
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let bus = Arc::clone(&self.bus);
                let channel = self.channel.clone();
                handle.spawn(async move {
                    if let Err(error) = bus.unsubscribe(channel).await {
                        tracing::debug!(error = %error, "bus unsubscribe failed");
                    }
                });
            }
        }
    }
}

/// Live view of one key: store updates plus the bus channel keeping the
/// record fresh. Dropping the handle releases both sides.
pub struct EngagementHandle {
    subscription: StoreSubscription,
    registration: ChannelRegistration,
    store: EngagementStore,
}

impl EngagementHandle {
    /// Key this handle observes.
    pub fn key(&self) -> &EntityKey {
        self.subscription.key()
    }

    /// Bus channel pumped on this handle's behalf.
    pub fn channel(&self) -> &ChannelName {
        &self.registration.channel
    }

    /// Current record, read directly from the store.
    pub fn current(&self) -> EngagementState {
        self.store.read(self.subscription.key())
    }

    /// Next accepted write for this key.
    pub async fn recv(&mut self) -> Option<EngagementState> {
        self.subscription.recv().await
    }

    /// Next accepted write if one is already queued.
    pub fn try_recv(&mut self) -> Option<EngagementState> {
        self.subscription.try_recv()
    }
}
