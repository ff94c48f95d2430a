//! Realtime event reconciliation
//!
//! Push events arrive duplicated, delayed, and for entities nobody is
//! looking at. The reconciler runs each event through a fixed filter
//! chain before the store arbitrates it: observation, dedup window,
//! staleness threshold, idempotence, then commit. Every event ends in
//! exactly one [`EventDisposition`].

use crate::config::EngageConfig;
use crate::metrics::EngageMetrics;
use crate::store::{CommitOutcome, EngagementStore};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use wander_core::{Clock, EntityKey, EventReceiver, PushEvent, SourcePriority, ViewerId};

// =============================================================================
// Disposition
// =============================================================================

/// Where the filter chain routed one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    /// Committed to the store
    Applied,
    /// Dropped: nobody observes the entity
    Unobserved,
    /// Dropped: same key already handled inside the dedup window
    DuplicateWindow,
    /// Dropped: event older than the staleness threshold
    Stale,
    /// Dropped: applying it would change nothing
    Redundant,
    /// Dropped: store arbitration preferred what it already holds
    Superseded,
}

// =============================================================================
// Reconciler
// =============================================================================

/// Applies push events to the store for one viewer session.
pub struct RealtimeReconciler<C: Clock> {
    store: EngagementStore,
    clock: C,
    viewer: ViewerId,
    config: EngageConfig,
    last_seen_ms: Mutex<HashMap<EntityKey, u64>>,
    metrics: Arc<EngageMetrics>,
}

impl<C: Clock> RealtimeReconciler<C> {
    /// Reconciler writing through `store` on behalf of `viewer`.
    pub fn new(
        store: EngagementStore,
        clock: C,
        viewer: ViewerId,
        config: EngageConfig,
        metrics: Arc<EngageMetrics>,
    ) -> Self {
        Self {
            store,
            clock,
            viewer,
            config,
            last_seen_ms: Mutex::new(HashMap::new()),
            metrics,
        }
    }

    /// Run one event through the filter chain.
    pub async fn handle_event(&self, event: PushEvent) -> EventDisposition {
        let key = EntityKey::new(event.entity, self.viewer);
        let disposition = self.arbitrate(&key, &event).await;
        self.metrics.record_event(disposition);
        match disposition {
            EventDisposition::Applied => {
                tracing::debug!(key = %key, timestamp_ms = event.timestamp_ms, "event applied");
            }
            dropped => {
                tracing::trace!(key = %key, disposition = ?dropped, "event dropped");
            }
        }
        disposition
    }

    async fn arbitrate(&self, key: &EntityKey, event: &PushEvent) -> EventDisposition {
        if !self.store.is_observed(key) {
            // Forget the dedup slot too, so the entry count tracks the
            // observed set.
            self.last_seen_ms.lock().remove(key);
            return EventDisposition::Unobserved;
        }

        let now_ms = self.clock.now_ms().await;
        {
            let mut last_seen = self.last_seen_ms.lock();
            if let Some(previous_ms) = last_seen.get(key) {
                if now_ms.saturating_sub(*previous_ms) < self.config.dedup_window_ms {
                    return EventDisposition::DuplicateWindow;
                }
            }
            last_seen.insert(*key, now_ms);
        }

        if now_ms.saturating_sub(event.timestamp_ms) > self.config.stale_event_threshold_ms {
            return EventDisposition::Stale;
        }

        if event.fields.is_noop_on(&self.store.read(key).snapshot) {
            return EventDisposition::Redundant;
        }

        match self.store.commit(
            key,
            &event.fields,
            SourcePriority::RemoteEvent,
            event.timestamp_ms,
        ) {
            CommitOutcome::Applied(_) => EventDisposition::Applied,
            CommitOutcome::RejectedInFlight | CommitOutcome::RejectedStale => {
                EventDisposition::Superseded
            }
        }
    }

    /// Drain `receiver` until the channel closes.
    ///
    /// Dedup slots for the keys this pump touched are forgotten on
    /// exit, so a channel that goes quiet does not pin map entries for
    /// the rest of the session.
    pub async fn run(&self, mut receiver: EventReceiver) {
        let mut touched = HashSet::new();
        while let Some(event) = receiver.recv().await {
            touched.insert(EntityKey::new(event.entity, self.viewer));
            self.handle_event(event).await;
        }
        if !touched.is_empty() {
            let mut last_seen = self.last_seen_ms.lock();
            for key in &touched {
                last_seen.remove(key);
            }
        }
        tracing::debug!(viewer = %self.viewer, "event channel closed");
    }

    /// Forget every dedup slot, e.g. at session teardown.
    pub fn forget_all(&self) {
        self.last_seen_ms.lock().clear();
    }
}
