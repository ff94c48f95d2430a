//! Engagement pipeline metrics
//!
//! Lock-free counters covering the three write paths: toggles, guarded
//! fetches, and realtime events. The engine records outcomes as they
//! happen; [`EngageMetrics::snapshot`] captures a serializable view for
//! diagnostics surfaces.

use crate::reconciler::EventDisposition;
use crate::staleness::GuardVerdict;
use crate::toggle::ToggleOutcome;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// Metrics
// =============================================================================

/// Counters for the engagement pipeline.
#[derive(Debug, Default)]
pub struct EngageMetrics {
    /// Toggles attempted
    toggles_started_total: AtomicU64,
    /// Toggles confirmed by the backend
    toggles_applied_total: AtomicU64,
    /// Toggles parked as pending follow requests
    toggles_pending_total: AtomicU64,
    /// Toggles refused because the key was already in flight
    toggles_already_in_progress_total: AtomicU64,
    /// Follow toggles refused because the viewer targeted themself
    toggles_self_rejected_total: AtomicU64,
    /// Toggles rolled back after a hard failure
    toggles_failed_total: AtomicU64,
    /// Fetch responses committed through the staleness guard
    fetches_applied_total: AtomicU64,
    /// Fetch responses dropped because nobody observes the key
    fetches_dropped_unobserved_total: AtomicU64,
    /// Fetch responses dropped by the in-flight gate
    fetches_dropped_in_flight_total: AtomicU64,
    /// Fetch responses dropped as stale
    fetches_dropped_stale_total: AtomicU64,
    /// Realtime events committed
    events_applied_total: AtomicU64,
    /// Realtime events for keys nobody observes
    events_unobserved_total: AtomicU64,
    /// Realtime events collapsed by the dedup window
    events_duplicate_total: AtomicU64,
    /// Realtime events older than the staleness threshold
    events_stale_total: AtomicU64,
    /// Realtime events that would not change the record
    events_redundant_total: AtomicU64,
    /// Realtime events the store arbitration turned away
    events_superseded_total: AtomicU64,
}

impl EngageMetrics {
    /// Fresh metrics with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a toggle was attempted.
    pub fn toggle_started(&self) {
        self.toggles_started_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record how a toggle settled.
    pub fn record_toggle(&self, outcome: &ToggleOutcome) {
        let counter = match outcome {
            ToggleOutcome::Applied { .. } => &self.toggles_applied_total,
            ToggleOutcome::Pending { .. } => &self.toggles_pending_total,
            ToggleOutcome::AlreadyInProgress => &self.toggles_already_in_progress_total,
            ToggleOutcome::SelfActionRejected => &self.toggles_self_rejected_total,
            ToggleOutcome::Failed { .. } => &self.toggles_failed_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the verdict on a guarded fetch response.
    pub fn record_fetch(&self, verdict: &GuardVerdict) {
        let counter = match verdict {
            GuardVerdict::Applied(_) => &self.fetches_applied_total,
            GuardVerdict::DroppedUnobserved => &self.fetches_dropped_unobserved_total,
            GuardVerdict::DroppedInFlight => &self.fetches_dropped_in_flight_total,
            GuardVerdict::DroppedStale => &self.fetches_dropped_stale_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record where the reconciler routed a realtime event.
    pub fn record_event(&self, disposition: EventDisposition) {
        let counter = match disposition {
            EventDisposition::Applied => &self.events_applied_total,
            EventDisposition::Unobserved => &self.events_unobserved_total,
            EventDisposition::DuplicateWindow => &self.events_duplicate_total,
            EventDisposition::Stale => &self.events_stale_total,
            EventDisposition::Redundant => &self.events_redundant_total,
            EventDisposition::Superseded => &self.events_superseded_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Capture current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            toggles_started_total: self.toggles_started_total.load(Ordering::Relaxed),
            toggles_applied_total: self.toggles_applied_total.load(Ordering::Relaxed),
            toggles_pending_total: self.toggles_pending_total.load(Ordering::Relaxed),
            toggles_already_in_progress_total: self
                .toggles_already_in_progress_total
                .load(Ordering::Relaxed),
            toggles_self_rejected_total: self.toggles_self_rejected_total.load(Ordering::Relaxed),
            toggles_failed_total: self.toggles_failed_total.load(Ordering::Relaxed),
            fetches_applied_total: self.fetches_applied_total.load(Ordering::Relaxed),
            fetches_dropped_unobserved_total: self
                .fetches_dropped_unobserved_total
                .load(Ordering::Relaxed),
            fetches_dropped_in_flight_total: self
                .fetches_dropped_in_flight_total
                .load(Ordering::Relaxed),
            fetches_dropped_stale_total: self.fetches_dropped_stale_total.load(Ordering::Relaxed),
            events_applied_total: self.events_applied_total.load(Ordering::Relaxed),
            events_unobserved_total: self.events_unobserved_total.load(Ordering::Relaxed),
            events_duplicate_total: self.events_duplicate_total.load(Ordering::Relaxed),
            events_stale_total: self.events_stale_total.load(Ordering::Relaxed),
            events_redundant_total: self.events_redundant_total.load(Ordering::Relaxed),
            events_superseded_total: self.events_superseded_total.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Point-in-time view of [`EngageMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Toggles attempted
    pub toggles_started_total: u64,
    /// Toggles confirmed by the backend
    pub toggles_applied_total: u64,
    /// Toggles parked as pending follow requests
    pub toggles_pending_total: u64,
    /// Toggles refused because the key was already in flight
    pub toggles_already_in_progress_total: u64,
    /// Follow toggles refused because the viewer targeted themself
    pub toggles_self_rejected_total: u64,
    /// Toggles rolled back after a hard failure
    pub toggles_failed_total: u64,
    /// Fetch responses committed through the staleness guard
    pub fetches_applied_total: u64,
    /// Fetch responses dropped because nobody observes the key
    pub fetches_dropped_unobserved_total: u64,
    /// Fetch responses dropped by the in-flight gate
    pub fetches_dropped_in_flight_total: u64,
    /// Fetch responses dropped as stale
    pub fetches_dropped_stale_total: u64,
    /// Realtime events committed
    pub events_applied_total: u64,
    /// Realtime events for keys nobody observes
    pub events_unobserved_total: u64,
    /// Realtime events collapsed by the dedup window
    pub events_duplicate_total: u64,
    /// Realtime events older than the staleness threshold
    pub events_stale_total: u64,
    /// Realtime events that would not change the record
    pub events_redundant_total: u64,
    /// Realtime events the store arbitration turned away
    pub events_superseded_total: u64,
}
