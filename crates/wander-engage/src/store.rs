//! Engagement record store and write arbitration
//!
//! Single owner of all per-key engagement records. Every source of truth
//! funnels through [`EngagementStore::commit`], which arbitrates
//! candidates in two steps: an in-flight gate, then source rank against
//! observation time. Accepted writes notify that key's subscribers
//! synchronously; rejected writes notify nobody.
//!
//! All operations are synchronous. The inner mutex is never held across
//! an await point, so a check and its dependent write always land in the
//! same scheduling tick.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use wander_core::{EngagementDelta, EngagementState, EntityKey, SourcePriority};

// =============================================================================
// Commit outcome
// =============================================================================

/// Result of offering a candidate write to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Candidate accepted; the record as subscribers saw it
    Applied(EngagementState),
    /// Rejected by the in-flight gate: a toggle owns this key right now
    RejectedInFlight,
    /// Rejected as stale: not newer than the last accepted write and not
    /// higher-ranked than its source
    RejectedStale,
}

impl CommitOutcome {
    /// True when the candidate was accepted.
    pub fn is_applied(&self) -> bool {
        matches!(self, CommitOutcome::Applied(_))
    }
}

// =============================================================================
// Store
// =============================================================================

struct Entry {
    record: EngagementState,
    observers: Vec<(u64, mpsc::UnboundedSender<EngagementState>)>,
}

impl Entry {
    fn new() -> Self {
        Self {
            record: EngagementState::default(),
            observers: Vec::new(),
        }
    }

    /// An entry lives only while someone watches it or a toggle holds it.
    fn is_evictable(&self) -> bool {
        self.observers.is_empty() && !self.record.in_flight
    }
}

struct StoreInner {
    entries: HashMap<EntityKey, Entry>,
    next_observer_id: u64,
}

/// Session-scoped store of engagement records. Clones share state.
#[derive(Clone)]
pub struct EngagementStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl EngagementStore {
    /// Empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                entries: HashMap::new(),
                next_observer_id: 0,
            })),
        }
    }

    /// Current record for `key`, a default when the key was never written.
    pub fn read(&self, key: &EntityKey) -> EngagementState {
        let inner = self.inner.lock();
        inner
            .entries
            .get(key)
            .map(|entry| entry.record.clone())
            .unwrap_or_default()
    }

    /// Offer a candidate write for `key`.
    ///
    /// While a toggle holds the key, only the toggle's own writes
    /// (`LocalInflight`, `LocalResult`) land, and they land
    /// unconditionally: everything else was already turned away, so the
    /// stale check has nothing left to protect the record from, and the
    /// operation's own conclusion must never be discarded.
    ///
    /// Otherwise a candidate is rejected as stale when it is neither
    /// newer than the last accepted write nor ranked above its source.
    /// Accepted writes clamp `last_authoritative_at_ms` upward, never
    /// back.
    pub fn commit(
        &self,
        key: &EntityKey,
        fields: &EngagementDelta,
        priority: SourcePriority,
        observed_at_ms: u64,
    ) -> CommitOutcome {
        let mut inner = self.inner.lock();
        let entry = inner.entries.entry(*key).or_insert_with(Entry::new);
        let record = &entry.record;

        if record.in_flight {
            let own_write = matches!(
                priority,
                SourcePriority::LocalInflight | SourcePriority::LocalResult
            );
            if !own_write {
                tracing::debug!(key = %key, priority = ?priority, "commit rejected: toggle in flight");
                return CommitOutcome::RejectedInFlight;
            }
        } else if observed_at_ms <= record.last_authoritative_at_ms
            && record.source.is_some_and(|current| priority <= current)
        {
            tracing::debug!(
                key = %key,
                priority = ?priority,
                observed_at_ms,
                last_authoritative_at_ms = record.last_authoritative_at_ms,
                "commit rejected: stale candidate"
            );
            return CommitOutcome::RejectedStale;
        }

        let next = EngagementState {
            snapshot: fields.apply_to(&record.snapshot),
            last_authoritative_at_ms: record.last_authoritative_at_ms.max(observed_at_ms),
            source: Some(priority),
            in_flight: record.in_flight,
        };
        entry.record = next.clone();
        entry
            .observers
            .retain(|(_, sender)| sender.send(next.clone()).is_ok());

        tracing::debug!(key = %key, priority = ?priority, observed_at_ms, "commit applied");
        CommitOutcome::Applied(next)
    }

    /// Atomically claim the per-key toggle gate.
    ///
    /// Returns false when another toggle already holds it.
    pub fn begin_in_flight(&self, key: &EntityKey) -> bool {
        let mut inner = self.inner.lock();
        let entry = inner.entries.entry(*key).or_insert_with(Entry::new);
        if entry.record.in_flight {
            return false;
        }
        entry.record.in_flight = true;
        true
    }

    /// Release the per-key toggle gate.
    ///
    /// Safe on every exit path; clearing an unclaimed gate is a no-op.
    /// Evicts the record when nothing observes it anymore.
    pub fn end_in_flight(&self, key: &EntityKey) {
        let mut inner = self.inner.lock();
        let evict = match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.record.in_flight = false;
                entry.is_evictable()
            }
            None => false,
        };
        if evict {
            inner.entries.remove(key);
        }
    }

    /// Watch `key`: every accepted write is delivered in commit order.
    ///
    /// The subscription unsubscribes on drop. When the last observer of a
    /// key leaves and no toggle is in flight, the record is evicted.
    pub fn subscribe(&self, key: &EntityKey) -> StoreSubscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        let id = inner.next_observer_id;
        inner.next_observer_id += 1;
        let entry = inner.entries.entry(*key).or_insert_with(Entry::new);
        entry.observers.push((id, sender));
        StoreSubscription {
            store: self.clone(),
            key: *key,
            id,
            receiver,
        }
    }

    fn unsubscribe(&self, key: &EntityKey, id: u64) {
        let mut inner = self.inner.lock();
        let evict = match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.observers.retain(|(observer, _)| *observer != id);
                entry.is_evictable()
            }
            None => false,
        };
        if evict {
            inner.entries.remove(key);
        }
    }

    /// Number of live subscriptions for `key`.
    pub fn observer_count(&self, key: &EntityKey) -> usize {
        let inner = self.inner.lock();
        inner
            .entries
            .get(key)
            .map(|entry| entry.observers.len())
            .unwrap_or(0)
    }

    /// True when at least one subscription watches `key`.
    pub fn is_observed(&self, key: &EntityKey) -> bool {
        self.observer_count(key) > 0
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// True when no record is held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every record and close every subscription (sign-out teardown).
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }
}

impl Default for EngagementStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// Live subscription to one key's accepted writes.
pub struct StoreSubscription {
    store: EngagementStore,
    key: EntityKey,
    id: u64,
    receiver: mpsc::UnboundedReceiver<EngagementState>,
}

impl StoreSubscription {
    /// Key this subscription watches.
    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    /// Next accepted write, or `None` once the store has been cleared.
    pub async fn recv(&mut self) -> Option<EngagementState> {
        self.receiver.recv().await
    }

    /// Next accepted write if one is already queued.
    pub fn try_recv(&mut self) -> Option<EngagementState> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for StoreSubscription {
    fn drop(&mut self) {
        self.store.unsubscribe(&self.key, self.id);
    }
}
