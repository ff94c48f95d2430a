//! Staleness guard for background refetches
//!
//! Responses that sat in queues or caches were stamped before the
//! user's latest action. Callers take a [`FetchStamp`] when the request
//! is issued, not when the response arrives; the stamp is what the
//! store arbitrates against, so a slow response cannot masquerade as
//! fresh data.

use crate::store::{CommitOutcome, EngagementStore};
use wander_core::{Clock, EngagementDelta, EngagementState, EntityKey, SourcePriority};

// =============================================================================
// Fetch provenance
// =============================================================================

/// Where a fetch response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrigin {
    /// Straight from the backend
    Network,
    /// Replayed from an HTTP or client-side cache
    Cache,
}

impl FetchOrigin {
    fn priority(self) -> SourcePriority {
        match self {
            FetchOrigin::Network => SourcePriority::FreshFetch,
            FetchOrigin::Cache => SourcePriority::CachedFetch,
        }
    }
}

/// Issue-time stamp for one fetch. Opaque to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchStamp {
    issued_at_ms: u64,
}

impl FetchStamp {
    /// When the fetch was issued.
    pub fn issued_at_ms(&self) -> u64 {
        self.issued_at_ms
    }
}

/// Verdict on one guarded fetch response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    /// Response committed; the record as subscribers saw it
    Applied(EngagementState),
    /// Dropped because no screen observes the key
    DroppedUnobserved,
    /// Dropped because a toggle holds the key
    DroppedInFlight,
    /// Dropped because the record advanced past the fetch
    DroppedStale,
}

impl GuardVerdict {
    /// True when the response was committed.
    pub fn is_applied(&self) -> bool {
        matches!(self, GuardVerdict::Applied(_))
    }
}

// =============================================================================
// Guard
// =============================================================================

/// Applies fetch responses through store arbitration.
pub struct StalenessGuard<C: Clock> {
    store: EngagementStore,
    clock: C,
}

impl<C: Clock> StalenessGuard<C> {
    /// Guard writing through `store` on `clock` time.
    pub fn new(store: EngagementStore, clock: C) -> Self {
        Self { store, clock }
    }

    /// Stamp a fetch at issue time. Call before sending the request.
    pub async fn begin_fetch(&self) -> FetchStamp {
        FetchStamp {
            issued_at_ms: self.clock.now_ms().await,
        }
    }

    /// Offer a fetch response for `key`.
    ///
    /// Responses for keys no screen observes are dropped before
    /// arbitration; a committed record must not outlive its observers.
    pub fn apply(
        &self,
        key: &EntityKey,
        fields: &EngagementDelta,
        origin: FetchOrigin,
        stamp: FetchStamp,
    ) -> GuardVerdict {
        if !self.store.is_observed(key) {
            tracing::debug!(key = %key, origin = ?origin, "fetch dropped: key unobserved");
            return GuardVerdict::DroppedUnobserved;
        }
        match self
            .store
            .commit(key, fields, origin.priority(), stamp.issued_at_ms)
        {
            CommitOutcome::Applied(state) => GuardVerdict::Applied(state),
            CommitOutcome::RejectedInFlight => {
                tracing::debug!(key = %key, origin = ?origin, "fetch dropped: toggle in flight");
                GuardVerdict::DroppedInFlight
            }
            CommitOutcome::RejectedStale => {
                tracing::debug!(
                    key = %key,
                    origin = ?origin,
                    issued_at_ms = stamp.issued_at_ms,
                    "fetch dropped: stale response"
                );
                GuardVerdict::DroppedStale
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wander_core::{CounterKind, PostId, ViewerId};
    use wander_testkit::ManualClock;

    fn guard_at(start_ms: u64) -> (StalenessGuard<ManualClock>, ManualClock) {
        let clock = ManualClock::new(start_ms);
        (
            StalenessGuard::new(EngagementStore::new(), clock.clone()),
            clock,
        )
    }

    fn like_fields(count: u64) -> EngagementDelta {
        EngagementDelta::new()
            .engaged(false)
            .counter(CounterKind::Likes, count)
    }

    #[tokio::test]
    async fn fresh_response_lands() {
        let (guard, _clock) = guard_at(100);
        let key = EntityKey::post(PostId::new(), ViewerId::new());
        let _watch = guard.store.subscribe(&key);

        let stamp = guard.begin_fetch().await;
        let verdict = guard.apply(&key, &like_fields(4), FetchOrigin::Network, stamp);

        assert!(verdict.is_applied());
        assert_eq!(
            guard.store.read(&key).snapshot.counters.get(CounterKind::Likes),
            4
        );
    }

    #[tokio::test]
    async fn response_issued_before_a_toggle_settled_is_dropped() {
        let (guard, _clock) = guard_at(100);
        let key = EntityKey::post(PostId::new(), ViewerId::new());
        let _watch = guard.store.subscribe(&key);

        // Fetch issued at t=100, then a toggle settles at t=200.
        let stamp = guard.begin_fetch().await;
        guard.store.commit(
            &key,
            &EngagementDelta::new().engaged(true),
            SourcePriority::LocalResult,
            200,
        );

        let verdict = guard.apply(&key, &like_fields(4), FetchOrigin::Network, stamp);
        assert_eq!(verdict, GuardVerdict::DroppedStale);
        assert!(guard.store.read(&key).snapshot.engaged);
    }

    #[tokio::test]
    async fn response_is_judged_by_issue_time_not_arrival_time() {
        let (guard, clock) = guard_at(100);
        let key = EntityKey::post(PostId::new(), ViewerId::new());
        let _watch = guard.store.subscribe(&key);

        // Issued at t=100 before the toggle, arriving long after it. The
        // clock is well past the toggle by arrival, but the stamp pins
        // the fetch to its issue time.
        let stamp = guard.begin_fetch().await;
        guard.store.commit(
            &key,
            &EngagementDelta::new().engaged(true),
            SourcePriority::LocalResult,
            200,
        );
        clock.set(10_000);

        let verdict = guard.apply(&key, &like_fields(4), FetchOrigin::Network, stamp);
        assert_eq!(verdict, GuardVerdict::DroppedStale);
        assert_eq!(stamp.issued_at_ms(), 100);
    }

    #[tokio::test]
    async fn cached_response_loses_to_an_equally_old_network_response() {
        let (guard, _clock) = guard_at(100);
        let key = EntityKey::post(PostId::new(), ViewerId::new());
        let _watch = guard.store.subscribe(&key);

        let stamp = guard.begin_fetch().await;
        assert!(guard
            .apply(&key, &like_fields(4), FetchOrigin::Network, stamp)
            .is_applied());
        let verdict = guard.apply(&key, &like_fields(2), FetchOrigin::Cache, stamp);

        assert_eq!(verdict, GuardVerdict::DroppedStale);
        assert_eq!(
            guard.store.read(&key).snapshot.counters.get(CounterKind::Likes),
            4
        );
    }

    #[tokio::test]
    async fn response_during_a_toggle_is_dropped() {
        let (guard, _clock) = guard_at(100);
        let key = EntityKey::post(PostId::new(), ViewerId::new());
        let _watch = guard.store.subscribe(&key);

        let stamp = guard.begin_fetch().await;
        assert!(guard.store.begin_in_flight(&key));

        let verdict = guard.apply(&key, &like_fields(4), FetchOrigin::Network, stamp);
        assert_eq!(verdict, GuardVerdict::DroppedInFlight);
    }

    #[tokio::test]
    async fn response_for_an_unwatched_key_leaves_no_record() {
        let (guard, _clock) = guard_at(100);
        let key = EntityKey::post(PostId::new(), ViewerId::new());

        let stamp = guard.begin_fetch().await;
        let verdict = guard.apply(&key, &like_fields(4), FetchOrigin::Network, stamp);

        assert_eq!(verdict, GuardVerdict::DroppedUnobserved);
        assert!(guard.store.is_empty());
    }
}
