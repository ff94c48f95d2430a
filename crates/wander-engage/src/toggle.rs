//! Optimistic engagement toggles
//!
//! A toggle flips the button immediately, claims the per-key in-flight
//! gate, settles against the backend, then commits the settlement as the
//! session's own result. Exactly one toggle per key runs at a time;
//! re-taps while one is in flight are refused, not queued.
//!
//! Saves settle locally against [`SavedPosts`] and never touch the
//! network.

use crate::conflict::{classify, ConflictClass};
use crate::saved::SavedPosts;
use crate::store::{CommitOutcome, EngagementStore};
use serde::{Deserialize, Serialize};
use wander_core::{
    Clock, CounterKind, EngagementApi, EngagementDelta, EngagementSnapshot, EngagementState,
    EntityKey, EntityRef, FollowToggled, LikeToggled, PostId, SourcePriority, UserId, ViewerId,
};

// =============================================================================
// Actions and outcomes
// =============================================================================

/// Which engagement button was tapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleAction {
    /// Follow or unfollow a profile
    Follow,
    /// Like or unlike a post
    Like,
    /// Save or unsave a post on this device
    Save,
}

impl ToggleAction {
    /// Counter the optimistic flip nudges.
    fn counter(self) -> CounterKind {
        match self {
            ToggleAction::Follow => CounterKind::Followers,
            ToggleAction::Like => CounterKind::Likes,
            ToggleAction::Save => CounterKind::Saves,
        }
    }
}

/// How loudly the host should surface a toggle outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// No user-visible notice
    Silent,
    /// Informational toast
    Info,
    /// Warning toast
    Warning,
    /// Error toast
    Error,
}

/// How a toggle settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Backend confirmed the toggle; the record as subscribers saw it
    Applied {
        /// Committed record
        state: EngagementState,
    },
    /// Refused: a toggle for this key is already in flight
    AlreadyInProgress,
    /// Private account: the follow request is parked awaiting approval
    Pending {
        /// User-facing explanation
        message: String,
    },
    /// Refused: the viewer tried to follow themself
    SelfActionRejected,
    /// Hard failure; the optimistic flip was rolled back
    Failed {
        /// User-facing explanation
        message: String,
    },
}

impl ToggleOutcome {
    /// How loudly the host should surface this outcome.
    pub fn severity(&self) -> Severity {
        match self {
            ToggleOutcome::Applied { .. } | ToggleOutcome::AlreadyInProgress => Severity::Silent,
            ToggleOutcome::Pending { .. } | ToggleOutcome::SelfActionRejected => Severity::Info,
            ToggleOutcome::Failed { .. } => Severity::Error,
        }
    }

    /// Toast text, when the outcome carries one.
    pub fn message(&self) -> Option<&str> {
        match self {
            ToggleOutcome::Pending { message } | ToggleOutcome::Failed { message } => {
                Some(message)
            }
            _ => None,
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Typed routing of an action onto its entity.
enum Route {
    Follow(UserId),
    Like(PostId),
    Save(PostId),
}

/// What the backend (or the local saved set) said about a toggle.
enum Settlement {
    Confirmed(EngagementDelta),
    Pending(String),
    Failed(String),
}

/// Holds the in-flight gate for one toggle and releases it on drop.
///
/// Hosts can drop the toggle future mid-await (timeout, screen
/// unmount); releasing from `Drop` keeps the key from staying gated
/// forever.
struct GateRelease {
    store: EngagementStore,
    key: EntityKey,
}

impl Drop for GateRelease {
    fn drop(&mut self) {
        self.store.end_in_flight(&self.key);
    }
}

/// Runs optimistic toggles against one store.
pub struct ToggleController<A: EngagementApi, C: Clock> {
    store: EngagementStore,
    api: A,
    clock: C,
    saved: SavedPosts,
}

impl<A: EngagementApi, C: Clock> ToggleController<A, C> {
    /// Controller writing through `store`, settling follows and likes
    /// against `api` and saves against `saved`.
    pub fn new(store: EngagementStore, api: A, clock: C, saved: SavedPosts) -> Self {
        Self {
            store,
            api,
            clock,
            saved,
        }
    }

    /// Toggle `action` on `key`'s entity for `key`'s viewer.
    ///
    /// Flips optimistically, settles, and commits the settlement. The
    /// returned outcome is for the host's toast routing; observers of
    /// the key see every committed state change on their subscriptions.
    pub async fn toggle(&self, key: &EntityKey, action: ToggleAction) -> ToggleOutcome {
        let route = match route(key, action) {
            Ok(route) => route,
            Err(outcome) => return outcome,
        };

        if !self.store.begin_in_flight(key) {
            tracing::debug!(key = %key, action = ?action, "toggle refused: already in flight");
            return ToggleOutcome::AlreadyInProgress;
        }
        let gate = GateRelease {
            store: self.store.clone(),
            key: *key,
        };

        let mut outcome = self.run(key, action, route).await;
        drop(gate);
        // The gate is already released by the time the caller sees the
        // outcome.
        if let ToggleOutcome::Applied { state } = &mut outcome {
            state.in_flight = false;
        }
        outcome
    }

    async fn run(&self, key: &EntityKey, action: ToggleAction, route: Route) -> ToggleOutcome {
        let before = self.store.read(key).snapshot;
        let flipped_at_ms = self.clock.now_ms().await;
        self.store.commit(
            key,
            &optimistic_flip(&before, action),
            SourcePriority::LocalInflight,
            flipped_at_ms,
        );

        let settlement = self.settle(key.viewer, route).await;
        let settled_at_ms = self.clock.now_ms().await;
        // from_snapshot skips counters absent before the flip, so the
        // flipped one is reasserted explicitly (absent displays as zero).
        let restore = EngagementDelta::from_snapshot(&before)
            .counter(action.counter(), before.counters.get(action.counter()));
        match settlement {
            Settlement::Confirmed(fields) => {
                let state = self.commit_result(key, &fields, settled_at_ms);
                ToggleOutcome::Applied { state }
            }
            Settlement::Pending(message) => {
                // Tri-state button: not engaged, request parked, counters
                // back where they started.
                let fields = restore.engaged(false).requested(true);
                self.commit_result(key, &fields, settled_at_ms);
                ToggleOutcome::Pending { message }
            }
            Settlement::Failed(message) => {
                self.commit_result(key, &restore, settled_at_ms);
                ToggleOutcome::Failed { message }
            }
        }
    }

    async fn settle(&self, viewer: ViewerId, route: Route) -> Settlement {
        match route {
            Route::Follow(target) => match self.api.toggle_follow(viewer, target).await {
                Ok(result) => Settlement::Confirmed(follow_fields(&result)),
                Err(error) => match classify(&error) {
                    ConflictClass::Pending { message } => Settlement::Pending(message),
                    ConflictClass::Hard { message } => Settlement::Failed(message),
                },
            },
            Route::Like(post) => match self.api.toggle_like(viewer, post).await {
                Ok(result) => Settlement::Confirmed(like_fields(&result)),
                // Likes have no pending state; every failure rolls back.
                Err(error) => match classify(&error) {
                    ConflictClass::Pending { message } | ConflictClass::Hard { message } => {
                        Settlement::Failed(message)
                    }
                },
            },
            Route::Save(post) => {
                let saved = self.saved.toggle(post);
                Settlement::Confirmed(EngagementDelta::new().engaged(saved))
            }
        }
    }

    fn commit_result(
        &self,
        key: &EntityKey,
        fields: &EngagementDelta,
        settled_at_ms: u64,
    ) -> EngagementState {
        match self
            .store
            .commit(key, fields, SourcePriority::LocalResult, settled_at_ms)
        {
            CommitOutcome::Applied(state) => state,
            // Own results land while the gate is held.
            CommitOutcome::RejectedInFlight | CommitOutcome::RejectedStale => self.store.read(key),
        }
    }
}

/// Validate `action` against `key` before anything is flipped.
fn route(key: &EntityKey, action: ToggleAction) -> Result<Route, ToggleOutcome> {
    match (action, &key.entity) {
        (ToggleAction::Follow, EntityRef::User(user)) => {
            if *user == key.viewer.as_user() {
                tracing::debug!(key = %key, "toggle refused: viewer targeted themself");
                Err(ToggleOutcome::SelfActionRejected)
            } else {
                Ok(Route::Follow(*user))
            }
        }
        (ToggleAction::Like, EntityRef::Post(post)) => Ok(Route::Like(*post)),
        (ToggleAction::Save, EntityRef::Post(post)) => Ok(Route::Save(*post)),
        (ToggleAction::Follow, EntityRef::Post(_)) => Err(ToggleOutcome::Failed {
            message: "Only profiles can be followed.".to_string(),
        }),
        (ToggleAction::Like, EntityRef::User(_)) => Err(ToggleOutcome::Failed {
            message: "Only posts can be liked.".to_string(),
        }),
        (ToggleAction::Save, EntityRef::User(_)) => Err(ToggleOutcome::Failed {
            message: "Only posts can be saved.".to_string(),
        }),
    }
}

/// Provisional flip shown while the request is in flight.
fn optimistic_flip(before: &EngagementSnapshot, action: ToggleAction) -> EngagementDelta {
    if before.requested {
        // Withdrawing a parked follow request. No counter moved when the
        // request was sent, so none moves now.
        return EngagementDelta::new().engaged(false).requested(false);
    }
    let delta = EngagementDelta::new().engaged(!before.engaged);
    if before.engaged {
        delta.adjust(action.counter(), -1)
    } else {
        delta.adjust(action.counter(), 1)
    }
}

fn follow_fields(result: &FollowToggled) -> EngagementDelta {
    EngagementDelta::new()
        .engaged(result.is_following)
        .requested(result.follow_request_sent)
        .counter(CounterKind::Followers, result.followers_count)
        .counter(CounterKind::Following, result.following_count)
}

fn like_fields(result: &LikeToggled) -> EngagementDelta {
    EngagementDelta::new()
        .engaged(result.is_liked)
        .counter(CounterKind::Likes, result.likes_count)
}
