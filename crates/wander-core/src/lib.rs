//! # Wander Core
//!
//! Foundation types for the Wander client core: identifier newtypes, the
//! engagement data model, write-source precedence, the collaborator effect
//! traits, and shared error types.
//!
//! This crate holds no synchronization behavior of its own. The candidate
//! arbitration, toggle workflow, and realtime reconciliation live in
//! `wander-engage` and build on these types; deterministic collaborator
//! fakes live in `wander-testkit`.

#![forbid(unsafe_code)]

// === Modules ===

/// Collaborator effect traits (clock, engagement API, realtime bus)
pub mod effects;
/// Engagement data model: entity addressing, counters, snapshots, deltas
pub mod engagement;
/// Shared error types for the collaborators
pub mod errors;
/// Identifier newtypes
pub mod identifiers;
/// Write-source precedence and the per-key engagement record
pub mod priority;

// === Public API Re-exports ===

pub use effects::{
    ChannelName, Clock, EngagementApi, EventReceiver, FollowToggled, LikeToggled, PushEvent,
    RealtimeBus, SystemClock,
};
pub use engagement::{
    CounterChange, CounterKind, CounterSet, EngagementDelta, EngagementSnapshot, EntityKey,
    EntityKind, EntityRef,
};
pub use errors::{ApiError, BusError};
pub use identifiers::{PostId, UserId, ViewerId};
pub use priority::{EngagementState, SourcePriority};
