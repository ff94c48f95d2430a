//! # Wander Engage
//!
//! Real-time engagement state synchronization for the Wander client.
//!
//! Social engagement flags (is-following, is-liked, is-saved) and their
//! counters are written by three concurrently-arriving sources: the
//! viewer's own optimistic toggles and their HTTP responses, background
//! refetches of entity payloads, and push events relayed from other
//! sessions and devices. This crate keeps one record per
//! entity-and-viewer consistent across all three.
//!
//! # Architecture
//!
//! - [`EngagementStore`] is the single owner of per-key records.
//!   Every source funnels through [`EngagementStore::commit`], which
//!   arbitrates candidates by source rank and observation time.
//! - [`ToggleController`] runs the toggle workflow: claim the per-key
//!   gate, flip optimistically, call the API, settle from the response.
//! - [`StalenessGuard`] stamps refetches with their issue time so a slow
//!   response cannot overwrite what a toggle settled meanwhile.
//! - [`RealtimeReconciler`] filters push events (observation, burst
//!   dedup, staleness, idempotence) before offering them to the store.
//! - [`EngagementEngine`] wires the pieces to one viewer session and
//!   owns the per-channel pump tasks.

#![deny(missing_docs)]
#![forbid(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

/// Engine configuration and tunables
pub mod config;
/// Classification of failed toggle calls
pub mod conflict;
/// Session engine wiring store, controller, guard, and reconciler
pub mod engine;
/// Activity counters and their serializable snapshot
pub mod metrics;
/// Push event filtering and reconciliation
pub mod reconciler;
/// Client-side saved-posts ledger
pub mod saved;
/// Issue-time stamping for background refetches
pub mod staleness;
/// Engagement record store and write arbitration
pub mod store;
/// Toggle workflow controller
pub mod toggle;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::EngageConfig;
pub use conflict::{classify, ConflictClass};
pub use engine::{EngagementEngine, EngagementHandle};
pub use metrics::{EngageMetrics, MetricsSnapshot};
pub use reconciler::{EventDisposition, RealtimeReconciler};
pub use saved::SavedPosts;
pub use staleness::{FetchOrigin, FetchStamp, GuardVerdict, StalenessGuard};
pub use store::{CommitOutcome, EngagementStore, StoreSubscription};
pub use toggle::{Severity, ToggleAction, ToggleController, ToggleOutcome};
