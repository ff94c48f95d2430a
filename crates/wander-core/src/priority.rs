//! Write-source precedence and the per-key engagement record
//!
//! Every candidate write names its source; the store arbitrates
//! conflicting candidates by source rank, then by observation time.

use crate::engagement::EngagementSnapshot;
use serde::{Deserialize, Serialize};

/// Precedence rank of a candidate write's source
///
/// Variants are declared in ascending rank, so the derived `Ord` is the
/// arbitration order. The response to an operation this session initiated
/// (`LocalResult`) outranks everything. A fresh network body outranks a
/// push event relayed between sessions, which outranks a cache
/// revalidation, which outranks the provisional optimistic flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePriority {
    /// Optimistic flip written while its request is in flight
    LocalInflight,
    /// Refetch revalidated from cache (304, unchanged body)
    CachedFetch,
    /// Push event from another session or device
    RemoteEvent,
    /// Refetch answered by the network with a fresh body
    FreshFetch,
    /// HTTP response of an operation this session initiated
    LocalResult,
}

/// Per-key record held by the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementState {
    /// Current user-visible snapshot
    pub snapshot: EngagementSnapshot,
    /// Observation time of the last accepted write (Unix ms)
    pub last_authoritative_at_ms: u64,
    /// Source rank of the last accepted write; `None` until a record's
    /// first write, so a fresh record never outranks a candidate
    pub source: Option<SourcePriority>,
    /// Whether a toggle for this key is between optimistic flip and
    /// settlement
    pub in_flight: bool,
}

impl EngagementState {
    /// Record seeded with a snapshot, as if accepted from `source` at
    /// `observed_at_ms`
    pub fn seeded(
        snapshot: EngagementSnapshot,
        source: SourcePriority,
        observed_at_ms: u64,
    ) -> Self {
        Self {
            snapshot,
            last_authoritative_at_ms: observed_at_ms,
            source: Some(source),
            in_flight: false,
        }
    }
}
