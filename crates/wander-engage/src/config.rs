//! Engagement engine configuration

use serde::{Deserialize, Serialize};

/// Tunables for push event filtering
///
/// Both windows were chosen empirically against production event storms;
/// they are configuration rather than constants so hosts can retune them
/// without a client release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngageConfig {
    /// Push events whose server timestamp is older than this are presumed
    /// superseded and dropped (milliseconds)
    pub stale_event_threshold_ms: u64,

    /// Arrival window within which repeat events for one key are dropped
    /// without inspection (milliseconds)
    pub dedup_window_ms: u64,
}

impl Default for EngageConfig {
    fn default() -> Self {
        Self {
            stale_event_threshold_ms: 5_000,
            dedup_window_ms: 100,
        }
    }
}
