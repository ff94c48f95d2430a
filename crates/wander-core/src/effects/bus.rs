//! Realtime push transport surface
//!
//! Delivery is at-least-once and unordered; the reconciler in
//! `wander-engage` owns dedup, staleness, and echo suppression.
//! Implementations own reconnection and resubscription, so consumers
//! just keep reading their receiver.

use crate::engagement::{EngagementDelta, EntityRef};
use crate::errors::BusError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Engagement change pushed from another session or device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    /// Entity the change applies to
    pub entity: EntityRef,
    /// Fields the event asserts
    pub fields: EngagementDelta,
    /// Server-side occurrence time (Unix ms)
    pub timestamp_ms: u64,
}

/// Name of a realtime channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelName(String);

impl ChannelName {
    /// Per-entity engagement channel (`engagement:user:<id>` or
    /// `engagement:post:<id>`)
    pub fn entity(entity: &EntityRef) -> Self {
        Self(format!("engagement:{entity}"))
    }

    /// Feed invalidation broadcast channel
    pub fn feed_invalidation() -> Self {
        Self("invalidate:feed".to_string())
    }

    /// Channel name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receiving half of one channel subscription.
pub type EventReceiver = mpsc::UnboundedReceiver<PushEvent>;

/// Persistent push transport.
#[async_trait]
pub trait RealtimeBus: Send + Sync {
    /// Open a subscription to `channel`.
    ///
    /// Subscribing to an already-subscribed channel returns a fresh
    /// receiver for it rather than failing.
    async fn subscribe(&self, channel: ChannelName) -> Result<EventReceiver, BusError>;

    /// Tear down the subscription to `channel`. Idempotent.
    async fn unsubscribe(&self, channel: ChannelName) -> Result<(), BusError>;
}

/// Blanket implementation for Arc<T> where T: RealtimeBus
#[async_trait]
impl<T: RealtimeBus + ?Sized> RealtimeBus for Arc<T> {
    async fn subscribe(&self, channel: ChannelName) -> Result<EventReceiver, BusError> {
        (**self).subscribe(channel).await
    }

    async fn unsubscribe(&self, channel: ChannelName) -> Result<(), BusError> {
        (**self).unsubscribe(channel).await
    }
}
