//! In-process realtime bus double
//!
//! Delivers only what a test publishes. Every live subscriber of a
//! channel receives each published event, so code that subscribes to the
//! same channel twice behaves the same as against a real fan-out bus.

use async_lock::Mutex;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use wander_core::{BusError, ChannelName, EventReceiver, PushEvent, RealtimeBus};

struct BusInner {
    channels: Mutex<HashMap<ChannelName, Vec<mpsc::UnboundedSender<PushEvent>>>>,
    unsubscribed: Mutex<Vec<ChannelName>>,
    fail_subscribe: AtomicBool,
}

/// Realtime bus driven entirely by the test.
///
/// Clones share channels and logs, so a test publishes through one clone
/// while the code under test subscribes through another.
#[derive(Clone)]
pub struct ScriptedBus {
    inner: Arc<BusInner>,
}

impl ScriptedBus {
    /// Bus with no channels and working subscribes.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                channels: Mutex::new(HashMap::new()),
                unsubscribed: Mutex::new(Vec::new()),
                fail_subscribe: AtomicBool::new(false),
            }),
        }
    }

    /// Make every subsequent subscribe fail until turned off again.
    pub fn fail_subscribes(&self, fail: bool) {
        self.inner.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    /// Deliver `event` to every live subscriber of `channel`.
    ///
    /// Returns how many subscribers received it.
    pub async fn publish(&self, channel: &ChannelName, event: PushEvent) -> usize {
        let mut channels = self.inner.channels.lock().await;
        let Some(senders) = channels.get_mut(channel) else {
            return 0;
        };
        senders.retain(|sender| sender.send(event.clone()).is_ok());
        senders.len()
    }

    /// Live subscriber count for `channel`.
    pub async fn subscriber_count(&self, channel: &ChannelName) -> usize {
        let mut channels = self.inner.channels.lock().await;
        match channels.get_mut(channel) {
            Some(senders) => {
                senders.retain(|sender| !sender.is_closed());
                senders.len()
            }
            None => 0,
        }
    }

    /// Channels unsubscribed so far, in call order.
    pub async fn unsubscribed(&self) -> Vec<ChannelName> {
        self.inner.unsubscribed.lock().await.clone()
    }
}

impl Default for ScriptedBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RealtimeBus for ScriptedBus {
    async fn subscribe(&self, channel: ChannelName) -> Result<EventReceiver, BusError> {
        if self.inner.fail_subscribe.load(Ordering::SeqCst) {
            return Err(BusError::Subscribe {
                channel: channel.to_string(),
                reason: "scripted subscribe failure".to_string(),
            });
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        self.inner
            .channels
            .lock()
            .await
            .entry(channel)
            .or_default()
            .push(sender);
        Ok(receiver)
    }

    async fn unsubscribe(&self, channel: ChannelName) -> Result<(), BusError> {
        self.inner.channels.lock().await.remove(&channel);
        self.inner.unsubscribed.lock().await.push(channel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wander_core::{EngagementDelta, EntityRef, PostId};

    fn event() -> PushEvent {
        PushEvent {
            entity: EntityRef::Post(PostId::new()),
            fields: EngagementDelta::new().engaged(true),
            timestamp_ms: 1_000,
        }
    }

    #[tokio::test]
    async fn fans_out_to_every_live_subscriber() {
        let bus = ScriptedBus::new();
        let channel = ChannelName::feed_invalidation();
        let mut first = bus.subscribe(channel.clone()).await.expect("subscribe");
        let mut second = bus.subscribe(channel.clone()).await.expect("subscribe");

        let delivered = bus.publish(&channel, event()).await;
        assert_eq!(delivered, 2);
        assert!(first.recv().await.is_some());
        assert!(second.recv().await.is_some());
    }

    #[tokio::test]
    async fn unsubscribe_closes_receivers() {
        let bus = ScriptedBus::new();
        let channel = ChannelName::feed_invalidation();
        let mut receiver = bus.subscribe(channel.clone()).await.expect("subscribe");

        bus.unsubscribe(channel.clone()).await.expect("unsubscribe");
        assert_eq!(bus.publish(&channel, event()).await, 0);
        assert!(receiver.recv().await.is_none());
        assert_eq!(bus.unsubscribed().await, vec![channel]);
    }

    #[tokio::test]
    async fn dropped_receivers_are_pruned() {
        let bus = ScriptedBus::new();
        let channel = ChannelName::feed_invalidation();
        let receiver = bus.subscribe(channel.clone()).await.expect("subscribe");
        drop(receiver);

        assert_eq!(bus.subscriber_count(&channel).await, 0);
        assert_eq!(bus.publish(&channel, event()).await, 0);
    }

    #[tokio::test]
    async fn scripted_failure_surfaces_as_a_subscribe_error() {
        let bus = ScriptedBus::new();
        bus.fail_subscribes(true);

        let result = bus.subscribe(ChannelName::feed_invalidation()).await;
        assert!(matches!(result, Err(BusError::Subscribe { .. })));

        bus.fail_subscribes(false);
        assert!(bus.subscribe(ChannelName::feed_invalidation()).await.is_ok());
    }
}
