//! Wall-clock effect
//!
//! Every candidate write is stamped through [`Clock`] so tests can drive
//! arbitration with a manual clock instead of the system time.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock milliseconds.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current Unix time in milliseconds.
    async fn now_ms(&self) -> u64;
}

/// Blanket implementation for Arc<T> where T: Clock
#[async_trait]
impl<T: Clock + ?Sized> Clock for Arc<T> {
    async fn now_ms(&self) -> u64 {
        (**self).now_ms().await
    }
}

/// System wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    async fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}
