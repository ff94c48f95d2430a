//! Scripted engagement API double
//!
//! Answers toggles from pre-queued responses and records every call.
//! The gated variant parks calls on a semaphore until the test releases
//! them, which is how settlement-ordering tests hold a toggle in flight
//! while other writes arrive.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use wander_core::{ApiError, EngagementApi, FollowToggled, LikeToggled, PostId, UserId, ViewerId};

struct ApiInner {
    follow_script: Mutex<VecDeque<Result<FollowToggled, ApiError>>>,
    like_script: Mutex<VecDeque<Result<LikeToggled, ApiError>>>,
    follow_targets: Mutex<Vec<UserId>>,
    like_targets: Mutex<Vec<PostId>>,
    follow_calls: AtomicU64,
    like_calls: AtomicU64,
    gate: Option<Semaphore>,
}

/// Engagement API that replays scripted responses.
///
/// Clones share the script, the call log, and the gate. An unscripted
/// call answers HTTP 500 so the test fails loudly instead of hanging.
#[derive(Clone)]
pub struct ScriptedApi {
    inner: Arc<ApiInner>,
}

impl ScriptedApi {
    /// API that answers as soon as it is called.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// API that parks every call until [`ScriptedApi::release`].
    pub fn gated() -> Self {
        Self::build(Some(Semaphore::new(0)))
    }

    fn build(gate: Option<Semaphore>) -> Self {
        Self {
            inner: Arc::new(ApiInner {
                follow_script: Mutex::new(VecDeque::new()),
                like_script: Mutex::new(VecDeque::new()),
                follow_targets: Mutex::new(Vec::new()),
                like_targets: Mutex::new(Vec::new()),
                follow_calls: AtomicU64::new(0),
                like_calls: AtomicU64::new(0),
                gate,
            }),
        }
    }

    /// Queue the response for the next follow toggle.
    pub fn queue_follow(&self, response: Result<FollowToggled, ApiError>) {
        self.inner.follow_script.lock().push_back(response);
    }

    /// Queue the response for the next like toggle.
    pub fn queue_like(&self, response: Result<LikeToggled, ApiError>) {
        self.inner.like_script.lock().push_back(response);
    }

    /// Let `calls` parked calls through the gate. No-op when ungated.
    pub fn release(&self, calls: usize) {
        if let Some(gate) = &self.inner.gate {
            gate.add_permits(calls);
        }
    }

    /// Follow toggles received so far.
    pub fn follow_calls(&self) -> u64 {
        self.inner.follow_calls.load(Ordering::SeqCst)
    }

    /// Like toggles received so far.
    pub fn like_calls(&self) -> u64 {
        self.inner.like_calls.load(Ordering::SeqCst)
    }

    /// Targets of every follow toggle, in call order.
    pub fn follow_targets(&self) -> Vec<UserId> {
        self.inner.follow_targets.lock().clone()
    }

    /// Targets of every like toggle, in call order.
    pub fn like_targets(&self) -> Vec<PostId> {
        self.inner.like_targets.lock().clone()
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.inner.gate {
            match gate.acquire().await {
                Ok(permit) => permit.forget(),
                // A closed gate releases every parked call.
                Err(_) => {}
            }
        }
    }
}

impl Default for ScriptedApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EngagementApi for ScriptedApi {
    async fn toggle_follow(
        &self,
        _viewer: ViewerId,
        target: UserId,
    ) -> Result<FollowToggled, ApiError> {
        self.inner.follow_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.follow_targets.lock().push(target);
        self.pass_gate().await;
        self.inner
            .follow_script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::status(500, "no scripted follow response")))
    }

    async fn toggle_like(&self, _viewer: ViewerId, post: PostId) -> Result<LikeToggled, ApiError> {
        self.inner.like_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.like_targets.lock().push(post);
        self.pass_gate().await;
        self.inner
            .like_script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::status(500, "no scripted like response")))
    }
}
