//! Engagement mutation surface of the backend
//!
//! Toggles are fire-once: the client never cancels an issued request, it
//! lets write arbitration discard a superseded response. Toggling a save
//! is not here because saves are purely local (see the saved-posts ledger
//! in `wander-engage`).

use crate::errors::ApiError;
use crate::identifiers::{PostId, UserId, ViewerId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Server response to a follow toggle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowToggled {
    /// Whether the viewer now follows the target
    pub is_following: bool,
    /// Whether the toggle landed as a pending request on a private
    /// account
    pub follow_request_sent: bool,
    /// Target's follower count after the toggle
    pub followers_count: u64,
    /// Target's following count after the toggle
    pub following_count: u64,
}

/// Server response to a like toggle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeToggled {
    /// Whether the viewer now likes the post
    pub is_liked: bool,
    /// Post's like count after the toggle
    pub likes_count: u64,
}

/// Engagement mutations answered by the backend.
#[async_trait]
pub trait EngagementApi: Send + Sync {
    /// Toggle the viewer's follow relationship with `target`.
    ///
    /// An already-pending follow request surfaces as an HTTP 409 (or a
    /// body message naming the pending request), which the caller treats
    /// as settlement into the requested state, not a failure.
    async fn toggle_follow(
        &self,
        viewer: ViewerId,
        target: UserId,
    ) -> Result<FollowToggled, ApiError>;

    /// Toggle the viewer's like on `post`.
    async fn toggle_like(&self, viewer: ViewerId, post: PostId) -> Result<LikeToggled, ApiError>;
}

/// Blanket implementation for Arc<T> where T: EngagementApi
#[async_trait]
impl<T: EngagementApi + ?Sized> EngagementApi for Arc<T> {
    async fn toggle_follow(
        &self,
        viewer: ViewerId,
        target: UserId,
    ) -> Result<FollowToggled, ApiError> {
        (**self).toggle_follow(viewer, target).await
    }

    async fn toggle_like(&self, viewer: ViewerId, post: PostId) -> Result<LikeToggled, ApiError> {
        (**self).toggle_like(viewer, post).await
    }
}
