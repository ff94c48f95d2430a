//! Deterministic ids, responses, and events
//!
//! Ids are derived from small integers so failures print recognizably
//! and two runs of a test agree on every identifier.

use uuid::Uuid;
use wander_core::{
    CounterKind, EngagementDelta, FollowToggled, LikeToggled, PostId, PushEvent, UserId, ViewerId,
};

/// Viewer id derived from `n`.
pub fn viewer(n: u128) -> ViewerId {
    ViewerId::from_uuid(Uuid::from_u128(n))
}

/// User id derived from `n`.
pub fn user(n: u128) -> UserId {
    UserId::from_uuid(Uuid::from_u128(n))
}

/// Post id derived from `n`.
pub fn post(n: u128) -> PostId {
    PostId::from_uuid(Uuid::from_u128(n))
}

/// Follow response confirming the relationship.
pub fn follow_confirmed(followers_count: u64, following_count: u64) -> FollowToggled {
    FollowToggled {
        is_following: true,
        follow_request_sent: false,
        followers_count,
        following_count,
    }
}

/// Follow response confirming removal of the relationship.
pub fn unfollow_confirmed(followers_count: u64, following_count: u64) -> FollowToggled {
    FollowToggled {
        is_following: false,
        follow_request_sent: false,
        followers_count,
        following_count,
    }
}

/// Like response confirming the like.
pub fn like_confirmed(likes_count: u64) -> LikeToggled {
    LikeToggled {
        is_liked: true,
        likes_count,
    }
}

/// Like response confirming removal of the like.
pub fn unlike_confirmed(likes_count: u64) -> LikeToggled {
    LikeToggled {
        is_liked: false,
        likes_count,
    }
}

/// Push event asserting a post's like count.
pub fn like_count_event(post: PostId, likes_count: u64, timestamp_ms: u64) -> PushEvent {
    PushEvent {
        entity: post.into(),
        fields: EngagementDelta::new().counter(CounterKind::Likes, likes_count),
        timestamp_ms,
    }
}

/// Push event asserting a profile's follower count.
pub fn follower_count_event(user: UserId, followers_count: u64, timestamp_ms: u64) -> PushEvent {
    PushEvent {
        entity: user.into(),
        fields: EngagementDelta::new().counter(CounterKind::Followers, followers_count),
        timestamp_ms,
    }
}
