//! Engagement data model
//!
//! Entity addressing (`EntityRef`, `EntityKey`), displayed counters
//! (`CounterSet`), and candidate writes (`EngagementDelta`). Everything
//! here is a pure value type; arbitration between candidates lives in
//! `wander-engage`.

use crate::identifiers::{PostId, UserId, ViewerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of entity that carries engagement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A user profile (follow relationship, follower/following counts)
    User,
    /// A post (likes, comments, saves)
    Post,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::User => write!(f, "user"),
            EntityKind::Post => write!(f, "post"),
        }
    }
}

/// Reference to an engageable entity
///
/// Carries the kind and the id together so a mismatched pair is
/// unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityRef {
    /// A user profile
    User(UserId),
    /// A post
    Post(PostId),
}

impl EntityRef {
    /// The kind of the referenced entity
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::User(_) => EntityKind::User,
            EntityRef::Post(_) => EntityKind::Post,
        }
    }

    /// The target user, when this references a profile
    pub fn as_user(&self) -> Option<UserId> {
        match self {
            EntityRef::User(id) => Some(*id),
            EntityRef::Post(_) => None,
        }
    }

    /// The target post, when this references a post
    pub fn as_post(&self) -> Option<PostId> {
        match self {
            EntityRef::Post(id) => Some(*id),
            EntityRef::User(_) => None,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::User(id) => write!(f, "user:{}", id.uuid()),
            EntityRef::Post(id) => write!(f, "post:{}", id.uuid()),
        }
    }
}

impl From<UserId> for EntityRef {
    fn from(id: UserId) -> Self {
        EntityRef::User(id)
    }
}

impl From<PostId> for EntityRef {
    fn from(id: PostId) -> Self {
        EntityRef::Post(id)
    }
}

/// Addressing key for one engagement relationship
///
/// An entity as seen by one viewer. All candidate writes, subscriptions,
/// and in-flight gates are scoped to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    /// The engaged entity
    pub entity: EntityRef,
    /// The session viewer whose relationship this is
    pub viewer: ViewerId,
}

impl EntityKey {
    /// Create a key for any entity reference
    pub fn new(entity: impl Into<EntityRef>, viewer: ViewerId) -> Self {
        Self {
            entity: entity.into(),
            viewer,
        }
    }

    /// Key for the viewer's relationship with a user profile
    pub fn user(user: UserId, viewer: ViewerId) -> Self {
        Self::new(user, viewer)
    }

    /// Key for the viewer's relationship with a post
    pub fn post(post: PostId, viewer: ViewerId) -> Self {
        Self::new(post, viewer)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.entity, self.viewer)
    }
}

/// Engagement counters tracked per entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterKind {
    /// Accounts following a profile
    Followers,
    /// Accounts a profile follows
    Following,
    /// Likes on a post
    Likes,
    /// Comments on a post
    Comments,
    /// Saves of a post
    Saves,
}

/// Ordered map of engagement counters
///
/// Absent counters read as zero, and zero is stored as absence, so two
/// sets that display the same values compare equal. Adjustments saturate
/// at zero so a double-delivered decrement can never drive a displayed
/// count negative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CounterSet(BTreeMap<CounterKind, u64>);

impl CounterSet {
    /// Empty counter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value, zero when the counter was never set
    pub fn get(&self, kind: CounterKind) -> u64 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    /// Overwrite a counter with an absolute value
    pub fn set(&mut self, kind: CounterKind, value: u64) {
        if value == 0 {
            self.0.remove(&kind);
        } else {
            self.0.insert(kind, value);
        }
    }

    /// Apply a signed adjustment, saturating at zero
    pub fn adjust(&mut self, kind: CounterKind, delta: i64) {
        let next = CounterChange::Adjust(delta).apply(self.get(kind));
        self.set(kind, next);
    }

    /// Iterate non-zero counters in kind order
    pub fn iter(&self) -> impl Iterator<Item = (CounterKind, u64)> + '_ {
        self.0.iter().map(|(kind, value)| (*kind, *value))
    }

    /// True when every counter reads zero
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(CounterKind, u64)> for CounterSet {
    fn from_iter<I: IntoIterator<Item = (CounterKind, u64)>>(iter: I) -> Self {
        let mut counters = Self::default();
        for (kind, value) in iter {
            counters.set(kind, value);
        }
        counters
    }
}

impl<'de> Deserialize<'de> for CounterSet {
    fn deserialize<D: serde::de::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Persisted snapshots may carry explicit zeros; fold them back
        // into the absent form.
        let raw = BTreeMap::<CounterKind, u64>::deserialize(deserializer)?;
        Ok(raw.into_iter().collect())
    }
}

/// One counter field inside a candidate write
///
/// Push channels deliver both absolute values and increments, so a
/// candidate distinguishes the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterChange {
    /// Replace the counter with an absolute value
    Set(u64),
    /// Shift the counter by a signed amount, saturating at zero
    Adjust(i64),
}

impl CounterChange {
    /// The value this change yields on top of `current`
    pub fn apply(&self, current: u64) -> u64 {
        match *self {
            CounterChange::Set(value) => value,
            CounterChange::Adjust(delta) if delta >= 0 => {
                current.saturating_add(delta.unsigned_abs())
            }
            CounterChange::Adjust(delta) => current.saturating_sub(delta.unsigned_abs()),
        }
    }
}

/// The user-visible engagement state of one entity for one viewer
///
/// `engaged` and `requested` are mutually exclusive: a follow is either
/// active or pending approval, never both. [`EngagementDelta::apply_to`]
/// maintains the exclusion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementSnapshot {
    /// Whether the viewer is engaged (following / liked / saved)
    pub engaged: bool,
    /// Whether a follow request is pending approval on a private account
    pub requested: bool,
    /// Displayed counters
    pub counters: CounterSet,
}

impl EngagementSnapshot {
    /// Snapshot with an engaged flag and no counters
    pub fn engaged(engaged: bool) -> Self {
        Self {
            engaged,
            ..Self::default()
        }
    }
}

/// A candidate write: only the fields that are present are asserted
///
/// Every source of truth (optimistic flip, HTTP response, refetch body,
/// push event) is expressed as a delta before arbitration. Absent fields
/// leave the record untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementDelta {
    /// Asserted engaged flag, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engaged: Option<bool>,
    /// Asserted pending-request flag, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested: Option<bool>,
    /// Asserted counter changes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub counters: BTreeMap<CounterKind, CounterChange>,
}

impl EngagementDelta {
    /// Empty delta asserting nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Assert the engaged flag
    #[must_use]
    pub fn engaged(mut self, engaged: bool) -> Self {
        self.engaged = Some(engaged);
        self
    }

    /// Assert the pending-request flag
    #[must_use]
    pub fn requested(mut self, requested: bool) -> Self {
        self.requested = Some(requested);
        self
    }

    /// Set a counter to an absolute value
    #[must_use]
    pub fn counter(mut self, kind: CounterKind, value: u64) -> Self {
        self.counters.insert(kind, CounterChange::Set(value));
        self
    }

    /// Shift a counter by a signed amount
    #[must_use]
    pub fn adjust(mut self, kind: CounterKind, delta: i64) -> Self {
        self.counters.insert(kind, CounterChange::Adjust(delta));
        self
    }

    /// Full-snapshot delta asserting every field of `snapshot`
    ///
    /// Used for rollback, where the pre-toggle state is reasserted
    /// wholesale.
    pub fn from_snapshot(snapshot: &EngagementSnapshot) -> Self {
        Self {
            engaged: Some(snapshot.engaged),
            requested: Some(snapshot.requested),
            counters: snapshot
                .counters
                .iter()
                .map(|(kind, value)| (kind, CounterChange::Set(value)))
                .collect(),
        }
    }

    /// True when no field is asserted
    pub fn is_empty(&self) -> bool {
        self.engaged.is_none() && self.requested.is_none() && self.counters.is_empty()
    }

    /// Apply the present fields to `snapshot`, yielding the next snapshot
    ///
    /// Asserting `engaged = true` clears `requested`, and asserting
    /// `requested = true` clears `engaged`, so the pair can never read
    /// true/true no matter what a payload carries.
    pub fn apply_to(&self, snapshot: &EngagementSnapshot) -> EngagementSnapshot {
        let mut next = snapshot.clone();
        if let Some(engaged) = self.engaged {
            next.engaged = engaged;
            if engaged {
                next.requested = false;
            }
        }
        if let Some(requested) = self.requested {
            next.requested = requested;
            if requested {
                next.engaged = false;
            }
        }
        for (kind, change) in &self.counters {
            let current = next.counters.get(*kind);
            next.counters.set(*kind, change.apply(current));
        }
        next
    }

    /// True when applying this delta to `snapshot` would change nothing
    pub fn is_noop_on(&self, snapshot: &EngagementSnapshot) -> bool {
        self.apply_to(snapshot) == *snapshot
    }
}
