//! Device-local saved posts
//!
//! Saves never leave the device, so they settle without a network round
//! trip. The set is shared by clone and serializes as a plain id list so
//! the host can persist it between sessions.

use parking_lot::Mutex;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::sync::Arc;
use wander_core::PostId;

/// Shared set of posts the viewer has saved on this device.
#[derive(Debug, Clone, Default)]
pub struct SavedPosts {
    inner: Arc<Mutex<BTreeSet<PostId>>>,
}

impl SavedPosts {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip `post`'s membership; returns the new saved state.
    pub fn toggle(&self, post: PostId) -> bool {
        let mut set = self.inner.lock();
        if set.remove(&post) {
            false
        } else {
            set.insert(post);
            true
        }
    }

    /// True when `post` is saved.
    pub fn contains(&self, post: &PostId) -> bool {
        self.inner.lock().contains(post)
    }

    /// Saved post ids in stable order.
    pub fn ids(&self) -> Vec<PostId> {
        self.inner.lock().iter().copied().collect()
    }

    /// Replace the whole set, e.g. when restoring persisted state.
    pub fn replace(&self, posts: impl IntoIterator<Item = PostId>) {
        *self.inner.lock() = posts.into_iter().collect();
    }

    /// Number of saved posts.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// True when nothing is saved.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Serialize for SavedPosts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.lock().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SavedPosts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let set = BTreeSet::<PostId>::deserialize(deserializer)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(set)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_alternates_membership() {
        let saved = SavedPosts::new();
        let post = PostId::new();

        assert!(saved.toggle(post));
        assert!(saved.contains(&post));
        assert!(!saved.toggle(post));
        assert!(!saved.contains(&post));
    }

    #[test]
    fn clones_share_the_set() {
        let saved = SavedPosts::new();
        let duplicate = saved.clone();
        let post = PostId::new();

        saved.toggle(post);
        assert!(duplicate.contains(&post));
        assert_eq!(duplicate.len(), 1);
    }

    #[test]
    fn replace_swaps_the_whole_set() {
        let saved = SavedPosts::new();
        saved.toggle(PostId::new());

        let kept = PostId::new();
        saved.replace([kept]);
        assert_eq!(saved.ids(), vec![kept]);
    }

    #[test]
    fn serializes_as_an_id_list() {
        let saved = SavedPosts::new();
        let post = PostId::new();
        saved.toggle(post);

        // The wire form is the bare uuid, not the display form.
        let value = serde_json::to_value(&saved).expect("serialize");
        assert_eq!(value, serde_json::json!([post.uuid()]));

        let restored: SavedPosts = serde_json::from_value(value).expect("deserialize");
        assert!(restored.contains(&post));
        assert_eq!(restored.len(), 1);
    }
}
