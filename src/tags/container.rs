//! Tag containers with set algebra.

use std::collections::HashSet;

use super::GameplayTag;

/// An unordered set of tags with hierarchical and exact set algebra.
///
/// The container caches its parent-expanded form so ancestor containment
/// checks (`has_tag`) are O(1); the cache is rebuilt on mutation.
///
/// # Example
/// ```
/// use bevy_forge::tags::{GameplayTag, TagContainer};
///
/// let mut tags = TagContainer::new();
/// tags.add(GameplayTag::new("Status.Burning.Strong"));
///
/// assert!(tags.has_tag(&GameplayTag::new("Status.Burning")));
/// assert!(!tags.has_tag_exact(&GameplayTag::new("Status.Burning")));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagContainer {
    tags: Vec<GameplayTag>,
    with_parents: HashSet<GameplayTag>,
}

impl TagContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a container from an iterator of tags.
    pub fn from_tags(tags: impl IntoIterator<Item = GameplayTag>) -> Self {
        let mut container = Self::new();
        for tag in tags {
            container.add(tag);
        }
        container
    }

    /// Adds a tag. Returns false if it was already present.
    pub fn add(&mut self, tag: GameplayTag) -> bool {
        if self.tags.contains(&tag) {
            return false;
        }
        for parent in tag.parents() {
            self.with_parents.insert(parent);
        }
        self.with_parents.insert(tag.clone());
        self.tags.push(tag);
        true
    }

    /// Removes a tag. Returns false if it was not present.
    pub fn remove(&mut self, tag: &GameplayTag) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        if self.tags.len() == before {
            return false;
        }
        self.rebuild_expanded();
        true
    }

    fn rebuild_expanded(&mut self) {
        self.with_parents.clear();
        for tag in &self.tags {
            for parent in tag.parents() {
                self.with_parents.insert(parent);
            }
            self.with_parents.insert(tag.clone());
        }
    }

    /// True if any held tag is `tag` or a descendant of it.
    pub fn has_tag(&self, tag: &GameplayTag) -> bool {
        self.with_parents.contains(tag)
    }

    /// True if `tag` itself is held.
    pub fn has_tag_exact(&self, tag: &GameplayTag) -> bool {
        self.tags.contains(tag)
    }

    /// True if at least one of `tags` matches hierarchically.
    /// Empty input yields false.
    pub fn has_any(&self, tags: &[GameplayTag]) -> bool {
        tags.iter().any(|tag| self.has_tag(tag))
    }

    /// True if every one of `tags` matches hierarchically.
    /// Empty input yields true.
    pub fn has_all(&self, tags: &[GameplayTag]) -> bool {
        tags.iter().all(|tag| self.has_tag(tag))
    }

    /// True if at least one of `tags` is held exactly.
    pub fn has_any_exact(&self, tags: &[GameplayTag]) -> bool {
        tags.iter().any(|tag| self.has_tag_exact(tag))
    }

    /// True if every one of `tags` is held exactly.
    pub fn has_all_exact(&self, tags: &[GameplayTag]) -> bool {
        tags.iter().all(|tag| self.has_tag_exact(tag))
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameplayTag> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// The held tags as a slice, in insertion order.
    pub fn as_slice(&self) -> &[GameplayTag] {
        &self.tags
    }
}

impl FromIterator<GameplayTag> for TagContainer {
    fn from_iter<I: IntoIterator<Item = GameplayTag>>(iter: I) -> Self {
        Self::from_tags(iter)
    }
}

impl<'a> IntoIterator for &'a TagContainer {
    type Item = &'a GameplayTag;
    type IntoIter = std::slice::Iter<'a, GameplayTag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}
