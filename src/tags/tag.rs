//! Hierarchical gameplay tags.
//!
//! A tag is an interned dotted name such as `"Status.Burning.Strong"`. Tags
//! are immutable and cheap to copy; hierarchy is carried by the name itself,
//! so `"Status.Burning.Strong"` matches `"Status.Burning"` but not the other
//! way around.

use std::fmt::{self, Formatter};

use string_cache::DefaultAtom;

/// An immutable, cheaply copyable symbolic label.
///
/// # Example
/// ```
/// use bevy_forge::tags::GameplayTag;
///
/// let burning = GameplayTag::new("Status.Burning");
/// let strong = GameplayTag::new("Status.Burning.Strong");
///
/// assert!(strong.matches(&burning));
/// assert!(!burning.matches(&strong));
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct GameplayTag(DefaultAtom);

impl GameplayTag {
    /// Interns a tag from its dotted name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(DefaultAtom::from(name.as_ref()))
    }

    /// The full dotted name of this tag.
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Returns true if `self` is `other` or a descendant of `other`.
    pub fn matches(&self, other: &GameplayTag) -> bool {
        if self == other {
            return true;
        }
        let name = self.name();
        let prefix = other.name();
        name.len() > prefix.len()
            && name.as_bytes()[prefix.len()] == b'.'
            && name.starts_with(prefix)
    }

    /// Returns true only if the tags are identical (no hierarchy walk).
    pub fn matches_exact(&self, other: &GameplayTag) -> bool {
        self == other
    }

    /// The immediate parent tag, if any.
    ///
    /// `"A.B.C"` yields `"A.B"`; a root tag yields `None`.
    pub fn parent(&self) -> Option<GameplayTag> {
        let name = self.name();
        name.rfind('.').map(|split| GameplayTag::new(&name[..split]))
    }

    /// All ancestors, nearest first.
    pub fn parents(&self) -> Vec<GameplayTag> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(tag) = current {
            current = tag.parent();
            out.push(tag);
        }
        out
    }
}

impl fmt::Debug for GameplayTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "GameplayTag({})", self.name())
    }
}

impl fmt::Display for GameplayTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for GameplayTag {
    fn from(name: &str) -> Self {
        GameplayTag::new(name)
    }
}

/// A tag query combining any-of / all-of / none-of clauses.
///
/// Queries are resolved against a [`TagContainer`](super::TagContainer) by
/// the registry; empty clauses are vacuously satisfied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagQuery {
    /// At least one of these must match (if non-empty).
    pub any_of: Vec<GameplayTag>,
    /// Every one of these must match.
    pub all_of: Vec<GameplayTag>,
    /// None of these may match.
    pub none_of: Vec<GameplayTag>,
}

impl TagQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn any_of(mut self, tag: GameplayTag) -> Self {
        self.any_of.push(tag);
        self
    }

    pub fn all_of(mut self, tag: GameplayTag) -> Self {
        self.all_of.push(tag);
        self
    }

    pub fn none_of(mut self, tag: GameplayTag) -> Self {
        self.none_of.push(tag);
        self
    }
}

/// The process-wide tag resolver surface the engine consumes.
///
/// Interning itself is global (backed by `string_cache`), so the registry is
/// a plain value: hosts that want a central authority for tag names own one
/// and route requests through it, while engine internals only ever rely on
/// the interned tags.
#[derive(Debug, Default)]
pub struct TagRegistry {
    registered: Vec<GameplayTag>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `name` and records it as a known tag.
    pub fn request_tag(&mut self, name: &str) -> GameplayTag {
        let tag = GameplayTag::new(name);
        if !self.registered.contains(&tag) {
            self.registered.push(tag.clone());
        }
        tag
    }

    /// Whether the tag has been registered through [`request_tag`](Self::request_tag).
    pub fn is_registered(&self, tag: &GameplayTag) -> bool {
        self.registered.contains(tag)
    }

    /// All ancestors of `tag`, nearest first.
    pub fn extract_parents(&self, tag: &GameplayTag) -> Vec<GameplayTag> {
        tag.parents()
    }

    /// Evaluates `query` against `container` with hierarchical matching.
    pub fn matches_query(&self, container: &super::TagContainer, query: &TagQuery) -> bool {
        if !query.any_of.is_empty() && !container.has_any(&query.any_of) {
            return false;
        }
        if !container.has_all(&query.all_of) {
            return false;
        }
        !container.has_any(&query.none_of)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interned_tags_compare_equal() {
        let a = GameplayTag::new("Status.Burning");
        let b = GameplayTag::new("Status.Burning");
        assert_eq!(a, b);
    }

    #[test]
    fn hierarchical_matching() {
        let root = GameplayTag::new("Status");
        let burning = GameplayTag::new("Status.Burning");
        let strong = GameplayTag::new("Status.Burning.Strong");

        assert!(strong.matches(&burning));
        assert!(strong.matches(&root));
        assert!(burning.matches(&burning));
        assert!(!burning.matches(&strong));
        // Shared prefix without a dot boundary must not match.
        assert!(!GameplayTag::new("Status.BurningFast").matches(&burning));
    }

    #[test]
    fn parent_walk() {
        let strong = GameplayTag::new("Status.Burning.Strong");
        let parents = strong.parents();
        assert_eq!(
            parents,
            vec![
                GameplayTag::new("Status.Burning"),
                GameplayTag::new("Status")
            ]
        );
        assert_eq!(GameplayTag::new("Status").parent(), None);
    }

    #[test]
    fn registry_requests_and_queries() {
        let mut registry = TagRegistry::new();
        let stunned = registry.request_tag("State.Stunned");
        assert!(registry.is_registered(&stunned));

        let mut container = super::super::TagContainer::new();
        container.add(stunned.clone());

        let query = TagQuery::new()
            .all_of(GameplayTag::new("State"))
            .none_of(GameplayTag::new("State.Dead"));
        assert!(registry.matches_query(&container, &query));

        let blocked = TagQuery::new().none_of(stunned);
        assert!(!registry.matches_query(&container, &blocked));
    }
}
