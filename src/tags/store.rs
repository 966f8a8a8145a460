//! Per-entity tag ownership: permanent base tags plus reference-counted
//! modifier tags contributed by effects and ability activations.

use std::collections::HashMap;

use bevy::log::warn;

use super::{GameplayTag, TagContainer};

/// A reference-counted multiset of tags.
///
/// Membership flips only on 0↔1 count transitions; removing at zero count is
/// a silent no-op (debug-asserted).
#[derive(Debug, Clone, Default)]
pub struct TagCountMap {
    counts: HashMap<GameplayTag, u32>,
}

impl TagCountMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the count for `tag`. Returns true on the 0→1 transition.
    pub fn increment(&mut self, tag: GameplayTag) -> bool {
        let count = self.counts.entry(tag).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Decrements the count for `tag`. Returns true on the 1→0 transition.
    pub fn decrement(&mut self, tag: &GameplayTag) -> bool {
        match self.counts.get_mut(tag) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                self.counts.remove(tag);
                true
            }
            None => {
                debug_assert!(false, "decrement of absent tag {tag}");
                warn!("ignoring decrement of absent tag {tag}");
                false
            }
        }
    }

    pub fn count(&self, tag: &GameplayTag) -> u32 {
        self.counts.get(tag).copied().unwrap_or(0)
    }

    pub fn contains(&self, tag: &GameplayTag) -> bool {
        self.count(tag) > 0
    }

    /// True if any held tag is `tag` or a descendant of it.
    pub fn has_matching(&self, tag: &GameplayTag) -> bool {
        self.counts.keys().any(|held| held.matches(tag))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GameplayTag, u32)> {
        self.counts.iter().map(|(tag, count)| (tag, *count))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// The tag store of one entity.
///
/// Base tags are owned permanently; modifier tags are reference-counted and
/// contributed by live effects and active ability instances. The combined
/// view satisfies `combined = base ∪ {t : modifier_count[t] > 0}` at all
/// times.
///
/// Mutations set a change flag only when combined membership actually
/// changed; the owning entity consumes the flag once per public operation to
/// drive ongoing-requirement re-evaluation and change notifications.
#[derive(Debug, Clone, Default)]
pub struct EntityTags {
    base: TagContainer,
    modifiers: TagCountMap,
    combined: TagContainer,
    changed: bool,
}

impl EntityTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Permanently adds a base tag.
    pub fn add_base(&mut self, tag: GameplayTag) {
        if self.base.add(tag.clone()) && self.combined.add(tag) {
            self.changed = true;
        }
    }

    /// Removes a base tag. Removing an absent base tag is a no-op.
    pub fn remove_base(&mut self, tag: &GameplayTag) {
        if !self.base.remove(tag) {
            debug_assert!(false, "removing absent base tag {tag}");
            warn!("ignoring removal of absent base tag {tag}");
            return;
        }
        if !self.modifiers.contains(tag) && self.combined.remove(tag) {
            self.changed = true;
        }
    }

    /// Adds one reference of a modifier tag.
    pub fn add_modifier(&mut self, tag: GameplayTag) {
        if self.modifiers.increment(tag.clone())
            && !self.base.has_tag_exact(&tag)
            && self.combined.add(tag)
        {
            self.changed = true;
        }
    }

    /// Releases one reference of a modifier tag.
    pub fn remove_modifier(&mut self, tag: &GameplayTag) {
        if self.modifiers.decrement(tag)
            && !self.base.has_tag_exact(tag)
            && self.combined.remove(tag)
        {
            self.changed = true;
        }
    }

    /// Adds one reference for every tag in `tags`.
    pub fn add_modifier_many(&mut self, tags: &TagContainer) {
        for tag in tags {
            self.add_modifier(tag.clone());
        }
    }

    /// Releases one reference for every tag in `tags`.
    pub fn remove_modifier_many(&mut self, tags: &TagContainer) {
        for tag in tags {
            self.remove_modifier(tag);
        }
    }

    /// The combined base + modifier view.
    pub fn combined(&self) -> &TagContainer {
        &self.combined
    }

    pub fn base_tags(&self) -> &TagContainer {
        &self.base
    }

    pub fn modifier_count(&self, tag: &GameplayTag) -> u32 {
        self.modifiers.count(tag)
    }

    /// True if any combined tag is `tag` or a descendant of it.
    pub fn has_tag(&self, tag: &GameplayTag) -> bool {
        self.combined.has_tag(tag)
    }

    pub fn has_tag_exact(&self, tag: &GameplayTag) -> bool {
        self.combined.has_tag_exact(tag)
    }

    /// Takes and clears the membership-change flag.
    pub(crate) fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> GameplayTag {
        GameplayTag::new(name)
    }

    #[test]
    fn combined_is_union_of_base_and_counted_modifiers() {
        let mut tags = EntityTags::new();
        tags.add_base(tag("Class.Mage"));
        tags.add_modifier(tag("Status.Burning"));
        tags.add_modifier(tag("Status.Burning"));

        assert!(tags.has_tag_exact(&tag("Class.Mage")));
        assert!(tags.has_tag_exact(&tag("Status.Burning")));
        assert_eq!(tags.modifier_count(&tag("Status.Burning")), 2);

        tags.remove_modifier(&tag("Status.Burning"));
        assert!(tags.has_tag_exact(&tag("Status.Burning")));
        tags.remove_modifier(&tag("Status.Burning"));
        assert!(!tags.has_tag_exact(&tag("Status.Burning")));
    }

    #[test]
    fn change_flag_tracks_membership_not_counts() {
        let mut tags = EntityTags::new();
        tags.add_modifier(tag("A"));
        assert!(tags.take_changed());

        // Second reference keeps membership, so no change is reported.
        tags.add_modifier(tag("A"));
        assert!(!tags.take_changed());

        tags.remove_modifier(&tag("A"));
        assert!(!tags.take_changed());
        tags.remove_modifier(&tag("A"));
        assert!(tags.take_changed());
    }

    #[test]
    fn base_tag_shadows_modifier_count() {
        let mut tags = EntityTags::new();
        tags.add_base(tag("A"));
        tags.take_changed();

        // Modifier references on a base tag never change membership.
        tags.add_modifier(tag("A"));
        tags.remove_modifier(&tag("A"));
        assert!(!tags.take_changed());
        assert!(tags.has_tag_exact(&tag("A")));

        tags.remove_base(&tag("A"));
        assert!(tags.take_changed());
        assert!(!tags.has_tag_exact(&tag("A")));
    }

    #[test]
    fn remove_at_zero_is_a_no_op() {
        let mut tags = EntityTags::new();
        // Release builds must tolerate this silently.
        #[cfg(not(debug_assertions))]
        {
            tags.remove_modifier(&tag("A"));
            assert!(!tags.take_changed());
        }
        let _ = &mut tags;
    }

    #[test]
    fn batched_add_reports_single_change() {
        let mut tags = EntityTags::new();
        let container = TagContainer::from_tags([tag("A"), tag("B")]);
        tags.add_modifier_many(&container);
        assert!(tags.take_changed());
        assert!(!tags.take_changed());
    }
}
