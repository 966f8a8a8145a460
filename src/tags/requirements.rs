//! Tag requirement checks used as gates throughout the engine.

use super::{GameplayTag, TagContainer};

/// A required/forbidden tag gate.
///
/// Requirements are met when every `require_tags` entry matches the checked
/// container (hierarchically) and no `ignore_tags` entry does. Both lists
/// empty means the gate always passes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagRequirements {
    /// Tags that must all be present.
    pub require_tags: Vec<GameplayTag>,
    /// Tags that must not be present.
    pub ignore_tags: Vec<GameplayTag>,
}

impl TagRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag that must be present.
    pub fn require_tag(mut self, tag: GameplayTag) -> Self {
        self.require_tags.push(tag);
        self
    }

    /// Adds a tag that must not be present.
    pub fn ignore_tag(mut self, tag: GameplayTag) -> Self {
        self.ignore_tags.push(tag);
        self
    }

    /// Checks the gate against a combined tag view.
    pub fn met_by(&self, tags: &TagContainer) -> bool {
        for ignore_tag in &self.ignore_tags {
            if tags.has_tag(ignore_tag) {
                return false;
            }
        }
        for require_tag in &self.require_tags {
            if !tags.has_tag(require_tag) {
                return false;
            }
        }
        true
    }

    /// Returns true if there are no requirements.
    pub fn is_empty(&self) -> bool {
        self.require_tags.is_empty() && self.ignore_tags.is_empty()
    }
}
