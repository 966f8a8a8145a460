//! Named attribute lookup for one entity.

use std::fmt::{self, Formatter};

use string_cache::DefaultAtom;

use super::Attribute;
use crate::core::AttributeError;

/// Interned name of an attribute (`"Health"`, `"Mana"`).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AttributeKey(DefaultAtom);

impl AttributeKey {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(DefaultAtom::from(name.as_ref()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AttributeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "AttributeKey({})", self.name())
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&str> for AttributeKey {
    fn from(name: &str) -> Self {
        AttributeKey::new(name)
    }
}

/// A published attribute change, produced by
/// [`AttributeSet::apply_pending_value_changes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeChange {
    pub key: AttributeKey,
    pub old_value: i32,
    pub new_value: i32,
}

impl AttributeChange {
    pub fn delta(&self) -> i32 {
        self.new_value - self.old_value
    }
}

/// The attribute container of one entity.
///
/// Attributes are created up front through the builder methods and live as
/// long as the entity. Mutation passes accumulate silently; the entity
/// publishes them in one batch per public operation so observers never see
/// intermediate values.
///
/// # Example
/// ```
/// use bevy_forge::attributes::AttributeSet;
///
/// let mut attributes = AttributeSet::new()
///     .with_attribute_bounds("Health", 100, 0, 100)
///     .with_attribute("Strength", 10);
///
/// assert_eq!(attributes.attribute(&"Health".into()).unwrap().current_value(), 100);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AttributeSet {
    attributes: Vec<(AttributeKey, Attribute)>,
    channel_count: usize,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self {
            attributes: Vec::new(),
            channel_count: 1,
        }
    }

    /// Sets the aggregation channel count for attributes added afterwards.
    pub fn with_channel_count(mut self, channels: usize) -> Self {
        self.channel_count = channels.max(1);
        self
    }

    /// Adds an unbounded attribute (full `i32` range).
    pub fn with_attribute(self, key: impl Into<AttributeKey>, initial: i32) -> Self {
        self.with_attribute_bounds(key, initial, i32::MIN, i32::MAX)
    }

    /// Adds a bounded attribute.
    pub fn with_attribute_bounds(
        mut self,
        key: impl Into<AttributeKey>,
        initial: i32,
        min: i32,
        max: i32,
    ) -> Self {
        let key = key.into();
        debug_assert!(
            !self.contains(&key),
            "attribute {key} registered twice on one set"
        );
        self.attributes.push((
            key,
            Attribute::with_channels(initial, min, max, self.channel_count),
        ));
        self
    }

    pub fn contains(&self, key: &AttributeKey) -> bool {
        self.attributes.iter().any(|(k, _)| k == key)
    }

    pub fn attribute(&self, key: &AttributeKey) -> Result<&Attribute, AttributeError> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, attribute)| attribute)
            .ok_or_else(|| AttributeError::UnknownAttribute(key.clone()))
    }

    pub fn attribute_mut(&mut self, key: &AttributeKey) -> Result<&mut Attribute, AttributeError> {
        self.attributes
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, attribute)| attribute)
            .ok_or_else(|| AttributeError::UnknownAttribute(key.clone()))
    }

    /// Shorthand for the published value of an attribute, if present.
    pub fn current_value(&self, key: &AttributeKey) -> Option<i32> {
        self.attribute(key).map(|a| a.current_value()).ok()
    }

    /// Keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &AttributeKey> {
        self.attributes.iter().map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Publishes every dirty attribute and returns the changes that moved a
    /// value, in registration order.
    pub fn apply_pending_value_changes(&mut self) -> Vec<AttributeChange> {
        let mut changes = Vec::new();
        for (key, attribute) in &mut self.attributes {
            if !attribute.is_dirty() {
                continue;
            }
            if let Some((old_value, new_value)) = attribute.apply_pending() {
                changes.push(AttributeChange {
                    key: key.clone(),
                    old_value,
                    new_value,
                });
            }
        }
        changes
    }
}
