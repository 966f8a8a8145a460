//! A pending effect application.

use std::collections::HashMap;
use std::sync::Arc;

use bevy::prelude::Entity;

use super::definition::{CaptureCalculation, CaptureSource, EffectData, MagnitudeCalculation};
use crate::attributes::{AttributeKey, AttributeSet};

/// Who owns and who caused an effect application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectOwnership {
    /// The entity the effect is applied to.
    pub owner: Entity,
    /// The entity responsible for the application.
    pub source: Entity,
}

impl EffectOwnership {
    pub fn new(owner: Entity, source: Entity) -> Self {
        Self { owner, source }
    }

    /// Owner and source are the same entity.
    pub fn self_applied(entity: Entity) -> Self {
        Self {
            owner: entity,
            source: entity,
        }
    }
}

/// A captured view of one source attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapturedAttribute {
    pub current_value: i32,
    pub base_value: i32,
}

impl CapturedAttribute {
    pub fn modifier_value(&self) -> i32 {
        self.current_value - self.base_value
    }

    pub(crate) fn value_for(&self, calculation: CaptureCalculation) -> f32 {
        match calculation {
            CaptureCalculation::CurrentValue => self.current_value as f32,
            CaptureCalculation::BaseValue => self.base_value as f32,
            CaptureCalculation::ModifierValue => self.modifier_value() as f32,
        }
    }
}

/// An effect ready to be applied: template, ownership, level and the source
/// attribute values captured at creation time.
///
/// Source-side attribute captures are taken when the effect is created (or
/// explicitly refreshed through [`capture_source_attributes`]); target-side
/// captures are resolved against the target at application time.
///
/// [`capture_source_attributes`]: Effect::capture_source_attributes
#[derive(Debug, Clone)]
pub struct Effect {
    pub data: Arc<EffectData>,
    pub ownership: EffectOwnership,
    level: i32,
    source_captures: HashMap<AttributeKey, CapturedAttribute>,
}

impl Effect {
    pub fn new(data: Arc<EffectData>, ownership: EffectOwnership) -> Self {
        Self {
            data,
            ownership,
            level: 1,
            source_captures: HashMap::new(),
        }
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    /// Sets the level the effect will be applied at.
    pub fn set_level(&mut self, level: i32) {
        self.level = level;
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    /// Records the current values of every source-captured attribute the
    /// template references.
    pub fn capture_source_attributes(&mut self, source_attributes: &AttributeSet) {
        for modifier in &self.data.modifiers {
            let MagnitudeCalculation::AttributeBased { capture, .. } = &modifier.magnitude else {
                continue;
            };
            if capture.source != CaptureSource::Source {
                continue;
            }
            if let Ok(attribute) = source_attributes.attribute(&capture.attribute) {
                self.source_captures.insert(
                    capture.attribute.clone(),
                    CapturedAttribute {
                        current_value: attribute.current_value(),
                        base_value: attribute.base_value(),
                    },
                );
            }
        }
    }

    pub(crate) fn source_captures(&self) -> &HashMap<AttributeKey, CapturedAttribute> {
        &self.source_captures
    }
}

#[cfg(test)]
mod tests {
    use bevy::ecs::world::World;

    use super::*;

    fn test_entity() -> Entity {
        World::new().spawn_empty().id()
    }
    use crate::effects::definition::{
        AttributeCaptureDefinition, Modifier, ModifierOperation,
    };

    #[test]
    fn captures_only_source_side_attributes() {
        let data = EffectData::new("Steal")
            .infinite()
            .add_modifier(Modifier::new(
                "Health",
                ModifierOperation::FlatAdd,
                MagnitudeCalculation::from_attribute(AttributeCaptureDefinition::new(
                    "Strength",
                    CaptureSource::Source,
                    true,
                )),
            ))
            .add_modifier(Modifier::new(
                "Armor",
                ModifierOperation::FlatAdd,
                MagnitudeCalculation::from_attribute(AttributeCaptureDefinition::new(
                    "Armor",
                    CaptureSource::Target,
                    true,
                )),
            ))
            .build();

        let source = AttributeSet::new()
            .with_attribute("Strength", 12)
            .with_attribute("Armor", 5);

        let mut effect = Effect::new(data, EffectOwnership::self_applied(test_entity()));
        effect.capture_source_attributes(&source);

        assert_eq!(
            effect.source_captures().get(&"Strength".into()),
            Some(&CapturedAttribute {
                current_value: 12,
                base_value: 12
            })
        );
        // Target-side captures are not resolved against the source.
        assert!(!effect.source_captures().contains_key(&"Armor".into()));
    }

    #[test]
    fn level_defaults_to_one() {
        let data = EffectData::new("Test").build();
        let effect = Effect::new(data, EffectOwnership::self_applied(test_entity()));
        assert_eq!(effect.level(), 1);
        assert_eq!(effect.with_level(3).level(), 3);
    }
}
