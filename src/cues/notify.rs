//! Cue handler traits and the data a cue carries.
//!
//! Cues are the host-visible feedback channel of the effects runtime: every
//! effect lifecycle transition produces apply/execute/update/remove
//! notifications parameterized by a magnitude derived from the owning
//! effect.

use bevy::prelude::Entity;

use crate::attributes::AttributeKey;
use crate::tags::GameplayTag;

/// Where a cue's magnitude comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CueMagnitude {
    /// The delta the owning effect's modifiers applied to the attribute on
    /// this application or execution.
    AttributeValueChange(AttributeKey),
    /// The attribute's published current value at notification time.
    AttributeCurrentValue(AttributeKey),
    /// The aggregated modifier contribution (`current - base`) of the
    /// attribute at notification time.
    AttributeModifier(AttributeKey),
    /// The owning effect's level.
    EffectLevel,
    /// The owning effect's stack count.
    StackCount,
}

/// Static configuration of one cue on an effect.
#[derive(Debug, Clone, PartialEq)]
pub struct CueData {
    /// The cue key handlers are registered under.
    pub key: GameplayTag,
    /// Anchor for normalization: magnitude at or below maps to 0.
    pub min: f32,
    /// Anchor for normalization: magnitude at or above maps to 1.
    pub max: f32,
    /// Magnitude source.
    pub magnitude: CueMagnitude,
}

impl CueData {
    pub fn new(key: impl Into<GameplayTag>, magnitude: CueMagnitude, min: f32, max: f32) -> Self {
        Self {
            key: key.into(),
            min,
            max,
            magnitude,
        }
    }

    /// Normalizes a magnitude into `[0, 1]` against the cue anchors.
    ///
    /// Degenerate anchors (`max <= min`) normalize to 0.
    pub fn normalize(&self, magnitude: f32) -> f32 {
        if self.max > self.min {
            ((magnitude - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Parameters passed to cue handlers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CueParameters {
    /// Raw magnitude value.
    pub magnitude: f32,
    /// Magnitude normalized against the cue's anchors (0.0 to 1.0).
    pub normalized_magnitude: f32,
    /// The entity that caused the owning effect, when known.
    pub source: Option<Entity>,
}

impl CueParameters {
    pub fn new(magnitude: f32, normalized_magnitude: f32) -> Self {
        Self {
            magnitude,
            normalized_magnitude,
            source: None,
        }
    }

    pub fn with_source(mut self, source: Entity) -> Self {
        self.source = Some(source);
        self
    }
}

/// Host capability interface for reacting to cues.
///
/// Implementations are registered on the [`CueManager`](super::CueManager)
/// under a cue key. All methods default to no-ops so a handler only
/// overrides the notifications it cares about.
pub trait CueHandler: Send + Sync + 'static {
    /// A duration or infinite effect carrying this cue was applied.
    fn on_apply(&self, target: Entity, params: &CueParameters) {
        let _ = (target, params);
    }

    /// An instant application or a periodic execution happened.
    fn on_execute(&self, target: Entity, params: &CueParameters) {
        let _ = (target, params);
    }

    /// A live cue's magnitude changed.
    fn on_update(&self, target: Entity, params: &CueParameters) {
        let _ = (target, params);
    }

    /// The owning effect was removed or expired.
    ///
    /// `interrupted` is true when the removal did not come from natural
    /// expiration (explicit unapply or inhibition).
    fn on_remove(&self, target: Entity, params: &CueParameters, interrupted: bool) {
        let _ = (target, params, interrupted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_clamps_to_unit_interval() {
        let cue = CueData::new(
            GameplayTag::new("GameplayCue.Test"),
            CueMagnitude::EffectLevel,
            0.0,
            10.0,
        );
        assert_eq!(cue.normalize(3.0), 0.3);
        assert_eq!(cue.normalize(-5.0), 0.0);
        assert_eq!(cue.normalize(15.0), 1.0);
    }

    #[test]
    fn degenerate_anchors_normalize_to_zero() {
        let cue = CueData::new(
            GameplayTag::new("GameplayCue.Test"),
            CueMagnitude::EffectLevel,
            5.0,
            5.0,
        );
        assert_eq!(cue.normalize(7.0), 0.0);
    }
}
