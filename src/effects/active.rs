//! Live effect instances.
//!
//! An [`ActiveEffect`] is the runtime counterpart of a successfully applied
//! duration or infinite effect: its per-stack magnitudes, duration and
//! period timers, inhibition state and the bookkeeping needed to withdraw
//! exactly what it contributed.

use std::collections::HashMap;
use std::sync::Arc;

use bevy::log::debug;

use super::definition::{
    CaptureSource, DurationPolicy, EffectData, MagnitudeCalculation, ModifierOperation,
    StackMagnitudePolicy,
};
use super::effect::{CapturedAttribute, Effect, EffectOwnership};
use crate::attributes::{AttributeKey, AttributeSet};
use crate::cues::{CueData, CueMagnitude};

/// Per-modifier runtime state.
#[derive(Debug, Clone, Default)]
pub(crate) struct ModifierState {
    /// The slot amount currently applied to the attribute, if any.
    pub applied: Option<i32>,
    /// Magnitude recorded at each stacked application (index-aligned with
    /// stack order). Snapshot captures fold these; live captures re-evaluate.
    pub stack_magnitudes: Vec<f32>,
}

/// Per-cue runtime state.
#[derive(Debug, Clone, Default)]
pub(crate) struct CueState {
    /// Magnitude of the last emitted notification.
    pub last_magnitude: f32,
    /// True between apply and remove emissions.
    pub live: bool,
}

/// A live effect on one entity.
pub struct ActiveEffect {
    pub(crate) data: Arc<EffectData>,
    pub(crate) ownership: EffectOwnership,
    pub(crate) level: i32,
    pub(crate) stack_count: u32,
    /// `None` for infinite effects.
    pub(crate) remaining_duration: Option<f32>,
    pub(crate) time_since_period: f32,
    pub(crate) is_inhibited: bool,
    pub(crate) modifier_state: Vec<ModifierState>,
    pub(crate) cue_state: Vec<CueState>,
    pub(crate) source_captures: HashMap<AttributeKey, CapturedAttribute>,
}

impl ActiveEffect {
    pub(crate) fn from_effect(effect: &Effect) -> Self {
        let data = effect.data.clone();
        let level = effect.level();
        let stacks = data
            .stacking
            .as_ref()
            .map(|stacking| stacking.initial_stacks)
            .unwrap_or(1);
        let remaining_duration = match &data.duration {
            DurationPolicy::HasDuration(duration) => Some(duration.evaluate(level)),
            _ => None,
        };
        let modifier_state = vec![ModifierState::default(); data.modifiers.len()];
        let cue_state = vec![CueState::default(); data.cues.len()];
        Self {
            data,
            ownership: effect.ownership,
            level,
            stack_count: stacks,
            remaining_duration,
            time_since_period: 0.0,
            is_inhibited: false,
            modifier_state,
            cue_state,
            source_captures: effect.source_captures().clone(),
        }
    }

    pub fn data(&self) -> &Arc<EffectData> {
        &self.data
    }

    pub fn ownership(&self) -> EffectOwnership {
        self.ownership
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn stack_count(&self) -> u32 {
        self.stack_count
    }

    pub fn remaining_duration(&self) -> Option<f32> {
        self.remaining_duration
    }

    pub fn is_inhibited(&self) -> bool {
        self.is_inhibited
    }

    /// Evaluates one modifier's magnitude as of now, ignoring any snapshot.
    ///
    /// Returns `None` when a captured attribute cannot be resolved, which
    /// turns the modifier into a no-op for this evaluation.
    pub(crate) fn evaluate_now(
        &self,
        modifier_index: usize,
        attributes: &AttributeSet,
    ) -> Option<f32> {
        let modifier = &self.data.modifiers[modifier_index];
        match &modifier.magnitude {
            MagnitudeCalculation::Scalable(scalable) => Some(scalable.evaluate(self.level)),
            MagnitudeCalculation::AttributeBased {
                capture,
                calculation,
                coefficient,
                pre_multiply_additive,
                post_multiply_additive,
            } => {
                let captured = match capture.source {
                    CaptureSource::Target => {
                        let attribute = attributes.attribute(&capture.attribute).ok()?;
                        CapturedAttribute {
                            current_value: attribute.current_value(),
                            base_value: attribute.base_value(),
                        }
                    }
                    CaptureSource::Source => *self.source_captures.get(&capture.attribute)?,
                };
                let magnitude = captured.value_for(*calculation);
                Some((coefficient * magnitude + pre_multiply_additive) * post_multiply_additive)
            }
        }
    }

    fn modifier_snapshots(&self, modifier_index: usize) -> bool {
        match &self.data.modifiers[modifier_index].magnitude {
            MagnitudeCalculation::Scalable(_) => self.data.snapshot_level,
            MagnitudeCalculation::AttributeBased { capture, .. } => capture.snapshot,
        }
    }

    /// The magnitude one modifier currently contributes, folding stacked
    /// applications per the stack magnitude policy.
    pub(crate) fn effective_magnitude(
        &self,
        modifier_index: usize,
        attributes: &AttributeSet,
    ) -> Option<f32> {
        let policy = self
            .data
            .stacking
            .as_ref()
            .map(|stacking| stacking.magnitude_policy)
            .unwrap_or(StackMagnitudePolicy::Sum);
        if self.modifier_snapshots(modifier_index) {
            let entries = &self.modifier_state[modifier_index].stack_magnitudes;
            if entries.is_empty() {
                return None;
            }
            Some(match policy {
                StackMagnitudePolicy::Sum => entries.iter().sum(),
                StackMagnitudePolicy::MaxMagnitude => {
                    entries.iter().copied().fold(f32::MIN, f32::max)
                }
                StackMagnitudePolicy::Override => *entries.last().unwrap(),
            })
        } else {
            let now = self.evaluate_now(modifier_index, attributes)?;
            Some(match policy {
                StackMagnitudePolicy::Sum => now * self.stack_count as f32,
                StackMagnitudePolicy::MaxMagnitude | StackMagnitudePolicy::Override => now,
            })
        }
    }

    /// Records the at-application magnitude of every modifier for one more
    /// stacked application.
    pub(crate) fn record_application_magnitudes(&mut self, attributes: &AttributeSet) {
        for index in 0..self.data.modifiers.len() {
            let magnitude = self.evaluate_now(index, attributes).unwrap_or(0.0);
            self.modifier_state[index].stack_magnitudes.push(magnitude);
        }
    }

    /// Records one more stacked application evaluated at the incoming
    /// application's level rather than the stack's.
    pub(crate) fn record_application_magnitudes_at(
        &mut self,
        attributes: &AttributeSet,
        level: i32,
    ) {
        let kept = self.level;
        self.level = level;
        self.record_application_magnitudes(attributes);
        self.level = kept;
    }

    /// Drops the most recent stacked application's recorded magnitudes.
    pub(crate) fn pop_application_magnitudes(&mut self) {
        for state in &mut self.modifier_state {
            state.stack_magnitudes.pop();
        }
    }

    /// Adds this effect's modifier slots to the attributes.
    ///
    /// Returns a per-attribute map of the evaluated magnitudes that applied
    /// and the number of modifiers that applied successfully.
    pub(crate) fn apply_modifier_slots(
        &mut self,
        attributes: &mut AttributeSet,
    ) -> (HashMap<AttributeKey, f32>, usize) {
        let mut deltas: HashMap<AttributeKey, f32> = HashMap::new();
        let mut succeeded = 0;
        // Periodic effects execute their modifiers per period instead of
        // holding persistent slots.
        if self.data.is_periodic() {
            return (deltas, succeeded);
        }
        for index in 0..self.data.modifiers.len() {
            let Some(magnitude) = self.effective_magnitude(index, attributes) else {
                self.modifier_state[index].applied = None;
                continue;
            };
            let amount = magnitude.round() as i32;
            let modifier = &self.data.modifiers[index];
            let Ok(attribute) = attributes.attribute_mut(&modifier.attribute) else {
                debug!(
                    "effect '{}' skips modifier on unknown attribute {}",
                    self.data.name, modifier.attribute
                );
                self.modifier_state[index].applied = None;
                continue;
            };
            let result = match modifier.operation {
                ModifierOperation::FlatAdd => attribute.add_flat_modifier(modifier.channel, amount),
                ModifierOperation::PercentAdd => {
                    attribute.add_percent_modifier(modifier.channel, amount)
                }
                ModifierOperation::Override => attribute.set_override(modifier.channel, amount),
            };
            if result.is_err() {
                self.modifier_state[index].applied = None;
                continue;
            }
            self.modifier_state[index].applied = Some(amount);
            *deltas.entry(modifier.attribute.clone()).or_default() += magnitude;
            if amount != 0 {
                succeeded += 1;
            }
        }
        (deltas, succeeded)
    }

    /// Withdraws previously applied modifier slots.
    pub(crate) fn withdraw_modifier_slots(&mut self, attributes: &mut AttributeSet) {
        for index in 0..self.data.modifiers.len() {
            let Some(amount) = self.modifier_state[index].applied.take() else {
                continue;
            };
            let modifier = &self.data.modifiers[index];
            let Ok(attribute) = attributes.attribute_mut(&modifier.attribute) else {
                continue;
            };
            let _ = match modifier.operation {
                ModifierOperation::FlatAdd => {
                    attribute.remove_flat_modifier(modifier.channel, amount)
                }
                ModifierOperation::PercentAdd => {
                    attribute.remove_percent_modifier(modifier.channel, amount)
                }
                ModifierOperation::Override => attribute.clear_override(modifier.channel, amount),
            };
        }
    }

    /// Re-applies slots whose effective magnitude drifted (live captures,
    /// level or stack changes). Returns true when anything moved.
    pub(crate) fn refresh_modifier_slots(&mut self, attributes: &mut AttributeSet) -> bool {
        let mut moved = false;
        if self.data.is_periodic() {
            return moved;
        }
        for index in 0..self.data.modifiers.len() {
            let current = self.modifier_state[index].applied;
            let target = self
                .effective_magnitude(index, attributes)
                .map(|magnitude| magnitude.round() as i32);
            if current == target {
                continue;
            }
            let modifier = &self.data.modifiers[index];
            let Ok(attribute) = attributes.attribute_mut(&modifier.attribute) else {
                continue;
            };
            if let Some(amount) = current {
                let _ = match modifier.operation {
                    ModifierOperation::FlatAdd => {
                        attribute.remove_flat_modifier(modifier.channel, amount)
                    }
                    ModifierOperation::PercentAdd => {
                        attribute.remove_percent_modifier(modifier.channel, amount)
                    }
                    ModifierOperation::Override => {
                        attribute.clear_override(modifier.channel, amount)
                    }
                };
            }
            if let Some(amount) = target {
                let _ = match modifier.operation {
                    ModifierOperation::FlatAdd => {
                        attribute.add_flat_modifier(modifier.channel, amount)
                    }
                    ModifierOperation::PercentAdd => {
                        attribute.add_percent_modifier(modifier.channel, amount)
                    }
                    ModifierOperation::Override => attribute.set_override(modifier.channel, amount),
                };
            }
            self.modifier_state[index].applied = target;
            moved = true;
        }
        moved
    }

    /// Executes modifiers as permanent base-value mutations (instant and
    /// periodic semantics).
    ///
    /// Returns the actual applied deltas per attribute and the count of
    /// modifiers that applied a non-zero delta.
    pub(crate) fn execute_modifiers(
        &self,
        attributes: &mut AttributeSet,
    ) -> (HashMap<AttributeKey, f32>, usize) {
        // Magnitudes are resolved before mutation starts so executions of
        // earlier modifiers do not feed into later captures mid-event.
        let magnitudes: Vec<Option<f32>> = (0..self.data.modifiers.len())
            .map(|index| self.effective_magnitude(index, attributes))
            .collect();
        execute_modifiers_of(&self.data, self.level, |index| magnitudes[index], attributes)
    }

    /// Computes the magnitude a cue reports right now.
    ///
    /// `event_deltas` carries the per-attribute deltas of the application or
    /// execution event being notified; outside such an event the effect's
    /// current contribution stands in.
    pub(crate) fn cue_magnitude(
        &self,
        cue: &CueData,
        attributes: &AttributeSet,
        event_deltas: Option<&HashMap<AttributeKey, f32>>,
    ) -> f32 {
        match &cue.magnitude {
            CueMagnitude::AttributeValueChange(key) => match event_deltas {
                Some(deltas) => deltas.get(key).copied().unwrap_or(0.0),
                None => self
                    .data
                    .modifiers
                    .iter()
                    .enumerate()
                    .filter(|(_, modifier)| &modifier.attribute == key)
                    .filter_map(|(index, _)| self.effective_magnitude(index, attributes))
                    .sum(),
            },
            CueMagnitude::AttributeCurrentValue(key) => attributes
                .attribute(key)
                .map(|attribute| attribute.current_value() as f32)
                .unwrap_or(0.0),
            CueMagnitude::AttributeModifier(key) => attributes
                .attribute(key)
                .map(|attribute| attribute.modifier_value() as f32)
                .unwrap_or(0.0),
            CueMagnitude::EffectLevel => self.level as f32,
            CueMagnitude::StackCount => self.stack_count as f32,
        }
    }
}

/// Shared execution helper, also used for instant applications that never
/// build an [`ActiveEffect`].
pub(crate) fn execute_modifiers_of(
    data: &EffectData,
    _level: i32,
    mut magnitude_of: impl FnMut(usize) -> Option<f32>,
    attributes: &mut AttributeSet,
) -> (HashMap<AttributeKey, f32>, usize) {
    let mut deltas: HashMap<AttributeKey, f32> = HashMap::new();
    let mut succeeded = 0;
    for (index, modifier) in data.modifiers.iter().enumerate() {
        let Some(magnitude) = magnitude_of(index) else {
            continue;
        };
        let Ok(attribute) = attributes.attribute_mut(&modifier.attribute) else {
            debug!(
                "effect '{}' skips execution on unknown attribute {}",
                data.name, modifier.attribute
            );
            continue;
        };
        let applied = match modifier.operation {
            ModifierOperation::FlatAdd => attribute.execute_flat(magnitude.round() as i32),
            ModifierOperation::Override => attribute.execute_override(magnitude.round() as i32),
            ModifierOperation::PercentAdd => {
                let delta =
                    (attribute.base_value() as i64 * magnitude.round() as i64 / 100) as i32;
                attribute.execute_flat(delta)
            }
        };
        *deltas.entry(modifier.attribute.clone()).or_default() += applied as f32;
        if applied != 0 {
            succeeded += 1;
        }
    }
    (deltas, succeeded)
}
