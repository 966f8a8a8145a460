//! Per-entity effect scheduling.
//!
//! The manager owns every live effect on an entity and drives the canonical
//! per-tick order: inhibition check, period timer advance, periodic
//! executions, duration decrement, then expiration. Attribute publication is
//! deferred to the owning entity so one public operation produces one
//! publish, with `on_update` cues emitted afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use bevy::log::debug;
use bevy::prelude::Entity;

use super::active::{execute_modifiers_of, ActiveEffect};
use super::definition::{
    CaptureSource, DurationPolicy, EffectComponent, EffectData, MagnitudeCalculation,
    PeriodInhibitionRemovedPolicy, StackApplicationRefreshPolicy,
    StackApplicationResetPeriodPolicy, StackExpirationPolicy, StackLevelPolicy,
    StackMagnitudePolicy, StackOverflowPolicy, StackPolicy,
};
use super::effect::{CapturedAttribute, Effect};
use crate::attributes::{AttributeKey, AttributeSet};
use crate::core::{ActiveEffectHandle, Arena};
use crate::cues::{CueEvent, CueEventKind, CueMagnitude, CueParameters};
use crate::entity::{DeferredOp, EngineContext, ForgeNotification};
use crate::tags::GameplayTag;

/// The effects runtime of one entity.
#[derive(Default)]
pub struct EffectsManager {
    effects: Arena<ActiveEffect>,
}

impl EffectsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live effects.
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Handles of live effects in application order.
    pub fn active_effects(&self) -> Vec<ActiveEffectHandle> {
        self.effects
            .handles()
            .into_iter()
            .map(ActiveEffectHandle)
            .collect()
    }

    pub fn get(&self, handle: ActiveEffectHandle) -> Option<&ActiveEffect> {
        self.effects.get(handle.0)
    }

    pub fn has_effect(&self, handle: ActiveEffectHandle) -> bool {
        self.effects.contains(handle.0)
    }

    /// Finds the live effect sharing stacking identity with `data`.
    pub fn find_active(
        &self,
        data: &Arc<EffectData>,
        source: Option<Entity>,
    ) -> Option<ActiveEffectHandle> {
        self.effects
            .iter()
            .find(|(_, active)| {
                if !Arc::ptr_eq(&active.data, data) {
                    return false;
                }
                match source {
                    Some(source) => active.ownership.source == source,
                    None => true,
                }
            })
            .map(|(raw, _)| ActiveEffectHandle(raw))
    }

    /// Longest remaining duration over live effects granting `tag`.
    ///
    /// This is the cooldown query: cooldown effects carry their tags as
    /// modifier tags.
    pub fn remaining_time_for_tag(&self, tag: &GameplayTag) -> Option<f32> {
        self.effects
            .iter()
            .filter(|(_, active)| !active.is_inhibited && active.data.grants_tag(tag))
            .filter_map(|(_, active)| active.remaining_duration)
            .fold(None, |best, remaining| {
                Some(best.map_or(remaining, |b: f32| b.max(remaining)))
            })
    }

    /// Resets a live effect's duration to its evaluated full length.
    pub(crate) fn refresh_duration(&mut self, handle: ActiveEffectHandle) -> bool {
        let Some(active) = self.effects.get_mut(handle.0) else {
            return false;
        };
        let data = active.data.clone();
        if let DurationPolicy::HasDuration(duration) = &data.duration {
            active.remaining_duration = Some(duration.evaluate(active.level));
            return true;
        }
        false
    }

    /// Applies an effect to this entity.
    ///
    /// Instant effects execute and return `None`; duration and infinite
    /// effects stack or create a live instance and return its handle. A
    /// refused application (failed gates, stacking denial) changes nothing
    /// and returns `None`.
    pub(crate) fn apply_effect(
        &mut self,
        effect: Effect,
        ctx: &mut EngineContext<'_>,
    ) -> Option<ActiveEffectHandle> {
        if !self.application_gates_pass(&effect, ctx) {
            debug!("effect '{}' refused by application gates", effect.data.name);
            return None;
        }

        if effect.data.duration.is_instant() {
            self.apply_instant(&effect, ctx);
            return None;
        }

        if effect.data.stacking.is_some() {
            let source = match effect.data.stacking.as_ref().unwrap().policy {
                StackPolicy::AggregateBySource => Some(effect.ownership.source),
                StackPolicy::AggregateByTarget => None,
            };
            if let Some(existing) = self.find_active(&effect.data, source) {
                return self.stack_existing(existing, &effect, ctx);
            }
        }

        Some(self.create_active(effect, ctx))
    }

    fn application_gates_pass(&self, effect: &Effect, ctx: &EngineContext<'_>) -> bool {
        effect.data.components.iter().all(|component| match component {
            EffectComponent::TargetTagRequirements { application, .. } => {
                application.met_by(ctx.tags.combined())
            }
            _ => true,
        })
    }

    fn apply_instant(&mut self, effect: &Effect, ctx: &mut EngineContext<'_>) {
        let data = effect.data.clone();
        let level = effect.level();
        let captures = effect.source_captures();

        let magnitudes: Vec<Option<f32>> = data
            .modifiers
            .iter()
            .map(|modifier| match &modifier.magnitude {
                MagnitudeCalculation::Scalable(scalable) => Some(scalable.evaluate(level)),
                MagnitudeCalculation::AttributeBased {
                    capture,
                    calculation,
                    coefficient,
                    pre_multiply_additive,
                    post_multiply_additive,
                } => {
                    let captured = match capture.source {
                        CaptureSource::Target => {
                            let attribute = ctx.attributes.attribute(&capture.attribute).ok()?;
                            CapturedAttribute {
                                current_value: attribute.current_value(),
                                base_value: attribute.base_value(),
                            }
                        }
                        CaptureSource::Source => *captures.get(&capture.attribute)?,
                    };
                    Some(
                        (coefficient * captured.value_for(*calculation) + pre_multiply_additive)
                            * post_multiply_additive,
                    )
                }
            })
            .collect();

        let (deltas, succeeded) =
            execute_modifiers_of(&data, level, |index| magnitudes[index], ctx.attributes);

        if !(data.require_modifier_success_to_trigger_cue && succeeded == 0) {
            for cue in &data.cues {
                let magnitude = match &cue.magnitude {
                    CueMagnitude::AttributeValueChange(key) => {
                        deltas.get(key).copied().unwrap_or(0.0)
                    }
                    CueMagnitude::AttributeCurrentValue(key) => ctx
                        .attributes
                        .current_value(key)
                        .map(|value| value as f32)
                        .unwrap_or(0.0),
                    CueMagnitude::AttributeModifier(key) => ctx
                        .attributes
                        .attribute(key)
                        .map(|attribute| attribute.modifier_value() as f32)
                        .unwrap_or(0.0),
                    CueMagnitude::EffectLevel => level as f32,
                    CueMagnitude::StackCount => 1.0,
                };
                ctx.cue_queue.push(CueEvent {
                    key: cue.key.clone(),
                    kind: CueEventKind::Execute,
                    parameters: CueParameters::new(magnitude, cue.normalize(magnitude))
                        .with_source(effect.ownership.source),
                });
            }
        }

        self.queue_ability_grants(&data, level, None, effect.ownership.source, ctx);
    }

    fn queue_ability_grants(
        &self,
        data: &EffectData,
        effect_level: i32,
        source_effect: Option<ActiveEffectHandle>,
        source_entity: Entity,
        ctx: &mut EngineContext<'_>,
    ) {
        for component in &data.components {
            if let EffectComponent::GrantAbility(configs) = component {
                ctx.deferred.push_back(DeferredOp::GrantAbilities {
                    configs: configs.clone(),
                    effect_level,
                    source_effect,
                    source_entity,
                });
            }
        }
    }

    fn create_active(&mut self, effect: Effect, ctx: &mut EngineContext<'_>) -> ActiveEffectHandle {
        let data = effect.data.clone();
        let mut active = ActiveEffect::from_effect(&effect);

        for _ in 0..active.stack_count {
            active.record_application_magnitudes(ctx.attributes);
        }
        active.is_inhibited = !ongoing_requirements_met(&data, ctx);

        let handle = ActiveEffectHandle(self.effects.insert(active));
        debug!("applied effect '{}'", data.name);

        if !self.get(handle).unwrap().is_inhibited {
            for tags in data.modifier_tags() {
                ctx.tags.add_modifier_many(tags);
            }
            let active = self.effects.get_mut(handle.0).unwrap();
            let (deltas, succeeded) = active.apply_modifier_slots(ctx.attributes);
            self.queue_lifecycle_cues(handle, CueEventKind::Apply, Some(&deltas), succeeded, ctx);

            let execute_on_application = data
                .periodic
                .as_ref()
                .map(|periodic| periodic.execute_on_application)
                .unwrap_or(false);
            if execute_on_application {
                self.execute_periodic(handle, ctx);
            }
        }

        self.queue_ability_grants(
            &data,
            effect.level(),
            Some(handle),
            effect.ownership.source,
            ctx,
        );
        if self.get(handle).unwrap().is_inhibited {
            // Grants ride along with the inhibition they were born under.
            ctx.deferred.push_back(DeferredOp::SetGrantInhibited {
                source_effect: handle,
                inhibited: true,
            });
        }
        ctx.notifications.push(ForgeNotification::EffectApplied {
            handle,
            name: data.name.clone(),
        });
        handle
    }

    fn stack_existing(
        &mut self,
        handle: ActiveEffectHandle,
        incoming: &Effect,
        ctx: &mut EngineContext<'_>,
    ) -> Option<ActiveEffectHandle> {
        let active = self.effects.get_mut(handle.0)?;
        let data = active.data.clone();
        let stacking = data.stacking.as_ref().unwrap();

        if stacking.level_policy == StackLevelPolicy::SegregateLevels
            && incoming.level() != active.level
        {
            debug!("effect '{}' stack refused: segregated levels", data.name);
            return None;
        }
        if stacking.level_denial.allows(incoming.level(), active.level) {
            debug!("effect '{}' stack refused: level denial", data.name);
            return None;
        }

        let at_limit = active.stack_count >= stacking.limit;
        if at_limit && stacking.overflow_policy == StackOverflowPolicy::DenyApplication {
            debug!("effect '{}' stack refused: overflow denied", data.name);
            return None;
        }

        // Fresh source snapshots ride in with the new application.
        for (key, captured) in incoming.source_captures() {
            active.source_captures.insert(key.clone(), *captured);
        }

        let counted = !at_limit;
        if counted {
            active.stack_count += 1;
            active.record_application_magnitudes_at(ctx.attributes, incoming.level());
        } else if stacking.magnitude_policy == StackMagnitudePolicy::Override {
            active.pop_application_magnitudes();
            active.record_application_magnitudes_at(ctx.attributes, incoming.level());
        }

        if !data.snapshot_level
            && stacking.level_policy == StackLevelPolicy::AggregateLevels
            && stacking.level_override.allows(incoming.level(), active.level)
        {
            active.level = incoming.level();
        }

        if stacking.application_refresh_policy
            == StackApplicationRefreshPolicy::RefreshOnSuccessfulApplication
        {
            if let DurationPolicy::HasDuration(duration) = &data.duration {
                active.remaining_duration = Some(duration.evaluate(active.level));
            }
        }
        if stacking.application_reset_period_policy
            == StackApplicationResetPeriodPolicy::ResetOnSuccessfulApplication
        {
            active.time_since_period = 0.0;
        }

        if !active.is_inhibited {
            active.refresh_modifier_slots(ctx.attributes);
        }

        let stack_count = active.stack_count;
        ctx.notifications.push(ForgeNotification::EffectStackChanged {
            handle,
            name: data.name.clone(),
            stack_count,
        });
        Some(handle)
    }

    /// Removes a live effect. Returns false for stale handles.
    pub(crate) fn unapply_effect(
        &mut self,
        handle: ActiveEffectHandle,
        ctx: &mut EngineContext<'_>,
    ) -> bool {
        self.remove_effect(handle, ctx, false)
    }

    fn remove_effect(
        &mut self,
        handle: ActiveEffectHandle,
        ctx: &mut EngineContext<'_>,
        expired: bool,
    ) -> bool {
        let Some(mut active) = self.effects.remove(handle.0) else {
            return false;
        };
        let data = active.data.clone();
        if !active.is_inhibited {
            active.withdraw_modifier_slots(ctx.attributes);
            for tags in data.modifier_tags() {
                ctx.tags.remove_modifier_many(tags);
            }
            for (index, cue) in data.cues.iter().enumerate() {
                if !active.cue_state[index].live {
                    continue;
                }
                let magnitude = active.cue_magnitude(cue, ctx.attributes, None);
                ctx.cue_queue.push(CueEvent {
                    key: cue.key.clone(),
                    kind: CueEventKind::Remove {
                        interrupted: !expired,
                    },
                    parameters: CueParameters::new(magnitude, cue.normalize(magnitude))
                        .with_source(active.ownership.source),
                });
            }
        }
        ctx.deferred
            .push_back(DeferredOp::RemoveAbilityGrants {
                source_effect: handle,
            });
        ctx.notifications.push(ForgeNotification::EffectRemoved {
            name: data.name.clone(),
            expired,
        });
        debug!("removed effect '{}' (expired: {expired})", data.name);
        true
    }

    /// Advances every live effect by `dt` seconds in application order.
    pub(crate) fn update_effects(&mut self, dt: f32, ctx: &mut EngineContext<'_>) {
        let mut expired = Vec::new();
        for raw in self.effects.handles() {
            let handle = ActiveEffectHandle(raw);
            let Some(active) = self.effects.get_mut(raw) else {
                continue;
            };
            let data = active.data.clone();

            if active.is_inhibited {
                // A held period timer also holds the duration; only the
                // never-reset policy lets time pass while inhibited.
                let duration_runs = data
                    .periodic
                    .as_ref()
                    .map(|periodic| {
                        periodic.period_inhibition_removed_policy
                            == PeriodInhibitionRemovedPolicy::NeverReset
                    })
                    .unwrap_or(true);
                if duration_runs && let Some(remaining) = &mut active.remaining_duration {
                    *remaining -= dt;
                    if *remaining <= 0.0 {
                        expired.push(handle);
                    }
                }
                continue;
            }

            if let Some(periodic) = &data.periodic {
                let period = periodic.period.evaluate(active.level);
                if period > 0.0 {
                    active.time_since_period += dt;
                    while self
                        .effects
                        .get(raw)
                        .is_some_and(|active| active.time_since_period >= period)
                    {
                        let active = self.effects.get_mut(raw).unwrap();
                        active.time_since_period -= period;
                        self.execute_periodic(handle, ctx);
                    }
                }
            }

            let Some(active) = self.effects.get_mut(raw) else {
                continue;
            };
            if let Some(remaining) = &mut active.remaining_duration {
                *remaining -= dt;
                if *remaining <= 0.0 {
                    expired.push(handle);
                }
            }
        }

        for handle in expired {
            self.expire_effect(handle, ctx);
        }
    }

    fn execute_periodic(&mut self, handle: ActiveEffectHandle, ctx: &mut EngineContext<'_>) {
        let Some(active) = self.effects.get_mut(handle.0) else {
            return;
        };
        let (deltas, succeeded) = active.execute_modifiers(ctx.attributes);
        self.queue_lifecycle_cues(handle, CueEventKind::Execute, Some(&deltas), succeeded, ctx);
    }

    fn expire_effect(&mut self, handle: ActiveEffectHandle, ctx: &mut EngineContext<'_>) {
        let Some(active) = self.effects.get_mut(handle.0) else {
            return;
        };
        let data = active.data.clone();
        let policy = data
            .stacking
            .as_ref()
            .map(|stacking| stacking.expiration_policy)
            .unwrap_or(StackExpirationPolicy::ClearEntireStack);

        match policy {
            StackExpirationPolicy::ClearEntireStack => {
                self.remove_effect(handle, ctx, true);
            }
            StackExpirationPolicy::RemoveSingleStackAndRefreshDuration => {
                active.stack_count -= 1;
                active.pop_application_magnitudes();
                if active.stack_count == 0 {
                    self.remove_effect(handle, ctx, true);
                    return;
                }
                if let DurationPolicy::HasDuration(duration) = &data.duration {
                    active.remaining_duration = Some(duration.evaluate(active.level));
                }
                let stack_count = active.stack_count;
                active.refresh_modifier_slots(ctx.attributes);
                ctx.notifications.push(ForgeNotification::EffectStackChanged {
                    handle,
                    name: data.name.clone(),
                    stack_count,
                });
            }
        }
    }

    /// Re-evaluates ongoing and removal tag gates after a tag change.
    pub(crate) fn reevaluate_tag_gates(&mut self, ctx: &mut EngineContext<'_>) {
        let mut removals = Vec::new();
        for raw in self.effects.handles() {
            let handle = ActiveEffectHandle(raw);
            let Some(active) = self.effects.get(raw) else {
                continue;
            };
            let data = active.data.clone();

            let removal_met = data.components.iter().any(|component| match component {
                EffectComponent::TargetTagRequirements { removal, .. } => {
                    !removal.is_empty() && removal.met_by(ctx.tags.combined())
                }
                _ => false,
            });
            if removal_met {
                removals.push(handle);
                continue;
            }

            let ongoing_met = ongoing_requirements_met(&data, ctx);
            let inhibited = active.is_inhibited;
            if !ongoing_met && !inhibited {
                self.inhibit(handle, ctx);
            } else if ongoing_met && inhibited {
                self.uninhibit(handle, ctx);
            }
        }
        for handle in removals {
            self.remove_effect(handle, ctx, false);
        }
    }

    fn inhibit(&mut self, handle: ActiveEffectHandle, ctx: &mut EngineContext<'_>) {
        let Some(active) = self.effects.get_mut(handle.0) else {
            return;
        };
        let data = active.data.clone();
        active.is_inhibited = true;
        active.withdraw_modifier_slots(ctx.attributes);
        for (index, cue) in data.cues.iter().enumerate() {
            if !active.cue_state[index].live {
                continue;
            }
            active.cue_state[index].live = false;
            let magnitude = active.cue_magnitude(cue, ctx.attributes, None);
            ctx.cue_queue.push(CueEvent {
                key: cue.key.clone(),
                kind: CueEventKind::Remove { interrupted: true },
                parameters: CueParameters::new(magnitude, cue.normalize(magnitude))
                    .with_source(active.ownership.source),
            });
        }
        for tags in data.modifier_tags() {
            ctx.tags.remove_modifier_many(tags);
        }
        ctx.deferred.push_back(DeferredOp::SetGrantInhibited {
            source_effect: handle,
            inhibited: true,
        });
        debug!("inhibited effect '{}'", data.name);
    }

    fn uninhibit(&mut self, handle: ActiveEffectHandle, ctx: &mut EngineContext<'_>) {
        let Some(active) = self.effects.get_mut(handle.0) else {
            return;
        };
        let data = active.data.clone();
        active.is_inhibited = false;
        for tags in data.modifier_tags() {
            ctx.tags.add_modifier_many(tags);
        }
        let active = self.effects.get_mut(handle.0).unwrap();
        let (deltas, succeeded) = active.apply_modifier_slots(ctx.attributes);
        self.queue_lifecycle_cues(handle, CueEventKind::Apply, Some(&deltas), succeeded, ctx);

        if let Some(periodic) = &data.periodic {
            match periodic.period_inhibition_removed_policy {
                PeriodInhibitionRemovedPolicy::NeverReset => {}
                PeriodInhibitionRemovedPolicy::ResetPeriod => {
                    self.effects.get_mut(handle.0).unwrap().time_since_period = 0.0;
                }
                PeriodInhibitionRemovedPolicy::ExecuteAndResetPeriod => {
                    self.effects.get_mut(handle.0).unwrap().time_since_period = 0.0;
                    self.execute_periodic(handle, ctx);
                }
            }
        }
        ctx.deferred.push_back(DeferredOp::SetGrantInhibited {
            source_effect: handle,
            inhibited: false,
        });
        debug!("resumed effect '{}'", data.name);
    }

    fn queue_lifecycle_cues(
        &mut self,
        handle: ActiveEffectHandle,
        kind: CueEventKind,
        event_deltas: Option<&HashMap<AttributeKey, f32>>,
        succeeded: usize,
        ctx: &mut EngineContext<'_>,
    ) {
        let Some(active) = self.effects.get_mut(handle.0) else {
            return;
        };
        let data = active.data.clone();
        if data.require_modifier_success_to_trigger_cue && succeeded == 0 {
            return;
        }
        for (index, cue) in data.cues.iter().enumerate() {
            let magnitude = active.cue_magnitude(cue, ctx.attributes, event_deltas);
            let state = &mut active.cue_state[index];
            state.last_magnitude = magnitude;
            if kind == CueEventKind::Apply {
                state.live = true;
            }
            ctx.cue_queue.push(CueEvent {
                key: cue.key.clone(),
                kind,
                parameters: CueParameters::new(magnitude, cue.normalize(magnitude))
                    .with_source(active.ownership.source),
            });
        }
    }

    /// Re-applies slots whose live-captured magnitudes drifted.
    ///
    /// Returns true when any attribute slot moved (a further publish pass is
    /// then required).
    pub(crate) fn refresh_live_magnitudes(&mut self, attributes: &mut AttributeSet) -> bool {
        let mut moved = false;
        for raw in self.effects.handles() {
            let Some(active) = self.effects.get_mut(raw) else {
                continue;
            };
            if active.is_inhibited {
                continue;
            }
            moved |= active.refresh_modifier_slots(attributes);
        }
        moved
    }

    /// Updates source-side live captures from a freshly sampled source
    /// entity, re-applying dependent slots.
    pub(crate) fn refresh_source_samples(
        &mut self,
        source: Entity,
        source_attributes: &AttributeSet,
    ) {
        for raw in self.effects.handles() {
            let Some(active) = self.effects.get_mut(raw) else {
                continue;
            };
            if active.ownership.source != source {
                continue;
            }
            let data = active.data.clone();
            for modifier in &data.modifiers {
                let MagnitudeCalculation::AttributeBased { capture, .. } = &modifier.magnitude
                else {
                    continue;
                };
                if capture.source != CaptureSource::Source || capture.snapshot {
                    continue;
                }
                if let Ok(attribute) = source_attributes.attribute(&capture.attribute) {
                    active.source_captures.insert(
                        capture.attribute.clone(),
                        CapturedAttribute {
                            current_value: attribute.current_value(),
                            base_value: attribute.base_value(),
                        },
                    );
                }
            }
        }
    }

    /// Emits `on_update` cues for live effects whose cue magnitudes changed.
    ///
    /// Runs after attribute publication so magnitude sources observe the new
    /// values.
    pub(crate) fn update_live_cues(&mut self, ctx: &mut EngineContext<'_>) {
        for raw in self.effects.handles() {
            let Some(active) = self.effects.get_mut(raw) else {
                continue;
            };
            if active.is_inhibited {
                continue;
            }
            let data = active.data.clone();
            for (index, cue) in data.cues.iter().enumerate() {
                if !active.cue_state[index].live {
                    continue;
                }
                if data.suppress_stacking_cues
                    && matches!(cue.magnitude, CueMagnitude::StackCount)
                {
                    continue;
                }
                // Value-change magnitudes of periodic effects move with each
                // execution event, never between them.
                if data.is_periodic()
                    && matches!(cue.magnitude, CueMagnitude::AttributeValueChange(_))
                {
                    continue;
                }
                let magnitude = active.cue_magnitude(cue, ctx.attributes, None);
                if magnitude == active.cue_state[index].last_magnitude {
                    continue;
                }
                active.cue_state[index].last_magnitude = magnitude;
                ctx.cue_queue.push(CueEvent {
                    key: cue.key.clone(),
                    kind: CueEventKind::Update,
                    parameters: CueParameters::new(magnitude, cue.normalize(magnitude))
                        .with_source(active.ownership.source),
                });
            }
        }
    }
}

fn ongoing_requirements_met(data: &EffectData, ctx: &EngineContext<'_>) -> bool {
    data.components.iter().all(|component| match component {
        EffectComponent::TargetTagRequirements { ongoing, .. } => {
            ongoing.met_by(ctx.tags.combined())
        }
        _ => true,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use bevy::ecs::world::World;

    use super::*;
    use crate::effects::definition::{Modifier, ModifierOperation, StackingData};
    use crate::effects::effect::EffectOwnership;
    use crate::tags::{EntityTags, TagContainer, TagRequirements};

    struct Harness {
        attributes: AttributeSet,
        tags: EntityTags,
        cue_queue: Vec<CueEvent>,
        deferred: VecDeque<DeferredOp>,
        notifications: Vec<ForgeNotification>,
        entity: Entity,
    }

    impl Harness {
        fn new(attributes: AttributeSet) -> Self {
            Self {
                attributes,
                tags: EntityTags::new(),
                cue_queue: Vec::new(),
                deferred: VecDeque::new(),
                notifications: Vec::new(),
                entity: World::new().spawn_empty().id(),
            }
        }

        fn ctx(&mut self) -> EngineContext<'_> {
            EngineContext {
                attributes: &mut self.attributes,
                tags: &mut self.tags,
                cue_queue: &mut self.cue_queue,
                deferred: &mut self.deferred,
                notifications: &mut self.notifications,
            }
        }

        fn effect(&self, data: &Arc<EffectData>) -> Effect {
            Effect::new(data.clone(), EffectOwnership::self_applied(self.entity))
        }
    }

    fn strength_set() -> AttributeSet {
        AttributeSet::new().with_attribute("Strength", 10)
    }

    #[test]
    fn instant_application_mutates_base_and_returns_no_handle() {
        let mut harness = Harness::new(strength_set());
        let mut manager = EffectsManager::new();
        let data = EffectData::new("Shot")
            .add_modifier(Modifier::new(
                "Strength",
                ModifierOperation::FlatAdd,
                MagnitudeCalculation::scalar(-4),
            ))
            .build();

        let effect = harness.effect(&data);
        let handle = manager.apply_effect(effect, &mut harness.ctx());
        assert!(handle.is_none());
        assert!(manager.is_empty());
        assert_eq!(
            harness
                .attributes
                .attribute(&"Strength".into())
                .unwrap()
                .base_value(),
            6
        );
    }

    #[test]
    fn stacking_identity_is_the_shared_template() {
        let mut harness = Harness::new(strength_set());
        let mut manager = EffectsManager::new();
        let data = EffectData::new("Stack")
            .with_duration(5.0)
            .with_stacking(StackingData::new(3))
            .build();
        // Same name, different template: never stacks.
        let twin = EffectData::new("Stack")
            .with_duration(5.0)
            .with_stacking(StackingData::new(3))
            .build();

        let first = manager
            .apply_effect(harness.effect(&data), &mut harness.ctx())
            .unwrap();
        let second = manager
            .apply_effect(harness.effect(&data), &mut harness.ctx())
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(manager.len(), 1);

        let other = manager
            .apply_effect(harness.effect(&twin), &mut harness.ctx())
            .unwrap();
        assert_ne!(other, first);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn remaining_time_for_tag_takes_the_longest_holder() {
        let mut harness = Harness::new(strength_set());
        let mut manager = EffectsManager::new();
        let tag = GameplayTag::new("Cooldown.Shared");
        let short = EffectData::new("Short")
            .with_duration(2.0)
            .with_modifier_tags(TagContainer::from_tags([tag.clone()]))
            .build();
        let long = EffectData::new("Long")
            .with_duration(6.0)
            .with_modifier_tags(TagContainer::from_tags([tag.clone()]))
            .build();

        manager.apply_effect(harness.effect(&short), &mut harness.ctx());
        manager.apply_effect(harness.effect(&long), &mut harness.ctx());

        assert_eq!(manager.remaining_time_for_tag(&tag), Some(6.0));
        assert_eq!(
            manager.remaining_time_for_tag(&GameplayTag::new("Cooldown.Other")),
            None
        );
    }

    #[test]
    fn tick_executes_periodics_then_expires() {
        let mut harness = Harness::new(strength_set());
        let mut manager = EffectsManager::new();
        let data = EffectData::new("Burst")
            .with_duration(1.0)
            .with_period(0.25)
            .add_modifier(Modifier::new(
                "Strength",
                ModifierOperation::FlatAdd,
                MagnitudeCalculation::scalar(1),
            ))
            .build();
        manager.apply_effect(harness.effect(&data), &mut harness.ctx());

        manager.update_effects(1.0, &mut harness.ctx());
        assert!(manager.is_empty());
        assert_eq!(
            harness
                .attributes
                .attribute(&"Strength".into())
                .unwrap()
                .base_value(),
            14
        );
    }

    #[test]
    fn tag_gates_inhibit_and_resume() {
        let mut harness = Harness::new(strength_set());
        let mut manager = EffectsManager::new();
        let data = EffectData::new("Blessing")
            .infinite()
            .with_ongoing_requirements(
                TagRequirements::new().ignore_tag(GameplayTag::new("State.Cursed")),
            )
            .add_modifier(Modifier::new(
                "Strength",
                ModifierOperation::FlatAdd,
                MagnitudeCalculation::scalar(5),
            ))
            .build();
        let handle = manager
            .apply_effect(harness.effect(&data), &mut harness.ctx())
            .unwrap();
        harness.attributes.apply_pending_value_changes();
        assert_eq!(harness.attributes.current_value(&"Strength".into()), Some(15));

        harness.tags.add_base(GameplayTag::new("State.Cursed"));
        manager.reevaluate_tag_gates(&mut harness.ctx());
        assert!(manager.get(handle).unwrap().is_inhibited());
        harness.attributes.apply_pending_value_changes();
        assert_eq!(harness.attributes.current_value(&"Strength".into()), Some(10));

        harness.tags.remove_base(&GameplayTag::new("State.Cursed"));
        manager.reevaluate_tag_gates(&mut harness.ctx());
        assert!(!manager.get(handle).unwrap().is_inhibited());
        harness.attributes.apply_pending_value_changes();
        assert_eq!(harness.attributes.current_value(&"Strength".into()), Some(15));
    }

    #[test]
    fn stale_handles_fail_gracefully() {
        let mut harness = Harness::new(strength_set());
        let mut manager = EffectsManager::new();
        let data = EffectData::new("Gone").infinite().build();
        let handle = manager
            .apply_effect(harness.effect(&data), &mut harness.ctx())
            .unwrap();

        assert!(manager.unapply_effect(handle, &mut harness.ctx()));
        assert!(!manager.unapply_effect(handle, &mut harness.ctx()));
        assert!(manager.get(handle).is_none());
        assert!(!manager.has_effect(handle));
    }
}
