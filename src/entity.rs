//! The per-entity aggregate: attributes, tags, effects, abilities and
//! events behind one component, with the operation pipeline every public
//! mutation runs through.
//!
//! Each public operation settles to a fixpoint before returning: deferred
//! engine-internal requests drain, tag changes re-gate effects and fire
//! triggers, attributes publish once, live magnitudes re-apply, and only
//! then are `on_update` cues computed and the queued cue notifications
//! dispatched. Hosts and behaviors therefore never observe intermediate
//! state.

use std::collections::VecDeque;
use std::sync::Arc;

use bevy::log::warn;
use bevy::prelude::{Component, Entity};

use crate::abilities::{
    AbilityData, ActivationFailure, EntityAbilities, GrantAbilityConfig,
};
use crate::attributes::{AttributeChange, AttributeSet};
use crate::core::{AbilityHandle, ActiveEffectHandle};
use crate::cues::{CueEvent, CueManager};
use crate::effects::{Effect, EffectData, EffectsManager};
use crate::events::{EventManager, EventPayload};
use crate::tags::{EntityTags, GameplayTag, TagContainer};

/// Engine-internal work queued during an operation and drained before the
/// operation returns. This is how behaviors, triggers and cross-subsystem
/// reactions avoid re-entering the runtime.
pub(crate) enum DeferredOp {
    ApplyEffect(Effect),
    UnapplyEffect(ActiveEffectHandle),
    GrantAbilities {
        configs: Vec<GrantAbilityConfig>,
        effect_level: i32,
        source_effect: Option<ActiveEffectHandle>,
        source_entity: Entity,
    },
    RemoveAbilityGrants {
        source_effect: ActiveEffectHandle,
    },
    SetGrantInhibited {
        source_effect: ActiveEffectHandle,
        inhibited: bool,
    },
    TryActivateAbility(AbilityHandle),
    EndAbility(AbilityHandle),
    RaiseEvent {
        tag: GameplayTag,
        payload: EventPayload,
    },
}

/// Host-visible engine notifications accumulated per operation.
///
/// The Bevy layer drains these and re-raises them as observer events;
/// standalone hosts may read them directly.
#[derive(Debug, Clone)]
pub enum ForgeNotification {
    AttributeChanged(AttributeChange),
    TagsChanged,
    EffectApplied {
        handle: ActiveEffectHandle,
        name: String,
    },
    EffectRemoved {
        name: String,
        /// True for natural expiration.
        expired: bool,
    },
    EffectStackChanged {
        handle: ActiveEffectHandle,
        name: String,
        stack_count: u32,
    },
    AbilityActivated {
        handle: AbilityHandle,
    },
    AbilityEnded {
        handle: AbilityHandle,
        was_canceled: bool,
    },
    CueTriggered(CueEvent),
}

/// Split borrows of the entity state handed to the effects runtime.
pub(crate) struct EngineContext<'a> {
    pub attributes: &'a mut AttributeSet,
    pub tags: &'a mut EntityTags,
    pub cue_queue: &'a mut Vec<CueEvent>,
    pub deferred: &'a mut VecDeque<DeferredOp>,
    pub notifications: &'a mut Vec<ForgeNotification>,
}

// Settling is monotone in practice (reference counts drain, queues empty);
// the cap only guards against pathological tag/attribute cycles.
const MAX_SETTLE_PASSES: usize = 16;

/// The gameplay state of one entity.
///
/// # Example
/// ```
/// use bevy::ecs::world::World;
/// use bevy_forge::prelude::*;
///
/// let entity = World::new().spawn_empty().id();
/// let mut forge = ForgeEntity::new(
///     entity,
///     AttributeSet::new().with_attribute_bounds("Health", 100, 0, 100),
/// );
/// let mut cues = CueManager::new();
///
/// let poison = EffectData::new("Poison")
///     .with_duration(10.0)
///     .with_period(1.0)
///     .add_modifier(Modifier::new(
///         "Health",
///         ModifierOperation::FlatAdd,
///         MagnitudeCalculation::scalar(-3),
///     ))
///     .build();
/// let effect = Effect::new(poison, EffectOwnership::self_applied(entity));
/// forge.apply_effect(effect, &mut cues);
/// forge.update_effects(1.0, &mut cues);
/// ```
#[derive(Component)]
pub struct ForgeEntity {
    entity: Entity,
    pub attributes: AttributeSet,
    pub tags: EntityTags,
    pub effects: EffectsManager,
    pub abilities: EntityAbilities,
    pub events: EventManager,
    cue_queue: Vec<CueEvent>,
    deferred: VecDeque<DeferredOp>,
    notifications: Vec<ForgeNotification>,
    last_combined: TagContainer,
}

impl ForgeEntity {
    pub fn new(entity: Entity, attributes: AttributeSet) -> Self {
        Self {
            entity,
            attributes,
            tags: EntityTags::new(),
            effects: EffectsManager::new(),
            abilities: EntityAbilities::new(entity),
            events: EventManager::new(),
            cue_queue: Vec::new(),
            deferred: VecDeque::new(),
            notifications: Vec::new(),
            last_combined: TagContainer::new(),
        }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    fn context<'a>(
        attributes: &'a mut AttributeSet,
        tags: &'a mut EntityTags,
        cue_queue: &'a mut Vec<CueEvent>,
        deferred: &'a mut VecDeque<DeferredOp>,
        notifications: &'a mut Vec<ForgeNotification>,
    ) -> EngineContext<'a> {
        EngineContext {
            attributes,
            tags,
            cue_queue,
            deferred,
            notifications,
        }
    }

    // -- Effects ---------------------------------------------------------

    /// Applies an effect. Instant effects execute and return `None`;
    /// refused applications also return `None` and change nothing.
    pub fn apply_effect(
        &mut self,
        effect: Effect,
        cues: &mut CueManager,
    ) -> Option<ActiveEffectHandle> {
        let mut ctx = Self::context(
            &mut self.attributes,
            &mut self.tags,
            &mut self.cue_queue,
            &mut self.deferred,
            &mut self.notifications,
        );
        let handle = self.effects.apply_effect(effect, &mut ctx);
        self.finish_operation(cues);
        handle
    }

    /// Removes a live effect. Stale handles return false.
    pub fn unapply_effect(&mut self, handle: ActiveEffectHandle, cues: &mut CueManager) -> bool {
        let mut ctx = Self::context(
            &mut self.attributes,
            &mut self.tags,
            &mut self.cue_queue,
            &mut self.deferred,
            &mut self.notifications,
        );
        let removed = self.effects.unapply_effect(handle, &mut ctx);
        self.finish_operation(cues);
        removed
    }

    /// Advances every live effect by `delta_seconds`.
    pub fn update_effects(&mut self, delta_seconds: f32, cues: &mut CueManager) {
        let mut ctx = Self::context(
            &mut self.attributes,
            &mut self.tags,
            &mut self.cue_queue,
            &mut self.deferred,
            &mut self.notifications,
        );
        self.effects.update_effects(delta_seconds, &mut ctx);
        self.finish_operation(cues);
    }

    /// Refreshes live source-side attribute captures from a sampled source
    /// entity (read-only on the counterpart).
    pub fn refresh_source_samples(
        &mut self,
        source: Entity,
        source_attributes: &AttributeSet,
        cues: &mut CueManager,
    ) {
        self.effects.refresh_source_samples(source, source_attributes);
        self.finish_operation(cues);
    }

    // -- Tags ------------------------------------------------------------

    pub fn add_base_tag(&mut self, tag: GameplayTag, cues: &mut CueManager) {
        self.tags.add_base(tag);
        self.finish_operation(cues);
    }

    pub fn remove_base_tag(&mut self, tag: &GameplayTag, cues: &mut CueManager) {
        self.tags.remove_base(tag);
        self.finish_operation(cues);
    }

    /// The combined base + modifier tag view.
    pub fn combined_tags(&self) -> &TagContainer {
        self.tags.combined()
    }

    // -- Events ----------------------------------------------------------

    /// Raises an event: host subscribers run, event-triggered abilities
    /// attempt activation.
    pub fn raise_event(&mut self, tag: GameplayTag, payload: EventPayload, cues: &mut CueManager) {
        self.dispatch_event(tag, payload);
        self.finish_operation(cues);
    }

    fn dispatch_event(&mut self, tag: GameplayTag, payload: EventPayload) {
        self.events.raise(tag.clone(), payload);
        for (handle, trigger) in self.abilities.triggered() {
            if let crate::abilities::AbilityTrigger::Event(event_tag) = trigger
                && event_tag == tag
            {
                self.deferred.push_back(DeferredOp::TryActivateAbility(handle));
            }
        }
    }

    // -- Abilities -------------------------------------------------------

    /// Grants an ability with a permanent source: never inhibited, never
    /// removed by effect expiry.
    pub fn grant_ability_permanently(
        &mut self,
        data: Arc<AbilityData>,
        level: i32,
        cues: &mut CueManager,
    ) -> AbilityHandle {
        let handle = self.abilities.grant_permanently(data, level, None);
        self.finish_operation(cues);
        handle
    }

    /// Grants, activates once, and removes the ability when its instance
    /// ends. A failed activation removes the grant immediately.
    pub fn grant_and_activate_once(
        &mut self,
        data: Arc<AbilityData>,
        level: i32,
        cues: &mut CueManager,
    ) -> (AbilityHandle, ActivationFailure) {
        let handle = self.abilities.grant_permanently(data, level, None);
        let failure = self.abilities.activate(
            handle,
            None,
            None,
            None,
            &self.attributes,
            &self.effects,
            &mut self.tags,
            &mut self.deferred,
            &mut self.notifications,
        );
        self.abilities.set_pending_removal(
            handle,
            &mut self.tags,
            &mut self.deferred,
            &mut self.notifications,
        );
        self.finish_operation(cues);
        (handle, failure)
    }

    /// Looks up the granted ability for an `(ability data, source)` pair.
    pub fn try_get_ability(
        &self,
        data: &Arc<AbilityData>,
        source: Option<Entity>,
    ) -> Option<AbilityHandle> {
        self.abilities.try_get(data, source)
    }

    /// Runs the ordered activation gates and starts an instance when every
    /// gate passes. The returned flags carry every failed gate.
    pub fn activate_ability(
        &mut self,
        handle: AbilityHandle,
        cues: &mut CueManager,
    ) -> ActivationFailure {
        self.activate_ability_with(handle, None, None, None, cues)
    }

    /// Activation with explicit source/target context. Tag views are
    /// sampled by the caller so cross-entity reads stay read-only.
    pub fn activate_ability_with(
        &mut self,
        handle: AbilityHandle,
        source_tags: Option<&TagContainer>,
        target_tags: Option<&TagContainer>,
        target: Option<Entity>,
        cues: &mut CueManager,
    ) -> ActivationFailure {
        let failure = self.abilities.activate(
            handle,
            source_tags,
            target_tags,
            target,
            &self.attributes,
            &self.effects,
            &mut self.tags,
            &mut self.deferred,
            &mut self.notifications,
        );
        self.finish_operation(cues);
        failure
    }

    /// Ends the most recent running instance.
    pub fn end_ability(&mut self, handle: AbilityHandle, cues: &mut CueManager) -> bool {
        let ended = self.abilities.end(
            handle,
            &mut self.tags,
            &mut self.deferred,
            &mut self.notifications,
        );
        self.finish_operation(cues);
        ended
    }

    /// Ends every running instance.
    pub fn cancel_ability(&mut self, handle: AbilityHandle, cues: &mut CueManager) -> bool {
        let canceled = self.abilities.cancel(
            handle,
            &mut self.tags,
            &mut self.deferred,
            &mut self.notifications,
        );
        self.finish_operation(cues);
        canceled
    }

    /// Commits the activation cost as a permanent attribute mutation.
    pub fn commit_cost(&mut self, handle: AbilityHandle, cues: &mut CueManager) -> bool {
        let Some(cost) = self.abilities.cost_effect_for(handle) else {
            return false;
        };
        self.apply_effect(cost, cues);
        true
    }

    /// Commits the cooldown effects. A cooldown already running is refreshed
    /// rather than duplicated.
    pub fn commit_cooldown(&mut self, handle: AbilityHandle, cues: &mut CueManager) -> bool {
        let cooldowns = self.abilities.cooldown_effects_for(handle);
        if cooldowns.is_empty() {
            return false;
        }
        for cooldown in cooldowns {
            match self.effects.find_active(&cooldown.data, None) {
                Some(existing) => {
                    self.effects.refresh_duration(existing);
                }
                None => {
                    let mut ctx = Self::context(
                        &mut self.attributes,
                        &mut self.tags,
                        &mut self.cue_queue,
                        &mut self.deferred,
                        &mut self.notifications,
                    );
                    self.effects.apply_effect(cooldown, &mut ctx);
                }
            }
        }
        self.finish_operation(cues);
        true
    }

    /// Commits cost and cooldown together.
    pub fn commit_ability(&mut self, handle: AbilityHandle, cues: &mut CueManager) {
        self.commit_cost(handle, cues);
        self.commit_cooldown(handle, cues);
    }

    /// Remaining cooldown time for `tag`, zero when clear.
    pub fn remaining_cooldown(&self, handle: AbilityHandle, tag: &GameplayTag) -> f32 {
        self.abilities.remaining_cooldown(handle, tag, &self.effects)
    }

    pub fn ability_is_valid(&self, handle: AbilityHandle) -> bool {
        self.abilities.is_valid(handle)
    }

    pub fn ability_is_active(&self, handle: AbilityHandle) -> bool {
        self.abilities
            .get(handle)
            .map(|ability| ability.is_active())
            .unwrap_or(false)
    }

    pub fn ability_is_inhibited(&self, handle: AbilityHandle) -> bool {
        self.abilities
            .get(handle)
            .map(|ability| ability.is_inhibited())
            .unwrap_or(false)
    }

    pub fn ability_level(&self, handle: AbilityHandle) -> Option<i32> {
        self.abilities.get(handle).map(|ability| ability.level())
    }

    /// The ability's cost effect template.
    pub fn cost_data(&self, handle: AbilityHandle) -> Option<Arc<EffectData>> {
        self.abilities
            .get(handle)
            .and_then(|ability| ability.data().cost_effect.clone())
    }

    /// The ability's cooldown effect templates.
    pub fn cooldown_data(&self, handle: AbilityHandle) -> Vec<Arc<EffectData>> {
        self.abilities
            .get(handle)
            .map(|ability| ability.data().cooldown_effects.clone())
            .unwrap_or_default()
    }

    // -- Notifications ---------------------------------------------------

    /// Drains the notifications accumulated since the last drain.
    pub fn drain_notifications(&mut self) -> Vec<ForgeNotification> {
        std::mem::take(&mut self.notifications)
    }

    // -- Operation pipeline ----------------------------------------------

    /// Flushes work left behind by direct field mutation (host writing
    /// `attributes`/`tags` without going through an operation).
    pub fn flush(&mut self, cues: &mut CueManager) {
        self.finish_operation(cues);
    }

    fn finish_operation(&mut self, cues: &mut CueManager) {
        let mut settled = false;
        for _ in 0..MAX_SETTLE_PASSES {
            let mut progress = false;

            while let Some(op) = self.deferred.pop_front() {
                self.run_deferred(op);
                progress = true;
            }

            if self.tags.take_changed() {
                progress = true;
                self.notifications.push(ForgeNotification::TagsChanged);
                let mut ctx = Self::context(
                    &mut self.attributes,
                    &mut self.tags,
                    &mut self.cue_queue,
                    &mut self.deferred,
                    &mut self.notifications,
                );
                self.effects.reevaluate_tag_gates(&mut ctx);
                self.process_tag_triggers();
            }

            // Live attribute-based magnitudes follow published values and
            // refreshed source samples; movement publishes this same pass.
            if self.effects.refresh_live_magnitudes(&mut self.attributes) {
                progress = true;
            }

            let changes = self.attributes.apply_pending_value_changes();
            if !changes.is_empty() {
                progress = true;
                for change in changes {
                    self.notifications
                        .push(ForgeNotification::AttributeChanged(change));
                }
            }

            if !progress && self.deferred.is_empty() {
                settled = true;
                break;
            }
        }
        if !settled {
            warn!("entity state did not settle within {MAX_SETTLE_PASSES} passes");
        }

        let mut ctx = Self::context(
            &mut self.attributes,
            &mut self.tags,
            &mut self.cue_queue,
            &mut self.deferred,
            &mut self.notifications,
        );
        self.effects.update_live_cues(&mut ctx);

        let queued = std::mem::take(&mut self.cue_queue);
        if !queued.is_empty() {
            for event in &queued {
                self.notifications
                    .push(ForgeNotification::CueTriggered(event.clone()));
            }
            cues.dispatch(self.entity, &queued);
        }
    }

    fn run_deferred(&mut self, op: DeferredOp) {
        match op {
            DeferredOp::ApplyEffect(effect) => {
                let mut ctx = Self::context(
                    &mut self.attributes,
                    &mut self.tags,
                    &mut self.cue_queue,
                    &mut self.deferred,
                    &mut self.notifications,
                );
                self.effects.apply_effect(effect, &mut ctx);
            }
            DeferredOp::UnapplyEffect(handle) => {
                let mut ctx = Self::context(
                    &mut self.attributes,
                    &mut self.tags,
                    &mut self.cue_queue,
                    &mut self.deferred,
                    &mut self.notifications,
                );
                self.effects.unapply_effect(handle, &mut ctx);
            }
            DeferredOp::GrantAbilities {
                configs,
                effect_level,
                source_effect,
                source_entity,
            } => {
                for config in &configs {
                    let (handle, try_activate) = self.abilities.grant_from_effect(
                        config,
                        effect_level,
                        source_effect,
                        source_entity,
                    );
                    if try_activate {
                        self.deferred
                            .push_back(DeferredOp::TryActivateAbility(handle));
                    }
                }
            }
            DeferredOp::RemoveAbilityGrants { source_effect } => {
                self.abilities.remove_grants_for_effect(
                    source_effect,
                    &mut self.tags,
                    &mut self.deferred,
                    &mut self.notifications,
                );
            }
            DeferredOp::SetGrantInhibited {
                source_effect,
                inhibited,
            } => {
                self.abilities.set_grant_inhibited(
                    source_effect,
                    inhibited,
                    &mut self.tags,
                    &mut self.deferred,
                    &mut self.notifications,
                );
            }
            DeferredOp::TryActivateAbility(handle) => {
                let _ = self.abilities.activate(
                    handle,
                    None,
                    None,
                    None,
                    &self.attributes,
                    &self.effects,
                    &mut self.tags,
                    &mut self.deferred,
                    &mut self.notifications,
                );
            }
            DeferredOp::EndAbility(handle) => {
                self.abilities.end(
                    handle,
                    &mut self.tags,
                    &mut self.deferred,
                    &mut self.notifications,
                );
            }
            DeferredOp::RaiseEvent { tag, payload } => {
                self.dispatch_event(tag, payload);
            }
        }
    }

    fn process_tag_triggers(&mut self) {
        let current = self.tags.combined().clone();
        for (handle, trigger) in self.abilities.triggered() {
            match trigger {
                crate::abilities::AbilityTrigger::TagAdded(tag) => {
                    if current.has_tag_exact(&tag) && !self.last_combined.has_tag_exact(&tag) {
                        self.deferred
                            .push_back(DeferredOp::TryActivateAbility(handle));
                    }
                }
                crate::abilities::AbilityTrigger::TagPresent(tag) => {
                    if current.has_tag_exact(&tag) && !self.last_combined.has_tag_exact(&tag) {
                        self.deferred
                            .push_back(DeferredOp::TryActivateAbility(handle));
                    } else if !current.has_tag_exact(&tag)
                        && self.last_combined.has_tag_exact(&tag)
                    {
                        self.deferred.push_back(DeferredOp::EndAbility(handle));
                    }
                }
                crate::abilities::AbilityTrigger::Event(_) => {}
            }
        }
        self.last_combined = current;
    }
}

#[cfg(test)]
mod tests {
    use bevy::ecs::world::World;

    use super::*;
    use crate::effects::{
        AttributeCaptureDefinition, CaptureSource, EffectComponent, EffectOwnership,
        MagnitudeCalculation, Modifier, ModifierOperation,
    };

    fn forge(attributes: AttributeSet) -> ForgeEntity {
        let entity = World::new().spawn_empty().id();
        ForgeEntity::new(entity, attributes)
    }

    #[test]
    fn instant_grant_produces_a_permanent_ability_before_returning() {
        let mut forge = forge(AttributeSet::new());
        let mut cues = CueManager::new();

        let granted = crate::abilities::AbilityData::new("Gift").build();
        let scroll = crate::effects::EffectData::new("Scroll")
            .add_component(EffectComponent::GrantAbility(vec![
                GrantAbilityConfig::new(granted.clone()),
            ]))
            .build();

        let effect = Effect::new(scroll, EffectOwnership::self_applied(forge.entity()));
        forge.apply_effect(effect, &mut cues);

        // The deferred grant drained inside the operation.
        let source = forge.entity();
        let handle = forge.try_get_ability(&granted, Some(source)).unwrap();
        assert!(forge.ability_is_valid(handle));
        assert!(!forge.ability_is_inhibited(handle));
    }

    #[test]
    fn live_target_captures_settle_within_one_operation() {
        let mut forge = forge(
            AttributeSet::new()
                .with_attribute("Strength", 10)
                .with_attribute("Damage", 0),
        );
        let mut cues = CueManager::new();

        // Damage mirrors Strength through a live target capture.
        let mirror = crate::effects::EffectData::new("Mirror")
            .infinite()
            .add_modifier(Modifier::new(
                "Damage",
                ModifierOperation::FlatAdd,
                MagnitudeCalculation::from_attribute(AttributeCaptureDefinition::new(
                    "Strength",
                    CaptureSource::Target,
                    false,
                )),
            ))
            .build();
        forge.apply_effect(
            Effect::new(mirror, EffectOwnership::self_applied(forge.entity())),
            &mut cues,
        );
        assert_eq!(forge.attributes.current_value(&"Damage".into()), Some(10));

        // A permanent Strength change ripples into Damage before the
        // operation returns.
        let training = crate::effects::EffectData::new("Training")
            .add_modifier(Modifier::new(
                "Strength",
                ModifierOperation::FlatAdd,
                MagnitudeCalculation::scalar(5),
            ))
            .build();
        forge.apply_effect(
            Effect::new(training, EffectOwnership::self_applied(forge.entity())),
            &mut cues,
        );
        assert_eq!(forge.attributes.current_value(&"Strength".into()), Some(15));
        assert_eq!(forge.attributes.current_value(&"Damage".into()), Some(15));
    }

    #[test]
    fn notifications_accumulate_until_drained() {
        let mut forge = forge(AttributeSet::new().with_attribute("A", 0));
        let mut cues = CueManager::new();

        let bump = crate::effects::EffectData::new("Bump")
            .add_modifier(Modifier::new(
                "A",
                ModifierOperation::FlatAdd,
                MagnitudeCalculation::scalar(1),
            ))
            .build();
        forge.apply_effect(
            Effect::new(bump, EffectOwnership::self_applied(forge.entity())),
            &mut cues,
        );

        let drained = forge.drain_notifications();
        assert!(drained
            .iter()
            .any(|n| matches!(n, ForgeNotification::AttributeChanged(change) if change.delta() == 1)));
        assert!(forge.drain_notifications().is_empty());
    }

    #[test]
    fn flush_publishes_direct_field_mutations() {
        let mut forge = forge(AttributeSet::new().with_attribute_bounds("HP", 50, 0, 50));
        let mut cues = CueManager::new();

        forge
            .attributes
            .attribute_mut(&"HP".into())
            .unwrap()
            .execute_flat(-20);
        // Not yet published.
        assert_eq!(forge.attributes.current_value(&"HP".into()), Some(50));

        forge.flush(&mut cues);
        assert_eq!(forge.attributes.current_value(&"HP".into()), Some(30));
    }
}
