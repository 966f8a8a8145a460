//! Per-entity ability tracking: grants, inhibition, activation gates,
//! instances and cost/cooldown plumbing.

use std::collections::VecDeque;
use std::sync::Arc;

use bevy::log::debug;
use bevy::prelude::Entity;

use super::ability::{Ability, AbilityInstance, Grant, GrantSource, InstanceState};
use super::definition::{
    AbilityData, AbilityDeactivationPolicy, AbilityTrigger, ActivationFailure, BehaviorContext,
    GrantAbilityConfig, InstancingPolicy,
};
use crate::attributes::AttributeSet;
use crate::core::{AbilityHandle, ActiveEffectHandle, Arena};
use crate::effects::{
    Effect, EffectOwnership, EffectsManager, MagnitudeCalculation, ModifierOperation,
};
use crate::entity::{DeferredOp, ForgeNotification};
use crate::tags::{EntityTags, GameplayTag, TagContainer, TagCountMap};

/// The ability runtime of one entity.
pub struct EntityAbilities {
    owner: Entity,
    abilities: Arena<Ability>,
    /// Reference-counted ability-blocking tags contributed by running
    /// instances.
    blocked_tags: TagCountMap,
}

impl EntityAbilities {
    pub fn new(owner: Entity) -> Self {
        Self {
            owner,
            abilities: Arena::new(),
            blocked_tags: TagCountMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }

    /// Handles of granted abilities in grant order.
    pub fn granted(&self) -> Vec<AbilityHandle> {
        self.abilities
            .handles()
            .into_iter()
            .map(AbilityHandle)
            .collect()
    }

    pub fn get(&self, handle: AbilityHandle) -> Option<&Ability> {
        self.abilities.get(handle.0)
    }

    pub fn is_valid(&self, handle: AbilityHandle) -> bool {
        self.abilities.contains(handle.0)
    }

    /// Finds the granted ability for an `(ability data, source)` pair.
    pub fn try_get(
        &self,
        data: &Arc<AbilityData>,
        source: Option<Entity>,
    ) -> Option<AbilityHandle> {
        self.abilities
            .iter()
            .find(|(_, ability)| Arc::ptr_eq(&ability.data, data) && ability.source == source)
            .map(|(raw, _)| AbilityHandle(raw))
    }

    /// Abilities with a trigger, for the owning entity's dispatch.
    pub(crate) fn triggered(&self) -> Vec<(AbilityHandle, AbilityTrigger)> {
        self.abilities
            .iter()
            .filter_map(|(raw, ability)| {
                ability
                    .data
                    .trigger
                    .clone()
                    .map(|trigger| (AbilityHandle(raw), trigger))
            })
            .collect()
    }

    /// Grants an ability permanently (host-side or instant-effect grants).
    ///
    /// A permanent grant always wins the level: repeat permanent grants
    /// overwrite it last-writer-wins.
    pub fn grant_permanently(
        &mut self,
        data: Arc<AbilityData>,
        level: i32,
        source: Option<Entity>,
    ) -> AbilityHandle {
        let handle = match self.try_get(&data, source) {
            Some(handle) => handle,
            None => AbilityHandle(self.abilities.insert(Ability::new(data.clone(), level, source))),
        };
        let ability = self.abilities.get_mut(handle.0).unwrap();
        ability.grants.push(Grant::permanent());
        ability.level = level;
        debug!("granted ability '{}' permanently", data.name);
        handle
    }

    /// Grants an ability from a live effect (or permanently when the effect
    /// was instant and left no handle behind).
    pub(crate) fn grant_from_effect(
        &mut self,
        config: &GrantAbilityConfig,
        effect_level: i32,
        source_effect: Option<ActiveEffectHandle>,
        source_entity: Entity,
    ) -> (AbilityHandle, bool) {
        let level = config.level.evaluate(effect_level).round() as i32;
        let Some(source_effect) = source_effect else {
            let handle = self.grant_permanently(config.ability.clone(), level, Some(source_entity));
            return (handle, config.try_activate_on_grant);
        };

        let handle = match self.try_get(&config.ability, Some(source_entity)) {
            Some(handle) => {
                let ability = self.abilities.get_mut(handle.0).unwrap();
                // Transient grants never outrank a permanent one's level.
                if !ability.has_permanent_grant()
                    && config.level_override.allows(level, ability.level)
                {
                    ability.level = level;
                }
                handle
            }
            None => AbilityHandle(self.abilities.insert(Ability::new(
                config.ability.clone(),
                level,
                Some(source_entity),
            ))),
        };
        let ability = self.abilities.get_mut(handle.0).unwrap();
        ability.grants.push(Grant {
            source: GrantSource::Effect(source_effect),
            inhibited: false,
            removal_policy: config.removal_policy,
            inhibition_policy: config.inhibition_policy,
            try_activate_on_enable: config.try_activate_on_enable,
        });
        debug!("granted ability '{}' from effect", config.ability.name);
        (handle, config.try_activate_on_grant)
    }

    /// Withdraws every grant held by a removed effect, applying each grant's
    /// removal policy.
    pub(crate) fn remove_grants_for_effect(
        &mut self,
        source_effect: ActiveEffectHandle,
        tags: &mut EntityTags,
        deferred: &mut VecDeque<DeferredOp>,
        notifications: &mut Vec<ForgeNotification>,
    ) {
        for raw in self.abilities.handles() {
            let handle = AbilityHandle(raw);
            let Some(ability) = self.abilities.get_mut(raw) else {
                continue;
            };
            let source = GrantSource::Effect(source_effect);
            let Some(position) = ability.grants.iter().position(|grant| grant.source == source)
            else {
                continue;
            };
            let grant = ability.grants.remove(position);
            if !ability.grants.is_empty() {
                continue;
            }
            match grant.removal_policy {
                AbilityDeactivationPolicy::Ignore => {
                    self.remove_ability(handle, false, tags, deferred, notifications);
                }
                AbilityDeactivationPolicy::CancelImmediately => {
                    self.cancel(handle, tags, deferred, notifications);
                    self.remove_ability(handle, false, tags, deferred, notifications);
                }
                AbilityDeactivationPolicy::RemoveOnEnd => {
                    let ability = self.abilities.get_mut(raw).unwrap();
                    if ability.is_active() {
                        ability.pending_removal = true;
                    } else {
                        self.remove_ability(handle, false, tags, deferred, notifications);
                    }
                }
            }
        }
    }

    /// Propagates a granting effect's inhibition state.
    pub(crate) fn set_grant_inhibited(
        &mut self,
        source_effect: ActiveEffectHandle,
        inhibited: bool,
        tags: &mut EntityTags,
        deferred: &mut VecDeque<DeferredOp>,
        notifications: &mut Vec<ForgeNotification>,
    ) {
        for raw in self.abilities.handles() {
            let handle = AbilityHandle(raw);
            let Some(ability) = self.abilities.get_mut(raw) else {
                continue;
            };
            let was_inhibited = ability.is_inhibited();
            let source = GrantSource::Effect(source_effect);
            let Some(grant) = ability.find_grant_mut(source) else {
                continue;
            };
            grant.inhibited = inhibited;
            let inhibition_policy = grant.inhibition_policy;
            let try_activate_on_enable = grant.try_activate_on_enable;
            let now_inhibited = ability.is_inhibited();

            if !was_inhibited && now_inhibited {
                if inhibition_policy == AbilityDeactivationPolicy::CancelImmediately {
                    self.cancel(handle, tags, deferred, notifications);
                }
                // RemoveOnEnd and Ignore both let running instances finish;
                // inhibition already blocks new activations.
            } else if was_inhibited && !now_inhibited && try_activate_on_enable {
                deferred.push_back(DeferredOp::TryActivateAbility(handle));
            }
        }
    }

    /// Flags an ability for removal once its last instance ends (or removes
    /// it outright when idle).
    pub(crate) fn set_pending_removal(
        &mut self,
        handle: AbilityHandle,
        tags: &mut EntityTags,
        deferred: &mut VecDeque<DeferredOp>,
        notifications: &mut Vec<ForgeNotification>,
    ) {
        let Some(ability) = self.abilities.get_mut(handle.0) else {
            return;
        };
        if ability.is_active() {
            ability.pending_removal = true;
        } else {
            self.remove_ability(handle, false, tags, deferred, notifications);
        }
    }

    fn remove_ability(
        &mut self,
        handle: AbilityHandle,
        was_canceled: bool,
        tags: &mut EntityTags,
        deferred: &mut VecDeque<DeferredOp>,
        notifications: &mut Vec<ForgeNotification>,
    ) {
        // End whatever still runs so tag references never leak.
        while self
            .abilities
            .get(handle.0)
            .is_some_and(|ability| ability.is_active())
        {
            self.end_one_instance(handle, was_canceled, tags, deferred, notifications);
        }
        if let Some(ability) = self.abilities.remove(handle.0) {
            debug!("removed ability '{}'", ability.data.name);
        }
    }

    /// The ordered activation gate check. Collects every failed gate into
    /// the returned flags; an empty result means activation succeeded and
    /// the instance started.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn activate(
        &mut self,
        handle: AbilityHandle,
        source_tags: Option<&TagContainer>,
        target_tags: Option<&TagContainer>,
        target: Option<Entity>,
        attributes: &AttributeSet,
        effects: &EffectsManager,
        tags: &mut EntityTags,
        deferred: &mut VecDeque<DeferredOp>,
        notifications: &mut Vec<ForgeNotification>,
    ) -> ActivationFailure {
        let Some(ability) = self.abilities.get(handle.0) else {
            return ActivationFailure::INVALID_HANDLER;
        };
        let data = ability.data.clone();
        let level = ability.level;
        let mut failure = ActivationFailure::NONE;

        if ability.is_inhibited() {
            failure |= ActivationFailure::INHIBITED;
        }

        if data
            .activation_required_tags
            .iter()
            .any(|tag| data.activation_blocked_tags.has_tag_exact(tag))
        {
            failure |= ActivationFailure::INVALID_TAG_CONFIGURATION;
        }

        let combined = tags.combined();
        if !combined.has_all(data.activation_required_tags.as_slice())
            || combined.has_any(data.activation_blocked_tags.as_slice())
        {
            failure |= ActivationFailure::OWNER_TAG_REQUIREMENTS;
        }

        match source_tags {
            Some(source_tags) => {
                if !source_tags.has_all(data.source_required_tags.as_slice())
                    || source_tags.has_any(data.source_blocked_tags.as_slice())
                {
                    failure |= ActivationFailure::SOURCE_TAG_REQUIREMENTS;
                }
            }
            None => {
                if !data.source_required_tags.is_empty() {
                    failure |= ActivationFailure::SOURCE_TAG_REQUIREMENTS;
                }
            }
        }

        match target_tags {
            Some(target_tags) => {
                if !target_tags.has_all(data.target_required_tags.as_slice())
                    || target_tags.has_any(data.target_blocked_tags.as_slice())
                {
                    failure |= ActivationFailure::TARGET_TAG_REQUIREMENTS;
                }
            }
            None => {
                if !data.target_required_tags.is_empty() {
                    failure |= ActivationFailure::TARGET_TAG_NOT_PRESENT;
                }
            }
        }

        if self.is_blocked_by_tags(&data.ability_tags) {
            failure |= ActivationFailure::BLOCKED_BY_TAGS;
        }

        if let Some(cost) = &data.cost_effect
            && !cost_is_affordable(cost, level, attributes)
        {
            failure |= ActivationFailure::INSUFFICIENT_RESOURCES;
        }

        if data
            .cooldown_effects
            .iter()
            .any(|cooldown| effects.find_active(cooldown, None).is_some())
        {
            failure |= ActivationFailure::COOLDOWN;
        }

        let retriggering = data.instancing_policy == InstancingPolicy::PerEntity
            && data.retrigger_instanced_ability
            && ability.is_active();
        if data.instancing_policy == InstancingPolicy::PerEntity
            && !data.retrigger_instanced_ability
            && ability.is_active()
        {
            failure |= ActivationFailure::PERSISTENT_INSTANCE_ACTIVE;
        }

        if !failure.is_empty() {
            debug!("activation of '{}' refused: {failure:?}", data.name);
            return failure;
        }

        // Success path. Owned tags first, then cancellation (before blocking
        // so a canceller cannot block itself), then the block references.
        tags.add_modifier_many(&data.activation_owned_tags);

        if !data.cancel_abilities_with_tag.is_empty() {
            self.cancel_abilities_with_tags(
                &data.cancel_abilities_with_tag,
                Some(handle),
                tags,
                deferred,
                notifications,
            );
        }

        for tag in &data.block_abilities_with_tag {
            self.blocked_tags.increment(tag.clone());
        }

        if retriggering {
            // Restart semantics: the running instance ends (canceled), the
            // new one starts in its place with its own tag references.
            debug!("retriggering ability '{}'", data.name);
            self.end_one_instance(handle, true, tags, deferred, notifications);
        }

        let ability = self.abilities.get_mut(handle.0).unwrap();
        let mut instance = AbilityInstance {
            state: InstanceState::Active,
            behavior: data.make_behavior(),
            target,
            applied_activation_owned_tags: !data.activation_owned_tags.is_empty(),
            applied_blocked_tags: !data.block_abilities_with_tag.is_empty(),
        };
        let mut behavior_ctx = BehaviorContext {
            handle,
            level,
            owner: self.owner,
            target,
            was_canceled: false,
            deferred,
        };
        instance.behavior.on_started(&mut behavior_ctx);
        ability.instances.push(instance);

        notifications.push(ForgeNotification::AbilityActivated { handle });
        debug!("activated ability '{}'", data.name);
        ActivationFailure::NONE
    }

    /// Cancels every granted ability whose tags match `cancel_tags`.
    pub(crate) fn cancel_abilities_with_tags(
        &mut self,
        cancel_tags: &TagContainer,
        skip: Option<AbilityHandle>,
        tags: &mut EntityTags,
        deferred: &mut VecDeque<DeferredOp>,
        notifications: &mut Vec<ForgeNotification>,
    ) {
        for raw in self.abilities.handles() {
            let handle = AbilityHandle(raw);
            if Some(handle) == skip {
                continue;
            }
            let Some(ability) = self.abilities.get(raw) else {
                continue;
            };
            let matches = ability
                .data
                .ability_tags
                .iter()
                .any(|tag| cancel_tags.iter().any(|cancel| tag.matches(cancel)));
            if matches && ability.is_active() {
                self.cancel(handle, tags, deferred, notifications);
            }
        }
    }

    /// Ends the most recent running instance.
    pub(crate) fn end(
        &mut self,
        handle: AbilityHandle,
        tags: &mut EntityTags,
        deferred: &mut VecDeque<DeferredOp>,
        notifications: &mut Vec<ForgeNotification>,
    ) -> bool {
        self.end_one_instance(handle, false, tags, deferred, notifications)
    }

    /// Ends every running instance.
    pub(crate) fn cancel(
        &mut self,
        handle: AbilityHandle,
        tags: &mut EntityTags,
        deferred: &mut VecDeque<DeferredOp>,
        notifications: &mut Vec<ForgeNotification>,
    ) -> bool {
        let mut any = false;
        while self
            .abilities
            .get(handle.0)
            .is_some_and(|ability| ability.is_active())
        {
            any |= self.end_one_instance(handle, true, tags, deferred, notifications);
        }
        any
    }

    fn end_one_instance(
        &mut self,
        handle: AbilityHandle,
        was_canceled: bool,
        tags: &mut EntityTags,
        deferred: &mut VecDeque<DeferredOp>,
        notifications: &mut Vec<ForgeNotification>,
    ) -> bool {
        let Some(ability) = self.abilities.get_mut(handle.0) else {
            return false;
        };
        let Some(position) = ability
            .instances
            .iter()
            .rposition(|instance| instance.state == InstanceState::Active)
        else {
            return false;
        };
        let data = ability.data.clone();
        let level = ability.level;
        let owner_tags_applied;
        let blocked_applied;
        {
            let instance = &mut ability.instances[position];
            instance.state = InstanceState::Ending;
            owner_tags_applied = instance.applied_activation_owned_tags;
            blocked_applied = instance.applied_blocked_tags;
        }

        if owner_tags_applied {
            tags.remove_modifier_many(&data.activation_owned_tags);
        }
        if blocked_applied {
            for tag in &data.block_abilities_with_tag {
                self.blocked_tags.decrement(tag);
            }
        }

        let ability = self.abilities.get_mut(handle.0).unwrap();
        let mut instance = ability.instances.remove(position);
        let target = instance.target;
        let mut behavior_ctx = BehaviorContext {
            handle,
            level,
            owner: self.owner,
            target,
            was_canceled,
            deferred,
        };
        instance.behavior.on_ended(&mut behavior_ctx);

        notifications.push(ForgeNotification::AbilityEnded {
            handle,
            was_canceled,
        });
        debug!(
            "ended ability '{}' (canceled: {was_canceled})",
            data.name
        );

        let ability = self.abilities.get_mut(handle.0).unwrap();
        if ability.pending_removal && !ability.is_active() {
            self.remove_ability(handle, false, tags, deferred, notifications);
        }
        true
    }

    /// Builds the cost effect ready to apply, at the ability's level.
    pub(crate) fn cost_effect_for(&self, handle: AbilityHandle) -> Option<Effect> {
        let ability = self.abilities.get(handle.0)?;
        let cost = ability.data.cost_effect.clone()?;
        Some(Effect::new(cost, EffectOwnership::self_applied(self.owner)).with_level(ability.level))
    }

    /// Builds the cooldown effects ready to apply, at the ability's level.
    pub(crate) fn cooldown_effects_for(&self, handle: AbilityHandle) -> Vec<Effect> {
        let Some(ability) = self.abilities.get(handle.0) else {
            return Vec::new();
        };
        ability
            .data
            .cooldown_effects
            .iter()
            .map(|cooldown| {
                Effect::new(cooldown.clone(), EffectOwnership::self_applied(self.owner))
                    .with_level(ability.level)
            })
            .collect()
    }

    /// Whether the cost effect could be committed right now.
    pub fn can_afford(&self, handle: AbilityHandle, attributes: &AttributeSet) -> bool {
        let Some(ability) = self.abilities.get(handle.0) else {
            return false;
        };
        match &ability.data.cost_effect {
            Some(cost) => cost_is_affordable(cost, ability.level, attributes),
            None => true,
        }
    }

    /// Remaining cooldown for `tag`, zero when none of the ability's
    /// cooldown effects currently grants it.
    pub fn remaining_cooldown(
        &self,
        handle: AbilityHandle,
        tag: &GameplayTag,
        effects: &EffectsManager,
    ) -> f32 {
        let Some(ability) = self.abilities.get(handle.0) else {
            return 0.0;
        };
        if !ability
            .data
            .cooldown_effects
            .iter()
            .any(|cooldown| cooldown.grants_tag(tag))
        {
            return 0.0;
        }
        effects.remaining_time_for_tag(tag).unwrap_or(0.0).max(0.0)
    }

    /// True while a running instance blocks abilities carrying these tags.
    pub fn is_blocked_by_tags(&self, ability_tags: &TagContainer) -> bool {
        ability_tags.iter().any(|ability_tag| {
            self.blocked_tags
                .iter()
                .any(|(blocked_tag, _)| ability_tag.matches(blocked_tag))
        })
    }
}

/// Simulates a cost commit against published base values: every reducing
/// modifier must leave its attribute at or above its minimum.
fn cost_is_affordable(cost: &crate::effects::EffectData, level: i32, attributes: &AttributeSet) -> bool {
    for modifier in &cost.modifiers {
        let Ok(attribute) = attributes.attribute(&modifier.attribute) else {
            continue;
        };
        let magnitude = match &modifier.magnitude {
            MagnitudeCalculation::Scalable(scalable) => scalable.evaluate(level),
            MagnitudeCalculation::AttributeBased {
                capture,
                calculation,
                coefficient,
                pre_multiply_additive,
                post_multiply_additive,
            } => {
                // Costs are self-applied, so source and target captures both
                // resolve against the owner's attributes.
                let Ok(captured) = attributes.attribute(&capture.attribute) else {
                    continue;
                };
                let value = match calculation {
                    crate::effects::CaptureCalculation::CurrentValue => {
                        captured.current_value() as f32
                    }
                    crate::effects::CaptureCalculation::BaseValue => captured.base_value() as f32,
                    crate::effects::CaptureCalculation::ModifierValue => {
                        captured.modifier_value() as f32
                    }
                };
                (coefficient * value + pre_multiply_additive) * post_multiply_additive
            }
        };
        let amount = magnitude.round() as i32;
        let resulting = match modifier.operation {
            ModifierOperation::FlatAdd => attribute.base_value() + amount,
            ModifierOperation::Override => amount,
            ModifierOperation::PercentAdd => {
                (attribute.base_value() as i64 * (100 + amount as i64) / 100) as i32
            }
        };
        if resulting < attribute.base_value() && resulting < attribute.min() {
            return false;
        }
    }
    true
}
