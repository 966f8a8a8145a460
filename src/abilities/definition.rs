//! Ability definitions.
//!
//! [`AbilityData`] is the immutable template of an ability: its cost and
//! cooldown effects, the tag gates evaluated at activation, its instancing
//! policy, optional trigger and the behavior factory producing the
//! per-instance callbacks.

use std::collections::VecDeque;
use std::fmt::{self, Formatter};
use std::sync::Arc;

use bevy::prelude::Entity;

use crate::core::{AbilityHandle, LevelComparison};
use crate::effects::{Effect, EffectData, ScalableInt};
use crate::entity::DeferredOp;
use crate::events::EventPayload;
use crate::tags::{GameplayTag, TagContainer};

/// How instances of an ability are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstancingPolicy {
    /// One instance per entity, reused across activations.
    PerEntity,
    /// A fresh instance per activation; several may run concurrently.
    PerExecution,
}

/// What makes an ability activate on its own.
#[derive(Debug, Clone, PartialEq)]
pub enum AbilityTrigger {
    /// Activates when the entity raises an event with exactly this tag.
    Event(GameplayTag),
    /// Activates when the tag enters the combined tag set.
    TagAdded(GameplayTag),
    /// Activates when the tag enters the combined set and ends when it
    /// leaves.
    TagPresent(GameplayTag),
}

impl AbilityTrigger {
    pub fn tag(&self) -> &GameplayTag {
        match self {
            AbilityTrigger::Event(tag)
            | AbilityTrigger::TagAdded(tag)
            | AbilityTrigger::TagPresent(tag) => tag,
        }
    }
}

/// What removal or inhibition of a grant source does to a running ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityDeactivationPolicy {
    /// Running instances are left alone.
    Ignore,
    /// Every running instance is canceled first.
    CancelImmediately,
    /// The action is deferred until the last running instance ends.
    RemoveOnEnd,
}

/// One ability granted by an effect.
#[derive(Debug, Clone)]
pub struct GrantAbilityConfig {
    pub ability: Arc<AbilityData>,
    /// Granted level, evaluated at the granting effect's level.
    pub level: ScalableInt,
    pub removal_policy: AbilityDeactivationPolicy,
    pub inhibition_policy: AbilityDeactivationPolicy,
    pub try_activate_on_grant: bool,
    /// Attempt activation again whenever the grant is un-inhibited.
    pub try_activate_on_enable: bool,
    /// Orderings under which a repeat grant replaces the current level.
    pub level_override: LevelComparison,
}

impl GrantAbilityConfig {
    pub fn new(ability: Arc<AbilityData>) -> Self {
        Self {
            ability,
            level: ScalableInt::new(1),
            removal_policy: AbilityDeactivationPolicy::CancelImmediately,
            inhibition_policy: AbilityDeactivationPolicy::Ignore,
            try_activate_on_grant: false,
            try_activate_on_enable: false,
            level_override: LevelComparison::HIGHER,
        }
    }

    pub fn with_level(mut self, level: impl Into<ScalableInt>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_removal_policy(mut self, policy: AbilityDeactivationPolicy) -> Self {
        self.removal_policy = policy;
        self
    }

    pub fn with_inhibition_policy(mut self, policy: AbilityDeactivationPolicy) -> Self {
        self.inhibition_policy = policy;
        self
    }

    pub fn with_try_activate_on_grant(mut self, try_activate: bool) -> Self {
        self.try_activate_on_grant = try_activate;
        self
    }

    pub fn with_try_activate_on_enable(mut self, try_activate: bool) -> Self {
        self.try_activate_on_enable = try_activate;
        self
    }

    pub fn with_level_override(mut self, level_override: LevelComparison) -> Self {
        self.level_override = level_override;
        self
    }
}

/// Context handed to ability behaviors.
///
/// Engine mutations requested from a behavior are queued and drained after
/// the current public operation returns, so behaviors never re-enter the
/// runtime.
pub struct BehaviorContext<'a> {
    pub handle: AbilityHandle,
    pub level: i32,
    pub owner: Entity,
    pub target: Option<Entity>,
    /// Meaningful in `on_ended`: true when the instance was canceled rather
    /// than ended normally.
    pub was_canceled: bool,
    pub(crate) deferred: &'a mut VecDeque<DeferredOp>,
}

impl BehaviorContext<'_> {
    /// Queues an effect application on the owner.
    pub fn apply_effect(&mut self, effect: Effect) {
        self.deferred.push_back(DeferredOp::ApplyEffect(effect));
    }

    /// Queues removal of a live effect on the owner.
    pub fn unapply_effect(&mut self, handle: crate::core::ActiveEffectHandle) {
        self.deferred.push_back(DeferredOp::UnapplyEffect(handle));
    }

    /// Queues an event raise on the owner.
    pub fn raise_event(&mut self, tag: GameplayTag, payload: EventPayload) {
        self.deferred.push_back(DeferredOp::RaiseEvent { tag, payload });
    }

    /// Queues ending this ability's most recent instance.
    pub fn end_ability(&mut self) {
        self.deferred.push_back(DeferredOp::EndAbility(self.handle));
    }
}

/// Per-instance ability callbacks supplied by the host.
pub trait AbilityBehavior: Send + Sync + 'static {
    /// The instance started.
    fn on_started(&mut self, ctx: &mut BehaviorContext<'_>) {
        let _ = ctx;
    }

    /// The instance ended or was canceled.
    fn on_ended(&mut self, ctx: &mut BehaviorContext<'_>) {
        let _ = ctx;
    }
}

/// A no-op behavior for abilities whose activation effects come entirely
/// from cost/cooldown commits and granted effects.
pub struct PassiveBehavior;

impl AbilityBehavior for PassiveBehavior {}

pub(crate) type BehaviorFactory = Arc<dyn Fn() -> Box<dyn AbilityBehavior> + Send + Sync>;

/// Immutable ability template.
///
/// # Example
/// ```
/// use bevy_forge::abilities::AbilityData;
/// use bevy_forge::tags::GameplayTag;
///
/// let fireball = AbilityData::new("Fireball")
///     .add_ability_tag(GameplayTag::new("Ability.Attack.Fire"))
///     .add_activation_blocked_tag(GameplayTag::new("State.Stunned"))
///     .build();
/// ```
#[derive(Clone)]
pub struct AbilityData {
    pub name: String,
    /// Instant effect committed as the activation cost.
    pub cost_effect: Option<Arc<EffectData>>,
    /// Duration effects committed as cooldowns, each carrying its cooldown
    /// tags as modifier tags.
    pub cooldown_effects: Vec<Arc<EffectData>>,
    /// Tags describing the ability itself, matched by cancel/block sets.
    pub ability_tags: TagContainer,
    /// Abilities whose tags match any of these are canceled on activation.
    pub cancel_abilities_with_tag: TagContainer,
    /// While an instance runs, abilities whose tags match any of these are
    /// blocked.
    pub block_abilities_with_tag: TagContainer,
    /// Modifier tags held on the owner while an instance runs.
    pub activation_owned_tags: TagContainer,
    pub activation_required_tags: TagContainer,
    pub activation_blocked_tags: TagContainer,
    pub source_required_tags: TagContainer,
    pub source_blocked_tags: TagContainer,
    pub target_required_tags: TagContainer,
    pub target_blocked_tags: TagContainer,
    pub instancing_policy: InstancingPolicy,
    /// For `PerEntity`: an activation while the instance runs restarts it
    /// instead of failing.
    pub retrigger_instanced_ability: bool,
    pub trigger: Option<AbilityTrigger>,
    pub(crate) behavior_factory: Option<BehaviorFactory>,
}

impl AbilityData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cost_effect: None,
            cooldown_effects: Vec::new(),
            ability_tags: TagContainer::new(),
            cancel_abilities_with_tag: TagContainer::new(),
            block_abilities_with_tag: TagContainer::new(),
            activation_owned_tags: TagContainer::new(),
            activation_required_tags: TagContainer::new(),
            activation_blocked_tags: TagContainer::new(),
            source_required_tags: TagContainer::new(),
            source_blocked_tags: TagContainer::new(),
            target_required_tags: TagContainer::new(),
            target_blocked_tags: TagContainer::new(),
            instancing_policy: InstancingPolicy::PerExecution,
            retrigger_instanced_ability: false,
            trigger: None,
            behavior_factory: None,
        }
    }

    pub fn with_cost_effect(mut self, cost: Arc<EffectData>) -> Self {
        self.cost_effect = Some(cost);
        self
    }

    pub fn add_cooldown_effect(mut self, cooldown: Arc<EffectData>) -> Self {
        self.cooldown_effects.push(cooldown);
        self
    }

    pub fn add_ability_tag(mut self, tag: GameplayTag) -> Self {
        self.ability_tags.add(tag);
        self
    }

    pub fn add_cancel_abilities_with_tag(mut self, tag: GameplayTag) -> Self {
        self.cancel_abilities_with_tag.add(tag);
        self
    }

    pub fn add_block_abilities_with_tag(mut self, tag: GameplayTag) -> Self {
        self.block_abilities_with_tag.add(tag);
        self
    }

    pub fn add_activation_owned_tag(mut self, tag: GameplayTag) -> Self {
        self.activation_owned_tags.add(tag);
        self
    }

    pub fn add_activation_required_tag(mut self, tag: GameplayTag) -> Self {
        self.activation_required_tags.add(tag);
        self
    }

    pub fn add_activation_blocked_tag(mut self, tag: GameplayTag) -> Self {
        self.activation_blocked_tags.add(tag);
        self
    }

    pub fn add_source_required_tag(mut self, tag: GameplayTag) -> Self {
        self.source_required_tags.add(tag);
        self
    }

    pub fn add_source_blocked_tag(mut self, tag: GameplayTag) -> Self {
        self.source_blocked_tags.add(tag);
        self
    }

    pub fn add_target_required_tag(mut self, tag: GameplayTag) -> Self {
        self.target_required_tags.add(tag);
        self
    }

    pub fn add_target_blocked_tag(mut self, tag: GameplayTag) -> Self {
        self.target_blocked_tags.add(tag);
        self
    }

    pub fn with_instancing_policy(mut self, policy: InstancingPolicy) -> Self {
        self.instancing_policy = policy;
        self
    }

    pub fn with_retrigger_instanced_ability(mut self, retrigger: bool) -> Self {
        self.retrigger_instanced_ability = retrigger;
        self
    }

    pub fn with_trigger(mut self, trigger: AbilityTrigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Installs the factory producing per-instance behaviors.
    pub fn with_behavior<B: AbilityBehavior>(
        mut self,
        factory: impl Fn() -> B + Send + Sync + 'static,
    ) -> Self {
        self.behavior_factory = Some(Arc::new(move || Box::new(factory())));
        self
    }

    /// Freezes the template for sharing.
    pub fn build(self) -> Arc<AbilityData> {
        Arc::new(self)
    }

    pub(crate) fn make_behavior(&self) -> Box<dyn AbilityBehavior> {
        match &self.behavior_factory {
            Some(factory) => factory(),
            None => Box::new(PassiveBehavior),
        }
    }
}

impl fmt::Debug for AbilityData {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbilityData")
            .field("name", &self.name)
            .field("instancing_policy", &self.instancing_policy)
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}

/// Resource storing shared ability templates by name.
#[derive(bevy::prelude::Resource, Default)]
pub struct AbilityRegistry {
    definitions: std::collections::HashMap<String, Arc<AbilityData>>,
}

impl AbilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a template under its name, replacing any previous one.
    pub fn register(&mut self, definition: Arc<AbilityData>) {
        self.definitions
            .insert(definition.name.clone(), definition);
    }

    pub fn get(&self, name: &str) -> Option<Arc<AbilityData>> {
        self.definitions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Activation failure flags, collected across all gates.
///
/// Every failed check sets its bit; activation succeeds only when the result
/// is [`ActivationFailure::NONE`].
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct ActivationFailure(u16);

impl ActivationFailure {
    pub const NONE: Self = Self(0);
    /// The handle does not resolve to a granted ability.
    pub const INVALID_HANDLER: Self = Self(1);
    pub const INHIBITED: Self = Self(1 << 1);
    pub const OWNER_TAG_REQUIREMENTS: Self = Self(1 << 2);
    pub const SOURCE_TAG_REQUIREMENTS: Self = Self(1 << 3);
    pub const TARGET_TAG_REQUIREMENTS: Self = Self(1 << 4);
    pub const BLOCKED_BY_TAGS: Self = Self(1 << 5);
    pub const INSUFFICIENT_RESOURCES: Self = Self(1 << 6);
    pub const COOLDOWN: Self = Self(1 << 7);
    pub const PERSISTENT_INSTANCE_ACTIVE: Self = Self(1 << 8);
    pub const INVALID_TAG_CONFIGURATION: Self = Self(1 << 9);
    /// Target tag requirements exist but no target was supplied.
    pub const TARGET_TAG_NOT_PRESENT: Self = Self(1 << 10);

    pub fn contains(self, flag: Self) -> bool {
        self.0 & flag.0 == flag.0 && flag.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for ActivationFailure {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ActivationFailure {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for ActivationFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let names = [
            (Self::INVALID_HANDLER, "INVALID_HANDLER"),
            (Self::INHIBITED, "INHIBITED"),
            (Self::OWNER_TAG_REQUIREMENTS, "OWNER_TAG_REQUIREMENTS"),
            (Self::SOURCE_TAG_REQUIREMENTS, "SOURCE_TAG_REQUIREMENTS"),
            (Self::TARGET_TAG_REQUIREMENTS, "TARGET_TAG_REQUIREMENTS"),
            (Self::BLOCKED_BY_TAGS, "BLOCKED_BY_TAGS"),
            (Self::INSUFFICIENT_RESOURCES, "INSUFFICIENT_RESOURCES"),
            (Self::COOLDOWN, "COOLDOWN"),
            (Self::PERSISTENT_INSTANCE_ACTIVE, "PERSISTENT_INSTANCE_ACTIVE"),
            (Self::INVALID_TAG_CONFIGURATION, "INVALID_TAG_CONFIGURATION"),
            (Self::TARGET_TAG_NOT_PRESENT, "TARGET_TAG_NOT_PRESENT"),
        ];
        let mut first = true;
        for (flag, name) in names {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}
