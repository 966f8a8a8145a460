//! Granted abilities and their runtime instances.

use std::sync::Arc;

use bevy::prelude::Entity;

use super::definition::{AbilityBehavior, AbilityData, AbilityDeactivationPolicy};
use crate::core::ActiveEffectHandle;

/// Why an ability is present on the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GrantSource {
    /// Sentinel placed by permanent grants (host calls and instant effects).
    /// Never removed, never inhibited; its presence forces the ability
    /// uninhibited.
    Permanent,
    /// Held by a live effect; follows that effect's lifetime and inhibition.
    Effect(ActiveEffectHandle),
}

/// One grant source and the policies it was configured with.
#[derive(Debug, Clone)]
pub(crate) struct Grant {
    pub source: GrantSource,
    pub inhibited: bool,
    pub removal_policy: AbilityDeactivationPolicy,
    pub inhibition_policy: AbilityDeactivationPolicy,
    pub try_activate_on_enable: bool,
}

impl Grant {
    pub fn permanent() -> Self {
        Self {
            source: GrantSource::Permanent,
            inhibited: false,
            removal_policy: AbilityDeactivationPolicy::Ignore,
            inhibition_policy: AbilityDeactivationPolicy::Ignore,
            try_activate_on_enable: false,
        }
    }
}

/// Lifecycle of one activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InstanceState {
    Active,
    Ending,
}

/// Per-activation runtime state.
pub(crate) struct AbilityInstance {
    pub state: InstanceState,
    pub behavior: Box<dyn AbilityBehavior>,
    pub target: Option<Entity>,
    pub applied_activation_owned_tags: bool,
    pub applied_blocked_tags: bool,
}

/// A granted ability: template, level, grant sources and running instances.
pub struct Ability {
    pub(crate) data: Arc<AbilityData>,
    pub(crate) level: i32,
    /// The source entity this grant is keyed under (grant identity is the
    /// `(ability data, source)` pair). `None` for host-side grants.
    pub(crate) source: Option<Entity>,
    pub(crate) grants: Vec<Grant>,
    pub(crate) instances: Vec<AbilityInstance>,
    /// Set when a remove-on-end policy fired while instances were running.
    pub(crate) pending_removal: bool,
}

impl Ability {
    pub(crate) fn new(data: Arc<AbilityData>, level: i32, source: Option<Entity>) -> Self {
        Self {
            data,
            level,
            source,
            grants: Vec::new(),
            instances: Vec::new(),
            pending_removal: false,
        }
    }

    pub fn data(&self) -> &Arc<AbilityData> {
        &self.data
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    /// True while at least one instance is running.
    pub fn is_active(&self) -> bool {
        self.instances
            .iter()
            .any(|instance| instance.state == InstanceState::Active)
    }

    pub(crate) fn has_permanent_grant(&self) -> bool {
        self.grants
            .iter()
            .any(|grant| grant.source == GrantSource::Permanent)
    }

    /// An ability is inhibited only when every grant source is inhibited and
    /// no permanent source is present.
    pub fn is_inhibited(&self) -> bool {
        if self.has_permanent_grant() {
            return false;
        }
        !self.grants.is_empty() && self.grants.iter().all(|grant| grant.inhibited)
    }

    pub(crate) fn grant_count(&self) -> usize {
        self.grants.len()
    }

    pub(crate) fn find_grant_mut(&mut self, source: GrantSource) -> Option<&mut Grant> {
        self.grants.iter_mut().find(|grant| grant.source == source)
    }

    pub(crate) fn active_instance_count(&self) -> usize {
        self.instances
            .iter()
            .filter(|instance| instance.state == InstanceState::Active)
            .count()
    }
}
