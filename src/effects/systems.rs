//! Effect-side Bevy systems and events.

use std::collections::HashMap;

use bevy::prelude::*;

use super::effect::Effect;
use crate::attributes::AttributeSet;
use crate::core::events::trigger_notifications;
use crate::core::ActiveEffectHandle;
use crate::cues::CueManager;
use crate::entity::ForgeEntity;

/// Request to apply an effect to an entity, for event-driven hosts.
///
/// ```ignore
/// world.trigger(ApplyEffectRequest { target, effect });
/// ```
#[derive(Event, Clone)]
pub struct ApplyEffectRequest {
    pub target: Entity,
    pub effect: Effect,
}

/// Raised after a duration or infinite effect became live.
#[derive(Event, Debug, Clone)]
pub struct EffectAppliedEvent {
    pub entity: Entity,
    pub handle: ActiveEffectHandle,
    pub name: String,
}

/// Raised after a live effect was removed or expired.
#[derive(Event, Debug, Clone)]
pub struct EffectRemovedEvent {
    pub entity: Entity,
    pub name: String,
    /// True for natural expiration.
    pub expired: bool,
}

/// Raised after a repeat application or expiration changed a stack count.
#[derive(Event, Debug, Clone)]
pub struct EffectStackChangedEvent {
    pub entity: Entity,
    pub handle: ActiveEffectHandle,
    pub name: String,
    pub stack_count: u32,
}

/// Raised after an entity's combined tag set changed membership.
#[derive(Event, Debug, Clone)]
pub struct TagsChangedEvent {
    pub entity: Entity,
}

/// Observer applying [`ApplyEffectRequest`]s.
pub fn apply_effect_request_observer(
    request: On<ApplyEffectRequest>,
    mut entities: Query<(Entity, &mut ForgeEntity)>,
    mut cues: ResMut<CueManager>,
    mut commands: Commands,
) {
    let event = request.event();
    let Ok((entity, mut forge)) = entities.get_mut(event.target) else {
        warn!("ApplyEffectRequest on entity without ForgeEntity");
        return;
    };
    forge.apply_effect(event.effect.clone(), &mut cues);
    trigger_notifications(&mut commands, entity, forge.drain_notifications());
}

/// Samples every entity's attributes so live source-side captures observe
/// the counterpart read-only, then feeds the samples back in.
pub fn sample_source_attributes_system(
    mut entities: ParamSet<(Query<&ForgeEntity>, Query<&mut ForgeEntity>)>,
) {
    let snapshots: HashMap<Entity, AttributeSet> = entities
        .p0()
        .iter()
        .map(|forge| (forge.entity(), forge.attributes.clone()))
        .collect();
    if snapshots.len() < 2 {
        return;
    }
    for mut forge in entities.p1().iter_mut() {
        let target = forge.entity();
        for (source, attributes) in &snapshots {
            if *source == target {
                continue;
            }
            forge.effects.refresh_source_samples(*source, attributes);
        }
    }
}

/// Advances every entity's effects by the frame delta.
pub fn update_effects_system(
    time: Res<Time>,
    mut entities: Query<(Entity, &mut ForgeEntity)>,
    mut cues: ResMut<CueManager>,
    mut commands: Commands,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }
    for (entity, mut forge) in entities.iter_mut() {
        forge.update_effects(dt, &mut cues);
        let notifications = forge.drain_notifications();
        if !notifications.is_empty() {
            trigger_notifications(&mut commands, entity, notifications);
        }
    }
}
