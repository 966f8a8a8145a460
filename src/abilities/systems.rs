//! Ability-side Bevy systems and events.

use bevy::prelude::*;

use crate::core::events::trigger_notifications;
use crate::core::AbilityHandle;
use crate::cues::CueManager;
use crate::entity::ForgeEntity;

/// Request to activate a granted ability, for event-driven hosts.
#[derive(Event, Debug, Clone)]
pub struct TryActivateAbilityRequest {
    pub owner: Entity,
    pub handle: AbilityHandle,
}

/// Raised after an ability instance started.
#[derive(Event, Debug, Clone)]
pub struct AbilityActivatedEvent {
    pub entity: Entity,
    pub handle: AbilityHandle,
}

/// Raised after an ability instance ended.
#[derive(Event, Debug, Clone)]
pub struct AbilityEndedEvent {
    pub entity: Entity,
    pub handle: AbilityHandle,
    pub was_canceled: bool,
}

/// Observer applying [`TryActivateAbilityRequest`]s.
///
/// Gate failures are not an error; they surface through the absence of an
/// [`AbilityActivatedEvent`].
pub fn try_activate_ability_observer(
    request: On<TryActivateAbilityRequest>,
    mut entities: Query<(Entity, &mut ForgeEntity)>,
    mut cues: ResMut<CueManager>,
    mut commands: Commands,
) {
    let event = request.event();
    let Ok((entity, mut forge)) = entities.get_mut(event.owner) else {
        warn!("TryActivateAbilityRequest on entity without ForgeEntity");
        return;
    };
    let _ = forge.activate_ability(event.handle, &mut cues);
    trigger_notifications(&mut commands, entity, forge.drain_notifications());
}
