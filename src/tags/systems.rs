//! Tag-side Bevy events and observers.

use bevy::prelude::*;

use super::GameplayTag;
use crate::core::events::trigger_notifications;
use crate::cues::CueManager;
use crate::entity::ForgeEntity;

/// Request to add a permanent base tag, for event-driven hosts.
#[derive(Event, Debug, Clone)]
pub struct AddBaseTagRequest {
    pub target: Entity,
    pub tag: GameplayTag,
}

/// Request to remove a permanent base tag.
#[derive(Event, Debug, Clone)]
pub struct RemoveBaseTagRequest {
    pub target: Entity,
    pub tag: GameplayTag,
}

/// Observer applying [`AddBaseTagRequest`]s.
pub fn add_base_tag_observer(
    request: On<AddBaseTagRequest>,
    mut entities: Query<(Entity, &mut ForgeEntity)>,
    mut cues: ResMut<CueManager>,
    mut commands: Commands,
) {
    let event = request.event();
    let Ok((entity, mut forge)) = entities.get_mut(event.target) else {
        warn!("AddBaseTagRequest on entity without ForgeEntity");
        return;
    };
    forge.add_base_tag(event.tag.clone(), &mut cues);
    trigger_notifications(&mut commands, entity, forge.drain_notifications());
}

/// Observer applying [`RemoveBaseTagRequest`]s.
pub fn remove_base_tag_observer(
    request: On<RemoveBaseTagRequest>,
    mut entities: Query<(Entity, &mut ForgeEntity)>,
    mut cues: ResMut<CueManager>,
    mut commands: Commands,
) {
    let event = request.event();
    let Ok((entity, mut forge)) = entities.get_mut(event.target) else {
        warn!("RemoveBaseTagRequest on entity without ForgeEntity");
        return;
    };
    forge.remove_base_tag(&event.tag, &mut cues);
    trigger_notifications(&mut commands, entity, forge.drain_notifications());
}
