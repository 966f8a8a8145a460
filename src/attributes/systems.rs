//! Attribute-side Bevy systems and events.

use bevy::prelude::*;

use super::AttributeKey;
use crate::core::events::trigger_notifications;
use crate::cues::CueManager;
use crate::entity::ForgeEntity;

/// Raised when an attribute publishes a changed value.
#[derive(Event, Debug, Clone)]
pub struct AttributeChangedEvent {
    /// The entity that owns the attribute.
    pub entity: Entity,
    pub key: AttributeKey,
    pub old_value: i32,
    pub new_value: i32,
}

impl AttributeChangedEvent {
    pub fn delta(&self) -> i32 {
        self.new_value - self.old_value
    }
}

/// Flushes host-side mutations that bypassed an engine operation (direct
/// writes to `attributes` or `tags`) and re-raises accumulated
/// notifications as observer events.
pub fn publish_pending_changes_system(
    mut entities: Query<(Entity, &mut ForgeEntity)>,
    mut cues: ResMut<CueManager>,
    mut commands: Commands,
) {
    for (entity, mut forge) in entities.iter_mut() {
        forge.flush(&mut cues);
        let notifications = forge.drain_notifications();
        if !notifications.is_empty() {
            trigger_notifications(&mut commands, entity, notifications);
        }
    }
}
