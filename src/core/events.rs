//! Centralized event definitions.
//!
//! Re-exports the observer events of every subsystem and hosts the bridge
//! that turns accumulated engine notifications into triggered events.

use bevy::prelude::{Commands, Entity};

pub use crate::abilities::systems::{
    AbilityActivatedEvent, AbilityEndedEvent, TryActivateAbilityRequest,
};
pub use crate::attributes::systems::AttributeChangedEvent;
pub use crate::cues::systems::CueTriggeredEvent;
pub use crate::effects::systems::{
    ApplyEffectRequest, EffectAppliedEvent, EffectRemovedEvent, EffectStackChangedEvent,
    TagsChangedEvent,
};

use crate::entity::ForgeNotification;

/// Re-raises drained engine notifications as observer events.
pub(crate) fn trigger_notifications(
    commands: &mut Commands,
    entity: Entity,
    notifications: Vec<ForgeNotification>,
) {
    for notification in notifications {
        match notification {
            ForgeNotification::AttributeChanged(change) => {
                commands.trigger(AttributeChangedEvent {
                    entity,
                    key: change.key,
                    old_value: change.old_value,
                    new_value: change.new_value,
                });
            }
            ForgeNotification::TagsChanged => {
                commands.trigger(TagsChangedEvent { entity });
            }
            ForgeNotification::EffectApplied { handle, name } => {
                commands.trigger(EffectAppliedEvent {
                    entity,
                    handle,
                    name,
                });
            }
            ForgeNotification::EffectRemoved { name, expired } => {
                commands.trigger(EffectRemovedEvent {
                    entity,
                    name,
                    expired,
                });
            }
            ForgeNotification::EffectStackChanged {
                handle,
                name,
                stack_count,
            } => {
                commands.trigger(EffectStackChangedEvent {
                    entity,
                    handle,
                    name,
                    stack_count,
                });
            }
            ForgeNotification::AbilityActivated { handle } => {
                commands.trigger(AbilityActivatedEvent { entity, handle });
            }
            ForgeNotification::AbilityEnded {
                handle,
                was_canceled,
            } => {
                commands.trigger(AbilityEndedEvent {
                    entity,
                    handle,
                    was_canceled,
                });
            }
            ForgeNotification::CueTriggered(event) => {
                commands.trigger(CueTriggeredEvent {
                    entity,
                    key: event.key,
                    kind: event.kind,
                    parameters: event.parameters,
                });
            }
        }
    }
}
