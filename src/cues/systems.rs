//! Cue-side Bevy events.

use bevy::prelude::*;

use super::manager::CueEventKind;
use super::notify::CueParameters;
use crate::tags::GameplayTag;

/// Raised for every dispatched cue notification, mirroring the handler
/// call for systems that prefer observing events over registering handlers.
#[derive(Event, Debug, Clone)]
pub struct CueTriggeredEvent {
    pub entity: Entity,
    pub key: GameplayTag,
    pub kind: CueEventKind,
    pub parameters: CueParameters,
}
