//! Cue handler registry and dispatch.

use std::collections::HashMap;

use bevy::prelude::{Entity, Resource};

use super::notify::{CueHandler, CueParameters};
use crate::tags::GameplayTag;

/// The lifecycle transition a queued cue notification describes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CueEventKind {
    /// A duration or infinite effect became live.
    Apply,
    /// An instant application or periodic execution.
    Execute,
    /// A live cue's magnitude changed.
    Update,
    /// The owning effect went away. `interrupted` is false only for natural
    /// expiration.
    Remove { interrupted: bool },
}

/// One queued cue notification, produced by the effects runtime and drained
/// at the end of each public operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CueEvent {
    pub key: GameplayTag,
    pub kind: CueEventKind,
    pub parameters: CueParameters,
}

/// Registry mapping cue keys to host handlers.
///
/// Lives as a Bevy resource under the plugin, but is a plain value usable
/// without a `World`. Dispatch order follows the queue, which the effects
/// runtime fills in cue-declaration order per lifecycle transition.
#[derive(Resource, Default)]
pub struct CueManager {
    handlers: HashMap<GameplayTag, Box<dyn CueHandler>>,
}

impl CueManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under `key`, replacing any previous one.
    pub fn register(&mut self, key: GameplayTag, handler: impl CueHandler) {
        self.handlers.insert(key, Box::new(handler));
    }

    /// Removes the handler under `key`. Unknown keys are ignored.
    pub fn unregister(&mut self, key: &GameplayTag) {
        self.handlers.remove(key);
    }

    pub fn has_handler(&self, key: &GameplayTag) -> bool {
        self.handlers.contains_key(key)
    }

    /// Dispatches queued notifications for `target`.
    ///
    /// Events whose key has no registered handler are skipped silently.
    pub fn dispatch(&self, target: Entity, events: &[CueEvent]) {
        for event in events {
            let Some(handler) = self.handlers.get(&event.key) else {
                continue;
            };
            match event.kind {
                CueEventKind::Apply => handler.on_apply(target, &event.parameters),
                CueEventKind::Execute => handler.on_execute(target, &event.parameters),
                CueEventKind::Update => handler.on_update(target, &event.parameters),
                CueEventKind::Remove { interrupted } => {
                    handler.on_remove(target, &event.parameters, interrupted)
                }
            }
        }
    }
}
