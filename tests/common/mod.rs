//! Shared helpers for the integration suites.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use bevy::ecs::world::World;
use bevy::prelude::Entity;
use bevy_forge::prelude::*;

/// One recorded cue notification.
#[derive(Debug, Clone, PartialEq)]
pub struct CueRecord {
    pub key: GameplayTag,
    pub kind: &'static str,
    pub magnitude: f32,
    pub normalized: f32,
    /// For remove records: true when the removal was not natural expiry.
    pub interrupted: bool,
}

/// Cue handler that records every notification for assertions.
#[derive(Clone, Default)]
pub struct RecordingCueHandler {
    records: Arc<Mutex<Vec<CueRecord>>>,
}

impl RecordingCueHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers this recorder for `key` on the manager.
    pub fn register(&self, cues: &mut CueManager, key: GameplayTag) {
        cues.register(
            key.clone(),
            KeyedRecorder {
                key,
                records: self.records.clone(),
            },
        );
    }

    pub fn records(&self) -> Vec<CueRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn records_for(&self, key: &GameplayTag) -> Vec<CueRecord> {
        self.records()
            .into_iter()
            .filter(|record| &record.key == key)
            .collect()
    }

    pub fn count(&self, key: &GameplayTag, kind: &str) -> usize {
        self.records_for(key)
            .iter()
            .filter(|record| record.kind == kind)
            .count()
    }

    pub fn last(&self, key: &GameplayTag, kind: &str) -> Option<CueRecord> {
        self.records_for(key)
            .into_iter()
            .filter(|record| record.kind == kind)
            .next_back()
    }

    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }
}

/// Per-key handler feeding the shared record list.
struct KeyedRecorder {
    key: GameplayTag,
    records: Arc<Mutex<Vec<CueRecord>>>,
}

impl KeyedRecorder {
    fn push(&self, kind: &'static str, params: &CueParameters, interrupted: bool) {
        self.records.lock().unwrap().push(CueRecord {
            key: self.key.clone(),
            kind,
            magnitude: params.magnitude,
            normalized: params.normalized_magnitude,
            interrupted,
        });
    }
}

impl CueHandler for KeyedRecorder {
    fn on_apply(&self, _target: Entity, params: &CueParameters) {
        self.push("apply", params, false);
    }

    fn on_execute(&self, _target: Entity, params: &CueParameters) {
        self.push("execute", params, false);
    }

    fn on_update(&self, _target: Entity, params: &CueParameters) {
        self.push("update", params, false);
    }

    fn on_remove(&self, _target: Entity, params: &CueParameters, interrupted: bool) {
        self.push("remove", params, interrupted);
    }
}

/// Spawns a detached entity id for tests that run without an `App`.
pub fn test_entity() -> Entity {
    World::new().spawn_empty().id()
}

/// A fresh entity with the given attribute set.
pub fn forge_entity(attributes: AttributeSet) -> ForgeEntity {
    ForgeEntity::new(test_entity(), attributes)
}

/// Shorthand for a self-applied effect on `forge`'s entity.
pub fn self_effect(forge: &ForgeEntity, data: std::sync::Arc<EffectData>) -> Effect {
    Effect::new(data, EffectOwnership::self_applied(forge.entity()))
}
