//! Effect system plugin.

use bevy::prelude::*;

use super::definition::EffectRegistry;
use super::systems::{
    apply_effect_request_observer, sample_source_attributes_system, update_effects_system,
};
use crate::core::ForgeSystemSet;
use crate::cues::CueManager;

/// Registers the effect tick pipeline and the apply-request observer.
///
/// # Example
/// ```
/// # use bevy::prelude::*;
/// # use bevy_forge::effects::EffectPlugin;
/// App::new().add_plugins(EffectPlugin);
/// ```
pub struct EffectPlugin;

impl Plugin for EffectPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CueManager>()
            .init_resource::<EffectRegistry>()
            .init_resource::<Time>()
            .add_observer(apply_effect_request_observer)
            .add_systems(
                Update,
                sample_source_attributes_system.in_set(ForgeSystemSet::SampleSources),
            )
            .add_systems(
                Update,
                update_effects_system.in_set(ForgeSystemSet::Effects),
            );
    }
}
