//! Attribute system plugin.

use bevy::prelude::*;

use super::systems::publish_pending_changes_system;
use crate::core::ForgeSystemSet;

/// Registers the attribute publish/notify pass.
///
/// # Example
/// ```
/// # use bevy::prelude::*;
/// # use bevy_forge::attributes::AttributePlugin;
/// App::new().add_plugins(AttributePlugin);
/// ```
pub struct AttributePlugin;

impl Plugin for AttributePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<crate::cues::CueManager>().add_systems(
            Update,
            publish_pending_changes_system.in_set(ForgeSystemSet::Notify),
        );
    }
}
