//! Ability system plugin.

use bevy::prelude::*;

use super::definition::AbilityRegistry;
use super::systems::try_activate_ability_observer;
use crate::cues::CueManager;

/// Registers the ability activation observer.
///
/// # Example
/// ```
/// # use bevy::prelude::*;
/// # use bevy_forge::abilities::AbilityPlugin;
/// App::new().add_plugins(AbilityPlugin);
/// ```
pub struct AbilityPlugin;

impl Plugin for AbilityPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CueManager>()
            .init_resource::<AbilityRegistry>()
            .add_observer(try_activate_ability_observer);
    }
}
