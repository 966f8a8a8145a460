//! Cue system plugin.

use bevy::prelude::*;

use super::manager::CueManager;

/// Registers the cue handler registry resource.
///
/// # Example
/// ```
/// # use bevy::prelude::*;
/// # use bevy_forge::cues::CuePlugin;
/// App::new().add_plugins(CuePlugin);
/// ```
pub struct CuePlugin;

impl Plugin for CuePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CueManager>();
    }
}
