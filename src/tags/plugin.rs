//! Tag system plugin.

use bevy::prelude::*;

use super::systems::{add_base_tag_observer, remove_base_tag_observer};
use crate::cues::CueManager;

/// Registers the base-tag request observers.
///
/// # Example
/// ```
/// # use bevy::prelude::*;
/// # use bevy_forge::tags::TagsPlugin;
/// App::new().add_plugins(TagsPlugin);
/// ```
pub struct TagsPlugin;

impl Plugin for TagsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CueManager>()
            .add_observer(add_base_tag_observer)
            .add_observer(remove_base_tag_observer);
    }
}
