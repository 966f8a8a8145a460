//! System sets ordering the engine's per-frame work.

use bevy::prelude::*;

/// Execution order of the engine systems within a frame.
///
/// Source sampling runs first so live cross-entity captures observe last
/// frame's published values, the effect tick runs second, and the notify
/// pass flushes host-side mutations and re-raises notifications last.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForgeSystemSet {
    /// Read-only sampling of counterpart entities for live source captures.
    SampleSources,
    /// Effect duration/period advancement and expiration.
    Effects,
    /// Publish pending changes and raise notification events.
    Notify,
}

/// Chains the engine sets in the `Update` schedule.
pub fn configure_forge_system_sets(app: &mut App) {
    app.configure_sets(
        Update,
        (
            ForgeSystemSet::SampleSources,
            ForgeSystemSet::Effects,
            ForgeSystemSet::Notify,
        )
            .chain(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_is_valid() {
        let mut app = App::new();
        configure_forge_system_sets(&mut app);
    }
}
