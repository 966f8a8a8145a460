//! Cue notifier.
//!
//! Cues are the host-visible feedback channel of the engine: every effect
//! lifecycle transition emits apply/execute/update/remove notifications
//! parameterized by a magnitude derived from the owning effect. Hosts
//! register [`CueHandler`]s on the [`CueManager`] or observe
//! [`CueTriggeredEvent`]s.

pub mod manager;
pub mod notify;
pub mod plugin;
pub mod systems;

pub use manager::{CueEvent, CueEventKind, CueManager};
pub use notify::{CueData, CueHandler, CueMagnitude, CueParameters};
pub use plugin::CuePlugin;
pub use systems::CueTriggeredEvent;
