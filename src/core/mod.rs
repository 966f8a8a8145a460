//! Shared engine primitives: handles, errors, comparison flags, system
//! sets and the event hub.

pub mod comparison;
pub mod errors;
pub mod events;
pub mod handles;
pub mod system_sets;

pub use comparison::LevelComparison;
pub use errors::AttributeError;
pub use handles::{AbilityHandle, ActiveEffectHandle};
pub use system_sets::{configure_forge_system_sets, ForgeSystemSet};

pub(crate) use handles::{Arena, RawHandle};
