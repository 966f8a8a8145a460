//! Ability runtime.
//!
//! Abilities are player- or AI-activated actions with costs, cooldowns and
//! tag-gated activation. A granted ability tracks every reason it is present
//! (its grant sources) and stays granted while at least one holds; effects
//! can grant abilities transiently, inhibition follows the granting effects,
//! and triggers activate abilities from events or tag transitions.

pub mod ability;
pub mod definition;
pub mod manager;
pub mod plugin;
pub mod systems;

pub use ability::Ability;
pub use definition::{
    AbilityBehavior, AbilityData, AbilityDeactivationPolicy, AbilityRegistry, AbilityTrigger,
    ActivationFailure, BehaviorContext, GrantAbilityConfig, InstancingPolicy, PassiveBehavior,
};
pub use manager::EntityAbilities;
pub use plugin::AbilityPlugin;
pub use systems::{AbilityActivatedEvent, AbilityEndedEvent, TryActivateAbilityRequest};
