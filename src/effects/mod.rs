//! Effects runtime.
//!
//! Effects are declarative change packages applied to an entity: instant
//! executions, duration-bounded mutators or infinite auras. Live effects
//! contribute modifier slots and tags, execute periodically, stack under
//! configurable policies, and can be inhibited by tag gates without being
//! removed.

pub mod active;
pub mod definition;
pub mod effect;
pub mod manager;
pub mod plugin;
pub mod systems;

pub use active::ActiveEffect;
pub use definition::{
    AttributeCaptureDefinition, CaptureCalculation, CaptureSource, Curve, CurveEval,
    DurationPolicy, EffectComponent, EffectData, EffectRegistry, MagnitudeCalculation, Modifier,
    ModifierOperation, PeriodInhibitionRemovedPolicy, PeriodicData, ScalableFloat, ScalableInt,
    StackApplicationRefreshPolicy, StackApplicationResetPeriodPolicy, StackExpirationPolicy,
    StackLevelPolicy, StackMagnitudePolicy, StackOverflowPolicy, StackPolicy, StackingData,
};
pub use effect::{CapturedAttribute, Effect, EffectOwnership};
pub use manager::EffectsManager;
pub use plugin::EffectPlugin;
pub use systems::{
    ApplyEffectRequest, EffectAppliedEvent, EffectRemovedEvent, EffectStackChangedEvent,
    TagsChangedEvent,
};
