//! Forge: a tick-driven gameplay state engine for Bevy.
//!
//! Forge models how numeric character state (attributes), symbolic state
//! (tags), time-bounded mutators (effects) and activatable actions
//! (abilities) interact on a single entity. The host loop advances time;
//! the engine aggregates attribute values, drives effect state machines,
//! emits cue notifications and gates ability activations.
//!
//! # Features
//!
//! - **Attributes**: clamped integers with multi-channel flat/percent/
//!   override aggregation and batched change publication
//! - **Tags**: hierarchical interned tags, base plus reference-counted
//!   modifier ownership, with change-driven gates
//! - **Effects**: instant, duration and infinite effects with periodic
//!   execution, stacking policies and tag-driven inhibition
//! - **Abilities**: grant sources, activation gates with failure flags,
//!   cost/cooldown commits, triggers and behavior callbacks
//! - **Cues**: apply/execute/update/remove notifications parameterized by
//!   effect-derived magnitudes
//!
//! # Quick Start
//!
//! ```
//! use bevy::prelude::*;
//! use bevy_forge::prelude::*;
//!
//! App::new().add_plugins(ForgePlugin);
//! ```
//!
//! All engine state lives in the [`ForgeEntity`] component and is fully
//! usable without a running `App`: every public operation is synchronous
//! and single-threaded per entity, with the Bevy systems acting only as the
//! driver that feeds frame time in and raises notification events.

pub mod abilities;
pub mod attributes;
pub mod core;
pub mod cues;
pub mod effects;
pub mod entity;
pub mod events;
pub mod tags;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::abilities::{
        AbilityBehavior, AbilityData, AbilityDeactivationPolicy, AbilityPlugin, AbilityRegistry,
        AbilityTrigger, ActivationFailure, BehaviorContext, EntityAbilities, GrantAbilityConfig,
        InstancingPolicy, PassiveBehavior,
    };
    pub use crate::attributes::{
        Attribute, AttributeChange, AttributeKey, AttributePlugin, AttributeSet,
    };
    pub use crate::core::events::*;
    pub use crate::core::{
        AbilityHandle, ActiveEffectHandle, AttributeError, ForgeSystemSet, LevelComparison,
    };
    pub use crate::cues::{
        CueData, CueEvent, CueEventKind, CueHandler, CueMagnitude, CueManager, CueParameters,
        CuePlugin,
    };
    pub use crate::effects::{
        AttributeCaptureDefinition, CaptureCalculation, CaptureSource, Curve, DurationPolicy,
        Effect, EffectComponent, EffectData, EffectOwnership, EffectPlugin, EffectRegistry,
        EffectsManager, MagnitudeCalculation, Modifier, ModifierOperation, PeriodInhibitionRemovedPolicy,
        PeriodicData, ScalableFloat, ScalableInt, StackApplicationRefreshPolicy,
        StackApplicationResetPeriodPolicy, StackExpirationPolicy, StackLevelPolicy,
        StackMagnitudePolicy, StackOverflowPolicy, StackPolicy, StackingData,
    };
    pub use crate::entity::{ForgeEntity, ForgeNotification};
    pub use crate::events::{EventManager, EventPayload, SubscriptionId};
    pub use crate::tags::{
        AddBaseTagRequest, EntityTags, GameplayTag, RemoveBaseTagRequest, TagContainer, TagQuery,
        TagRegistry, TagRequirements, TagsPlugin,
    };

    pub use crate::ForgePlugin;
}

use bevy::prelude::*;

/// Umbrella plugin wiring the whole engine into an `App`.
///
/// Combines the attribute, effect, ability and cue plugins and chains the
/// [`ForgeSystemSet`](core::ForgeSystemSet)s in `Update`.
///
/// # Example
///
/// ```
/// use bevy::prelude::*;
/// use bevy_forge::ForgePlugin;
///
/// App::new().add_plugins(ForgePlugin);
/// ```
pub struct ForgePlugin;

impl Plugin for ForgePlugin {
    fn build(&self, app: &mut App) {
        core::configure_forge_system_sets(app);
        app.add_plugins(attributes::AttributePlugin)
            .add_plugins(effects::EffectPlugin)
            .add_plugins(abilities::AbilityPlugin)
            .add_plugins(cues::CuePlugin)
            .add_plugins(tags::TagsPlugin);
    }
}
