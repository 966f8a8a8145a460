//! Effect definitions.
//!
//! [`EffectData`] is the immutable template of an effect: what it modifies,
//! how long it lasts, how it stacks, which cues it raises and which pluggable
//! components run at its lifecycle hooks. Templates are built once, shared
//! through an `Arc` and never mutated; stacking identity is the template's
//! identity.

use std::sync::Arc;

use crate::abilities::GrantAbilityConfig;
use crate::attributes::AttributeKey;
use crate::core::LevelComparison;
use crate::cues::CueData;
use crate::tags::{TagContainer, TagRequirements};

/// Opaque curve collaborator: maps an input (usually the effect level) to a
/// scaling factor.
pub trait CurveEval: Send + Sync + 'static {
    fn evaluate(&self, x: f32) -> f32;
}

/// A shareable curve handle.
#[derive(Clone)]
pub struct Curve(Arc<dyn CurveEval>);

impl Curve {
    pub fn new(eval: impl CurveEval) -> Self {
        Self(Arc::new(eval))
    }

    /// The identity curve `f(x) = x`.
    pub fn linear() -> Self {
        struct Linear;
        impl CurveEval for Linear {
            fn evaluate(&self, x: f32) -> f32 {
                x
            }
        }
        Self::new(Linear)
    }

    /// Piecewise-linear interpolation over `(input, output)` keys.
    ///
    /// Inputs outside the key range clamp to the first/last output.
    pub fn from_points(mut points: Vec<(f32, f32)>) -> Self {
        struct Points(Vec<(f32, f32)>);
        impl CurveEval for Points {
            fn evaluate(&self, x: f32) -> f32 {
                let keys = &self.0;
                if keys.is_empty() {
                    return 0.0;
                }
                if x <= keys[0].0 {
                    return keys[0].1;
                }
                if x >= keys[keys.len() - 1].0 {
                    return keys[keys.len() - 1].1;
                }
                for window in keys.windows(2) {
                    let (x0, y0) = window[0];
                    let (x1, y1) = window[1];
                    if x <= x1 {
                        let t = if x1 > x0 { (x - x0) / (x1 - x0) } else { 0.0 };
                        return y0 + (y1 - y0) * t;
                    }
                }
                keys[keys.len() - 1].1
            }
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self::new(Points(points))
    }

    pub fn evaluate(&self, x: f32) -> f32 {
        self.0.evaluate(x)
    }
}

impl std::fmt::Debug for Curve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Curve(..)")
    }
}

/// An integer magnitude optionally scaled by a curve evaluated at the effect
/// level.
#[derive(Debug, Clone)]
pub struct ScalableInt {
    pub base: i32,
    pub curve: Option<Curve>,
}

impl ScalableInt {
    pub fn new(base: i32) -> Self {
        Self { base, curve: None }
    }

    pub fn with_curve(mut self, curve: Curve) -> Self {
        self.curve = Some(curve);
        self
    }

    pub fn evaluate(&self, level: i32) -> f32 {
        match &self.curve {
            Some(curve) => self.base as f32 * curve.evaluate(level as f32),
            None => self.base as f32,
        }
    }
}

impl From<i32> for ScalableInt {
    fn from(base: i32) -> Self {
        ScalableInt::new(base)
    }
}

/// A float magnitude (durations, periods) optionally scaled by a curve.
#[derive(Debug, Clone)]
pub struct ScalableFloat {
    pub value: f32,
    pub curve: Option<Curve>,
}

impl ScalableFloat {
    pub fn new(value: f32) -> Self {
        Self { value, curve: None }
    }

    pub fn with_curve(mut self, curve: Curve) -> Self {
        self.curve = Some(curve);
        self
    }

    pub fn evaluate(&self, level: i32) -> f32 {
        match &self.curve {
            Some(curve) => self.value * curve.evaluate(level as f32),
            None => self.value,
        }
    }
}

impl From<f32> for ScalableFloat {
    fn from(value: f32) -> Self {
        ScalableFloat::new(value)
    }
}

/// Which side of the application a captured attribute is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSource {
    /// The entity causing the effect.
    Source,
    /// The entity the effect is applied to.
    Target,
}

/// Which value of the captured attribute enters the magnitude formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureCalculation {
    CurrentValue,
    BaseValue,
    /// `current - base`.
    ModifierValue,
}

/// Identifies an attribute to capture for an attribute-based magnitude.
#[derive(Debug, Clone)]
pub struct AttributeCaptureDefinition {
    pub attribute: AttributeKey,
    pub source: CaptureSource,
    /// Snapshot captures fix the value at application time; live captures
    /// re-evaluate whenever the attribute publishes a change.
    pub snapshot: bool,
}

impl AttributeCaptureDefinition {
    pub fn new(attribute: impl Into<AttributeKey>, source: CaptureSource, snapshot: bool) -> Self {
        Self {
            attribute: attribute.into(),
            source,
            snapshot,
        }
    }
}

/// How a modifier's magnitude is computed.
#[derive(Debug, Clone)]
pub enum MagnitudeCalculation {
    /// A scalar, optionally level-scaled through a curve.
    Scalable(ScalableInt),
    /// Derived from a captured attribute through
    /// `(coefficient * captured + pre_multiply_additive) * post_multiply_additive`.
    AttributeBased {
        capture: AttributeCaptureDefinition,
        calculation: CaptureCalculation,
        coefficient: f32,
        pre_multiply_additive: f32,
        post_multiply_additive: f32,
    },
}

impl MagnitudeCalculation {
    /// A fixed scalar magnitude.
    pub fn scalar(value: i32) -> Self {
        Self::Scalable(ScalableInt::new(value))
    }

    /// A scalar scaled by `curve` at the effect level.
    pub fn scaled(value: i32, curve: Curve) -> Self {
        Self::Scalable(ScalableInt::new(value).with_curve(curve))
    }

    /// An attribute-based magnitude with neutral formula constants.
    pub fn from_attribute(capture: AttributeCaptureDefinition) -> Self {
        Self::AttributeBased {
            capture,
            calculation: CaptureCalculation::CurrentValue,
            coefficient: 1.0,
            pre_multiply_additive: 0.0,
            post_multiply_additive: 1.0,
        }
    }
}

/// The operation a modifier performs on its attribute channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierOperation {
    /// Add to the channel's flat sum.
    FlatAdd,
    /// Add percent points to the channel's percent sum (`25` = +25%).
    PercentAdd,
    /// Override the channel output.
    Override,
}

/// One attribute modification carried by an effect.
#[derive(Debug, Clone)]
pub struct Modifier {
    pub attribute: AttributeKey,
    pub operation: ModifierOperation,
    pub magnitude: MagnitudeCalculation,
    pub channel: usize,
}

impl Modifier {
    pub fn new(
        attribute: impl Into<AttributeKey>,
        operation: ModifierOperation,
        magnitude: MagnitudeCalculation,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            operation,
            magnitude,
            channel: 0,
        }
    }

    pub fn with_channel(mut self, channel: usize) -> Self {
        self.channel = channel;
        self
    }
}

/// How long an effect lives once applied.
#[derive(Debug, Clone)]
pub enum DurationPolicy {
    /// Executes once as a permanent base-value change, leaves nothing behind.
    Instant,
    /// Lives for the evaluated duration, then expires.
    HasDuration(ScalableFloat),
    /// Lives until explicitly removed.
    Infinite,
}

impl DurationPolicy {
    pub fn is_instant(&self) -> bool {
        matches!(self, DurationPolicy::Instant)
    }
}

/// What happens to the period timer when an inhibited effect resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodInhibitionRemovedPolicy {
    /// The accumulated phase is kept; duration keeps running while inhibited.
    NeverReset,
    /// The timer restarts from zero on resume.
    ResetPeriod,
    /// One execution fires immediately on resume, then the timer restarts.
    ExecuteAndResetPeriod,
}

/// Periodic execution configuration.
#[derive(Debug, Clone)]
pub struct PeriodicData {
    pub period: ScalableFloat,
    /// Execute once immediately on application (before the first period
    /// elapses).
    pub execute_on_application: bool,
    pub period_inhibition_removed_policy: PeriodInhibitionRemovedPolicy,
}

impl PeriodicData {
    pub fn new(period: impl Into<ScalableFloat>) -> Self {
        Self {
            period: period.into(),
            execute_on_application: false,
            period_inhibition_removed_policy: PeriodInhibitionRemovedPolicy::ResetPeriod,
        }
    }

    pub fn with_execute_on_application(mut self, execute: bool) -> Self {
        self.execute_on_application = execute;
        self
    }

    pub fn with_inhibition_removed_policy(
        mut self,
        policy: PeriodInhibitionRemovedPolicy,
    ) -> Self {
        self.period_inhibition_removed_policy = policy;
        self
    }
}

/// Whether repeat applications from different sources share one stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackPolicy {
    /// Applications merge only when they come from the same source.
    AggregateBySource,
    /// Applications merge regardless of source.
    AggregateByTarget,
}

/// How levels combine when applications stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackLevelPolicy {
    /// One stack across levels; the level-override flags decide updates.
    AggregateLevels,
    /// Applications at a different level are refused.
    SegregateLevels,
}

/// How per-application magnitudes fold into the stack's contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackMagnitudePolicy {
    /// Every stack contributes.
    Sum,
    /// The largest application wins.
    MaxMagnitude,
    /// The most recent application wins.
    Override,
}

/// What a successful application at the stack limit does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOverflowPolicy {
    /// The application is refused outright.
    DenyApplication,
    /// The application succeeds without raising the count.
    AllowApplication,
}

/// What expiration of the duration does to the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackExpirationPolicy {
    /// The whole effect is removed.
    ClearEntireStack,
    /// One stack is removed and the duration refreshed; removal happens at
    /// zero stacks.
    RemoveSingleStackAndRefreshDuration,
}

/// Whether a successful repeat application refreshes the duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackApplicationRefreshPolicy {
    NeverRefresh,
    RefreshOnSuccessfulApplication,
}

/// Whether a successful repeat application restarts the period timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackApplicationResetPeriodPolicy {
    NeverReset,
    ResetOnSuccessfulApplication,
}

/// Full stacking configuration.
#[derive(Debug, Clone)]
pub struct StackingData {
    pub limit: u32,
    pub initial_stacks: u32,
    pub policy: StackPolicy,
    pub magnitude_policy: StackMagnitudePolicy,
    pub overflow_policy: StackOverflowPolicy,
    pub expiration_policy: StackExpirationPolicy,
    pub level_policy: StackLevelPolicy,
    /// Incoming levels whose ordering matches one of these flags are denied.
    pub level_denial: LevelComparison,
    /// Incoming levels whose ordering matches one of these flags replace the
    /// stack's level. The `HIGHER` default reproduces keep-max aggregation.
    pub level_override: LevelComparison,
    pub application_refresh_policy: StackApplicationRefreshPolicy,
    pub application_reset_period_policy: StackApplicationResetPeriodPolicy,
}

impl StackingData {
    pub fn new(limit: u32) -> Self {
        debug_assert!(limit >= 1, "stack limit must be at least 1");
        Self {
            limit: limit.max(1),
            initial_stacks: 1,
            policy: StackPolicy::AggregateByTarget,
            magnitude_policy: StackMagnitudePolicy::Sum,
            overflow_policy: StackOverflowPolicy::DenyApplication,
            expiration_policy: StackExpirationPolicy::ClearEntireStack,
            level_policy: StackLevelPolicy::AggregateLevels,
            level_denial: LevelComparison::NONE,
            level_override: LevelComparison::HIGHER,
            application_refresh_policy: StackApplicationRefreshPolicy::RefreshOnSuccessfulApplication,
            application_reset_period_policy: StackApplicationResetPeriodPolicy::NeverReset,
        }
    }

    pub fn with_initial_stacks(mut self, stacks: u32) -> Self {
        self.initial_stacks = stacks.clamp(1, self.limit);
        self
    }

    pub fn with_policy(mut self, policy: StackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_magnitude_policy(mut self, policy: StackMagnitudePolicy) -> Self {
        self.magnitude_policy = policy;
        self
    }

    pub fn with_overflow_policy(mut self, policy: StackOverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    pub fn with_expiration_policy(mut self, policy: StackExpirationPolicy) -> Self {
        self.expiration_policy = policy;
        self
    }

    pub fn with_level_policy(mut self, policy: StackLevelPolicy) -> Self {
        self.level_policy = policy;
        self
    }

    pub fn with_level_denial(mut self, denial: LevelComparison) -> Self {
        self.level_denial = denial;
        self
    }

    pub fn with_level_override(mut self, level_override: LevelComparison) -> Self {
        self.level_override = level_override;
        self
    }

    pub fn with_application_refresh_policy(
        mut self,
        policy: StackApplicationRefreshPolicy,
    ) -> Self {
        self.application_refresh_policy = policy;
        self
    }

    pub fn with_application_reset_period_policy(
        mut self,
        policy: StackApplicationResetPeriodPolicy,
    ) -> Self {
        self.application_reset_period_policy = policy;
        self
    }
}

/// Pluggable effect behaviors invoked at runtime hook points.
#[derive(Debug, Clone)]
pub enum EffectComponent {
    /// Tags contributed to the target while the effect is live and not
    /// inhibited.
    ModifierTags(TagContainer),
    /// Tag gates on the target: `application` is checked when applying,
    /// `ongoing` drives inhibition while live, `removal` removes the effect
    /// when met.
    TargetTagRequirements {
        application: TagRequirements,
        ongoing: TagRequirements,
        removal: TagRequirements,
    },
    /// Abilities granted while the effect is live (permanently for instant
    /// effects).
    GrantAbility(Vec<GrantAbilityConfig>),
}

/// Immutable effect template.
///
/// Built once through the `with_*`/`add_*` methods and shared via
/// [`build`](EffectData::build); the returned `Arc` identity is the stacking
/// identity.
///
/// # Example
/// ```
/// use bevy_forge::effects::{EffectData, Modifier, ModifierOperation, MagnitudeCalculation};
///
/// let burn = EffectData::new("Burn")
///     .with_duration(10.0)
///     .with_period(1.0)
///     .add_modifier(Modifier::new(
///         "Health",
///         ModifierOperation::FlatAdd,
///         MagnitudeCalculation::scalar(-5),
///     ))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct EffectData {
    pub name: String,
    pub duration: DurationPolicy,
    pub modifiers: Vec<Modifier>,
    pub periodic: Option<PeriodicData>,
    pub stacking: Option<StackingData>,
    /// Fix the level at application time; later level changes are ignored.
    pub snapshot_level: bool,
    /// Suppress cues of an event where no modifier applied successfully.
    pub require_modifier_success_to_trigger_cue: bool,
    /// Suppress `on_update` cues caused purely by stack-count changes.
    pub suppress_stacking_cues: bool,
    pub cues: Vec<CueData>,
    pub components: Vec<EffectComponent>,
}

impl EffectData {
    /// Creates an instant effect template with no modifiers.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            duration: DurationPolicy::Instant,
            modifiers: Vec::new(),
            periodic: None,
            stacking: None,
            snapshot_level: false,
            require_modifier_success_to_trigger_cue: false,
            suppress_stacking_cues: false,
            cues: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Gives the effect a limited duration in seconds.
    pub fn with_duration(mut self, duration: impl Into<ScalableFloat>) -> Self {
        self.duration = DurationPolicy::HasDuration(duration.into());
        self
    }

    /// Makes the effect last until explicitly removed.
    pub fn infinite(mut self) -> Self {
        self.duration = DurationPolicy::Infinite;
        self
    }

    /// Adds periodic execution with the given period in seconds.
    pub fn with_period(self, period: impl Into<ScalableFloat>) -> Self {
        self.with_periodic(PeriodicData::new(period))
    }

    pub fn with_periodic(mut self, periodic: PeriodicData) -> Self {
        self.periodic = Some(periodic);
        self
    }

    pub fn add_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub fn with_stacking(mut self, stacking: StackingData) -> Self {
        self.stacking = Some(stacking);
        self
    }

    pub fn with_snapshot_level(mut self, snapshot: bool) -> Self {
        self.snapshot_level = snapshot;
        self
    }

    pub fn with_require_modifier_success_to_trigger_cue(mut self, require: bool) -> Self {
        self.require_modifier_success_to_trigger_cue = require;
        self
    }

    pub fn with_suppress_stacking_cues(mut self, suppress: bool) -> Self {
        self.suppress_stacking_cues = suppress;
        self
    }

    pub fn add_cue(mut self, cue: CueData) -> Self {
        self.cues.push(cue);
        self
    }

    pub fn add_component(mut self, component: EffectComponent) -> Self {
        self.components.push(component);
        self
    }

    /// Shorthand for a [`EffectComponent::ModifierTags`] component.
    pub fn with_modifier_tags(self, tags: TagContainer) -> Self {
        self.add_component(EffectComponent::ModifierTags(tags))
    }

    /// Shorthand for a [`EffectComponent::TargetTagRequirements`] component
    /// with only an ongoing gate.
    pub fn with_ongoing_requirements(self, ongoing: TagRequirements) -> Self {
        self.add_component(EffectComponent::TargetTagRequirements {
            application: TagRequirements::new(),
            ongoing,
            removal: TagRequirements::new(),
        })
    }

    /// Freezes the template for sharing.
    pub fn build(self) -> Arc<EffectData> {
        Arc::new(self)
    }

    /// The modifier tags contributed by all components.
    pub fn modifier_tags(&self) -> impl Iterator<Item = &TagContainer> {
        self.components.iter().filter_map(|component| match component {
            EffectComponent::ModifierTags(tags) => Some(tags),
            _ => None,
        })
    }

    /// True when any component grants `tag` while the effect is live.
    pub fn grants_tag(&self, tag: &crate::tags::GameplayTag) -> bool {
        self.modifier_tags().any(|tags| tags.has_tag_exact(tag))
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic.is_some()
    }
}

/// Resource storing shared effect templates by name.
///
/// Purely a convenience for hosts that wire effects up by identifier; the
/// engine itself only ever sees `Arc<EffectData>` values.
#[derive(bevy::prelude::Resource, Default)]
pub struct EffectRegistry {
    definitions: std::collections::HashMap<String, Arc<EffectData>>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a template under its name, replacing any previous one.
    pub fn register(&mut self, definition: Arc<EffectData>) {
        self.definitions
            .insert(definition.name.clone(), definition);
    }

    pub fn get(&self, name: &str) -> Option<Arc<EffectData>> {
        self.definitions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
