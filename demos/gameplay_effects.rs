//! Gameplay Effects Demo
//!
//! A poison that stacks up to three times, ticks every second and unwinds
//! one stack per expiry, plus a haste aura inhibited while the bearer is
//! rooted. Cue handlers print what a real game would render.

use bevy::ecs::world::World;
use bevy::prelude::Entity;
use bevy_forge::prelude::*;

struct PrintCue(&'static str);

impl CueHandler for PrintCue {
    fn on_apply(&self, _target: Entity, params: &CueParameters) {
        println!("  [cue] {} applied (magnitude {})", self.0, params.magnitude);
    }

    fn on_execute(&self, _target: Entity, params: &CueParameters) {
        println!("  [cue] {} ticks for {}", self.0, params.magnitude);
    }

    fn on_update(&self, _target: Entity, params: &CueParameters) {
        println!("  [cue] {} now at {}", self.0, params.magnitude);
    }

    fn on_remove(&self, _target: Entity, _params: &CueParameters, interrupted: bool) {
        println!("  [cue] {} faded (interrupted: {interrupted})", self.0);
    }
}

fn main() {
    let entity = World::new().spawn_empty().id();
    let mut forge = ForgeEntity::new(
        entity,
        AttributeSet::new()
            .with_attribute_bounds("Health", 60, 0, 60)
            .with_attribute("Speed", 10),
    );
    let mut cues = CueManager::new();
    cues.register(GameplayTag::new("GameplayCue.Poison"), PrintCue("poison"));
    cues.register(GameplayTag::new("GameplayCue.Haste"), PrintCue("haste"));

    // ------------------------------------------------------------------
    // A stacking damage-over-time effect
    // ------------------------------------------------------------------

    let poison = EffectData::new("Poison")
        .with_duration(3.0)
        .with_period(1.0)
        .with_stacking(
            StackingData::new(3)
                .with_overflow_policy(StackOverflowPolicy::AllowApplication)
                .with_expiration_policy(StackExpirationPolicy::RemoveSingleStackAndRefreshDuration),
        )
        .add_modifier(Modifier::new(
            "Health",
            ModifierOperation::FlatAdd,
            MagnitudeCalculation::scalar(-2),
        ))
        .add_cue(CueData::new(
            GameplayTag::new("GameplayCue.Poison"),
            CueMagnitude::AttributeValueChange("Health".into()),
            -10.0,
            0.0,
        ))
        .build();

    println!("== three poison applications ==");
    let handle = forge
        .apply_effect(
            Effect::new(poison.clone(), EffectOwnership::self_applied(entity)),
            &mut cues,
        )
        .unwrap();
    for _ in 0..2 {
        forge.apply_effect(
            Effect::new(poison.clone(), EffectOwnership::self_applied(entity)),
            &mut cues,
        );
    }
    println!(
        "stacks: {}, health: {}",
        forge.effects.get(handle).unwrap().stack_count(),
        forge.attributes.current_value(&"Health".into()).unwrap()
    );

    println!("\n== four seconds pass ==");
    for second in 1..=4 {
        forge.update_effects(1.0, &mut cues);
        println!(
            "t={second}s  health {}  stacks {}",
            forge.attributes.current_value(&"Health".into()).unwrap(),
            forge
                .effects
                .get(handle)
                .map(|active| active.stack_count())
                .unwrap_or(0)
        );
    }

    // ------------------------------------------------------------------
    // An aura inhibited by a tag gate
    // ------------------------------------------------------------------

    let haste = EffectData::new("Haste")
        .infinite()
        .with_ongoing_requirements(
            TagRequirements::new().ignore_tag(GameplayTag::new("State.Rooted")),
        )
        .add_modifier(Modifier::new(
            "Speed",
            ModifierOperation::FlatAdd,
            MagnitudeCalculation::scalar(5),
        ))
        .add_cue(CueData::new(
            GameplayTag::new("GameplayCue.Haste"),
            CueMagnitude::AttributeCurrentValue("Speed".into()),
            0.0,
            20.0,
        ))
        .build();

    println!("\n== haste aura ==");
    forge.apply_effect(
        Effect::new(haste, EffectOwnership::self_applied(entity)),
        &mut cues,
    );
    println!(
        "speed: {}",
        forge.attributes.current_value(&"Speed".into()).unwrap()
    );

    println!("\n== rooted: the aura is inhibited, not removed ==");
    forge.add_base_tag(GameplayTag::new("State.Rooted"), &mut cues);
    println!(
        "speed: {}",
        forge.attributes.current_value(&"Speed".into()).unwrap()
    );

    println!("\n== root expires: the aura resumes ==");
    forge.remove_base_tag(&GameplayTag::new("State.Rooted"), &mut cues);
    println!(
        "speed: {}",
        forge.attributes.current_value(&"Speed".into()).unwrap()
    );
}
