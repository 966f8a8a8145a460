//! Basic Attributes Demo
//!
//! Shows the attribute aggregator on its own: channels, flat and percent
//! modifiers, overrides, clamping and batched publication. Everything runs
//! on plain engine types; no `App` is required.

use bevy::ecs::world::World;
use bevy_forge::prelude::*;

fn main() {
    let entity = World::new().spawn_empty().id();
    let mut forge = ForgeEntity::new(
        entity,
        AttributeSet::new()
            .with_channel_count(2)
            .with_attribute_bounds("Health", 100, 0, 100)
            .with_attribute_bounds("Damage", 50, 0, 1000)
            .with_attribute("Strength", 10),
    );
    let mut cues = CueManager::new();

    println!("== initial values ==");
    print_attributes(&forge);

    // ------------------------------------------------------------------
    // Temporary modifiers through effects
    // ------------------------------------------------------------------

    let war_banner = EffectData::new("WarBanner")
        .infinite()
        .add_modifier(Modifier::new(
            "Damage",
            ModifierOperation::FlatAdd,
            MagnitudeCalculation::scalar(25),
        ))
        .add_modifier(
            // Channel 1 multiplies the result of channel 0.
            Modifier::new(
                "Damage",
                ModifierOperation::PercentAdd,
                MagnitudeCalculation::scalar(20),
            )
            .with_channel(1),
        )
        .build();

    let banner = forge
        .apply_effect(
            Effect::new(war_banner, EffectOwnership::self_applied(entity)),
            &mut cues,
        )
        .expect("infinite effect yields a handle");

    println!("\n== war banner raised: (50 + 25) * 120% ==");
    print_attributes(&forge);

    // ------------------------------------------------------------------
    // Permanent base mutation through an instant effect
    // ------------------------------------------------------------------

    let training = EffectData::new("Training")
        .add_modifier(Modifier::new(
            "Strength",
            ModifierOperation::FlatAdd,
            MagnitudeCalculation::scalar(5),
        ))
        .build();
    forge.apply_effect(
        Effect::new(training, EffectOwnership::self_applied(entity)),
        &mut cues,
    );

    println!("\n== after training (permanent base change) ==");
    print_attributes(&forge);

    // ------------------------------------------------------------------
    // Clamping: damage cannot push health below its minimum
    // ------------------------------------------------------------------

    let heavy_hit = EffectData::new("HeavyHit")
        .add_modifier(Modifier::new(
            "Health",
            ModifierOperation::FlatAdd,
            MagnitudeCalculation::scalar(-250),
        ))
        .build();
    forge.apply_effect(
        Effect::new(heavy_hit, EffectOwnership::self_applied(entity)),
        &mut cues,
    );

    println!("\n== after a 250 damage hit (clamped at 0) ==");
    print_attributes(&forge);

    // ------------------------------------------------------------------
    // Withdrawing the banner restores the exact pre-apply value
    // ------------------------------------------------------------------

    forge.unapply_effect(banner, &mut cues);
    println!("\n== banner lowered ==");
    print_attributes(&forge);

    for notification in forge.drain_notifications() {
        if let ForgeNotification::AttributeChanged(change) = notification {
            println!(
                "note: {} moved {} -> {}",
                change.key, change.old_value, change.new_value
            );
        }
    }
}

fn print_attributes(forge: &ForgeEntity) {
    for key in ["Health", "Damage", "Strength"] {
        let attribute = forge.attributes.attribute(&key.into()).unwrap();
        println!(
            "  {key:>8}: current {:>4} (base {:>4})",
            attribute.current_value(),
            attribute.base_value()
        );
    }
}
