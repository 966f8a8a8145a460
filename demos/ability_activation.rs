//! Ability Activation Demo
//!
//! A fireball with a mana cost and a cooldown, a stun that blocks attack
//! abilities while it runs, and a riposte triggered by a parry event.

use bevy::ecs::world::World;
use bevy_forge::prelude::*;

struct FireballBehavior;

impl AbilityBehavior for FireballBehavior {
    fn on_started(&mut self, ctx: &mut BehaviorContext<'_>) {
        // Damage arrives through a queued instant effect, applied after the
        // activation finishes.
        let blast = EffectData::new("FireballBlast")
            .add_modifier(Modifier::new(
                "Health",
                ModifierOperation::FlatAdd,
                MagnitudeCalculation::scaled(-8, Curve::linear()),
            ))
            .build();
        let owner = ctx.owner;
        ctx.apply_effect(Effect::new(blast, EffectOwnership::self_applied(owner)).with_level(ctx.level));
        println!("  fireball launched at level {}", ctx.level);
        ctx.end_ability();
    }

    fn on_ended(&mut self, ctx: &mut BehaviorContext<'_>) {
        println!("  fireball resolved (canceled: {})", ctx.was_canceled);
    }
}

fn main() {
    let entity = World::new().spawn_empty().id();
    let mut forge = ForgeEntity::new(
        entity,
        AttributeSet::new()
            .with_attribute_bounds("Health", 100, 0, 100)
            .with_attribute_bounds("Mana", 30, 0, 30),
    );
    let mut cues = CueManager::new();

    // ------------------------------------------------------------------
    // Fireball: cost, cooldown, behavior
    // ------------------------------------------------------------------

    let mana_cost = EffectData::new("FireballCost")
        .add_modifier(Modifier::new(
            "Mana",
            ModifierOperation::FlatAdd,
            MagnitudeCalculation::scalar(-20),
        ))
        .build();
    let cooldown = EffectData::new("FireballCooldown")
        .with_duration(5.0)
        .with_modifier_tags(TagContainer::from_tags([GameplayTag::new(
            "Cooldown.Fireball",
        )]))
        .build();
    let fireball = AbilityData::new("Fireball")
        .add_ability_tag(GameplayTag::new("Ability.Attack.Fire"))
        .add_activation_blocked_tag(GameplayTag::new("State.Stunned"))
        .with_cost_effect(mana_cost)
        .add_cooldown_effect(cooldown)
        .with_behavior(|| FireballBehavior)
        .build();

    let fireball = forge.grant_ability_permanently(fireball, 2, &mut cues);

    println!("== first cast ==");
    let failure = forge.activate_ability(fireball, &mut cues);
    println!("activation: {failure:?}");
    forge.commit_ability(fireball, &mut cues);
    println!(
        "mana {}  health {}  cooldown {:.1}s",
        forge.attributes.current_value(&"Mana".into()).unwrap(),
        forge.attributes.current_value(&"Health".into()).unwrap(),
        forge.remaining_cooldown(fireball, &GameplayTag::new("Cooldown.Fireball")),
    );

    println!("\n== second cast is gated ==");
    let failure = forge.activate_ability(fireball, &mut cues);
    println!("activation: {failure:?}");

    println!("\n== five seconds later ==");
    forge.update_effects(5.0, &mut cues);
    let failure = forge.activate_ability(fireball, &mut cues);
    println!("activation: {failure:?} (mana is spent, cooldown is clear)");

    // ------------------------------------------------------------------
    // A stun tag blocks the attack outright
    // ------------------------------------------------------------------

    println!("\n== stunned ==");
    forge.add_base_tag(GameplayTag::new("State.Stunned"), &mut cues);
    let failure = forge.activate_ability(fireball, &mut cues);
    println!("activation: {failure:?}");
    forge.remove_base_tag(&GameplayTag::new("State.Stunned"), &mut cues);

    // ------------------------------------------------------------------
    // Event-triggered riposte
    // ------------------------------------------------------------------

    let riposte = AbilityData::new("Riposte")
        .add_ability_tag(GameplayTag::new("Ability.Attack.Counter"))
        .with_trigger(AbilityTrigger::Event(GameplayTag::new("Event.Parried")))
        .build();
    let riposte = forge.grant_ability_permanently(riposte, 1, &mut cues);

    println!("\n== a parry lands ==");
    forge.raise_event(
        GameplayTag::new("Event.Parried"),
        EventPayload::new(12.0),
        &mut cues,
    );
    println!("riposte active: {}", forge.ability_is_active(riposte));
}
