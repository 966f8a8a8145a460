//! End-to-end lifecycle scenarios driving the whole engine through the
//! public entity surface, asserting cue notifications as
//! `(magnitude, normalized, kind)` sequences.

mod common;

use bevy_forge::prelude::*;
use common::{forge_entity, RecordingCueHandler, self_effect};

fn cue_tag(name: &str) -> GameplayTag {
    GameplayTag::new(name)
}

#[test]
fn instant_effect_executes_cues_and_scales_with_level() {
    let mut forge = forge_entity(AttributeSet::new().with_attribute("A1", 0));
    let mut cues = CueManager::new();
    let recorder = RecordingCueHandler::new();
    let cue0 = cue_tag("GameplayCue.Value");
    let cue1 = cue_tag("GameplayCue.Level");
    recorder.register(&mut cues, cue0.clone());
    recorder.register(&mut cues, cue1.clone());

    let data = EffectData::new("InstantBoost")
        .add_modifier(Modifier::new(
            "A1",
            ModifierOperation::FlatAdd,
            MagnitudeCalculation::scaled(3, Curve::linear()),
        ))
        .add_cue(CueData::new(
            cue0.clone(),
            CueMagnitude::AttributeValueChange("A1".into()),
            0.0,
            10.0,
        ))
        .add_cue(CueData::new(
            cue1.clone(),
            CueMagnitude::EffectLevel,
            0.0,
            5.0,
        ))
        .build();

    let mut effect = self_effect(&forge, data);
    assert!(forge.apply_effect(effect.clone(), &mut cues).is_none());

    let value = recorder.last(&cue0, "execute").unwrap();
    assert_eq!(value.magnitude, 3.0);
    assert_eq!(value.normalized, 0.3);
    let level = recorder.last(&cue1, "execute").unwrap();
    assert_eq!(level.magnitude, 1.0);
    assert_eq!(level.normalized, 0.2);
    // Instant executions never raise apply/remove notifications.
    assert_eq!(recorder.count(&cue0, "apply"), 0);
    assert_eq!(recorder.count(&cue0, "remove"), 0);

    effect.set_level(2);
    forge.apply_effect(effect, &mut cues);

    let value = recorder.last(&cue0, "execute").unwrap();
    assert_eq!(value.magnitude, 6.0);
    assert_eq!(value.normalized, 0.6);
    let level = recorder.last(&cue1, "execute").unwrap();
    assert_eq!(level.magnitude, 2.0);
    assert_eq!(level.normalized, 0.4);

    // Both executions mutated the base permanently: 3 + 6.
    assert_eq!(forge.attributes.current_value(&"A1".into()), Some(9));
}

#[test]
fn infinite_effect_applies_then_removes_with_matching_magnitudes() {
    let mut forge = forge_entity(AttributeSet::new().with_attribute("A1", 0));
    let mut cues = CueManager::new();
    let recorder = RecordingCueHandler::new();
    let cue0 = cue_tag("GameplayCue.Value");
    let cue1 = cue_tag("GameplayCue.Level");
    recorder.register(&mut cues, cue0.clone());
    recorder.register(&mut cues, cue1.clone());

    let data = EffectData::new("Aura")
        .infinite()
        .add_modifier(Modifier::new(
            "A1",
            ModifierOperation::FlatAdd,
            MagnitudeCalculation::scalar(5),
        ))
        .add_cue(CueData::new(
            cue0.clone(),
            CueMagnitude::AttributeValueChange("A1".into()),
            0.0,
            10.0,
        ))
        .add_cue(CueData::new(
            cue1.clone(),
            CueMagnitude::EffectLevel,
            0.0,
            5.0,
        ))
        .build();

    let effect = self_effect(&forge, data);
    let handle = forge.apply_effect(effect, &mut cues).unwrap();
    assert_eq!(forge.attributes.current_value(&"A1".into()), Some(5));

    let value = recorder.last(&cue0, "apply").unwrap();
    assert_eq!((value.magnitude, value.normalized), (5.0, 0.5));
    let level = recorder.last(&cue1, "apply").unwrap();
    assert_eq!((level.magnitude, level.normalized), (1.0, 0.2));

    assert!(forge.unapply_effect(handle, &mut cues));
    assert_eq!(forge.attributes.current_value(&"A1".into()), Some(0));

    let value = recorder.last(&cue0, "remove").unwrap();
    assert_eq!((value.magnitude, value.normalized), (5.0, 0.5));
    assert!(value.interrupted);
    let level = recorder.last(&cue1, "remove").unwrap();
    assert_eq!((level.magnitude, level.normalized), (1.0, 0.2));
}

#[test]
fn periodic_effect_applies_before_first_execution() {
    let mut forge = forge_entity(AttributeSet::new().with_attribute("A1", 0));
    let mut cues = CueManager::new();
    let recorder = RecordingCueHandler::new();
    let cue0 = cue_tag("GameplayCue.Tick");
    recorder.register(&mut cues, cue0.clone());

    let data = EffectData::new("Regen")
        .with_duration(10.0)
        .with_periodic(PeriodicData::new(1.0).with_execute_on_application(true))
        .add_modifier(Modifier::new(
            "A1",
            ModifierOperation::FlatAdd,
            MagnitudeCalculation::scalar(1),
        ))
        .add_cue(CueData::new(
            cue0.clone(),
            CueMagnitude::AttributeValueChange("A1".into()),
            0.0,
            10.0,
        ))
        .build();

    forge.apply_effect(self_effect(&forge, data), &mut cues).unwrap();

    let records = recorder.records_for(&cue0);
    let apply_index = records.iter().position(|r| r.kind == "apply");
    let execute_index = records.iter().position(|r| r.kind == "execute");
    assert!(apply_index.is_some(), "apply cue must fire");
    assert!(execute_index.is_some(), "execute cue must fire");
    assert!(apply_index < execute_index, "apply must precede execute");

    // On application no modifier has executed yet.
    assert_eq!(records[apply_index.unwrap()].magnitude, 0.0);
    assert_eq!(records[execute_index.unwrap()].magnitude, 1.0);
    assert_eq!(forge.attributes.current_value(&"A1".into()), Some(1));
}

#[test]
fn periodic_effect_executes_once_per_period() {
    let mut forge = forge_entity(AttributeSet::new().with_attribute("A1", 0));
    let mut cues = CueManager::new();
    let recorder = RecordingCueHandler::new();
    let cue0 = cue_tag("GameplayCue.Tick");
    recorder.register(&mut cues, cue0.clone());

    let data = EffectData::new("Regen")
        .with_duration(10.0)
        .with_periodic(PeriodicData::new(1.0).with_execute_on_application(true))
        .add_modifier(Modifier::new(
            "A1",
            ModifierOperation::FlatAdd,
            MagnitudeCalculation::scalar(1),
        ))
        .add_cue(CueData::new(
            cue0.clone(),
            CueMagnitude::AttributeValueChange("A1".into()),
            0.0,
            10.0,
        ))
        .build();

    forge.apply_effect(self_effect(&forge, data), &mut cues).unwrap();
    recorder.clear();

    forge.update_effects(5.0, &mut cues);

    assert_eq!(recorder.count(&cue0, "execute"), 5);
    for record in recorder.records_for(&cue0) {
        if record.kind == "execute" {
            assert_eq!(record.magnitude, 1.0);
            assert_eq!(record.normalized, 0.1);
        }
    }
    // One execution on application plus five periodic ones.
    assert_eq!(forge.attributes.current_value(&"A1".into()), Some(6));
}

#[test]
fn stacking_saturates_at_limit_and_unwinds_one_stack_per_expiry() {
    let mut forge = forge_entity(AttributeSet::new().with_attribute("A1", 0));
    let mut cues = CueManager::new();
    let recorder = RecordingCueHandler::new();
    let stack_cue = cue_tag("GameplayCue.Stacks");
    recorder.register(&mut cues, stack_cue.clone());

    let data = EffectData::new("Venom")
        .with_duration(4.0)
        .with_stacking(
            StackingData::new(3)
                .with_initial_stacks(1)
                .with_overflow_policy(StackOverflowPolicy::AllowApplication)
                .with_expiration_policy(
                    StackExpirationPolicy::RemoveSingleStackAndRefreshDuration,
                ),
        )
        .add_modifier(Modifier::new(
            "A1",
            ModifierOperation::FlatAdd,
            MagnitudeCalculation::scalar(2),
        ))
        .add_cue(CueData::new(
            stack_cue.clone(),
            CueMagnitude::StackCount,
            0.0,
            3.0,
        ))
        .build();

    let handle = forge
        .apply_effect(self_effect(&forge, data.clone()), &mut cues)
        .unwrap();
    assert_eq!(forge.effects.get(handle).unwrap().stack_count(), 1);

    let second = forge
        .apply_effect(self_effect(&forge, data.clone()), &mut cues)
        .unwrap();
    assert_eq!(second, handle);
    assert_eq!(forge.effects.get(handle).unwrap().stack_count(), 2);

    forge.apply_effect(self_effect(&forge, data.clone()), &mut cues);
    assert_eq!(forge.effects.get(handle).unwrap().stack_count(), 3);
    assert_eq!(forge.attributes.current_value(&"A1".into()), Some(6));

    // Fourth application is allowed but the count saturates.
    let fourth = forge.apply_effect(self_effect(&forge, data.clone()), &mut cues);
    assert_eq!(fourth, Some(handle));
    assert_eq!(forge.effects.get(handle).unwrap().stack_count(), 3);

    // Each expiry removes one stack and refreshes the duration.
    forge.update_effects(4.0, &mut cues);
    assert_eq!(forge.effects.get(handle).unwrap().stack_count(), 2);
    assert_eq!(forge.attributes.current_value(&"A1".into()), Some(4));

    forge.update_effects(4.0, &mut cues);
    assert_eq!(forge.effects.get(handle).unwrap().stack_count(), 1);

    forge.update_effects(4.0, &mut cues);
    assert!(forge.effects.get(handle).is_none());
    assert_eq!(forge.attributes.current_value(&"A1".into()), Some(0));

    let removes: Vec<_> = recorder
        .records_for(&stack_cue)
        .into_iter()
        .filter(|r| r.kind == "remove")
        .collect();
    assert_eq!(removes.len(), 1);
    assert!(!removes[0].interrupted);
}

#[test]
fn ability_commits_cost_and_cooldown_then_recovers() {
    let mut forge = forge_entity(AttributeSet::new().with_attribute_bounds("A90", 100, 0, 100));
    let mut cues = CueManager::new();
    let cooldown_tag = GameplayTag::new("simple.tag");

    let cost = EffectData::new("EnergyCost")
        .add_modifier(Modifier::new(
            "A90",
            ModifierOperation::FlatAdd,
            MagnitudeCalculation::scalar(-1),
        ))
        .build();
    let cooldown = EffectData::new("SimpleCooldown")
        .with_duration(3.0)
        .with_modifier_tags(TagContainer::from_tags([cooldown_tag.clone()]))
        .build();
    let ability = AbilityData::new("SimpleAbility")
        .with_cost_effect(cost)
        .add_cooldown_effect(cooldown)
        .build();

    let handle = forge.grant_ability_permanently(ability, 1, &mut cues);
    assert!(forge.ability_is_valid(handle));

    let failure = forge.activate_ability(handle, &mut cues);
    assert!(failure.is_empty());
    assert!(forge.ability_is_active(handle));

    forge.commit_ability(handle, &mut cues);
    assert_eq!(forge.attributes.current_value(&"A90".into()), Some(99));
    assert!(forge.remaining_cooldown(handle, &cooldown_tag) > 0.0);
    assert!(forge.combined_tags().has_tag_exact(&cooldown_tag));

    forge.update_effects(1.0, &mut cues);
    let failure = forge.activate_ability(handle, &mut cues);
    assert!(failure.contains(ActivationFailure::COOLDOWN));

    forge.update_effects(2.0, &mut cues);
    assert_eq!(forge.remaining_cooldown(handle, &cooldown_tag), 0.0);
    assert!(!forge.combined_tags().has_tag_exact(&cooldown_tag));

    let failure = forge.activate_ability(handle, &mut cues);
    assert!(failure.is_empty());
}
