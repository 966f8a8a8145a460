//! Plugin wiring: the engine driven through a Bevy `App` with manual time
//! advancement, observing notification events through observers.

use std::time::Duration;

use bevy::prelude::*;
use bevy_forge::prelude::*;

#[derive(Resource, Default)]
struct ReceivedAttributeChanges(Vec<AttributeChangedEvent>);

#[derive(Resource, Default)]
struct ReceivedEffectEvents {
    applied: Vec<EffectAppliedEvent>,
    removed: Vec<EffectRemovedEvent>,
}

fn setup_app() -> App {
    let mut app = App::new();
    app.add_plugins(ForgePlugin);
    app.init_resource::<ReceivedAttributeChanges>();
    app.init_resource::<ReceivedEffectEvents>();
    app.add_observer(
        |ev: On<AttributeChangedEvent>, mut received: ResMut<ReceivedAttributeChanges>| {
            received.0.push(ev.event().clone());
        },
    );
    app.add_observer(
        |ev: On<EffectAppliedEvent>, mut received: ResMut<ReceivedEffectEvents>| {
            received.applied.push(ev.event().clone());
        },
    );
    app.add_observer(
        |ev: On<EffectRemovedEvent>, mut received: ResMut<ReceivedEffectEvents>| {
            received.removed.push(ev.event().clone());
        },
    );
    app
}

fn spawn_actor(app: &mut App) -> Entity {
    let entity = app.world_mut().spawn_empty().id();
    let forge = ForgeEntity::new(
        entity,
        AttributeSet::new().with_attribute_bounds("Health", 100, 0, 100),
    );
    app.world_mut().entity_mut(entity).insert(forge);
    entity
}

fn advance(app: &mut App, seconds: f32) {
    app.world_mut()
        .resource_mut::<Time>()
        .advance_by(Duration::from_secs_f32(seconds));
    app.update();
}

fn health_of(app: &mut App, entity: Entity) -> i32 {
    app.world()
        .entity(entity)
        .get::<ForgeEntity>()
        .unwrap()
        .attributes
        .current_value(&"Health".into())
        .unwrap()
}

#[test]
fn apply_effect_request_drives_the_component() {
    let mut app = setup_app();
    let entity = spawn_actor(&mut app);

    let poison = EffectData::new("Poison")
        .with_duration(3.0)
        .with_periodic(PeriodicData::new(1.0).with_execute_on_application(true))
        .add_modifier(Modifier::new(
            "Health",
            ModifierOperation::FlatAdd,
            MagnitudeCalculation::scalar(-10),
        ))
        .build();

    app.world_mut().trigger(ApplyEffectRequest {
        target: entity,
        effect: Effect::new(poison, EffectOwnership::self_applied(entity)),
    });
    app.update();

    // The on-application execution landed.
    assert_eq!(health_of(&mut app, entity), 90);
    let applied = &app.world().resource::<ReceivedEffectEvents>().applied;
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].name, "Poison");

    advance(&mut app, 1.0);
    assert_eq!(health_of(&mut app, entity), 80);

    advance(&mut app, 1.0);
    assert_eq!(health_of(&mut app, entity), 70);

    // The third tick also expires the effect.
    advance(&mut app, 1.0);
    assert_eq!(health_of(&mut app, entity), 60);
    let removed = &app.world().resource::<ReceivedEffectEvents>().removed;
    assert_eq!(removed.len(), 1);
    assert!(removed[0].expired);

    let changes = &app.world().resource::<ReceivedAttributeChanges>().0;
    assert!(!changes.is_empty());
    assert!(changes.iter().all(|change| change.key == "Health".into()));
}

#[test]
fn direct_component_mutation_publishes_through_the_notify_pass() {
    let mut app = setup_app();
    let entity = spawn_actor(&mut app);
    app.update();

    {
        let mut forge = app.world_mut().get_mut::<ForgeEntity>(entity).unwrap();
        forge
            .attributes
            .attribute_mut(&"Health".into())
            .unwrap()
            .execute_flat(-25);
    }
    app.update();

    assert_eq!(health_of(&mut app, entity), 75);
    let changes = &app.world().resource::<ReceivedAttributeChanges>().0;
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].old_value, 100);
    assert_eq!(changes[0].new_value, 75);
}

#[test]
fn cue_handlers_registered_on_the_resource_fire() {
    use std::sync::{Arc, Mutex};

    let mut app = setup_app();
    let entity = spawn_actor(&mut app);

    let seen: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
    struct Sink(Arc<Mutex<Vec<f32>>>);
    impl CueHandler for Sink {
        fn on_execute(&self, _target: Entity, params: &CueParameters) {
            self.0.lock().unwrap().push(params.magnitude);
        }
    }
    let cue_key = GameplayTag::new("GameplayCue.Hit");
    app.world_mut()
        .resource_mut::<CueManager>()
        .register(cue_key.clone(), Sink(seen.clone()));

    let hit = EffectData::new("Hit")
        .add_modifier(Modifier::new(
            "Health",
            ModifierOperation::FlatAdd,
            MagnitudeCalculation::scalar(-7),
        ))
        .add_cue(CueData::new(
            cue_key,
            CueMagnitude::AttributeValueChange("Health".into()),
            -10.0,
            0.0,
        ))
        .build();
    app.world_mut().trigger(ApplyEffectRequest {
        target: entity,
        effect: Effect::new(hit, EffectOwnership::self_applied(entity)),
    });
    app.update();

    assert_eq!(*seen.lock().unwrap(), vec![-7.0]);
    assert_eq!(health_of(&mut app, entity), 93);
}
