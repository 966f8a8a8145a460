//! Per-entity event pub/sub keyed by tag.
//!
//! Used for host notifications and event-triggered abilities. Matching is by
//! exact tag; hierarchy is deliberately not expanded here.

use std::collections::VecDeque;

use bevy::prelude::Entity;

use crate::tags::GameplayTag;

/// Data carried by a raised event.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EventPayload {
    pub magnitude: f32,
    pub source: Option<Entity>,
}

impl EventPayload {
    pub fn new(magnitude: f32) -> Self {
        Self {
            magnitude,
            source: None,
        }
    }

    pub fn with_source(mut self, source: Entity) -> Self {
        self.source = Some(source);
        self
    }
}

/// Identifies one subscription for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    tag: GameplayTag,
    callback: Box<dyn FnMut(&GameplayTag, &EventPayload) + Send + Sync>,
}

/// Tag-keyed pub/sub for one entity.
///
/// Delivery follows registration order. Raising an event from inside a
/// handler is permitted: the nested raise is queued and delivered after the
/// current dispatch completes, so handlers never observe partial delivery.
#[derive(Default)]
pub struct EventManager {
    subscriptions: Vec<Subscription>,
    next_id: u64,
    pending: VecDeque<(GameplayTag, EventPayload)>,
    dispatching: bool,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `callback` to events raised with exactly `tag`.
    pub fn subscribe(
        &mut self,
        tag: GameplayTag,
        callback: impl FnMut(&GameplayTag, &EventPayload) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription {
            id,
            tag,
            callback: Box::new(callback),
        });
        id
    }

    /// Removes a subscription. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscriptions.retain(|sub| sub.id != id);
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Raises an event, invoking matching subscribers in registration order.
    ///
    /// Re-entrant raises are queued behind the event currently being
    /// delivered.
    pub fn raise(&mut self, tag: GameplayTag, payload: EventPayload) {
        self.pending.push_back((tag, payload));
        if self.dispatching {
            return;
        }
        self.dispatching = true;
        while let Some((tag, payload)) = self.pending.pop_front() {
            let mut index = 0;
            while index < self.subscriptions.len() {
                if self.subscriptions[index].tag == tag {
                    (self.subscriptions[index].callback)(&tag, &payload);
                }
                index += 1;
            }
        }
        self.dispatching = false;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn tag(name: &str) -> GameplayTag {
        GameplayTag::new(name)
    }

    #[test]
    fn delivery_in_registration_order_exact_match_only() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut events = EventManager::new();

        let first = log.clone();
        events.subscribe(tag("Event.Hit"), move |_, payload| {
            first.lock().unwrap().push(("first", payload.magnitude));
        });
        let second = log.clone();
        events.subscribe(tag("Event.Hit"), move |_, payload| {
            second.lock().unwrap().push(("second", payload.magnitude));
        });
        let other = log.clone();
        events.subscribe(tag("Event"), move |_, _| {
            other.lock().unwrap().push(("parent", 0.0));
        });

        events.raise(tag("Event.Hit"), EventPayload::new(7.0));

        // "Event" does not receive the child tag: no hierarchy expansion.
        assert_eq!(
            *log.lock().unwrap(),
            vec![("first", 7.0), ("second", 7.0)]
        );
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let count = Arc::new(Mutex::new(0));
        let mut events = EventManager::new();
        let counter = count.clone();
        let id = events.subscribe(tag("E"), move |_, _| {
            *counter.lock().unwrap() += 1;
        });

        events.unsubscribe(id);
        events.unsubscribe(id);
        events.raise(tag("E"), EventPayload::default());
        assert_eq!(*count.lock().unwrap(), 0);
    }

    #[test]
    fn reentrant_raise_is_queued() {
        // The nested raise must be delivered after the outer dispatch, so the
        // log reads outer, outer, inner instead of interleaving.
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut events = EventManager::new();

        let outer_log = log.clone();
        events.subscribe(tag("Outer"), move |_, _| {
            outer_log.lock().unwrap().push("outer-a");
        });
        let outer_log = log.clone();
        events.subscribe(tag("Outer"), move |_, _| {
            outer_log.lock().unwrap().push("outer-b");
        });
        let inner_log = log.clone();
        events.subscribe(tag("Inner"), move |_, _| {
            inner_log.lock().unwrap().push("inner");
        });

        // Simulate a handler raising: queue the nested event between the two
        // outer deliveries by pre-loading pending.
        events.pending.push_back((tag("Outer"), EventPayload::default()));
        events.pending.push_back((tag("Inner"), EventPayload::default()));
        events.raise(tag("Outer"), EventPayload::default());

        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer-a", "outer-b", "outer-a", "outer-b", "inner"]
        );
    }
}
