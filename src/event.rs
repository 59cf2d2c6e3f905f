//! Typed publish/subscribe notifications attached to physics bodies.
//!
//! Game code subscribes to an [`EventKind`] on a body and gets called with the
//! matching [`Event`]. Callbacks run while the physics system is in the middle of
//! a tick, so they can't touch the system directly. Instead they get a [`Commands`]
//! buffer through which they can destroy bodies or publish further events;
//! these requests are carried out as soon as the callback returns.

use crate::{geometry::Motion, physics::body::BodyId, physics::body_set::BodyKey};

/// The kinds of event a body can be observed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Produced by the collision resolver when this body bounces off another one.
    Collision,
    /// Published by game logic when a body takes damage but survives.
    Damage,
    /// Published by game logic when a body takes fatal damage.
    Death,
}

#[derive(Clone, Copy, Debug)]
pub enum Event {
    Collision(CollisionEvent),
    Damage { old_hp: f64, new_hp: f64 },
    Death { old_hp: f64, new_hp: f64 },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Collision(_) => EventKind::Collision,
            Event::Damage { .. } => EventKind::Damage,
            Event::Death { .. } => EventKind::Death,
        }
    }
}

/// Information about a resolved body-body collision, from the point of view
/// of the body receiving the event.
#[derive(Clone, Copy, Debug)]
pub struct CollisionEvent {
    /// The body that was hit.
    pub other: BodyKey,
    pub other_id: BodyId,
    pub other_mass: f64,
    /// This body's motion right before the collision.
    pub before: Motion,
    /// This body's motion right after the collision.
    pub after: Motion,
}

type Observer = Box<dyn FnMut(&Event, &mut Commands)>;

/// The set of callbacks subscribed to a body's events.
#[derive(Default)]
pub struct Observers {
    observers: Vec<(EventKind, Observer)>,
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.observers.iter().map(|(kind, _)| kind))
            .finish()
    }
}

impl Observers {
    /// Subscribe a callback to one kind of event.
    /// Callbacks are called in the order they were added.
    pub fn add(&mut self, kind: EventKind, callback: impl FnMut(&Event, &mut Commands) + 'static) {
        self.observers.push((kind, Box::new(callback)));
    }

    /// Call every callback subscribed to the kind of the given event.
    pub fn notify(&mut self, event: &Event, commands: &mut Commands) {
        let kind = event.kind();
        for (_, observer) in self.observers.iter_mut().filter(|(k, _)| *k == kind) {
            observer(event, commands);
        }
    }

    pub fn clear(&mut self) {
        self.observers.clear();
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

/// Requests made by event callbacks, carried out after the callback returns.
#[derive(Debug, Default)]
pub struct Commands {
    pub(crate) destroy: Vec<BodyKey>,
    pub(crate) notifications: std::collections::VecDeque<(BodyKey, Event)>,
}

impl Commands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Destroy a body.
    ///
    /// Within a tick the body stops colliding immediately
    /// and is removed from the system once the tick completes.
    pub fn destroy(&mut self, body: BodyKey) {
        if !self.destroy.contains(&body) {
            self.destroy.push(body);
        }
    }

    /// Publish an event to a body's observers.
    pub fn notify(&mut self, body: BodyKey, event: Event) {
        self.notifications.push_back((body, event));
    }

    pub fn is_empty(&self) -> bool {
        self.destroy.is_empty() && self.notifications.is_empty()
    }
}
