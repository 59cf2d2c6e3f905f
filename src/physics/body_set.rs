use super::body::{Body, IdAllocator};
use crate::event::{Commands, Event};

use thunderdome as td;

/// Key type to look up a body stored in the physics system.
///
/// Keys stay valid for as long as the body exists and are never reused
/// for a different body, so holding on to a stale key is harmless.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BodyKey(pub(crate) td::Index);

impl BodyKey {
    /// Get the underlying [`thunderdome::Index`][thunderdome::Index] of this key.
    /// Useful for creating your own mappings from bodies to other things
    /// such as game objects.
    #[inline]
    pub fn index(&self) -> td::Index {
        self.0
    }
}

/// Storage for the bodies of a physics system.
#[derive(Debug, Default)]
pub struct BodySet {
    bodies: td::Arena<Body>,
    ids: IdAllocator,
}

impl BodySet {
    #[inline]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Access a [`Body`][super::Body], if it still exists.
    #[inline]
    pub fn get(&self, key: BodyKey) -> Option<&Body> {
        self.bodies.get(key.0)
    }

    /// Mutably access a [`Body`][super::Body], if it still exists.
    #[inline]
    pub fn get_mut(&mut self, key: BodyKey) -> Option<&mut Body> {
        self.bodies.get_mut(key.0)
    }

    /// Mutably access two different bodies at once.
    #[inline]
    pub(crate) fn get2_mut(
        &mut self,
        a: BodyKey,
        b: BodyKey,
    ) -> (Option<&mut Body>, Option<&mut Body>) {
        self.bodies.get2_mut(a.0, b.0)
    }

    #[inline]
    pub fn contains(&self, key: BodyKey) -> bool {
        self.bodies.contains(key.0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Iterate over all bodies in insertion slot order.
    pub fn iter(&self) -> impl Iterator<Item = (BodyKey, &Body)> + '_ {
        self.bodies.iter().map(|(idx, body)| (BodyKey(idx), body))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyKey, &mut Body)> + '_ {
        self.bodies.iter_mut().map(|(idx, body)| (BodyKey(idx), body))
    }

    /// Insert a body, giving it the next free id.
    pub(crate) fn insert(&mut self, mut body: Body) -> BodyKey {
        body.id = self.ids.next();
        BodyKey(self.bodies.insert(body))
    }

    /// Remove a body, returning it if it still existed.
    #[inline]
    pub(crate) fn remove(&mut self, key: BodyKey) -> Option<Body> {
        self.bodies.remove(key.0)
    }

    /// Deliver an event to one body's observers.
    pub(crate) fn dispatch(&mut self, key: BodyKey, event: &Event, commands: &mut Commands) {
        let Some(body) = self.bodies.get_mut(key.0) else {
            log::trace!("dropping {:?} event for a body that no longer exists", event.kind());
            return;
        };
        if body.observers.is_empty() {
            return;
        }
        // observers are taken out for the duration of the call
        // so that callbacks can't observe the set in a half-borrowed state
        let mut observers = std::mem::take(&mut body.observers);
        observers.notify(event, commands);
        if let Some(body) = self.bodies.get_mut(key.0) {
            body.observers = observers;
        }
    }

    /// Deliver every event that callbacks have published so far,
    /// including ones published while doing so.
    pub(crate) fn flush_notifications(&mut self, commands: &mut Commands) {
        while let Some((key, event)) = commands.notifications.pop_front() {
            self.dispatch(key, &event, commands);
        }
    }
}
