use crate::{
    event::{Commands, Event, EventKind},
    geometry::{Segment, AABB},
    math::{self as m, MathError},
};

pub mod body;
use body::{Body, BodyError};

pub mod body_set;
use body_set::{BodyKey, BodySet};

pub mod collision;
use collision::{CollisionError, CollisionResolver, Side, WorldBounds};

//

/// Tunable constants of the simulation.
///
/// Any field missing when deserializing gets its default value.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
pub struct PhysicsParams {
    /// Maximum speed of any body in distance units per tick.
    pub max_speed: f64,
    /// Number of collisions resolved in one tick before giving up on the rest.
    pub max_resolutions_per_tick: usize,
    /// How far inside the opposite edge a body reappears after crossing a world edge.
    pub wrap_offset: f64,
    /// Whether to skip the exact contact check for bodies
    /// whose swept bounding boxes don't overlap.
    pub broad_phase_culling: bool,
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            max_speed: 5.0,
            max_resolutions_per_tick: 100,
            wrap_offset: 0.001,
            broad_phase_culling: true,
        }
    }
}

impl PhysicsParams {
    /// Check that the parameters describe a working simulation.
    /// An infinite `max_speed` is allowed and disables the speed limit.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.max_speed.is_nan() || self.max_speed < 0.0 {
            return Err(ParamsError::InvalidMaxSpeed(self.max_speed));
        }
        if !self.wrap_offset.is_finite() || self.wrap_offset < 0.0 {
            return Err(ParamsError::InvalidWrapOffset(self.wrap_offset));
        }
        if self.max_resolutions_per_tick == 0 {
            return Err(ParamsError::NoResolutions);
        }
        Ok(())
    }
}

/// Error when [`PhysicsParams`] would make the simulation misbehave.
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq)]
pub enum ParamsError {
    #[error("Max speed must not be negative, got {0}")]
    InvalidMaxSpeed(f64),
    #[error("Wrap offset must be finite and not negative, got {0}")]
    InvalidWrapOffset(f64),
    #[error("At least one collision must be resolvable per tick")]
    NoResolutions,
}

/// What happened during one tick.
#[derive(Clone, Debug, Default)]
pub struct TickReport {
    /// Number of collisions resolved.
    pub resolutions: usize,
    /// Whether collision resolution hit the limit in
    /// [`PhysicsParams::max_resolutions_per_tick`] and left collisions unresolved.
    pub aborted: bool,
    /// Collisions that couldn't be handled. The tick went on without them.
    pub errors: Vec<CollisionError>,
    /// Bodies destroyed by event callbacks and removed at the end of the tick.
    pub destroyed: Vec<BodyKey>,
}

impl TickReport {
    /// True if nothing went wrong.
    pub fn is_clean(&self) -> bool {
        !self.aborted && self.errors.is_empty()
    }
}

/// A world of circular bodies that move, bounce off each other
/// and wrap around at the edges of the world.
#[derive(Debug, Default)]
pub struct PhysicsSystem {
    params: PhysicsParams,
    bodies: BodySet,
    resolver: CollisionResolver,
}

impl PhysicsSystem {
    pub fn new(params: PhysicsParams) -> Result<Self, ParamsError> {
        params.validate()?;
        Ok(Self {
            params,
            bodies: BodySet::new(),
            resolver: CollisionResolver::new(),
        })
    }

    #[inline]
    pub fn params(&self) -> &PhysicsParams {
        &self.params
    }

    /// Replace the simulation parameters, keeping the old ones if the new ones are invalid.
    pub fn set_params(&mut self, params: PhysicsParams) -> Result<(), ParamsError> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    /// Set the world rectangle in a builder-like chain.
    pub fn with_boundaries(mut self, rect: AABB) -> Result<Self, MathError> {
        self.set_boundaries(rect)?;
        Ok(self)
    }

    //
    // bodies
    //

    /// Add a body to the system, giving it the next free id.
    pub fn add(&mut self, body: Body) -> Result<BodyKey, BodyError> {
        body.validate()?;
        let key = self.bodies.insert(body);
        self.resolver.register(key);
        Ok(key)
    }

    /// Take a body out of the system, returning it if it still existed.
    pub fn remove(&mut self, key: BodyKey) -> Option<Body> {
        self.resolver.unregister(key);
        self.bodies.remove(key)
    }

    /// Destroy a body. It stops colliding and its observers are dropped without being called.
    /// Returns whether the body existed.
    ///
    /// Event callbacks can't call this; they use [`Commands::destroy`] instead.
    pub fn destroy(&mut self, key: BodyKey) -> bool {
        let Some(body) = self.bodies.get_mut(key) else {
            return false;
        };
        body.deactivate();
        self.remove(key);
        true
    }

    /// Access a body, if it still exists.
    #[inline]
    pub fn get(&self, key: BodyKey) -> Option<&Body> {
        self.bodies.get(key)
    }

    /// Mutably access a body, if it still exists.
    #[inline]
    pub fn get_mut(&mut self, key: BodyKey) -> Option<&mut Body> {
        self.bodies.get_mut(key)
    }

    #[inline]
    pub fn contains(&self, key: BodyKey) -> bool {
        self.bodies.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyKey, &Body)> + '_ {
        self.bodies.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    //
    // boundaries
    //

    /// Set the rectangle whose edges bodies wrap around, replacing any previous one.
    pub fn set_boundaries(&mut self, rect: AABB) -> Result<(), MathError> {
        rect.validate()?;
        self.resolver.set_world(Some(WorldBounds::new(rect)));
        Ok(())
    }

    /// Add a boundary segment besides the world edges.
    /// Crossing it wraps bodies around the world like crossing an edge does,
    /// so it must be horizontal or vertical.
    pub fn register_boundary(&mut self, segment: Segment) -> Result<(), MathError> {
        m::finite(segment.position, "boundary position")?;
        m::finite(segment.vector, "boundary vector")?;
        self.resolver.add_boundary(segment);
        Ok(())
    }

    /// Remove the world edges and all other boundaries.
    pub fn clear_boundaries(&mut self) {
        self.resolver.clear_boundaries();
    }

    /// The segment of one edge of the world, if the world has edges.
    pub fn boundary(&self, side: Side) -> Option<&Segment> {
        self.resolver.world().map(|world| world.segment(side))
    }

    //
    // events
    //

    /// Subscribe to events happening to a body.
    /// Returns false if the body doesn't exist.
    pub fn add_observer(
        &mut self,
        key: BodyKey,
        kind: EventKind,
        callback: impl FnMut(&Event, &mut Commands) + 'static,
    ) -> bool {
        match self.bodies.get_mut(key) {
            Some(body) => {
                body.add_observer(kind, callback);
                true
            }
            None => false,
        }
    }

    /// Publish an event to a body's observers.
    ///
    /// Everything the observers request is carried out before this returns.
    /// Returns the bodies that got destroyed as a result.
    pub fn notify(&mut self, key: BodyKey, event: Event) -> Vec<BodyKey> {
        let mut commands = Commands::new();
        commands.notify(key, event);
        self.bodies.flush_notifications(&mut commands);
        commands
            .destroy
            .into_iter()
            .filter(|&destroyed| self.destroy(destroyed))
            .collect()
    }

    //
    // simulation
    //

    /// Advance the simulation by `dt` milliseconds.
    ///
    /// Forces are integrated into velocities, collisions within the tick are
    /// resolved in the order they happen and finally every body moves
    /// by whatever is left of its motion.
    pub fn update(&mut self, dt: f64) -> TickReport {
        let _span = tracy_span!("physics tick", "update");

        if !dt.is_finite() || dt < 0.0 {
            log::warn!("Skipping physics tick with invalid timestep {dt}");
            return TickReport::default();
        }

        {
            let _span = tracy_span!("integrate forces", "update");
            for (_, body) in self.bodies.iter_mut() {
                body.update(dt, self.params.max_speed);
            }
        }

        let report = self.resolver.update(&mut self.bodies, &self.params);
        for &key in &report.destroyed {
            self.resolver.unregister(key);
            self.bodies.remove(key);
        }

        for (_, body) in self.bodies.iter_mut() {
            body.advance(self.params.max_speed);
        }

        TickReport {
            resolutions: report.iterations,
            aborted: report.aborted,
            errors: report.errors,
            destroyed: report.destroyed,
        }
    }
}
