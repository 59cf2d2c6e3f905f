use crate::{
    event::{Commands, Event, EventKind, Observers},
    geometry::Motion,
    math::{self as m, Angle, MathError, Vec2},
};

/// Sequential identifier given to a body when it's added to a physics system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyId(pub(crate) u64);

impl BodyId {
    /// Placeholder id of a body that hasn't been added to a system yet.
    pub const UNASSIGNED: BodyId = BodyId(u64::MAX);

    #[inline]
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == Self::UNASSIGNED {
            write!(f, "PhysicsModel_unassigned")
        } else {
            write!(f, "PhysicsModel_{}", self.0)
        }
    }
}

/// Hands out body ids in increasing order, starting from zero.
#[derive(Clone, Debug, Default)]
pub(crate) struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn next(&mut self) -> BodyId {
        let id = BodyId(self.next);
        self.next += 1;
        id
    }
}

/// Error when a body's properties would break the simulation.
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq)]
pub enum BodyError {
    #[error("Mass must be positive, got {0}")]
    NonPositiveMass(f64),
    #[error("Bounding radius must not be negative, got {0}")]
    NegativeRadius(f64),
    #[error("Rotate rate must be a positive number of milliseconds per degree, got {0}")]
    InvalidRotateRate(f64),
    #[error(transparent)]
    Math(#[from] MathError),
}

/// An engine attached to a body that pushes it in a fixed direction
/// relative to the body's facing while firing.
#[derive(Clone, Copy, Debug)]
pub struct Thruster {
    thrust: Vec2,
    firing: bool,
}

impl Thruster {
    /// Create a thruster with the given force, pointing at `angle`
    /// (degrees if given as a plain number) relative to the body.
    pub fn new(power: f64, angle: impl Into<Angle>) -> Result<Self, MathError> {
        Ok(Self {
            thrust: m::finite(m::from_angle(angle, power), "thrust")?,
            firing: false,
        })
    }

    #[inline]
    pub fn set_firing(&mut self, firing: bool) {
        self.firing = firing;
    }

    #[inline]
    pub fn is_firing(&self) -> bool {
        self.firing
    }

    /// The force this thruster currently exerts, zero if it isn't firing.
    #[inline]
    pub fn thrust_vector(&self) -> Vec2 {
        if self.firing {
            self.thrust
        } else {
            Vec2::zero()
        }
    }
}

/// A force applied from outside the body for a limited time.
/// Not affected by the body's rotation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExternalForce {
    pub vector: Vec2,
    /// Milliseconds the force still lasts.
    pub remaining: f64,
}

/// A circular body that moves, turns, and bounces off other bodies.
///
/// Velocities are measured in distance per tick
/// and durations in milliseconds.
#[derive(Debug)]
pub struct Body {
    pub(crate) id: BodyId,
    pub(crate) motion: Motion,
    mass: f64,
    radius: f64,
    rotate_angle: f64,
    rotate_rate: f64,
    rotate_direction: f64,
    thrusters: Vec<Thruster>,
    external_forces: Vec<ExternalForce>,
    pub(crate) collidable: bool,
    pub(crate) observers: Observers,
}

impl Body {
    /// Create a stationary body with the given bounding radius and mass.
    pub fn new(radius: f64, mass: f64, position: Vec2) -> Self {
        Self {
            id: BodyId::UNASSIGNED,
            motion: Motion::new(position, Vec2::zero()),
            mass,
            radius,
            rotate_angle: 0.0,
            rotate_rate: 10.0,
            rotate_direction: 0.0,
            thrusters: Vec::new(),
            external_forces: Vec::new(),
            collidable: true,
            observers: Observers::default(),
        }
    }

    /// Set the velocity of the body in a builder-like chain.
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.motion.velocity = velocity;
        self
    }

    /// Set how many milliseconds it takes to turn by one degree.
    pub fn with_rotate_rate(mut self, rate: f64) -> Self {
        self.rotate_rate = rate;
        self
    }

    /// Check that the body can be simulated.
    pub fn validate(&self) -> Result<(), BodyError> {
        if self.mass <= 0.0 || !self.mass.is_finite() {
            return Err(BodyError::NonPositiveMass(self.mass));
        }
        if self.radius < 0.0 || !self.radius.is_finite() {
            return Err(BodyError::NegativeRadius(self.radius));
        }
        if self.rotate_rate <= 0.0 || !self.rotate_rate.is_finite() {
            return Err(BodyError::InvalidRotateRate(self.rotate_rate));
        }
        m::finite(self.motion.position, "position")?;
        m::finite(self.motion.velocity, "velocity")?;
        Ok(())
    }

    #[inline]
    pub fn id(&self) -> BodyId {
        self.id
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.motion.position
    }

    /// Velocity of the body, as displacement per tick.
    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.motion.velocity
    }

    #[inline]
    pub fn motion(&self) -> &Motion {
        &self.motion
    }

    #[inline]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// The direction the body is facing.
    #[inline]
    pub fn rotation_angle(&self) -> Angle {
        Angle::Deg(self.rotate_angle)
    }

    /// Whether the body still takes part in collisions.
    /// False once the body has been destroyed.
    #[inline]
    pub fn is_collidable(&self) -> bool {
        self.collidable
    }

    /// Start turning. Negative directions turn one way, positive the other, zero stops.
    #[inline]
    pub fn rotate(&mut self, direction: f64) {
        self.rotate_direction = direction;
    }

    /// Zero the velocity.
    #[inline]
    pub fn stop(&mut self) {
        self.motion.velocity = Vec2::zero();
    }

    pub fn set_velocity(&mut self, velocity: Vec2) -> Result<(), MathError> {
        self.motion.velocity = m::finite(velocity, "velocity")?;
        Ok(())
    }

    pub fn set_position(&mut self, position: Vec2) -> Result<(), MathError> {
        self.motion.position = m::finite(position, "position")?;
        Ok(())
    }

    /// Attach a new thruster, returning its index.
    pub fn create_thruster(
        &mut self,
        power: f64,
        angle: impl Into<Angle>,
    ) -> Result<usize, MathError> {
        self.thrusters.push(Thruster::new(power, angle)?);
        Ok(self.thrusters.len() - 1)
    }

    #[inline]
    pub fn thruster(&self, idx: usize) -> Option<&Thruster> {
        self.thrusters.get(idx)
    }

    #[inline]
    pub fn thruster_mut(&mut self, idx: usize) -> Option<&mut Thruster> {
        self.thrusters.get_mut(idx)
    }

    /// Push the body with a force for the given number of milliseconds.
    pub fn add_external_force(&mut self, force: Vec2, duration: f64) -> Result<(), MathError> {
        let vector = m::finite(force, "external force")?;
        self.external_forces.push(ExternalForce {
            vector,
            remaining: duration,
        });
        Ok(())
    }

    pub fn external_forces(&self) -> &[ExternalForce] {
        &self.external_forces
    }

    /// Subscribe to events happening to this body.
    pub fn add_observer(
        &mut self,
        kind: EventKind,
        callback: impl FnMut(&Event, &mut Commands) + 'static,
    ) {
        self.observers.add(kind, callback);
    }

    /// Integrate thrust and external forces over `dt` milliseconds into velocity
    /// and give the body a full tick of motion.
    pub(crate) fn update(&mut self, dt: f64, max_speed: f64) {
        self.motion.reset();

        let thrust = self
            .thrusters
            .iter()
            .fold(Vec2::zero(), |acc, t| acc + t.thrust_vector());

        let rotate_angle = self.rotate_angle + self.rotate_direction * dt / self.rotate_rate;
        if rotate_angle.is_finite() {
            self.rotate_angle = rotate_angle;
        } else {
            log::warn!("{} can't turn to angle {rotate_angle}, keeping the old one", self.id);
        }
        let mut force = m::rotate(thrust, Angle::Deg(self.rotate_angle));

        for ext in &mut self.external_forces {
            force += ext.vector;
            ext.remaining -= dt;
        }
        self.external_forces.retain(|ext| ext.remaining > 0.0);

        if force != Vec2::zero() {
            let dv = force / self.mass * (dt / 1000.0);
            match m::finite(dv, "velocity change")
                .and_then(|dv| m::finite(self.motion.velocity + dv, "velocity"))
            {
                Ok(velocity) => self.motion.velocity = m::clamp_length(velocity, max_speed),
                Err(err) => log::warn!("{} ignored forces this tick: {err}", self.id),
            }
        }
    }

    /// Move by whatever part of the tick's motion collisions have left over.
    pub(crate) fn advance(&mut self, max_speed: f64) {
        self.motion.velocity = m::clamp_length(self.motion.velocity, max_speed);
        self.motion.position += self.motion.velocity * self.motion.time;
    }

    /// First step of destruction: stop interacting with anything.
    pub(crate) fn deactivate(&mut self) {
        self.collidable = false;
        self.observers.clear();
        self.thrusters.clear();
        self.external_forces.clear();
    }
}
