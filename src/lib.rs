//! Continuous collision detection and response for small 2D worlds
//! of circular bodies that wrap around at the edges of the world.
//!
//! The entry point is [`PhysicsSystem`][physics::PhysicsSystem].
//! Every tick it integrates forces into velocities, finds the exact times at which
//! bodies touch each other or cross the world boundary, resolves those contacts
//! in time order and finally moves everything by whatever motion remains.

/// Open a profiling span that lasts until the end of the enclosing scope.
/// Compiles to nothing unless the `tracy` feature is enabled.
macro_rules! tracy_span {
    ($name:expr, $fn_name:expr) => {{
        #[cfg(feature = "tracy")]
        let span = tracy_client::Client::running()
            .map(|client| client.span_alloc(Some($name), $fn_name, file!(), line!(), 0));
        #[cfg(not(feature = "tracy"))]
        let span = ();
        span
    }};
}

pub mod math;
pub use math::{uv, Angle, MathError, Unit, Vec2};

pub mod geometry;
pub use geometry::{GeometryError, Motion, Segment, AABB};

pub mod event;
pub use event::{Commands, CollisionEvent, Event, EventKind, Observers};

pub mod physics;
pub use physics::{
    body::{Body, BodyError, BodyId, ExternalForce, Thruster},
    body_set::BodyKey,
    collision::{
        self, boundary::Side, Collision, CollisionError, CollisionResolver, PriorityQueue,
        ResolveReport,
    },
    ParamsError, PhysicsParams, PhysicsSystem, TickReport,
};
