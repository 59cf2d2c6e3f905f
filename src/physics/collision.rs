//! Continuous collision detection and response.
//!
//! Contacts are found as exact times of impact within the current tick
//! and resolved one at a time in temporal order by the [`CollisionResolver`].

use crate::{geometry::GeometryError, math::Vec2, physics::body::BodyId};

pub mod queue;
pub use queue::PriorityQueue;

pub mod broadphase;
pub use broadphase::{BroadPhase, BruteForce, SweepAndPrune};

pub mod narrowphase;

pub mod boundary;
pub use boundary::{Side, WorldBounds};

pub mod resolver;
pub use resolver::{Collision, CollisionKey, CollisionOrder, CollisionResolver, ResolveReport};

/// Errors that can happen while detecting or resolving a single collision.
///
/// None of these stop a tick. The affected collision is dropped
/// and the error is reported alongside the rest of the tick's results.
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq)]
pub enum CollisionError {
    #[error("{a} and {b} have no separating direction at the time of contact or at the start of their motion")]
    DegenerateNormal { a: BodyId, b: BodyId },
    #[error("Boundary with direction {direction:?} is neither horizontal nor vertical")]
    InvalidBoundary { direction: Vec2 },
    #[error("A boundary was crossed but no world bounds are set to wrap around")]
    NoWorldBounds,
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}
