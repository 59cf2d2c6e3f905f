//! Value types describing where things are and how they move within a tick.

use crate::math::{self as m, Vec2};

#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometryError {
    /// The two segments lie on the same line.
    /// Nothing in the engine needs a meaningful answer for this case,
    /// so it's reported instead of guessed at.
    #[error("Segments are collinear, intersection point is undefined")]
    Collinear,
}

/// A line segment starting at `position` and extending along `vector`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
pub struct Segment {
    pub position: Vec2,
    pub vector: Vec2,
}

impl Segment {
    #[inline]
    pub fn new(position: Vec2, vector: Vec2) -> Self {
        Self { position, vector }
    }

    /// Create a segment going from `start` to `end`.
    #[inline]
    pub fn from_points(start: Vec2, end: Vec2) -> Self {
        Self {
            position: start,
            vector: end - start,
        }
    }

    #[inline]
    pub fn start(&self) -> Vec2 {
        self.position
    }

    #[inline]
    pub fn end(&self) -> Vec2 {
        self.position + self.vector
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.vector.mag()
    }

    /// Point at the fraction `s` of the way from start to end.
    #[inline]
    pub fn point_at(&self, s: f64) -> Vec2 {
        self.position + self.vector * s
    }

    /// Find the point where this segment crosses another.
    ///
    /// Endpoints touching the other segment's line count as crossings.
    /// Returns `Ok(None)` if the segments don't meet
    /// and an error if they're on the same line.
    pub fn intersects(&self, other: &Segment) -> Result<Option<Vec2>, GeometryError> {
        // implicit line equations a*x + b*y + c = 0 for both segments;
        // the segments cross iff each one's endpoints straddle the other's line
        let (p1, p2) = (self.start(), self.end());
        let (p3, p4) = (other.start(), other.end());

        let a1 = p2.y - p1.y;
        let b1 = p1.x - p2.x;
        let c1 = p2.x * p1.y - p1.x * p2.y;

        let r3 = a1 * p3.x + b1 * p3.y + c1;
        let r4 = a1 * p4.x + b1 * p4.y + c1;
        if same_side(r3, r4) {
            return Ok(None);
        }

        let a2 = p4.y - p3.y;
        let b2 = p3.x - p4.x;
        let c2 = p4.x * p3.y - p3.x * p4.y;

        let r1 = a2 * p1.x + b2 * p1.y + c2;
        let r2 = a2 * p2.x + b2 * p2.y + c2;
        if same_side(r1, r2) {
            return Ok(None);
        }

        let denom = a1 * b2 - a2 * b1;
        if denom == 0.0 {
            return Err(GeometryError::Collinear);
        }

        Ok(Some(Vec2::new(
            (b1 * c2 - b2 * c1) / denom,
            (a2 * c1 - a1 * c2) / denom,
        )))
    }
}

#[inline]
fn same_side(r1: f64, r2: f64) -> bool {
    r1 != 0.0 && r2 != 0.0 && r1.signum() == r2.signum()
}

/// The straight-line motion of a body over one tick.
///
/// `velocity` is the displacement over a whole tick and `time` is the fraction
/// of the tick that hasn't been consumed yet. `position` is where the body is
/// at tick-time `1 - time`, i.e. the moment the current trajectory began.
/// Collisions during a tick replace the motion with a new one that has less time left.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
pub struct Motion {
    pub position: Vec2,
    pub velocity: Vec2,
    pub time: f64,
}

impl Motion {
    #[inline]
    pub fn new(position: Vec2, velocity: Vec2) -> Self {
        Self {
            position,
            velocity,
            time: 1.0,
        }
    }

    /// Tick-time at which the current trajectory began.
    #[inline]
    pub fn start_time(&self) -> f64 {
        1.0 - self.time
    }

    /// Position at the absolute tick-time `s`.
    ///
    /// For a motion with the whole tick remaining this is `position + velocity * s`.
    #[inline]
    pub fn point_at(&self, s: f64) -> Vec2 {
        self.position + self.velocity * (s - self.start_time())
    }

    /// Where the body ends up at the end of the tick if nothing else happens.
    #[inline]
    pub fn end_point(&self) -> Vec2 {
        self.point_at(1.0)
    }

    /// The path still ahead of the body this tick.
    #[inline]
    pub fn remaining_path(&self) -> Segment {
        Segment::new(self.position, self.velocity * self.time)
    }

    /// Give the motion a whole tick's worth of time again.
    #[inline]
    pub fn reset(&mut self) {
        self.time = 1.0;
    }
}

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
#[allow(clippy::upper_case_acronyms)]
pub struct AABB {
    pub min: Vec2,
    pub max: Vec2,
}

impl AABB {
    /// Create a box from any two opposite corners.
    pub fn new(corner1: Vec2, corner2: Vec2) -> Self {
        Self {
            min: corner1.min_by_component(corner2),
            max: corner1.max_by_component(corner2),
        }
    }

    /// The box covering a circle of radius `r` moving from `start` to `end`.
    pub fn swept(start: Vec2, end: Vec2, r: f64) -> Self {
        Self::new(start, end).padded(r)
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }

    /// Grow the box by `amount` in every direction.
    #[inline]
    pub fn padded(&self, amount: f64) -> Self {
        let pad = Vec2::broadcast(amount);
        Self {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Check whether two boxes overlap. Boxes that only touch count as overlapping.
    #[inline]
    pub fn intersects(&self, other: &AABB) -> bool {
        !(self.max.x < other.min.x
            || self.min.x > other.max.x
            || self.max.y < other.min.y
            || self.min.y > other.max.y)
    }

    /// Check that both corners of the box are finite.
    pub fn validate(&self) -> Result<(), m::MathError> {
        m::finite(self.min, "box minimum")?;
        m::finite(self.max, "box maximum")?;
        Ok(())
    }
}
