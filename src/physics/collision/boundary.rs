//! The edges of the world and where bodies reappear after crossing them.
//!
//! Coordinates are screen-like with y growing downward,
//! so the top edge is at `min.y` and the bottom edge at `max.y`.

use super::CollisionError;
use crate::{
    geometry::{Segment, AABB},
    math::Vec2,
};

/// One edge of the world rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    /// All sides in the order their segments are stored, clockwise from the top.
    pub const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    #[inline]
    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// A world rectangle and its four edges as clockwise segments.
///
/// Because the segments run clockwise, the right-hand side of each one
/// is the outside of the world and its direction alone tells which edge it is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldBounds {
    rect: AABB,
    segments: [Segment; 4],
}

impl WorldBounds {
    pub fn new(rect: AABB) -> Self {
        let top_left = rect.min;
        let top_right = Vec2::new(rect.max.x, rect.min.y);
        let bottom_right = rect.max;
        let bottom_left = Vec2::new(rect.min.x, rect.max.y);
        Self {
            rect,
            segments: [
                Segment::from_points(top_left, top_right),
                Segment::from_points(top_right, bottom_right),
                Segment::from_points(bottom_right, bottom_left),
                Segment::from_points(bottom_left, top_left),
            ],
        }
    }

    #[inline]
    pub fn rect(&self) -> &AABB {
        &self.rect
    }

    #[inline]
    pub fn segment(&self, side: Side) -> &Segment {
        &self.segments[side.index()]
    }

    #[inline]
    pub fn segments(&self) -> &[Segment; 4] {
        &self.segments
    }

    /// Where a body crossing a boundary with the given direction at `crossing`
    /// should reappear: just inside the opposite edge, `offset` away from it,
    /// keeping the crossing point's other coordinate.
    pub fn wrap_target(
        &self,
        direction: Vec2,
        crossing: Vec2,
        offset: f64,
    ) -> Result<Vec2, CollisionError> {
        let (min, max) = (self.rect.min, self.rect.max);
        if direction.y == 0.0 && direction.x > 0.0 {
            // top, reappear at the bottom
            Ok(Vec2::new(crossing.x, max.y - offset))
        } else if direction.y == 0.0 && direction.x < 0.0 {
            Ok(Vec2::new(crossing.x, min.y + offset))
        } else if direction.x == 0.0 && direction.y > 0.0 {
            // right, reappear on the left
            Ok(Vec2::new(min.x + offset, crossing.y))
        } else if direction.x == 0.0 && direction.y < 0.0 {
            Ok(Vec2::new(max.x - offset, crossing.y))
        } else {
            Err(CollisionError::InvalidBoundary { direction })
        }
    }
}
