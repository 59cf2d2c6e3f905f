//! Exact time-of-impact computations between pairs of swept shapes.
//!
//! All times are absolute tick-times in `[0, 1]`,
//! see [`Motion`][crate::geometry::Motion] for how they relate to positions.

use crate::{
    geometry::{GeometryError, Motion, Segment},
    math as m,
};

/// Find the first time two moving circles touch during the rest of the tick.
///
/// Both circles are advanced to the later of their two start times
/// and the distance between them is solved for the sum of their radii from there.
/// Circles that are already overlapping or moving apart don't produce a new contact.
pub fn body_body_toi(a: &Motion, radius_a: f64, b: &Motion, radius_b: f64) -> Option<f64> {
    let t0 = a.start_time().max(b.start_time());
    let dp = b.point_at(t0) - a.point_at(t0);
    let dv = b.velocity - a.velocity;
    let r = radius_a + radius_b;

    // |dp + tau * dv|^2 = r^2
    let qa = dv.mag_sq();
    if qa == 0.0 {
        return None;
    }
    let qb = 2.0 * dp.dot(dv);
    let qc = dp.mag_sq() - r * r;

    let discriminant = qb * qb - 4.0 * qa * qc;
    if discriminant < 0.0 {
        return None;
    }
    let tau = (-qb - discriminant.sqrt()) / (2.0 * qa);
    if tau < 0.0 || tau > 1.0 - t0 {
        return None;
    }
    Some(t0 + tau)
}

/// Find the time a body's center crosses a boundary segment on its way out of the world.
///
/// Boundaries are one-way: crossing only counts when moving towards
/// the segment's right side, which is the outside for a clockwise world rectangle.
pub fn body_boundary_toi(
    motion: &Motion,
    boundary: &Segment,
) -> Result<Option<f64>, GeometryError> {
    let path = motion.remaining_path();
    let path_len = path.length();
    if path_len == 0.0 {
        return Ok(None);
    }

    let Some(crossing) = path.intersects(boundary)? else {
        return Ok(None);
    };
    if motion.velocity.dot(m::right_normal(boundary.vector)) <= 0.0 {
        return Ok(None);
    }

    let fraction = (crossing - path.position).mag() / path_len;
    Ok(Some(motion.start_time() + motion.time * fraction.min(1.0)))
}
