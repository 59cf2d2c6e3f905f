//! Types, aliases and helper operations for doing math with `ultraviolet`.
//!
//! Points and vectors are both represented with [`Vec2`];
//! the documentation of each function says which one it means.
use std::f64::consts::PI;
pub use ultraviolet as uv;

pub type Vec2 = uv::DVec2;

/// Error produced when a value that would poison the simulation enters it.
#[derive(thiserror::Error, Clone, Copy, Debug, PartialEq)]
pub enum MathError {
    #[error("{what} is not a finite number: ({x}, {y})")]
    NotFinite { what: &'static str, x: f64, y: f64 },
}

/// An angle in either degrees or radians.
/// Default conversion from f64 is in degrees.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize)
)]
pub enum Angle {
    Rad(f64),
    Deg(f64),
}
impl Angle {
    /// Get the angle as degrees.
    #[inline]
    pub fn deg(&self) -> f64 {
        match self {
            Angle::Rad(rad) => rad * 180.0 / PI,
            Angle::Deg(deg) => *deg,
        }
    }

    /// Get the angle as radians.
    #[inline]
    pub fn rad(&self) -> f64 {
        match self {
            Angle::Rad(rad) => *rad,
            Angle::Deg(deg) => deg * PI / 180.0,
        }
    }
}
impl Default for Angle {
    fn default() -> Self {
        Angle::Rad(0.0)
    }
}
impl From<f64> for Angle {
    #[inline]
    fn from(deg: f64) -> Self {
        Angle::Deg(deg)
    }
}

/// A wrapper type to indicate a vector should always be normalized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Unit<T>(T);

impl Unit<Vec2> {
    /// Normalize a vector, returning `None` if it has zero length
    /// and thus no direction.
    pub fn try_new(v: Vec2) -> Option<Self> {
        let len = v.mag();
        if len == 0.0 || !len.is_finite() {
            None
        } else {
            Some(Unit(v / len))
        }
    }

    pub const fn new_unchecked(v: Vec2) -> Self {
        Unit(v)
    }
}

impl<T> std::ops::Deref for Unit<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Vec2 utils

#[inline]
pub fn left_normal(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}
#[inline]
pub fn right_normal(v: Vec2) -> Vec2 {
    Vec2::new(v.y, -v.x)
}
#[inline]
pub fn unit_left_normal(u: Unit<Vec2>) -> Unit<Vec2> {
    Unit::new_unchecked(left_normal(*u))
}

/// Create a vector of the given length pointing in the given direction,
/// measured counterclockwise from the positive x axis.
#[inline]
pub fn from_angle(angle: impl Into<Angle>, length: f64) -> Vec2 {
    let rad = angle.into().rad();
    Vec2::new(length * rad.cos(), length * rad.sin())
}

/// Rotate a vector by an angle.
#[inline]
pub fn rotate(v: Vec2, angle: impl Into<Angle>) -> Vec2 {
    let (sin, cos) = angle.into().rad().sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.y * cos + v.x * sin)
}

/// Scale a vector to unit length.
/// Zero-length vectors are returned unchanged;
/// check the length yourself if you need an actual direction.
#[inline]
pub fn normalize(v: Vec2) -> Vec2 {
    let len = v.mag();
    if len == 0.0 {
        v
    } else {
        v / len
    }
}

/// Scale a vector down to `max_len` if it's longer than that.
#[inline]
pub fn clamp_length(v: Vec2, max_len: f64) -> Vec2 {
    if v.mag_sq() > max_len * max_len {
        normalize(v) * max_len
    } else {
        v
    }
}

/// Check that both components of a vector are finite.
#[inline]
pub fn finite(v: Vec2, what: &'static str) -> Result<Vec2, MathError> {
    if v.x.is_finite() && v.y.is_finite() {
        Ok(v)
    } else {
        Err(MathError::NotFinite { what, x: v.x, y: v.y })
    }
}
