//! World-Space Vector and Orientation
//!
//! Positions and orientations as reported by the hosting engine.
//! Values are continuous; snapping to the arena grid lives in `grid.rs`.

use std::fmt;
use std::ops::{Add, Sub, Neg};
use serde::{Serialize, Deserialize};

/// 3D world-space vector. Z is up.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component (world units)
    pub x: f32,
    /// Y component (world units)
    pub y: f32,
    /// Z component (world units, up)
    pub z: f32,
}

impl Vec3 {
    /// Zero vector
    pub const ZERO: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    /// Unit vector pointing up (+Z)
    pub const UP: Self = Self { x: 0.0, y: 0.0, z: 1.0 };

    /// Create a new vector.
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Same vector lowered by `offset` along Z.
    #[inline]
    pub fn lowered(self, offset: f32) -> Self {
        Self { z: self.z - offset, ..self }
    }

    /// Squared distance to another point.
    #[inline]
    pub fn distance_squared(self, other: Self) -> f32 {
        let d = self - other;
        d.x * d.x + d.y * d.y + d.z * d.z
    }

    /// Raw bit patterns, for hashing.
    #[inline]
    pub fn to_bits(self) -> [u32; 3] {
        [self.x.to_bits(), self.y.to_bits(), self.z.to_bits()]
    }
}

impl Add for Vec3 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Debug for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vec3({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Orientation in degrees, engine convention (pitch, yaw, roll).
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotator {
    /// Rotation around the right axis
    pub pitch: f32,
    /// Rotation around the up axis
    pub yaw: f32,
    /// Rotation around the forward axis
    pub roll: f32,
}

impl Rotator {
    /// No rotation
    pub const IDENTITY: Self = Self { pitch: 0.0, yaw: 0.0, roll: 0.0 };

    /// Create a new rotator.
    #[inline]
    pub const fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Yaw-only rotator, the common case for a character facing direction.
    #[inline]
    pub const fn from_yaw(yaw: f32) -> Self {
        Self { pitch: 0.0, yaw, roll: 0.0 }
    }

    /// Raw bit patterns, for hashing.
    #[inline]
    pub fn to_bits(self) -> [u32; 3] {
        [self.pitch.to_bits(), self.yaw.to_bits(), self.roll.to_bits()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowered_only_touches_z() {
        let v = Vec3::new(12.5, -40.0, 96.0).lowered(60.0);
        assert_eq!(v, Vec3::new(12.5, -40.0, 36.0));
    }

    #[test]
    fn test_vector_ops() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(0.5, 0.5, 0.5);
        assert_eq!(a + b, Vec3::new(1.5, 2.5, 3.5));
        assert_eq!(a - b, Vec3::new(0.5, 1.5, 2.5));
        assert_eq!(-a, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(a.distance_squared(a), 0.0);
    }

    #[test]
    fn test_bits_distinguish_signed_zero() {
        // Hashing must see -0.0 and 0.0 as different states.
        assert_ne!(Vec3::new(0.0, 0.0, 0.0).to_bits(), Vec3::new(-0.0, 0.0, 0.0).to_bits());
    }
}
