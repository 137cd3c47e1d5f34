//! 2D vector math shared by camera space and atlas space.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Sub};

/// A point or displacement in a 2D plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
}

impl Vec2 {
    /// Origin.
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    /// Create a new vector.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Squared length.
    pub fn length_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Distance to another point.
    pub fn distance(&self, other: Vec2) -> f64 {
        (other - *self).length()
    }

    /// Both components finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Scale down to at most `max` length, keeping direction.
    pub fn clamp_length(self, max: f64) -> Self {
        let len = self.length();
        if len > max && len > 0.0 {
            self * (max / len)
        } else {
            self
        }
    }

    /// Mean of a set of points, `None` when empty.
    pub fn mean<I: IntoIterator<Item = Vec2>>(points: I) -> Option<Self> {
        let mut sum = Vec2::ZERO;
        let mut count = 0usize;
        for p in points {
            sum += p;
            count += 1;
        }
        (count > 0).then(|| sum * (1.0 / count as f64))
    }

    /// Complex multiplication, treating (x, y) as x + iy.
    pub(crate) fn complex_mul(self, other: Vec2) -> Vec2 {
        Vec2::new(
            self.x * other.x - self.y * other.y,
            self.x * other.y + self.y * other.x,
        )
    }

    /// Complex division, `None` when `other` is (near) zero.
    pub(crate) fn complex_div(self, other: Vec2) -> Option<Vec2> {
        let denom = other.length_squared();
        if denom <= f64::EPSILON {
            return None;
        }
        Some(Vec2::new(
            (self.x * other.x + self.y * other.y) / denom,
            (self.y * other.x - self.x * other.y) / denom,
        ))
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_distance() {
        let mean = Vec2::mean([Vec2::new(0.0, 0.0), Vec2::new(2.0, 4.0)]).unwrap();
        assert_eq!(mean, Vec2::new(1.0, 2.0));
        assert_eq!(Vec2::mean(std::iter::empty()), None);
        assert_eq!(Vec2::new(0.0, 0.0).distance(Vec2::new(3.0, 4.0)), 5.0);
    }

    #[test]
    fn test_clamp_length() {
        let v = Vec2::new(3.0, 4.0).clamp_length(1.0);
        assert!((v.length() - 1.0).abs() < 1e-12);
        assert_eq!(Vec2::new(0.1, 0.0).clamp_length(1.0), Vec2::new(0.1, 0.0));
    }

    #[test]
    fn test_complex_roundtrip() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(-0.5, 3.0);
        let q = a.complex_mul(b).complex_div(b).unwrap();
        assert!((q.x - a.x).abs() < 1e-12 && (q.y - a.y).abs() < 1e-12);
        assert!(a.complex_div(Vec2::ZERO).is_none());
    }
}
