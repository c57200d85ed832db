//! Planar geometry primitives
//!
//! `Point2` doubles as a position (m) and a velocity (m/s); `Bounds` is the
//! axis-aligned tracked area. Clamping onto `Bounds` is a projection onto a
//! convex set, so it never increases the distance between two points that
//! already lie inside the area.

use core::ops::{Add, Mul, Sub};

use crate::constants::physics::{DEFAULT_AREA_LENGTH_M, DEFAULT_AREA_WIDTH_M};

/// 2D point or vector in metres (or metres per second for velocities)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point2 {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point2 {
    /// Origin / zero vector
    pub const ZERO: Point2 = Point2 { x: 0.0, y: 0.0 };

    /// Create a new point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean norm
    pub fn norm(&self) -> f64 {
        libm::hypot(self.x, self.y)
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point2) -> f64 {
        libm::hypot(self.x - other.x, self.y - other.y)
    }

    /// Dot product
    pub fn dot(&self, other: &Point2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Midpoint between two points
    pub fn midpoint(&self, other: &Point2) -> Point2 {
        Point2::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }

    /// Both coordinates are finite numbers
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Rescale so the norm does not exceed `limit`
    pub fn clamp_norm(self, limit: f64) -> Point2 {
        let norm = self.norm();
        if norm > limit && norm > 0.0 {
            self * (limit / norm)
        } else {
            self
        }
    }
}

impl Add for Point2 {
    type Output = Point2;

    fn add(self, rhs: Point2) -> Point2 {
        Point2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2 {
    type Output = Point2;

    fn sub(self, rhs: Point2) -> Point2 {
        Point2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point2 {
    type Output = Point2;

    fn mul(self, rhs: f64) -> Point2 {
        Point2::new(self.x * rhs, self.y * rhs)
    }
}

/// Axis-aligned rectangular tracked area
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    /// Smallest x (m)
    pub min_x: f64,
    /// Smallest y (m)
    pub min_y: f64,
    /// Largest x (m)
    pub max_x: f64,
    /// Largest y (m)
    pub max_y: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::from_size(DEFAULT_AREA_LENGTH_M, DEFAULT_AREA_WIDTH_M)
    }
}

impl Bounds {
    /// Area spanning the given corners
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: max_x.max(min_x),
            max_y: max_y.max(min_y),
        }
    }

    /// Area anchored at the origin with the given length (x) and width (y)
    pub fn from_size(length_m: f64, width_m: f64) -> Self {
        Self::new(0.0, 0.0, length_m, width_m)
    }

    /// Whether the point lies inside or on the boundary
    pub fn contains(&self, point: &Point2) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    /// Project a point onto the area
    pub fn clamp(&self, point: Point2) -> Point2 {
        Point2::new(
            point.x.clamp(self.min_x, self.max_x),
            point.y.clamp(self.min_y, self.max_y),
        )
    }

    /// Area grown by `margin` on every side
    pub fn expanded(&self, margin: f64) -> Bounds {
        Bounds::new(
            self.min_x - margin,
            self.min_y - margin,
            self.max_x + margin,
            self.max_y + margin,
        )
    }

    /// Geometric centre of the area
    pub fn centroid(&self) -> Point2 {
        Point2::new((self.min_x + self.max_x) * 0.5, (self.min_y + self.max_y) * 0.5)
    }

    /// Length of the diagonal
    pub fn diagonal(&self) -> f64 {
        libm::hypot(self.max_x - self.min_x, self.max_y - self.min_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_arithmetic() {
        let a = Point2::new(1.0, 2.0);
        let b = Point2::new(4.0, 6.0);

        assert_eq!(b - a, Point2::new(3.0, 4.0));
        assert_eq!((b - a).norm(), 5.0);
        assert_eq!(a.distance_to(&b), 5.0);
        assert_eq!(a.midpoint(&b), Point2::new(2.5, 4.0));
        assert_eq!(a * 2.0, Point2::new(2.0, 4.0));
    }

    #[test]
    fn clamp_norm_keeps_direction() {
        let v = Point2::new(3.0, 4.0).clamp_norm(2.5);
        assert!((v.norm() - 2.5).abs() < 1e-12);
        assert!((v.x / v.y - 0.75).abs() < 1e-12);

        let short = Point2::new(0.1, 0.0).clamp_norm(1.0);
        assert_eq!(short, Point2::new(0.1, 0.0));
    }

    #[test]
    fn bounds_projection() {
        let bounds = Bounds::from_size(10.0, 5.0);

        assert!(bounds.contains(&Point2::new(10.0, 5.0)));
        assert!(!bounds.contains(&Point2::new(10.1, 5.0)));
        assert_eq!(bounds.clamp(Point2::new(-1.0, 7.0)), Point2::new(0.0, 5.0));
        assert_eq!(bounds.centroid(), Point2::new(5.0, 2.5));

        let grown = bounds.expanded(0.5);
        assert_eq!(grown.min_x, -0.5);
        assert_eq!(grown.max_y, 5.5);
    }

    #[test]
    fn inverted_corners_are_normalized() {
        let bounds = Bounds::new(5.0, 5.0, 0.0, 0.0);
        assert_eq!(bounds.min_x, 0.0);
        assert_eq!(bounds.max_x, 5.0);
    }
}
