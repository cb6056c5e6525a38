//! Plane equations.

use crate::{Point3, Vec3};

/// A plane `normal · p = dist`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal.
    pub normal: Vec3,
    /// Distance from the origin along `normal`.
    pub dist: f64,
}

impl Plane {
    /// Create a plane from a normal and distance.
    pub fn new(normal: Vec3, dist: f64) -> Self {
        Self { normal, dist }
    }

    /// Axis-aligned plane `p[axis] = dist`.
    pub fn axial(axis: usize, dist: f64) -> Self {
        let mut normal = Vec3::zeros();
        normal[axis] = 1.0;
        Self { normal, dist }
    }

    /// Plane through three points, with the normal `(c - a) × (b - a)`.
    ///
    /// Returns `None` for collinear or coincident points.
    pub fn from_points(a: &Point3, b: &Point3, c: &Point3) -> Option<Self> {
        let normal = (c - a).cross(&(b - a));
        let len = normal.norm();
        if len == 0.0 || !len.is_finite() {
            return None;
        }
        let normal = normal / len;
        Some(Self {
            normal,
            dist: a.coords.dot(&normal),
        })
    }

    /// Signed distance from `p` to the plane.
    #[inline]
    pub fn distance(&self, p: &Point3) -> f64 {
        self.normal.dot(&p.coords) - self.dist
    }

    /// The axis this plane is perpendicular to, when its normal is exactly
    /// `+1` or `-1` on that axis.
    pub fn axis(&self) -> Option<usize> {
        (0..3).find(|&i| self.normal[i] == 1.0 || self.normal[i] == -1.0)
    }

    /// The same plane facing the other way.
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            dist: -self.dist,
        }
    }

    /// Whether `other` is the same plane within the given tolerances.
    pub fn matches(&self, other: &Plane, dot_eps: f64, dist_eps: f64) -> bool {
        self.normal.dot(&other.normal) > dot_eps && (self.dist - other.dist).abs() < dist_eps
    }
}
