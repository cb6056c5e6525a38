#![warn(missing_docs)]

//! Math types for the occluder light tracer.
//!
//! Thin wrappers around nalgebra providing the handful of types the
//! occlusion tree needs: points, vectors, affine transforms, planes,
//! axis-aligned bounds and rays.

pub mod bbox;
pub mod plane;
pub mod ray;

pub use bbox::Aabb3;
pub use plane::Plane;
pub use ray::Ray;

use nalgebra::{Matrix4, Unit, Vector2, Vector3, Vector4};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A texture coordinate pair.
pub type Vec2 = Vector2<f64>;

/// A 4x4 affine transformation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Non-uniform scale by `(sx, sy, sz)`.
    pub fn scale(sx: f64, sy: f64, sz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 0)] = sx;
        m[(1, 1)] = sy;
        m[(2, 2)] = sz;
        Self { matrix: m }
    }

    /// Rotation about the X axis by `angle` radians.
    pub fn rotation_x(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(1, 1)] = c;
        m[(1, 2)] = -s;
        m[(2, 1)] = s;
        m[(2, 2)] = c;
        Self { matrix: m }
    }

    /// Rotation about the Y axis by `angle` radians.
    pub fn rotation_y(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(0, 0)] = c;
        m[(0, 2)] = s;
        m[(2, 0)] = -s;
        m[(2, 2)] = c;
        Self { matrix: m }
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(0, 0)] = c;
        m[(0, 1)] = -s;
        m[(1, 0)] = s;
        m[(1, 1)] = c;
        Self { matrix: m }
    }

    /// Entity placement: scale, then roll about X, pitch about Y, yaw about Z,
    /// then translate to `origin`.
    ///
    /// `angles` is `[pitch, yaw, roll]` in degrees, the order entity keys
    /// store them in.
    pub fn pivoted(origin: [f64; 3], angles: [f64; 3], scale: [f64; 3]) -> Self {
        let [pitch, yaw, roll] = angles;
        Self::translation(origin[0], origin[1], origin[2])
            .then(&Self::rotation_z(yaw.to_radians()))
            .then(&Self::rotation_y(pitch.to_radians()))
            .then(&Self::rotation_x(roll.to_radians()))
            .then(&Self::scale(scale[0], scale[1], scale[2]))
    }

    /// Compose: `self` then `other` (self * other).
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_identity_transform() {
        let t = Transform::identity();
        let p = Point3::new(1.0, 2.0, 3.0);
        let result = t.apply_point(&p);
        assert!((result - p).norm() < 1e-12);
    }

    #[test]
    fn test_translation() {
        let t = Transform::translation(10.0, 20.0, 30.0);
        let p = Point3::new(1.0, 2.0, 3.0);
        let result = t.apply_point(&p);
        assert!((result.x - 11.0).abs() < 1e-12);
        assert!((result.y - 22.0).abs() < 1e-12);
        assert!((result.z - 33.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_z_90() {
        let t = Transform::rotation_z(PI / 2.0);
        let p = Point3::new(1.0, 0.0, 0.0);
        let result = t.apply_point(&p);
        assert!(result.x.abs() < 1e-12);
        assert!((result.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_compose_applies_right_first() {
        let t1 = Transform::translation(1.0, 0.0, 0.0);
        let t2 = Transform::scale(2.0, 2.0, 2.0);
        // (t2 * t1) * p = t2(t1(p)): translate, then scale
        let composed = t2.then(&t1);
        let result = composed.apply_point(&Point3::origin());
        assert!((result.x - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_pivoted_scales_before_rotating() {
        // yaw 90 turns +X into +Y; scale 2 applies first, origin last
        let t = Transform::pivoted([100.0, 0.0, 0.0], [0.0, 90.0, 0.0], [2.0, 2.0, 2.0]);
        let result = t.apply_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((result.x - 100.0).abs() < 1e-9);
        assert!((result.y - 2.0).abs() < 1e-9);
        assert!(result.z.abs() < 1e-9);
    }

    #[test]
    fn test_pivoted_pitch_and_roll() {
        let pitch = Transform::pivoted([0.0; 3], [90.0, 0.0, 0.0], [1.0; 3]);
        let r = pitch.apply_point(&Point3::new(1.0, 0.0, 0.0));
        assert!(r.x.abs() < 1e-9);
        assert!((r.z + 1.0).abs() < 1e-9);

        let roll = Transform::pivoted([0.0; 3], [0.0, 0.0, 90.0], [1.0; 3]);
        let r = roll.apply_point(&Point3::new(0.0, 1.0, 0.0));
        assert!(r.y.abs() < 1e-9);
        assert!((r.z - 1.0).abs() < 1e-9);
    }
}
