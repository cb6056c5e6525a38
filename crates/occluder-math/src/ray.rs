//! Ray representation and the ray-box slab test.

use crate::{Aabb3, Dir3, Point3, Vec3};

/// A ray in 3D space defined by origin and direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    /// Unit direction of the ray.
    pub direction: Dir3,
    /// Precomputed reciprocal of direction components for fast AABB tests.
    inv_direction: Vec3,
    /// Sign of direction components (0 if positive, 1 if negative).
    sign: [usize; 3],
}

impl Ray {
    /// Create a new ray from origin and direction.
    ///
    /// The direction will be normalized.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        let dir = Dir3::new_normalize(direction);
        let inv = Vec3::new(1.0 / dir.x, 1.0 / dir.y, 1.0 / dir.z);
        let sign = [
            if inv.x < 0.0 { 1 } else { 0 },
            if inv.y < 0.0 { 1 } else { 0 },
            if inv.z < 0.0 { 1 } else { 0 },
        ];
        Self {
            origin,
            direction: dir,
            inv_direction: inv,
            sign,
        }
    }

    /// Test ray-AABB intersection using the slab method.
    ///
    /// Returns `Some((t_min, t_max))` if the ray intersects the box,
    /// where `t_min` and `t_max` are the entry and exit parameters
    /// clamped to the forward half of the ray.
    #[inline]
    pub fn intersect_aabb(&self, aabb: &Aabb3) -> Option<(f64, f64)> {
        let bounds = [aabb.min, aabb.max];
        let mut t_min = f64::NEG_INFINITY;
        let mut t_max = f64::INFINITY;

        for axis in 0..3 {
            // axis-parallel rays on a slab face give 0 * inf = NaN; test containment instead
            if self.inv_direction[axis].is_infinite() {
                if self.origin[axis] < aabb.min[axis] || self.origin[axis] > aabb.max[axis] {
                    return None;
                }
                continue;
            }
            let lo = bounds[self.sign[axis]][axis] - self.origin[axis];
            let hi = bounds[1 - self.sign[axis]][axis] - self.origin[axis];
            t_min = t_min.max(lo * self.inv_direction[axis]);
            t_max = t_max.min(hi * self.inv_direction[axis]);
        }

        if t_max >= t_min && t_max >= 0.0 {
            Some((t_min.max(0.0), t_max))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_aabb_hit() {
        let ray = Ray::new(Point3::new(-5.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        let aabb = Aabb3::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let (t0, t1) = ray.intersect_aabb(&aabb).unwrap();
        assert!((t0 - 5.0).abs() < 1e-12);
        assert!((t1 - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_ray_aabb_face_grazing() {
        // origin sits exactly on the box face plane of a parallel axis
        let ray = Ray::new(Point3::new(-5.0, 0.0, 0.5), Vec3::new(1.0, 0.0, 0.0));
        let aabb = Aabb3::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        assert!(ray.intersect_aabb(&aabb).is_some());
    }

    #[test]
    fn test_ray_aabb_miss_and_behind() {
        let aabb = Aabb3::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let miss = Ray::new(Point3::new(-5.0, 3.0, 0.5), Vec3::new(1.0, 0.0, 0.0));
        assert!(miss.intersect_aabb(&aabb).is_none());
        let behind = Ray::new(Point3::new(5.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        assert!(behind.intersect_aabb(&aabb).is_none());
    }
}
