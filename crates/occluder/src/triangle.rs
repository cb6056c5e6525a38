//! Trace triangles and the ray/triangle test.

use occluder_math::{Point3, Vec2, Vec3};

use crate::pool::InfoId;
use crate::winding::TraceVert;

/// A triangle ready for tracing, with its two edges from the first vertex
/// precomputed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceTriangle {
    pub verts: [TraceVert; 3],
    pub edge1: Vec3,
    pub edge2: Vec3,
    pub info: InfoId,
}

/// Where a ray crosses a triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Distance along the (unit) ray direction.
    pub depth: f64,
    /// Barycentric weight of the second vertex.
    pub u: f64,
    /// Barycentric weight of the third vertex.
    pub v: f64,
}

impl TriangleHit {
    /// Whether the hit lies within `epsilon` of the triangle in barycentric
    /// terms.
    pub fn within(&self, epsilon: f64) -> bool {
        self.u >= -epsilon
            && self.u <= 1.0 + epsilon
            && self.v >= -epsilon
            && self.u + self.v <= 1.0 + epsilon
    }
}

impl TraceTriangle {
    pub fn new(verts: [TraceVert; 3], info: InfoId) -> Self {
        Self {
            edge1: verts[1].xyz - verts[0].xyz,
            edge2: verts[2].xyz - verts[0].xyz,
            verts,
            info,
        }
    }

    pub fn area(&self) -> f64 {
        self.edge1.cross(&self.edge2).norm() * 0.5
    }

    /// Möller–Trumbore intersection of the ray `origin + t * dir` with this
    /// triangle, culling neither face.
    ///
    /// Rejects rays whose `|det|` is below `coplanar` and hits whose
    /// barycentric coordinates stray more than `bary` outside the triangle.
    /// The depth may be negative or beyond the segment; callers bound it.
    #[inline]
    pub fn intersect(
        &self,
        origin: &Point3,
        dir: &Vec3,
        coplanar: f64,
        bary: f64,
    ) -> Option<TriangleHit> {
        let pvec = dir.cross(&self.edge2);
        let det = self.edge1.dot(&pvec);
        if det.abs() < coplanar {
            return None;
        }
        let inv_det = 1.0 / det;

        let tvec = origin - self.verts[0].xyz;
        let u = tvec.dot(&pvec) * inv_det;
        if u < -bary || u > 1.0 + bary {
            return None;
        }

        let qvec = tvec.cross(&self.edge1);
        let v = dir.dot(&qvec) * inv_det;
        if v < -bary || u + v > 1.0 + bary {
            return None;
        }

        Some(TriangleHit {
            depth: self.edge2.dot(&qvec) * inv_det,
            u,
            v,
        })
    }

    /// Texture coordinates at barycentric `(u, v)`.
    pub fn tex_coords(&self, u: f64, v: f64) -> Vec2 {
        let w = 1.0 - (u + v);
        self.verts[0].st * w + self.verts[1].st * u + self.verts[2].st * v
    }

    /// Vertex bounds.
    pub fn bounds(&self) -> occluder_math::Aabb3 {
        let mut b = occluder_math::Aabb3::empty();
        for v in &self.verts {
            b.include_point(&v.xyz);
        }
        b
    }
}
