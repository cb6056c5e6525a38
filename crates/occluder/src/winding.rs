//! Trace windings: small convex polygons carrying texture coordinates.
//!
//! Geometry enters the tree as windings so it can be clipped against node
//! planes; once subdivision is done every winding is fanned into triangles.

use occluder_math::{Plane, Point3, Vec2};

use crate::error::{OccluderError, Result};
use crate::pool::InfoId;
use crate::triangle::TraceTriangle;

/// A winding vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceVert {
    pub xyz: Point3,
    pub st: Vec2,
}

impl TraceVert {
    pub fn new(xyz: Point3, st: Vec2) -> Self {
        Self { xyz, st }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Front,
    Back,
    On,
}

/// A convex polygon on its own plane.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceWinding {
    pub plane: Plane,
    pub info: InfoId,
    pub verts: Vec<TraceVert>,
}

impl TraceWinding {
    /// Build a triangle winding, computing its plane from the three points.
    ///
    /// Returns `None` when the points are collinear.
    pub fn triangle(verts: [TraceVert; 3], info: InfoId) -> Option<Self> {
        let plane = Plane::from_points(&verts[0].xyz, &verts[1].xyz, &verts[2].xyz)?;
        Some(Self {
            plane,
            info,
            verts: verts.to_vec(),
        })
    }

    /// Number of triangles a fan over this winding produces.
    pub fn fan_count(&self) -> usize {
        self.verts.len().saturating_sub(2)
    }

    /// Fan-triangulate around the first vertex.
    pub fn fan(&self) -> impl Iterator<Item = TraceTriangle> + '_ {
        (1..self.verts.len().saturating_sub(1)).map(move |i| {
            TraceTriangle::new([self.verts[0], self.verts[i], self.verts[i + 1]], self.info)
        })
    }

    /// Polygon area, summed over the fan.
    pub fn area(&self) -> f64 {
        self.fan().map(|t| t.area()).sum()
    }

    /// Split against `plane`, returning the front and back parts.
    ///
    /// Vertices within `on_epsilon` of the plane belong to both sides. A
    /// winding with nothing behind the plane is returned whole as the front
    /// part (so a coplanar winding goes front), one with nothing in front
    /// whole as the back part. Parts with fewer than three vertices are
    /// dropped.
    pub fn clip(
        &self,
        plane: &Plane,
        on_epsilon: f64,
        max_verts: usize,
    ) -> Result<(Option<TraceWinding>, Option<TraceWinding>)> {
        let dists: Vec<f64> = self.verts.iter().map(|v| plane.distance(&v.xyz)).collect();
        let sides: Vec<Side> = dists
            .iter()
            .map(|&d| {
                if d < -on_epsilon {
                    Side::Back
                } else if d > on_epsilon {
                    Side::Front
                } else {
                    Side::On
                }
            })
            .collect();

        if !sides.contains(&Side::Back) {
            return Ok((self.nondegenerate(), None));
        }
        if !sides.contains(&Side::Front) {
            return Ok((None, self.nondegenerate()));
        }

        let mut front = Vec::with_capacity(self.verts.len() + 1);
        let mut back = Vec::with_capacity(self.verts.len() + 1);
        let push = |list: &mut Vec<TraceVert>, v: TraceVert| {
            if list.len() >= max_verts {
                return Err(OccluderError::VertexOverflow { max: max_verts });
            }
            list.push(v);
            Ok(())
        };

        let n = self.verts.len();
        for i in 0..n {
            let j = (i + 1) % n;
            let a = self.verts[i];
            let b = self.verts[j];

            match sides[i] {
                Side::Front => push(&mut front, a)?,
                Side::Back => push(&mut back, a)?,
                Side::On => {
                    push(&mut front, a)?;
                    push(&mut back, a)?;
                    continue;
                }
            }

            if sides[j] == Side::On || sides[j] == sides[i] {
                continue;
            }

            let frac = dists[i] / (dists[i] - dists[j]);
            let mut mid = TraceVert::new(a.xyz + (b.xyz - a.xyz) * frac, a.st + (b.st - a.st) * frac);
            // snap the coordinate an axial plane fixes
            for k in 0..3 {
                if plane.normal[k] == 1.0 {
                    mid.xyz[k] = plane.dist;
                } else if plane.normal[k] == -1.0 {
                    mid.xyz[k] = -plane.dist;
                }
            }
            push(&mut front, mid)?;
            push(&mut back, mid)?;
        }

        Ok((self.with_verts(front), self.with_verts(back)))
    }

    fn nondegenerate(&self) -> Option<TraceWinding> {
        (self.verts.len() >= 3).then(|| self.clone())
    }

    fn with_verts(&self, verts: Vec<TraceVert>) -> Option<TraceWinding> {
        (verts.len() >= 3).then(|| TraceWinding {
            plane: self.plane,
            info: self.info,
            verts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolId;
    use approx::assert_relative_eq;

    fn vert(x: f64, y: f64, z: f64, s: f64, t: f64) -> TraceVert {
        TraceVert::new(Point3::new(x, y, z), Vec2::new(s, t))
    }

    fn square() -> TraceWinding {
        TraceWinding {
            plane: Plane::axial(2, 0.0),
            info: InfoId::from_index(0),
            verts: vec![
                vert(-10.0, -10.0, 0.0, 0.0, 0.0),
                vert(10.0, -10.0, 0.0, 1.0, 0.0),
                vert(10.0, 10.0, 0.0, 1.0, 1.0),
                vert(-10.0, 10.0, 0.0, 0.0, 1.0),
            ],
        }
    }

    #[test]
    fn test_triangle_plane() {
        let w = TraceWinding::triangle(
            [
                vert(0.0, 0.0, 4.0, 0.0, 0.0),
                vert(0.0, 1.0, 4.0, 0.0, 0.0),
                vert(1.0, 0.0, 4.0, 0.0, 0.0),
            ],
            InfoId::from_index(0),
        )
        .unwrap();
        assert_relative_eq!(w.plane.normal.z, 1.0);
        assert_relative_eq!(w.plane.dist, 4.0);

        let line = [
            vert(0.0, 0.0, 0.0, 0.0, 0.0),
            vert(1.0, 1.0, 1.0, 0.0, 0.0),
            vert(2.0, 2.0, 2.0, 0.0, 0.0),
        ];
        assert!(TraceWinding::triangle(line, InfoId::from_index(0)).is_none());
    }

    #[test]
    fn test_clip_straddling_conserves_area() {
        let w = square();
        let (front, back) = w.clip(&Plane::axial(0, 2.5), 0.25, 12).unwrap();
        let front = front.unwrap();
        let back = back.unwrap();
        assert_eq!(front.verts.len(), 4);
        assert_eq!(back.verts.len(), 4);
        assert_relative_eq!(front.area() + back.area(), w.area(), epsilon = 1e-9);
        assert_relative_eq!(front.area(), 7.5 * 20.0, epsilon = 1e-9);

        // split points sit exactly on the plane with interpolated st
        let split: Vec<_> = front.verts.iter().filter(|v| v.xyz.x == 2.5).collect();
        assert_eq!(split.len(), 2);
        for v in split {
            assert_relative_eq!(v.st.x, 0.625, epsilon = 1e-12);
            assert!(back.verts.contains(v));
        }
    }

    #[test]
    fn test_clip_keeps_original_vertices() {
        let w = square();
        let (front, back) = w.clip(&Plane::axial(1, -3.0), 0.25, 12).unwrap();
        let (front, back) = (front.unwrap(), back.unwrap());
        for v in &w.verts {
            assert!(front.verts.contains(v) ^ back.verts.contains(v));
        }
        assert_eq!(front.verts.len() + back.verts.len(), w.verts.len() + 4);
    }

    #[test]
    fn test_clip_one_sided() {
        let w = square();
        let (front, back) = w.clip(&Plane::axial(0, -20.0), 0.25, 12).unwrap();
        assert_eq!(front.unwrap(), w);
        assert!(back.is_none());

        let (front, back) = w.clip(&Plane::axial(0, 20.0), 0.25, 12).unwrap();
        assert!(front.is_none());
        assert_eq!(back.unwrap(), w);
    }

    #[test]
    fn test_clip_coplanar_goes_front() {
        let w = square();
        let (front, back) = w.clip(&Plane::axial(2, 0.1), 0.25, 12).unwrap();
        assert_eq!(front.unwrap(), w);
        assert!(back.is_none());
    }

    #[test]
    fn test_clip_through_vertices_shares_on_points() {
        // a diagonal through two corners puts them on the plane
        let w = square();
        let n = occluder_math::Vec3::new(1.0, -1.0, 0.0).normalize();
        let (front, back) = w.clip(&Plane::new(n, 0.0), 0.25, 12).unwrap();
        let (front, back) = (front.unwrap(), back.unwrap());
        assert_eq!(front.verts.len(), 3);
        assert_eq!(back.verts.len(), 3);
        assert_relative_eq!(front.area(), 200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_clip_vertex_overflow() {
        let w = square();
        let err = w.clip(&Plane::axial(0, 0.0), 0.25, 3).unwrap_err();
        assert!(matches!(err, OccluderError::VertexOverflow { max: 3 }));
    }

    #[test]
    fn test_fan() {
        let w = square();
        assert_eq!(w.fan_count(), 2);
        let tris: Vec<_> = w.fan().collect();
        assert_eq!(tris.len(), 2);
        assert_eq!(tris[1].verts[0], w.verts[0]);
        assert_eq!(tris[1].verts[2], w.verts[3]);
        assert_relative_eq!(w.area(), 400.0, epsilon = 1e-9);
    }
}
