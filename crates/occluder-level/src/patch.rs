//! Curved patch meshes and their tessellation.
//!
//! A patch is a grid of biquadratic Bézier control points: every 3x3 block
//! sharing edges with its neighbours forms one curved quad.

use occluder_math::{Point3, Vec3};
use serde::{Deserialize, Serialize};

use crate::DrawVert;

/// Largest row or column count subdivision may grow a mesh to.
pub const MAX_EXPANDED_AXIS: usize = 128;

/// A row-major grid of vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchMesh {
    pub width: usize,
    pub height: usize,
    pub verts: Vec<DrawVert>,
}

impl PatchMesh {
    /// Build a mesh, or `None` when the vertex count does not match the grid.
    pub fn new(width: usize, height: usize, verts: Vec<DrawVert>) -> Option<Self> {
        (width.checked_mul(height) == Some(verts.len())).then_some(Self {
            width,
            height,
            verts,
        })
    }

    pub fn vert(&self, x: usize, y: usize) -> &DrawVert {
        &self.verts[y * self.width + x]
    }

    fn rows(&self) -> Vec<Vec<DrawVert>> {
        if self.width == 0 {
            return Vec::new();
        }
        self.verts.chunks(self.width).map(<[DrawVert]>::to_vec).collect()
    }

    fn from_rows(rows: Vec<Vec<DrawVert>>) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        Self {
            width,
            height,
            verts: rows.into_iter().flatten().collect(),
        }
    }
}

/// Turns a control mesh into a renderable vertex grid.
pub trait CurveTessellator {
    /// Tessellate `mesh` with `iterations` levels of subdivision.
    fn tessellate(&self, mesh: &PatchMesh, iterations: u32) -> PatchMesh;
}

/// Fixed-level Bézier tessellation.
///
/// Each iteration halves every control span with de Casteljau splits, the
/// remaining approximating points are then dropped onto the curve, and
/// rows or columns that are straight to within `linear_epsilon` are removed.
#[derive(Debug, Clone, Copy)]
pub struct BezierTessellator {
    pub max_axis: usize,
    pub linear_epsilon: f64,
}

impl Default for BezierTessellator {
    fn default() -> Self {
        Self {
            max_axis: MAX_EXPANDED_AXIS,
            linear_epsilon: 0.1,
        }
    }
}

impl CurveTessellator for BezierTessellator {
    fn tessellate(&self, mesh: &PatchMesh, iterations: u32) -> PatchMesh {
        let mut rows = mesh.rows();
        if rows.is_empty() {
            return mesh.clone();
        }

        for _ in 0..iterations {
            split_columns(&mut rows, self.max_axis);
            let mut cols = transpose(&rows);
            split_columns(&mut cols, self.max_axis);
            rows = transpose(&cols);
        }

        let mut cols = transpose(&rows);
        put_on_curve(&mut cols);
        rows = transpose(&cols);
        put_on_curve(&mut rows);

        remove_linear_columns(&mut rows, self.linear_epsilon);
        let mut cols = transpose(&rows);
        remove_linear_columns(&mut cols, self.linear_epsilon);
        PatchMesh::from_rows(transpose(&cols))
    }
}

fn transpose(rows: &[Vec<DrawVert>]) -> Vec<Vec<DrawVert>> {
    let width = rows.first().map_or(0, Vec::len);
    (0..width)
        .map(|x| rows.iter().map(|row| row[x]).collect())
        .collect()
}

/// Split every 3-wide control span along each row into two.
fn split_columns(rows: &mut [Vec<DrawVert>], max_axis: usize) {
    let mut width = rows.first().map_or(0, Vec::len);
    let mut j = 0;
    while j + 2 < width {
        if width + 2 >= max_axis {
            break;
        }
        for row in rows.iter_mut() {
            let prev = row[j].lerp_mid(&row[j + 1]);
            let next = row[j + 1].lerp_mid(&row[j + 2]);
            let mid = prev.lerp_mid(&next);
            row[j + 1] = mid;
            row.insert(j + 1, prev);
            row.insert(j + 3, next);
        }
        width += 2;
        j += 4;
    }
}

/// Move every odd (approximating) point of each row onto the curve.
fn put_on_curve(rows: &mut [Vec<DrawVert>]) {
    for row in rows.iter_mut() {
        let mut i = 1;
        while i + 1 < row.len() {
            let prev = row[i].lerp_mid(&row[i + 1]);
            let next = row[i].lerp_mid(&row[i - 1]);
            row[i] = prev.lerp_mid(&next);
            i += 2;
        }
    }
}

/// Drop interior columns whose points all lie within `epsilon` of the line
/// through their row neighbours.
fn remove_linear_columns(rows: &mut [Vec<DrawVert>], epsilon: f64) {
    let mut j = 1;
    while j + 1 < rows.first().map_or(0, Vec::len) {
        let max_len = rows
            .iter()
            .map(|row| {
                off_line_distance(
                    &row[j].position(),
                    &row[j - 1].position(),
                    &row[j + 1].position(),
                )
            })
            .fold(0.0_f64, f64::max);
        if max_len < epsilon {
            for row in rows.iter_mut() {
                row.remove(j);
            }
        } else {
            j += 1;
        }
    }
}

fn off_line_distance(p: &Point3, start: &Point3, end: &Point3) -> f64 {
    let dir: Vec3 = end - start;
    let len = dir.norm();
    if len == 0.0 {
        return (p - start).norm();
    }
    let dir = dir / len;
    let proj = start + dir * (p - start).dot(&dir);
    (p - proj).norm()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control_arch() -> PatchMesh {
        // a 3x3 patch arching up in z along x, flat along y
        let mut verts = Vec::new();
        for y in 0..3 {
            for x in 0..3 {
                let z = if x == 1 { 64.0 } else { 0.0 };
                verts.push(DrawVert::new(
                    [x as f64 * 64.0, y as f64 * 64.0, z],
                    [x as f64 * 0.5, y as f64 * 0.5],
                ));
            }
        }
        PatchMesh::new(3, 3, verts).unwrap()
    }

    #[test]
    fn test_new_rejects_mismatched_grid() {
        assert!(PatchMesh::new(3, 3, vec![DrawVert::default(); 8]).is_none());
    }

    #[test]
    fn test_new_rejects_overflowing_grid() {
        let verts = vec![DrawVert::default(); 4];
        assert!(PatchMesh::new(usize::MAX, 2, verts.clone()).is_none());
        assert!(PatchMesh::new(2, usize::MAX / 2 + 1, verts).is_none());
    }

    #[test]
    fn test_flat_direction_collapses() {
        let mesh = BezierTessellator::default().tessellate(&control_arch(), 2);
        // 2 iterations: 3 -> 5 -> 9 columns; the straight y direction collapses to 2 rows
        assert_eq!(mesh.width, 9);
        assert_eq!(mesh.height, 2);
        assert_eq!(mesh.verts.len(), 18);
    }

    #[test]
    fn test_points_lie_on_curve() {
        let mesh = BezierTessellator::default().tessellate(&control_arch(), 1);
        assert_eq!(mesh.width, 5);
        // quadratic Bézier with control heights 0, 64, 0 peaks at 32
        let peak = mesh.vert(2, 0);
        assert!((peak.xyz[0] - 64.0).abs() < 1e-9);
        assert!((peak.xyz[2] - 32.0).abs() < 1e-9);
        // B(1/4) = 2 * 0.25 * 0.75 * 64 = 24
        let quarter = mesh.vert(1, 0);
        assert!((quarter.xyz[2] - 24.0).abs() < 1e-9);
        assert!((quarter.st[0] - 0.25).abs() < 1e-9);
        // corners stay put
        assert_eq!(mesh.vert(0, 0).xyz, [0.0, 0.0, 0.0]);
        assert_eq!(mesh.vert(4, 1).xyz, [128.0, 128.0, 0.0]);
    }

    #[test]
    fn test_zero_iterations_keeps_corners() {
        let mesh = BezierTessellator::default().tessellate(&control_arch(), 0);
        assert_eq!(mesh.width, 3);
        assert!((mesh.vert(1, 0).xyz[2] - 32.0).abs() < 1e-9);
    }
}
