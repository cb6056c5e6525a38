//! Compiled level geometry: the render BSP, sub-models and draw surfaces.
//!
//! These are the decoded lumps of a compiled map. Loading them from the
//! binary file format is the caller's job; everything here is plain data
//! that can round-trip through serde.

use occluder_math::{Plane, Point3, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// A BSP split plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BspPlane {
    pub normal: [f64; 3],
    pub dist: f64,
}

impl BspPlane {
    pub fn to_plane(&self) -> Plane {
        Plane::new(Vec3::from(self.normal), self.dist)
    }
}

/// One child reference of a BSP decision node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BspChild {
    Node(usize),
    Leaf(usize),
}

/// A BSP decision node. `children[0]` is the front side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BspNode {
    pub plane: usize,
    pub children: [BspChild; 2],
}

/// A BSP leaf. Leaves outside the playable volume have cluster `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BspLeaf {
    pub cluster: i32,
}

impl BspLeaf {
    pub fn is_opaque(&self) -> bool {
        self.cluster < 0
    }
}

/// A contiguous range of draw surfaces. Model 0 is the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BspModel {
    pub first_surface: usize,
    pub num_surfaces: usize,
}

/// A shader reference as stored in the level, with its content and surface
/// bits.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BspShader {
    pub name: String,
    #[serde(default)]
    pub content_flags: u32,
    #[serde(default)]
    pub surface_flags: u32,
}

/// A draw vertex: position and texture coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DrawVert {
    pub xyz: [f64; 3],
    #[serde(default)]
    pub st: [f64; 2],
}

impl DrawVert {
    pub fn new(xyz: [f64; 3], st: [f64; 2]) -> Self {
        Self { xyz, st }
    }

    pub fn position(&self) -> Point3 {
        Point3::from(self.xyz)
    }

    pub fn tex(&self) -> Vec2 {
        Vec2::from(self.st)
    }

    /// Midpoint of two vertices in position and texture space.
    pub fn lerp_mid(&self, other: &DrawVert) -> DrawVert {
        DrawVert {
            xyz: [
                (self.xyz[0] + other.xyz[0]) * 0.5,
                (self.xyz[1] + other.xyz[1]) * 0.5,
                (self.xyz[2] + other.xyz[2]) * 0.5,
            ],
            st: [
                (self.st[0] + other.st[0]) * 0.5,
                (self.st[1] + other.st[1]) * 0.5,
            ],
        }
    }
}

/// Draw surface kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    #[default]
    Bad,
    Planar,
    Patch,
    TriangleSoup,
    Flare,
}

fn default_cast_shadows() -> i32 {
    1
}

/// A renderable surface together with the per-surface lighting info the
/// occlusion tree needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawSurface {
    pub kind: SurfaceKind,
    pub shader: usize,
    pub first_vert: usize,
    pub num_verts: usize,
    #[serde(default)]
    pub first_index: usize,
    #[serde(default)]
    pub num_indexes: usize,
    #[serde(default)]
    pub patch_width: usize,
    #[serde(default)]
    pub patch_height: usize,
    /// Shadow group this surface casts into; 0 disables casting.
    #[serde(default = "default_cast_shadows")]
    pub cast_shadows: i32,
    /// Set on surfaces that belong to a skybox portal scene.
    #[serde(default)]
    pub skybox_parent: Option<usize>,
    /// Set on surfaces that look into a skybox portal scene.
    #[serde(default)]
    pub skybox_child: Option<usize>,
    /// Patch subdivision level.
    #[serde(default)]
    pub patch_iterations: u32,
}

impl Default for DrawSurface {
    fn default() -> Self {
        Self {
            kind: SurfaceKind::Bad,
            shader: 0,
            first_vert: 0,
            num_verts: 0,
            first_index: 0,
            num_indexes: 0,
            patch_width: 0,
            patch_height: 0,
            cast_shadows: default_cast_shadows(),
            skybox_parent: None,
            skybox_child: None,
            patch_iterations: 0,
        }
    }
}

/// All geometry lumps of a compiled level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Level {
    pub planes: Vec<BspPlane>,
    pub nodes: Vec<BspNode>,
    pub leafs: Vec<BspLeaf>,
    pub models: Vec<BspModel>,
    pub shaders: Vec<BspShader>,
    pub surfaces: Vec<DrawSurface>,
    pub verts: Vec<DrawVert>,
    pub indexes: Vec<u32>,
}

impl Level {
    /// Vertices of a surface, or `None` when the range is out of bounds.
    pub fn surface_verts(&self, surface: &DrawSurface) -> Option<&[DrawVert]> {
        self.verts
            .get(surface.first_vert..surface.first_vert.checked_add(surface.num_verts)?)
    }

    /// Indexes of a surface, or `None` when the range is out of bounds.
    pub fn surface_indexes(&self, surface: &DrawSurface) -> Option<&[u32]> {
        self.indexes
            .get(surface.first_index..surface.first_index.checked_add(surface.num_indexes)?)
    }

    /// Append a draw surface built from a vertex list and triangle indexes,
    /// returning its index. Used to assemble levels in code.
    pub fn push_surface(
        &mut self,
        mut surface: DrawSurface,
        verts: &[DrawVert],
        indexes: &[u32],
    ) -> usize {
        surface.first_vert = self.verts.len();
        surface.num_verts = verts.len();
        surface.first_index = self.indexes.len();
        surface.num_indexes = indexes.len();
        self.verts.extend_from_slice(verts);
        self.indexes.extend_from_slice(indexes);
        self.surfaces.push(surface);
        self.surfaces.len() - 1
    }

    /// Add a shader and return its index.
    pub fn push_shader(&mut self, name: &str) -> usize {
        self.shaders.push(BspShader {
            name: name.to_string(),
            ..Default::default()
        });
        self.shaders.len() - 1
    }
}
