//! Occlusion tree and shadow ray tracer for static level lighting.
//!
//! A light compiler asks one question millions of times: can light travel
//! from this point to that one? This crate answers it against a compiled
//! level.
//!
//! # Architecture
//!
//! - [`builder`] converts the level's render BSP into an occlusion tree and
//!   subdivides and triangulates it
//! - [`populate`] gathers the shadow-casting geometry of the world, its
//!   entities and their external models
//! - [`winding`] clips convex polygons against planes
//! - [`trace`] walks rays down the finished tree and resolves the surfaces
//!   they hit
//!
//! # Example
//!
//! ```ignore
//! let shaders: MemoryShaders = scene_shaders.into_iter().collect();
//! let tree = OcclusionTree::build(Scene::new(&level, &shaders), &BuildSettings::default())?;
//!
//! let mut request = TraceRequest::new(sample, light_origin);
//! if tree.trace(&mut request).is_blocked() {
//!     // in shadow
//! }
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod pool;
pub mod populate;
pub mod trace;
pub mod tree;
pub mod triangle;
pub mod winding;

pub use builder::{BuildStats, Root, TreeBuilder};
pub use config::{BuildSettings, Epsilons};
pub use error::{OccluderError, Result};
pub use pool::{InfoId, NodeId, PoolId, TraceInfo, TriangleId, WindingId};
pub use populate::{Populator, Scene};
pub use trace::{shadows_group, Blocker, Occlusion, TraceRequest};
pub use tree::{Leaf, LeafItems, LeafKind, TreeNode};
pub use triangle::{TraceTriangle, TriangleHit};
pub use winding::{TraceVert, TraceWinding};

use log::{debug, info};

/// A finished, immutable occlusion tree. Safe to trace from many threads.
#[derive(Debug, Clone)]
pub struct OcclusionTree {
    settings: BuildSettings,
    infos: Vec<TraceInfo>,
    triangles: Vec<TraceTriangle>,
    nodes: Vec<TreeNode>,
    head: NodeId,
    sky: NodeId,
    /// Per level surface: whether it looks into a skybox portal scene.
    skybox_children: Vec<bool>,
    stats: BuildStats,
}

impl OcclusionTree {
    /// Build the tree for a scene.
    pub fn build(scene: Scene<'_>, settings: &BuildSettings) -> Result<Self> {
        settings.validate()?;
        info!(
            "building occlusion tree ({} surfaces, {} entities)",
            scene.level.surfaces.len(),
            scene.entities.len()
        );

        let mut builder = TreeBuilder::from_level(scene.level, settings)?;
        Populator::new(scene, settings).populate(&mut builder)?;
        if !settings.low_memory {
            builder.subdivide_roots()?;
        }
        builder.triangulate_roots()?;

        let parts = builder.into_parts();
        let stats = parts.stats;
        debug!(
            "occlusion tree: {} nodes, {} leaves, {} triangles ({:.1} per leaf), {} infos, depth {}",
            stats.nodes,
            stats.leaves,
            stats.triangles,
            stats.mean_leaf_triangles(),
            stats.infos,
            stats.max_depth
        );

        Ok(Self {
            settings: settings.clone(),
            infos: parts.infos,
            triangles: parts.triangles,
            nodes: parts.nodes,
            head: parts.head,
            sky: parts.sky,
            skybox_children: scene
                .level
                .surfaces
                .iter()
                .map(|s| s.skybox_child.is_some())
                .collect(),
            stats,
        })
    }

    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    /// Root of the world tree.
    pub fn head(&self) -> NodeId {
        self.head
    }

    /// Root of the skybox portal scene.
    pub fn sky(&self) -> NodeId {
        self.sky
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn triangle(&self, id: TriangleId) -> &TraceTriangle {
        &self.triangles[id.index()]
    }

    pub fn triangles(&self) -> &[TraceTriangle] {
        &self.triangles
    }

    pub fn info(&self, id: InfoId) -> &TraceInfo {
        &self.infos[id.index()]
    }

    pub fn infos(&self) -> &[TraceInfo] {
        &self.infos
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Whether level surface `surface` looks into the skybox scene.
    pub fn has_skybox_child(&self, surface: usize) -> bool {
        self.skybox_children.get(surface).copied().unwrap_or(false)
    }
}
