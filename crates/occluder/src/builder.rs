//! Occlusion tree construction.
//!
//! The builder runs four phases over one set of pools:
//! 1. convert the level's render BSP into tree nodes (plus a sky root),
//! 2. filter every shadow-casting polygon down to the leaves,
//! 3. split crowded, large leaves on axial planes,
//! 4. fan every surviving winding into triangles.

use std::mem;

use log::{debug, info, trace};
use occluder_level::{BspChild, Level};
use occluder_math::{Aabb3, Plane, Point3, Vec3};

use crate::config::BuildSettings;
use crate::error::{OccluderError, Result};
use crate::pool::{
    InfoId, InfoPool, NodeId, Pool, PoolId, TraceInfo, TriangleId, WindingId,
    GROW_TRACE_TRIANGLES, GROW_TRACE_WINDINGS,
};
use crate::tree::{append_item, Leaf, LeafItems, LeafKind, NodeStore, TreeNode};
use crate::triangle::TraceTriangle;
use crate::winding::{TraceVert, TraceWinding};

/// Which top-level tree a polygon is filtered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    /// The world tree converted from the level BSP.
    Head,
    /// The skybox portal scene.
    Sky,
}

/// Counters reported after a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Distinct trace infos.
    pub infos: usize,
    /// Polygons handed to the tree.
    pub input_polygons: usize,
    /// Polygons dropped for having no area.
    pub degenerate_polygons: usize,
    /// Winding slots used.
    pub windings: usize,
    pub triangles: usize,
    pub nodes: usize,
    pub leaves: usize,
    /// Deepest subdivision split.
    pub max_depth: usize,
}

impl BuildStats {
    /// Mean triangle count per leaf.
    pub fn mean_leaf_triangles(&self) -> f64 {
        if self.leaves == 0 {
            return 0.0;
        }
        self.triangles as f64 / self.leaves as f64
    }
}

/// Owns all pools while the tree is being built.
pub struct TreeBuilder<'s> {
    settings: &'s BuildSettings,
    pub(crate) infos: InfoPool,
    pub(crate) windings: Pool<WindingId, TraceWinding>,
    pub(crate) triangles: Pool<TriangleId, TraceTriangle>,
    pub(crate) nodes: NodeStore,
    head: NodeId,
    sky: NodeId,
    stats: BuildStats,
}

impl<'s> TreeBuilder<'s> {
    /// Convert the level BSP into tree nodes and allocate the sky root.
    ///
    /// A level without BSP nodes gets a single empty leaf as its head.
    pub fn from_level(level: &Level, settings: &'s BuildSettings) -> Result<Self> {
        let mut nodes = NodeStore::new();
        let head = if level.nodes.is_empty() {
            nodes.alloc()
        } else {
            convert_bsp(level, &mut nodes)?
        };
        let sky = nodes.alloc();
        if let Some(TreeNode::Leaf(leaf)) = nodes.get_mut(sky) {
            leaf.kind = LeafKind::Sky;
        }
        info!(
            "converted {} bsp nodes into {} trace nodes",
            level.nodes.len(),
            nodes.len()
        );

        Ok(Self {
            settings,
            infos: InfoPool::new(),
            windings: Pool::new(GROW_TRACE_WINDINGS),
            triangles: Pool::new(GROW_TRACE_TRIANGLES),
            nodes,
            head,
            sky,
            stats: BuildStats::default(),
        })
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn sky(&self) -> NodeId {
        self.sky
    }

    pub fn root(&self, root: Root) -> NodeId {
        match root {
            Root::Head => self.head,
            Root::Sky => self.sky,
        }
    }

    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    pub fn intern_info(&mut self, info: TraceInfo) -> InfoId {
        self.infos.intern(info)
    }

    /// Filter a triangle into the tree under `root`. Collinear triangles are
    /// dropped.
    pub fn add_triangle(&mut self, verts: [TraceVert; 3], info: InfoId, root: Root) -> Result<()> {
        self.stats.input_polygons += 1;
        match TraceWinding::triangle(verts, info) {
            Some(winding) => self.filter_winding(winding, self.root(root)),
            None => {
                trace!("dropping degenerate triangle {:?}", verts.map(|v| v.xyz));
                self.stats.degenerate_polygons += 1;
                Ok(())
            }
        }
    }

    /// Push a winding down from `node`, clipping it against every decision
    /// plane it straddles, and store the pieces in the leaves they reach.
    pub fn filter_winding(&mut self, winding: TraceWinding, node: NodeId) -> Result<()> {
        let (plane, children) = match self.nodes.get(node) {
            Some(TreeNode::Decision {
                plane, children, ..
            }) => (*plane, *children),
            Some(TreeNode::Leaf(_)) => {
                let id = self.windings.insert(winding);
                return self.push_winding(node, id);
            }
            None => return Err(OccluderError::InvalidNode(node.index())),
        };

        for child in children {
            if child == self.head || self.nodes.get(child).is_none() {
                return Err(OccluderError::InvalidNode(node.index()));
            }
        }

        let e = &self.settings.epsilons;
        if plane.matches(&winding.plane, e.plane_match_dot, e.plane_match_dist) {
            return self.filter_winding(winding, children[0]);
        }
        if plane.matches(&winding.plane.flipped(), e.plane_match_dot, e.plane_match_dist) {
            return self.filter_winding(winding, children[1]);
        }

        let (front, back) = winding.clip(&plane, e.on_plane, self.settings.max_winding_verts)?;
        if let Some(front) = front {
            self.filter_winding(front, children[0])?;
        }
        if let Some(back) = back {
            self.filter_winding(back, children[1])?;
        }
        Ok(())
    }

    fn push_winding(&mut self, node: NodeId, id: WindingId) -> Result<()> {
        match self.nodes.get_mut(node) {
            Some(TreeNode::Leaf(Leaf {
                items: LeafItems::Windings(list),
                ..
            })) => {
                append_item(list, node, id);
                Ok(())
            }
            _ => Err(OccluderError::InvalidNode(node.index())),
        }
    }

    /// Subdivide both roots.
    pub fn subdivide_roots(&mut self) -> Result<()> {
        info!("subdividing {} windings", self.windings.len());
        self.subdivide(self.head, 0)?;
        self.subdivide(self.sky, 0)
    }

    /// Recursively split leaves under `node` until they are small, sparse
    /// or deep enough.
    pub fn subdivide(&mut self, node: NodeId, depth: usize) -> Result<()> {
        if depth >= self.settings.max_tree_depth {
            return Ok(());
        }
        let depth = depth + 1;

        let leaf = match self.nodes.get(node) {
            Some(TreeNode::Decision { children, .. }) => {
                let [front, back] = *children;
                self.subdivide(front, depth)?;
                return self.subdivide(back, depth);
            }
            Some(TreeNode::Leaf(leaf)) => leaf,
            None => return Err(OccluderError::InvalidNode(node.index())),
        };
        // solid leaves keep their solidity; splitting them would drop it
        if leaf.kind == LeafKind::Solid {
            return Ok(());
        }
        let LeafItems::Windings(items) = &leaf.items else {
            return Ok(());
        };

        let mut bounds = Aabb3::empty();
        let mut sum = Vec3::zeros();
        let mut count = 0usize;
        for &id in items {
            for v in &self.windings[id].verts {
                bounds.include_point(&v.xyz);
                sum += v.xyz.coords;
                count += 1;
            }
        }
        let num_items = items.len();

        if count.saturating_sub(num_items * 2) < self.settings.max_node_triangles {
            self.set_bounds(node, bounds);
            return Ok(());
        }

        let axis = bounds.longest_axis();
        if bounds.size(axis) <= self.settings.min_node_size {
            self.set_bounds(node, bounds);
            return Ok(());
        }
        self.stats.max_depth = self.stats.max_depth.max(depth);

        let mut dist = (sum[axis] / count as f64).floor();
        if dist <= bounds.min[axis] || dist >= bounds.max[axis] {
            dist = (0.5 * (bounds.min[axis] + bounds.max[axis])).floor();
        }
        let plane = Plane::axial(axis, dist);

        let front = self.nodes.alloc();
        let back = self.nodes.alloc();
        let slot = self
            .nodes
            .get_mut(node)
            .ok_or(OccluderError::InvalidNode(node.index()))?;
        let old = mem::replace(
            slot,
            TreeNode::Decision {
                plane,
                axis: Some(axis),
                children: [front, back],
                items: 0,
            },
        );
        let items = match old {
            TreeNode::Leaf(Leaf {
                items: LeafItems::Windings(items),
                ..
            }) => items,
            _ => Vec::new(),
        };

        let mut front_items = Vec::with_capacity(items.len() / 2);
        let mut back_items = Vec::with_capacity(items.len() / 2);
        for id in items {
            let (f, b) = self.windings[id].clip(
                &plane,
                self.settings.epsilons.on_plane,
                self.settings.max_winding_verts,
            )?;
            if f.is_some() || b.is_some() {
                self.windings.free(id);
            }
            if let Some(f) = f {
                let fid = self.windings.insert(f);
                append_item(&mut front_items, front, fid);
            }
            if let Some(b) = b {
                let bid = self.windings.insert(b);
                append_item(&mut back_items, back, bid);
            }
        }
        self.set_windings(front, front_items)?;
        self.set_windings(back, back_items)?;

        self.subdivide(front, depth)?;
        self.subdivide(back, depth)
    }

    fn set_bounds(&mut self, node: NodeId, bounds: Aabb3) {
        if let Some(TreeNode::Leaf(leaf)) = self.nodes.get_mut(node) {
            leaf.bounds = bounds;
        }
    }

    fn set_windings(&mut self, node: NodeId, items: Vec<WindingId>) -> Result<()> {
        match self.nodes.get_mut(node) {
            Some(TreeNode::Leaf(leaf)) => {
                leaf.items = LeafItems::Windings(items);
                Ok(())
            }
            _ => Err(OccluderError::InvalidNode(node.index())),
        }
    }

    /// Triangulate both roots.
    pub fn triangulate_roots(&mut self) -> Result<()> {
        let head = self.triangulate(self.head)?;
        let sky = self.triangulate(self.sky)?;
        debug!("{head} world triangles, {sky} skybox triangles");
        Ok(())
    }

    /// Replace every leaf's windings with their fan triangles and record
    /// triangle counts on decision nodes. Returns the count under `node`.
    pub fn triangulate(&mut self, node: NodeId) -> Result<usize> {
        let windings = match self.nodes.get_mut(node) {
            Some(TreeNode::Decision { children, .. }) => {
                let [front, back] = *children;
                let total = self.triangulate(front)? + self.triangulate(back)?;
                if let Some(TreeNode::Decision { items, .. }) = self.nodes.get_mut(node) {
                    *items = total;
                }
                return Ok(total);
            }
            Some(TreeNode::Leaf(leaf)) => match mem::take(&mut leaf.items) {
                LeafItems::Windings(w) => w,
                done @ LeafItems::Triangles(_) => {
                    let n = done.len();
                    leaf.items = done;
                    return Ok(n);
                }
            },
            None => return Err(OccluderError::InvalidNode(node.index())),
        };

        let margin_eps = self.settings.epsilons.bary;
        let pad = self.settings.epsilons.trace_on;
        let mut tris = Vec::with_capacity(windings.len() * 2);
        let mut bounds = Aabb3::empty();
        for id in windings {
            for tri in self.windings[id].fan() {
                let mut b = tri.bounds();
                b.expand(margin_eps * (tri.edge1.norm() + tri.edge2.norm()) + pad);
                bounds.include_box(&b);
                let tid = self.triangles.insert(tri);
                append_item(&mut tris, node, tid);
            }
        }

        let n = tris.len();
        if let Some(TreeNode::Leaf(leaf)) = self.nodes.get_mut(node) {
            leaf.items = LeafItems::Triangles(tris);
            leaf.bounds = bounds;
        }
        Ok(n)
    }

    /// Final counters.
    pub fn stats(&self) -> BuildStats {
        let leaves = self.nodes.iter().filter(|n| n.as_leaf().is_some()).count();
        BuildStats {
            infos: self.infos.len(),
            windings: self.windings.len(),
            triangles: self.triangles.len(),
            nodes: self.nodes.len(),
            leaves,
            ..self.stats
        }
    }

    pub(crate) fn into_parts(self) -> BuiltParts {
        let stats = self.stats();
        BuiltParts {
            infos: self.infos.into_vec(),
            triangles: self.triangles.into_vec(),
            nodes: self.nodes.into_vec(),
            head: self.head,
            sky: self.sky,
            stats,
        }
    }
}

/// Pools handed over to the finished tree. Windings are dropped here.
pub(crate) struct BuiltParts {
    pub infos: Vec<TraceInfo>,
    pub triangles: Vec<TraceTriangle>,
    pub nodes: Vec<TreeNode>,
    pub head: NodeId,
    pub sky: NodeId,
    pub stats: BuildStats,
}

/// A BSP child waiting to be converted.
enum Pending {
    Node(usize),
    Leaf(usize),
}

/// Convert the BSP rooted at node 0 depth-first, front child first.
///
/// Each BSP node may be reached once; a second visit means the node graph
/// is not a tree.
fn convert_bsp(level: &Level, nodes: &mut NodeStore) -> Result<NodeId> {
    let mut visited = vec![false; level.nodes.len()];
    let mut stack = vec![(Pending::Node(0), None::<(NodeId, usize)>)];
    let mut head = None;

    while let Some((pending, parent)) = stack.pop() {
        let id = match pending {
            Pending::Node(index) => {
                let bsp = level
                    .nodes
                    .get(index)
                    .ok_or(OccluderError::InvalidBspReference { kind: "node", index })?;
                if mem::replace(&mut visited[index], true) {
                    return Err(OccluderError::InvalidBspReference { kind: "node", index });
                }
                let plane = level
                    .planes
                    .get(bsp.plane)
                    .ok_or(OccluderError::InvalidBspReference {
                        kind: "plane",
                        index: bsp.plane,
                    })?
                    .to_plane();

                let id = nodes.alloc();
                if let Some(node) = nodes.get_mut(id) {
                    *node = TreeNode::Decision {
                        plane,
                        axis: plane.axis(),
                        children: [id; 2],
                        items: 0,
                    };
                }
                for (slot, child) in bsp.children.iter().enumerate().rev() {
                    let child = match *child {
                        BspChild::Node(n) => Pending::Node(n),
                        BspChild::Leaf(l) => Pending::Leaf(l),
                    };
                    stack.push((child, Some((id, slot))));
                }
                id
            }
            Pending::Leaf(index) => {
                let bsp_leaf = level
                    .leafs
                    .get(index)
                    .ok_or(OccluderError::InvalidBspReference { kind: "leaf", index })?;
                let id = nodes.alloc();
                if bsp_leaf.is_opaque() {
                    if let Some(TreeNode::Leaf(leaf)) = nodes.get_mut(id) {
                        leaf.kind = LeafKind::Solid;
                    }
                }
                id
            }
        };

        match parent {
            Some((parent, slot)) => {
                if let Some(TreeNode::Decision { children, .. }) = nodes.get_mut(parent) {
                    children[slot] = id;
                }
            }
            None => head = Some(id),
        }
    }

    head.ok_or(OccluderError::InvalidBspReference { kind: "node", index: 0 })
}

/// A trace vertex from a level or model vertex.
pub(crate) fn trace_vert(xyz: Point3, st: [f64; 2]) -> TraceVert {
    TraceVert::new(xyz, st.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use occluder_level::{BspLeaf, BspNode, BspPlane, CompileFlags, ShaderInfo};
    use occluder_math::Vec2;
    use std::sync::Arc;

    fn info(builder: &mut TreeBuilder<'_>) -> InfoId {
        builder.intern_info(TraceInfo {
            shader: Arc::new(ShaderInfo::new("solid", CompileFlags::SOLID)),
            surface: Some(0),
            cast_shadows: 1,
        })
    }

    fn tv(x: f64, y: f64, z: f64) -> TraceVert {
        TraceVert::new(Point3::new(x, y, z), Vec2::zeros())
    }

    /// One split plane x = 0; the front leaf is open, the back leaf solid.
    fn split_level() -> Level {
        Level {
            planes: vec![BspPlane {
                normal: [1.0, 0.0, 0.0],
                dist: 0.0,
            }],
            nodes: vec![BspNode {
                plane: 0,
                children: [BspChild::Leaf(0), BspChild::Leaf(1)],
            }],
            leafs: vec![BspLeaf { cluster: 0 }, BspLeaf { cluster: -1 }],
            ..Default::default()
        }
    }

    fn leaf_of(builder: &TreeBuilder<'_>, id: NodeId) -> Leaf {
        builder.nodes().get(id).and_then(TreeNode::as_leaf).cloned().unwrap()
    }

    #[test]
    fn test_convert_empty_level() {
        let settings = BuildSettings::default();
        let builder = TreeBuilder::from_level(&Level::default(), &settings).unwrap();
        assert_eq!(builder.head().index(), 0);
        assert_eq!(builder.sky().index(), 1);
        assert_eq!(leaf_of(&builder, builder.head()).kind, LeafKind::Normal);
        assert_eq!(leaf_of(&builder, builder.sky()).kind, LeafKind::Sky);
    }

    #[test]
    fn test_convert_marks_solid_leaves() {
        let settings = BuildSettings::default();
        let builder = TreeBuilder::from_level(&split_level(), &settings).unwrap();
        let Some(TreeNode::Decision { children, axis, .. }) = builder.nodes().get(builder.head()) else {
            panic!("head should be a decision node");
        };
        assert_eq!(*axis, Some(0));
        assert_eq!(leaf_of(&builder, children[0]).kind, LeafKind::Normal);
        assert_eq!(leaf_of(&builder, children[1]).kind, LeafKind::Solid);
        assert_eq!(builder.sky().index(), 3);
    }

    #[test]
    fn test_convert_rejects_bad_references() {
        let settings = BuildSettings::default();
        let mut level = split_level();
        level.nodes[0].children[1] = BspChild::Leaf(9);
        assert!(matches!(
            TreeBuilder::from_level(&level, &settings),
            Err(OccluderError::InvalidBspReference { kind: "leaf", index: 9 })
        ));

        let mut level = split_level();
        level.nodes[0].children[0] = BspChild::Node(0);
        assert!(matches!(
            TreeBuilder::from_level(&level, &settings),
            Err(OccluderError::InvalidBspReference { kind: "node", .. })
        ));
    }

    #[test]
    fn test_convert_rejects_long_cycle() {
        // a chain of 50000 nodes whose last front child loops back to the root
        let count = 50_000;
        let mut level = split_level();
        level.nodes = (0..count)
            .map(|i| BspNode {
                plane: 0,
                children: [BspChild::Node((i + 1) % count), BspChild::Leaf(1)],
            })
            .collect();
        let settings = BuildSettings::default();
        assert!(matches!(
            TreeBuilder::from_level(&level, &settings),
            Err(OccluderError::InvalidBspReference { kind: "node", index: 0 })
        ));
    }

    #[test]
    fn test_convert_deep_chain() {
        let count = 50_000;
        let mut level = split_level();
        level.nodes = (0..count)
            .map(|i| BspNode {
                plane: 0,
                children: [
                    if i + 1 < count { BspChild::Node(i + 1) } else { BspChild::Leaf(0) },
                    BspChild::Leaf(1),
                ],
            })
            .collect();
        let settings = BuildSettings::default();
        let builder = TreeBuilder::from_level(&level, &settings).unwrap();
        // every bsp node, one leaf per node and the front leaf at the bottom, then sky
        assert_eq!(builder.sky().index(), 2 * count + 1);
        let Some(TreeNode::Decision { children, .. }) = builder.nodes().get(builder.head()) else {
            panic!("head should be a decision node");
        };
        assert_eq!(children[0].index(), 1);
        assert_eq!(leaf_of(&builder, children[1]).kind, LeafKind::Solid);
    }

    #[test]
    fn test_filter_splits_straddling_winding() {
        let settings = BuildSettings::default();
        let mut builder = TreeBuilder::from_level(&split_level(), &settings).unwrap();
        let info = info(&mut builder);
        builder
            .add_triangle([tv(-8.0, 0.0, 0.0), tv(8.0, 0.0, 0.0), tv(8.0, 8.0, 0.0)], info, Root::Head)
            .unwrap();

        let Some(TreeNode::Decision { children, .. }) = builder.nodes().get(builder.head()).cloned() else {
            panic!("head should be a decision node");
        };
        let front = leaf_of(&builder, children[0]);
        let back = leaf_of(&builder, children[1]);
        assert_eq!(front.items.len(), 1);
        assert_eq!(back.items.len(), 1);
    }

    #[test]
    fn test_filter_plane_match_goes_one_way() {
        let settings = BuildSettings::default();
        let mut builder = TreeBuilder::from_level(&split_level(), &settings).unwrap();
        let info = info(&mut builder);
        // a triangle lying in x = 0 whose normal is +x
        let facing = [tv(0.0, 0.0, 0.0), tv(0.0, 0.0, 8.0), tv(0.0, 8.0, 0.0)];
        let w = TraceWinding::triangle(facing, info).unwrap();
        assert!(w.plane.normal.x > 0.99);
        builder.add_triangle(facing, info, Root::Head).unwrap();
        // the same triangle facing -x
        builder
            .add_triangle([facing[0], facing[2], facing[1]], info, Root::Head)
            .unwrap();

        let Some(TreeNode::Decision { children, .. }) = builder.nodes().get(builder.head()).cloned() else {
            panic!("head should be a decision node");
        };
        assert_eq!(leaf_of(&builder, children[0]).items.len(), 1);
        assert_eq!(leaf_of(&builder, children[1]).items.len(), 1);
    }

    #[test]
    fn test_degenerate_triangles_dropped() {
        let settings = BuildSettings::default();
        let mut builder = TreeBuilder::from_level(&Level::default(), &settings).unwrap();
        let info = info(&mut builder);
        builder
            .add_triangle([tv(0.0, 0.0, 0.0), tv(1.0, 1.0, 1.0), tv(2.0, 2.0, 2.0)], info, Root::Head)
            .unwrap();
        assert!(leaf_of(&builder, builder.head()).items.is_empty());
        assert_eq!(builder.stats().degenerate_polygons, 1);
    }

    /// A grid of 1x1 squares (two triangles each) spread over 256 units.
    fn scatter(builder: &mut TreeBuilder<'_>, info: InfoId) {
        for i in 0..16 {
            for j in 0..16 {
                let (x, y) = (i as f64 * 16.0, j as f64 * 16.0);
                let quad = [tv(x, y, 0.0), tv(x + 1.0, y, 0.0), tv(x + 1.0, y + 1.0, 0.0), tv(x, y + 1.0, 0.0)];
                builder.add_triangle([quad[0], quad[1], quad[2]], info, Root::Head).unwrap();
                builder.add_triangle([quad[0], quad[2], quad[3]], info, Root::Head).unwrap();
            }
        }
    }

    fn total_area(builder: &TreeBuilder<'_>) -> f64 {
        builder
            .nodes()
            .iter()
            .filter_map(TreeNode::as_leaf)
            .flat_map(|leaf| leaf.items.triangles().to_vec())
            .map(|id| builder.triangles[id].area())
            .sum()
    }

    #[test]
    fn test_subdivide_and_triangulate_preserve_area() {
        let settings = BuildSettings::default();
        let mut builder = TreeBuilder::from_level(&Level::default(), &settings).unwrap();
        let info = info(&mut builder);
        scatter(&mut builder, info);

        builder.subdivide_roots().unwrap();
        assert!(builder.nodes().len() > 2);
        let stats = builder.stats();
        assert!(stats.max_depth >= 1 && stats.max_depth <= settings.max_tree_depth);

        builder.triangulate_roots().unwrap();
        assert!((total_area(&builder) - 256.0).abs() < 1e-6);

        // decision nodes count the triangles below them
        let head = builder.nodes().get(builder.head()).unwrap();
        let leaf_total: usize = builder
            .nodes()
            .iter()
            .filter_map(TreeNode::as_leaf)
            .map(|l| l.items.len())
            .sum();
        assert_eq!(head.item_count(), leaf_total);

        // every leaf is small, sparse or at the depth limit
        for leaf in builder.nodes().iter().filter_map(TreeNode::as_leaf) {
            assert!(matches!(leaf.items, LeafItems::Triangles(_)));
            if leaf.items.len() >= settings.max_node_triangles {
                let b = leaf.bounds;
                let size = b.size(b.longest_axis());
                // bounds carry the halo pad
                assert!(size <= settings.min_node_size + 1.0);
            }
        }
    }

    #[test]
    fn test_low_memory_keeps_single_leaf() {
        let settings = BuildSettings {
            low_memory: true,
            ..Default::default()
        };
        let mut builder = TreeBuilder::from_level(&Level::default(), &settings).unwrap();
        let info = info(&mut builder);
        scatter(&mut builder, info);
        builder.triangulate_roots().unwrap();
        assert_eq!(builder.nodes().len(), 2);
        assert_eq!(leaf_of(&builder, builder.head()).items.len(), 512);
    }

    #[test]
    fn test_solid_leaves_not_subdivided() {
        let settings = BuildSettings::default();
        let mut builder = TreeBuilder::from_level(&split_level(), &settings).unwrap();
        let info = info(&mut builder);
        for i in 0..20 {
            let x = -300.0 + i as f64 * 12.0;
            builder
                .add_triangle([tv(x, 0.0, 0.0), tv(x - 4.0, 0.0, 0.0), tv(x - 4.0, 4.0, 0.0)], info, Root::Head)
                .unwrap();
        }
        let before = builder.nodes().len();
        builder.subdivide_roots().unwrap();
        assert_eq!(builder.nodes().len(), before);
    }
}
