//! Tree nodes and the node store.

use occluder_math::{Aabb3, Plane};

use crate::pool::{NodeId, PoolId, TriangleId, WindingId, GROW_TRACE_NODES};

/// Item growth step for every leaf but the first node.
pub const GROW_NODE_ITEMS: usize = 16;

/// What a ray reaching a leaf runs into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeafKind {
    #[default]
    Normal,
    /// Outside the level; a ray reaching it is blocked.
    Solid,
    /// Root of the skybox portal scene.
    Sky,
}

/// Leaf contents: windings while building, triangles once triangulated.
#[derive(Debug, Clone, PartialEq)]
pub enum LeafItems {
    Windings(Vec<WindingId>),
    Triangles(Vec<TriangleId>),
}

impl LeafItems {
    pub fn len(&self) -> usize {
        match self {
            LeafItems::Windings(w) => w.len(),
            LeafItems::Triangles(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Triangles, or an empty slice while the leaf still holds windings.
    pub fn triangles(&self) -> &[TriangleId] {
        match self {
            LeafItems::Triangles(t) => t,
            LeafItems::Windings(_) => &[],
        }
    }
}

impl Default for LeafItems {
    fn default() -> Self {
        LeafItems::Windings(Vec::new())
    }
}

/// A tree leaf.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Leaf {
    pub kind: LeafKind,
    pub items: LeafItems,
    pub bounds: Aabb3,
}

/// A node of the occlusion tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    /// An inner node. `children[0]` is in front of the plane.
    Decision {
        plane: Plane,
        /// Split axis when the plane is axial.
        axis: Option<usize>,
        children: [NodeId; 2],
        /// Triangles anywhere below this node.
        items: usize,
    },
    Leaf(Leaf),
}

impl TreeNode {
    pub fn leaf(kind: LeafKind) -> Self {
        TreeNode::Leaf(Leaf {
            kind,
            ..Default::default()
        })
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            TreeNode::Leaf(leaf) => Some(leaf),
            TreeNode::Decision { .. } => None,
        }
    }

    /// Item count: windings or triangles in a leaf, triangles below a
    /// decision node.
    pub fn item_count(&self) -> usize {
        match self {
            TreeNode::Decision { items, .. } => *items,
            TreeNode::Leaf(leaf) => leaf.items.len(),
        }
    }
}

/// Growable array of tree nodes addressed by [`NodeId`].
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    nodes: Vec<TreeNode>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an empty normal leaf.
    pub fn alloc(&mut self) -> NodeId {
        if self.nodes.len() == self.nodes.capacity() {
            self.nodes.reserve_exact(GROW_TRACE_NODES);
        }
        self.nodes.push(TreeNode::leaf(LeafKind::Normal));
        NodeId::from_index(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.index())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter()
    }

    pub fn into_vec(self) -> Vec<TreeNode> {
        self.nodes
    }
}

/// Append `item` to a leaf item list, growing it by doubling for the first
/// node of the store and by [`GROW_NODE_ITEMS`] everywhere else.
pub(crate) fn append_item<T>(list: &mut Vec<T>, node: NodeId, item: T) {
    if list.len() == list.capacity() {
        let grow = if node.index() == 0 {
            list.capacity().max(GROW_NODE_ITEMS)
        } else {
            GROW_NODE_ITEMS
        };
        list.reserve_exact(grow);
    }
    list.push(item);
}
