//! Arena storage for the alluvial tree.
//!
//! Every node of the tree (diagram root, networks, modules, highlight
//! groups, branches, streamline nodes, leaf nodes) lives in one
//! generational arena. Parent pointers, child lists and every cross
//! reference (opposite-leaf caches, streamline links, id maps) are arena
//! indices, never owning pointers.

use generational_arena::{Arena, Index};
use serde::Serialize;

use crate::leaf::LeafData;
use crate::module::ModuleData;
use crate::network::NetworkData;
use crate::side::Side;
use crate::streamline::StreamlineData;

/// Arena handle for a tree node.
pub type NodeId = Index;

/// Fixed depth of each node kind, root to leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Depth {
    Root = 0,
    Network = 1,
    Module = 2,
    HighlightGroup = 3,
    Branch = 4,
    Streamline = 5,
    Leaf = 6,
}

/// Layout rectangle assigned by the layout pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Layout {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Per-kind payload; the discriminant doubles as the node's depth.
#[derive(Debug)]
pub enum NodeKind {
    Root,
    Network(NetworkData),
    Module(ModuleData),
    HighlightGroup(GroupData),
    Branch(BranchData),
    Streamline(StreamlineData),
    Leaf(LeafData),
}

/// Subdivision of a module's leaves by highlight color and significance.
#[derive(Debug)]
pub struct GroupData {
    pub highlight_index: i32,
    pub insignificant: bool,
    /// Branch facing the previous network; `children[0]`.
    pub left: NodeId,
    /// Branch facing the next network; `children[1]`.
    pub right: NodeId,
}

impl GroupData {
    pub fn branch(&self, side: Side) -> NodeId {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

/// One side of a highlight group.
#[derive(Debug)]
pub struct BranchData {
    pub side: Side,
}

/// One node of the alluvial tree.
#[derive(Debug)]
pub struct AlluvialNode {
    /// Back-reference, not ownership. None for the root and for detached
    /// leaves.
    pub parent: Option<NodeId>,
    /// Owned children; insertion order is display order unless the layout
    /// pass sorts it.
    pub children: Vec<NodeId>,
    /// Aggregated weight, valid after `calc_flow`.
    pub flow: f64,
    pub layout: Layout,
    pub kind: NodeKind,
}

impl AlluvialNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            flow: 0.0,
            layout: Layout::default(),
            kind,
        }
    }

    pub fn depth(&self) -> Depth {
        match self.kind {
            NodeKind::Root => Depth::Root,
            NodeKind::Network(_) => Depth::Network,
            NodeKind::Module(_) => Depth::Module,
            NodeKind::HighlightGroup(_) => Depth::HighlightGroup,
            NodeKind::Branch(_) => Depth::Branch,
            NodeKind::Streamline(_) => Depth::Streamline,
            NodeKind::Leaf(_) => Depth::Leaf,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena-backed alluvial tree storage with structural utilities.
#[derive(Debug, Default)]
pub struct AlluvialArena {
    nodes: Arena<AlluvialNode>,
}

impl AlluvialArena {
    pub fn new() -> Self {
        Self {
            nodes: Arena::new(),
        }
    }

    pub fn insert(&mut self, node: AlluvialNode) -> NodeId {
        self.nodes.insert(node)
    }

    pub fn get(&self, idx: NodeId) -> Option<&AlluvialNode> {
        self.nodes.get(idx)
    }

    pub fn get_mut(&mut self, idx: NodeId) -> Option<&mut AlluvialNode> {
        self.nodes.get_mut(idx)
    }

    pub fn remove(&mut self, idx: NodeId) -> Option<AlluvialNode> {
        self.nodes.remove(idx)
    }

    pub fn contains(&self, idx: NodeId) -> bool {
        self.nodes.contains(idx)
    }

    /// Appends `child` to `parent`'s children and sets its back-reference.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
    }

    /// O(1) removal by swapping with the last child; child order is not
    /// preserved. Callers needing an order-sensitive position must have
    /// extracted it beforehand. Returns false if `child` was not present.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let removed = match self.nodes.get_mut(parent) {
            Some(node) => match node.children.iter().position(|&c| c == child) {
                Some(pos) => {
                    node.children.swap_remove(pos);
                    true
                }
                None => false,
            },
            None => false,
        };
        if removed {
            if let Some(node) = self.nodes.get_mut(child) {
                node.parent = None;
            }
        }
        removed
    }

    pub fn children(&self, idx: NodeId) -> &[NodeId] {
        self.nodes
            .get(idx)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, idx: NodeId) -> Option<NodeId> {
        self.nodes.get(idx).and_then(|n| n.parent)
    }

    pub fn is_first_child(&self, idx: NodeId) -> bool {
        self.child_position(idx) == Some(0)
    }

    pub fn is_last_child(&self, idx: NodeId) -> bool {
        match (self.child_position(idx), self.parent(idx)) {
            (Some(pos), Some(parent)) => pos + 1 == self.children(parent).len(),
            _ => false,
        }
    }

    fn child_position(&self, idx: NodeId) -> Option<usize> {
        let parent = self.parent(idx)?;
        self.children(parent).iter().position(|&c| c == idx)
    }

    /// Walks parent pointers until a node of `depth` is found. None when the
    /// root is reached first or `idx` is stale.
    pub fn ancestor_at_depth(&self, idx: NodeId, depth: Depth) -> Option<NodeId> {
        let mut current = idx;
        loop {
            let node = self.nodes.get(current)?;
            if node.depth() == depth {
                return Some(current);
            }
            current = node.parent?;
        }
    }

    /// Recursive leaf count. A leaf counts as 1; a highlight group counts
    /// its left branch only, since both branches hold the same leaves.
    pub fn num_leaf_nodes(&self, idx: NodeId) -> usize {
        let Some(node) = self.nodes.get(idx) else {
            return 0;
        };
        match &node.kind {
            NodeKind::Leaf(_) => 1,
            NodeKind::HighlightGroup(group) => self.num_leaf_nodes(group.left),
            _ => node
                .children
                .iter()
                .map(|&child| self.num_leaf_nodes(child))
                .sum(),
        }
    }

    /// Pre-order traversal from `start`.
    pub fn iter_pre_order(&self, start: NodeId) -> PreOrderIter<'_, fn(&AlluvialNode) -> bool> {
        PreOrderIter::new(self, start, |_| true)
    }

    /// Pre-order traversal descending only into children accepted by
    /// `filter` (the start node is always yielded).
    pub fn iter_pre_order_filtered<F>(&self, start: NodeId, filter: F) -> PreOrderIter<'_, F>
    where
        F: Fn(&AlluvialNode) -> bool,
    {
        PreOrderIter::new(self, start, filter)
    }

    /// Post-order traversal from `start`.
    pub fn iter_post_order(&self, start: NodeId) -> PostOrderIter<'_, fn(&AlluvialNode) -> bool> {
        PostOrderIter::new(self, start, |_| true)
    }

    /// Post-order traversal with a child-filter predicate.
    pub fn iter_post_order_filtered<F>(&self, start: NodeId, filter: F) -> PostOrderIter<'_, F>
    where
        F: Fn(&AlluvialNode) -> bool,
    {
        PostOrderIter::new(self, start, filter)
    }

    /// Depth-first iteration over the distinct leaf nodes below `start`.
    ///
    /// Descends only into the left branch of each highlight group; left and
    /// right branches carry the same leaves, so this visits each leaf once.
    pub fn leaf_nodes(&self, start: NodeId) -> LeafIter<'_> {
        LeafIter::new(self, start)
    }
}

// Typed payload accessors. Each returns None for a stale index or a kind
// mismatch; mutation paths treat that as an internal inconsistency.
impl AlluvialArena {
    pub fn network_data(&self, idx: NodeId) -> Option<&NetworkData> {
        match &self.nodes.get(idx)?.kind {
            NodeKind::Network(data) => Some(data),
            _ => None,
        }
    }

    pub fn network_data_mut(&mut self, idx: NodeId) -> Option<&mut NetworkData> {
        match &mut self.nodes.get_mut(idx)?.kind {
            NodeKind::Network(data) => Some(data),
            _ => None,
        }
    }

    pub fn module_data(&self, idx: NodeId) -> Option<&ModuleData> {
        match &self.nodes.get(idx)?.kind {
            NodeKind::Module(data) => Some(data),
            _ => None,
        }
    }

    pub fn module_data_mut(&mut self, idx: NodeId) -> Option<&mut ModuleData> {
        match &mut self.nodes.get_mut(idx)?.kind {
            NodeKind::Module(data) => Some(data),
            _ => None,
        }
    }

    pub fn group_data(&self, idx: NodeId) -> Option<&GroupData> {
        match &self.nodes.get(idx)?.kind {
            NodeKind::HighlightGroup(data) => Some(data),
            _ => None,
        }
    }

    pub fn branch_data(&self, idx: NodeId) -> Option<&BranchData> {
        match &self.nodes.get(idx)?.kind {
            NodeKind::Branch(data) => Some(data),
            _ => None,
        }
    }

    pub fn streamline_data(&self, idx: NodeId) -> Option<&StreamlineData> {
        match &self.nodes.get(idx)?.kind {
            NodeKind::Streamline(data) => Some(data),
            _ => None,
        }
    }

    pub fn streamline_data_mut(&mut self, idx: NodeId) -> Option<&mut StreamlineData> {
        match &mut self.nodes.get_mut(idx)?.kind {
            NodeKind::Streamline(data) => Some(data),
            _ => None,
        }
    }

    pub fn leaf_data(&self, idx: NodeId) -> Option<&LeafData> {
        match &self.nodes.get(idx)?.kind {
            NodeKind::Leaf(data) => Some(data),
            _ => None,
        }
    }

    pub fn leaf_data_mut(&mut self, idx: NodeId) -> Option<&mut LeafData> {
        match &mut self.nodes.get_mut(idx)?.kind {
            NodeKind::Leaf(data) => Some(data),
            _ => None,
        }
    }
}

pub struct PreOrderIter<'a, F> {
    arena: &'a AlluvialArena,
    stack: Vec<NodeId>,
    filter: F,
}

impl<'a, F> PreOrderIter<'a, F>
where
    F: Fn(&AlluvialNode) -> bool,
{
    fn new(arena: &'a AlluvialArena, start: NodeId, filter: F) -> Self {
        let stack = if arena.contains(start) {
            vec![start]
        } else {
            Vec::new()
        };
        Self {
            arena,
            stack,
            filter,
        }
    }
}

impl<'a, F> Iterator for PreOrderIter<'a, F>
where
    F: Fn(&AlluvialNode) -> bool,
{
    type Item = (NodeId, &'a AlluvialNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.arena.get(current) {
                // Push children in reverse for left-to-right traversal.
                for &child in node.children.iter().rev() {
                    if self.arena.get(child).is_some_and(|c| (self.filter)(c)) {
                        self.stack.push(child);
                    }
                }
                return Some((current, node));
            }
        }
        None
    }
}

pub struct PostOrderIter<'a, F> {
    arena: &'a AlluvialArena,
    stack: Vec<(NodeId, bool)>,
    filter: F,
}

impl<'a, F> PostOrderIter<'a, F>
where
    F: Fn(&AlluvialNode) -> bool,
{
    fn new(arena: &'a AlluvialArena, start: NodeId, filter: F) -> Self {
        let stack = if arena.contains(start) {
            vec![(start, false)]
        } else {
            Vec::new()
        };
        Self {
            arena,
            stack,
            filter,
        }
    }
}

impl<'a, F> Iterator for PostOrderIter<'a, F>
where
    F: Fn(&AlluvialNode) -> bool,
{
    type Item = (NodeId, &'a AlluvialNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if let Some(node) = self.arena.get(current) {
                if !visited {
                    self.stack.push((current, true));
                    for &child in node.children.iter().rev() {
                        if self.arena.get(child).is_some_and(|c| (self.filter)(c)) {
                            self.stack.push((child, false));
                        }
                    }
                } else {
                    return Some((current, node));
                }
            }
        }
        None
    }
}

pub struct LeafIter<'a> {
    arena: &'a AlluvialArena,
    stack: Vec<NodeId>,
}

impl<'a> LeafIter<'a> {
    fn new(arena: &'a AlluvialArena, start: NodeId) -> Self {
        let stack = if arena.contains(start) {
            vec![start]
        } else {
            Vec::new()
        };
        Self { arena, stack }
    }
}

impl<'a> Iterator for LeafIter<'a> {
    type Item = (NodeId, &'a AlluvialNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            let Some(node) = self.arena.get(current) else {
                continue;
            };
            match &node.kind {
                NodeKind::Leaf(_) => return Some((current, node)),
                NodeKind::HighlightGroup(group) => self.stack.push(group.left),
                _ => {
                    for &child in node.children.iter().rev() {
                        self.stack.push(child);
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(kind: NodeKind) -> AlluvialNode {
        AlluvialNode::new(kind)
    }

    #[test]
    fn test_add_and_remove_child_keep_back_references() {
        let mut arena = AlluvialArena::new();
        let root = arena.insert(plain(NodeKind::Root));
        let a = arena.insert(plain(NodeKind::Root));
        let b = arena.insert(plain(NodeKind::Root));
        arena.add_child(root, a);
        arena.add_child(root, b);

        assert_eq!(arena.parent(a), Some(root));
        assert!(arena.is_first_child(a));
        assert!(arena.is_last_child(b));

        assert!(arena.remove_child(root, a));
        assert_eq!(arena.parent(a), None);
        assert_eq!(arena.children(root), &[b]);
        assert!(!arena.remove_child(root, a));
    }

    #[test]
    fn test_pre_and_post_order_visit_counts() {
        let mut arena = AlluvialArena::new();
        let root = arena.insert(plain(NodeKind::Root));
        let a = arena.insert(plain(NodeKind::Root));
        let b = arena.insert(plain(NodeKind::Root));
        let c = arena.insert(plain(NodeKind::Root));
        arena.add_child(root, a);
        arena.add_child(root, b);
        arena.add_child(a, c);

        let pre: Vec<NodeId> = arena.iter_pre_order(root).map(|(idx, _)| idx).collect();
        assert_eq!(pre, vec![root, a, c, b]);

        let post: Vec<NodeId> = arena.iter_post_order(root).map(|(idx, _)| idx).collect();
        assert_eq!(post, vec![c, a, b, root]);
    }

    #[test]
    fn test_filtered_traversal_prunes_subtrees() {
        let mut arena = AlluvialArena::new();
        let root = arena.insert(plain(NodeKind::Root));
        let net = arena.insert(plain(NodeKind::Branch(BranchData { side: Side::Left })));
        let below = arena.insert(plain(NodeKind::Root));
        arena.add_child(root, net);
        arena.add_child(net, below);

        let visited: Vec<NodeId> = arena
            .iter_pre_order_filtered(root, |n| !matches!(n.kind, NodeKind::Branch(_)))
            .map(|(idx, _)| idx)
            .collect();
        assert_eq!(visited, vec![root]);
    }
}
