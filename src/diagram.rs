//! Diagram root: the ordered sequence of networks and the operations the
//! presentation layer sequences (add/remove network, flow aggregation,
//! recoloring, visibility, module operations).
//!
//! All mutation is synchronous single-writer: every public method updates
//! the tree and every denormalized index before returning.

use generational_arena::Arena;
use tracing::{debug, instrument, warn};

use crate::arena::{AlluvialArena, AlluvialNode, Depth, NodeId, NodeKind};
use crate::errors::{AlluvialError, AlluvialResult};
use crate::module::{MoveDirection, SimilarModule};
use crate::network::NetworkData;
use crate::raw::RawNetwork;
use crate::side::Side;
use crate::streamline::{StreamlineLink, StreamlinePath};

/// Root of the alluvial tree. Owns the node arena and the link arena.
#[derive(Debug)]
pub struct Diagram {
    pub(crate) arena: AlluvialArena,
    pub(crate) links: Arena<StreamlineLink>,
    root: NodeId,
}

impl Default for Diagram {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagram {
    pub fn new() -> Self {
        let mut arena = AlluvialArena::new();
        let root = arena.insert(AlluvialNode::new(NodeKind::Root));
        Self {
            arena,
            links: Arena::new(),
            root,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Read access to the tree for depth-first rendering traversal.
    pub fn arena(&self) -> &AlluvialArena {
        &self.arena
    }

    /// Network nodes in presentation order (left to right).
    pub fn networks(&self) -> Vec<NodeId> {
        self.arena.children(self.root).to_vec()
    }

    pub fn network(&self, network_id: &str) -> Option<NodeId> {
        self.networks().into_iter().find(|&net| {
            self.arena
                .network_data(net)
                .is_some_and(|data| data.network_id == network_id)
        })
    }

    /// The adjacent network in presentation order, None at the boundary.
    pub fn neighbor(&self, network: NodeId, side: Side) -> Option<NodeId> {
        let networks = self.arena.children(self.root);
        let pos = networks.iter().position(|&net| net == network)?;
        match side {
            Side::Left => pos.checked_sub(1).map(|p| networks[p]),
            Side::Right => networks.get(pos + 1).copied(),
        }
    }

    /// Adds one clustering result as the rightmost network.
    ///
    /// Matching against the neighbor uses whatever neighbor state exists at
    /// call time, so populate a diagram network-by-network in presentation
    /// order. Rerun [`Diagram::calc_flow`] and [`Diagram::update_layout`]
    /// before reading the tree.
    #[instrument(level = "debug", skip(self, raw), fields(network = %raw.id))]
    pub fn add_network(&mut self, raw: RawNetwork) -> AlluvialResult<()> {
        if self.network(&raw.id).is_some() {
            return Err(AlluvialError::DuplicateNetwork(raw.id));
        }
        let data = NetworkData::new(raw.id, raw.name, raw.codelength);
        let network = self.arena.insert(AlluvialNode::new(NodeKind::Network(data)));
        self.arena.add_child(self.root, network);
        self.add_nodes(network, raw.nodes)?;
        debug!(leaves = self.arena.network_data(network).map(|d| d.leaves.len()), "network added");
        Ok(())
    }

    /// Removes a network and every streamline attached to it. Leaves of the
    /// former neighbors become dangling; their opposite caches toward the
    /// removed network are cleared and re-resolved on their next update.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_network(&mut self, network_id: &str) -> AlluvialResult<()> {
        let network = self.require_network(network_id)?;
        let leaves = self
            .arena
            .network_data(network)
            .map(|data| data.leaves.clone())
            .unwrap_or_default();
        for leaf in leaves {
            self.remove_leaf_node(leaf, false);
        }
        self.free_network(network);
        Ok(())
    }

    /// Bottom-up flow aggregation. Leaf flow counts only while visible; a
    /// highlight group's flow is its left branch's flow, since both branches
    /// hold the same underlying leaves.
    #[instrument(level = "trace", skip(self))]
    pub fn calc_flow(&mut self) {
        Self::calc_flow_rec(&mut self.arena, self.root);
    }

    fn calc_flow_rec(arena: &mut AlluvialArena, idx: NodeId) -> f64 {
        let Some(depth) = arena.get(idx).map(|node| node.depth()) else {
            return 0.0;
        };
        let children = arena.children(idx).to_vec();
        let flow = match depth {
            Depth::Leaf => arena
                .leaf_data(idx)
                .map(|data| if data.visible { data.flow } else { 0.0 })
                .unwrap_or(0.0),
            Depth::HighlightGroup => {
                for &child in &children {
                    Self::calc_flow_rec(arena, child);
                }
                arena
                    .group_data(idx)
                    .and_then(|group| arena.get(group.left))
                    .map(|left| left.flow)
                    .unwrap_or(0.0)
            }
            _ => children
                .iter()
                .map(|&child| Self::calc_flow_rec(arena, child))
                .sum(),
        };
        if let Some(node) = arena.get_mut(idx) {
            node.flow = flow;
        }
        flow
    }

    // ===== Mutation entry points used by the presentation layer =====

    /// Recolors one leaf and re-threads its streamlines.
    pub fn set_leaf_highlight(
        &mut self,
        network_id: &str,
        identifier: &str,
        highlight_index: i32,
    ) -> AlluvialResult<()> {
        let leaf = self.require_leaf(network_id, identifier)?;
        if let Some(data) = self.arena.leaf_data_mut(leaf) {
            data.highlight_index = highlight_index;
        }
        self.update_leaf(leaf);
        Ok(())
    }

    /// Shows or hides one leaf; hidden leaves keep their place in the tree
    /// but contribute zero flow.
    pub fn set_leaf_visible(
        &mut self,
        network_id: &str,
        identifier: &str,
        visible: bool,
    ) -> AlluvialResult<()> {
        let leaf = self.require_leaf(network_id, identifier)?;
        if let Some(data) = self.arena.leaf_data_mut(leaf) {
            data.visible = visible;
        }
        self.update_leaf(leaf);
        Ok(())
    }

    /// Detaches one leaf from the tree with cascading cleanup of emptied
    /// ancestors. The leaf stays registered in its network and can be
    /// re-attached with [`Diagram::add_leaf`].
    pub fn remove_leaf(&mut self, network_id: &str, identifier: &str) -> AlluvialResult<()> {
        let leaf = self.require_leaf(network_id, identifier)?;
        self.remove_leaf_node(leaf, false);
        Ok(())
    }

    /// Re-attaches a previously removed leaf at its current classification.
    pub fn add_leaf(&mut self, network_id: &str, identifier: &str) -> AlluvialResult<()> {
        let leaf = self.require_leaf(network_id, identifier)?;
        let attached = self
            .arena
            .leaf_data(leaf)
            .is_some_and(|data| data.side_parent.iter().any(|p| p.is_some()));
        if attached {
            warn!(identifier, "leaf already attached, skipping add");
            return Ok(());
        }
        self.add_leaf_node(leaf);
        Ok(())
    }

    /// Recolors every leaf of a module.
    pub fn color_module(
        &mut self,
        network_id: &str,
        module_id: &str,
        highlight_index: i32,
    ) -> AlluvialResult<()> {
        let module = self.require_module(network_id, module_id)?;
        let leaves: Vec<NodeId> = self
            .arena
            .leaf_nodes(module)
            .map(|(leaf, _)| leaf)
            .collect();
        for &leaf in &leaves {
            if let Some(data) = self.arena.leaf_data_mut(leaf) {
                data.highlight_index = highlight_index;
            }
        }
        for leaf in leaves {
            self.update_leaf(leaf);
        }
        Ok(())
    }

    /// Reveals the next level of sub-clustering for a module. Returns false
    /// (without mutating) when the module has no deeper level to reveal.
    pub fn expand_module(&mut self, network_id: &str, module_id: &str) -> AlluvialResult<bool> {
        let module = self.require_module(network_id, module_id)?;
        Ok(self.expand(module))
    }

    /// Collapses a module and its same-parent siblings one level up. Returns
    /// false when already at the top level.
    pub fn regroup_module(&mut self, network_id: &str, module_id: &str) -> AlluvialResult<bool> {
        let module = self.require_module(network_id, module_id)?;
        Ok(self.regroup(module))
    }

    /// Swaps a module with its neighbor in the network's display order and
    /// pins the network to manual ordering. Returns false at the boundary.
    pub fn move_module(
        &mut self,
        network_id: &str,
        module_id: &str,
        direction: MoveDirection,
    ) -> AlluvialResult<bool> {
        let module = self.require_module(network_id, module_id)?;
        Ok(self.move_module_node(module, direction))
    }

    /// Best similarity matches for a module among the modules it is
    /// connected to on `side`.
    pub fn similar_modules(
        &self,
        network_id: &str,
        module_id: &str,
        side: Side,
        num_modules: usize,
        threshold: f64,
    ) -> AlluvialResult<Vec<SimilarModule>> {
        let module = self.require_module(network_id, module_id)?;
        Ok(self.get_similar_modules(module, side, num_modules, threshold))
    }

    /// Right-going streamline geometry for one network, for drawing.
    pub fn links(&self, network_id: &str, threshold: f64) -> AlluvialResult<Vec<StreamlinePath>> {
        let network = self.require_network(network_id)?;
        Ok(self.network_links(network, threshold))
    }

    // ===== Lookup helpers =====

    pub(crate) fn require_network(&self, network_id: &str) -> AlluvialResult<NodeId> {
        self.network(network_id)
            .ok_or_else(|| AlluvialError::NetworkNotFound(network_id.to_string()))
    }

    pub(crate) fn require_module(
        &self,
        network_id: &str,
        module_id: &str,
    ) -> AlluvialResult<NodeId> {
        let network = self.require_network(network_id)?;
        self.get_module(network, module_id)
            .ok_or_else(|| AlluvialError::ModuleNotFound {
                network: network_id.to_string(),
                module: module_id.to_string(),
            })
    }

    pub(crate) fn require_leaf(
        &self,
        network_id: &str,
        identifier: &str,
    ) -> AlluvialResult<NodeId> {
        let network = self.require_network(network_id)?;
        self.get_leaf(network, identifier)
            .ok_or_else(|| AlluvialError::LeafNotFound {
                network: network_id.to_string(),
                identifier: identifier.to_string(),
            })
    }
}
