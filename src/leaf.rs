//! Leaf nodes and the incremental add/remove/update algorithm.
//!
//! A leaf is one underlying entity (paper, actor, ...) present in possibly
//! several networks. `add` threads it into its Module → HighlightGroup →
//! Branch → StreamlineNode chain on both sides, creating missing levels
//! lazily and reconciling with the neighbor network's matching node.
//! `remove` excises it with cascading cleanup of emptied ancestors. Every
//! classification change (recolor, expand/regroup, visibility) is an
//! `update` = remove + add.

use serde_json::Value;
use tracing::{instrument, trace, warn};

use crate::arena::{AlluvialNode, Depth, NodeId, NodeKind};
use crate::diagram::Diagram;
use crate::raw::RawNode;
use crate::side::Side;
use crate::streamline::{StreamlineData, StreamlineHalf, StreamlineId, StreamlineLink};
use crate::tree_path::TreePath;

#[derive(Debug)]
pub struct LeafData {
    /// Cross-network matching key, produced upstream.
    pub identifier: String,
    pub node_id: u64,
    pub state_id: Option<u64>,
    pub layer_id: Option<u64>,
    pub name: String,
    /// Stored leaf weight; contributes to aggregation only while `visible`.
    pub flow: f64,
    pub highlight_index: i32,
    /// Which hierarchy level currently classifies this node; mutated by
    /// expand/regroup.
    pub module_level: usize,
    pub tree_path: TreePath,
    pub visible: bool,
    pub metadata: Option<Value>,
    /// Owning network node.
    pub network: NodeId,
    /// Streamline node this leaf currently belongs to, per side.
    pub side_parent: [Option<NodeId>; 2],
    /// Position within that streamline node's children, for O(1) removal.
    pub side_index: [usize; 2],
    /// Cached matching leaf in each neighbor network; None if none or not
    /// yet looked up.
    pub opposite: [Option<NodeId>; 2],
}

impl LeafData {
    pub fn new(raw: RawNode, tree_path: TreePath, network: NodeId) -> Self {
        let name = raw.name.unwrap_or_else(|| raw.identifier.clone());
        Self {
            identifier: raw.identifier,
            node_id: raw.id,
            state_id: raw.state_id,
            layer_id: raw.layer_id,
            name,
            flow: raw.flow,
            highlight_index: raw.highlight_index,
            module_level: raw.module_level.max(1),
            tree_path,
            visible: true,
            metadata: raw.metadata,
            network,
            side_parent: [None, None],
            side_index: [0, 0],
            opposite: [None, None],
        }
    }

    /// Dotted module path truncated at the current module level.
    pub fn module_id(&self) -> String {
        self.tree_path
            .ancestor_at_level(self.module_level)
            .to_string()
    }

    pub fn insignificant(&self) -> bool {
        !self.tree_path.is_significant(self.module_level)
    }

    pub fn is_attached(&self) -> bool {
        self.side_parent.iter().any(|p| p.is_some())
    }

    pub fn get_opposite(&self, side: Side) -> Option<NodeId> {
        self.opposite[side.as_usize()]
    }
}

impl Diagram {
    /// Threads `leaf` into the tree on both sides.
    #[instrument(level = "trace", skip(self))]
    pub(crate) fn add_leaf_node(&mut self, leaf: NodeId) {
        for side in Side::BOTH {
            self.add_leaf_to_side(leaf, side);
        }
    }

    /// remove + add: re-derives the whole Module → StreamlineNode chain from
    /// the leaf's current classification.
    pub(crate) fn update_leaf(&mut self, leaf: NodeId) {
        self.remove_leaf_node(leaf, false);
        self.add_leaf_node(leaf);
    }

    fn add_leaf_to_side(&mut self, leaf: NodeId, side: Side) {
        let Some(data) = self.arena.leaf_data(leaf) else {
            warn!("add: leaf missing from arena");
            return;
        };
        let network = data.network;
        let identifier = data.identifier.clone();
        let module_id = data.module_id();
        let module_level = data.module_level;
        let highlight_index = data.highlight_index;
        let insignificant = data.insignificant();
        let module_path = data.tree_path.ancestor_at_level(module_level);

        // Resolve the matching leaf in the neighbor network. The pairing is
        // symmetric, so a successful lookup caches both directions.
        let cached = data.get_opposite(side);
        let opposite = match cached {
            Some(opp) => Some(opp),
            None => {
                let found = self
                    .neighbor(network, side)
                    .and_then(|neighbor| self.get_leaf(neighbor, &identifier));
                if let Some(found) = found {
                    if let Some(data) = self.arena.leaf_data_mut(leaf) {
                        data.opposite[side.as_usize()] = Some(found);
                    }
                    if let Some(data) = self.arena.leaf_data_mut(found) {
                        data.opposite[side.opposite().as_usize()] = Some(leaf);
                    }
                }
                found
            }
        };
        // A removed-but-registered opposite counts as absent until re-added.
        let opposite = opposite.filter(|&opp| {
            self.arena
                .leaf_data(opp)
                .is_some_and(|d| d.side_parent[side.opposite().as_usize()].is_some())
        });

        let Some(network_id) = self
            .arena
            .network_data(network)
            .map(|d| d.network_id.clone())
        else {
            warn!("add: leaf's network missing from arena");
            return;
        };

        let module = self.get_or_create_module(network, module_id.clone(), module_level, module_path);
        let group = self.get_or_create_group(module, highlight_index, insignificant);
        let Some(branch) = self.arena.group_data(group).map(|g| g.branch(side)) else {
            warn!("add: highlight group without branches");
            return;
        };

        let source = StreamlineHalf {
            network_id,
            module_id,
            highlight_index,
            insignificant,
            side,
        };
        let target = opposite.and_then(|opp| self.streamline_half_for(opp, side.opposite()));
        let id = StreamlineId { source, target };

        let streamline = match self.get_streamline_node(network, &id) {
            Some(existing) => existing,
            None => self.create_streamline_node(network, branch, id.clone()),
        };

        if let Some(opp) = opposite {
            self.thread_opposite(streamline, &id, opp, side);
        }

        self.attach_leaf(streamline, leaf, side);
        trace!(%id, "leaf attached");
    }

    /// Moves the opposite leaf onto the streamline node mirroring `id` in
    /// the neighbor network and links the two nodes.
    fn thread_opposite(&mut self, streamline: NodeId, id: &StreamlineId, opposite: NodeId, side: Side) {
        let opposite_side = side.opposite();
        let Some(opposite_branch) = self.remove_leaf_from_side(opposite, opposite_side) else {
            warn!("add: matched leaf without a parent branch");
            return;
        };
        let Some(opposite_id) = id.opposite() else {
            warn!("add: matched streamline id without target half");
            return;
        };
        let Some(opposite_network) = self.arena.leaf_data(opposite).map(|d| d.network) else {
            warn!("add: opposite leaf missing from arena");
            return;
        };

        let opposite_streamline = match self.get_streamline_node(opposite_network, &opposite_id) {
            Some(existing) => existing,
            None => self.create_streamline_node(opposite_network, opposite_branch, opposite_id),
        };
        self.attach_leaf(opposite_streamline, opposite, opposite_side);

        let our_link = self.arena.streamline_data(streamline).and_then(|s| s.link);
        let their_link = self
            .arena
            .streamline_data(opposite_streamline)
            .and_then(|s| s.link);
        match (our_link, their_link) {
            (None, None) => {
                let link = self.links.insert(StreamlineLink::from_initiator(
                    streamline,
                    side,
                    opposite_streamline,
                ));
                if let Some(data) = self.arena.streamline_data_mut(streamline) {
                    data.link = Some(link);
                }
                if let Some(data) = self.arena.streamline_data_mut(opposite_streamline) {
                    data.link = Some(link);
                }
            }
            (Some(a), Some(b)) if a == b => {}
            _ => warn!("add: streamline nodes in inconsistent link state"),
        }
    }

    /// Detaches `leaf` from its streamline node on `side`. When the node
    /// empties: its linked counterpart (if any) is made dangling, merging
    /// with an existing dangling node of the same id, and the empty node is
    /// dropped from its branch and the network index. Returns the branch the
    /// leaf was detached from.
    pub(crate) fn remove_leaf_from_side(&mut self, leaf: NodeId, side: Side) -> Option<NodeId> {
        let (streamline, pos) = {
            let data = self.arena.leaf_data(leaf)?;
            (data.side_parent[side.as_usize()]?, data.side_index[side.as_usize()])
        };

        self.detach_leaf(streamline, leaf, side, pos);

        let branch = self.arena.parent(streamline);
        let emptied = self.arena.get(streamline).is_some_and(|n| n.is_empty());
        if emptied {
            self.drop_empty_streamline(streamline, branch);
        }
        branch
    }

    /// Excises `leaf` from both sides with cascading cleanup: an emptied
    /// HighlightGroup leaves its Module, an emptied Module leaves its
    /// Network, and, when `remove_network_if_empty`, an emptied Network
    /// leaves the diagram.
    #[instrument(level = "trace", skip(self))]
    pub(crate) fn remove_leaf_node(&mut self, leaf: NodeId, remove_network_if_empty: bool) {
        let Some(data) = self.arena.leaf_data(leaf) else {
            warn!("remove: leaf missing from arena");
            return;
        };
        if !data.is_attached() {
            return;
        }
        let network = data.network;
        let group = data.side_parent[Side::Left.as_usize()]
            .or(data.side_parent[Side::Right.as_usize()])
            .and_then(|sl| self.arena.ancestor_at_depth(sl, Depth::HighlightGroup));

        self.remove_leaf_from_side(leaf, Side::Left);
        self.remove_leaf_from_side(leaf, Side::Right);

        let Some(group) = group else {
            warn!("remove: attached leaf without a highlight group");
            return;
        };
        let group_empty = self
            .arena
            .children(group)
            .iter()
            .all(|&branch| self.arena.get(branch).is_some_and(|n| n.is_empty()));
        if !group_empty {
            return;
        }

        let Some(module) = self.arena.ancestor_at_depth(group, Depth::Module) else {
            warn!("remove: highlight group without a module");
            return;
        };
        let branches = self.arena.children(group).to_vec();
        self.arena.remove_child(module, group);
        for branch in branches {
            self.arena.remove(branch);
        }
        self.arena.remove(group);

        if !self.arena.get(module).is_some_and(|n| n.is_empty()) {
            return;
        }
        let module_id = self
            .arena
            .module_data(module)
            .map(|d| d.module_id.clone());
        self.arena.remove_child(network, module);
        if let (Some(module_id), Some(net)) = (module_id, self.arena.network_data_mut(network)) {
            net.modules_by_id.remove(&module_id);
        }
        self.arena.remove(module);

        if remove_network_if_empty && self.arena.get(network).is_some_and(|n| n.is_empty()) {
            self.free_network(network);
        }
    }

    /// Detaches an empty network node: clears opposite caches in the other
    /// networks, frees the leaves and removes the network from the diagram.
    pub(crate) fn free_network(&mut self, network: NodeId) {
        let leaves = self
            .arena
            .network_data(network)
            .map(|data| data.leaves.clone())
            .unwrap_or_default();
        let removed: std::collections::HashSet<NodeId> = leaves.iter().copied().collect();

        let others: Vec<NodeId> = self
            .networks()
            .into_iter()
            .filter(|&net| net != network)
            .collect();
        for other in others {
            let other_leaves = self
                .arena
                .network_data(other)
                .map(|data| data.leaves.clone())
                .unwrap_or_default();
            for leaf in other_leaves {
                if let Some(data) = self.arena.leaf_data_mut(leaf) {
                    for side in Side::BOTH {
                        let slot = &mut data.opposite[side.as_usize()];
                        if slot.is_some_and(|opp| removed.contains(&opp)) {
                            *slot = None;
                        }
                    }
                }
            }
        }

        for leaf in leaves {
            self.arena.remove(leaf);
        }
        let root = self.root();
        self.arena.remove_child(root, network);
        self.arena.remove(network);
    }

    // ===== Internals =====

    fn create_streamline_node(
        &mut self,
        network: NodeId,
        branch: NodeId,
        id: StreamlineId,
    ) -> NodeId {
        let node = self
            .arena
            .insert(AlluvialNode::new(NodeKind::Streamline(StreamlineData::new(
                id.clone(),
            ))));
        self.arena.add_child(branch, node);
        self.set_streamline_node(network, id, node);
        node
    }

    fn streamline_half_for(&self, leaf: NodeId, side: Side) -> Option<StreamlineHalf> {
        let data = self.arena.leaf_data(leaf)?;
        let network_id = self
            .arena
            .network_data(data.network)?
            .network_id
            .clone();
        Some(StreamlineHalf {
            network_id,
            module_id: data.module_id(),
            highlight_index: data.highlight_index,
            insignificant: data.insignificant(),
            side,
        })
    }

    fn attach_leaf(&mut self, streamline: NodeId, leaf: NodeId, side: Side) {
        let pos = {
            let Some(node) = self.arena.get_mut(streamline) else {
                warn!("attach: streamline node missing from arena");
                return;
            };
            node.children.push(leaf);
            node.children.len() - 1
        };
        if let Some(data) = self.arena.leaf_data_mut(leaf) {
            data.side_parent[side.as_usize()] = Some(streamline);
            data.side_index[side.as_usize()] = pos;
        }
        if let Some(node) = self.arena.get_mut(leaf) {
            node.parent = Some(streamline);
        }
    }

    fn detach_leaf(&mut self, streamline: NodeId, leaf: NodeId, side: Side, pos: usize) {
        let moved = {
            let node = match self.arena.get_mut(streamline) {
                Some(node) => node,
                None => {
                    warn!("detach: streamline node missing from arena");
                    return;
                }
            };
            let pos = if pos < node.children.len() && node.children[pos] == leaf {
                pos
            } else {
                // Cached position out of sync; recover by scanning.
                warn!("detach: leaf index cache out of sync");
                match node.children.iter().position(|&c| c == leaf) {
                    Some(found) => found,
                    None => return,
                }
            };
            node.children.swap_remove(pos);
            node.children.get(pos).copied().map(|m| (m, pos))
        };
        if let Some((moved, pos)) = moved {
            if let Some(data) = self.arena.leaf_data_mut(moved) {
                data.side_index[side.as_usize()] = pos;
            }
        }
        let other_parent = self
            .arena
            .leaf_data(leaf)
            .and_then(|d| d.side_parent[side.opposite().as_usize()]);
        if let Some(data) = self.arena.leaf_data_mut(leaf) {
            data.side_parent[side.as_usize()] = None;
        }
        if let Some(node) = self.arena.get_mut(leaf) {
            if node.parent == Some(streamline) {
                node.parent = other_parent;
            }
        }
    }

    fn drop_empty_streamline(&mut self, streamline: NodeId, branch: Option<NodeId>) {
        let Some(data) = self.arena.streamline_data(streamline) else {
            return;
        };
        let id = data.id.clone();
        let link = data.link;
        let network = self.arena.ancestor_at_depth(streamline, Depth::Network);

        if let Some(link_id) = link {
            if let Some(link) = self.links.remove(link_id) {
                if let Some(counterpart) = link.other(streamline) {
                    if let Some(data) = self.arena.streamline_data_mut(counterpart) {
                        data.link = None;
                    }
                    self.make_dangling(counterpart);
                }
            }
        }

        if let Some(network) = network {
            self.remove_streamline_node(network, &id);
        }
        if let Some(branch) = branch {
            self.arena.remove_child(branch, streamline);
        }
        self.arena.remove(streamline);
    }

    /// Clears a streamline node's target half after its counterpart went
    /// away, re-indexing it under the dangling id. When another node already
    /// holds that id, the two are merged (children moved over, duplicate
    /// dropped): only ever two nodes, never a chain.
    fn make_dangling(&mut self, streamline: NodeId) {
        let Some(data) = self.arena.streamline_data(streamline) else {
            return;
        };
        if data.id.is_dangling() {
            return;
        }
        let old_id = data.id.clone();
        let new_id = old_id.to_dangling();
        let side = new_id.source.side;
        let Some(network) = self.arena.ancestor_at_depth(streamline, Depth::Network) else {
            warn!("dangling: streamline node without a network");
            return;
        };
        self.remove_streamline_node(network, &old_id);

        if let Some(existing) = self.get_streamline_node(network, &new_id) {
            trace!(id = %new_id, "merging into existing dangling node");
            let orphans = self.arena.children(streamline).to_vec();
            for orphan in orphans {
                self.attach_leaf(existing, orphan, side);
            }
            if let Some(branch) = self.arena.parent(streamline) {
                self.arena.remove_child(branch, streamline);
            }
            self.arena.remove(streamline);
        } else {
            if let Some(data) = self.arena.streamline_data_mut(streamline) {
                data.id = new_id.clone();
            }
            self.set_streamline_node(network, new_id, streamline);
        }
    }
}
