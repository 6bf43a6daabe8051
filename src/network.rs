//! Network nodes: one clustering result each, with the derived indices
//! (identifier → leaf, module id → module, streamline id → streamline node)
//! that every mutation keeps in sync with the tree.

use std::collections::HashMap;

use itertools::Itertools;
use tracing::instrument;

use crate::arena::{AlluvialNode, NodeId, NodeKind};
use crate::diagram::Diagram;
use crate::errors::AlluvialResult;
use crate::leaf::LeafData;
use crate::raw::RawNode;
use crate::streamline::{StreamlineId, StreamlinePath};

#[derive(Debug)]
pub struct NetworkData {
    pub network_id: String,
    pub name: String,
    pub codelength: f64,
    /// Cross-network matching index. Cleared and rebuilt by `add_nodes`.
    pub nodes_by_identifier: HashMap<String, NodeId>,
    /// Kept in sync by module creation/removal.
    pub modules_by_id: HashMap<String, NodeId>,
    /// Network-scoped streamline-node cache.
    pub streamlines_by_id: HashMap<StreamlineId, NodeId>,
    /// Set by manual module reordering; suppresses the automatic
    /// sort-by-metric in the layout pass.
    pub is_custom_sorted: bool,
    /// Every leaf of this network, attached or not, for its lifetime.
    pub leaves: Vec<NodeId>,
    /// Monotonic counter backing module insertion-order tiebreaks.
    pub module_counter: usize,
}

impl NetworkData {
    pub fn new(network_id: String, name: String, codelength: f64) -> Self {
        Self {
            network_id,
            name,
            codelength,
            nodes_by_identifier: HashMap::new(),
            modules_by_id: HashMap::new(),
            streamlines_by_id: HashMap::new(),
            is_custom_sorted: false,
            leaves: Vec::new(),
            module_counter: 0,
        }
    }
}

impl Diagram {
    /// Builds a leaf per raw node, registers all of them in the identifier
    /// index, then threads each into the tree. Registration happens before
    /// any `add` so same-network ordering cannot affect matching.
    #[instrument(level = "debug", skip(self, nodes))]
    pub(crate) fn add_nodes(&mut self, network: NodeId, nodes: Vec<RawNode>) -> AlluvialResult<()> {
        if let Some(data) = self.arena.network_data_mut(network) {
            data.nodes_by_identifier.clear();
            data.leaves.clear();
        }

        let mut built = Vec::with_capacity(nodes.len());
        for raw in nodes {
            let tree_path = raw.path.to_tree_path()?;
            let identifier = raw.identifier.clone();
            let data = LeafData::new(raw, tree_path, network);
            let leaf = self.arena.insert(AlluvialNode::new(NodeKind::Leaf(data)));
            if let Some(net) = self.arena.network_data_mut(network) {
                net.nodes_by_identifier.insert(identifier, leaf);
                net.leaves.push(leaf);
            }
            built.push(leaf);
        }

        for leaf in built {
            self.add_leaf_node(leaf);
        }
        Ok(())
    }

    pub fn get_module(&self, network: NodeId, module_id: &str) -> Option<NodeId> {
        self.arena
            .network_data(network)?
            .modules_by_id
            .get(module_id)
            .copied()
    }

    pub fn get_leaf(&self, network: NodeId, identifier: &str) -> Option<NodeId> {
        self.arena
            .network_data(network)?
            .nodes_by_identifier
            .get(identifier)
            .copied()
    }

    pub(crate) fn get_streamline_node(&self, network: NodeId, id: &StreamlineId) -> Option<NodeId> {
        self.arena
            .network_data(network)?
            .streamlines_by_id
            .get(id)
            .copied()
    }

    pub(crate) fn set_streamline_node(&mut self, network: NodeId, id: StreamlineId, node: NodeId) {
        if let Some(data) = self.arena.network_data_mut(network) {
            data.streamlines_by_id.insert(id, node);
        }
    }

    pub(crate) fn remove_streamline_node(&mut self, network: NodeId, id: &StreamlineId) {
        if let Some(data) = self.arena.network_data_mut(network) {
            data.streamlines_by_id.remove(id);
        }
    }

    /// Right-going streamline geometry with `avg_height` above `threshold`,
    /// sorted by `(highlight_index, -avg_height)` for drawing z-order.
    pub(crate) fn network_links(&self, network: NodeId, threshold: f64) -> Vec<StreamlinePath> {
        let mut paths = Vec::new();
        for &module in self.arena.children(network) {
            for &group in self.arena.children(module) {
                let Some(group_data) = self.arena.group_data(group) else {
                    continue;
                };
                for &streamline in self.arena.children(group_data.right) {
                    let Some(link_id) = self.arena.streamline_data(streamline).and_then(|s| s.link)
                    else {
                        continue;
                    };
                    let Some(link) = self.links.get(link_id) else {
                        continue;
                    };
                    let (Some(left), Some(right)) =
                        (self.arena.get(link.left), self.arena.get(link.right))
                    else {
                        continue;
                    };
                    let path = StreamlinePath::from_layouts(
                        &left.layout,
                        &right.layout,
                        group_data.highlight_index,
                    );
                    if path.avg_height() > threshold {
                        paths.push(path);
                    }
                }
            }
        }
        paths
            .into_iter()
            .sorted_by(|a, b| {
                a.highlight_index
                    .cmp(&b.highlight_index)
                    .then_with(|| b.avg_height().total_cmp(&a.avg_height()))
            })
            .collect()
    }
}
