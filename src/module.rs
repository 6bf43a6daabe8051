//! Module nodes: one cluster at some hierarchy level, plus the interactive
//! operations on clusters (expand, regroup, reorder, similarity matching).

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use tracing::{instrument, warn};

use crate::arena::{AlluvialNode, BranchData, Depth, GroupData, NodeId, NodeKind};
use crate::diagram::Diagram;
use crate::side::Side;
use crate::streamline::LinkId;
use crate::tree_path::TreePath;

#[derive(Debug)]
pub struct ModuleData {
    /// Dotted path string, unique within the network at any moment.
    pub module_id: String,
    pub path: TreePath,
    /// Depth in the clustering hierarchy this module groups at.
    pub module_level: usize,
    /// Creation order within the network; tiebreak for metric sorting.
    pub insertion_index: usize,
    /// Set by the layout pass from the flow threshold.
    pub visible: bool,
    /// Gap below this module, assigned by the layout pass.
    pub margin: f64,
}

/// Direction for manual module reordering; `Up` is toward the higher child
/// index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// One similarity match produced by [`Diagram::similar_modules`].
#[derive(Debug, Clone)]
pub struct SimilarModule {
    pub module: NodeId,
    pub module_id: String,
    pub network_id: String,
    pub similarity: f64,
}

impl PartialEq for SimilarModule {
    fn eq(&self, other: &Self) -> bool {
        self.similarity == other.similarity
    }
}

impl Eq for SimilarModule {}

impl PartialOrd for SimilarModule {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimilarModule {
    fn cmp(&self, other: &Self) -> Ordering {
        self.similarity.total_cmp(&other.similarity)
    }
}

impl Diagram {
    pub(crate) fn get_or_create_module(
        &mut self,
        network: NodeId,
        module_id: String,
        module_level: usize,
        path: TreePath,
    ) -> NodeId {
        if let Some(existing) = self.get_module(network, &module_id) {
            return existing;
        }
        let insertion_index = match self.arena.network_data_mut(network) {
            Some(data) => {
                let index = data.module_counter;
                data.module_counter += 1;
                index
            }
            None => 0,
        };
        let module = self
            .arena
            .insert(AlluvialNode::new(NodeKind::Module(ModuleData {
                module_id: module_id.clone(),
                path,
                module_level,
                insertion_index,
                visible: true,
                margin: 0.0,
            })));
        self.arena.add_child(network, module);
        if let Some(data) = self.arena.network_data_mut(network) {
            data.modules_by_id.insert(module_id, module);
        }
        module
    }

    /// Finds or lazily creates the `(highlight_index, insignificant)` group;
    /// both branches are created with the group and live for its lifetime.
    pub(crate) fn get_or_create_group(
        &mut self,
        module: NodeId,
        highlight_index: i32,
        insignificant: bool,
    ) -> NodeId {
        for &group in self.arena.children(module) {
            if self.arena.group_data(group).is_some_and(|data| {
                data.highlight_index == highlight_index && data.insignificant == insignificant
            }) {
                return group;
            }
        }
        let left = self
            .arena
            .insert(AlluvialNode::new(NodeKind::Branch(BranchData {
                side: Side::Left,
            })));
        let right = self
            .arena
            .insert(AlluvialNode::new(NodeKind::Branch(BranchData {
                side: Side::Right,
            })));
        let group = self
            .arena
            .insert(AlluvialNode::new(NodeKind::HighlightGroup(GroupData {
                highlight_index,
                insignificant,
                left,
                right,
            })));
        self.arena.add_child(module, group);
        self.arena.add_child(group, left);
        self.arena.add_child(group, right);
        group
    }

    /// Raises every contained leaf one module level and rethreads it,
    /// revealing the next level of sub-clustering.
    #[instrument(level = "debug", skip(self))]
    pub(crate) fn expand(&mut self, module: NodeId) -> bool {
        let leaves: Vec<NodeId> = self.arena.leaf_nodes(module).map(|(leaf, _)| leaf).collect();
        if leaves.is_empty() {
            warn!("expand: module has no leaf nodes");
            return false;
        }
        let Some(module_level) = self.arena.module_data(module).map(|d| d.module_level) else {
            warn!("expand: module missing from arena");
            return false;
        };
        let target_level = module_level + 1;
        let blocked = leaves.iter().any(|&leaf| {
            self.arena
                .leaf_data(leaf)
                .is_some_and(|data| data.tree_path.level() <= target_level)
        });
        if blocked {
            warn!(module_level, "expand: no deeper level to reveal");
            return false;
        }

        let network = self.arena.leaf_data(leaves[0]).map(|d| d.network);
        for &leaf in &leaves {
            if let Some(data) = self.arena.leaf_data_mut(leaf) {
                data.module_level += 1;
            }
        }
        for leaf in leaves {
            self.update_leaf(leaf);
        }
        if let Some(data) = network.and_then(|net| self.arena.network_data_mut(net)) {
            data.is_custom_sorted = false;
        }
        true
    }

    /// Lowers this module and every sibling sharing its parent path back to
    /// the coarser level.
    #[instrument(level = "debug", skip(self))]
    pub(crate) fn regroup(&mut self, module: NodeId) -> bool {
        let Some((module_level, parent_path)) = self
            .arena
            .module_data(module)
            .map(|d| (d.module_level, d.path.ancestor_at_level(d.module_level - 1)))
        else {
            warn!("regroup: module missing from arena");
            return false;
        };
        if module_level <= 1 {
            warn!("regroup: already at the top level");
            return false;
        }
        let Some(network) = self.arena.parent(module) else {
            warn!("regroup: module without a network");
            return false;
        };

        let siblings: Vec<NodeId> = self
            .arena
            .children(network)
            .iter()
            .copied()
            .filter(|&m| {
                self.arena.module_data(m).is_some_and(|data| {
                    data.module_level == module_level && parent_path.is_ancestor(&data.path)
                })
            })
            .collect();
        let leaves: Vec<NodeId> = siblings
            .iter()
            .flat_map(|&m| self.arena.leaf_nodes(m).map(|(leaf, _)| leaf))
            .collect();
        if leaves.is_empty() {
            warn!("regroup: no leaf nodes found");
            return false;
        }

        for &leaf in &leaves {
            if let Some(data) = self.arena.leaf_data_mut(leaf) {
                data.module_level -= 1;
            }
        }
        for leaf in leaves {
            self.update_leaf(leaf);
        }
        if let Some(data) = self.arena.network_data_mut(network) {
            data.is_custom_sorted = false;
        }
        true
    }

    /// Swaps the module with its neighbor in the network's child order and
    /// pins manual ordering. Fails at the boundary.
    pub(crate) fn move_module_node(&mut self, module: NodeId, direction: MoveDirection) -> bool {
        let Some(network) = self.arena.parent(module) else {
            warn!("move: module without a network");
            return false;
        };
        let children = self.arena.children(network);
        let Some(pos) = children.iter().position(|&m| m == module) else {
            warn!("move: module not among its network's children");
            return false;
        };
        let target = match direction {
            MoveDirection::Up => pos + 1,
            MoveDirection::Down => match pos.checked_sub(1) {
                Some(target) => target,
                None => {
                    warn!("move: already at the boundary");
                    return false;
                }
            },
        };
        if target >= children.len() {
            warn!("move: already at the boundary");
            return false;
        }
        if let Some(node) = self.arena.get_mut(network) {
            node.children.swap(pos, target);
        }
        if let Some(data) = self.arena.network_data_mut(network) {
            data.is_custom_sorted = true;
        }
        true
    }

    /// Up to `num_modules` best matches among the visible modules connected
    /// to this one by streamlines on `side`, scored by 1 − Jensen–Shannon
    /// divergence of the leaf-flow distributions over the identifier union.
    /// Matches at or below `threshold` are dropped.
    pub(crate) fn get_similar_modules(
        &self,
        module: NodeId,
        side: Side,
        num_modules: usize,
        threshold: f64,
    ) -> Vec<SimilarModule> {
        let mut candidates: HashSet<NodeId> = HashSet::new();
        for &group in self.arena.children(module) {
            let Some(branch) = self.arena.group_data(group).map(|g| g.branch(side)) else {
                continue;
            };
            for &streamline in self.arena.children(branch) {
                let Some(link_id) = self.arena.streamline_data(streamline).and_then(|s| s.link)
                else {
                    continue;
                };
                let Some(counterpart) = self
                    .links
                    .get(link_id)
                    .and_then(|link| link.other(streamline))
                else {
                    continue;
                };
                let Some(candidate) = self.arena.ancestor_at_depth(counterpart, Depth::Module)
                else {
                    continue;
                };
                if self
                    .arena
                    .module_data(candidate)
                    .is_some_and(|data| data.visible)
                {
                    candidates.insert(candidate);
                }
            }
        }

        let own = self.flow_distribution(module);
        // Bounded min-heap keeps only the best num_modules candidates.
        let mut best: BinaryHeap<std::cmp::Reverse<SimilarModule>> = BinaryHeap::new();
        for candidate in candidates {
            let similarity = 1.0 - jensen_shannon(&own, &self.flow_distribution(candidate));
            if similarity <= threshold {
                continue;
            }
            let (Some(module_data), Some(network_data)) = (
                self.arena.module_data(candidate),
                self.arena
                    .ancestor_at_depth(candidate, Depth::Network)
                    .and_then(|net| self.arena.network_data(net)),
            ) else {
                continue;
            };
            best.push(std::cmp::Reverse(SimilarModule {
                module: candidate,
                module_id: module_data.module_id.clone(),
                network_id: network_data.network_id.clone(),
                similarity,
            }));
            if best.len() > num_modules {
                best.pop();
            }
        }

        let mut matches: Vec<SimilarModule> =
            best.into_iter().map(|reverse| reverse.0).collect();
        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        matches
    }

    /// Streamline links leaving this module to the right whose far endpoint
    /// lies in a currently visible module.
    pub fn right_streamlines(&self, module: NodeId) -> Vec<LinkId> {
        let mut links = Vec::new();
        for &group in self.arena.children(module) {
            let Some(branch) = self.arena.group_data(group).map(|g| g.branch(Side::Right)) else {
                continue;
            };
            for &streamline in self.arena.children(branch) {
                let Some(link_id) = self.arena.streamline_data(streamline).and_then(|s| s.link)
                else {
                    continue;
                };
                let counterpart_visible = self
                    .links
                    .get(link_id)
                    .and_then(|link| link.other(streamline))
                    .and_then(|other| self.arena.ancestor_at_depth(other, Depth::Module))
                    .and_then(|m| self.arena.module_data(m))
                    .is_some_and(|data| data.visible);
                if counterpart_visible {
                    links.push(link_id);
                }
            }
        }
        links
    }

    /// Normalized leaf-flow-by-identifier distribution of a module.
    fn flow_distribution(&self, module: NodeId) -> HashMap<String, f64> {
        let mut dist = HashMap::new();
        let mut total = 0.0;
        for (_, node) in self.arena.leaf_nodes(module) {
            if let NodeKind::Leaf(data) = &node.kind {
                *dist.entry(data.identifier.clone()).or_insert(0.0) += data.flow;
                total += data.flow;
            }
        }
        if total > 0.0 {
            for value in dist.values_mut() {
                *value /= total;
            }
        }
        dist
    }
}

/// Jensen–Shannon divergence (log base 2, range [0, 1]) over the union of
/// keys; missing entries count as zero mass.
fn jensen_shannon(p: &HashMap<String, f64>, q: &HashMap<String, f64>) -> f64 {
    let keys: HashSet<&String> = p.keys().chain(q.keys()).collect();
    let mut divergence = 0.0;
    for key in keys {
        let pi = p.get(key).copied().unwrap_or(0.0);
        let qi = q.get(key).copied().unwrap_or(0.0);
        let mi = (pi + qi) / 2.0;
        if pi > 0.0 {
            divergence += 0.5 * pi * (pi / mi).log2();
        }
        if qi > 0.0 {
            divergence += 0.5 * qi * (qi / mi).log2();
        }
    }
    divergence
}
