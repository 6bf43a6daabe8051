//! Module-level layout: sizing, ordering and margins.
//!
//! Runs in two phases per call. Phase one walks each network column:
//! visibility from the flow threshold, metric sort (unless the user pinned a
//! manual order), inter-module margins from path divergence, margin
//! renormalization and optional justify alignment, then module/group/branch
//! rectangles top-down. Phase two orders each branch's streamline nodes by
//! the vertical position of their far endpoint and stacks their rectangles.
//!
//! Must re-run (together with `calc_flow`) after any mutation of flow,
//! visibility, module set or sort order before the tree is presented.

use itertools::Itertools;
use tracing::instrument;

use crate::arena::{Layout, NodeId};
use crate::diagram::Diagram;
use crate::tree_path::TreePath;

/// How to distribute the vertical flow gap left by invisible flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    /// Content stacks from the top; the gap stays at the bottom.
    Bottom,
    /// The gap is redistributed across the margins so visible content
    /// exactly fills the height.
    Justify,
}

/// Which size metric drives module heights and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeMetric {
    Flow,
    Nodes,
}

#[derive(Debug, Clone, Copy)]
pub struct LayoutOptions {
    pub width: f64,
    pub height: f64,
    /// Streamline width as a multiple of module column width.
    pub streamline_fraction: f64,
    /// Margin between adjacent modules is
    /// `2^(margin_exponent − 2·difference_index)`.
    pub margin_exponent: f64,
    pub vertical_align: VerticalAlign,
    pub size_by: SizeMetric,
    /// Modules below this flow are hidden from the layout.
    pub flow_threshold: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 600.0,
            streamline_fraction: 2.0,
            margin_exponent: 5.0,
            vertical_align: VerticalAlign::Bottom,
            size_by: SizeMetric::Flow,
            flow_threshold: 0.0,
        }
    }
}

impl Diagram {
    /// Recomputes every rectangle in the tree. Requires fresh flows
    /// ([`Diagram::calc_flow`]).
    #[instrument(level = "debug", skip(self, opts))]
    pub fn update_layout(&mut self, opts: &LayoutOptions) {
        let networks = self.networks();
        let count = networks.len();
        if count == 0 {
            return;
        }
        let module_width =
            opts.width / (count as f64 + (count as f64 - 1.0) * opts.streamline_fraction);
        let streamline_width = opts.streamline_fraction * module_width;

        let root = self.root();
        if let Some(node) = self.arena.get_mut(root) {
            node.layout = Layout {
                x: 0.0,
                y: 0.0,
                width: opts.width,
                height: opts.height,
            };
        }

        for (position, &network) in networks.iter().enumerate() {
            let x = position as f64 * (module_width + streamline_width);
            if let Some(node) = self.arena.get_mut(network) {
                node.layout = Layout {
                    x,
                    y: 0.0,
                    width: module_width,
                    height: opts.height,
                };
            }
            self.layout_network_column(network, x, module_width, opts);
        }

        // Streamline ordering needs module rectangles on both sides, so it
        // runs after every column is placed.
        for &network in &networks {
            self.layout_streamline_nodes(network, opts);
        }
    }

    fn metric(&self, idx: NodeId, size_by: SizeMetric) -> f64 {
        match size_by {
            SizeMetric::Flow => self.arena.get(idx).map(|n| n.flow).unwrap_or(0.0),
            SizeMetric::Nodes => self.arena.num_leaf_nodes(idx) as f64,
        }
    }

    fn layout_network_column(
        &mut self,
        network: NodeId,
        x: f64,
        module_width: f64,
        opts: &LayoutOptions,
    ) {
        let total = self.metric(network, opts.size_by);

        // Visibility from the flow threshold, regardless of metric.
        let modules = self.arena.children(network).to_vec();
        for &module in &modules {
            let flow = self.arena.get(module).map(|n| n.flow).unwrap_or(0.0);
            let visible = flow > 0.0 && flow >= opts.flow_threshold;
            if let Some(data) = self.arena.module_data_mut(module) {
                data.visible = visible;
                data.margin = 0.0;
            }
            if !visible {
                self.zero_column(module, x, module_width);
            }
        }

        let is_custom_sorted = self
            .arena
            .network_data(network)
            .is_some_and(|data| data.is_custom_sorted);
        if !is_custom_sorted {
            let mut sorted = modules.clone();
            sorted.sort_by(|&a, &b| {
                self.metric(b, opts.size_by)
                    .total_cmp(&self.metric(a, opts.size_by))
                    .then_with(|| {
                        let ia = self.arena.module_data(a).map(|d| d.insertion_index);
                        let ib = self.arena.module_data(b).map(|d| d.insertion_index);
                        ia.cmp(&ib)
                    })
            });
            if let Some(node) = self.arena.get_mut(network) {
                node.children = sorted;
            }
        }

        let ordered: Vec<NodeId> = self
            .arena
            .children(network)
            .iter()
            .copied()
            .filter(|&m| self.arena.module_data(m).is_some_and(|d| d.visible))
            .collect();
        if ordered.is_empty() || total <= 0.0 {
            return;
        }

        // Margins: modules diverging at a shallower level get a bigger gap.
        let paths: Vec<TreePath> = ordered
            .iter()
            .map(|&m| {
                self.arena
                    .module_data(m)
                    .map(|d| d.path.clone())
                    .unwrap_or_else(TreePath::root)
            })
            .collect();
        let mut margins: Vec<f64> = paths
            .iter()
            .tuple_windows()
            .map(|(a, b)| {
                let difference_index = a.difference_index(b);
                2f64.powf(opts.margin_exponent - 2.0 * difference_index as f64)
            })
            .collect();
        let mut total_margin: f64 = margins.iter().sum();
        if total_margin > opts.height * 0.5 {
            let scale = opts.height * 0.5 / total_margin;
            for margin in &mut margins {
                *margin *= scale;
            }
            total_margin = opts.height * 0.5;
        }
        let usable_height = opts.height - total_margin;

        let visible_fraction: f64 = ordered
            .iter()
            .map(|&m| self.metric(m, opts.size_by))
            .sum::<f64>()
            / total;
        if opts.vertical_align == VerticalAlign::Justify && !margins.is_empty() {
            let gap = (1.0 - visible_fraction).max(0.0) * usable_height;
            let extra = gap / margins.len() as f64;
            for margin in &mut margins {
                *margin += extra;
            }
        }

        let mut y = 0.0;
        for (position, &module) in ordered.iter().enumerate() {
            let module_height = self.metric(module, opts.size_by) / total * usable_height;
            let margin = if position < margins.len() {
                margins[position]
            } else {
                0.0
            };
            if let Some(data) = self.arena.module_data_mut(module) {
                data.margin = margin;
            }
            if let Some(node) = self.arena.get_mut(module) {
                node.layout = Layout {
                    x,
                    y,
                    width: module_width,
                    height: module_height,
                };
            }

            let groups = self.arena.children(module).to_vec();
            let mut group_y = y;
            for group in groups {
                let group_height = self.metric(group, opts.size_by) / total * usable_height;
                let rect = Layout {
                    x,
                    y: group_y,
                    width: module_width,
                    height: group_height,
                };
                if let Some(node) = self.arena.get_mut(group) {
                    node.layout = rect;
                }
                for branch in self.arena.children(group).to_vec() {
                    if let Some(node) = self.arena.get_mut(branch) {
                        node.layout = rect;
                    }
                }
                group_y += group_height;
            }

            y += module_height + margin;
        }
    }

    /// Zeroes the rectangles below an invisible module so stale geometry
    /// cannot leak into link extraction.
    fn zero_column(&mut self, module: NodeId, x: f64, module_width: f64) {
        let zero = Layout {
            x,
            y: 0.0,
            width: module_width,
            height: 0.0,
        };
        let below: Vec<NodeId> = self
            .arena
            .iter_pre_order(module)
            .map(|(idx, _)| idx)
            .collect();
        for idx in below {
            if let Some(node) = self.arena.get_mut(idx) {
                node.layout = zero;
            }
        }
    }

    fn layout_streamline_nodes(&mut self, network: NodeId, opts: &LayoutOptions) {
        let modules: Vec<NodeId> = self
            .arena
            .children(network)
            .iter()
            .copied()
            .filter(|&m| self.arena.module_data(m).is_some_and(|d| d.visible))
            .collect();
        for module in modules {
            for group in self.arena.children(module).to_vec() {
                for branch in self.arena.children(group).to_vec() {
                    self.layout_branch(branch, opts);
                }
            }
        }
    }

    fn layout_branch(&mut self, branch: NodeId, opts: &LayoutOptions) {
        // Order by the far endpoint's vertical position so connected
        // streamlines cross minimally; unmatched ones sort first.
        let mut order: Vec<(f64, NodeId)> = self
            .arena
            .children(branch)
            .iter()
            .map(|&sl| (self.opposite_streamline_position(sl), sl))
            .collect();
        order.sort_by(|a, b| a.0.total_cmp(&b.0));
        let ordered: Vec<NodeId> = order.into_iter().map(|(_, sl)| sl).collect();
        if let Some(node) = self.arena.get_mut(branch) {
            node.children = ordered.clone();
        }

        let rect = self
            .arena
            .get(branch)
            .map(|n| n.layout)
            .unwrap_or_default();
        let branch_total: f64 = ordered
            .iter()
            .map(|&sl| self.metric(sl, opts.size_by))
            .sum();
        let mut y = rect.y;
        for streamline in ordered {
            let height = if branch_total > 0.0 {
                self.metric(streamline, opts.size_by) / branch_total * rect.height
            } else {
                0.0
            };
            if let Some(node) = self.arena.get_mut(streamline) {
                node.layout = Layout {
                    x: rect.x,
                    y,
                    width: rect.width,
                    height,
                };
            }
            y += height;
        }
    }

    /// Vertical position of the far endpoint of a streamline node's link;
    /// `NEG_INFINITY` when there is no link or the far module is invisible,
    /// sorting such streamlines first.
    pub(crate) fn opposite_streamline_position(&self, streamline: NodeId) -> f64 {
        use crate::arena::Depth;
        let Some(link_id) = self.arena.streamline_data(streamline).and_then(|s| s.link) else {
            return f64::NEG_INFINITY;
        };
        let Some(counterpart) = self
            .links
            .get(link_id)
            .and_then(|link| link.other(streamline))
        else {
            return f64::NEG_INFINITY;
        };
        let module_visible = self
            .arena
            .ancestor_at_depth(counterpart, Depth::Module)
            .and_then(|m| self.arena.module_data(m))
            .is_some_and(|data| data.visible);
        if !module_visible {
            return f64::NEG_INFINITY;
        }
        self.arena
            .get(counterpart)
            .map(|node| node.layout.y)
            .unwrap_or(f64::NEG_INFINITY)
    }
}
