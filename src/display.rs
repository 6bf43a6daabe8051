//! Debug rendering of the alluvial tree via `termtree`.

use termtree::Tree;
use tracing::instrument;

use crate::arena::{NodeId, NodeKind};
use crate::diagram::Diagram;

pub trait TreeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

impl TreeConvert for Diagram {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self) -> Tree<String> {
        fn build(diagram: &Diagram, idx: NodeId, parent: &mut Tree<String>) {
            for &child in diagram.arena().children(idx) {
                let mut tree = Tree::new(node_label(diagram, child));
                build(diagram, child, &mut tree);
                parent.push(tree);
            }
        }

        let root = self.root();
        let mut tree = Tree::new(node_label(self, root));
        build(self, root, &mut tree);
        tree
    }
}

fn node_label(diagram: &Diagram, idx: NodeId) -> String {
    let Some(node) = diagram.arena().get(idx) else {
        return "<freed>".to_string();
    };
    match &node.kind {
        NodeKind::Root => format!("diagram flow={:.4}", node.flow),
        NodeKind::Network(data) => {
            format!("network {} flow={:.4}", data.network_id, node.flow)
        }
        NodeKind::Module(data) => {
            format!(
                "module {} level={} flow={:.4}",
                data.module_id, data.module_level, node.flow
            )
        }
        NodeKind::HighlightGroup(data) => {
            format!(
                "group highlight={} insignificant={} flow={:.4}",
                data.highlight_index, data.insignificant, node.flow
            )
        }
        NodeKind::Branch(data) => format!("branch {} flow={:.4}", data.side, node.flow),
        NodeKind::Streamline(data) => format!("streamline {} flow={:.4}", data.id, node.flow),
        NodeKind::Leaf(data) => {
            format!(
                "leaf {} flow={:.4} visible={}",
                data.identifier, data.flow, data.visible
            )
        }
    }
}
