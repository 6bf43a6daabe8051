//! Incremental data structure behind alluvial diagrams of hierarchical
//! clusterings: an ordered sequence of networks whose modules are connected
//! by streamlines wherever the same underlying node appears on both sides.
//!
//! The tree is mutable in place. Feed each clustering result in with
//! [`Diagram::add_network`], mutate via the leaf/module operations, then run
//! [`Diagram::calc_flow`] and [`Diagram::update_layout`] and read the
//! rectangles and [`Diagram::links`] back out for drawing.

pub mod arena;
pub mod diagram;
pub mod display;
pub mod errors;
pub mod layout;
pub mod leaf;
pub mod module;
pub mod network;
pub mod raw;
pub mod side;
pub mod streamline;
pub mod tree_path;
pub mod util;

pub use arena::{AlluvialArena, AlluvialNode, Depth, Layout, NodeId, NodeKind};
pub use diagram::Diagram;
pub use display::TreeConvert;
pub use errors::{AlluvialError, AlluvialResult};
pub use layout::{LayoutOptions, SizeMetric, VerticalAlign};
pub use module::{MoveDirection, SimilarModule};
pub use raw::{RawNetwork, RawNode, RawPath, NOT_HIGHLIGHTED};
pub use side::Side;
pub use streamline::{StreamlineId, StreamlinePath};
pub use tree_path::TreePath;
