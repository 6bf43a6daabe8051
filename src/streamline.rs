//! Streamline identity and geometry.
//!
//! A streamline node bundles the leaf nodes sharing one `(module, highlight,
//! significance, side)` classification at one network boundary. Its identity
//! is the structured [`StreamlineId`]: the local half plus, when matched, the
//! neighbor's corresponding half. A dangling node (no current counterpart)
//! has no target half.

use std::fmt;

use generational_arena::Index;
use serde::Serialize;

use crate::arena::{Layout, NodeId};
use crate::side::Side;

/// Arena handle for a streamline link.
pub type LinkId = Index;

/// One endpoint's share of a streamline id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamlineHalf {
    pub network_id: String,
    pub module_id: String,
    pub highlight_index: i32,
    pub insignificant: bool,
    pub side: Side,
}

impl fmt::Display for StreamlineHalf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_module{}_group{}{}_{}",
            self.network_id,
            self.module_id,
            if self.insignificant { "i" } else { "" },
            self.highlight_index,
            self.side
        )
    }
}

/// Composite streamline-node key, unique within a network.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamlineId {
    pub source: StreamlineHalf,
    /// The matched neighbor half; None while dangling.
    pub target: Option<StreamlineHalf>,
}

impl StreamlineId {
    pub fn dangling(source: StreamlineHalf) -> Self {
        Self {
            source,
            target: None,
        }
    }

    pub fn is_dangling(&self) -> bool {
        self.target.is_none()
    }

    /// The id of the counterpart node in the neighbor network, if matched.
    pub fn opposite(&self) -> Option<StreamlineId> {
        self.target.as_ref().map(|target| StreamlineId {
            source: target.clone(),
            target: Some(self.source.clone()),
        })
    }

    /// This id with the target half cleared.
    pub fn to_dangling(&self) -> StreamlineId {
        StreamlineId::dangling(self.source.clone())
    }
}

impl fmt::Display for StreamlineId {
    /// Legacy `source--target` / `source--NULL` rendering, used in logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{}--{}", self.source, target),
            None => write!(f, "{}--NULL", self.source),
        }
    }
}

/// Payload of a streamline tree node.
#[derive(Debug)]
pub struct StreamlineData {
    pub id: StreamlineId,
    /// At most one link to the symmetric node in the neighbor network.
    pub link: Option<LinkId>,
}

impl StreamlineData {
    pub fn new(id: StreamlineId) -> Self {
        Self { id, link: None }
    }

    pub fn side(&self) -> Side {
        self.id.source.side
    }
}

/// Pairing of two matched streamline nodes in adjacent networks, in network
/// order (`left` belongs to the earlier network).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamlineLink {
    pub left: NodeId,
    pub right: NodeId,
}

impl StreamlineLink {
    /// Orients the pair by which side initiated the link: a node linking
    /// through its right branch is the left endpoint.
    pub fn from_initiator(node: NodeId, side: Side, opposite: NodeId) -> Self {
        match side {
            Side::Right => Self {
                left: node,
                right: opposite,
            },
            Side::Left => Self {
                left: opposite,
                right: node,
            },
        }
    }

    /// The endpoint on the other side of `node`, if `node` is an endpoint.
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if node == self.left {
            Some(self.right)
        } else if node == self.right {
            Some(self.left)
        } else {
            None
        }
    }
}

/// Derived streamline geometry between two laid-out endpoints.
///
/// `(x0, y0, h0)` is the right edge of the left network's column, `(x1, y1,
/// h1)` the left edge of the right network's column. The drawing layer turns
/// these into two cubic beziers (top and bottom edge) via
/// [`StreamlinePath::x_mid`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StreamlinePath {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
    pub h0: f64,
    pub h1: f64,
    pub highlight_index: i32,
}

impl StreamlinePath {
    pub fn from_layouts(left: &Layout, right: &Layout, highlight_index: i32) -> Self {
        Self {
            x0: left.x + left.width,
            x1: right.x,
            y0: left.y,
            y1: right.y,
            h0: left.height,
            h1: right.height,
            highlight_index,
        }
    }

    pub fn avg_height(&self) -> f64 {
        (self.h0 + self.h1) / 2.0
    }

    /// Horizontal bezier control abscissa shared by both edge curves.
    pub fn x_mid(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }

    /// Collapsed variant anchored at each endpoint's vertical midpoint, used
    /// as the from/to shape when a streamline appears or disappears.
    pub fn transition_path(&self) -> StreamlinePath {
        Self {
            x0: self.x0,
            x1: self.x1,
            y0: self.y0 + self.h0 / 2.0,
            y1: self.y1 + self.h1 / 2.0,
            h0: 0.0,
            h1: 0.0,
            highlight_index: self.highlight_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn half(network: &str, side: Side) -> StreamlineHalf {
        StreamlineHalf {
            network_id: network.to_string(),
            module_id: "1".to_string(),
            highlight_index: -1,
            insignificant: false,
            side,
        }
    }

    #[test]
    fn test_opposite_id_swaps_halves() {
        let id = StreamlineId {
            source: half("a", Side::Right),
            target: Some(half("b", Side::Left)),
        };
        let opposite = id.opposite().unwrap();
        assert_eq!(opposite.source, half("b", Side::Left));
        assert_eq!(opposite.target, Some(half("a", Side::Right)));
    }

    #[test]
    fn test_dangling_id_has_no_opposite() {
        let id = StreamlineId::dangling(half("a", Side::Right));
        assert!(id.is_dangling());
        assert!(id.opposite().is_none());
        assert!(id.to_string().ends_with("--NULL"));
    }
}
