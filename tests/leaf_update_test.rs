//! Tests for per-leaf updates: recoloring, visibility and the rethreading
//! they trigger.

use alluvial::util::testing::init_test_setup;
use alluvial::{Diagram, LayoutOptions, RawNetwork, RawNode, RawPath, NOT_HIGHLIGHTED};

fn node(id: u64, identifier: &str, path: &str, flow: f64) -> RawNode {
    RawNode {
        id,
        flow,
        path: RawPath::from(path),
        name: None,
        identifier: identifier.to_string(),
        state_id: None,
        layer_id: None,
        highlight_index: NOT_HIGHLIGHTED,
        module_level: 1,
        metadata: None,
    }
}

fn network(id: &str, nodes: Vec<RawNode>) -> RawNetwork {
    RawNetwork {
        id: id.to_string(),
        name: id.to_string(),
        codelength: 0.0,
        nodes,
    }
}

fn two_network_diagram() -> Diagram {
    let mut diagram = Diagram::new();
    diagram
        .add_network(network(
            "a",
            vec![node(1, "x", "1:1", 0.6), node(2, "y", "1:2", 0.4)],
        ))
        .unwrap();
    diagram
        .add_network(network(
            "b",
            vec![node(1, "x", "1:1", 0.5), node(2, "y", "1:2", 0.5)],
        ))
        .unwrap();
    diagram
}

fn refresh(diagram: &mut Diagram) {
    diagram.calc_flow();
    diagram.update_layout(&LayoutOptions::default());
}

#[test]
fn given_recolored_leaf_when_links_queried_then_its_streamline_carries_the_color() {
    // Arrange
    init_test_setup();
    let mut diagram = two_network_diagram();
    refresh(&mut diagram);
    // Both leaves share one module pairing before recoloring
    assert_eq!(diagram.links("a", 0.0).unwrap().len(), 1);

    // Act
    diagram.set_leaf_highlight("a", "x", 2).unwrap();
    refresh(&mut diagram);

    // Assert: x split into its own highlight group with its own streamline
    let links = diagram.links("a", 0.0).unwrap();
    assert_eq!(links.len(), 2);
    assert!(links.iter().any(|path| path.highlight_index == 2));
    assert!(links
        .iter()
        .any(|path| path.highlight_index == NOT_HIGHLIGHTED));
}

#[test]
fn given_recolored_leaf_when_recolored_again_then_structure_is_stable() {
    // Arrange
    init_test_setup();
    let mut diagram = two_network_diagram();
    diagram.set_leaf_highlight("a", "x", 2).unwrap();
    refresh(&mut diagram);
    let links_once = diagram.links("a", 0.0).unwrap().len();

    // Act: same classification again is a no-op structurally
    diagram.set_leaf_highlight("a", "x", 2).unwrap();
    refresh(&mut diagram);

    // Assert
    assert_eq!(diagram.links("a", 0.0).unwrap().len(), links_once);
    let net_a = diagram.network("a").unwrap();
    assert_eq!(diagram.arena().num_leaf_nodes(net_a), 2);
}

#[test]
fn given_module_recolor_when_applied_then_every_leaf_moves() {
    // Arrange
    init_test_setup();
    let mut diagram = two_network_diagram();

    // Act
    diagram.color_module("a", "1", 3).unwrap();
    refresh(&mut diagram);

    // Assert: one group again, now highlighted
    let links = diagram.links("a", 0.0).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].highlight_index, 3);
}

#[test]
fn given_hidden_leaf_when_flow_calculated_then_it_contributes_zero() {
    // Arrange
    init_test_setup();
    let mut diagram = two_network_diagram();

    // Act
    diagram.set_leaf_visible("a", "x", false).unwrap();
    diagram.calc_flow();

    // Assert: attached but flowless
    let net_a = diagram.network("a").unwrap();
    let flow_a = diagram.arena().get(net_a).unwrap().flow;
    assert!((flow_a - 0.4).abs() < 1e-12);
    let leaf = diagram.get_leaf(net_a, "x").unwrap();
    assert!(diagram.arena().leaf_data(leaf).unwrap().is_attached());

    // Act: show it again
    diagram.set_leaf_visible("a", "x", true).unwrap();
    diagram.calc_flow();

    // Assert
    let flow_a = diagram.arena().get(net_a).unwrap().flow;
    assert!((flow_a - 1.0).abs() < 1e-12);
}

#[test]
fn given_leaf_removed_on_one_side_when_counterpart_dangles_then_no_duplicate_nodes() {
    // Arrange: x and y sit in different modules of b, so network a holds two
    // right-going streamline nodes with distinct targets
    init_test_setup();
    let mut diagram = Diagram::new();
    diagram
        .add_network(network(
            "a",
            vec![node(1, "x", "1:1", 0.6), node(2, "y", "1:2", 0.4)],
        ))
        .unwrap();
    diagram
        .add_network(network(
            "b",
            vec![node(1, "x", "1:1", 0.5), node(2, "y", "2:1", 0.5)],
        ))
        .unwrap();

    // Act: removing both of b's leaves dangles both of a's streamline nodes
    // onto the same dangling id, which must merge into one node
    diagram.remove_leaf("b", "x").unwrap();
    diagram.remove_leaf("b", "y").unwrap();
    refresh(&mut diagram);

    // Assert
    assert!(diagram.links("a", 0.0).unwrap().is_empty());
    let net_a = diagram.network("a").unwrap();
    assert_eq!(diagram.arena().num_leaf_nodes(net_a), 2);
    // Both of a's leaves now sit on one dangling right-side streamline node
    let x = diagram.get_leaf(net_a, "x").unwrap();
    let y = diagram.get_leaf(net_a, "y").unwrap();
    let x_right = diagram.arena().leaf_data(x).unwrap().side_parent[1];
    let y_right = diagram.arena().leaf_data(y).unwrap().side_parent[1];
    assert!(x_right.is_some());
    assert_eq!(x_right, y_right);
}

#[test]
fn given_detached_opposite_when_adding_then_leaf_dangles_until_readd() {
    // Arrange
    init_test_setup();
    let mut diagram = two_network_diagram();
    diagram.remove_leaf("b", "x").unwrap();

    // Act: rethreading a's x must not match the detached counterpart
    diagram.set_leaf_highlight("a", "x", 1).unwrap();
    refresh(&mut diagram);
    let links_detached = diagram.links("a", 0.0).unwrap().len();

    diagram.add_leaf("b", "x").unwrap();
    refresh(&mut diagram);

    // Assert
    assert_eq!(links_detached, 1);
    assert_eq!(diagram.links("a", 0.0).unwrap().len(), 2);
}
