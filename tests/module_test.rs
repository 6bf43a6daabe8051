//! Tests for module operations: expand, regroup, manual reordering and
//! similarity matching.

use alluvial::util::testing::init_test_setup;
use alluvial::{
    Diagram, LayoutOptions, MoveDirection, RawNetwork, RawNode, RawPath, Side, NOT_HIGHLIGHTED,
};

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

/// One network with a three-level hierarchy under module 1.
fn deep_diagram() -> Diagram {
    let mut diagram = Diagram::new();
    diagram
        .add_network(network(
            "a",
            vec![
                node(1, "u", "1:1:1", 0.3),
                node(2, "v", "1:1:2", 0.2),
                node(3, "w", "1:2:1", 0.3),
                node(4, "z", "2:1:1", 0.2),
            ],
        ))
        .unwrap();
    diagram
}

#[test]
fn given_expandable_module_when_expanded_then_submodules_appear() {
    // Arrange
    init_test_setup();
    let mut diagram = deep_diagram();
    let net = diagram.network("a").unwrap();
    assert!(diagram.get_module(net, "1").is_some());

    // Act
    let expanded = diagram.expand_module("a", "1").unwrap();

    // Assert
    assert!(expanded);
    assert!(diagram.get_module(net, "1").is_none());
    assert!(diagram.get_module(net, "1:1").is_some());
    assert!(diagram.get_module(net, "1:2").is_some());
    assert!(diagram.get_module(net, "2").is_some());
}

#[test]
fn given_leaf_level_module_when_expanded_then_nothing_changes() {
    // Arrange
    init_test_setup();
    let mut diagram = deep_diagram();
    diagram.expand_module("a", "1").unwrap();

    // Act: the leaves below 1:1 have no deeper level left
    let expanded = diagram.expand_module("a", "1:1").unwrap();

    // Assert
    assert!(!expanded);
    let net = diagram.network("a").unwrap();
    assert!(diagram.get_module(net, "1:1").is_some());
}

#[test]
fn given_expanded_module_when_regrouped_then_expansion_is_undone() {
    // Arrange
    init_test_setup();
    let mut diagram = deep_diagram();
    diagram.expand_module("a", "1").unwrap();
    let net = diagram.network("a").unwrap();

    // Act: regrouping either submodule pulls all siblings back up
    let regrouped = diagram.regroup_module("a", "1:1").unwrap();

    // Assert
    assert!(regrouped);
    assert!(diagram.get_module(net, "1").is_some());
    assert!(diagram.get_module(net, "1:1").is_none());
    assert!(diagram.get_module(net, "1:2").is_none());
}

#[test]
fn given_top_level_module_when_regrouped_then_nothing_changes() {
    // Arrange
    init_test_setup();
    let mut diagram = deep_diagram();

    // Act
    let regrouped = diagram.regroup_module("a", "1").unwrap();

    // Assert
    assert!(!regrouped);
    let net = diagram.network("a").unwrap();
    assert!(diagram.get_module(net, "1").is_some());
}

#[test]
fn given_moved_module_when_layout_runs_then_manual_order_is_kept() {
    // Arrange
    init_test_setup();
    let mut diagram = deep_diagram();
    diagram.calc_flow();
    diagram.update_layout(&LayoutOptions::default());
    let net = diagram.network("a").unwrap();
    let metric_order: Vec<_> = diagram.arena().children(net).to_vec();

    // Act
    let moved = diagram.move_module("a", "1", MoveDirection::Up).unwrap();
    diagram.update_layout(&LayoutOptions::default());

    // Assert: the swap survives the layout pass
    assert!(moved);
    let manual_order: Vec<_> = diagram.arena().children(net).to_vec();
    assert_eq!(manual_order[0], metric_order[1]);
    assert_eq!(manual_order[1], metric_order[0]);
}

#[test]
fn given_module_at_boundary_when_moved_further_then_move_fails() {
    // Arrange
    init_test_setup();
    let mut diagram = deep_diagram();
    diagram.calc_flow();
    diagram.update_layout(&LayoutOptions::default());
    let net = diagram.network("a").unwrap();
    let order_before: Vec<_> = diagram.arena().children(net).to_vec();

    // Act: module "1" sorts first, so it cannot move further down
    let moved = diagram.move_module("a", "1", MoveDirection::Down).unwrap();

    // Assert
    assert!(!moved);
    assert_eq!(diagram.arena().children(net).to_vec(), order_before);
}

#[test]
fn given_expanded_module_when_regrouped_then_metric_sort_resumes() {
    // Arrange
    init_test_setup();
    let mut diagram = deep_diagram();
    diagram.move_module("a", "1", MoveDirection::Up).unwrap();

    // Act: expand/regroup reshuffles modules, so the manual pin is dropped
    diagram.expand_module("a", "1").unwrap();
    diagram.regroup_module("a", "1:1").unwrap();
    diagram.calc_flow();
    diagram.update_layout(&LayoutOptions::default());

    // Assert: metric order is back (module "1" first, flow 0.8 vs 0.2)
    let net = diagram.network("a").unwrap();
    let first = diagram.arena().children(net)[0];
    let first_id = diagram
        .arena()
        .module_data(first)
        .map(|data| data.module_id.clone());
    assert_eq!(first_id.as_deref(), Some("1"));
}

#[test]
fn given_matching_modules_when_similarity_queried_then_identical_scores_one() {
    // Arrange
    init_test_setup();
    let mut diagram = Diagram::new();
    diagram
        .add_network(network(
            "a",
            vec![
                node(1, "x", "1:1", 0.5),
                node(2, "y", "1:2", 0.5),
                node(3, "z", "2:1", 0.5),
            ],
        ))
        .unwrap();
    diagram
        .add_network(network(
            "b",
            vec![
                node(1, "x", "1:1", 0.5),
                node(2, "y", "1:2", 0.5),
                node(4, "w", "2:1", 0.5),
            ],
        ))
        .unwrap();

    // Act
    let matches = diagram
        .similar_modules("a", "1", Side::Right, 5, 0.5)
        .unwrap();

    // Assert
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].network_id, "b");
    assert_eq!(matches[0].module_id, "1");
    assert!((matches[0].similarity - 1.0).abs() < 1e-9);
}

#[test]
fn given_unconnected_module_when_similarity_queried_then_no_matches() {
    // Arrange: z and w share a module id but not an identifier, so no
    // streamline connects the two "2" modules
    init_test_setup();
    let mut diagram = Diagram::new();
    diagram
        .add_network(network("a", vec![node(3, "z", "2:1", 0.5)]))
        .unwrap();
    diagram
        .add_network(network("b", vec![node(4, "w", "2:1", 0.5)]))
        .unwrap();

    // Act
    let matches = diagram
        .similar_modules("a", "2", Side::Right, 5, 0.0)
        .unwrap();

    // Assert
    assert!(matches.is_empty());
}
