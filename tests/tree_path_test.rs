//! Tests for module path parsing and ancestry.

use std::str::FromStr;

use rstest::rstest;

use alluvial::TreePath;

#[rstest]
#[case("root", 0)]
#[case("", 0)]
#[case("1", 1)]
#[case("1:2:3", 3)]
#[case("1;2;3", 3)]
fn given_path_string_when_parsed_then_level_matches(#[case] input: &str, #[case] level: usize) {
    let path = TreePath::from_str(input).unwrap();
    assert_eq!(path.level(), level);
}

#[rstest]
#[case("1:x")]
#[case("1::2")]
#[case(":1")]
#[case("1:")]
fn given_malformed_path_when_parsed_then_errors(#[case] input: &str) {
    assert!(TreePath::from_str(input).is_err());
}

#[test]
fn given_nested_paths_when_checking_ancestry_then_prefixes_match() {
    // Arrange
    let root = TreePath::root();
    let parent: TreePath = "1:2".parse().unwrap();
    let child: TreePath = "1:2:3".parse().unwrap();
    let other: TreePath = "1:3".parse().unwrap();

    // Act / Assert
    assert!(root.is_ancestor(&child));
    assert!(parent.is_ancestor(&child));
    assert!(parent.is_ancestor(&parent));
    assert!(!parent.is_ancestor(&other));
    assert_eq!(child.ancestor_at_level(2), parent);
}

#[rstest]
#[case("1:2:3", "1:2:4", 2)]
#[case("1:2", "1:3", 1)]
#[case("1:2", "2:2", 0)]
#[case("1:2", "1:2", 2)]
fn given_two_paths_when_diffed_then_divergence_level_matches(
    #[case] a: &str,
    #[case] b: &str,
    #[case] expected: usize,
) {
    let a: TreePath = a.parse().unwrap();
    let b: TreePath = b.parse().unwrap();
    assert_eq!(a.difference_index(&b), expected);
    assert_eq!(b.difference_index(&a), expected);
}
