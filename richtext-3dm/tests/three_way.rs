//! Three-way sessions end to end: conflict verdicts and merged documents.

use richtext_3dm::{
    is_same_node, normalize_markup, parse_str, print_to_string, ConflictState, ConflictType,
    DiffConfig, EditType, ThreeWayDiff,
};

fn session(origin: &str, left: &str, right: &str) -> ThreeWayDiff {
    ThreeWayDiff::from_markup(origin, left, right).unwrap()
}

fn assert_merges(origin: &str, left: &str, right: &str, expected: &str) -> ThreeWayDiff {
    let diff = session(origin, left, right);
    assert!(
        !diff.is_conflicting(),
        "unexpected conflicts: {:?}",
        diff.conflict_log().conflicts()
    );
    assert_eq!(normalize_markup(&diff.merged_markup()), normalize_markup(expected));
    diff
}

#[test]
fn test_unchanged_descendants() {
    let doc = "<p>One <b>two</b></p><p>Three</p>";
    let diff = assert_merges(doc, doc, doc, doc);
    assert!(diff.entries().is_empty());
    assert_eq!(diff.edit_log().edit_count(), 0);
}

#[test]
fn test_only_left_changed() {
    assert_merges(
        "<p>One</p><p>Two</p>",
        "<p>One more</p><p>Two</p>",
        "<p>One</p><p>Two</p>",
        "<p>One more</p><p>Two</p>",
    );
}

#[test]
fn test_only_right_changed() {
    let diff = assert_merges(
        "<p>One</p><p>Two</p>",
        "<p>One</p><p>Two</p>",
        "<p>One</p><p>Two more</p>",
        "<p>One</p><p>Two more</p>",
    );
    assert_eq!(diff.edit_log().count_by_type(EditType::Insert), 2);
}

#[test]
fn test_deletions_in_different_paragraphs() {
    assert_merges(
        "<p>One two</p><p>Three four</p>",
        "<p>One</p><p>Three four</p>",
        "<p>One two</p><p>Three</p>",
        "<p>One</p><p>Three</p>",
    );
}

#[test]
fn test_addition_and_deletion_in_different_paragraphs() {
    assert_merges(
        "<p>One</p><p>Two three</p>",
        "<p>One more</p><p>Two three</p>",
        "<p>One</p><p>Two</p>",
        "<p>One more</p><p>Two</p>",
    );
}

#[test]
fn test_paragraphs_inserted_at_different_locations() {
    assert_merges(
        "<p>A</p><p>B</p>",
        "<p>X</p><p>A</p><p>B</p>",
        "<p>A</p><p>B</p><p>Y</p>",
        "<p>X</p><p>A</p><p>B</p><p>Y</p>",
    );
}

#[test]
fn test_paragraphs_inserted_at_same_location() {
    let diff = session(
        "<p>A</p><p>B</p>",
        "<p>A</p><p>X</p><p>B</p>",
        "<p>A</p><p>Y</p><p>B</p>",
    );
    assert!(diff.is_conflicting());
    assert!(diff.conflict_log().count_by_type(ConflictType::Insertion) >= 1);
}

#[test]
fn test_identical_edits_are_pseudo_conflicts() {
    assert_merges(
        "<p>One two</p><p>Three</p>",
        "<p>One three</p><p>Three</p><p>Four</p>",
        "<p>One three</p><p>Three</p><p>Four</p>",
        "<p>One three</p><p>Three</p><p>Four</p>",
    );
}

#[test]
fn test_different_edits_in_same_paragraph() {
    let diff = session("<p>One two</p>", "<p>One three</p>", "<p>One four</p>");
    assert!(diff.is_conflicting());
    assert!(diff.conflict_log().count_by_type(ConflictType::Container) >= 1);
}

#[test]
fn test_additions_in_deleted_paragraph() {
    let diff = session("<p>A</p><p>B</p>", "<p>A</p>", "<p>A</p><p>B more</p>");
    assert!(diff.is_conflicting());
}

#[test]
fn test_deletions_in_deleted_paragraph() {
    let diff = session("<p>A</p><p>B c</p>", "<p>A</p>", "<p>A</p><p>B</p>");
    assert!(diff.is_conflicting());
}

#[test]
fn test_paragraphs_of_one_table_cell() {
    assert_merges(
        "<table><tr><td><p>One</p><p>Two</p></td></tr></table>",
        "<table><tr><td><p>One more</p><p>Two</p></td></tr></table>",
        "<table><tr><td><p>One</p><p>Two more</p></td></tr></table>",
        "<table><tr><td><p>One more</p><p>Two more</p></td></tr></table>",
    );
}

#[test]
fn test_paragraphs_inserted_at_different_locations_of_one_cell() {
    let diff = assert_merges(
        "<table><tr><td><p>One two</p><p>Three four</p></td></tr></table>",
        "<table><tr><td><p>X</p><p>One two</p><p>Three four</p></td></tr></table>",
        "<table><tr><td><p>One two</p><p>Three four</p><p>Y</p></td></tr></table>",
        "<table><tr><td><p>X</p><p>One two</p><p>Three four</p><p>Y</p></td></tr></table>",
    );
    assert_eq!(diff.conflict_log().count_by_type(ConflictType::Container), 0);
}

#[test]
fn test_column_and_row_added_to_same_table() {
    let diff = session(
        "<table><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr></table>",
        "<table><tr><td>a</td><td>b</td><td>x</td></tr><tr><td>c</td><td>d</td><td>y</td></tr></table>",
        "<table><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr><tr><td>i</td><td>j</td></tr></table>",
    );
    assert!(diff.is_conflicting());
    assert_eq!(diff.conflict_log().count_by_type(ConflictType::Table), 1);
}

#[test]
fn test_insertion_position_survives_unrelated_left_insertion() {
    assert_merges(
        "<p>A</p><p>B</p>",
        "<p>Z</p><p>A</p><p>B</p>",
        "<p>A</p><p>X</p><p>B</p>",
        "<p>Z</p><p>A</p><p>X</p><p>B</p>",
    );
}

#[test]
fn test_replaced_paragraph() {
    let diff = assert_merges(
        "<p>A</p><p>B</p><p>C</p>",
        "<p>A</p><p>B</p><p>C</p>",
        "<p>A</p><p>X</p><p>C</p>",
        "<p>A</p><p>X</p><p>C</p>",
    );
    assert!(diff.edit_log().count_by_type(EditType::Delete) >= 1);
}

#[test]
fn test_changed_nodes_are_left_unresolved() {
    let diff = session("<div>Text</div>", "<div>Text</div>", "<p>Text</p>");
    assert_eq!(diff.merged_markup(), "<div>Text</div>");
    assert_eq!(diff.edit_log().count_by_type(EditType::Unresolved), 2);
}

#[test]
fn test_inputs_are_not_modified() {
    let origin = parse_str("<p>A</p><p>B</p>").unwrap();
    let left = parse_str("<p>A</p>").unwrap();
    let right = parse_str("<p>A</p><p>B</p><p>C</p>").unwrap();

    let diff = ThreeWayDiff::new(&origin, &left, &right);
    diff.is_conflicting();
    diff.merged_markup();

    assert_eq!(print_to_string(&origin), "<p>A</p><p>B</p>");
    assert_eq!(print_to_string(&left), "<p>A</p>");
    assert_eq!(print_to_string(&right), "<p>A</p><p>B</p><p>C</p>");
}

#[test]
fn test_identity_across_trees() {
    let a = parse_str("<p>Same text</p><p>Other</p>").unwrap();
    let b = parse_str("<p>Same text</p><p>Different</p>").unwrap();
    let config = DiffConfig::default();
    let first = |root: &richtext_3dm::NodeRef| root.borrow().child(0).cloned().unwrap();
    assert!(is_same_node(&first(&a), &first(&b), &config));
    assert!(is_same_node(&a, &b, &config));
}

#[test]
fn test_identity_is_reflexive() {
    let diff = session(
        "<p>One <b>two</b></p><table><tr><td>a</td></tr></table>",
        "<p>One <b>two</b> three</p><table><tr><td>a</td></tr></table>",
        "<p>One</p><table><tr><td>a</td><td>b</td></tr></table>",
    );
    let config = DiffConfig::default();
    for tree in [diff.left_tree(), diff.right_tree()] {
        let mut stack = vec![tree.clone()];
        while let Some(node) = stack.pop() {
            if !node.borrow().content().is_separator() {
                assert!(is_same_node(&node, &node, &config));
            }
            stack.extend(node.borrow().children().iter().cloned());
        }
    }
}

#[test]
fn test_custom_configuration() {
    let config = DiffConfig::from_toml("structure_tags = []").unwrap();
    let diff = ThreeWayDiff::from_markup_with_config(
        "<p>One</p><p>Two</p>",
        "<p>One more</p><p>Two</p>",
        "<p>One</p><p>Two more</p>",
        config,
    )
    .unwrap();
    assert_eq!(diff.conflict_state(), ConflictState::Unknown);
    assert!(!diff.is_conflicting());
    assert_eq!(diff.conflict_state(), ConflictState::NotConflicting);
}
