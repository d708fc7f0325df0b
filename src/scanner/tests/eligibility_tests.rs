use crate::scanner::scheduler::{ScanScheduler, SKIPPED_TAGS};
use crate::settings::Settings;
use crate::tree::{DocumentTree, Marker, MemoryTree};

fn scan(tree: &mut MemoryTree) -> usize {
    let root = tree.root();
    ScanScheduler::default()
        .scan(tree, &root, &Settings::default())
        .unwrap()
        .annotated
}

// ============================================================================
// Non-content containers
// ============================================================================

#[test]
fn test_skipped_tags_never_annotated() {
    for tag in SKIPPED_TAGS {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let el = tree.append_element(root, tag);
        let inner = tree.append_element(el, "span");
        tree.append_text(inner, "costs $5");
        assert_eq!(scan(&mut tree), 0, "tag {}", tag);
        assert_eq!(tree.rendered_text(), "costs $5");
    }
}

#[test]
fn test_tag_names_case_insensitive() {
    let mut tree = MemoryTree::new();
    let root = tree.root();
    let el = tree.append_element(root, "SCRIPT");
    tree.append_text(el, "var price = '$5';");
    assert_eq!(scan(&mut tree), 0);
}

// ============================================================================
// Opt-out marker
// ============================================================================

#[test]
fn test_ignore_marker_prunes_subtree() {
    let mut tree = MemoryTree::new();
    let root = tree.root();
    let opted_out = tree.append_element(root, "div");
    tree.set_marker(&opted_out, Marker::Ignore).unwrap();
    let deep = tree.append_element(opted_out, "p");
    tree.append_text(deep, "$5 here");
    let p = tree.append_element(root, "p");
    tree.append_text(p, "$5 there");

    assert_eq!(scan(&mut tree), 1);
    assert_eq!(tree.rendered_text(), "$5 here$5 (20min) there");
}

#[test]
fn test_scan_root_inside_ignored_region() {
    let mut tree = MemoryTree::new();
    let root = tree.root();
    let opted_out = tree.append_element(root, "div");
    tree.set_marker(&opted_out, Marker::Ignore).unwrap();
    let inner = tree.append_element(opted_out, "p");
    tree.append_text(inner, "$5");

    let report = ScanScheduler::default()
        .scan(&mut tree, &inner, &Settings::default())
        .unwrap();
    assert!(report.is_noop());
}

// ============================================================================
// Text selection
// ============================================================================

#[test]
fn test_whitespace_only_leaves_not_visited() {
    let mut tree = MemoryTree::new();
    let root = tree.root();
    tree.append_text(root, "   ");
    tree.append_text(root, "\n\t");
    tree.append_text(root, "");
    let report = ScanScheduler::default()
        .scan(&mut tree, &root, &Settings::default())
        .unwrap();
    assert_eq!(report.visited, 0);
}

#[test]
fn test_amount_split_across_leaves_not_matched() {
    let mut tree = MemoryTree::new();
    let root = tree.root();
    tree.append_text(root, "$");
    let b = tree.append_element(root, "b");
    tree.append_text(b, "5");
    assert_eq!(scan(&mut tree), 0);
}

#[test]
fn test_document_order() {
    let mut tree = MemoryTree::new();
    let root = tree.root();
    let first = tree.append_element(root, "p");
    tree.append_text(first, "$5");
    let second = tree.append_element(root, "p");
    tree.append_text(second, "$10");

    assert_eq!(scan(&mut tree), 2);
    let containers = tree.marked(Marker::Processed);
    assert_eq!(tree.parent(&containers[0]), Some(first));
    assert_eq!(tree.parent(&containers[1]), Some(second));
}
