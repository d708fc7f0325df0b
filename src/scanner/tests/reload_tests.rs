use serde_json::json;

use crate::scanner::conductor::{ScanConductor, ScanOutcome};
use crate::settings::{DisplayMode, Settings};
use crate::tree::{DocumentTree, Marker, MemoryTree};

fn store_settings(value: serde_json::Value) -> Settings {
    match value {
        serde_json::Value::Object(map) => Settings::from_store(&map),
        _ => Settings::default(),
    }
}

fn article() -> MemoryTree {
    let mut tree = MemoryTree::new();
    let root = tree.root();
    let p = tree.append_element(root, "p");
    tree.append_text(p, "Rent is $900 a month, ");
    let b = tree.append_element(p, "b");
    tree.append_text(b, "coffee $3");
    tree.append_text(p, " a cup.");
    let price = tree.append_element_with_class(root, "span", "a-price");
    let full = tree.append_element_with_class(price, "span", "a-offscreen");
    tree.append_text(full, "$30.00");
    tree
}

// ============================================================================
// Settings replacement
// ============================================================================

#[test]
fn test_reload_rewrites_with_new_wage_and_mode() {
    let mut tree = article();
    let root = tree.root();
    let mut conductor = ScanConductor::new();
    conductor.load_settings(store_settings(json!({ "hourlyRate": 15 })));
    conductor.scan(&mut tree, &root);
    assert_eq!(
        tree.rendered_text(),
        "Rent is $900 (1w2d4h) a month, coffee $3 (12min) a cup.$30.00(2h)"
    );

    let outcome = conductor.replace_settings(
        &mut tree,
        &root,
        store_settings(json!({ "hourlyRate": "30", "displayMode": "replace" })),
    );
    assert!(matches!(outcome, ScanOutcome::Completed(_)));
    assert_eq!(
        tree.rendered_text(),
        "Rent is 3d6h a month, coffee 6min a cup.$30.00(1h)"
    );
    assert_eq!(conductor.settings().display_mode, DisplayMode::Replace);
}

#[test]
fn test_reload_leaves_no_stale_annotations() {
    let mut tree = article();
    let root = tree.root();
    let mut conductor = ScanConductor::new();
    conductor.load_settings(Settings::default());
    conductor.scan(&mut tree, &root);
    let before = tree.marked(Marker::Processed).len();

    for rate in [10, 20, 40, 80] {
        conductor.replace_settings(&mut tree, &root, store_settings(json!({ "hourlyRate": rate })));
        assert_eq!(tree.marked(Marker::Processed).len(), before, "rate {}", rate);
    }
}

#[test]
fn test_reload_restores_original_text_runs() {
    let mut tree = article();
    let root = tree.root();
    let mut conductor = ScanConductor::new();
    conductor.load_settings(Settings::default());
    conductor.scan(&mut tree, &root);

    tree.clear_annotations(&root).unwrap();
    assert_eq!(tree.rendered_text(), "Rent is $900 a month, coffee $3 a cup.$30.00");
    let p = tree.children(root)[0];
    assert_eq!(tree.children(p).len(), 3);
}

#[test]
fn test_invalid_reload_falls_back_to_defaults() {
    let mut tree = article();
    let root = tree.root();
    let mut conductor = ScanConductor::new();
    conductor.load_settings(store_settings(json!({ "hourlyRate": 30 })));
    conductor.scan(&mut tree, &root);

    let outcome = conductor.replace_settings(
        &mut tree,
        &root,
        store_settings(json!({ "hourlyRate": -4, "displayMode": "sideways" })),
    );
    assert!(matches!(outcome, ScanOutcome::Completed(_)));
    assert_eq!(conductor.settings(), &Settings::default());
    assert!(tree.rendered_text().contains("coffee $3 (12min)"));
}

#[test]
fn test_reload_on_detached_root_is_abandoned() {
    let mut tree = article();
    let root = tree.root();
    let p = tree.children(root)[0];
    let mut conductor = ScanConductor::new();
    conductor.load_settings(Settings::default());
    conductor.scan(&mut tree, &root);

    tree.remove(p);
    let outcome = conductor.replace_settings(&mut tree, &p, Settings::default());
    assert!(matches!(outcome, ScanOutcome::Abandoned { .. }));
    assert_eq!(conductor.abandoned_count(), 1);
}
