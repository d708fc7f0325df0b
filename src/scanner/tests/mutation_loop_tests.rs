use crate::scanner::conductor::{ScanConductor, ScanOutcome};
use crate::settings::Settings;
use crate::tree::MemoryTree;

const WINDOW: f64 = 250.0;

/// Forward journaled mutations to the conductor and fire due rescans until
/// the document settles. Returns the number of rescans that ran.
fn settle(conductor: &mut ScanConductor, tree: &mut MemoryTree, mut now: f64) -> usize {
    let root = tree.root();
    let mut rescans = 0;
    for _ in 0..100 {
        let batch = tree.drain_mutations();
        conductor.notify_mutations(batch.len(), now);
        if !conductor.rescan_pending() {
            return rescans;
        }
        now += WINDOW;
        if let Some(outcome) = conductor.poll(tree, &root, now) {
            assert!(matches!(outcome, ScanOutcome::Completed(_)));
            rescans += 1;
        }
    }
    panic!("document never settled");
}

fn ready_conductor() -> ScanConductor {
    let mut conductor = ScanConductor::new();
    conductor.load_settings(Settings::default());
    conductor
}

// ============================================================================
// Self-triggered mutations terminate
// ============================================================================

#[test]
fn test_engine_edits_do_not_loop() {
    let mut tree = MemoryTree::new();
    let root = tree.root();
    let p = tree.append_element(root, "p");
    tree.append_text(p, "Pay $5, then €20 and 3 thousand USD");
    let mut conductor = ready_conductor();

    // initial insertion + the engine's own replacement + one no-op pass
    let rescans = settle(&mut conductor, &mut tree, 0.0);
    assert_eq!(rescans, 2);
    assert_eq!(conductor.last_report().map(|r| r.annotated), Some(0));
    assert_eq!(tree.pending_mutations(), 0);
}

#[test]
fn test_host_insertions_after_settling() {
    let mut tree = MemoryTree::new();
    let root = tree.root();
    let mut conductor = ready_conductor();
    conductor.scan(&mut tree, &root);
    tree.drain_mutations();

    let feed = tree.append_element(root, "ul");
    for i in 1..=10 {
        let li = tree.append_element(feed, "li");
        tree.append_text(li, &format!("Item {} for ${}", i, i * 15));
    }
    let rescans = settle(&mut conductor, &mut tree, 1_000.0);
    assert!(rescans <= 2);
    assert_eq!(tree.marked(crate::tree::Marker::Processed).len(), 10);
}

// ============================================================================
// Mutation storms
// ============================================================================

#[test]
fn test_fifty_insertions_one_rescan() {
    let mut tree = MemoryTree::new();
    let root = tree.root();
    let mut conductor = ready_conductor();
    conductor.scan(&mut tree, &root);
    tree.drain_mutations();

    let mut scans = 0;
    let mut now = 0.0;
    for i in 0..50 {
        tree.append_text(root, &format!("row {} ", i));
        let batch = tree.drain_mutations();
        conductor.notify_mutations(batch.len(), now);
        if conductor.poll(&mut tree, &root, now).is_some() {
            scans += 1;
        }
        now += 2.0;
    }
    assert_eq!(scans, 0);

    now += WINDOW;
    if conductor.poll(&mut tree, &root, now).is_some() {
        scans += 1;
    }
    assert_eq!(scans, 1);
    assert_eq!(conductor.debounced_scans(), 1);
}

#[test]
fn test_notifications_while_awaiting_settings_are_dropped() {
    let mut tree = MemoryTree::new();
    let root = tree.root();
    tree.append_text(root, "$5");
    let mut conductor = ScanConductor::new();

    assert_eq!(conductor.notify_mutations(tree.drain_mutations().len(), 0.0), None);
    assert!(conductor.poll(&mut tree, &root, 10_000.0).is_none());

    conductor.load_settings(Settings::default());
    assert!(matches!(conductor.scan(&mut tree, &root), ScanOutcome::Completed(_)));
    assert_eq!(tree.rendered_text(), "$5 (20min)");
}
