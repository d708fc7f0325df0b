//! ScanScheduler: one full pass over a root
//!
//! # Pass order
//! 1. Structured prices (composites get marked and drop out of step 2)
//! 2. Text leaves in document order, pruned at excluded elements
//! 3. Per leaf: quiet cache -> lexer -> annotation builder -> mutator
//!
//! A pass touches each leaf at most once, and everything it creates carries
//! the processed marker, so a second pass over an unchanged tree is a no-op.

use instant::Instant;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scanner::annotate::build_fragment;
use crate::scanner::change::QuietTextCache;
use crate::scanner::lexer::find_amounts;
use crate::scanner::mutator::commit;
use crate::scanner::structured::PriceShape;
use crate::settings::Settings;
use crate::tree::{DocumentTree, Marker, TreeError};

/// Elements whose text is never content
pub const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "code", "pre", "textarea", "input", "select", "option",
    "template", "svg", "math", "iframe", "canvas", "kbd", "samp",
];

/// Statistics of one pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    /// Eligible text leaves reached
    pub visited: usize,
    /// Leaves rewritten
    pub annotated: usize,
    /// Money mentions wrapped (annotated or inert)
    pub mentions: usize,
    /// Composite prices annotated
    pub structured: usize,
    /// Leaves skipped by the quiet cache
    pub skipped_quiet: usize,
    pub elapsed_us: u64,
}

impl ScanReport {
    /// True when the pass changed nothing
    pub fn is_noop(&self) -> bool {
        self.annotated == 0 && self.structured == 0
    }
}

/// The element itself is processed, opted out, or not content
pub fn is_excluded_element<T: DocumentTree>(tree: &T, node: &T::Node) -> bool {
    if tree.has_marker(node, Marker::Processed) || tree.has_marker(node, Marker::Ignore) {
        return true;
    }
    match tree.tag_name(node) {
        Some(tag) => SKIPPED_TAGS.contains(&tag.as_str()),
        None => false,
    }
}

/// `node` or any of its ancestors is excluded
pub fn is_within_excluded<T: DocumentTree>(tree: &T, node: &T::Node) -> bool {
    let mut current = Some(node.clone());
    while let Some(n) = current {
        if is_excluded_element(tree, &n) {
            return true;
        }
        current = tree.parent(&n);
    }
    false
}

// =============================================================================
// ScanScheduler
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ScanScheduler {
    quiet: QuietTextCache,
    shape: PriceShape,
}

impl ScanScheduler {
    pub fn new(quiet_cache_capacity: usize) -> Self {
        Self {
            quiet: QuietTextCache::new(quiet_cache_capacity),
            shape: PriceShape::default(),
        }
    }

    pub fn with_shape(mut self, shape: PriceShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn quiet_cache(&self) -> &QuietTextCache {
        &self.quiet
    }

    /// Run one pass under `root`. A host failure aborts the pass; edits
    /// already committed stay in place and stay marked.
    pub fn scan<T: DocumentTree>(
        &mut self,
        tree: &mut T,
        root: &T::Node,
        settings: &Settings,
    ) -> Result<ScanReport, TreeError> {
        let start = Instant::now();
        let mut report = ScanReport::default();

        if is_within_excluded(&*tree, root) {
            return Ok(report);
        }

        report.structured = self
            .shape
            .annotate(tree, root, settings, &|t, n| is_within_excluded(t, n))?;

        let leaves = {
            let snapshot: &T = tree;
            snapshot.text_leaves(root, &|n| is_excluded_element(snapshot, n))?
        };

        for leaf in leaves {
            let Some(text) = tree.text(&leaf) else {
                continue;
            };
            if text.trim().is_empty() {
                continue;
            }
            report.visited += 1;

            if self.quiet.is_quiet(&text) {
                report.skipped_quiet += 1;
                continue;
            }

            let matches = find_amounts(&text);
            if matches.is_empty() {
                self.quiet.remember(&text);
                continue;
            }

            let fragment = build_fragment(&text, &matches, settings);
            if commit(tree, &leaf, &fragment)? {
                report.annotated += 1;
                report.mentions += fragment.segments.iter().filter(|s| s.is_processed()).count();
            }
        }

        report.elapsed_us = start.elapsed().as_micros() as u64;
        debug!(
            visited = report.visited,
            annotated = report.annotated,
            mentions = report.mentions,
            structured = report.structured,
            skipped_quiet = report.skipped_quiet,
            elapsed_us = report.elapsed_us,
            "scan pass complete"
        );
        Ok(report)
    }
}
