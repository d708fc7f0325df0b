//! DomTree: `DocumentTree` over the browser DOM
//!
//! Markers and the original text are stored as `data-*` attributes so they
//! survive cloning and re-parenting by the page.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, Node};

use super::{DocumentTree, Marker, TreeError, ANNOTATION_CLASS, ORIGINAL_ATTRIBUTE};
use crate::scanner::annotate::{AnnotatedFragment, Segment};

fn host(err: JsValue) -> TreeError {
    TreeError::Host(err.as_string().unwrap_or_else(|| format!("{:?}", err)))
}

fn as_element(node: &Node) -> Result<&Element, TreeError> {
    node.dyn_ref::<Element>()
        .ok_or_else(|| TreeError::Host(format!("expected element, got {}", node.node_name())))
}

pub struct DomTree {
    document: Document,
}

impl DomTree {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// Tree over the document owning `node`
    pub fn for_node(node: &Node) -> Result<Self, TreeError> {
        node.owner_document()
            .map(Self::new)
            .ok_or_else(|| TreeError::Host("node has no owner document".into()))
    }

    fn ensure_connected(node: &Node) -> Result<(), TreeError> {
        if node.is_connected() {
            Ok(())
        } else {
            Err(TreeError::Detached)
        }
    }

    fn materialise(&self, segment: &Segment) -> Result<Node, TreeError> {
        if let Segment::Text { content } = segment {
            return Ok(self.document.create_text_node(content).into());
        }

        let container = self.document.create_element("span").map_err(host)?;
        let variant = match segment {
            Segment::Annotated { mode, .. } => mode.as_str(),
            _ => "inert",
        };
        container.set_class_name(&format!("{} {}-{}", ANNOTATION_CLASS, ANNOTATION_CLASS, variant));
        container
            .set_attribute(ORIGINAL_ATTRIBUTE, segment.original())
            .map_err(host)?;
        if let Some(label) = segment.hover_label() {
            container.set_attribute("title", label).map_err(host)?;
        }
        container
            .set_attribute(Marker::Processed.attribute(), "")
            .map_err(host)?;

        let rendered = segment.rendered();
        if !rendered.is_empty() {
            let text = self.document.create_text_node(&rendered);
            container.append_child(&text).map_err(host)?;
        }
        Ok(container.into())
    }

    fn children(node: &Node) -> Vec<Node> {
        let mut out = Vec::new();
        let mut child = node.first_child();
        while let Some(c) = child {
            child = c.next_sibling();
            out.push(c);
        }
        out
    }

    /// Fold the text siblings directly before and after `text` into it
    fn merge_adjacent_text(text: &Node) -> Result<(), TreeError> {
        let Some(parent) = text.parent_node() else {
            return Ok(());
        };
        let mut content = text.text_content().unwrap_or_default();
        if let Some(prev) = text.previous_sibling().filter(|n| n.node_type() == Node::TEXT_NODE) {
            content.insert_str(0, &prev.text_content().unwrap_or_default());
            parent.remove_child(&prev).map_err(host)?;
        }
        if let Some(next) = text.next_sibling().filter(|n| n.node_type() == Node::TEXT_NODE) {
            content.push_str(&next.text_content().unwrap_or_default());
            parent.remove_child(&next).map_err(host)?;
        }
        text.set_text_content(Some(&content));
        Ok(())
    }

    fn query_all(root: &Node, selector: &str) -> Result<Vec<Node>, TreeError> {
        let list = as_element(root)?.query_selector_all(selector).map_err(host)?;
        Ok((0..list.length()).filter_map(|i| list.item(i)).collect())
    }
}

impl DocumentTree for DomTree {
    type Node = Node;

    fn parent(&self, node: &Node) -> Option<Node> {
        node.parent_node()
    }

    fn tag_name(&self, node: &Node) -> Option<String> {
        node.dyn_ref::<Element>().map(|e| e.tag_name().to_ascii_lowercase())
    }

    fn text(&self, node: &Node) -> Option<String> {
        if node.node_type() == Node::TEXT_NODE {
            node.text_content()
        } else {
            None
        }
    }

    fn text_content(&self, node: &Node) -> Option<String> {
        node.text_content()
    }

    fn has_marker(&self, node: &Node, marker: Marker) -> bool {
        node.dyn_ref::<Element>()
            .map_or(false, |e| e.has_attribute(marker.attribute()))
    }

    fn set_marker(&mut self, node: &Node, marker: Marker) -> Result<(), TreeError> {
        as_element(node)?.set_attribute(marker.attribute(), "").map_err(host)
    }

    fn text_leaves(&self, root: &Node, prune: &dyn Fn(&Node) -> bool) -> Result<Vec<Node>, TreeError> {
        Self::ensure_connected(root)?;
        let mut leaves = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(node) = stack.pop() {
            match node.node_type() {
                Node::TEXT_NODE => leaves.push(node),
                Node::ELEMENT_NODE => {
                    if prune(&node) {
                        continue;
                    }
                    stack.extend(Self::children(&node).into_iter().rev());
                }
                _ => {}
            }
        }
        Ok(leaves)
    }

    fn find_by_class(&self, root: &Node, class: &str) -> Result<Vec<Node>, TreeError> {
        Self::query_all(root, &format!(".{}", class))
    }

    fn replace_with_fragment(&mut self, node: &Node, fragment: &AnnotatedFragment) -> Result<(), TreeError> {
        Self::ensure_connected(node)?;
        let parent = node.parent_node().ok_or(TreeError::Detached)?;

        let staged = self.document.create_document_fragment();
        for segment in &fragment.segments {
            staged.append_child(&self.materialise(segment)?).map_err(host)?;
        }
        parent
            .replace_child(&staged, node)
            .map_err(|e| TreeError::Rejected(format!("{:?}", e)))?;
        Ok(())
    }

    fn append_badge(&mut self, element: &Node, segment: &Segment) -> Result<(), TreeError> {
        as_element(element)?;
        Self::ensure_connected(element)?;
        let badge = self.materialise(segment)?;
        element
            .append_child(&badge)
            .map_err(|e| TreeError::Rejected(format!("{:?}", e)))?;
        Ok(())
    }

    fn clear_annotations(&mut self, root: &Node) -> Result<usize, TreeError> {
        Self::ensure_connected(root)?;
        let marked = Self::query_all(root, &format!("[{}]", Marker::Processed.attribute()))?;

        let mut reverted = 0;
        for node in marked {
            // Containers nested in an already reverted container are gone
            if !node.is_connected() {
                continue;
            }
            let element = as_element(&node)?;
            match element.get_attribute(ORIGINAL_ATTRIBUTE) {
                // Badges carry no original text and simply go away
                Some(original) if original.is_empty() => {
                    let parent = node.parent_node().ok_or(TreeError::Detached)?;
                    parent.remove_child(&node).map_err(host)?;
                }
                Some(original) => {
                    let parent = node.parent_node().ok_or(TreeError::Detached)?;
                    let restored: Node = self.document.create_text_node(&original).into();
                    parent.replace_child(&restored, &node).map_err(host)?;
                    Self::merge_adjacent_text(&restored)?;
                }
                None => element
                    .remove_attribute(Marker::Processed.attribute())
                    .map_err(host)?,
            }
            reverted += 1;
        }
        Ok(reverted)
    }
}
