//! MemoryTree: arena-backed document tree
//!
//! A small element/text tree with stable node ids, used to embed the engine
//! outside a browser and to exercise it in tests. Every structural or text
//! change is appended to a mutation journal the host drains and forwards to
//! the conductor, the same way a MutationObserver would. Marker and attribute
//! changes are not journaled.

use std::collections::{BTreeMap, HashSet};

use super::{
    DocumentTree, Marker, Mutation, MutationKind, TreeError, ANNOTATION_CLASS, ORIGINAL_ATTRIBUTE,
};
use crate::scanner::annotate::{AnnotatedFragment, Segment};

// =============================================================================
// Types
// =============================================================================

/// Stable handle into a [`MemoryTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        tag: String,
        classes: Vec<String>,
        attributes: BTreeMap<String, String>,
        markers: HashSet<Marker>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Slot {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// In-memory document
#[derive(Debug, Clone)]
pub struct MemoryTree {
    slots: Vec<Slot>,
    root: NodeId,
    journal: Vec<Mutation<NodeId>>,
    /// Containers that refuse new children (fault injection)
    refusing: HashSet<NodeId>,
    /// Upcoming `clear_annotations` calls that fail (fault injection)
    failing_clears: usize,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Building and inspecting
// =============================================================================

impl MemoryTree {
    /// Empty document with a `body` root
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            root: NodeId(0),
            journal: Vec::new(),
            refusing: HashSet::new(),
            failing_clears: 0,
        };
        tree.root = tree.alloc(Self::element_data("body"), None);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn element_data(tag: &str) -> NodeData {
        NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            markers: HashSet::new(),
        }
    }

    fn alloc(&mut self, data: NodeData, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot { data, parent, children: Vec::new() });
        id
    }

    fn slot(&self, id: NodeId) -> &Slot {
        &self.slots[id.0]
    }

    fn slot_mut(&mut self, id: NodeId) -> &mut Slot {
        &mut self.slots[id.0]
    }

    fn record(&mut self, target: NodeId, kind: MutationKind) {
        self.journal.push(Mutation { target, kind });
    }

    fn append(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.alloc(data, Some(parent));
        self.slot_mut(parent).children.push(id);
        self.record(parent, MutationKind::ChildList);
        id
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        self.append(parent, Self::element_data(tag))
    }

    pub fn append_element_with_class(&mut self, parent: NodeId, tag: &str, class: &str) -> NodeId {
        let id = self.append_element(parent, tag);
        self.add_class(id, class);
        id
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.append(parent, NodeData::Text(text.to_string()))
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if let NodeData::Element { classes, .. } = &mut self.slot_mut(node).data {
            if !classes.iter().any(|c| c == class) {
                classes.push(class.to_string());
            }
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        match &self.slot(node).data {
            NodeData::Element { classes, .. } => classes.iter().any(|c| c == class),
            NodeData::Text(_) => false,
        }
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attributes, .. } = &mut self.slot_mut(node).data {
            attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.slot(node).data {
            NodeData::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            NodeData::Text(_) => None,
        }
    }

    /// Overwrite a text leaf's content
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        if let NodeData::Text(content) = &mut self.slot_mut(node).data {
            *content = text.to_string();
            self.record(node, MutationKind::CharacterData);
        }
    }

    /// Detach `node` (and its subtree) from its parent
    pub fn remove(&mut self, node: NodeId) {
        if let Some(parent) = self.slot(node).parent {
            self.slot_mut(parent).children.retain(|c| *c != node);
            self.slot_mut(node).parent = None;
            self.record(parent, MutationKind::ChildList);
        }
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.slot(node).children
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.root {
                return true;
            }
            current = self.slot(id).parent;
        }
        false
    }

    /// Make `node` reject any insertion below it
    pub fn refuse_insertions(&mut self, node: NodeId) {
        self.refusing.insert(node);
    }

    /// Make the next `count` calls to `clear_annotations` fail untouched
    pub fn fail_next_clears(&mut self, count: usize) {
        self.failing_clears = count;
    }

    /// Take all journaled changes since the last drain
    pub fn drain_mutations(&mut self) -> Vec<Mutation<NodeId>> {
        std::mem::take(&mut self.journal)
    }

    pub fn pending_mutations(&self) -> usize {
        self.journal.len()
    }

    /// Visible text of the whole document
    pub fn rendered_text(&self) -> String {
        self.collect_text(self.root)
    }

    /// Attached elements carrying `marker`
    pub fn marked(&self, marker: Marker) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk(self.root, &mut |id, slot| {
            if let NodeData::Element { markers, .. } = &slot.data {
                if markers.contains(&marker) {
                    out.push(id);
                }
            }
        });
        out
    }

    fn walk(&self, from: NodeId, visit: &mut dyn FnMut(NodeId, &Slot)) {
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            let slot = self.slot(id);
            visit(id, slot);
            stack.extend(slot.children.iter().rev().copied());
        }
    }

    fn collect_text(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.walk(node, &mut |_, slot| {
            if let NodeData::Text(content) = &slot.data {
                out.push_str(content);
            }
        });
        out
    }

    fn ensure_accepts(&self, parent: NodeId) -> Result<(), TreeError> {
        if self.refusing.contains(&parent) {
            return Err(TreeError::Rejected(format!("node {} refuses children", parent.0)));
        }
        Ok(())
    }

    /// Detached node representing one segment; not yet linked to a parent
    fn materialise(&mut self, segment: &Segment) -> NodeId {
        if let Segment::Text { content } = segment {
            return self.alloc(NodeData::Text(content.clone()), None);
        }

        let container = self.alloc(Self::element_data("span"), None);
        self.add_class(container, ANNOTATION_CLASS);
        match segment {
            Segment::Annotated { mode, .. } => {
                self.add_class(container, &format!("{}-{}", ANNOTATION_CLASS, mode));
            }
            _ => self.add_class(container, &format!("{}-inert", ANNOTATION_CLASS)),
        }
        self.set_attribute(container, ORIGINAL_ATTRIBUTE, segment.original());
        if let Some(label) = segment.hover_label() {
            self.set_attribute(container, "title", label);
        }
        if let NodeData::Element { markers, .. } = &mut self.slot_mut(container).data {
            markers.insert(Marker::Processed);
        }

        let rendered = segment.rendered();
        if !rendered.is_empty() {
            let text = self.alloc(NodeData::Text(rendered), Some(container));
            self.slot_mut(container).children.push(text);
        }
        container
    }

    /// Fold the text siblings directly before and after `node` into it
    fn merge_adjacent_text(&mut self, node: NodeId) {
        let Some(parent) = self.slot(node).parent else {
            return;
        };
        let Some(mut index) = self.slot(parent).children.iter().position(|c| *c == node) else {
            return;
        };

        if index > 0 {
            let prev = self.slot(parent).children[index - 1];
            if let Some(before) = self.text(&prev) {
                if let NodeData::Text(content) = &mut self.slot_mut(node).data {
                    content.insert_str(0, &before);
                }
                self.slot_mut(parent).children.remove(index - 1);
                self.slot_mut(prev).parent = None;
                index -= 1;
            }
        }

        if let Some(&next) = self.slot(parent).children.get(index + 1) {
            if let Some(after) = self.text(&next) {
                if let NodeData::Text(content) = &mut self.slot_mut(node).data {
                    content.push_str(&after);
                }
                self.slot_mut(parent).children.remove(index + 1);
                self.slot_mut(next).parent = None;
            }
        }
    }
}

// =============================================================================
// DocumentTree
// =============================================================================

impl DocumentTree for MemoryTree {
    type Node = NodeId;

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.slot(*node).parent
    }

    fn tag_name(&self, node: &NodeId) -> Option<String> {
        match &self.slot(*node).data {
            NodeData::Element { tag, .. } => Some(tag.clone()),
            NodeData::Text(_) => None,
        }
    }

    fn text(&self, node: &NodeId) -> Option<String> {
        match &self.slot(*node).data {
            NodeData::Text(content) => Some(content.clone()),
            NodeData::Element { .. } => None,
        }
    }

    fn text_content(&self, node: &NodeId) -> Option<String> {
        Some(self.collect_text(*node))
    }

    fn has_marker(&self, node: &NodeId, marker: Marker) -> bool {
        match &self.slot(*node).data {
            NodeData::Element { markers, .. } => markers.contains(&marker),
            NodeData::Text(_) => false,
        }
    }

    fn set_marker(&mut self, node: &NodeId, marker: Marker) -> Result<(), TreeError> {
        match &mut self.slot_mut(*node).data {
            NodeData::Element { markers, .. } => {
                markers.insert(marker);
                Ok(())
            }
            NodeData::Text(_) => Err(TreeError::Host("text nodes cannot carry markers".into())),
        }
    }

    fn text_leaves(
        &self,
        root: &NodeId,
        prune: &dyn Fn(&NodeId) -> bool,
    ) -> Result<Vec<NodeId>, TreeError> {
        if !self.is_attached(*root) {
            return Err(TreeError::Detached);
        }
        let mut leaves = Vec::new();
        let mut stack = vec![*root];
        while let Some(id) = stack.pop() {
            let slot = self.slot(id);
            match &slot.data {
                NodeData::Text(_) => leaves.push(id),
                NodeData::Element { .. } => {
                    if prune(&id) {
                        continue;
                    }
                    stack.extend(slot.children.iter().rev().copied());
                }
            }
        }
        Ok(leaves)
    }

    fn find_by_class(&self, root: &NodeId, class: &str) -> Result<Vec<NodeId>, TreeError> {
        if !self.is_attached(*root) {
            return Err(TreeError::Detached);
        }
        let mut found = Vec::new();
        self.walk(*root, &mut |id, _| {
            if id != *root && self.has_class(id, class) {
                found.push(id);
            }
        });
        Ok(found)
    }

    fn replace_with_fragment(
        &mut self,
        node: &NodeId,
        fragment: &AnnotatedFragment,
    ) -> Result<(), TreeError> {
        if self.text(node).is_none() {
            return Err(TreeError::Host("only text leaves can be replaced".into()));
        }
        let parent = self.parent(node).ok_or(TreeError::Detached)?;
        if !self.is_attached(parent) {
            return Err(TreeError::Detached);
        }
        self.ensure_accepts(parent)?;

        let index = self
            .slot(parent)
            .children
            .iter()
            .position(|c| c == node)
            .ok_or(TreeError::Detached)?;

        let replacements: Vec<NodeId> = fragment
            .segments
            .iter()
            .map(|segment| self.materialise(segment))
            .collect();
        for id in &replacements {
            self.slot_mut(*id).parent = Some(parent);
        }

        self.slot_mut(parent)
            .children
            .splice(index..=index, replacements);
        self.slot_mut(*node).parent = None;
        self.record(parent, MutationKind::ChildList);
        Ok(())
    }

    fn append_badge(&mut self, element: &NodeId, segment: &Segment) -> Result<(), TreeError> {
        if self.tag_name(element).is_none() {
            return Err(TreeError::Host("badges attach to elements only".into()));
        }
        if !self.is_attached(*element) {
            return Err(TreeError::Detached);
        }
        self.ensure_accepts(*element)?;

        let badge = self.materialise(segment);
        self.slot_mut(badge).parent = Some(*element);
        self.slot_mut(*element).children.push(badge);
        self.record(*element, MutationKind::ChildList);
        Ok(())
    }

    fn clear_annotations(&mut self, root: &NodeId) -> Result<usize, TreeError> {
        if !self.is_attached(*root) {
            return Err(TreeError::Detached);
        }
        if self.failing_clears > 0 {
            self.failing_clears -= 1;
            return Err(TreeError::Rejected("annotations could not be cleared".into()));
        }

        let mut containers = Vec::new();
        let mut composites = Vec::new();
        let mut stack = vec![*root];
        while let Some(id) = stack.pop() {
            let slot = self.slot(id);
            if let NodeData::Element { markers, attributes, .. } = &slot.data {
                if markers.contains(&Marker::Processed) {
                    if attributes.contains_key(ORIGINAL_ATTRIBUTE) {
                        containers.push(id);
                        continue;
                    }
                    composites.push(id);
                }
            }
            stack.extend(slot.children.iter().rev().copied());
        }

        for id in &composites {
            if let NodeData::Element { markers, .. } = &mut self.slot_mut(*id).data {
                markers.remove(&Marker::Processed);
            }
        }

        for id in &containers {
            let original = self.attribute(*id, ORIGINAL_ATTRIBUTE).unwrap_or_default().to_string();
            let Some(parent) = self.slot(*id).parent else {
                continue;
            };
            self.slot_mut(*id).parent = None;

            // Badges carry no original text and simply go away
            if original.is_empty() {
                self.slot_mut(parent).children.retain(|c| c != id);
                self.record(parent, MutationKind::ChildList);
                continue;
            }

            let restored = self.alloc(NodeData::Text(original), Some(parent));
            for child in self.slot_mut(parent).children.iter_mut() {
                if *child == *id {
                    *child = restored;
                }
            }
            self.merge_adjacent_text(restored);
            self.record(parent, MutationKind::ChildList);
        }

        Ok(containers.len() + composites.len())
    }
}

// =============================================================================
// Tests
// =============================================================================
