//! Document tree capability
//!
//! The engine never owns the document. It consumes this trait, which a host
//! implements over whatever tree it has: the browser DOM on wasm32
//! ([`dom::DomTree`]) or the arena-backed [`MemoryTree`].
//!
//! Markers are the only idempotence signal. Anything under a node carrying
//! [`Marker::Processed`] or [`Marker::Ignore`] is never lexed.

pub mod memory;
#[cfg(target_arch = "wasm32")]
pub mod dom;

pub use memory::{MemoryTree, NodeId};

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use thiserror::Error;

use crate::scanner::annotate::{AnnotatedFragment, Segment};

/// Failure reported by the host tree. Never fatal to the engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("node is no longer attached to the document")]
    Detached,

    #[error("container rejected content insertion: {0}")]
    Rejected(String),

    #[error("host error: {0}")]
    Host(String),
}

/// Tags the engine reads and writes on elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marker {
    /// Created or consumed by the engine
    Processed,
    /// Page opted this subtree out
    Ignore,
}

impl Marker {
    /// Attribute name used by hosts that store markers as attributes
    pub fn attribute(&self) -> &'static str {
        match self {
            Marker::Processed => "data-wagetime-processed",
            Marker::Ignore => "data-wagetime-ignore",
        }
    }
}

/// Attribute holding the source text of an engine-created container
pub const ORIGINAL_ATTRIBUTE: &str = "data-wagetime-original";

/// Class on every engine-created container
pub const ANNOTATION_CLASS: &str = "wagetime-annotation";

/// Kind of change a host observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationKind {
    ChildList,
    CharacterData,
}

/// One change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation<N> {
    pub target: N,
    pub kind: MutationKind,
}

/// What the engine needs from a document tree.
///
/// Node handles must stay valid across mutations of unrelated nodes.
pub trait DocumentTree {
    type Node: Clone + PartialEq + Debug;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Lowercase tag name for elements, `None` for text
    fn tag_name(&self, node: &Self::Node) -> Option<String>;

    /// Content of a text leaf, `None` for elements
    fn text(&self, node: &Self::Node) -> Option<String>;

    /// Concatenated text of all descendants
    fn text_content(&self, node: &Self::Node) -> Option<String>;

    fn has_marker(&self, node: &Self::Node, marker: Marker) -> bool;

    fn set_marker(&mut self, node: &Self::Node, marker: Marker) -> Result<(), TreeError>;

    /// Text leaves under `root` in document order. Elements for which `prune`
    /// returns true are skipped along with their whole subtree.
    fn text_leaves(
        &self,
        root: &Self::Node,
        prune: &dyn Fn(&Self::Node) -> bool,
    ) -> Result<Vec<Self::Node>, TreeError>;

    /// Descendant elements of `root` carrying `class`, in document order
    fn find_by_class(&self, root: &Self::Node, class: &str) -> Result<Vec<Self::Node>, TreeError>;

    /// Replace a text leaf with the materialised fragment as one observable
    /// change. Processed segments become marked containers that remember
    /// their original text.
    fn replace_with_fragment(
        &mut self,
        node: &Self::Node,
        fragment: &AnnotatedFragment,
    ) -> Result<(), TreeError>;

    /// Append a marked container for `segment` as the last child of `element`
    fn append_badge(&mut self, element: &Self::Node, segment: &Segment) -> Result<(), TreeError>;

    /// Undo every engine edit under `root`: containers go back to their
    /// original text, processed markers are removed and adjacent text is
    /// merged. Returns how many nodes were reverted.
    fn clear_annotations(&mut self, root: &Self::Node) -> Result<usize, TreeError>;
}
