//! Tree mutator: applies one fragment to one text location

use crate::scanner::annotate::AnnotatedFragment;
use crate::tree::{DocumentTree, TreeError};

/// Swap `node` for `fragment` in a single host operation.
///
/// Returns `Ok(false)` without touching the tree when the fragment would
/// reproduce the source unchanged. Host failures leave the node as it was.
pub fn commit<T: DocumentTree>(
    tree: &mut T,
    node: &T::Node,
    fragment: &AnnotatedFragment,
) -> Result<bool, TreeError> {
    if fragment.is_empty() || fragment.is_plain() {
        return Ok(false);
    }
    tree.replace_with_fragment(node, fragment)?;
    Ok(true)
}
