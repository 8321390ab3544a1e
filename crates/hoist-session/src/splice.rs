//! Tree surgery for partial reparses.

use crate::error::ReparseError;
use hoist_common::span::shift_offset;
use hoist_parser::{NodeArena, NodeData, NodeIndex, RenderHandle};
use tracing::trace;

/// Result of replacing one function node.
pub(crate) struct Spliced {
    /// Former parent of the replaced function.
    pub parent: NodeIndex,
    /// Render handles of every node whose range moved.
    pub released: Vec<RenderHandle>,
    pub shifted: usize,
}

enum Visit {
    Enter { node: NodeIndex, parent: NodeIndex },
    Leave(NodeIndex),
}

/// Replace `old` by `new` inside the tree rooted at `root`.
///
/// The walk is a pre-order traversal that never descends into `old`. Once
/// `old` has been passed, every node entered afterwards has its start moved
/// by `delta`, and every node left afterwards (its ancestors included) has
/// its end moved by `delta`. Nodes before the edit are untouched. Every moved
/// node has its render state invalidated.
pub(crate) fn replace_function(
    arena: &mut NodeArena,
    root: NodeIndex,
    old: NodeIndex,
    new: NodeIndex,
    delta: i64,
) -> Result<Spliced, ReparseError> {
    let mut stack = vec![Visit::Enter {
        node: root,
        parent: NodeIndex::NONE,
    }];
    let mut found_parent = None;
    let mut released = Vec::new();
    let mut shifted = 0;

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter { node, parent } => {
                if node == old {
                    found_parent = Some(parent);
                    continue;
                }
                if found_parent.is_some()
                    && let Some(n) = arena.get_mut(node)
                {
                    n.span.start = shift_offset(n.span.start, delta);
                    released.extend(n.render.invalidate());
                    shifted += 1;
                }
                stack.push(Visit::Leave(node));
                let children = arena.children(node);
                stack.extend(
                    children
                        .iter()
                        .rev()
                        .map(|&child| Visit::Enter { node: child, parent: node }),
                );
            }
            Visit::Leave(node) => {
                if found_parent.is_some()
                    && let Some(n) = arena.get_mut(node)
                {
                    n.span.end = shift_offset(n.span.end, delta);
                    released.extend(n.render.invalidate());
                }
            }
        }
    }

    let Some(parent) = found_parent.filter(|p| p.is_some()) else {
        return Err(ReparseError::mismatch(
            "replaced function is no longer part of the tree",
        ));
    };
    if !arena.replace_child(parent, old, new) {
        return Err(ReparseError::mismatch(
            "replaced function is not a child of its parent",
        ));
    }
    trace!(parent = parent.0, shifted, "spliced function");
    Ok(Spliced {
        parent,
        released,
        shifted,
    })
}

/// Innermost function whose range contains `offset`.
///
/// Pre-order descent that stops at the first node starting after `offset`;
/// the last function seen containing the offset is the innermost one.
pub(crate) fn containing_function(
    arena: &NodeArena,
    root: NodeIndex,
    offset: u32,
) -> Option<NodeIndex> {
    let mut found = None;
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let Some(n) = arena.get(node) else {
            continue;
        };
        if n.span.start > offset {
            break;
        }
        if n.is_function() && n.span.contains(offset) {
            found = Some(node);
        }
        let children = arena.children(node);
        stack.extend(children.iter().rev().copied());
    }
    found
}

/// Release every render handle held by the subtree at `root`.
pub(crate) fn release_subtree(arena: &mut NodeArena, root: NodeIndex) -> Vec<RenderHandle> {
    arena
        .subtree(root)
        .into_iter()
        .filter_map(|idx| arena.get_mut(idx).and_then(|n| n.render.invalidate()))
        .collect()
}

/// The single function a partial parse of a function slice must produce.
///
/// A declaration slice parses to `Program [FunctionDeclaration]`; an
/// expression slice, wrapped in parentheses, to
/// `Program [ExpressionStatement [FunctionExpression]]`. The function must
/// cover the whole slice.
pub(crate) fn partial_root(
    arena: &NodeArena,
    statements: &[NodeIndex],
    wrapped: bool,
    slice_len: u32,
) -> Result<NodeIndex, ReparseError> {
    let [statement] = statements else {
        return Err(ReparseError::mismatch(format!(
            "partial parse produced {} statements",
            statements.len()
        )));
    };
    let candidate = if wrapped {
        let children = arena.children(*statement);
        match children.as_slice() {
            [only] => *only,
            _ => return Err(ReparseError::mismatch("wrapped slice is not one expression")),
        }
    } else {
        *statement
    };

    let node = arena
        .get(candidate)
        .ok_or_else(|| ReparseError::mismatch("partial root missing"))?;
    let kind_matches = match node.data {
        NodeData::FunctionExpression(_) => wrapped,
        NodeData::FunctionDeclaration(_) => !wrapped,
        _ => false,
    };
    if !kind_matches {
        return Err(ReparseError::mismatch(format!(
            "partial parse produced a {}",
            node.kind_name()
        )));
    }
    let expected_start = u32::from(wrapped);
    if node.span.start != expected_start || node.span.len() != slice_len {
        return Err(ReparseError::mismatch(format!(
            "function covers {}..{} of a {slice_len}-byte slice",
            node.span.start, node.span.end
        )));
    }
    Ok(candidate)
}
