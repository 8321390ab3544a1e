//! The annotated tree handed to consumers.

use hoist_binder::{ScopeId, ScopeSnapshot, ScopeTree};
use hoist_common::{LineMap, Position};
use hoist_parser::{Node, NodeArena, NodeIndex};

/// A syntax tree, its scope tree, and the text they describe.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub arena: NodeArena,
    pub root: NodeIndex,
    pub scopes: ScopeTree,
    pub text: String,
    /// Strictly increasing across the analyses a session reports.
    pub version: u64,
}

impl Analysis {
    pub fn snapshot(&self) -> ScopeSnapshot {
        ScopeSnapshot::capture(&self.scopes, &self.arena)
    }

    pub fn line_map(&self) -> LineMap {
        LineMap::build(&self.text)
    }

    /// Byte offset of a line/column position in the analyzed text.
    pub fn offset_at(&self, position: Position) -> Option<u32> {
        self.line_map().position_to_offset(position, &self.text)
    }

    /// Scope an identifier or `this` node resolved to.
    pub fn scope_of(&self, node: NodeIndex) -> Option<ScopeId> {
        self.scopes.resolved_scope(node)
    }

    /// Nesting level of the scope an identifier resolved to.
    pub fn level_of(&self, node: NodeIndex) -> Option<u32> {
        self.scope_of(node).map(|scope| self.scopes.level(scope))
    }

    /// Every reference bound to the same binding as `node`.
    pub fn occurrences_of(&self, node: NodeIndex) -> &[NodeIndex] {
        self.scopes
            .binding_of(&self.arena, node)
            .map(|binding| binding.references.as_slice())
            .unwrap_or(&[])
    }

    /// Visit, in pre-order, the nodes whose range overlaps `[start, end]`.
    ///
    /// Subtrees that end before `start` are skipped, and the walk stops at
    /// the first node that starts after `end`.
    pub fn visit_range(&self, start: u32, end: u32, mut f: impl FnMut(NodeIndex, &Node)) {
        let mut stack = vec![self.root];
        while let Some(idx) = stack.pop() {
            let Some(node) = self.arena.get(idx) else {
                continue;
            };
            if node.span.end < start {
                continue;
            }
            if node.span.start > end {
                break;
            }
            f(idx, node);
            let children = self.arena.children(idx);
            stack.extend(children.iter().rev().copied());
        }
    }
}
