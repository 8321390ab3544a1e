//! NodeArena creation, access, and structural editing methods.

use super::base::NodeIndex;
use super::node::*;
use hoist_common::Span;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Child list of a single node, in source order.
pub type ChildList = SmallVec<[NodeIndex; 8]>;

impl NodeArena {
    pub fn new() -> NodeArena {
        NodeArena::default()
    }

    /// Create an arena with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> NodeArena {
        NodeArena {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Add a node to the arena and return its index
    pub fn add(&mut self, span: Span, data: NodeData) -> NodeIndex {
        let index = self.nodes.len() as u32;
        self.nodes.push(Node::new(span, data));
        NodeIndex(index)
    }

    /// Get a node by index
    #[inline]
    pub fn get(&self, index: NodeIndex) -> Option<&Node> {
        if index.is_none() {
            None
        } else {
            self.nodes.get(index.0 as usize)
        }
    }

    /// Get a mutable node by index
    #[inline]
    pub fn get_mut(&mut self, index: NodeIndex) -> Option<&mut Node> {
        if index.is_none() {
            None
        } else {
            self.nodes.get_mut(index.0 as usize)
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn span(&self, index: NodeIndex) -> Option<Span> {
        self.get(index).map(|node| node.span)
    }

    pub fn identifier_name(&self, index: NodeIndex) -> Option<&str> {
        self.get(index).and_then(Node::identifier_name)
    }

    pub fn function_data(&self, index: NodeIndex) -> Option<&FunctionData> {
        self.get(index).and_then(Node::function_data)
    }

    pub fn is_function(&self, index: NodeIndex) -> bool {
        self.get(index).is_some_and(Node::is_function)
    }

    /// Children of a node in source order. Absent optional children are skipped.
    pub fn children(&self, index: NodeIndex) -> ChildList {
        let mut out = ChildList::new();
        let Some(node) = self.get(index) else {
            return out;
        };
        let mut push = |child: NodeIndex| {
            if child.is_some() {
                out.push(child);
            }
        };
        match &node.data {
            NodeData::Program { body } => body.iter().copied().for_each(&mut push),
            NodeData::FunctionDeclaration(func) | NodeData::FunctionExpression(func) => {
                push(func.id);
                func.params.iter().copied().for_each(&mut push);
                push(func.body);
            }
            NodeData::VariableDeclarator { id, init } => {
                push(*id);
                push(*init);
            }
            NodeData::MemberExpression {
                object, property, ..
            } => {
                push(*object);
                push(*property);
            }
            NodeData::Property { key, value, .. } => {
                push(*key);
                push(*value);
            }
            NodeData::Generic { children, .. } => children.iter().copied().for_each(&mut push),
            NodeData::Identifier { .. } | NodeData::ThisExpression => {}
        }
        out
    }

    /// Replace the child slot of `parent` that holds `old` with `new`.
    ///
    /// Returns `false` when `old` is not a direct child of `parent`.
    pub fn replace_child(&mut self, parent: NodeIndex, old: NodeIndex, new: NodeIndex) -> bool {
        let Some(node) = self.get_mut(parent) else {
            return false;
        };
        let swap = |slot: &mut NodeIndex| {
            if *slot == old {
                *slot = new;
                true
            } else {
                false
            }
        };
        match &mut node.data {
            NodeData::Program { body } => body.iter_mut().any(swap),
            NodeData::FunctionDeclaration(func) | NodeData::FunctionExpression(func) => {
                swap(&mut func.id) || func.params.iter_mut().any(swap) || swap(&mut func.body)
            }
            NodeData::VariableDeclarator { id, init } => swap(id) || swap(init),
            NodeData::MemberExpression {
                object, property, ..
            } => swap(object) || swap(property),
            NodeData::Property { key, value, .. } => swap(key) || swap(value),
            NodeData::Generic { children, .. } => children.iter_mut().any(swap),
            NodeData::Identifier { .. } | NodeData::ThisExpression => false,
        }
    }

    /// All nodes of the subtree rooted at `root`, in pre-order.
    pub fn subtree(&self, root: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        if self.get(root).is_none() {
            return out;
        }
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            out.push(idx);
            let children = self.children(idx);
            stack.extend(children.iter().rev().copied());
        }
        out
    }

    /// Deep-copy the subtree rooted at `root` from `source` into this arena,
    /// moving every range right by `offset`. Returns the new root index.
    ///
    /// Children are copied before their parents, matching the order the
    /// parser allocates nodes in.
    pub fn import_subtree(&mut self, source: &NodeArena, root: NodeIndex, offset: u32) -> NodeIndex {
        let order = source.subtree(root);
        let mut mapped: FxHashMap<NodeIndex, NodeIndex> = FxHashMap::default();
        mapped.reserve(order.len());
        for &old in order.iter().rev() {
            let Some(node) = source.get(old) else {
                continue;
            };
            let data = node
                .data
                .map_children(|child| mapped.get(&child).copied().unwrap_or(NodeIndex::NONE));
            let new = self.add(node.span.offset_by(offset), data);
            mapped.insert(old, new);
        }
        mapped.get(&root).copied().unwrap_or(NodeIndex::NONE)
    }
}
