//! Syntax node types.
//!
//! # Architecture
//!
//! Nodes live in a single [`NodeArena`] and refer to each other by
//! [`NodeIndex`]. The node kinds the scope analysis treats specially get their
//! own [`NodeData`] variant; every other construct is a [`NodeData::Generic`]
//! node carrying a [`GenericKind`] tag and its children in source order.
//!
//! Every node carries a half-open byte range and a consumer-owned
//! [`RenderState`] slot that the incremental engine clears whenever it moves
//! or replaces the node.

use super::base::NodeIndex;
use hoist_common::Span;
use serde::Serialize;
use smallvec::SmallVec;

/// Opaque handle to a resource a rendering consumer attached to a node
/// (a bracket element, a text mark, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct RenderHandle(pub u64);

/// Per-node render bookkeeping owned by the consumer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RenderState {
    pub rendered: bool,
    pub handle: Option<RenderHandle>,
}

impl RenderState {
    /// Reset the slot, returning the handle the consumer must release.
    pub fn invalidate(&mut self) -> Option<RenderHandle> {
        self.rendered = false;
        self.handle.take()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct FunctionData {
    /// Function name, `NodeIndex::NONE` for anonymous expressions.
    pub id: NodeIndex,
    pub params: SmallVec<[NodeIndex; 4]>,
    pub body: NodeIndex,
}

impl FunctionData {
    fn map_children(&self, child: &mut impl FnMut(NodeIndex) -> NodeIndex) -> FunctionData {
        FunctionData {
            id: child(self.id),
            params: self.params.iter().map(|&p| child(p)).collect(),
            body: child(self.body),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PropertyKind {
    Init,
    Get,
    Set,
}

/// Tags for constructs without scope semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum GenericKind {
    // Statements
    ExpressionStatement,
    BlockStatement,
    EmptyStatement,
    VariableDeclaration,
    IfStatement,
    ForStatement,
    ForInStatement,
    WhileStatement,
    DoWhileStatement,
    ReturnStatement,
    BreakStatement,
    ContinueStatement,
    ThrowStatement,
    TryStatement,
    CatchClause,
    SwitchStatement,
    SwitchCase,
    LabeledStatement,
    WithStatement,
    DebuggerStatement,

    // Expressions
    SequenceExpression,
    AssignmentExpression,
    ConditionalExpression,
    BinaryExpression,
    LogicalExpression,
    UnaryExpression,
    UpdateExpression,
    CallExpression,
    NewExpression,
    ArrayExpression,
    ObjectExpression,
    Literal,

    // Names that are never variable references
    /// Object literal key or non-computed member property (`b` in `a.b`).
    PropertyName,
    /// Statement label (`outer` in `outer: for (;;) break outer;`).
    Label,
}

#[derive(Clone, Debug, Serialize)]
pub enum NodeData {
    Program {
        body: Vec<NodeIndex>,
    },
    FunctionDeclaration(FunctionData),
    FunctionExpression(FunctionData),
    VariableDeclarator {
        id: NodeIndex,
        /// `NodeIndex::NONE` when there is no initializer.
        init: NodeIndex,
    },
    Identifier {
        name: String,
    },
    MemberExpression {
        object: NodeIndex,
        property: NodeIndex,
        computed: bool,
    },
    Property {
        key: NodeIndex,
        value: NodeIndex,
        kind: PropertyKind,
    },
    ThisExpression,
    Generic {
        kind: GenericKind,
        children: SmallVec<[NodeIndex; 4]>,
    },
}

impl NodeData {
    /// Clone the payload with every present child index passed through `map`.
    pub fn map_children(&self, mut map: impl FnMut(NodeIndex) -> NodeIndex) -> NodeData {
        let mut child = move |idx: NodeIndex| {
            if idx.is_none() {
                NodeIndex::NONE
            } else {
                map(idx)
            }
        };
        match self {
            NodeData::Program { body } => NodeData::Program {
                body: body.iter().map(|&c| child(c)).collect(),
            },
            NodeData::FunctionDeclaration(func) => {
                NodeData::FunctionDeclaration(func.map_children(&mut child))
            }
            NodeData::FunctionExpression(func) => {
                NodeData::FunctionExpression(func.map_children(&mut child))
            }
            NodeData::VariableDeclarator { id, init } => NodeData::VariableDeclarator {
                id: child(*id),
                init: child(*init),
            },
            NodeData::Identifier { name } => NodeData::Identifier { name: name.clone() },
            NodeData::MemberExpression {
                object,
                property,
                computed,
            } => NodeData::MemberExpression {
                object: child(*object),
                property: child(*property),
                computed: *computed,
            },
            NodeData::Property { key, value, kind } => NodeData::Property {
                key: child(*key),
                value: child(*value),
                kind: *kind,
            },
            NodeData::ThisExpression => NodeData::ThisExpression,
            NodeData::Generic { kind, children } => NodeData::Generic {
                kind: *kind,
                children: children.iter().map(|&c| child(c)).collect(),
            },
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Node {
    pub span: Span,
    pub data: NodeData,
    #[serde(skip)]
    pub render: RenderState,
}

impl Node {
    pub fn new(span: Span, data: NodeData) -> Node {
        Node {
            span,
            data,
            render: RenderState::default(),
        }
    }

    #[inline]
    pub fn is_function(&self) -> bool {
        matches!(
            self.data,
            NodeData::FunctionDeclaration(_) | NodeData::FunctionExpression(_)
        )
    }

    pub fn function_data(&self) -> Option<&FunctionData> {
        match &self.data {
            NodeData::FunctionDeclaration(func) | NodeData::FunctionExpression(func) => Some(func),
            _ => None,
        }
    }

    pub fn identifier_name(&self) -> Option<&str> {
        match &self.data {
            NodeData::Identifier { name } => Some(name),
            _ => None,
        }
    }

    pub fn generic_kind(&self) -> Option<GenericKind> {
        match &self.data {
            NodeData::Generic { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Short human-readable kind name, used in logs and dumps.
    pub fn kind_name(&self) -> &'static str {
        match &self.data {
            NodeData::Program { .. } => "Program",
            NodeData::FunctionDeclaration(_) => "FunctionDeclaration",
            NodeData::FunctionExpression(_) => "FunctionExpression",
            NodeData::VariableDeclarator { .. } => "VariableDeclarator",
            NodeData::Identifier { .. } => "Identifier",
            NodeData::MemberExpression { .. } => "MemberExpression",
            NodeData::Property { .. } => "Property",
            NodeData::ThisExpression => "ThisExpression",
            NodeData::Generic { .. } => "Generic",
        }
    }
}

/// Arena-based storage for syntax nodes.
/// Nodes are stored contiguously and referenced by index.
#[derive(Debug, Default, Clone, Serialize)]
pub struct NodeArena {
    pub nodes: Vec<Node>,
}
