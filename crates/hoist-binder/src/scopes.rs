//! Scope storage.
//!
//! Scopes live in a flat table indexed by [`ScopeId`]; the global scope is
//! always `ScopeId(0)`. Parent links are set once when a scope is created.
//! A scope is retired (never reused or removed from the table) when the
//! function node that owns it is spliced out of the tree.

use hoist_common::limits::MAX_SCOPE_WALK_ITERATIONS;
use hoist_parser::{NodeArena, NodeData, NodeIndex};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::trace;

/// Synthetic binding declared in every function scope.
pub const ARGUMENTS: &str = "arguments";
/// Synthetic binding created on the first `this` in a scope.
pub const THIS: &str = "this";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub const NONE: ScopeId = ScopeId(u32::MAX);
    pub const GLOBAL: ScopeId = ScopeId(0);

    #[inline]
    pub fn is_none(self) -> bool {
        self == ScopeId::NONE
    }
}

/// Every occurrence of one name within one scope.
#[derive(Clone, Debug, Default)]
pub struct Binding {
    /// Parameters, function ids, variable declarators, and the owning node
    /// for synthetic `arguments`/`this`.
    pub declarations: SmallVec<[NodeIndex; 2]>,
    /// Identifier and `this` nodes resolved to this binding.
    pub references: Vec<NodeIndex>,
}

impl Binding {
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty() && self.references.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct Scope {
    /// `ScopeId::NONE` only for the global scope.
    pub parent: ScopeId,
    /// Program node for the global scope, function node otherwise.
    pub node: NodeIndex,
    pub bindings: IndexMap<String, Binding, FxBuildHasher>,
    pub retired: bool,
}

impl Scope {
    fn new(parent: ScopeId, node: NodeIndex) -> Scope {
        Scope {
            parent,
            node,
            bindings: IndexMap::default(),
            retired: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    /// Function node -> the scope it owns.
    node_scopes: FxHashMap<NodeIndex, ScopeId>,
    /// Identifier/`this` node -> the scope holding its binding.
    resolved: FxHashMap<NodeIndex, ScopeId>,
}

impl ScopeTree {
    /// A tree holding only the global scope, owned by `program`.
    pub fn new(program: NodeIndex) -> ScopeTree {
        ScopeTree {
            scopes: vec![Scope::new(ScopeId::NONE, program)],
            node_scopes: FxHashMap::default(),
            resolved: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn global(&self) -> ScopeId {
        ScopeId::GLOBAL
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        if id.is_none() {
            None
        } else {
            self.scopes.get(id.0 as usize)
        }
    }

    fn get_mut(&mut self, id: ScopeId) -> Option<&mut Scope> {
        if id.is_none() {
            None
        } else {
            self.scopes.get_mut(id.0 as usize)
        }
    }

    /// Number of scopes ever created, retired ones included.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Scopes that are still attached to the tree.
    pub fn live_scopes(&self) -> impl Iterator<Item = (ScopeId, &Scope)> {
        self.scopes
            .iter()
            .enumerate()
            .filter(|(_, scope)| !scope.retired)
            .map(|(i, scope)| (ScopeId(i as u32), scope))
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.get(id)
            .map(|scope| scope.parent)
            .filter(|parent| !parent.is_none())
    }

    /// The scope owned by a function node.
    pub fn scope_of_function(&self, node: NodeIndex) -> Option<ScopeId> {
        self.node_scopes.get(&node).copied()
    }

    /// The scope an identifier or `this` node resolved to.
    pub fn resolved_scope(&self, node: NodeIndex) -> Option<ScopeId> {
        self.resolved.get(&node).copied()
    }

    pub fn binding(&self, scope: ScopeId, name: &str) -> Option<&Binding> {
        self.get(scope).and_then(|s| s.bindings.get(name))
    }

    /// The binding a resolved identifier or `this` node belongs to.
    pub fn binding_of(&self, arena: &NodeArena, node: NodeIndex) -> Option<&Binding> {
        let scope = self.resolved_scope(node)?;
        self.binding(scope, occurrence_name(arena, node)?)
    }

    /// Nesting depth of a scope; the global scope is level 0.
    pub fn level(&self, id: ScopeId) -> u32 {
        let mut level = 0;
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            level += 1;
            current = parent;
            if level as usize >= MAX_SCOPE_WALK_ITERATIONS {
                break;
            }
        }
        level
    }

    /// Names declared in a scope, in first-declaration order, without the
    /// synthetic `arguments` and `this` bindings or names that only carry
    /// references.
    pub fn declared_names(&self, id: ScopeId) -> Vec<&str> {
        let Some(scope) = self.get(id) else {
            return Vec::new();
        };
        scope
            .bindings
            .iter()
            .filter(|(name, binding)| {
                name.as_str() != ARGUMENTS
                    && name.as_str() != THIS
                    && !binding.declarations.is_empty()
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Nearest scope, starting at `from` and walking outwards, that binds `name`.
    pub fn lookup(&self, from: ScopeId, name: &str) -> Option<ScopeId> {
        let mut current = from;
        for _ in 0..MAX_SCOPE_WALK_ITERATIONS {
            let scope = self.get(current)?;
            if scope.bindings.contains_key(name) {
                return Some(current);
            }
            if scope.parent.is_none() {
                return None;
            }
            current = scope.parent;
        }
        None
    }

    // Mutation, used by the resolver and the splice path.

    pub(crate) fn create_scope(&mut self, parent: ScopeId, node: NodeIndex) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(parent, node));
        self.node_scopes.insert(node, id);
        id
    }

    pub(crate) fn declare(&mut self, scope: ScopeId, name: &str, node: NodeIndex) {
        if let Some(s) = self.get_mut(scope) {
            s.bindings
                .entry(name.to_string())
                .or_default()
                .declarations
                .push(node);
        }
    }

    /// Make sure `scope` binds `name`, creating an empty binding if needed.
    /// Returns whether the binding was created.
    pub(crate) fn ensure_binding(&mut self, scope: ScopeId, name: &str) -> bool {
        let Some(s) = self.get_mut(scope) else {
            return false;
        };
        if s.bindings.contains_key(name) {
            return false;
        }
        s.bindings.insert(name.to_string(), Binding::default());
        true
    }

    pub(crate) fn add_reference(&mut self, scope: ScopeId, name: &str, node: NodeIndex) {
        let Some(binding) = self
            .get_mut(scope)
            .and_then(|s| s.bindings.get_mut(name))
        else {
            return;
        };
        binding.references.push(node);
        self.resolved.insert(node, scope);
    }

    /// Record a resolution without adding a reference occurrence.
    pub(crate) fn mark_resolved(&mut self, node: NodeIndex, scope: ScopeId) {
        self.resolved.insert(node, scope);
    }

    /// Detach the subtree rooted at `root` from the scope tree.
    ///
    /// Scopes owned by functions in the subtree are retired; occurrences of
    /// subtree nodes are removed from the surviving scopes' bindings. Binding
    /// names themselves are kept. Returns the number of retired scopes.
    pub fn retract_subtree(&mut self, arena: &NodeArena, root: NodeIndex) -> usize {
        let nodes = arena.subtree(root);
        let removed: FxHashSet<NodeIndex> = nodes.iter().copied().collect();
        let mut touched: FxHashSet<(ScopeId, String)> = FxHashSet::default();
        let mut retired = 0;

        for &idx in &nodes {
            if let Some(scope) = self.resolved.remove(&idx)
                && let Some(name) = occurrence_name(arena, idx)
            {
                touched.insert((scope, name.to_string()));
            }
            if let Some(scope) = self.node_scopes.remove(&idx) {
                // A declaration's id lives in the scope enclosing its own.
                if let Some(func) = arena.function_data(idx)
                    && let Some(name) = arena.identifier_name(func.id)
                    && let Some(parent) = self.parent(scope)
                {
                    touched.insert((parent, name.to_string()));
                }
                if let Some(s) = self.get_mut(scope) {
                    s.retired = true;
                    s.bindings.clear();
                    retired += 1;
                }
            }
        }

        for (scope, name) in touched {
            let Some(s) = self.get_mut(scope) else {
                continue;
            };
            if s.retired {
                continue;
            }
            if let Some(binding) = s.bindings.get_mut(&name) {
                binding.declarations.retain(|n| !removed.contains(n));
                binding.references.retain(|n| !removed.contains(n));
            }
        }

        trace!(root = root.0, retired, "retracted subtree from scope tree");
        retired
    }
}

/// Binding name an occurrence node stands for.
pub(crate) fn occurrence_name(arena: &NodeArena, node: NodeIndex) -> Option<&str> {
    match &arena.get(node)?.data {
        NodeData::Identifier { name } => Some(name),
        NodeData::ThisExpression => Some(THIS),
        _ => None,
    }
}
