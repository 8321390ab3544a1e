//! Two-pass binding resolution.
//!
//! Pass 1 walks the tree top-down collecting declarations: every function
//! gets a scope, `var` declarators and parameters bind in the nearest
//! function scope (hoisting), and function declarations bind their name in
//! the enclosing scope. Pass 2 walks the tree again and links every
//! identifier and `this` node to the scope that binds it, creating global
//! bindings for names nothing declares.
//!
//! Both walks use an explicit work stack; every entry carries the scope it
//! is visited in.

use crate::scopes::{ARGUMENTS, ScopeId, ScopeTree, THIS};
use hoist_parser::{FunctionData, NodeArena, NodeData, NodeIndex};
use tracing::debug;

pub struct BindingResolver<'a> {
    arena: &'a NodeArena,
    scopes: &'a mut ScopeTree,
}

impl<'a> BindingResolver<'a> {
    pub fn new(arena: &'a NodeArena, scopes: &'a mut ScopeTree) -> Self {
        BindingResolver { arena, scopes }
    }

    /// Resolve a whole program from a fresh global scope.
    #[tracing::instrument(level = "debug", skip(arena), fields(nodes = arena.len()))]
    pub fn resolve_program(arena: &NodeArena, root: NodeIndex) -> ScopeTree {
        let mut scopes = ScopeTree::new(root);
        let global = scopes.global();
        BindingResolver::new(arena, &mut scopes).resolve(root, global);
        debug!(scopes = scopes.len(), "resolved program");
        scopes
    }

    /// Resolve a subtree spliced into an existing tree, rooted in `scope`.
    #[tracing::instrument(level = "debug", skip(arena, scopes))]
    pub fn resolve_subtree(
        arena: &NodeArena,
        scopes: &mut ScopeTree,
        root: NodeIndex,
        scope: ScopeId,
    ) {
        BindingResolver::new(arena, scopes).resolve(root, scope);
    }

    /// Run both passes over `root` in `scope`.
    pub fn resolve(&mut self, root: NodeIndex, scope: ScopeId) {
        self.declare(root, scope);
        self.reference(root, scope);
    }

    // Pass 1: declarations

    fn declare(&mut self, root: NodeIndex, scope: ScopeId) {
        let arena = self.arena;
        let mut stack = vec![(root, scope)];
        while let Some((node, scope)) = stack.pop() {
            let Some(n) = arena.get(node) else {
                continue;
            };
            match &n.data {
                NodeData::FunctionDeclaration(func) => {
                    if let Some(name) = arena.identifier_name(func.id) {
                        self.scopes.declare(scope, name, func.id);
                    }
                    let own = self.open_function_scope(node, func, scope);
                    stack.push((func.body, own));
                }
                NodeData::FunctionExpression(func) => {
                    let own = self.open_function_scope(node, func, scope);
                    if let Some(name) = arena.identifier_name(func.id) {
                        self.scopes.declare(own, name, func.id);
                    }
                    stack.push((func.body, own));
                }
                NodeData::VariableDeclarator { id, init } => {
                    if let Some(name) = arena.identifier_name(*id) {
                        self.scopes.declare(scope, name, *id);
                    }
                    stack.push((*init, scope));
                }
                _ => {
                    let children = arena.children(node);
                    stack.extend(children.iter().rev().map(|&child| (child, scope)));
                }
            }
        }
    }

    /// Create the scope a function owns, seeded with `arguments` and the
    /// parameters.
    fn open_function_scope(
        &mut self,
        node: NodeIndex,
        func: &FunctionData,
        parent: ScopeId,
    ) -> ScopeId {
        let own = self.scopes.create_scope(parent, node);
        self.scopes.declare(own, ARGUMENTS, node);
        for &param in &func.params {
            if let Some(name) = self.arena.identifier_name(param) {
                self.scopes.declare(own, name, param);
            }
        }
        own
    }

    // Pass 2: references

    fn reference(&mut self, root: NodeIndex, scope: ScopeId) {
        let arena = self.arena;
        let mut stack = vec![(root, scope)];
        while let Some((node, scope)) = stack.pop() {
            let Some(n) = arena.get(node) else {
                continue;
            };
            match &n.data {
                NodeData::Identifier { name } => self.reference_name(node, name, scope),
                NodeData::ThisExpression => {
                    if self.scopes.ensure_binding(scope, THIS)
                        && let Some(owner) = self.scopes.get(scope).map(|s| s.node)
                    {
                        self.scopes.declare(scope, THIS, owner);
                    }
                    self.scopes.add_reference(scope, THIS, node);
                }
                NodeData::FunctionDeclaration(func) | NodeData::FunctionExpression(func) => {
                    // Functions declared in pass 1 always own a scope; fall
                    // back to the current one for trees that skipped it.
                    let own = self.scopes.scope_of_function(node).unwrap_or(scope);
                    for &param in &func.params {
                        self.scopes.mark_resolved(param, own);
                    }
                    stack.push((func.body, own));
                    stack.push((func.id, own));
                }
                NodeData::Property { value, .. } => stack.push((*value, scope)),
                NodeData::MemberExpression {
                    object,
                    property,
                    computed,
                } => {
                    if *computed {
                        stack.push((*property, scope));
                    }
                    stack.push((*object, scope));
                }
                _ => {
                    let children = arena.children(node);
                    stack.extend(children.iter().rev().map(|&child| (child, scope)));
                }
            }
        }
    }

    fn reference_name(&mut self, node: NodeIndex, name: &str, scope: ScopeId) {
        let target = match self.scopes.lookup(scope, name) {
            Some(found) => found,
            None => {
                let global = self.scopes.global();
                self.scopes.ensure_binding(global, name);
                global
            }
        };
        self.scopes.add_reference(target, name, node);
    }
}
