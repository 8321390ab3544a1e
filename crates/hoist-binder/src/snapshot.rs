//! Canonical, arena-independent view of a scope tree.
//!
//! Two analyses of the same text produce equal snapshots no matter how their
//! arenas were built (one full parse, or a chain of partial reparses), which
//! makes snapshots the unit of comparison for convergence checks and the
//! CLI's JSON output.

use crate::scopes::{ScopeId, ScopeTree};
use hoist_common::Span;
use hoist_parser::{NodeArena, NodeIndex};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSnapshot {
    pub name: String,
    pub declarations: Vec<Span>,
    pub references: Vec<Span>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeSnapshot {
    /// Range of the node owning the scope.
    pub span: Span,
    pub level: u32,
    /// Sorted by name; bindings left without any occurrence are omitted.
    pub bindings: Vec<BindingSnapshot>,
    /// Sorted by range.
    pub children: Vec<ScopeSnapshot>,
}

impl ScopeSnapshot {
    /// Snapshot the live scopes, starting at the global scope.
    pub fn capture(tree: &ScopeTree, arena: &NodeArena) -> ScopeSnapshot {
        let mut children: FxHashMap<ScopeId, Vec<ScopeId>> = FxHashMap::default();
        for (id, scope) in tree.live_scopes() {
            if !scope.parent.is_none() {
                children.entry(scope.parent).or_default().push(id);
            }
        }
        build(tree, arena, &children, tree.global(), 0)
    }

    /// Total number of scopes in the snapshot.
    pub fn scope_count(&self) -> usize {
        1 + self.children.iter().map(ScopeSnapshot::scope_count).sum::<usize>()
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        writeln!(
            f,
            "{pad}scope {}..{} (level {})",
            self.span.start, self.span.end, self.level
        )?;
        for binding in &self.bindings {
            writeln!(
                f,
                "{pad}  {}: {} decl, {} ref",
                binding.name,
                binding.declarations.len(),
                binding.references.len()
            )?;
        }
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ScopeSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

fn build(
    tree: &ScopeTree,
    arena: &NodeArena,
    children: &FxHashMap<ScopeId, Vec<ScopeId>>,
    id: ScopeId,
    level: u32,
) -> ScopeSnapshot {
    let spans = |nodes: &[NodeIndex]| -> Vec<Span> {
        let mut out: Vec<Span> = nodes.iter().filter_map(|&n| arena.span(n)).collect();
        out.sort_by_key(|span| (span.start, span.end));
        out
    };

    let (span, mut bindings) = match tree.get(id) {
        Some(scope) => (
            arena.span(scope.node).unwrap_or_default(),
            scope
                .bindings
                .iter()
                .filter(|(_, binding)| !binding.is_empty())
                .map(|(name, binding)| BindingSnapshot {
                    name: name.clone(),
                    declarations: spans(&binding.declarations),
                    references: spans(&binding.references),
                })
                .collect::<Vec<_>>(),
        ),
        None => (Span::EMPTY, Vec::new()),
    };
    bindings.sort_by(|a, b| a.name.cmp(&b.name));

    let mut nested: Vec<ScopeSnapshot> = children
        .get(&id)
        .map(|ids| {
            ids.iter()
                .map(|&child| build(tree, arena, children, child, level + 1))
                .collect()
        })
        .unwrap_or_default();
    nested.sort_by_key(|s| (s.span.start, s.span.end));

    ScopeSnapshot {
        span,
        level,
        bindings,
        children: nested,
    }
}
