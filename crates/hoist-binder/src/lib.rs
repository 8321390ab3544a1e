//! Scope analysis for the hoist workspace.
//!
//! This crate provides:
//! - `ScopeTree` - Function scopes, their bindings, and identifier resolutions
//! - `BindingResolver` - The two-pass declaration/reference resolver
//! - `ScopeSnapshot` - A canonical, serializable view of a scope tree

pub mod resolver;
pub mod scopes;
pub mod snapshot;

pub use resolver::BindingResolver;
pub use scopes::{ARGUMENTS, Binding, Scope, ScopeId, ScopeTree, THIS};
pub use snapshot::{BindingSnapshot, ScopeSnapshot};
