//! Syntax tree storage and the recursive-descent parser.

pub mod base;
pub mod node;
mod node_arena;
pub mod state;
mod state_expressions;
mod state_statements;

pub use base::NodeIndex;
pub use node::{NodeArena, NodeData};
