//! Parser and syntax tree types for the hoist scope analyzer.
//!
//! This crate provides:
//! - `NodeArena` - Arena storage for syntax nodes, addressed by `NodeIndex`
//! - `NodeData` - The closed set of node kinds the analysis traverses
//! - `ParserState` - Recursive-descent parser for the ES5 grammar
//! - `SourceParser` - The parse contract the incremental engine depends on

pub mod parser;
pub mod source_parser;

pub use parser::base::NodeIndex;
pub use parser::node::{
    FunctionData, GenericKind, Node, NodeArena, NodeData, PropertyKind, RenderHandle, RenderState,
};
pub use parser::state::{ParseError, ParseOptions, ParseResult, ParsedSource, ParserState};
pub use source_parser::{EsParser, SourceParser};
