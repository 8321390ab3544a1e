//! Scanner/tokenizer for the hoist scope analyzer.
//!
//! This crate provides the lexical analysis phase:
//! - `SyntaxKind` - Token types
//! - `ScannerState` - Tokenizer state machine with slash re-scanning for
//!   regular expression literals

pub mod scanner;
pub mod syntax_kind;

pub use scanner::{ScannerSnapshot, ScannerState, Token};
pub use syntax_kind::SyntaxKind;
