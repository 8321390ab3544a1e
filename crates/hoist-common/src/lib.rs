//! Common types and utilities for the hoist scope analyzer.
//!
//! This crate provides foundational types used across all hoist crates:
//! - Source spans (`Span`) as half-open byte ranges
//! - Position/line-map types for line/column <-> offset conversion
//! - Comment range extraction
//! - Centralized limits and thresholds
//! - Diagnostics reported by tolerant parsing

// Span - Source location tracking (byte offsets)
pub mod span;
pub use span::Span;

// Position/Range types for line/column source locations
pub mod position;
pub use position::{LineMap, Position};

// Comment parsing utilities
pub mod comments;
pub use comments::CommentRange;

// Centralized limits and thresholds
pub mod limits;

pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticCategory};
