//! Centralized limits and thresholds.
//!
//! Shared constants for recursion depths, walk bounds, and the incremental
//! engine's tuning knobs. Configurable values here are only defaults; the
//! session reads the effective values from its options.

// =============================================================================
// Recursion Depth Limits
// =============================================================================

/// Maximum nesting depth of statements and expressions accepted by the parser.
///
/// Each nesting level costs several stack frames in the recursive-descent
/// parser and again in both resolver passes. Sources nested deeper than this
/// are rejected with a parse error instead of overflowing the stack.
///
/// ```javascript
/// // 300 nested groupings or 300 nested closures both exceed the limit:
/// ((((((((((((((((((((( /* ... */ x )))))))))))))))))))));
/// ```
pub const MAX_NESTING_DEPTH: u32 = 256;

/// Maximum number of parent links followed when resolving a name.
///
/// Scope chains are acyclic by construction; this is a guard against a
/// corrupted parent table during splicing.
pub const MAX_SCOPE_WALK_ITERATIONS: usize = 10_000;

// =============================================================================
// Incremental Engine
// =============================================================================

/// Delay before a failed parse falls back to a full reparse.
pub const DEFAULT_RECOVERY_DELAY_MS: u64 = 200;

/// Rough number of source bytes per syntax node, used to estimate how many
/// nodes a healthy arena for a given text should hold.
pub const BYTES_PER_NODE_ESTIMATE: usize = 20;

/// Partial reparses leave the replaced subtree behind in the arena. Once the
/// arena exceeds `estimated_nodes * INCREMENTAL_NODE_MULTIPLIER`, the engine
/// prefers a full reparse, which rebuilds a compact arena.
pub const INCREMENTAL_NODE_MULTIPLIER: usize = 4;

/// Lower bound for the arena node budget so tiny documents never trip it.
pub const INCREMENTAL_MIN_NODE_BUDGET: usize = 4096;
