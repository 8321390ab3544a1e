//! Engine configuration.

use hoist_common::limits::{
    BYTES_PER_NODE_ESTIMATE, DEFAULT_RECOVERY_DELAY_MS, INCREMENTAL_MIN_NODE_BUDGET,
    INCREMENTAL_NODE_MULTIPLIER,
};
use hoist_parser::ParseOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// How long after a failed parse the engine retries with a full reparse.
    pub recovery_delay_ms: u64,
    /// Options passed to every parse, partial or full.
    pub parse_options: ParseOptions,
    /// Arena growth factor tolerated before partial reparses are abandoned
    /// in favour of a compacting full reparse.
    pub incremental_node_multiplier: usize,
    pub incremental_min_node_budget: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            recovery_delay_ms: DEFAULT_RECOVERY_DELAY_MS,
            parse_options: ParseOptions::default(),
            incremental_node_multiplier: INCREMENTAL_NODE_MULTIPLIER,
            incremental_min_node_budget: INCREMENTAL_MIN_NODE_BUDGET,
        }
    }
}

impl EngineOptions {
    pub fn recovery_delay(&self) -> Duration {
        Duration::from_millis(self.recovery_delay_ms)
    }

    /// Largest arena, in nodes, that may keep growing through partial
    /// reparses for a text of `text_len` bytes.
    pub fn node_budget(&self, text_len: usize) -> usize {
        let estimated_nodes = (text_len / BYTES_PER_NODE_ESTIMATE).max(1);
        estimated_nodes
            .saturating_mul(self.incremental_node_multiplier)
            .max(self.incremental_min_node_budget)
    }
}
