//! The interface between a session and whatever renders its results.

use crate::analysis::Analysis;
use hoist_parser::{NodeIndex, RenderHandle};

/// What changed between the previous analysis and the current one.
#[derive(Debug, Clone, Copy)]
pub enum Change<'a> {
    /// The whole tree was rebuilt. `previous` is the tree it replaced.
    Full { previous: Option<&'a Analysis> },
    /// One function was reparsed. `replaced` is the detached old function
    /// node (still readable in the arena), `inserted` its replacement.
    Partial {
        replaced: NodeIndex,
        inserted: NodeIndex,
    },
}

pub trait Consumer {
    /// Called once for every completed analysis that was not superseded.
    fn on_analyzed(&mut self, analysis: &Analysis, change: Change<'_>);

    /// Called for every render handle the session cleared from a node that
    /// moved or left the tree.
    fn release(&mut self, handle: RenderHandle) {
        let _ = handle;
    }
}

/// Discards every notification.
impl Consumer for () {
    fn on_analyzed(&mut self, _analysis: &Analysis, _change: Change<'_>) {}
}
