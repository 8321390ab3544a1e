//! Base index type for arena-allocated nodes.

use serde::{Deserialize, Serialize};

/// Index of a node inside a [`NodeArena`](super::node::NodeArena).
///
/// `NodeIndex::NONE` marks an absent optional child.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    pub const NONE: NodeIndex = NodeIndex(u32::MAX);

    #[inline]
    pub fn is_none(self) -> bool {
        self == NodeIndex::NONE
    }

    #[inline]
    pub fn is_some(self) -> bool {
        self != NodeIndex::NONE
    }
}
