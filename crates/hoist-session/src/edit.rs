//! Edit descriptors reported by the editor after every text mutation.

use hoist_common::{LineMap, Position};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("edit at offset {start} is outside a text of {len} bytes")]
    OutOfBounds { start: u32, len: usize },
    #[error("edit at offset {start} does not remove the text it claims to")]
    RemovedMismatch { start: u32 },
}

/// One text change, optionally followed by more changes that happened in the
/// same editor transaction.
///
/// `start` is a byte offset into the text as it was before this change. A
/// chained change is expressed against the text produced by its predecessor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditDescriptor {
    pub start: u32,
    #[serde(default)]
    pub inserted: String,
    #[serde(default)]
    pub removed: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Box<EditDescriptor>>,
}

impl EditDescriptor {
    pub fn new(start: u32, inserted: impl Into<String>, removed: impl Into<String>) -> Self {
        EditDescriptor {
            start,
            inserted: inserted.into(),
            removed: removed.into(),
            next: None,
        }
    }

    pub fn insert(start: u32, text: impl Into<String>) -> Self {
        EditDescriptor::new(start, text, "")
    }

    pub fn delete(start: u32, removed: impl Into<String>) -> Self {
        EditDescriptor::new(start, "", removed)
    }

    /// Build an edit from a line/column cursor position.
    pub fn at_position(
        line_map: &LineMap,
        text: &str,
        position: Position,
        inserted: impl Into<String>,
        removed: impl Into<String>,
    ) -> Option<Self> {
        let start = line_map.position_to_offset(position, text)?;
        Some(EditDescriptor::new(start, inserted, removed))
    }

    /// Append `next` at the end of the chain.
    pub fn then(mut self, next: EditDescriptor) -> Self {
        self.append(next);
        self
    }

    fn append(&mut self, next: EditDescriptor) {
        match self.next {
            Some(ref mut following) => following.append(next),
            None => self.next = Some(Box::new(next)),
        }
    }

    /// Every change in the chain, in order.
    pub fn iter(&self) -> impl Iterator<Item = &EditDescriptor> {
        std::iter::successors(Some(self), |edit| edit.next.as_deref())
    }

    /// Change in text length made by this change alone.
    pub fn delta(&self) -> i64 {
        self.inserted.len() as i64 - self.removed.len() as i64
    }

    /// Net change in text length over the whole chain.
    pub fn net_delta(&self) -> i64 {
        self.iter().map(EditDescriptor::delta).sum()
    }

    /// Apply the whole chain to `text`.
    pub fn apply(&self, text: &str) -> Result<String, EditError> {
        let mut current = text.to_string();
        for edit in self.iter() {
            let start = edit.start as usize;
            let end = start + edit.removed.len();
            match current.get(start..end) {
                Some(found) if found == edit.removed => {
                    current.replace_range(start..end, &edit.inserted);
                }
                Some(_) => return Err(EditError::RemovedMismatch { start: edit.start }),
                None => {
                    return Err(EditError::OutOfBounds {
                        start: edit.start,
                        len: current.len(),
                    });
                }
            }
        }
        Ok(current)
    }
}
