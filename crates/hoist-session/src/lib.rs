//! Incremental scope analysis sessions.
//!
//! A [`Session`] owns the current text, its syntax tree and scope tree, and
//! keeps them consistent with a stream of edits. Each edit is reparsed on a
//! background worker, either as the smallest enclosing function (a partial
//! reparse spliced back into the tree) or as the whole document. Parse
//! failures arm a debounced recovery timer that falls back to a full
//! reparse. Completed analyses are reported to a [`Consumer`].

pub mod analysis;
pub mod consumer;
pub mod edit;
pub mod error;
pub mod options;
pub mod session;
mod splice;
mod worker;

pub use analysis::Analysis;
pub use consumer::{Change, Consumer};
pub use edit::{EditDescriptor, EditError};
pub use error::ReparseError;
pub use options::EngineOptions;
pub use session::{Session, SessionStats};
