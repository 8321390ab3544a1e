use hoist_parser::ParseError;

/// Failures inside the reparse pipeline.
///
/// `Parse` and `StructuralMismatch` are handled by the session itself
/// (recovery timer, immediate full reparse) and only surface through
/// [`Session::last_error`](crate::Session::last_error). The worker variants
/// are returned to the session's owner.
#[derive(Debug, thiserror::Error)]
pub enum ReparseError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("structural mismatch: {0}")]
    StructuralMismatch(String),
    #[error("parse worker has stopped")]
    WorkerGone,
    #[error("failed to start parse worker")]
    Spawn(#[source] std::io::Error),
}

impl ReparseError {
    pub(crate) fn mismatch(reason: impl Into<String>) -> Self {
        ReparseError::StructuralMismatch(reason.into())
    }
}
