//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of the tree's structural invariants
/// or malformed bookmark documents. They are independent of I/O concerns.
#[derive(Error, Debug)]
pub enum DomainError {
    /// A structural mutation was rejected before any change was made
    /// (cycle, attaching under a bookmark, deleting the root, ...).
    #[error("invalid operation: {reason}")]
    InvalidOperation { reason: String },

    /// The bookmark document could not be parsed.
    #[error("parse error at byte {offset}: {reason}")]
    ParseError { offset: usize, reason: String },

    /// A node handle does not refer to a live node in the tree.
    #[error("stale node handle")]
    StaleHandle,
}

impl DomainError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidOperation {
            reason: reason.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
