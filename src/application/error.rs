//! Application-level errors (wraps domain errors)

use std::io;
use std::path::Path;

use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add orchestration-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("config error: {message}")]
    Config { message: String },

    /// A second submission was attempted while a classification cycle is
    /// outstanding; the caller must serialize cycles.
    #[error("a classification cycle is already in flight")]
    ClassificationPending,

    /// The selected scope contains no bookmarks to classify.
    #[error("no bookmarks to classify in the selected scope")]
    NothingToClassify,

    /// `resubmit` or `complete` was called without a prior cycle.
    #[error("no classification cycle to continue")]
    NoCycle,

    /// A preview/favicon/AI collaborator reported a failure. Never corrupts
    /// the tree; surfaced as the outcome of that async cycle.
    #[error("collaborator failure: {message}")]
    Collaborator { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    pub fn collaborator(message: impl Into<String>) -> Self {
        Self::Collaborator {
            message: message.into(),
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;

/// Extension trait for converting `io::Result` to `ApplicationResult` with
/// path context attached.
pub trait IoResultExt<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, path.display()),
            source: Box::new(e),
        })
    }
}
