//! Error types shared by the store, the reference codec, and the text resolvers.

use std::path::PathBuf;
use thiserror::Error;

/// A scripture index that does not fit the `(<Book> <Chapter>:<Verse> <Version>)` shape,
/// or a book that has no API code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("cannot parse scripture index '{0}'")]
    Parse(String),

    #[error("unknown book name '{0}'")]
    UnknownBook(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Failure while producing replacement text for one record.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("passage fetch for {reference} failed with HTTP {status}")]
    Fetch { reference: String, status: u16 },

    #[error("passage response for {reference} has no data.content")]
    ContentMissing { reference: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("translator error: {0}")]
    Translator(String),

    #[error("html extraction failed: {0}")]
    Extract(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResolveError {
    /// Failures of the remote passage API, which the reconcile run may treat as fatal.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            ResolveError::Fetch { .. } | ResolveError::ContentMissing { .. } | ResolveError::Http(_)
        )
    }
}

impl From<sqlx::Error> for ResolveError {
    fn from(e: sqlx::Error) -> Self {
        ResolveError::Store(StoreError::Sqlx(e))
    }
}
