use std::sync::Arc;

use dbx_core::DbxError;
use thiserror::Error;

use crate::scope::ScopeError;

/// Errors surfaced by store and object operations.
///
/// `Clone` so a failed metadata fetch can be replayed to later readers of
/// the same object.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("object not found: {path:?}")]
    ObjectNotFound { path: String },
    #[error("directory not found: {path:?}")]
    DirNotFound { path: String },
    /// The path addresses a folder where a file was expected.
    #[error("not a file: {path:?}")]
    NotAFile { path: String },
    /// The path addresses a file where a folder was expected.
    #[error("not a directory: {path:?}")]
    NotADirectory { path: String },
    /// Policy rejection from the service; permanently non-retryable.
    #[error("restricted content: {path:?}")]
    Restricted { path: String },
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error("directory already exists: {path:?}")]
    DirExists { path: String },
    #[error("directory not empty: {path:?}")]
    DirNotEmpty { path: String },
    #[error("can't remove the root directory")]
    CannotRemoveRoot,
    /// Server-side relocation needs both ends on the same transport;
    /// callers fall back to a stream copy.
    #[error("can't {op} between different stores")]
    CrossStore { op: &'static str },
    #[error("chunk size {requested} is too big, must be at most {max}")]
    ChunkSizeTooBig { requested: u64, max: u64 },
    #[error("read from source failed: {0}")]
    Read(Arc<std::io::Error>),
    #[error("{op}: {source}")]
    Api {
        op: &'static str,
        #[source]
        source: DbxError,
    },
}

impl StoreError {
    pub(crate) fn api(op: &'static str, source: DbxError) -> Self {
        Self::Api { op, source }
    }

    pub(crate) fn read(err: std::io::Error) -> Self {
        Self::Read(Arc::new(err))
    }
}
