use thiserror::Error;

/// Failure surface of the files service.
///
/// Transport implementations must fold every wire-level failure into one of
/// these variants so that retry classification downstream stays exhaustive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbxError {
    #[error("lookup failed: not found")]
    NotFound,
    /// The service refuses to serve this content for policy reasons.
    /// Never retried, at any layer.
    #[error("lookup failed: restricted content")]
    RestrictedContent,
    #[error("rate limited")]
    RateLimited {
        /// Seconds the service asked us to back off, when it said.
        retry_after: Option<u64>,
    },
    #[error("transient service error: {0}")]
    Transient(String),
    #[error("api error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    RateLimit,
    Transient,
    Restricted,
    Permanent,
}

impl DbxError {
    pub fn classification(&self) -> ErrorClass {
        match self {
            DbxError::RateLimited { .. } => ErrorClass::RateLimit,
            DbxError::Transient(_) => ErrorClass::Transient,
            DbxError::RestrictedContent => ErrorClass::Restricted,
            // Throttling sometimes arrives untyped; match the known vendor
            // signatures as a secondary heuristic.
            DbxError::Other(message)
                if message.contains("too_many_requests")
                    || message.contains("too_many_write_operations") =>
            {
                ErrorClass::RateLimit
            }
            DbxError::NotFound | DbxError::Other(_) => ErrorClass::Permanent,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.classification(),
            ErrorClass::RateLimit | ErrorClass::Transient
        )
    }
}
