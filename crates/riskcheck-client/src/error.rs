//! Error types for the client
//!
//! [`ApiError`] classifies a single backend call. [`ClientError`] is what the
//! intake and payment operations return; the reconciler absorbs API errors
//! into its outcomes instead.

use riskcheck_core::{MissingPrecondition, RulesError, Tier};
use riskcheck_store::StoreError;
use std::path::PathBuf;

/// Failure of one backend request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// 404 for the requested resource
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// Any other non-success status
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection, timeout or protocol failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body did not match the expected shape
    #[error("cannot decode response: {0}")]
    Decode(String),

    /// The backend did not issue an assessment id
    #[error("backend response carried no assessment id")]
    MissingId,

    /// Configured base URL cannot be used
    #[error("invalid backend url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Whether the resource does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// Whether repeating the request may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Errors returned by client operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Backend request failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Checkout session could not be created
    #[error("could not start checkout: {0}")]
    Checkout(#[source] ApiError),

    /// Caller must send the user back through intake
    #[error(transparent)]
    Precondition(#[from] MissingPrecondition),

    /// Local state could not be read or written
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Action rule table failed to load
    #[error(transparent)]
    Rules(#[from] RulesError),

    /// Free tier cannot be bought
    #[error("tier {0} cannot be purchased")]
    NotPurchasable(Tier),

    /// Configuration could not be loaded
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Local file error outside the storage scopes
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the assessment does not exist on the backend
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            ClientError::Api(e) | ClientError::Checkout(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Whether the operation may succeed if repeated
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Api(e) | ClientError::Checkout(e) => e.is_retryable(),
            ClientError::Store(StoreError::Io { .. }) => true,
            _ => false,
        }
    }

    /// The missing precondition, if that is what failed
    #[must_use]
    pub fn precondition(&self) -> Option<MissingPrecondition> {
        match self {
            ClientError::Precondition(p) => Some(*p),
            _ => None,
        }
    }
}

/// Result alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(ApiError::Transport("reset".into()).is_retryable());
        assert!(ApiError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(!ApiError::Status { status: 422, body: String::new() }.is_retryable());
        assert!(ApiError::NotFound { resource: "a".into() }.is_not_found());

        let err = ClientError::Checkout(ApiError::Status { status: 502, body: "down".into() });
        assert!(err.is_retryable());
        assert!(err.to_string().starts_with("could not start checkout"));

        let err = ClientError::from(MissingPrecondition::AssessmentId);
        assert_eq!(err.precondition(), Some(MissingPrecondition::AssessmentId));
        assert!(!err.is_not_found());
    }
}
