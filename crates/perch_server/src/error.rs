//! Error types for the sync server.

use perch_store::StoreError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the sync server.
///
/// Malformed cursors never surface here: they are recovered internally
/// by forcing a full reset. Unknown groups or clients on pull are
/// "nothing to sync yet", also not errors.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid request shape or contents.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication failed.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The caller targeted another principal's data.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// The backing store failed; the caller should retry with the same
    /// cursor or batch.
    #[error("store error: {0}")]
    Store(StoreError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ForeignClientGroup { group } => {
                ServerError::NotAuthorized(format!("client group {group} belongs to another user"))
            }
            StoreError::ClientGroupMismatch { client, group } => ServerError::InvalidRequest(
                format!("client {client} is registered under group {group}"),
            ),
            other => ServerError::Store(other),
        }
    }
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::InvalidRequest(_)
                | ServerError::AuthenticationFailed(_)
                | ServerError::NotAuthorized(_)
        )
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(self, ServerError::Store(_) | ServerError::Internal(_))
    }

    /// Returns true if the client may retry the identical request.
    /// Pulls and pushes are both safe to repeat.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServerError::Store(err) => err.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(ServerError::InvalidRequest("bad".into()).is_client_error());
        assert!(ServerError::NotAuthorized("nope".into()).is_client_error());
        assert!(ServerError::Internal("oops".into()).is_server_error());
        assert!(!ServerError::Internal("oops".into()).is_client_error());
    }

    #[test]
    fn store_unavailability_is_retryable() {
        let err = ServerError::from(StoreError::Unavailable("down".into()));
        assert!(err.is_retryable());
        assert!(err.is_server_error());
    }

    #[test]
    fn foreign_group_maps_to_not_authorized() {
        let err = ServerError::from(StoreError::ForeignClientGroup { group: "g1".into() });
        assert!(matches!(err, ServerError::NotAuthorized(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn group_mismatch_maps_to_invalid_request() {
        let err = ServerError::from(StoreError::ClientGroupMismatch {
            client: "c1".into(),
            group: "g9".into(),
        });
        assert!(matches!(err, ServerError::InvalidRequest(_)));
    }
}
