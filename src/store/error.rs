//! Errors returned by record store operations

use thiserror::Error;

/// Failure of a single record store call.
///
/// Every variant is treated as a remote failure by the optimistic update path;
/// whole-record flows surface them to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Request to record store failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Record store returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Record store rejected the request: {0}")]
    Rejected(String),

    #[error("Record {id} not found in {table}")]
    NotFound { table: String, id: String },

    #[error("Malformed record store response: {0}")]
    Decode(String),
}

impl StoreError {
    /// Whether retrying the same request later could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Network(_) => true,
            StoreError::Status { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            StoreError::Rejected(_) | StoreError::NotFound { .. } | StoreError::Decode(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let server = StoreError::Status {
            status: 503,
            message: "unavailable".into(),
        };
        assert!(server.is_transient());

        let client = StoreError::Status {
            status: 400,
            message: "bad request".into(),
        };
        assert!(!client.is_transient());
        assert!(!StoreError::Rejected("nope".into()).is_transient());
    }

    #[test]
    fn test_status_display() {
        let err = StoreError::Status {
            status: 404,
            message: "missing".into(),
        };
        assert_eq!(err.to_string(), "Record store returned 404: missing");
    }
}
