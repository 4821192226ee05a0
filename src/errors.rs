use sqlx;
use thiserror::Error;
use warp::reject;

/// Enumerates high-level errors returned by this library.
///
/// Each variant belongs to one class of the error taxonomy: validation
/// (400), authentication (401), authorization (403), not-found (404) and
/// unexpected failures (500). The HTTP mapping lives in
/// [`crate::routes::rejection`].
#[derive(Debug, Error)]
pub enum BackendError {
    /// Represents malformed or missing input.
    #[error("{message}")]
    Validation { message: String },

    /// Represents a missing, invalid or expired bearer token.
    #[error("{message}")]
    Unauthenticated { message: String },

    /// Represents a failed role, ownership or membership check.
    #[error("{message}")]
    Forbidden { message: String },

    /// Represents a referenced entity that does not exist.
    #[error("{what} not found")]
    NotFound { what: String },

    /// Represents a conditional update that lost against a concurrent
    /// writer, or a unique-constraint collision.
    #[error("conflicting concurrent update on {what}")]
    Conflict { what: String },

    /// Represents a password hashing or token signing failure.
    #[error("credential error: {message}")]
    Crypto { message: String },

    /// Represents an SQL error.
    #[error("SQLx error: {source}")]
    Sqlx { source: sqlx::Error },

    /// Represents an embedded document that could not be decoded.
    #[error("malformed stored document: {source}")]
    StoredDocument { source: serde_json::Error },
}

impl BackendError {
    pub fn validation(message: impl Into<String>) -> Self {
        BackendError::Validation {
            message: message.into(),
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        BackendError::Unauthenticated {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        BackendError::Forbidden {
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        BackendError::NotFound { what: what.into() }
    }
}

impl reject::Reject for BackendError {}
