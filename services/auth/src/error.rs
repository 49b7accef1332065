//! Custom error types for the identity service

use common::error::{StorageError, StorefrontError};
use thiserror::Error;

/// Custom error type for identity operations
#[derive(Error, Debug)]
pub enum AuthError {
    /// Identity handshake failed (bad token, empty handle, provider error)
    #[error("Identity exchange failed: {0}")]
    Exchange(String),

    /// Transport failure while talking to the identity provider
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Session storage failure
    #[error("Session storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration error
    #[error("Auth configuration error: {0}")]
    Config(String),

    /// A configured or derived URL is not valid
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<AuthError> for StorefrontError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Config(msg) | AuthError::InvalidUrl(msg) => StorefrontError::Validation(msg),
            other => StorefrontError::Exchange(other.to_string()),
        }
    }
}

/// Type alias for identity results
pub type AuthResult<T> = Result<T, AuthError>;
