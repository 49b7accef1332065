//! Custom error types for the common library
//!
//! This module defines the error taxonomy shared by the storefront gateways
//! and the order workflow, plus the error type of the storage stand-in.

use thiserror::Error;

/// Custom error type for storefront operations
#[derive(Error, Debug)]
pub enum StorefrontError {
    /// Local precondition failure; never reaches the network
    #[error("Validation error: {0}")]
    Validation(String),

    /// Malformed or unreachable remote response
    #[error("Backend error: {0}")]
    Backend(String),

    /// Business-rule rejection: the ledger balance does not cover the price
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: u64, available: i64 },

    /// Operator notification could not be delivered
    #[error("Relay error: {0}")]
    Relay(String),

    /// Identity handshake failure
    #[error("Exchange error: {0}")]
    Exchange(String),
}

impl StorefrontError {
    /// Wrap any displayable transport or decoding failure as a backend error.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        StorefrontError::Backend(err.to_string())
    }
}

/// Type alias for Result with StorefrontError
pub type StorefrontResult<T> = Result<T, StorefrontError>;

/// Custom error type for key-value storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Error occurred while reading or writing the backing file
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored value could not be encoded or decoded
    #[error("Storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Key cannot be mapped onto the backing store
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Type alias for Result with StorageError
pub type StorageResult<T> = Result<T, StorageError>;
