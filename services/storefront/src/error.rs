//! Custom error types for the storefront service

use common::error::StorefrontError;
use thiserror::Error;

/// Terminal failure of an order attempt
#[derive(Error, Debug)]
pub enum OrderError {
    /// The viewer has no ledger row
    #[error("Viewer not found in the ledger")]
    NotInLedger,

    /// The ledger balance does not cover the price
    #[error("Insufficient points: required {required}, available {available}")]
    Insufficient { required: u64, available: i64 },

    /// The operator endpoint did not acknowledge the order
    #[error("Order relay failed: {0}")]
    RelayFailed(String),

    /// Any failure not modeled above
    #[error("Communication failure: {0}")]
    Communication(StorefrontError),

    /// Configuration error
    #[error("Storefront configuration error: {0}")]
    Config(String),
}

impl From<StorefrontError> for OrderError {
    fn from(err: StorefrontError) -> Self {
        match err {
            StorefrontError::InsufficientBalance {
                required,
                available,
            } => OrderError::Insufficient {
                required,
                available,
            },
            StorefrontError::Relay(msg) => OrderError::RelayFailed(msg),
            other => OrderError::Communication(other),
        }
    }
}

impl OrderError {
    /// Headline shown to the viewer
    pub fn title(&self) -> &'static str {
        match self {
            OrderError::NotInLedger => "You have 0 points",
            OrderError::Insufficient { .. } => "Not enough points",
            OrderError::RelayFailed(_) => "Send failed",
            OrderError::Communication(_) | OrderError::Config(_) => "Connection error",
        }
    }

    /// Explanation shown to the viewer
    pub fn text(&self, operator_contact: &str) -> String {
        match self {
            OrderError::NotInLedger => {
                "Looks like you are not in the ledger yet. Ask the streamer to add you.".to_string()
            }
            OrderError::Insufficient {
                required,
                available,
            } => format!("This order needs {required} 🪙, but you have {available} 🪙."),
            OrderError::RelayFailed(_) => format!(
                "Could not send the order. Try again or message the streamer directly: {operator_contact}"
            ),
            OrderError::Communication(_) | OrderError::Config(_) => {
                "Could not reach the server. Try again.".to_string()
            }
        }
    }
}
