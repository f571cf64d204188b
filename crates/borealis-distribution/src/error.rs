//! Distribution error types.

use thiserror::Error;

/// Distribution errors.
#[derive(Error, Debug)]
pub enum DistributionError {
    /// The collector repository call failed.
    #[error("Collector repository error: {0}")]
    Repository(String),

    /// A cycle notification could not be delivered.
    #[error("Cycle notification failed: {0}")]
    Notification(String),

    /// The surrounding operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Result type for distribution operations.
pub type DistributionResult<T> = Result<T, DistributionError>;
