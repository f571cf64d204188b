//! Miner error types.

use borealis_distribution::DistributionError;
use thiserror::Error;

/// Miner errors.
#[derive(Error, Debug)]
pub enum MinerError {
    /// Bootstrap failed (missing or unreachable configuration is fatal).
    #[error("Bootstrap failed: {0}")]
    Bootstrap(String),

    /// A collection-cycle signaler rejected a signal.
    ///
    /// Under the barrier protocol every worker signals at most once per
    /// phase, so a full signaler means the protocol was violated.
    #[error("Collection {0} signaler is full")]
    SignalerFull(&'static str),

    /// The miner is shutting down.
    #[error("Miner is closed")]
    Closed,

    /// Distribution error.
    #[error("Distribution error: {0}")]
    Distribution(#[from] DistributionError),

    /// Health check failed.
    #[error("Health check failed: {0}")]
    Unhealthy(String),
}

/// Result type for miner operations.
pub type MinerResult<T> = Result<T, MinerError>;
