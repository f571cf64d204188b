//! Collaborator seams.
//!
//! The collector repository and the cycle notifier are owned by external
//! components; the miner only ever talks to them through these traits, under
//! a per-request deadline, inside retry loops.

use crate::error::DistributionResult;
use crate::settings::CollectorSettings;
use async_trait::async_trait;

/// Repository owning the collector settings and the settlement hand-off.
#[async_trait]
pub trait CollectorRepository: Send + Sync {
    /// Fetch the current collector settings.
    async fn get_collector_settings(&self) -> DistributionResult<CollectorSettings>;

    /// Tell the settlement component that a collection cycle finished.
    async fn notify_collection_cycle_ended(&self) -> DistributionResult<()>;
}

/// Best-effort operator notifications around cycle boundaries.
#[async_trait]
pub trait CycleNotifier: Send + Sync {
    /// A collection cycle started.
    async fn cycle_started(&self) -> DistributionResult<()>;

    /// A collection cycle was aborted before all workers finished.
    async fn cycle_ended_prematurely(&self) -> DistributionResult<()>;
}
