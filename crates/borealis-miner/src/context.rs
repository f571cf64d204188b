//! Per-tick configuration snapshot.

use borealis_distribution::CollectorSettings;
use borealis_model::Timestamp;
use borealis_tokenomics::Config;
use std::sync::Arc;
use std::time::Duration;

/// Everything a single tick is allowed to observe.
///
/// Captured once at tick start; a settings refresh mid-cycle can never
/// perturb in-flight arithmetic. Workers obtain one per batch via
/// [`crate::Miner::tick_context`].
#[derive(Debug, Clone)]
pub struct TickContext {
    /// The instant this tick runs at.
    pub now: Timestamp,
    /// Base mining rate in tokens per hour.
    pub base_mining_rate: f64,
    /// Minute-resolution history buckets and the short collection window.
    pub development: bool,
    /// How long a claimed extra bonus boosts the solo rate.
    pub extra_bonus_duration: Duration,
    /// Upper bound of a mining session.
    pub mining_session_duration_max: Duration,
    /// Lower bound of the distribution eligibility window.
    pub distribution_frequency_min: Duration,
    /// Upper bound of the distribution eligibility window.
    pub distribution_frequency_max: Duration,
    /// Collector settings snapshot.
    pub collector_settings: Arc<CollectorSettings>,
    /// End of the current collection window.
    pub collection_window_end: Timestamp,
    /// Length of one collection window.
    pub collection_window: Duration,
    /// Produce review records without persisting balance side effects.
    pub dry_run: bool,
}

impl TickContext {
    /// Build a context from a configuration plus the shared collector state.
    pub fn new(
        config: &Config,
        now: Timestamp,
        collector_settings: Arc<CollectorSettings>,
        collection_window_end: Timestamp,
    ) -> Self {
        Self {
            now,
            base_mining_rate: config.base_mining_rate,
            development: config.development,
            extra_bonus_duration: config.extra_bonuses.duration(),
            mining_session_duration_max: config.mining_session_duration.max(),
            distribution_frequency_min: config.ethereum_distribution_frequency.min(),
            distribution_frequency_max: config.ethereum_distribution_frequency.max(),
            collector_settings,
            collection_window_end,
            collection_window: crate::collector::collecting_window(config.development),
            dry_run: config.flags.ethereum_distribution_dry_run,
        }
    }
}
