//! Collector settings and the collection-cycle gate.

use borealis_model::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Tuning parameters for the coin-distribution collector.
///
/// Owned by the collector repository; the miner holds an atomically
/// swappable snapshot refreshed by the settings synchronizer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectorSettings {
    /// Master switch for the whole distribution program.
    pub enabled: bool,
    /// Run a cycle regardless of the hour/bucket guards below.
    pub forced_execution: bool,
    /// Earliest UTC hour of day at which a cycle may start.
    pub start_hour: u32,
    /// First instant of the distribution program.
    pub start_date: Timestamp,
    /// Last instant of the distribution program; the release schedule drains
    /// the full remaining balance as this approaches.
    pub end_date: Timestamp,
    /// When the collector last ran a collection.
    pub latest_collecting_date: Timestamp,
    /// Minimum distributable standard balance for self-eligibility.
    pub min_balance_required: f64,
    /// Minimum mining streak for self-eligibility.
    pub min_mining_streaks_required: u64,
    /// Lower-cased ISO country names excluded from distribution.
    pub denied_countries: HashSet<String>,
}

/// Whether the collector may collect at `now`.
///
/// A cycle bucket is one `freq_min` slice of the timeline; the collector
/// never runs twice in the same bucket and never in the bucket the program
/// started in, unless `forced_execution` overrides the guards.
pub fn is_collector_enabled(
    now: Timestamp,
    freq_min: Duration,
    settings: &CollectorSettings,
) -> bool {
    if !settings.enabled || settings.start_date.is_nil() || !settings.start_date.before(now) {
        return false;
    }
    if settings.forced_execution {
        return true;
    }

    let current_bucket = now.truncate(freq_min);
    now.hour() >= settings.start_hour
        && settings.start_date.truncate(freq_min) != current_bucket
        && (settings.latest_collecting_date.is_nil()
            || settings.latest_collecting_date.truncate(freq_min) != current_bucket)
}
