//! Runtime configuration.
//!
//! The original deployment kept several of these knobs as compile-time
//! constants; here everything is a runtime field so one binary can serve
//! production and development profiles.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete miner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of parallel mining workers.
    #[serde(default = "default_workers")]
    pub workers: i64,
    /// Users fetched per worker batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    /// Development mode: minute-resolution history buckets and a short
    /// collection window.
    #[serde(default)]
    pub development: bool,
    /// Base mining rate in tokens per hour.
    #[serde(default = "default_base_mining_rate")]
    pub base_mining_rate: f64,
    /// Bounds of a single mining session.
    #[serde(default = "default_mining_session_duration")]
    pub mining_session_duration: DurationRange,
    /// Bounds of the Ethereum-distribution eligibility window.
    #[serde(default = "default_distribution_frequency")]
    pub ethereum_distribution_frequency: DurationRange,
    /// Extra-bonus schedule.
    #[serde(default)]
    pub extra_bonuses: ExtraBonusConfig,
    /// Feature flags.
    #[serde(default)]
    pub flags: FeatureFlags,
}

/// A `[min, max]` duration pair configured in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DurationRange {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl DurationRange {
    /// Lower bound.
    pub fn min(&self) -> Duration {
        Duration::from_secs(self.min_secs)
    }

    /// Upper bound.
    pub fn max(&self) -> Duration {
        Duration::from_secs(self.max_secs)
    }
}

/// Extra-bonus schedule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExtraBonusConfig {
    /// How long a claimed extra bonus boosts the solo rate.
    #[serde(default = "default_extra_bonus_duration_secs")]
    pub duration_secs: u64,
}

impl ExtraBonusConfig {
    /// The bonus window duration.
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

impl Default for ExtraBonusConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_extra_bonus_duration_secs(),
        }
    }
}

/// Runtime feature flags.
///
/// The bug-fix flags guard historical recalculation passes that live outside
/// this core; they are carried so the config schema round-trips.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Produce review records without persisting balance side effects.
    pub ethereum_distribution_dry_run: bool,
    pub balance_for_tminus1_bugfix: bool,
    pub balance_for_tminus1_bugfix_dry_run: bool,
    pub balance_t2_bugfix: bool,
    pub balance_t2_bugfix_dry_run: bool,
    pub clear_bugfix_debug_info: bool,
}

fn default_workers() -> i64 {
    10
}

fn default_batch_size() -> i64 {
    500
}

fn default_base_mining_rate() -> f64 {
    1.0
}

fn default_mining_session_duration() -> DurationRange {
    // 12h sessions, 24h before a session is unambiguously over.
    DurationRange {
        min_secs: 12 * 3600,
        max_secs: 24 * 3600,
    }
}

fn default_distribution_frequency() -> DurationRange {
    // Daily cycles, 4-week horizon.
    DurationRange {
        min_secs: 24 * 3600,
        max_secs: 28 * 24 * 3600,
    }
}

fn default_extra_bonus_duration_secs() -> u64 {
    24 * 3600
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            batch_size: default_batch_size(),
            development: false,
            base_mining_rate: default_base_mining_rate(),
            mining_session_duration: default_mining_session_duration(),
            ethereum_distribution_frequency: default_distribution_frequency(),
            extra_bonuses: ExtraBonusConfig::default(),
            flags: FeatureFlags::default(),
        }
    }
}

impl Config {
    /// Production defaults with development mode switched on.
    pub fn development() -> Self {
        Self {
            development: true,
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
