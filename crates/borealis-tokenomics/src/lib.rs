//! # borealis-tokenomics
//!
//! Tokenomics rules shared by the mining tick and the distribution
//! processor:
//! - Runtime configuration (mining rate, session durations, distribution
//!   frequency window, extra-bonus schedule, feature flags)
//! - The pre-staking balance split
//! - Mining-streak calculation

mod config;
mod prestaking;
mod session;

pub use config::{Config, DurationRange, ExtraBonusConfig, FeatureFlags};
pub use prestaking::apply_pre_staking;
pub use session::calculate_mining_streak;
