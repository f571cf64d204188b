//! # borealis-miner
//!
//! The mining and referral-reward accounting core.
//!
//! This crate provides:
//! - The per-user mining tick (`mine`): minting, slashing, pending
//!   reconciliation, resurrection and referral rewiring
//! - The Ethereum coin-distribution processor emitting review records
//! - The collection-cycle worker-manager barrier and the settings
//!   synchronizer
//! - The `Miner` client surface wiring it all together
//!
//! The tick and the processor are pure over their inputs plus an immutable
//! [`TickContext`] snapshot; all shared state lives behind the `Miner`
//! handle.

mod collector;
mod context;
mod distribution;
mod engine;
mod error;
mod mine;
mod resurrect;

pub use context::TickContext;
pub use distribution::process_ethereum_coin_distribution;
pub use engine::Miner;
pub use error::{MinerError, MinerResult};
pub use mine::{mine, MineOutcome};

use std::time::Duration;

/// Deadline applied to every external call.
pub const REQUEST_DEADLINE: Duration = Duration::from_secs(30);

/// How often the settings synchronizer refreshes the collector snapshot.
pub const SETTINGS_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// T0 share of the base rate, in percent.
pub const T0_RATE_PERCENT: f64 = 25.0;

/// T1 share of the base rate per active referral, in percent.
pub const T1_RATE_PERCENT: f64 = 25.0;

/// T2 and T-1 share of the base rate, in percent.
pub const T2_RATE_PERCENT: f64 = 5.0;

/// Post-session drain horizon: balances drain over 60 days at hourly
/// resolution.
pub const SLASHING_DRAIN_DAYS: f64 = 60.0;
