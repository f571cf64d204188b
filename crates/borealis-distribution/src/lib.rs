//! # borealis-distribution
//!
//! Ethereum coin-distribution support for the Borealis mining core.
//!
//! This crate provides:
//! - Collector settings and the collection-cycle gate
//! - The per-user eligibility predicates (staggered schedule + full check)
//! - The release schedule over the remaining standard balance
//! - The append-only review record emitted for external settlement
//! - Collaborator traits for the collector repository and cycle notifier

mod eligibility;
mod error;
mod repository;
mod review;
mod schedule;
mod settings;

pub use eligibility::{
    is_eligible_for_distribution, is_eligible_for_distribution_now, self_check, EligibilityCheck,
    ETH_ADDRESS_SKIP, STAGGER_SLOTS,
};
pub use error::{DistributionError, DistributionResult};
pub use repository::{CollectorRepository, CycleNotifier};
pub use review::ReviewRecord;
pub use schedule::calculate_distribution_balance;
pub use settings::{is_collector_enabled, CollectorSettings};
