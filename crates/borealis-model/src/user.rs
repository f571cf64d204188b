//! User and referral records.
//!
//! `User` is the single flat record the mining tick and the distribution
//! processor operate on. The external stores own the schemas; the serde
//! derives are the round-trip seam, so every field here must survive a
//! serialize/deserialize cycle unchanged.

use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// Placeholder username used in review records when the referrer record is
/// missing or carries no username.
pub const BOGUS_USERNAME: &str = "borealis/bogus";

/// KYC verification state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycState {
    /// No KYC attempt on record.
    #[default]
    None,
    /// Verification submitted, not yet decided.
    Pending,
    /// Verification passed.
    Accepted,
    /// Verification failed or was revoked.
    Rejected,
}

impl KycState {
    /// Whether the user cleared KYC.
    pub fn accepted(self) -> bool {
        matches!(self, KycState::Accepted)
    }
}

/// The full per-user accounting record.
///
/// Loaded at tick start, mutated exclusively by the mining tick and the
/// distribution processor, written back by the worker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    // Identity.
    pub user_id: String,
    pub id: i64,
    pub id_t0: i64,
    pub id_tminus1: i64,
    pub username: String,
    pub country: String,
    pub kyc_state: KycState,
    pub mining_blockchain_account_address: String,

    // Session.
    pub mining_session_solo_started_at: Timestamp,
    pub mining_session_solo_ended_at: Timestamp,
    pub mining_session_solo_previously_ended_at: Timestamp,
    pub mining_session_solo_last_started_at: Timestamp,
    pub extra_bonus_started_at: Timestamp,
    /// Extra bonus in percent of the base rate.
    pub extra_bonus: u16,
    pub utc_offset: i32,

    // Minted balances.
    pub balance_solo: f64,
    pub balance_t0: f64,
    pub balance_t1: f64,
    pub balance_t2: f64,

    // Rewards this user generated for each upstream referrer.
    pub balance_for_t0: f64,
    pub balance_for_tminus1: f64,

    // Staged deltas from external events, reconciled during a tick.
    pub balance_solo_pending: f64,
    pub balance_t1_pending: f64,
    pub balance_t2_pending: f64,
    pub balance_solo_pending_applied: f64,
    pub balance_t1_pending_applied: f64,
    pub balance_t2_pending_applied: f64,

    // Aggregates per tick window.
    pub balance_total_standard: f64,
    pub balance_total_pre_staking: f64,
    pub balance_total_minted: f64,
    pub balance_total_slashed: f64,

    // Ethereum-distribution counterparts.
    pub balance_solo_ethereum: f64,
    pub balance_t0_ethereum: f64,
    pub balance_t1_ethereum: f64,
    pub balance_t2_ethereum: f64,
    pub balance_for_t0_ethereum: f64,
    pub balance_for_tminus1_ethereum: f64,
    pub balance_solo_ethereum_pending: Option<f64>,
    pub balance_t0_ethereum_pending: Option<f64>,
    pub balance_t1_ethereum_pending: Option<f64>,
    pub balance_t2_ethereum_pending: Option<f64>,

    // Slashing rates, armed lazily when the source balance enters the
    // post-session window.
    pub slashing_rate_solo: f64,
    pub slashing_rate_t0: f64,
    pub slashing_rate_t1: f64,
    pub slashing_rate_t2: f64,
    pub slashing_rate_for_t0: f64,
    pub slashing_rate_for_tminus1: f64,

    // Referral counts.
    pub active_t1_referrals: i32,
    pub active_t2_referrals: i32,

    // Resurrection marks.
    pub resurrect_solo_used_at: Timestamp,
    pub resurrect_t0_used_at: Timestamp,
    pub resurrect_tminus1_used_at: Timestamp,

    // Pre-staking.
    /// Share of the total balance allocated to pre-staking, 0..=100.
    pub pre_staking_allocation: u8,
    /// Pre-staking bonus in percent.
    pub pre_staking_bonus: u16,

    // Ethereum-distribution bookkeeping.
    pub solo_last_ethereum_coin_distribution_processed_at: Timestamp,
    pub for_t0_last_ethereum_coin_distribution_processed_at: Timestamp,
    pub for_tminus1_last_ethereum_coin_distribution_processed_at: Timestamp,

    // Housekeeping.
    pub balance_last_updated_at: Timestamp,
    pub extra_bonus_last_claim_available_at: Timestamp,
    pub referrals_count_change_guard_updated_at: Timestamp,

    /// Bucket label set only on history snapshots emitted by the tick.
    pub history_part: String,
}

impl User {
    /// Whether a mining session is active at `now`.
    pub fn mining_session_active(&self, now: Timestamp) -> bool {
        self.mining_session_solo_ended_at.after(now)
    }
}

/// The subset of a user record needed to evaluate a T0 or T-1 referrer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Referral {
    pub user_id: String,
    pub id: i64,
    pub id_t0: i64,
    pub username: String,
    pub country: String,
    pub kyc_state: KycState,
    pub mining_blockchain_account_address: String,
    pub mining_session_solo_started_at: Timestamp,
    pub mining_session_solo_ended_at: Timestamp,
    pub mining_session_solo_previously_ended_at: Timestamp,
    pub resurrect_solo_used_at: Timestamp,
    pub pre_staking_allocation: u8,
    pub pre_staking_bonus: u16,
    pub balance_total_standard: f64,
    pub balance_solo_ethereum: f64,
    pub balance_t0_ethereum: f64,
    pub balance_t1_ethereum: f64,
    pub balance_t2_ethereum: f64,
}

impl Referral {
    /// Whether the referrer's mining session is active at `now`.
    pub fn mining_session_active(&self, now: Timestamp) -> bool {
        !self.mining_session_solo_ended_at.is_nil() && self.mining_session_solo_ended_at.after(now)
    }

    /// Whether the referrer's mining session is over at `now`.
    pub fn mining_session_over(&self, now: Timestamp) -> bool {
        !self.mining_session_solo_ended_at.is_nil() && self.mining_session_solo_ended_at.before(now)
    }

    /// The referrer's remaining distributable standard balance.
    pub fn distributable_balance(&self) -> f64 {
        self.balance_total_standard
            - self.balance_solo_ethereum
            - self.balance_t0_ethereum
            - self.balance_t1_ethereum
            - self.balance_t2_ethereum
    }
}

/// Username for review records, with the placeholder for missing referrers.
pub fn referral_username(referral: Option<&Referral>) -> String {
    match referral {
        Some(r) if !r.username.is_empty() => r.username.clone(),
        _ => BOGUS_USERNAME.to_string(),
    }
}
