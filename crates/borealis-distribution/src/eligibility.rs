//! Per-user distribution eligibility.
//!
//! Two pure predicates gate every review record:
//! - [`is_eligible_for_distribution_now`] answers "is this id's window open
//!   at `now`", staggering ids across the frequency window so the whole user
//!   base is not distributed in one cycle.
//! - [`is_eligible_for_distribution`] is the full conjunction over balance,
//!   KYC, country, session and streak state.

use crate::settings::CollectorSettings;
use borealis_model::{KycState, Timestamp};
use borealis_tokenomics::calculate_mining_streak;
use std::collections::HashSet;
use std::time::Duration;

/// Sentinel address that waives the blockchain-address requirement on the
/// referral-side eligibility check.
pub const ETH_ADDRESS_SKIP: &str = "skip";

/// Number of stagger slots ids are partitioned into.
///
/// Ids sharing a slot become eligible at the same shift into the window;
/// 64 slots keep per-cycle load within an order of magnitude of uniform.
pub const STAGGER_SLOTS: u64 = 64;

/// Deterministic per-id shift inside the `[freq_min, freq_max]` slack.
fn stagger_shift(entity_id: i64, freq_min: Duration, freq_max: Duration) -> Duration {
    let slack_ms = freq_max.saturating_sub(freq_min).as_millis() as u64;
    if slack_ms == 0 {
        return Duration::ZERO;
    }
    let slot = entity_id.unsigned_abs() % STAGGER_SLOTS;

    Duration::from_millis(slot * (slack_ms / STAGGER_SLOTS))
}

/// Whether `entity_id`'s distribution window is open at `now`.
///
/// With no prior distribution the id's first window opens its stagger shift
/// after the program start; afterwards the id is eligible when the time
/// since the last distribution falls inside its shifted
/// `[freq_min, freq_max]` window.
pub fn is_eligible_for_distribution_now(
    entity_id: i64,
    now: Timestamp,
    last_processed_at: Timestamp,
    start_date: Timestamp,
    freq_min: Duration,
    freq_max: Duration,
) -> bool {
    if start_date.is_nil() || now.before(start_date) {
        return false;
    }
    let shift = stagger_shift(entity_id, freq_min, freq_max);
    if last_processed_at.is_nil() {
        return !now.before(start_date.add(shift));
    }
    let elapsed_ms = now.millis_since(last_processed_at);

    elapsed_ms >= (freq_min + shift).as_millis() as i64
        && elapsed_ms <= freq_max.as_millis() as i64
}

/// Inputs to the full eligibility conjunction.
#[derive(Debug, Clone)]
pub struct EligibilityCheck<'a> {
    pub min_mining_streaks_required: u64,
    pub distributable_balance: f64,
    pub min_balance_required: f64,
    /// Blockchain address; the literal [`ETH_ADDRESS_SKIP`] waives the
    /// requirement (referral-side checks).
    pub eth_address: &'a str,
    pub country: &'a str,
    pub denied_countries: &'a HashSet<String>,
    pub now: Timestamp,
    /// End of the current collection window, see the worker-manager.
    pub collection_window_end: Timestamp,
    /// Length of a collection window.
    pub collection_window: Duration,
    pub mining_session_started_at: Timestamp,
    pub mining_session_ended_at: Timestamp,
    /// Program end date; nil means open-ended.
    pub collector_end_date: Timestamp,
    pub kyc_state: KycState,
    pub max_session_duration: Duration,
}

impl<'a> EligibilityCheck<'a> {
    /// The zero-threshold referral-side variant of `self`: waived address,
    /// no streak or balance floor, same country/KYC/session state.
    pub fn referral_side(&self) -> EligibilityCheck<'a> {
        EligibilityCheck {
            min_mining_streaks_required: 0,
            distributable_balance: 0.1,
            min_balance_required: 0.0,
            eth_address: ETH_ADDRESS_SKIP,
            ..self.clone()
        }
    }
}

/// The full eligibility conjunction.
pub fn is_eligible_for_distribution(check: &EligibilityCheck<'_>) -> bool {
    let address_ok = check.eth_address == ETH_ADDRESS_SKIP || !check.eth_address.is_empty();
    let country_ok = !check
        .denied_countries
        .contains(&check.country.to_lowercase());
    // A mining session currently active, or one that ended inside the
    // collection window.
    let currently_active = check.mining_session_ended_at.after(check.now);
    let ended_within_window = check
        .mining_session_ended_at
        .after(check.now.sub(check.collection_window))
        && !check
            .mining_session_ended_at
            .after(check.collection_window_end);
    let session_ok = !check.mining_session_started_at.is_nil()
        && (currently_active || ended_within_window);
    let program_ok = check.collector_end_date.is_nil() || !check.now.after(check.collector_end_date);
    let streak = calculate_mining_streak(
        check.now,
        check.mining_session_started_at,
        check.mining_session_ended_at,
        check.max_session_duration,
    );

    address_ok
        && country_ok
        && check.kyc_state.accepted()
        && session_ok
        && program_ok
        && check.distributable_balance >= check.min_balance_required
        && streak >= check.min_mining_streaks_required
}

/// Convenience for building the self-eligibility check from collector
/// settings.
#[allow(clippy::too_many_arguments)]
pub fn self_check<'a>(
    settings: &'a CollectorSettings,
    distributable_balance: f64,
    eth_address: &'a str,
    country: &'a str,
    now: Timestamp,
    collection_window_end: Timestamp,
    collection_window: Duration,
    session_started_at: Timestamp,
    session_ended_at: Timestamp,
    kyc_state: KycState,
    max_session_duration: Duration,
) -> EligibilityCheck<'a> {
    EligibilityCheck {
        min_mining_streaks_required: settings.min_mining_streaks_required,
        distributable_balance,
        min_balance_required: settings.min_balance_required,
        eth_address,
        country,
        denied_countries: &settings.denied_countries,
        now,
        collection_window_end,
        collection_window,
        mining_session_started_at: session_started_at,
        mining_session_ended_at: session_ended_at,
        collector_end_date: settings.end_date,
        kyc_state,
        max_session_duration,
    }
}
