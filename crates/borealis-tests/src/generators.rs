//! Test data generators.
//!
//! Deterministic fixtures for users, referrals and collector settings. Ids
//! come from an atomic counter so concurrently running tests never collide.

use borealis_distribution::CollectorSettings;
use borealis_miner::TickContext;
use borealis_model::{KycState, Referral, Timestamp, User};
use borealis_tokenomics::Config;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Global counter for unique id generation.
static ID_COUNTER: AtomicI64 = AtomicI64::new(1000);

/// One hour.
pub const HOUR: Duration = Duration::from_secs(3600);

/// One day.
pub const DAY: Duration = Duration::from_secs(24 * 3600);

/// Parse an RFC 3339 instant.
pub fn at(rfc3339: &str) -> Timestamp {
    Timestamp::from_utc(
        rfc3339
            .parse::<DateTime<Utc>>()
            .expect("invalid test timestamp"),
    )
}

/// The fixed "now" most tests tick at.
pub fn test_now() -> Timestamp {
    at("2026-06-01T14:30:00Z")
}

/// Next unique internal id.
pub fn next_id() -> i64 {
    ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A user one hour into an active session, with no referrers and no history.
pub fn active_miner(now: Timestamp) -> User {
    let id = next_id();
    User {
        user_id: format!("user-{id}"),
        id,
        username: format!("miner{id}"),
        mining_session_solo_started_at: now.sub(HOUR),
        mining_session_solo_ended_at: now.add(HOUR * 23),
        ..Default::default()
    }
}

/// A fully drained user whose session ended a day ago.
pub fn drained_user(now: Timestamp) -> User {
    let id = next_id();
    User {
        user_id: format!("user-{id}"),
        id,
        mining_session_solo_started_at: now.sub(HOUR * 48),
        mining_session_solo_ended_at: now.sub(HOUR * 24),
        balance_last_updated_at: now.sub(HOUR),
        ..Default::default()
    }
}

/// A referrer actively mining at `now`.
pub fn active_referral(now: Timestamp) -> Referral {
    let id = next_id();
    Referral {
        user_id: format!("user-{id}"),
        id,
        username: format!("ref{id}"),
        mining_session_solo_started_at: now.sub(HOUR),
        mining_session_solo_ended_at: now.add(HOUR * 23),
        ..Default::default()
    }
}

/// An active user who clears every distribution-eligibility check.
pub fn eligible_user(now: Timestamp) -> User {
    let mut user = active_miner(now);
    user.country = "norway".to_string();
    user.kyc_state = KycState::Accepted;
    user.mining_blockchain_account_address = format!("0x{:040x}", user.id);
    user.balance_solo = 100.0;
    user.balance_total_standard = 100.0;
    user
}

/// An active referrer who clears every distribution-eligibility check.
pub fn eligible_referral(now: Timestamp) -> Referral {
    let mut referral = active_referral(now);
    referral.country = "norway".to_string();
    referral.kyc_state = KycState::Accepted;
    referral.mining_blockchain_account_address = format!("0x{:040x}", referral.id);
    referral.balance_total_standard = 50.0;
    referral
}

/// Settings for an open collector: started well in the past, forced
/// execution so the hour/bucket guards never interfere with tests.
pub fn open_collector_settings(now: Timestamp) -> CollectorSettings {
    CollectorSettings {
        enabled: true,
        forced_execution: true,
        start_date: now.sub(DAY * 40),
        end_date: now.add(DAY * 100),
        ..Default::default()
    }
}

/// Settings for a disabled collector.
pub fn closed_collector_settings() -> CollectorSettings {
    CollectorSettings::default()
}

/// A tick context over the default production config.
pub fn tick_context(now: Timestamp, settings: CollectorSettings) -> TickContext {
    TickContext::new(
        &Config::default(),
        now,
        Arc::new(settings),
        now.add(Duration::from_secs(300)),
    )
}
