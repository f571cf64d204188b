//! Mining-tick scenario tests.
//!
//! Literal-input scenarios covering accrual, extra bonus, slashing, referral
//! rewards and pending reconciliation across the crate boundary.

use crate::generators::*;
use borealis_miner::mine;
use borealis_tokenomics::apply_pre_staking;

// ============================================================================
// Accrual
// ============================================================================

#[test]
fn test_fresh_mining_user_no_referrers() {
    let now = test_now();
    let user = active_miner(now);
    let ctx = tick_context(now, closed_collector_settings());

    let outcome = mine(&ctx, &user, None, None).unwrap();

    assert_eq!(outcome.updated.balance_solo, 1.0);
    assert_eq!(outcome.updated.balance_total_standard, 1.0);
    assert_eq!(outcome.updated.balance_total_pre_staking, 0.0);
    assert_eq!(outcome.updated.balance_total_minted, 1.0);
    assert!(outcome.history.is_none());
}

#[test]
fn test_extra_bonus_active() {
    let now = test_now();
    let mut user = active_miner(now);
    user.extra_bonus = 100;
    user.extra_bonus_started_at = now.sub(HOUR / 2);
    let mut ctx = tick_context(now, closed_collector_settings());
    ctx.extra_bonus_duration = HOUR;

    let outcome = mine(&ctx, &user, None, None).unwrap();

    assert_eq!(outcome.updated.balance_solo, 2.0);
}

#[test]
fn test_t0_actively_mining_earns_quarter_rate() {
    let now = test_now();
    let user = active_miner(now);
    let t0 = active_referral(now);
    let ctx = tick_context(now, closed_collector_settings());

    let outcome = mine(&ctx, &user, Some(&t0), None).unwrap();

    assert_eq!(outcome.updated.balance_t0, 0.25);
    assert_eq!(outcome.updated.balance_for_t0, 0.25);
    assert_eq!(outcome.updated.balance_total_minted, 1.25);
}

#[test]
fn test_pre_staking_split_carries_bonus() {
    let now = test_now();
    let mut user = active_miner(now);
    user.pre_staking_allocation = 50;
    user.pre_staking_bonus = 100;
    let ctx = tick_context(now, closed_collector_settings());

    let outcome = mine(&ctx, &user, None, None).unwrap();

    let (standard, pre_staking) = apply_pre_staking(1.0, 50, 100);
    assert_eq!(outcome.updated.balance_total_standard, standard);
    assert_eq!(outcome.updated.balance_total_pre_staking, pre_staking);
    assert_eq!(
        outcome.updated.balance_total_minted,
        standard + pre_staking
    );
}

// ============================================================================
// Slashing
// ============================================================================

#[test]
fn test_post_session_slashing() {
    let now = test_now();
    let mut user = active_miner(now);
    user.mining_session_solo_started_at = now.sub(HOUR * 25);
    user.mining_session_solo_ended_at = now.sub(HOUR);
    user.balance_solo = 24.0;
    user.balance_total_standard = 24.0;
    user.balance_last_updated_at = now.sub(HOUR);
    let ctx = tick_context(now, closed_collector_settings());

    let outcome = mine(&ctx, &user, None, None).unwrap();
    let rate = 24.0 / 60.0 / 24.0;

    assert_eq!(outcome.updated.slashing_rate_solo, rate);
    assert_eq!(outcome.updated.balance_solo, 24.0 - rate);
    let (slashed_standard, slashed_pre_staking) = apply_pre_staking(rate, 0, 0);
    assert_eq!(
        outcome.updated.balance_total_slashed,
        slashed_standard + slashed_pre_staking
    );
}

#[test]
fn test_slashing_rate_persists_across_ticks() {
    let now = test_now();
    let mut user = active_miner(now);
    user.mining_session_solo_started_at = now.sub(HOUR * 30);
    user.mining_session_solo_ended_at = now.sub(HOUR * 2);
    user.balance_solo = 24.0;
    user.balance_total_standard = 24.0;
    user.balance_last_updated_at = now.sub(HOUR);
    user.slashing_rate_solo = 0.5;
    let ctx = tick_context(now, closed_collector_settings());

    let outcome = mine(&ctx, &user, None, None).unwrap();

    // An armed rate is never re-derived.
    assert_eq!(outcome.updated.slashing_rate_solo, 0.5);
    assert_eq!(outcome.updated.balance_solo, 23.5);
}

// ============================================================================
// Pending reconciliation
// ============================================================================

#[test]
fn test_pending_reconciliation_with_rollover() {
    let now = test_now();
    let prev = now.sub(HOUR);
    let mut user = active_miner(now);
    user.balance_last_updated_at = prev;
    user.balance_t1_pending = 5.0;
    user.balance_t1_pending_applied = 2.0;
    let ctx = tick_context(now, closed_collector_settings());

    let outcome = mine(&ctx, &user, None, None).unwrap();

    let history = outcome.history.expect("hour rollover emits history");
    assert_eq!(history.history_part, prev.format_hour());
    // The snapshot is the pre-tick record.
    assert_eq!(history.balance_t1_pending_applied, 2.0);
    assert_eq!(outcome.updated.balance_t1, 3.0);
    assert_eq!(outcome.updated.balance_t1_pending_applied, 5.0);
}

#[test]
fn test_idle_user_with_pending_team_deltas() {
    let now = test_now();
    let mut user = drained_user(now);
    user.balance_t1_pending = 2.0;
    user.balance_t2_pending = -1.0;
    let ctx = tick_context(now, closed_collector_settings());

    let outcome = mine(&ctx, &user, None, None).unwrap();

    assert_eq!(outcome.updated.balance_t1_pending_applied, 2.0);
    assert_eq!(outcome.updated.balance_t2_pending_applied, -1.0);
    assert!(outcome.history.is_none());
}

#[test]
fn test_fully_drained_user_is_a_noop() {
    let now = test_now();
    let user = drained_user(now);
    let ctx = tick_context(now, closed_collector_settings());

    assert!(mine(&ctx, &user, None, None).is_none());
}

// ============================================================================
// Resurrection and rewiring through the tick
// ============================================================================

#[test]
fn test_resurrected_session_restores_before_accrual() {
    let now = test_now();
    let mut user = active_miner(now);
    user.mining_session_solo_previously_ended_at = now.sub(HOUR * 11);
    user.resurrect_solo_used_at = user.mining_session_solo_started_at;
    user.balance_solo = 5.0;
    user.balance_total_standard = 5.0;
    user.slashing_rate_solo = 0.1;
    user.balance_last_updated_at = now.sub(std::time::Duration::from_secs(60));
    let ctx = tick_context(now, closed_collector_settings());

    let outcome = mine(&ctx, &user, None, None).unwrap();

    // 10h gap restored at the armed rate, then the rate disarms, so the
    // minute of accrual adds on top without any slash.
    let restored = 5.0 + 0.1 * 10.0;
    assert!(outcome.updated.balance_solo > restored);
    assert_eq!(outcome.updated.slashing_rate_solo, 0.0);
    assert_eq!(outcome.updated.resurrect_solo_used_at, now);
}

#[test]
fn test_pending_rewire_is_adopted_by_the_tick() {
    let now = test_now();
    let mut user = active_miner(now);
    user.id_t0 = -77;
    user.slashing_rate_for_t0 = 0.3;
    let ctx = tick_context(now, closed_collector_settings());

    let outcome = mine(&ctx, &user, None, None).unwrap();

    assert_eq!(outcome.updated.id_t0, 77);
    assert_eq!(outcome.updated.slashing_rate_for_t0, 0.0);
}
