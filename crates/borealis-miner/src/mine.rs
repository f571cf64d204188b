//! The per-user mining tick.
//!
//! `mine` advances one user's balance state machine: minting while the solo
//! session is active, slashing after it ends, reconciling externally staged
//! deltas and rolling the history bucket over. It is pure over its inputs —
//! the caller's `User` is never mutated — and returns `None` when there is
//! nothing to do.

use crate::context::TickContext;
use crate::resurrect::{change_t0_and_tminus1_referrals, resurrect};
use crate::{SLASHING_DRAIN_DAYS, T0_RATE_PERCENT, T1_RATE_PERCENT, T2_RATE_PERCENT};
use borealis_model::{Referral, Timestamp, User};
use borealis_tokenomics::apply_pre_staking;

/// Result of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct MineOutcome {
    /// The advanced user record.
    pub updated: User,
    /// Pre-tick snapshot emitted when the tick crossed a history bucket.
    pub history: Option<User>,
}

/// Advance `usr` to `ctx.now`.
///
/// Requires both solo-session marks; returns `None` otherwise, and also for
/// a fully drained post-session user with nothing pending.
pub fn mine(
    ctx: &TickContext,
    usr: &User,
    t0: Option<&Referral>,
    t_minus1: Option<&Referral>,
) -> Option<MineOutcome> {
    if usr.mining_session_solo_started_at.is_nil() || usr.mining_session_solo_ended_at.is_nil() {
        return None;
    }
    let now = ctx.now;
    let mut updated = usr.clone();
    resurrect(now, &mut updated, t0, t_minus1);
    change_t0_and_tminus1_referrals(&mut updated);

    if updated.mining_session_solo_ended_at.before(now)
        && updated.balance_solo == 0.0
        && updated.balance_t0 == 0.0
        && updated.balance_t1 == 0.0
        && updated.balance_t2 == 0.0
        && updated.balance_solo_pending - updated.balance_solo_pending_applied == 0.0
        && updated.balance_for_t0 == 0.0
        && updated.balance_for_tminus1 == 0.0
    {
        if updated.balance_t1_pending - updated.balance_t1_pending_applied != 0.0
            || updated.balance_t2_pending - updated.balance_t2_pending_applied != 0.0
        {
            updated.balance_t1_pending_applied = updated.balance_t1_pending;
            updated.balance_t2_pending_applied = updated.balance_t2_pending;

            return Some(MineOutcome {
                updated,
                history: None,
            });
        }

        return None;
    }

    let mut history = None;
    if updated.balance_last_updated_at.is_nil() {
        updated.balance_last_updated_at = updated.mining_session_solo_started_at;
    } else if updated.balance_last_updated_at.year() != now.year()
        || updated.balance_last_updated_at.ordinal() != now.ordinal()
        || updated.balance_last_updated_at.hour() != now.hour()
        || (ctx.development && updated.balance_last_updated_at.minute() != now.minute())
    {
        let mut snapshot = usr.clone();
        snapshot.history_part = history_part(ctx, snapshot.balance_last_updated_at);
        history = Some(snapshot);
        updated.balance_total_slashed = 0.0;
        updated.balance_total_minted = 0.0;
    }

    let elapsed_hours = now.hours_since(updated.balance_last_updated_at);
    let mut minted_amount = 0.0;

    if updated.mining_session_solo_ended_at.after(now) {
        if !updated.extra_bonus_started_at.is_nil()
            && now.before(updated.extra_bonus_started_at.add(ctx.extra_bonus_duration))
        {
            let rate = (100.0 + f64::from(updated.extra_bonus)) * ctx.base_mining_rate
                * elapsed_hours
                / 100.0;
            updated.balance_solo += rate;
            minted_amount += rate;
        } else {
            let rate = ctx.base_mining_rate * elapsed_hours;
            updated.balance_solo += rate;
            minted_amount += rate;
        }
        if t0.is_some_and(|r| r.mining_session_active(now)) {
            let rate = T0_RATE_PERCENT * ctx.base_mining_rate * elapsed_hours / 100.0;
            updated.balance_for_t0 += rate;
            updated.balance_t0 += rate;
            minted_amount += rate;
        }
        if t_minus1.is_some_and(|r| r.mining_session_active(now)) {
            updated.balance_for_tminus1 +=
                T2_RATE_PERCENT * ctx.base_mining_rate * elapsed_hours / 100.0;
        }
        if updated.active_t1_referrals < 0 {
            updated.active_t1_referrals = 0;
        }
        if updated.active_t2_referrals < 0 {
            updated.active_t2_referrals = 0;
        }
        let t1_rate = T1_RATE_PERCENT * f64::from(updated.active_t1_referrals)
            * ctx.base_mining_rate
            * elapsed_hours
            / 100.0;
        let t2_rate = T2_RATE_PERCENT * f64::from(updated.active_t2_referrals)
            * ctx.base_mining_rate
            * elapsed_hours
            / 100.0;
        updated.balance_t1 += t1_rate;
        updated.balance_t2 += t2_rate;
        minted_amount += t1_rate + t2_rate;
    } else {
        if updated.slashing_rate_solo == 0.0 {
            updated.slashing_rate_solo = updated.balance_solo / SLASHING_DRAIN_DAYS / 24.0;
        }
        if updated.slashing_rate_t0 == 0.0 {
            updated.slashing_rate_t0 = updated.balance_t0 / SLASHING_DRAIN_DAYS / 24.0;
        }
        if updated.slashing_rate_t1 == 0.0 {
            updated.slashing_rate_t1 = updated.balance_t1 / SLASHING_DRAIN_DAYS / 24.0;
        }
        if updated.slashing_rate_t2 == 0.0 {
            updated.slashing_rate_t2 = updated.balance_t2 / SLASHING_DRAIN_DAYS / 24.0;
        }
    }

    if t0.is_some_and(|r| r.mining_session_over(now)) && updated.slashing_rate_for_t0 == 0.0 {
        updated.slashing_rate_for_t0 = updated.balance_for_t0 / SLASHING_DRAIN_DAYS / 24.0;
    }
    if t_minus1.is_some_and(|r| r.mining_session_over(now))
        && updated.slashing_rate_for_tminus1 == 0.0
    {
        updated.slashing_rate_for_tminus1 =
            updated.balance_for_tminus1 / SLASHING_DRAIN_DAYS / 24.0;
    }

    let mut slashed_amount = (updated.slashing_rate_solo
        + updated.slashing_rate_t0
        + updated.slashing_rate_t1
        + updated.slashing_rate_t2)
        * elapsed_hours;
    updated.balance_solo -= updated.slashing_rate_solo * elapsed_hours;
    updated.balance_for_tminus1 -= updated.slashing_rate_for_tminus1 * elapsed_hours;
    updated.balance_for_t0 -= updated.slashing_rate_for_t0 * elapsed_hours;
    updated.balance_t0 -= updated.slashing_rate_t0 * elapsed_hours;
    updated.balance_t1 -= updated.slashing_rate_t1 * elapsed_hours;
    updated.balance_t2 -= updated.slashing_rate_t2 * elapsed_hours;

    let unapplied_solo_pending = updated.balance_solo_pending - updated.balance_solo_pending_applied;
    let unapplied_t1_pending = updated.balance_t1_pending - updated.balance_t1_pending_applied;
    let unapplied_t2_pending = updated.balance_t2_pending - updated.balance_t2_pending_applied;
    updated.balance_solo_pending_applied = updated.balance_solo_pending;
    updated.balance_t1_pending_applied = updated.balance_t1_pending;
    updated.balance_t2_pending_applied = updated.balance_t2_pending;

    updated.balance_solo += unapplied_solo_pending;
    updated.balance_t1 += unapplied_t1_pending;
    updated.balance_t2 += unapplied_t2_pending;

    if unapplied_solo_pending < 0.0 {
        slashed_amount += unapplied_solo_pending;
    } else {
        minted_amount += unapplied_solo_pending;
    }
    if unapplied_t1_pending < 0.0 {
        slashed_amount += unapplied_t1_pending;
    } else {
        minted_amount += unapplied_t1_pending;
    }
    if unapplied_t2_pending < 0.0 {
        slashed_amount += unapplied_t2_pending;
    } else {
        minted_amount += unapplied_t2_pending;
    }
    if updated.balance_solo < 0.0 {
        updated.balance_solo = 0.0;
    }
    if updated.balance_t0 < 0.0 {
        updated.balance_t0 = 0.0;
    }
    if updated.balance_t1 < 0.0 {
        updated.balance_t1 = 0.0;
    }
    if updated.balance_t2 < 0.0 {
        updated.balance_t2 = 0.0;
    }
    if updated.balance_for_t0 < 0.0 {
        updated.balance_for_t0 = 0.0;
    }
    if updated.balance_for_tminus1 < 0.0 {
        updated.balance_for_tminus1 = 0.0;
    }
    // A zero delta resets the applied mark so external writers can
    // renormalise the pending pair.
    if unapplied_solo_pending == 0.0 {
        updated.balance_solo_pending_applied = 0.0;
    }
    if unapplied_t1_pending == 0.0 {
        updated.balance_t1_pending_applied = 0.0;
    }
    if unapplied_t2_pending == 0.0 {
        updated.balance_t2_pending_applied = 0.0;
    }
    // Keyed on the pre-tick totals: a user who had nothing cannot be
    // slashed, whatever the armed rates say.
    if usr.balance_total_pre_staking + usr.balance_total_standard == 0.0 {
        slashed_amount = 0.0;
    }

    let total_amount =
        updated.balance_solo + updated.balance_t0 + updated.balance_t1 + updated.balance_t2;
    let (total_standard, total_pre_staking) = apply_pre_staking(
        total_amount,
        updated.pre_staking_allocation,
        updated.pre_staking_bonus,
    );
    updated.balance_total_standard = total_standard;
    updated.balance_total_pre_staking = total_pre_staking;
    let (minted_standard, minted_pre_staking) = apply_pre_staking(
        minted_amount,
        updated.pre_staking_allocation,
        updated.pre_staking_bonus,
    );
    let (slashed_standard, slashed_pre_staking) = apply_pre_staking(
        slashed_amount,
        updated.pre_staking_allocation,
        updated.pre_staking_bonus,
    );
    updated.balance_total_minted += minted_standard + minted_pre_staking;
    updated.balance_total_slashed += slashed_standard + slashed_pre_staking;
    updated.balance_last_updated_at = now;

    Some(MineOutcome { updated, history })
}

/// History bucket label for a snapshot: hour resolution in production,
/// minute resolution in development.
pub(crate) fn history_part(ctx: &TickContext, bucket: Timestamp) -> String {
    if ctx.development {
        bucket.format_minute()
    } else {
        bucket.format_hour()
    }
}
