//! Ethereum coin-distribution processing.
//!
//! Runs right after the mining tick on the same user clone. With the
//! collector gate closed it only folds previously staged Ethereum pendings
//! into their balances; with the gate open it emits up to four review
//! records (solo, the T0 pair, and the T-1 credit) and stages the balance
//! side effects for the settlement component.

use crate::context::TickContext;
use borealis_distribution::{
    calculate_distribution_balance, is_collector_enabled, is_eligible_for_distribution,
    is_eligible_for_distribution_now, self_check, ReviewRecord,
};
use borealis_model::{referral_username, Referral, Timestamp, User};
use borealis_tokenomics::apply_pre_staking;

/// Process one user's Ethereum coin distribution at `ctx.now`.
///
/// Returns the review records plus the amounts distributed on behalf of the
/// T0 and T-1 referrers. With the gate closed the record list is empty and
/// both amounts are zero.
pub fn process_ethereum_coin_distribution(
    ctx: &TickContext,
    user: &mut User,
    t0: Option<&Referral>,
    t_minus1: Option<&Referral>,
) -> (Vec<ReviewRecord>, f64, f64) {
    if !is_collector_enabled(
        ctx.now,
        ctx.distribution_frequency_min,
        &ctx.collector_settings,
    ) {
        if let Some(pending) = user.balance_solo_ethereum_pending {
            user.balance_solo_ethereum += pending;
            user.balance_solo_ethereum_pending = Some(0.0);
        }
        if let Some(pending) = user.balance_t0_ethereum_pending {
            user.balance_t0_ethereum += pending;
            user.balance_t0_ethereum_pending = Some(0.0);
        }
        if let Some(pending) = user.balance_t1_ethereum_pending {
            user.balance_t1_ethereum += pending;
            user.balance_t1_ethereum_pending = Some(0.0);
        }
        if let Some(pending) = user.balance_t2_ethereum_pending {
            user.balance_t2_ethereum += pending;
            user.balance_t2_ethereum_pending = Some(0.0);
        }
        user.solo_last_ethereum_coin_distribution_processed_at = Timestamp::NIL;
        user.for_t0_last_ethereum_coin_distribution_processed_at = Timestamp::NIL;
        user.for_tminus1_last_ethereum_coin_distribution_processed_at = Timestamp::NIL;

        return (Vec::new(), 0.0, 0.0);
    }
    // Previously staged deltas were absorbed upstream; start the cycle clean.
    user.balance_solo_ethereum_pending = None;
    user.balance_t0_ethereum_pending = None;
    user.balance_t1_ethereum_pending = None;
    user.balance_t2_ethereum_pending = None;

    let user_recent = recently_eligible(ctx, user.mining_session_solo_ended_at);
    let t0_recent =
        t0.is_some_and(|r| recently_eligible(ctx, r.mining_session_solo_ended_at));
    let t_minus1_recent =
        t_minus1.is_some_and(|r| recently_eligible(ctx, r.mining_session_solo_ended_at));
    let user_id = user.user_id.clone();
    let t0_pair_distinct = |t0_ref: &Referral| {
        t0_ref.user_id != user_id
            && t_minus1.map_or(true, |tm| {
                tm.user_id != user_id && tm.user_id != t0_ref.user_id
            })
    };

    let mut solo_record = None;
    let mut t0_record = None;
    let mut for_t0_record = None;
    let mut for_t_minus1_record = None;

    if user_recent {
        solo_record = Some(ReviewRecord {
            created_at: ctx.now,
            username: user.username.clone(),
            referred_by_username: referral_username(t0),
            user_id: user.user_id.clone(),
            earner_user_id: user.user_id.clone(),
            eth_address: user.mining_blockchain_account_address.clone(),
            internal_id: user.id,
            balance: 0.0,
        });
    }
    if let Some(t0_ref) = t0 {
        if user_recent && t0_recent && t0_pair_distinct(t0_ref) {
            t0_record = Some(ReviewRecord {
                created_at: ctx.now,
                user_id: user.user_id.clone(),
                earner_user_id: t0_ref.user_id.clone(),
                ..Default::default()
            });
            for_t0_record = Some(ReviewRecord {
                created_at: ctx.now,
                user_id: t0_ref.user_id.clone(),
                earner_user_id: user.user_id.clone(),
                ..Default::default()
            });
        }
    }
    if let (Some(t_minus1_ref), Some(t0_ref)) = (t_minus1, t0) {
        if user_recent
            && t_minus1_recent
            && t_minus1_ref.user_id != user.user_id
            && t_minus1_ref.user_id != t0_ref.user_id
        {
            for_t_minus1_record = Some(ReviewRecord {
                created_at: ctx.now,
                user_id: t_minus1_ref.user_id.clone(),
                earner_user_id: user.user_id.clone(),
                ..Default::default()
            });
        }
    }

    // Amount I've earned for myself, plus what my T0 earned for me.
    if user_is_eligible_for_self(ctx, user) {
        let solo_balance = process_distribution_for_solo(ctx, user);
        let mut total_for_self = solo_balance;
        if let Some(record) = solo_record.as_mut() {
            record.balance = solo_balance;
        }
        if let (Some(t0_ref), Some(record)) = (t0, t0_record.as_mut()) {
            if referral_is_eligible_for_referral(ctx, t0_ref) {
                record.balance = process_distribution_for_t0(ctx, user);
                total_for_self += record.balance;
            }
        }
        user.solo_last_ethereum_coin_distribution_processed_at =
            if !ctx.dry_run && total_for_self > 0.0 {
                ctx.now
            } else {
                Timestamp::NIL
            };
    } else {
        user.solo_last_ethereum_coin_distribution_processed_at = Timestamp::NIL;
    }

    // Amount I've earned for my T0.
    let mut distributed_for_t0 = 0.0;
    match t0 {
        Some(t0_ref)
            if t0_pair_distinct(t0_ref)
                && user_is_eligible_for_t0(ctx, user, t0_ref.id)
                && referral_is_eligible_for_self(
                    ctx,
                    t0_ref,
                    user.for_t0_last_ethereum_coin_distribution_processed_at,
                ) =>
        {
            distributed_for_t0 = process_distribution_for_for_t0(ctx, user, t0_ref);
            if let Some(record) = for_t0_record.as_mut() {
                record.balance = distributed_for_t0;
            }
            if !ctx.dry_run && distributed_for_t0 > 0.0 {
                user.for_t0_last_ethereum_coin_distribution_processed_at = ctx.now;
            } else {
                user.for_t0_last_ethereum_coin_distribution_processed_at = Timestamp::NIL;
                distributed_for_t0 = 0.0;
            }
        }
        _ => {
            user.for_t0_last_ethereum_coin_distribution_processed_at = Timestamp::NIL;
        }
    }

    // Amount I've earned for my T-1.
    let mut distributed_for_t_minus1 = 0.0;
    match (t_minus1, t0) {
        (Some(t_minus1_ref), Some(t0_ref))
            if t_minus1_ref.user_id != user.user_id
                && t_minus1_ref.user_id != t0_ref.user_id
                && user_is_eligible_for_t_minus1(ctx, user, t_minus1_ref.id)
                && referral_is_eligible_for_self(
                    ctx,
                    t_minus1_ref,
                    user.for_tminus1_last_ethereum_coin_distribution_processed_at,
                ) =>
        {
            distributed_for_t_minus1 =
                process_distribution_for_for_t_minus1(ctx, user, t_minus1_ref);
            if let Some(record) = for_t_minus1_record.as_mut() {
                record.balance = distributed_for_t_minus1;
            }
            if !ctx.dry_run && distributed_for_t_minus1 > 0.0 {
                user.for_tminus1_last_ethereum_coin_distribution_processed_at = ctx.now;
            } else {
                user.for_tminus1_last_ethereum_coin_distribution_processed_at = Timestamp::NIL;
                distributed_for_t_minus1 = 0.0;
            }
        }
        _ => {
            user.for_tminus1_last_ethereum_coin_distribution_processed_at = Timestamp::NIL;
        }
    }

    let records = [solo_record, t0_record, for_t0_record, for_t_minus1_record]
        .into_iter()
        .flatten()
        .collect();

    (records, distributed_for_t0, distributed_for_t_minus1)
}

/// Whether a session that ended at `session_ended_at` could still have been
/// eligible within the recency window (one eighth of the session bound).
fn recently_eligible(ctx: &TickContext, session_ended_at: Timestamp) -> bool {
    !session_ended_at.is_nil()
        && session_ended_at.after(ctx.now.sub(ctx.mining_session_duration_max / 8))
}

fn user_is_eligible_for_self(ctx: &TickContext, user: &User) -> bool {
    user.id != 0
        && is_eligible_for_distribution_now(
            user.id,
            ctx.now,
            user.solo_last_ethereum_coin_distribution_processed_at,
            ctx.collector_settings.start_date,
            ctx.distribution_frequency_min,
            ctx.distribution_frequency_max,
        )
        && is_eligible_for_distribution(&self_check(
            &ctx.collector_settings,
            user.balance_total_standard
                - user.balance_solo_ethereum
                - user.balance_t0_ethereum
                - user.balance_t1_ethereum
                - user.balance_t2_ethereum,
            &user.mining_blockchain_account_address,
            &user.country,
            ctx.now,
            ctx.collection_window_end,
            ctx.collection_window,
            user.mining_session_solo_started_at,
            user.mining_session_solo_ended_at,
            user.kyc_state,
            ctx.mining_session_duration_max,
        ))
}

fn user_is_eligible_for_referral(ctx: &TickContext, user: &User) -> bool {
    is_eligible_for_distribution(
        &self_check(
            &ctx.collector_settings,
            0.0,
            "",
            &user.country,
            ctx.now,
            ctx.collection_window_end,
            ctx.collection_window,
            user.mining_session_solo_started_at,
            user.mining_session_solo_ended_at,
            user.kyc_state,
            ctx.mining_session_duration_max,
        )
        .referral_side(),
    )
}

fn user_is_eligible_for_t0(ctx: &TickContext, user: &User, id_t0: i64) -> bool {
    user.id != 0
        && is_eligible_for_distribution_now(
            id_t0,
            ctx.now,
            user.for_t0_last_ethereum_coin_distribution_processed_at,
            ctx.collector_settings.start_date,
            ctx.distribution_frequency_min,
            ctx.distribution_frequency_max,
        )
        && user_is_eligible_for_referral(ctx, user)
}

fn user_is_eligible_for_t_minus1(ctx: &TickContext, user: &User, id_t_minus1: i64) -> bool {
    user.id != 0
        && is_eligible_for_distribution_now(
            id_t_minus1,
            ctx.now,
            user.for_tminus1_last_ethereum_coin_distribution_processed_at,
            ctx.collector_settings.start_date,
            ctx.distribution_frequency_min,
            ctx.distribution_frequency_max,
        )
        && user_is_eligible_for_referral(ctx, user)
}

fn referral_is_eligible_for_self(
    ctx: &TickContext,
    referral: &Referral,
    last_processed_at: Timestamp,
) -> bool {
    referral.id != 0
        && is_eligible_for_distribution_now(
            referral.id,
            ctx.now,
            last_processed_at,
            ctx.collector_settings.start_date,
            ctx.distribution_frequency_min,
            ctx.distribution_frequency_max,
        )
        && is_eligible_for_distribution(&self_check(
            &ctx.collector_settings,
            referral.distributable_balance(),
            &referral.mining_blockchain_account_address,
            &referral.country,
            ctx.now,
            ctx.collection_window_end,
            ctx.collection_window,
            referral.mining_session_solo_started_at,
            referral.mining_session_solo_ended_at,
            referral.kyc_state,
            ctx.mining_session_duration_max,
        ))
}

fn referral_is_eligible_for_referral(ctx: &TickContext, referral: &Referral) -> bool {
    referral.id != 0
        && is_eligible_for_distribution(
            &self_check(
                &ctx.collector_settings,
                0.0,
                "",
                &referral.country,
                ctx.now,
                ctx.collection_window_end,
                ctx.collection_window,
                referral.mining_session_solo_started_at,
                referral.mining_session_solo_ended_at,
                referral.kyc_state,
                ctx.mining_session_duration_max,
            )
            .referral_side(),
        )
}

fn process_distribution_for_solo(ctx: &TickContext, user: &mut User) -> f64 {
    let (standard, _) = apply_pre_staking(
        user.balance_solo,
        user.pre_staking_allocation,
        user.pre_staking_bonus,
    );
    let amount = calculate_distribution_balance(
        standard - user.balance_solo_ethereum,
        ctx.distribution_frequency_min,
        ctx.distribution_frequency_max,
        ctx.now,
        ctx.collector_settings.end_date,
    );
    if amount <= 0.0 {
        return 0.0;
    }
    if !ctx.dry_run {
        user.balance_solo_ethereum_pending = Some(amount);
    }

    amount
}

fn process_distribution_for_t0(ctx: &TickContext, user: &mut User) -> f64 {
    let (standard, _) = apply_pre_staking(
        user.balance_t0,
        user.pre_staking_allocation,
        user.pre_staking_bonus,
    );
    let amount = calculate_distribution_balance(
        standard - user.balance_t0_ethereum,
        ctx.distribution_frequency_min,
        ctx.distribution_frequency_max,
        ctx.now,
        ctx.collector_settings.end_date,
    );
    if amount <= 0.0 {
        return 0.0;
    }
    if !ctx.dry_run {
        user.balance_t0_ethereum_pending = Some(amount);
    }

    amount
}

// The double `for` is intended: the bucket is the user's `balance_for_t0`,
// split with the referrer's own pre-staking terms.
fn process_distribution_for_for_t0(ctx: &TickContext, user: &mut User, t0: &Referral) -> f64 {
    let (standard, _) = apply_pre_staking(
        user.balance_for_t0,
        t0.pre_staking_allocation,
        t0.pre_staking_bonus,
    );
    let amount = calculate_distribution_balance(
        standard - user.balance_for_t0_ethereum,
        ctx.distribution_frequency_min,
        ctx.distribution_frequency_max,
        ctx.now,
        ctx.collector_settings.end_date,
    );
    if amount <= 0.0 {
        return 0.0;
    }
    if !ctx.dry_run {
        user.balance_for_t0_ethereum += amount;
    }

    amount
}

fn process_distribution_for_for_t_minus1(
    ctx: &TickContext,
    user: &mut User,
    t_minus1: &Referral,
) -> f64 {
    let (standard, _) = apply_pre_staking(
        user.balance_for_tminus1,
        t_minus1.pre_staking_allocation,
        t_minus1.pre_staking_bonus,
    );
    let amount = calculate_distribution_balance(
        standard - user.balance_for_tminus1_ethereum,
        ctx.distribution_frequency_min,
        ctx.distribution_frequency_max,
        ctx.now,
        ctx.collector_settings.end_date,
    );
    if amount <= 0.0 {
        return 0.0;
    }
    if !ctx.dry_run {
        user.balance_for_tminus1_ethereum += amount;
    }

    amount
}
