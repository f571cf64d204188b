//! Resurrection and referral rewiring.
//!
//! Both run at the head of the tick, before any accrual or slashing, so the
//! rest of the pipeline only ever sees a settled referral topology.

use borealis_model::{Referral, Timestamp, User};

/// Restore balances slashed during a mining gap that was resurrected.
///
/// A resurrection mark equal to the current session start signals a pending
/// restore: the session service stamps the mark when the user (or referrer)
/// pays to resurrect, and this tick consumes it. The restore credits back
/// `slashing_rate × gap_hours` on the channels that relation armed, zeroes
/// those rates and re-stamps the mark with `now` so it applies exactly once.
pub(crate) fn resurrect(
    now: Timestamp,
    user: &mut User,
    t0: Option<&Referral>,
    t_minus1: Option<&Referral>,
) {
    // The user's own gap restores every channel armed by their session end.
    if !user.resurrect_solo_used_at.is_nil()
        && user.resurrect_solo_used_at == user.mining_session_solo_started_at
        && !user.mining_session_solo_previously_ended_at.is_nil()
        && user
            .mining_session_solo_started_at
            .after(user.mining_session_solo_previously_ended_at)
    {
        let gap_hours = user
            .mining_session_solo_started_at
            .hours_since(user.mining_session_solo_previously_ended_at);
        user.balance_solo += user.slashing_rate_solo * gap_hours;
        user.balance_t0 += user.slashing_rate_t0 * gap_hours;
        user.balance_t1 += user.slashing_rate_t1 * gap_hours;
        user.balance_t2 += user.slashing_rate_t2 * gap_hours;
        user.slashing_rate_solo = 0.0;
        user.slashing_rate_t0 = 0.0;
        user.slashing_rate_t1 = 0.0;
        user.slashing_rate_t2 = 0.0;
        user.resurrect_solo_used_at = now;
    }

    // A referrer's gap restores only the matching `for_*` channel.
    if let Some(t0_ref) = t0 {
        if referral_resurrected(t0_ref)
            && (user.resurrect_t0_used_at.is_nil()
                || user
                    .resurrect_t0_used_at
                    .before(t0_ref.mining_session_solo_started_at))
        {
            let gap_hours = t0_ref
                .mining_session_solo_started_at
                .hours_since(t0_ref.mining_session_solo_previously_ended_at);
            user.balance_for_t0 += user.slashing_rate_for_t0 * gap_hours;
            user.slashing_rate_for_t0 = 0.0;
            user.resurrect_t0_used_at = now;
        }
    }
    if let Some(t_minus1_ref) = t_minus1 {
        if referral_resurrected(t_minus1_ref)
            && (user.resurrect_tminus1_used_at.is_nil()
                || user
                    .resurrect_tminus1_used_at
                    .before(t_minus1_ref.mining_session_solo_started_at))
        {
            let gap_hours = t_minus1_ref
                .mining_session_solo_started_at
                .hours_since(t_minus1_ref.mining_session_solo_previously_ended_at);
            user.balance_for_tminus1 += user.slashing_rate_for_tminus1 * gap_hours;
            user.slashing_rate_for_tminus1 = 0.0;
            user.resurrect_tminus1_used_at = now;
        }
    }
}

fn referral_resurrected(referral: &Referral) -> bool {
    !referral.resurrect_solo_used_at.is_nil()
        && referral.resurrect_solo_used_at == referral.mining_session_solo_started_at
        && !referral.mining_session_solo_previously_ended_at.is_nil()
        && referral
            .mining_session_solo_started_at
            .after(referral.mining_session_solo_previously_ended_at)
}

/// Adopt a changed T0 / T-1 identity.
///
/// The referral service stores a pending rewire as a negated id. Future
/// accruals redirect to the new referrer; balances already earned stay with
/// the user. The `for_*` slashing rate tracked the old referrer's session,
/// so it re-arms from scratch.
pub(crate) fn change_t0_and_tminus1_referrals(user: &mut User) {
    if user.id_t0 < 0 {
        user.id_t0 = -user.id_t0;
        user.slashing_rate_for_t0 = 0.0;
    }
    if user.id_tminus1 < 0 {
        user.id_tminus1 = -user.id_tminus1;
        user.slashing_rate_for_tminus1 = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const HOUR: Duration = Duration::from_secs(3600);

    fn ts(hours: i64) -> Timestamp {
        Timestamp::from_millis(1_780_000_000_000 + hours * 3_600_000)
    }

    fn resurrected_user(now: Timestamp) -> User {
        User {
            mining_session_solo_previously_ended_at: now.sub(HOUR * 48),
            mining_session_solo_started_at: now.sub(HOUR),
            mining_session_solo_ended_at: now.add(HOUR * 23),
            resurrect_solo_used_at: now.sub(HOUR),
            slashing_rate_solo: 0.1,
            slashing_rate_t0: 0.02,
            balance_solo: 5.0,
            balance_t0: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_own_resurrection_restores_gap_and_disarms() {
        let now = ts(100);
        let mut user = resurrected_user(now);

        resurrect(now, &mut user, None, None);

        // 47h gap between the previous end and the new start.
        assert_eq!(user.balance_solo, 5.0 + 0.1 * 47.0);
        assert_eq!(user.balance_t0, 1.0 + 0.02 * 47.0);
        assert_eq!(user.slashing_rate_solo, 0.0);
        assert_eq!(user.slashing_rate_t0, 0.0);
        assert_eq!(user.resurrect_solo_used_at, now);
    }

    #[test]
    fn test_resurrection_applies_once() {
        let now = ts(100);
        let mut user = resurrected_user(now);

        resurrect(now, &mut user, None, None);
        let after_first = user.clone();
        resurrect(ts(101), &mut user, None, None);

        assert_eq!(user, after_first);
    }

    #[test]
    fn test_no_mark_means_no_restore() {
        let now = ts(100);
        let mut user = resurrected_user(now);
        user.resurrect_solo_used_at = Timestamp::NIL;

        resurrect(now, &mut user, None, None);

        assert_eq!(user.balance_solo, 5.0);
        assert_eq!(user.slashing_rate_solo, 0.1);
    }

    #[test]
    fn test_referrer_resurrection_restores_for_channel() {
        let now = ts(100);
        let mut user = User {
            balance_for_t0: 3.0,
            slashing_rate_for_t0: 0.05,
            ..Default::default()
        };
        let t0 = Referral {
            id: 2,
            mining_session_solo_previously_ended_at: now.sub(HOUR * 24),
            mining_session_solo_started_at: now.sub(HOUR * 2),
            mining_session_solo_ended_at: now.add(HOUR * 22),
            resurrect_solo_used_at: now.sub(HOUR * 2),
            ..Default::default()
        };

        resurrect(now, &mut user, Some(&t0), None);

        assert_eq!(user.balance_for_t0, 3.0 + 0.05 * 22.0);
        assert_eq!(user.slashing_rate_for_t0, 0.0);
        assert_eq!(user.resurrect_t0_used_at, now);

        // A second tick sees the stamped mark and does nothing.
        let after_first = user.clone();
        resurrect(ts(101), &mut user, Some(&t0), None);
        assert_eq!(user, after_first);
    }

    #[test]
    fn test_rewire_flips_negated_ids_and_keeps_balances() {
        let mut user = User {
            id_t0: -42,
            id_tminus1: -7,
            balance_t0: 2.5,
            balance_for_t0: 1.5,
            slashing_rate_for_t0: 0.1,
            slashing_rate_for_tminus1: 0.2,
            ..Default::default()
        };

        change_t0_and_tminus1_referrals(&mut user);

        assert_eq!(user.id_t0, 42);
        assert_eq!(user.id_tminus1, 7);
        assert_eq!(user.balance_t0, 2.5);
        assert_eq!(user.balance_for_t0, 1.5);
        assert_eq!(user.slashing_rate_for_t0, 0.0);
        assert_eq!(user.slashing_rate_for_tminus1, 0.0);
    }

    #[test]
    fn test_rewire_is_a_noop_for_settled_ids() {
        let mut user = User {
            id_t0: 42,
            slashing_rate_for_t0: 0.1,
            ..Default::default()
        };

        change_t0_and_tminus1_referrals(&mut user);

        assert_eq!(user.id_t0, 42);
        assert_eq!(user.slashing_rate_for_t0, 0.1);
    }
}
