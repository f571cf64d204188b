//! Mining-session arithmetic.

use borealis_model::Timestamp;
use std::time::Duration;

/// Number of consecutive mining sessions completed by `now`.
///
/// Zero when either session mark is absent or `now` falls outside the
/// `[started, ended]` interval.
pub fn calculate_mining_streak(
    now: Timestamp,
    started_at: Timestamp,
    ended_at: Timestamp,
    session_duration: Duration,
) -> u64 {
    if started_at.is_nil() || ended_at.is_nil() || now.after(ended_at) || now.before(started_at) {
        return 0;
    }
    let session_ms = session_duration.as_millis() as i64;
    if session_ms <= 0 {
        return 0;
    }

    (now.millis_since(started_at) / session_ms) as u64
}
