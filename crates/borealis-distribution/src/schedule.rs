//! Release schedule.
//!
//! Each collection cycle releases a slice of the user's remaining standard
//! balance sized so that everything is distributed by the program end date.

use borealis_model::Timestamp;
use std::time::Duration;

/// The portion of `remaining_standard` due for release in the current cycle.
///
/// The timeline is bucketed by `freq_min`; with `delta` buckets of runway
/// left until `end_date`, the cycle releases `remaining * freq_min / delta`.
/// Once the runway shrinks below `freq_max` the full remainder is released.
/// Returns 0 for a nil end date or a non-positive remainder.
pub fn calculate_distribution_balance(
    remaining_standard: f64,
    freq_min: Duration,
    freq_max: Duration,
    now: Timestamp,
    end_date: Timestamp,
) -> f64 {
    if remaining_standard <= 0.0 || end_date.is_nil() || now.is_nil() {
        return 0.0;
    }
    let delta_ms = end_date
        .truncate(freq_min)
        .millis_since(now.truncate(freq_min));
    if delta_ms <= 0 {
        return remaining_standard;
    }
    if delta_ms <= freq_max.as_millis() as i64 {
        return remaining_standard;
    }

    remaining_standard * (freq_min.as_millis() as f64) / (delta_ms as f64)
}
