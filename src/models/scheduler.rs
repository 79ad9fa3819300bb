//! SM-2 style review scheduling for vocabulary words.
//!
//! Every review moves a word one step along its schedule:
//! - The easiness factor is updated from the recall quality and floored at 1.3
//! - The review count always grows by one, whatever the quality
//! - The interval depends on the new review count: 1 day, then 6 days, then
//!   `(count - 1) * easiness` days truncated to whole days
//!
//! The current time is always passed in; nothing here reads a clock.

use super::SchedulingState;
use super::scheduling_state::MIN_EASINESS_FACTOR;
use chrono::{DateTime, Duration, Utc};

/// Highest recall quality (perfect response).
pub const MAX_QUALITY: i32 = 5;

/// Returns the next scheduling state after a review.
/// quality: 0-5 (0 = complete blackout, 5 = perfect response), clamped when out of range
pub fn record_review(state: &SchedulingState, quality: i32, now: DateTime<Utc>) -> SchedulingState {
    let q = quality.clamp(0, MAX_QUALITY);
    let easiness_factor = next_easiness(state.easiness_factor, q);

    let review_count = state.review_count.saturating_add(1);
    let interval = interval_days(review_count, easiness_factor);
    let due_date = Duration::try_days(interval)
        .and_then(|days| now.checked_add_signed(days))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    SchedulingState {
        review_count,
        easiness_factor,
        last_reviewed_at: Some(now),
        due_date: Some(due_date),
    }
}

/// EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02)), never below 1.3
fn next_easiness(easiness_factor: f64, quality: i32) -> f64 {
    let miss = f64::from(MAX_QUALITY - quality);
    let next = easiness_factor + (0.1 - miss * (0.08 + miss * 0.02));
    next.max(MIN_EASINESS_FACTOR)
}

/// Days until the next review, given the review count including this review.
pub fn interval_days(review_count: u32, easiness_factor: f64) -> i64 {
    match review_count {
        1 => 1,
        2 => 6,
        n => (f64::from(n.saturating_sub(1)) * easiness_factor) as i64,
    }
}
