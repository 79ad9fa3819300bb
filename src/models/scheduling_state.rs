//! Per-word spaced repetition fields.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Easiness a word starts with ("medium" difficulty).
pub const DEFAULT_EASINESS_FACTOR: f64 = 2.5;
/// Easiness never drops below this value.
pub const MIN_EASINESS_FACTOR: f64 = 1.3;
pub const INITIAL_REVIEW_COUNT: u32 = 0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchedulingState {
    pub review_count: u32,
    pub easiness_factor: f64,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
}

impl Default for SchedulingState {
    fn default() -> Self {
        Self {
            review_count: INITIAL_REVIEW_COUNT,
            easiness_factor: DEFAULT_EASINESS_FACTOR,
            last_reviewed_at: None,
            due_date: None,
        }
    }
}

impl SchedulingState {
    /// A word is due when it has never been reviewed or its due date has passed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due_date.is_none_or(|due| due <= now)
    }
}
