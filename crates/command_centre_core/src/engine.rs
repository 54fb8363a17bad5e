//! crates/command_centre_core/src/engine.rs
//!
//! The streak and progress engine: pure functions over calendar days and
//! action-step counts. No I/O, no retained state; every call is a function
//! of its arguments alone.
//!
//! "Today" is always an explicit argument. The application resolves it once
//! per request as the UTC calendar day (`Utc::now().date_naive()`); the
//! engine itself never consults a clock, which keeps the policy pinned to a
//! single time zone and the functions deterministic under test.

use chrono::{Days, NaiveDate};
use std::collections::BTreeSet;

/// Number of consecutive calendar days with a check-in, counting backward
/// from `today` and stopping at the first gap.
///
/// If `today` itself has no check-in yet, the scan starts at yesterday
/// instead: the day is still in progress, and a streak must not visibly
/// reset to zero at midnight before the user has had a chance to check in.
/// If `today` is present, the scan starts at `today`. Duplicate days in the
/// input are ignored; an empty input yields 0.
pub fn current_streak(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = dates.iter().copied().collect();
    if days.is_empty() {
        return 0;
    }

    let mut anchor = if days.contains(&today) {
        today
    } else {
        match today.checked_sub_days(Days::new(1)) {
            Some(yesterday) => yesterday,
            None => return 0,
        }
    };

    let mut streak = 0;
    while days.contains(&anchor) {
        streak += 1;
        anchor = match anchor.checked_sub_days(Days::new(1)) {
            Some(prev) => prev,
            None => break,
        };
    }
    streak
}

/// Length of the longest run of consecutive calendar days anywhere in the
/// set, independent of today. 0 for an empty input, 1 for a single day.
pub fn longest_streak(dates: &[NaiveDate]) -> u32 {
    let days: BTreeSet<NaiveDate> = dates.iter().copied().collect();

    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;
    for day in days {
        run = match prev {
            Some(p) if p.checked_add_days(Days::new(1)) == Some(day) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(day);
    }
    best
}

/// Percentage of completed action steps, rounded half-up (half away from
/// zero; the counts are non-negative, so the two coincide). Zero total
/// steps yields 0 rather than dividing by zero.
pub fn progress(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u8
}

/// True iff a check-in exists for the given calendar day.
pub fn is_marked_on(dates: &[NaiveDate], day: NaiveDate) -> bool {
    dates.contains(&day)
}

/// Signed whole-day difference from `today` to `target`. Negative values
/// mean the target date has passed; 0 means it is today.
pub fn days_until(target: NaiveDate, today: NaiveDate) -> i64 {
    (target - today).num_days()
}
