//! SR Interval Engine
//!
//! Two pure functions over [`SrState`]:
//!
//! - [`compute_next`] runs on every submitted answer. A correct answer starts
//!   the timer at the prepared index and prepares the next rung; an incorrect
//!   one falls back to the confirmed baseline.
//! - [`consolidate_baseline`] runs once the timer has fully elapsed and
//!   promotes the baseline to the timer's index if the answer was correct.
//!
//! The baseline only moves through consolidation, so a single lucky answer
//! never raises it and a lapse after a long wait falls back to the last
//! proven interval.
//!
//! Neither function reads the clock; `now` is an argument.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ladder::{clamp_baseline, interval_secs, MASTERY_INDEX};
use crate::card::{CardStatus, SrState};

// ============================================================================
// ENGINE
// ============================================================================

/// Apply an answer to a card state
///
/// # Arguments
/// * `state` - Current card state
/// * `correct` - Whether the answer matched the expected one
/// * `now` - Submission time, used for `next_due`
///
/// # Returns
/// The updated state. `baseline_index` is never changed here.
pub fn compute_next(state: &SrState, correct: bool, now: DateTime<Utc>) -> SrState {
    let baseline_index = clamp_baseline(state.baseline_index);
    let prepared_index = state.interval_index.min(MASTERY_INDEX);

    let mut next = state.clone();

    let timer_index = if correct {
        next.success_streak = state.success_streak.saturating_add(1);
        next.status = CardStatus::Learning;
        prepared_index
    } else {
        next.success_streak = 0;
        next.lapses = state.lapses.saturating_add(1);
        next.status = CardStatus::Relearning;
        baseline_index.max(0) as usize
    };

    let base = if correct { prepared_index } else { timer_index };
    next.interval_index = (base + 1).min(MASTERY_INDEX);

    let secs = interval_secs(timer_index);
    next.last_timer_index = Some(timer_index);
    next.last_answer_correct = Some(correct);
    next.current_interval = Some(secs);
    next.next_due = now.timestamp_millis() + i64::from(secs) * 1000;

    next
}

/// Promote the baseline after a successful timer has elapsed
///
/// Returns the state unchanged unless the last answer was correct and a
/// timer index is recorded. Applying it twice is the same as once.
pub fn consolidate_baseline(state: &SrState) -> SrState {
    match (state.last_answer_correct, state.last_timer_index) {
        (Some(true), Some(timer_index)) => SrState {
            baseline_index: timer_index.min(MASTERY_INDEX) as i32,
            ..state.clone()
        },
        _ => state.clone(),
    }
}

/// Confirmed success at the top of the ladder
pub fn is_mastered(state: &SrState) -> bool {
    state.is_mastered()
}

// ============================================================================
// PREVIEW
// ============================================================================

/// Timers each outcome would start from a given state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalPreview {
    /// Wait in seconds if the next answer is correct
    pub on_correct_secs: u32,
    /// Wait in seconds if the next answer is incorrect
    pub on_incorrect_secs: u32,
    /// Wait of the confirmed baseline (15s when none is confirmed)
    pub baseline_secs: u32,
}

/// Preview the next timer for both outcomes without changing the state
pub fn preview(state: &SrState) -> IntervalPreview {
    let fallback = clamp_baseline(state.baseline_index).max(0) as usize;
    IntervalPreview {
        on_correct_secs: interval_secs(state.interval_index),
        on_incorrect_secs: interval_secs(fallback),
        baseline_secs: interval_secs(fallback),
    }
}
