//! SR Card State - the value the interval engine reads and returns
//!
//! One instance per (patient, stimulus) pair. Every field has a default so
//! that partial records (older documents, hand-written fixtures) load
//! without error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CardStatus;
use crate::sr::{MASTERY_INDEX, NO_BASELINE};

// ============================================================================
// SR STATE
// ============================================================================

/// Spaced-retrieval state of a single card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SrState {
    /// Last ladder index confirmed by waiting out a successful timer (-1 = none)
    pub baseline_index: i32,
    /// Ladder index attempted next if the upcoming answer is correct
    pub interval_index: usize,
    /// Consecutive correct answers since the last lapse
    pub success_streak: u32,
    /// Lifetime count of incorrect answers
    pub lapses: u32,
    /// Outcome of the most recent answer
    pub last_answer_correct: Option<bool>,
    /// Ladder index of the running / most recently completed timer
    pub last_timer_index: Option<usize>,
    /// When the card should next be presented (epoch milliseconds)
    pub next_due: i64,
    /// Learning after a correct answer, relearning after a lapse
    pub status: CardStatus,
    /// Duration in seconds of the running timer
    pub current_interval: Option<u32>,
}

impl Default for SrState {
    fn default() -> Self {
        Self {
            baseline_index: NO_BASELINE,
            interval_index: 0,
            success_streak: 0,
            lapses: 0,
            last_answer_correct: None,
            last_timer_index: None,
            next_due: 0,
            status: CardStatus::Learning,
            current_interval: None,
        }
    }
}

impl SrState {
    /// Fresh state for a newly registered card
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a correct answer's 240s timer has completed and been consolidated
    pub fn is_mastered(&self) -> bool {
        self.last_answer_correct == Some(true)
            && self.last_timer_index == Some(MASTERY_INDEX)
            && self.baseline_index == MASTERY_INDEX as i32
    }

    /// Check if the card is due at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_due <= now.timestamp_millis()
    }

    /// `next_due` as a timestamp, if it is representable
    pub fn next_due_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.next_due)
    }

    /// Where the card sits in the practice cycle at `now`
    pub fn phase(&self, now: DateTime<Utc>) -> CardPhase {
        if self.is_mastered() {
            return CardPhase::Mastered;
        }
        match (self.last_timer_index, self.last_answer_correct) {
            (Some(timer_index), Some(correct)) if !self.is_due(now) => CardPhase::TimerRunning {
                timer_index,
                correct,
            },
            _ => CardPhase::Preparing {
                interval_index: self.interval_index,
            },
        }
    }
}

// ============================================================================
// CARD PHASE
// ============================================================================

/// Informational view of the practice cycle
///
/// `Preparing` -> answer -> `TimerRunning` -> elapse + consolidation ->
/// `Preparing` again, or `Mastered` after a confirmed 240s success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum CardPhase {
    /// Waiting for an answer; a correct one will run `interval_index`
    Preparing { interval_index: usize },
    /// A wait is in progress
    TimerRunning { timer_index: usize, correct: bool },
    /// Terminal for the controller; the engine itself keeps working
    Mastered,
}
