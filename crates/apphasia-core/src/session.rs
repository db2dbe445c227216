//! Practice Session
//!
//! Drives one card through the question -> timer -> question loop:
//!
//! 1. **Question**: the patient types an answer; it is compared and fed to
//!    [`compute_next`], which starts a timer.
//! 2. **Timer**: no answer is accepted until the wait is over. When
//!    [`PracticeSession::poll`] sees the timer elapsed it consolidates the
//!    baseline exactly once.
//! 3. **Mastered**: reached after a consolidated 240s success. The session
//!    stops accepting answers.
//!
//! The engine does not guard against a second answer while a timer runs;
//! this controller does, including for a card reloaded mid-timer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::answer::answers_match;
use crate::card::{AttemptRecord, CardPhase, SrCard};
use crate::sr::{compute_next, consolidate_baseline, interval_secs, MASTERY_INDEX};

// ============================================================================
// ERRORS
// ============================================================================

/// Answer rejected by the session
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The previous answer's timer has not elapsed yet
    #[error("Timer still running: {seconds_left}s left")]
    TimerActive { seconds_left: u32 },
    /// Card is already mastered
    #[error("Card already mastered: {0}")]
    AlreadyMastered(String),
}

// ============================================================================
// TYPES
// ============================================================================

/// Where the session is in the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SessionPhase {
    /// Waiting for an answer
    Question,
    /// A wait started by the last answer is running
    Timer { ends_at: DateTime<Utc> },
    /// Confirmed success at the top of the ladder
    Mastered,
}

/// Result of a submitted answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub correct: bool,
    /// Text as typed
    pub response: String,
    /// Expected answer, for feedback
    pub expected: String,
    /// Ladder index of the timer now running
    pub timer_index: usize,
    /// Length of that timer in seconds
    pub wait_secs: u32,
    /// Epoch milliseconds at which the timer ends
    pub next_due: i64,
    pub answered_at: DateTime<Utc>,
}

impl AnswerOutcome {
    /// Log entry for this answer
    pub fn to_attempt(&self, card_id: &str) -> AttemptRecord {
        AttemptRecord::new(
            card_id,
            self.response.clone(),
            self.correct,
            self.timer_index,
            self.answered_at,
        )
    }
}

/// What happened when a timer elapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TimerOutcome {
    /// Back to the question
    Continue {
        /// Baseline after consolidation
        baseline_index: i32,
        /// Wait a correct answer would start next
        next_interval_secs: u32,
    },
    /// The 240s success is confirmed; stop scheduling the card
    Mastered,
}

// ============================================================================
// PRACTICE SESSION
// ============================================================================

/// Controller for one card
#[derive(Debug, Clone)]
pub struct PracticeSession {
    card: SrCard,
    phase: SessionPhase,
}

impl PracticeSession {
    /// Start a session on a card, resuming from its stored state
    ///
    /// A card saved while its timer was running comes back in the timer
    /// phase, so it cannot be answered again before the wait is over.
    pub fn new(card: SrCard, now: DateTime<Utc>) -> Self {
        let phase = if card.is_mastered() {
            SessionPhase::Mastered
        } else {
            match card.state.phase(now) {
                CardPhase::Mastered => SessionPhase::Mastered,
                CardPhase::TimerRunning { .. } => match card.state.next_due_at() {
                    Some(ends_at) => SessionPhase::Timer { ends_at },
                    None => SessionPhase::Question,
                },
                CardPhase::Preparing { .. } => SessionPhase::Question,
            }
        };
        if matches!(phase, SessionPhase::Timer { .. }) {
            tracing::debug!(card_id = %card.id, "Resumed with a running timer");
        }
        Self { card, phase }
    }

    pub fn card(&self) -> &SrCard {
        &self.card
    }

    pub fn into_card(self) -> SrCard {
        self.card
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_mastered(&self) -> bool {
        self.phase == SessionPhase::Mastered
    }

    /// Submit a typed answer
    pub fn submit_answer(
        &mut self,
        typed: &str,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, SessionError> {
        match self.phase {
            SessionPhase::Mastered => {
                return Err(SessionError::AlreadyMastered(self.card.id.clone()));
            }
            SessionPhase::Timer { .. } => {
                return Err(SessionError::TimerActive {
                    seconds_left: self.seconds_left(now),
                });
            }
            SessionPhase::Question => {}
        }

        let correct = answers_match(typed, &self.card.answer);
        let state = compute_next(&self.card.state, correct, now);
        let timer_index = state.last_timer_index.unwrap_or(0);
        let wait_secs = state.current_interval.unwrap_or_else(|| interval_secs(timer_index));

        tracing::debug!(
            card_id = %self.card.id,
            correct,
            timer_index,
            wait_secs,
            "Answer submitted"
        );

        self.card = self.card.with_state(state);
        self.card.updated_at = now;
        self.phase = SessionPhase::Timer {
            ends_at: now + Duration::seconds(i64::from(wait_secs)),
        };

        Ok(AnswerOutcome {
            correct,
            response: typed.to_string(),
            expected: self.card.answer.clone(),
            timer_index,
            wait_secs,
            next_due: self.card.state.next_due,
            answered_at: now,
        })
    }

    /// Whole seconds left on the running timer (0 outside a timer)
    pub fn seconds_left(&self, now: DateTime<Utc>) -> u32 {
        match self.phase {
            SessionPhase::Timer { ends_at } if now < ends_at => {
                let millis = (ends_at - now).num_milliseconds();
                ((millis + 999) / 1000) as u32
            }
            _ => 0,
        }
    }

    /// Advance past an elapsed timer
    ///
    /// Consolidates exactly once per timer. Returns `None` if no timer is
    /// running or it has not elapsed yet.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Option<TimerOutcome> {
        let SessionPhase::Timer { ends_at } = self.phase else {
            return None;
        };
        if now < ends_at {
            return None;
        }

        let state = consolidate_baseline(&self.card.state);
        self.card = self.card.with_state(state);
        self.card.updated_at = now;

        if self.card.state.is_mastered() {
            self.card.mastered_at = Some(now);
            self.phase = SessionPhase::Mastered;
            tracing::info!(card_id = %self.card.id, "Card mastered at {}s", interval_secs(MASTERY_INDEX));
            return Some(TimerOutcome::Mastered);
        }

        self.phase = SessionPhase::Question;
        tracing::debug!(
            card_id = %self.card.id,
            baseline_index = self.card.state.baseline_index,
            "Timer elapsed"
        );
        Some(TimerOutcome::Continue {
            baseline_index: self.card.state.baseline_index,
            next_interval_secs: interval_secs(self.card.state.interval_index),
        })
    }

    /// Drop a running timer without consolidating
    ///
    /// The card keeps the state of the last answer until the next one.
    pub fn abandon(&mut self) {
        if matches!(self.phase, SessionPhase::Timer { .. }) {
            tracing::debug!(card_id = %self.card.id, "Timer abandoned");
            self.phase = SessionPhase::Question;
        }
    }
}
