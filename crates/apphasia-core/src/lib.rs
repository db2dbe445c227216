//! # Apphasia Core
//!
//! Spaced-retrieval practice engine for aphasia word-finding therapy.
//!
//! - **Fixed Interval Ladder**: 15s, 30s, 60s, 120s, 240s
//! - **Two-step Scheduling**: an answer picks the next timer; waiting it out
//!   consolidates the baseline
//! - **Mastery**: a correct answer whose 240s timer has elapsed
//! - **Practice Controller**: one answer per timer, resumable from stored state
//! - **SQLite Storage**: patients, cards with full engine state, answer log
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use apphasia_core::{NewCard, PracticeSession, Storage};
//! use chrono::Utc;
//!
//! let storage = Storage::new(None)?;
//! let (_, cards) = storage.register_patient(
//!     "patient-1",
//!     "Ana",
//!     vec![NewCard::new("What is your dog called?", "Toby")],
//! )?;
//!
//! let mut session = PracticeSession::new(cards[0].clone(), Utc::now());
//! let outcome = session.submit_answer("toby", Utc::now())?;
//! storage.record_attempt(&outcome.to_attempt(&cards[0].id))?;
//! storage.save_card(session.card())?;
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): Compile SQLite into the crate

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod answer;
pub mod card;
pub mod session;
pub mod sr;
pub mod storage;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use answer::{answers_match, normalize_answer};

pub use card::{
    AttemptRecord, CardEdit, CardPhase, CardStatus, NewCard, Patient, PatientStats, SrCard,
    SrState,
};

pub use sr::{
    compute_next, consolidate_baseline, format_interval, interval_secs, is_mastered, preview,
    IntervalPreview, INTERVAL_LADDER, MASTERY_INDEX, NO_BASELINE,
};

pub use session::{AnswerOutcome, PracticeSession, SessionError, SessionPhase, TimerOutcome};

pub use storage::{Result, Storage, StorageError};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        compute_next, consolidate_baseline, AnswerOutcome, CardStatus, NewCard, PracticeSession,
        Result, SrCard, SrState, Storage, StorageError, TimerOutcome,
    };
}
