//! Spaced Retrieval (SR) Module
//!
//! Fixed-ladder spaced retrieval for word-finding drills. The patient answers
//! a prompt, waits out a timer, and is asked again; each confirmed success
//! moves the card one rung up the ladder.
//!
//! ## Ladder
//! 15s -> 30s -> 60s -> 120s -> 240s. A correct answer whose 240s wait has
//! elapsed marks the card as mastered.

mod engine;
mod ladder;

pub use engine::{compute_next, consolidate_baseline, is_mastered, preview, IntervalPreview};

pub use ladder::{
    clamp_baseline, clamp_index, format_interval, interval_secs, INTERVAL_LADDER, MASTERY_INDEX,
    NO_BASELINE,
};
