//! Interval Ladder
//!
//! The fixed sequence of wait durations used by spaced retrieval. Index 0 is
//! the shortest wait; the last index is the mastery threshold.

// ============================================================================
// CONSTANTS
// ============================================================================

/// Wait durations in seconds, shortest first. Shared by every card.
pub const INTERVAL_LADDER: [u32; 5] = [15, 30, 60, 120, 240];

/// Ladder index whose confirmed success marks a card as mastered (240s)
pub const MASTERY_INDEX: usize = INTERVAL_LADDER.len() - 1;

/// Baseline value of a card that has never confirmed a level
pub const NO_BASELINE: i32 = -1;

// ============================================================================
// HELPERS
// ============================================================================

/// Clamp any integer to a valid ladder index
pub fn clamp_index(index: i64) -> usize {
    index.clamp(0, MASTERY_INDEX as i64) as usize
}

/// Clamp a baseline to `[NO_BASELINE, MASTERY_INDEX]`
pub fn clamp_baseline(baseline: i32) -> i32 {
    baseline.clamp(NO_BASELINE, MASTERY_INDEX as i32)
}

/// Seconds for a ladder index. Out-of-range indices are clamped.
pub fn interval_secs(index: usize) -> u32 {
    INTERVAL_LADDER[index.min(MASTERY_INDEX)]
}

/// Format a wait in seconds for display ("15s", "2m", "1m30s")
pub fn format_interval(secs: u32) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}m{}s", secs / 60, secs % 60)
    }
}
