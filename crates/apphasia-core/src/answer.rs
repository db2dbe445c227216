//! Answer comparison
//!
//! Typed answers are compared after trimming surrounding whitespace and
//! lowercasing. Nothing else is forgiven: punctuation and accents must match.

/// Normalize a typed or expected answer for comparison
pub fn normalize_answer(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Whether a typed answer matches the expected one
pub fn answers_match(typed: &str, expected: &str) -> bool {
    normalize_answer(typed) == normalize_answer(expected)
}
