//! Card module - Core types and data structures
//!
//! Implements the spaced-retrieval card model with:
//! - Per-card engine state (`SrState`) with defaults for absent fields
//! - Stored card records tied to a patient and a stimulus/answer pair
//! - Answer log and per-patient progress statistics

mod record;
mod state;

pub use record::{AttemptRecord, CardEdit, NewCard, Patient, PatientStats, SrCard};
pub use state::{CardPhase, SrState};

use serde::{Deserialize, Serialize};

// ============================================================================
// CARD STATUS
// ============================================================================

/// Outcome class of the most recent answer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    /// Most recent answer was correct (also the initial status)
    #[default]
    Learning,
    /// Most recent answer was incorrect
    Relearning,
}

impl CardStatus {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Learning => "learning",
            CardStatus::Relearning => "relearning",
        }
    }
}

impl std::fmt::Display for CardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CardStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "learning" => Ok(CardStatus::Learning),
            "relearning" => Ok(CardStatus::Relearning),
            _ => Err(format!("Unknown card status: {}", s)),
        }
    }
}
