//! Card records - what the storage layer keeps around the engine state
//!
//! A card belongs to one patient and carries one stimulus/answer pair. The
//! engine state is flattened on serialization, so an exported card reads as
//! a single flat document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SrState;

// ============================================================================
// PATIENT
// ============================================================================

/// A registered patient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    /// Opaque identifier chosen at registration
    pub id: String,
    /// Display name
    pub name: String,
    /// When the patient was registered
    pub created_at: DateTime<Utc>,
}

impl Patient {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// CARDS
// ============================================================================

/// Input for creating a card: one generated prompt and its expected answer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCard {
    /// Prompt shown to the patient
    pub stimulus: String,
    /// Expected answer
    pub answer: String,
    /// Optional grouping (family, routines, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl NewCard {
    pub fn new(stimulus: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            stimulus: stimulus.into(),
            answer: answer.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// A stored spaced-retrieval card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrCard {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Owning patient
    pub patient_id: String,
    /// Prompt shown to the patient
    pub stimulus: String,
    /// Expected answer
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Checked by a therapist
    #[serde(default)]
    pub reviewed: bool,
    /// Set by the controller once mastery is confirmed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mastered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Engine state
    #[serde(flatten)]
    pub state: SrState,
}

impl SrCard {
    /// Create a card with a fresh engine state
    pub fn new(patient_id: impl Into<String>, input: NewCard) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            patient_id: patient_id.into(),
            stimulus: input.stimulus.trim().to_string(),
            answer: input.answer.trim().to_string(),
            category: input
                .category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            reviewed: false,
            mastered_at: None,
            created_at: now,
            updated_at: now,
            state: SrState::new(),
        }
    }

    /// Copy of this card carrying `state`; every other field is preserved
    pub fn with_state(&self, state: SrState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    /// Flagged complete, or its state shows a confirmed 240s success
    pub fn is_mastered(&self) -> bool {
        self.mastered_at.is_some() || self.state.is_mastered()
    }
}

/// Therapist edit of a card's content. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardEdit {
    pub stimulus: Option<String>,
    pub answer: Option<String>,
    pub reviewed: Option<bool>,
}

impl CardEdit {
    /// Apply to a card, trimming any new text
    pub fn apply(&self, card: &SrCard) -> SrCard {
        let mut edited = card.clone();
        if let Some(stimulus) = &self.stimulus {
            edited.stimulus = stimulus.trim().to_string();
        }
        if let Some(answer) = &self.answer {
            edited.answer = answer.trim().to_string();
        }
        if let Some(reviewed) = self.reviewed {
            edited.reviewed = reviewed;
        }
        edited
    }

    pub fn is_empty(&self) -> bool {
        self.stimulus.is_none() && self.answer.is_none() && self.reviewed.is_none()
    }
}

// ============================================================================
// ATTEMPTS & STATS
// ============================================================================

/// One submitted answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: String,
    pub card_id: String,
    /// Text as typed by the patient
    pub response: String,
    pub correct: bool,
    /// Ladder index of the timer this answer started
    pub timer_index: usize,
    pub answered_at: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn new(
        card_id: impl Into<String>,
        response: impl Into<String>,
        correct: bool,
        timer_index: usize,
        answered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            card_id: card_id.into(),
            response: response.into(),
            correct,
            timer_index,
            answered_at,
        }
    }
}

/// Progress summary for one patient
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientStats {
    pub total_cards: i64,
    pub mastered: i64,
    pub learning: i64,
    pub relearning: i64,
    pub due_now: i64,
    pub total_lapses: i64,
    pub unreviewed: i64,
}
