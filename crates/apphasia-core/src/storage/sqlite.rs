//! SQLite Storage Implementation
//!
//! Card store for patients, their SR cards and the answer log.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::card::{AttemptRecord, CardEdit, CardStatus, NewCard, Patient, PatientStats, SrCard, SrState};
use crate::sr::{clamp_baseline, clamp_index};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Patient or card not found
    #[error("Not found: {0}")]
    NotFound(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid timestamp
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
    /// JSON import/export error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

// ============================================================================
// STORAGE
// ============================================================================

/// Main storage struct
///
/// Uses separate reader/writer connections for interior mutability.
/// All methods take `&self`, so a `Storage` can be shared behind an `Arc`.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    path: PathBuf,
}

impl Storage {
    /// Apply PRAGMAs to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        Ok(())
    }

    /// Default database location in the platform data directory
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "apphasia", "core").ok_or_else(|| {
            StorageError::Init("Could not determine project directories".to_string())
        })?;
        Ok(proj_dirs.data_dir().join("apphasia.db"))
    }

    /// Create new storage instance
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => Self::default_path()?,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let writer_conn = Connection::open(&path)?;

        // Patient data: owner-only on Unix
        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        let applied = super::migrations::apply_migrations(&writer_conn)?;
        if applied > 0 {
            tracing::info!(path = %path.display(), "Applied {} migration(s)", applied);
        }

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            path,
        })
    }

    /// Path of the database file
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn reader(&self) -> Result<MutexGuard<'_, Connection>> {
        self.reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))
    }

    fn writer(&self) -> Result<MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))
    }

    // ========================================================================
    // PATIENTS
    // ========================================================================

    /// Register a patient and create one fresh card per stimulus
    ///
    /// Registering an existing patient updates the name and adds the cards.
    pub fn register_patient(
        &self,
        patient_id: &str,
        name: &str,
        cards: Vec<NewCard>,
    ) -> Result<(Patient, Vec<SrCard>)> {
        let patient = Patient::new(patient_id.trim(), name.trim());
        if patient.id.is_empty() {
            return Err(StorageError::Init("Patient id must not be empty".to_string()));
        }

        let created: Vec<SrCard> = cards
            .into_iter()
            .map(|input| SrCard::new(patient.id.clone(), input))
            .collect();

        {
            let mut writer = self.writer()?;
            let tx = writer.transaction()?;
            tx.execute(
                "INSERT INTO patients (id, name, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name",
                params![patient.id, patient.name, patient.created_at.to_rfc3339()],
            )?;
            for card in &created {
                Self::insert_card(&tx, card)?;
            }
            tx.commit()?;
        }

        tracing::info!(
            patient_id = %patient.id,
            cards = created.len(),
            "Patient registered"
        );

        let patient = self
            .get_patient(&patient.id)?
            .ok_or_else(|| StorageError::NotFound(patient.id.clone()))?;
        Ok((patient, created))
    }

    /// Get a patient by ID
    pub fn get_patient(&self, id: &str) -> Result<Option<Patient>> {
        let reader = self.reader()?;
        let patient = reader
            .query_row(
                "SELECT * FROM patients WHERE id = ?1",
                params![id],
                Self::row_to_patient,
            )
            .optional()?;
        Ok(patient)
    }

    /// All patients, oldest registration first
    pub fn list_patients(&self) -> Result<Vec<Patient>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare("SELECT * FROM patients ORDER BY created_at ASC")?;
        let patients = stmt.query_map([], Self::row_to_patient)?;

        let mut result = Vec::new();
        for patient in patients {
            result.push(patient?);
        }
        Ok(result)
    }

    fn row_to_patient(row: &rusqlite::Row) -> rusqlite::Result<Patient> {
        let created_at: String = row.get("created_at")?;
        Ok(Patient {
            id: row.get("id")?,
            name: row.get("name")?,
            created_at: Self::parse_timestamp(&created_at, "created_at")?,
        })
    }

    // ========================================================================
    // CARDS
    // ========================================================================

    fn insert_card(conn: &Connection, card: &SrCard) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT INTO sr_cards (
                id, patient_id, stimulus, answer, category, reviewed, mastered_at,
                created_at, updated_at,
                baseline_index, interval_index, success_streak, lapses,
                last_answer_correct, last_timer_index, next_due, status, current_interval
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            params![
                card.id,
                card.patient_id,
                card.stimulus,
                card.answer,
                card.category,
                card.reviewed,
                card.mastered_at.map(|t| t.to_rfc3339()),
                card.created_at.to_rfc3339(),
                card.updated_at.to_rfc3339(),
                card.state.baseline_index,
                card.state.interval_index as i64,
                card.state.success_streak,
                card.state.lapses,
                card.state.last_answer_correct,
                card.state.last_timer_index.map(|i| i as i64),
                card.state.next_due,
                card.state.status.as_str(),
                card.state.current_interval,
            ],
        )?;
        Ok(())
    }

    /// Add a single card for an existing patient
    pub fn add_card(&self, patient_id: &str, input: NewCard) -> Result<SrCard> {
        if self.get_patient(patient_id)?.is_none() {
            return Err(StorageError::NotFound(patient_id.to_string()));
        }

        let card = SrCard::new(patient_id, input);
        {
            let writer = self.writer()?;
            Self::insert_card(&writer, &card)?;
        }
        Ok(card)
    }

    /// Get a card by ID
    pub fn get_card(&self, id: &str) -> Result<Option<SrCard>> {
        let reader = self.reader()?;
        let card = reader
            .query_row(
                "SELECT * FROM sr_cards WHERE id = ?1",
                params![id],
                Self::row_to_card,
            )
            .optional()?;
        Ok(card)
    }

    fn require_card(&self, id: &str) -> Result<SrCard> {
        self.get_card(id)?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    /// A patient's cards, soonest `next_due` first
    pub fn cards_for_patient(&self, patient_id: &str) -> Result<Vec<SrCard>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT * FROM sr_cards
             WHERE patient_id = ?1
             ORDER BY next_due ASC, created_at ASC",
        )?;
        let cards = stmt.query_map(params![patient_id], Self::row_to_card)?;

        let mut result = Vec::new();
        for card in cards {
            result.push(card?);
        }
        Ok(result)
    }

    /// Unmastered cards due at `now`, soonest first
    pub fn due_cards(
        &self,
        patient_id: &str,
        now: DateTime<Utc>,
        limit: i32,
    ) -> Result<Vec<SrCard>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT * FROM sr_cards
             WHERE patient_id = ?1
             AND mastered_at IS NULL
             AND next_due <= ?2
             ORDER BY next_due ASC, created_at ASC
             LIMIT ?3",
        )?;
        let cards = stmt.query_map(
            params![patient_id, now.timestamp_millis(), limit],
            Self::row_to_card,
        )?;

        let mut result = Vec::new();
        for card in cards {
            result.push(card?);
        }
        Ok(result)
    }

    fn update_state(
        conn: &Connection,
        card_id: &str,
        state: &SrState,
        updated_at: DateTime<Utc>,
        mastered_at: Option<DateTime<Utc>>,
    ) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE sr_cards SET
                baseline_index = ?1,
                interval_index = ?2,
                success_streak = ?3,
                lapses = ?4,
                last_answer_correct = ?5,
                last_timer_index = ?6,
                next_due = ?7,
                status = ?8,
                current_interval = ?9,
                updated_at = ?10,
                mastered_at = COALESCE(mastered_at, ?11)
            WHERE id = ?12",
            params![
                state.baseline_index,
                state.interval_index as i64,
                state.success_streak,
                state.lapses,
                state.last_answer_correct,
                state.last_timer_index.map(|i| i as i64),
                state.next_due,
                state.status.as_str(),
                state.current_interval,
                updated_at.to_rfc3339(),
                mastered_at.map(|t| t.to_rfc3339()),
                card_id,
            ],
        )
    }

    /// Persist a new engine state for a card, stamped with the current time
    pub fn save_state(&self, card_id: &str, state: &SrState) -> Result<SrCard> {
        let updated = {
            let writer = self.writer()?;
            Self::update_state(&writer, card_id, state, Utc::now(), None)?
        };

        if updated == 0 {
            return Err(StorageError::NotFound(card_id.to_string()));
        }
        self.require_card(card_id)
    }

    /// Persist a card's state and mastery flag as held by a practice session
    ///
    /// `updated_at` is written as the session stamped it. An existing
    /// `mastered_at` is never overwritten.
    pub fn save_card(&self, card: &SrCard) -> Result<SrCard> {
        let updated = {
            let writer = self.writer()?;
            Self::update_state(
                &writer,
                &card.id,
                &card.state,
                card.updated_at,
                card.mastered_at,
            )?
        };

        if updated == 0 {
            return Err(StorageError::NotFound(card.id.clone()));
        }
        if let Some(at) = card.mastered_at {
            tracing::debug!(card_id = %card.id, mastered_at = %at, "Saved mastered card");
        }
        self.require_card(&card.id)
    }

    /// Flag a card as complete
    pub fn mark_mastered(&self, card_id: &str, at: DateTime<Utc>) -> Result<SrCard> {
        let updated = {
            let writer = self.writer()?;
            writer.execute(
                "UPDATE sr_cards SET mastered_at = COALESCE(mastered_at, ?1), updated_at = ?1
                 WHERE id = ?2",
                params![at.to_rfc3339(), card_id],
            )?
        };
        if updated == 0 {
            return Err(StorageError::NotFound(card_id.to_string()));
        }
        tracing::info!(card_id, "Card flagged as mastered");
        self.require_card(card_id)
    }

    /// Therapist edit of prompt, answer or review flag
    pub fn edit_card(&self, card_id: &str, edit: &CardEdit) -> Result<SrCard> {
        let card = self.require_card(card_id)?;
        if edit.is_empty() {
            return Ok(card);
        }

        let edited = edit.apply(&card);
        {
            let writer = self.writer()?;
            writer.execute(
                "UPDATE sr_cards SET stimulus = ?1, answer = ?2, reviewed = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    edited.stimulus,
                    edited.answer,
                    edited.reviewed,
                    Utc::now().to_rfc3339(),
                    card_id,
                ],
            )?;
        }
        self.require_card(card_id)
    }

    /// Cards for therapist review, unreviewed first
    ///
    /// `reviewed` filters on the flag; `None` lists every card.
    pub fn cards_for_review(&self, reviewed: Option<bool>) -> Result<Vec<SrCard>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT * FROM sr_cards
             WHERE ?1 IS NULL OR reviewed = ?1
             ORDER BY reviewed ASC, patient_id ASC, stimulus ASC",
        )?;
        let cards = stmt.query_map(params![reviewed], Self::row_to_card)?;

        let mut result = Vec::new();
        for card in cards {
            result.push(card?);
        }
        Ok(result)
    }

    /// Delete a card and its answer log
    pub fn delete_card(&self, id: &str) -> Result<bool> {
        let writer = self.writer()?;
        let rows = writer.execute("DELETE FROM sr_cards WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Parse RFC3339 timestamp
    fn parse_timestamp(value: &str, field_name: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                Self::conversion_error(format!(
                    "Invalid {} timestamp '{}': {}",
                    field_name, value, e
                ))
            })
    }

    fn conversion_error(message: String) -> rusqlite::Error {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
        )
    }

    /// Convert a row to SrCard
    fn row_to_card(row: &rusqlite::Row) -> rusqlite::Result<SrCard> {
        let created_at: String = row.get("created_at")?;
        let updated_at: String = row.get("updated_at")?;
        let mastered_at: Option<String> = row.get("mastered_at")?;
        let status: String = row.get("status")?;

        let mastered_at = match mastered_at {
            Some(s) => Some(Self::parse_timestamp(&s, "mastered_at")?),
            None => None,
        };
        let status: CardStatus = status.parse().map_err(Self::conversion_error)?;

        let interval_index: i64 = row.get("interval_index")?;
        let last_timer_index: Option<i64> = row.get("last_timer_index")?;

        Ok(SrCard {
            id: row.get("id")?,
            patient_id: row.get("patient_id")?,
            stimulus: row.get("stimulus")?,
            answer: row.get("answer")?,
            category: row.get("category")?,
            reviewed: row.get("reviewed")?,
            mastered_at,
            created_at: Self::parse_timestamp(&created_at, "created_at")?,
            updated_at: Self::parse_timestamp(&updated_at, "updated_at")?,
            state: SrState {
                baseline_index: clamp_baseline(row.get("baseline_index")?),
                interval_index: clamp_index(interval_index),
                success_streak: row.get("success_streak")?,
                lapses: row.get("lapses")?,
                last_answer_correct: row.get("last_answer_correct")?,
                last_timer_index: last_timer_index.map(clamp_index),
                next_due: row.get("next_due")?,
                status,
                current_interval: row.get("current_interval")?,
            },
        })
    }

    // ========================================================================
    // ANSWER LOG
    // ========================================================================

    /// Log a submitted answer
    pub fn record_attempt(&self, attempt: &AttemptRecord) -> Result<()> {
        let writer = self.writer()?;
        writer.execute(
            "INSERT INTO sr_attempts (id, card_id, response, correct, timer_index, answered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                attempt.id,
                attempt.card_id,
                attempt.response,
                attempt.correct,
                attempt.timer_index as i64,
                attempt.answered_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Answers submitted for a card, newest first
    pub fn attempts_for_card(&self, card_id: &str, limit: i32) -> Result<Vec<AttemptRecord>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT * FROM sr_attempts
             WHERE card_id = ?1
             ORDER BY answered_at DESC
             LIMIT ?2",
        )?;
        let attempts = stmt.query_map(params![card_id, limit], |row| {
            let answered_at: String = row.get("answered_at")?;
            let timer_index: i64 = row.get("timer_index")?;
            Ok(AttemptRecord {
                id: row.get("id")?,
                card_id: row.get("card_id")?,
                response: row.get("response")?,
                correct: row.get("correct")?,
                timer_index: clamp_index(timer_index),
                answered_at: Self::parse_timestamp(&answered_at, "answered_at")?,
            })
        })?;

        let mut result = Vec::new();
        for attempt in attempts {
            result.push(attempt?);
        }
        Ok(result)
    }

    // ========================================================================
    // STATS & EXPORT
    // ========================================================================

    /// Progress summary for a patient
    pub fn patient_stats(&self, patient_id: &str, now: DateTime<Utc>) -> Result<PatientStats> {
        let reader = self.reader()?;
        let stats = reader.query_row(
            "SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN mastered_at IS NOT NULL THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN mastered_at IS NULL AND status = 'learning' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN mastered_at IS NULL AND status = 'relearning' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN mastered_at IS NULL AND next_due <= ?2 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(lapses), 0),
                COALESCE(SUM(CASE WHEN reviewed = 0 THEN 1 ELSE 0 END), 0)
             FROM sr_cards WHERE patient_id = ?1",
            params![patient_id, now.timestamp_millis()],
            |row| {
                Ok(PatientStats {
                    total_cards: row.get(0)?,
                    mastered: row.get(1)?,
                    learning: row.get(2)?,
                    relearning: row.get(3)?,
                    due_now: row.get(4)?,
                    total_lapses: row.get(5)?,
                    unreviewed: row.get(6)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// Add cards from a JSON array of `{stimulus, answer, category?}`
    ///
    /// All cards are written in one transaction: a failure adds none.
    pub fn import_cards(&self, patient_id: &str, json: &str) -> Result<Vec<SrCard>> {
        let inputs: Vec<NewCard> = serde_json::from_str(json)?;
        if self.get_patient(patient_id)?.is_none() {
            return Err(StorageError::NotFound(patient_id.to_string()));
        }

        let created: Vec<SrCard> = inputs
            .into_iter()
            .map(|input| SrCard::new(patient_id, input))
            .collect();

        {
            let mut writer = self.writer()?;
            let tx = writer.transaction()?;
            for card in &created {
                Self::insert_card(&tx, card)?;
            }
            tx.commit()?;
        }

        tracing::info!(patient_id, cards = created.len(), "Cards imported");
        Ok(created)
    }

    /// A patient's cards as pretty JSON, one flat record per card
    pub fn export_cards(&self, patient_id: &str) -> Result<String> {
        let cards = self.cards_for_patient(patient_id)?;
        Ok(serde_json::to_string_pretty(&cards)?)
    }
}
