//! Database Migrations
//!
//! Schema migration definitions for the storage layer.

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: patients and SR cards",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Mastery flag and answer log",
        up: MIGRATION_V2_UP,
    },
];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// V1: Initial schema
const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sr_cards (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    stimulus TEXT NOT NULL,
    answer TEXT NOT NULL,
    category TEXT,
    reviewed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    -- Engine state
    baseline_index INTEGER NOT NULL DEFAULT -1,
    interval_index INTEGER NOT NULL DEFAULT 0,
    success_streak INTEGER NOT NULL DEFAULT 0,
    lapses INTEGER NOT NULL DEFAULT 0,
    last_answer_correct INTEGER,
    last_timer_index INTEGER,
    next_due INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'learning',
    current_interval INTEGER
);

CREATE INDEX IF NOT EXISTS idx_sr_cards_patient_due ON sr_cards(patient_id, next_due);
CREATE INDEX IF NOT EXISTS idx_sr_cards_reviewed ON sr_cards(reviewed);

INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

/// V2: Mastery flag and answer log
const MIGRATION_V2_UP: &str = r#"
ALTER TABLE sr_cards ADD COLUMN mastered_at TEXT;

CREATE TABLE IF NOT EXISTS sr_attempts (
    id TEXT PRIMARY KEY,
    card_id TEXT NOT NULL REFERENCES sr_cards(id) ON DELETE CASCADE,
    response TEXT NOT NULL,
    correct INTEGER NOT NULL,
    timer_index INTEGER NOT NULL,
    answered_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sr_attempts_card ON sr_attempts(card_id, answered_at);

INSERT OR REPLACE INTO schema_version (version, applied_at) VALUES (2, datetime('now'));
"#;

/// Get current schema version from database
pub fn get_current_version(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .or(Ok(0))
}

/// Apply pending migrations
pub fn apply_migrations(conn: &rusqlite::Connection) -> rusqlite::Result<u32> {
    let current_version = get_current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version > current_version {
            tracing::info!(
                "Applying migration v{}: {}",
                migration.version,
                migration.description
            );

            conn.execute_batch(migration.up)?;
            applied += 1;
        }
    }

    Ok(applied)
}
