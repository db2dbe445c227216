//! Test Database Manager
//!
//! Provides isolated database instances for testing:
//! - Temporary databases that are automatically cleaned up
//! - Pre-seeded patients with fresh cards
//! - Reopening the same file to check what survives a restart

use apphasia_core::{Patient, SrCard, Storage};
use chrono::Utc;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::mocks::TestDataFactory;

/// Manager for test databases
///
/// Creates isolated database instances for each test to prevent interference.
/// Automatically cleans up temporary databases when dropped.
///
/// # Example
///
/// ```rust,ignore
/// let db = TestDatabaseManager::new_temp();
/// let (patient, cards) = db.seed_patient("p1", 3);
///
/// // Database is automatically deleted when `db` goes out of scope
/// ```
pub struct TestDatabaseManager {
    /// The storage instance
    pub storage: Storage,
    /// Temporary directory (kept alive to prevent premature deletion)
    _temp_dir: TempDir,
    /// Path to the database file
    db_path: PathBuf,
}

impl TestDatabaseManager {
    /// Create a new test database in a temporary directory
    ///
    /// The database is automatically deleted when the manager is dropped.
    pub fn new_temp() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test_apphasia.db");

        let storage = Storage::new(Some(db_path.clone())).expect("Failed to create test storage");

        Self {
            storage,
            _temp_dir: temp_dir,
            db_path,
        }
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Close and reopen the same database file
    pub fn reopen(self) -> Self {
        let Self {
            storage,
            _temp_dir,
            db_path,
        } = self;
        drop(storage);

        let storage = Storage::new(Some(db_path.clone())).expect("Failed to reopen test storage");
        Self {
            storage,
            _temp_dir,
            db_path,
        }
    }

    /// Check if the database has no patients
    pub fn is_empty(&self) -> bool {
        self.storage
            .list_patients()
            .map(|p| p.is_empty())
            .unwrap_or(true)
    }

    /// Number of cards a patient has
    pub fn card_count(&self, patient_id: &str) -> i64 {
        self.storage
            .patient_stats(patient_id, Utc::now())
            .map(|s| s.total_cards)
            .unwrap_or(0)
    }

    // ========================================================================
    // SEEDING METHODS
    // ========================================================================

    /// Register a patient with `count` generated cards
    pub fn seed_patient(&self, patient_id: &str, count: usize) -> (Patient, Vec<SrCard>) {
        self.storage
            .register_patient(patient_id, "Test Patient", TestDataFactory::new_cards(count))
            .expect("Failed to seed patient")
    }

    /// Register a patient with the personal-history card set
    pub fn seed_personal_history(&self, patient_id: &str) -> (Patient, Vec<SrCard>) {
        self.storage
            .register_patient(patient_id, "Ana", TestDataFactory::personal_history())
            .expect("Failed to seed patient")
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_database_starts_empty() {
        let db = TestDatabaseManager::new_temp();
        assert!(db.is_empty());
        assert!(db.path().exists());
    }

    #[test]
    fn test_seed_and_reopen() {
        let db = TestDatabaseManager::new_temp();
        db.seed_patient("p1", 4);
        assert_eq!(db.card_count("p1"), 4);

        let db = db.reopen();
        assert_eq!(db.card_count("p1"), 4);
        assert!(!db.is_empty());
    }
}
