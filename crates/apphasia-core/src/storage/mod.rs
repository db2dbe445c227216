//! Storage Module
//!
//! SQLite-based storage layer with:
//! - Patients and their spaced-retrieval cards
//! - Full engine state per card (reloads reproduce engine outputs)
//! - Due-card queries ordered soonest first
//! - Therapist review flags and an answer log

mod migrations;
mod sqlite;

pub use migrations::MIGRATIONS;
pub use sqlite::{Result, Storage, StorageError};
