//! Apphasia end-to-end test support
//!
//! - `harness`: isolated on-disk databases
//! - `mocks`: patients, cards and scripted practice runs


pub use harness::TestDatabaseManager;
pub use mocks::{PracticeScript, ScriptRun, TestDataFactory};
