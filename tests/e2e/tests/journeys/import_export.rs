//! Journey: cards move in from a generator and out as JSON

use apphasia_core::{SrCard, SrState, StorageError};
use apphasia_e2e_tests::{PracticeScript, TestDataFactory, TestDatabaseManager};
use chrono::Utc;

#[test]
fn test_generated_cards_import_initialized() {
    let db = TestDatabaseManager::new_temp();
    db.seed_patient("p1", 0);

    let created = db
        .storage
        .import_cards("p1", &TestDataFactory::cards_json(3))
        .unwrap();

    assert_eq!(created.len(), 3);
    assert!(created.iter().all(|c| c.state == SrState::new()));
    assert!(created.iter().all(|c| !c.reviewed));
    assert_eq!(db.card_count("p1"), 3);
}

#[test]
fn test_import_for_unknown_patient_fails() {
    let db = TestDatabaseManager::new_temp();

    let err = db
        .storage
        .import_cards("ghost", &TestDataFactory::cards_json(1))
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}

#[test]
fn test_export_carries_full_state() {
    let db = TestDatabaseManager::new_temp();
    let (_, cards) = db.seed_personal_history("p1");
    let card = cards[0].clone();

    let run = PracticeScript::new(["Ana", "Pedro"]).run(&db.storage, card.clone(), Utc::now());

    let json = db.storage.export_cards("p1").unwrap();
    let exported: Vec<SrCard> = serde_json::from_str(&json).unwrap();
    assert_eq!(exported.len(), 5);

    let practised = exported.iter().find(|c| c.id == card.id).unwrap();
    assert_eq!(practised.state, run.session.card().state);
    assert_eq!(practised.state.lapses, 1);

    // Flat records: engine fields sit beside the card fields
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let first = &value.as_array().unwrap()[0];
    assert!(first.get("baseline_index").is_some());
    assert!(first.get("stimulus").is_some());
    assert!(first.get("state").is_none());
}

#[test]
fn test_export_feeds_import_for_another_patient() {
    let db = TestDatabaseManager::new_temp();
    db.seed_personal_history("p1");
    db.seed_patient("p2", 0);

    let json = db.storage.export_cards("p1").unwrap();
    let copied = db.storage.import_cards("p2", &json).unwrap();

    assert_eq!(copied.len(), 5);
    assert!(copied.iter().all(|c| c.patient_id == "p2"));
    assert!(copied.iter().all(|c| c.state == SrState::new()));
}
