//! Journey: which card comes next
//!
//! Cards are presented soonest `next_due` first; new cards (`next_due` 0) come
//! before anything that has been answered.

use apphasia_core::{compute_next, consolidate_baseline};
use apphasia_e2e_tests::{PracticeScript, TestDatabaseManager};
use chrono::{Duration, Utc};

#[test]
fn test_new_cards_come_first() {
    let db = TestDatabaseManager::new_temp();
    let (_, cards) = db.seed_patient("p1", 3);
    let now = Utc::now();

    PracticeScript::all_correct(&cards[0], 1).run(&db.storage, cards[0].clone(), now);

    let ordered = db.storage.cards_for_patient("p1").unwrap();
    assert_eq!(ordered.len(), 3);
    assert_eq!(ordered[2].id, cards[0].id);
    assert!(ordered[..2].iter().all(|c| c.state.next_due == 0));
}

#[test]
fn test_due_cards_respect_timer() {
    let db = TestDatabaseManager::new_temp();
    let (_, cards) = db.seed_patient("p1", 2);
    let now = Utc::now();

    let answered = compute_next(&cards[0].state, false, now);
    db.storage.save_state(&cards[0].id, &answered).unwrap();

    let due_now = db.storage.due_cards("p1", now, 10).unwrap();
    assert_eq!(due_now.len(), 1);
    assert_eq!(due_now[0].id, cards[1].id);

    let due_later = db.storage.due_cards("p1", now + Duration::seconds(15), 10).unwrap();
    assert_eq!(due_later.len(), 2);
    assert_eq!(due_later[0].id, cards[1].id);

    let stats = db.storage.patient_stats("p1", now).unwrap();
    assert_eq!(stats.due_now, 1);
    assert_eq!(stats.relearning, 1);
    assert_eq!(stats.total_lapses, 1);
}

#[test]
fn test_longer_waits_sort_later() {
    let db = TestDatabaseManager::new_temp();
    let (_, cards) = db.seed_patient("p1", 2);
    let now = Utc::now();

    // First card confirmed at 15s then answered again (30s timer)
    let mut state = consolidate_baseline(&compute_next(&cards[0].state, true, now));
    state = compute_next(&state, true, now);
    db.storage.save_state(&cards[0].id, &state).unwrap();

    // Second card answered once (15s timer)
    let other = compute_next(&cards[1].state, true, now);
    db.storage.save_state(&cards[1].id, &other).unwrap();

    let ordered = db.storage.cards_for_patient("p1").unwrap();
    assert_eq!(ordered[0].id, cards[1].id);
    assert_eq!(ordered[1].id, cards[0].id);
    assert_eq!(ordered[1].state.current_interval, Some(30));
}

#[test]
fn test_due_limit() {
    let db = TestDatabaseManager::new_temp();
    db.seed_patient("p1", 6);

    let due = db.storage.due_cards("p1", Utc::now(), 4).unwrap();
    assert_eq!(due.len(), 4);
}

#[test]
fn test_patients_are_isolated() {
    let db = TestDatabaseManager::new_temp();
    db.seed_patient("p1", 2);
    db.seed_patient("p2", 3);

    assert_eq!(db.card_count("p1"), 2);
    assert_eq!(db.card_count("p2"), 3);
    assert!(db.storage.cards_for_patient("p3").unwrap().is_empty());
    assert_eq!(db.storage.list_patients().unwrap().len(), 2);
}
