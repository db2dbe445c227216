//! Journey: a therapist checks generated cards before practice
//!
//! Unreviewed cards are listed first; corrections are trimmed and never touch
//! the card's practice progress.

use apphasia_core::CardEdit;
use apphasia_e2e_tests::{PracticeScript, TestDatabaseManager};
use chrono::Utc;

#[test]
fn test_review_queue_lists_unreviewed_first() {
    let db = TestDatabaseManager::new_temp();
    let (_, cards) = db.seed_personal_history("p1");

    db.storage
        .edit_card(
            &cards[0].id,
            &CardEdit {
                reviewed: Some(true),
                ..Default::default()
            },
        )
        .unwrap();

    let queue = db.storage.cards_for_review(None).unwrap();
    assert_eq!(queue.len(), 5);
    assert!(queue[..4].iter().all(|c| !c.reviewed));
    assert!(queue[4].reviewed);

    assert_eq!(db.storage.cards_for_review(Some(true)).unwrap().len(), 1);
    assert_eq!(db.storage.cards_for_review(Some(false)).unwrap().len(), 4);
}

#[test]
fn test_correction_keeps_progress() {
    let db = TestDatabaseManager::new_temp();
    let (_, cards) = db.seed_personal_history("p1");
    let card = cards[3].clone();

    let run = PracticeScript::all_correct(&card, 2).run(&db.storage, card.clone(), Utc::now());

    let edited = db
        .storage
        .edit_card(
            &card.id,
            &CardEdit {
                stimulus: Some("  What do you drink at breakfast? ".to_string()),
                answer: Some(" Tea ".to_string()),
                reviewed: Some(true),
            },
        )
        .unwrap();

    assert_eq!(edited.stimulus, "What do you drink at breakfast?");
    assert_eq!(edited.answer, "Tea");
    assert!(edited.reviewed);
    assert_eq!(edited.state, run.session.card().state);

    // The corrected answer is the one that now matches
    let next = PracticeScript::new(["tea"]).run(&db.storage, edited, run.finished_at);
    assert!(next.session.card().state.last_answer_correct.unwrap());
}

#[test]
fn test_empty_edit_is_a_no_op() {
    let db = TestDatabaseManager::new_temp();
    let (_, cards) = db.seed_personal_history("p1");

    let unchanged = db
        .storage
        .edit_card(&cards[0].id, &CardEdit::default())
        .unwrap();
    assert_eq!(unchanged.stimulus, cards[0].stimulus);
    assert_eq!(unchanged.updated_at, cards[0].updated_at);
}

#[test]
fn test_unreviewed_count_in_stats() {
    let db = TestDatabaseManager::new_temp();
    let (_, cards) = db.seed_personal_history("p1");

    for card in &cards[..2] {
        db.storage
            .edit_card(
                &card.id,
                &CardEdit {
                    reviewed: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
    }

    let stats = db.storage.patient_stats("p1", Utc::now()).unwrap();
    assert_eq!(stats.unreviewed, 3);
}

#[test]
fn test_deleting_a_bad_card() {
    let db = TestDatabaseManager::new_temp();
    let (_, cards) = db.seed_personal_history("p1");

    assert!(db.storage.delete_card(&cards[0].id).unwrap());
    assert_eq!(db.card_count("p1"), 4);
    assert_eq!(db.storage.cards_for_review(None).unwrap().len(), 4);
}
