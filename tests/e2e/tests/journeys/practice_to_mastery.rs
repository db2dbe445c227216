//! Journey: a patient practises a card from registration to mastery
//!
//! Every answer is persisted and logged; a reopened database resumes where
//! the session left off.

use apphasia_core::{CardStatus, PracticeSession, SessionError, SessionPhase};
use apphasia_e2e_tests::{PracticeScript, TestDatabaseManager};
use chrono::{DateTime, Duration, Utc};

#[test]
fn test_five_correct_answers_reach_mastery() {
    let db = TestDatabaseManager::new_temp();
    let (_, cards) = db.seed_personal_history("p1");
    let card = cards[1].clone();

    let run = PracticeScript::all_correct(&card, 5).run(&db.storage, card.clone(), Utc::now());

    assert_eq!(run.waits, vec![15, 30, 60, 120, 240]);
    assert!(run.session.is_mastered());

    let stored = db.storage.get_card(&card.id).unwrap().unwrap();
    assert_eq!(stored.state.baseline_index, 4);
    assert_eq!(stored.state.success_streak, 5);
    assert_eq!(stored.mastered_at, Some(run.finished_at));
    assert_eq!(db.storage.attempts_for_card(&card.id, 10).unwrap().len(), 5);

    let stats = db.storage.patient_stats("p1", run.finished_at).unwrap();
    assert_eq!(stats.mastered, 1);
    assert_eq!(stats.total_cards, 5);
}

#[test]
fn test_lapse_falls_back_to_confirmed_baseline() {
    let db = TestDatabaseManager::new_temp();
    let (_, cards) = db.seed_personal_history("p1");
    let card = cards[0].clone();

    let script = PracticeScript::new(["Ana", "ana", "Maria", "Ana", "Ana", "Ana"]);
    let run = script.run(&db.storage, card.clone(), Utc::now());

    // The miss after the 30s success re-runs 30s, then the climb resumes
    assert_eq!(run.waits, vec![15, 30, 30, 60, 120, 240]);
    assert!(run.session.is_mastered());

    let stored = db.storage.get_card(&card.id).unwrap().unwrap();
    assert_eq!(stored.state.lapses, 1);
    assert_eq!(stored.state.success_streak, 3);
    assert_eq!(stored.state.status, CardStatus::Learning);

    let attempts = db.storage.attempts_for_card(&card.id, 10).unwrap();
    assert_eq!(attempts.iter().filter(|a| !a.correct).count(), 1);
}

#[test]
fn test_session_resumes_after_reopen() {
    let db = TestDatabaseManager::new_temp();
    let (_, cards) = db.seed_personal_history("p1");
    let card = cards[2].clone();
    let start = Utc::now();

    let run = PracticeScript::all_correct(&card, 2).run(&db.storage, card.clone(), start);
    assert_eq!(run.waits, vec![15, 30]);

    let db = db.reopen();
    let reloaded = db.storage.get_card(&card.id).unwrap().unwrap();
    assert_eq!(reloaded.state, run.session.card().state);
    assert_eq!(reloaded.state.baseline_index, 1);
    assert_eq!(reloaded.state.interval_index, 2);

    // Picks up at 60s, not back at 15s
    let rest = PracticeScript::all_correct(&reloaded, 5).run(&db.storage, reloaded, run.finished_at);
    assert_eq!(rest.waits, vec![60, 120, 240]);
    assert!(rest.session.is_mastered());
}

#[test]
fn test_second_answer_rejected_while_waiting() {
    let db = TestDatabaseManager::new_temp();
    let (_, cards) = db.seed_personal_history("p1");
    let now = Utc::now();

    let mut session = PracticeSession::new(cards[3].clone(), now);
    session.submit_answer("coffee", now).unwrap();

    let err = session
        .submit_answer("coffee", now + Duration::seconds(3))
        .unwrap_err();
    assert_eq!(err, SessionError::TimerActive { seconds_left: 12 });
    assert_eq!(session.card().state.success_streak, 1);

    assert!(session.poll(now + Duration::seconds(15)).is_some());
    assert_eq!(session.phase(), SessionPhase::Question);
}

#[test]
fn test_mastered_card_leaves_due_list() {
    let db = TestDatabaseManager::new_temp();
    let (_, cards) = db.seed_personal_history("p1");
    let card = cards[4].clone();

    let run = PracticeScript::all_correct(&card, 5).run(&db.storage, card.clone(), Utc::now());
    let later = run.finished_at + Duration::days(1);

    let due = db.storage.due_cards("p1", later, 10).unwrap();
    assert_eq!(due.len(), 4);
    assert!(due.iter().all(|c| c.id != card.id));

    let resumed = PracticeSession::new(db.storage.get_card(&card.id).unwrap().unwrap(), later);
    assert!(resumed.is_mastered());
}

#[test]
fn test_reopen_mid_timer_keeps_the_wait() {
    let db = TestDatabaseManager::new_temp();
    let (_, cards) = db.seed_personal_history("p1");
    let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

    let mut session = PracticeSession::new(cards[1].clone(), now);
    session.submit_answer("toby", now).unwrap();
    db.storage.save_card(session.card()).unwrap();

    let db = db.reopen();
    let reloaded = db.storage.get_card(&cards[1].id).unwrap().unwrap();
    assert_eq!(reloaded.updated_at, now);

    let mut resumed = PracticeSession::new(reloaded, now + Duration::seconds(5));
    assert_eq!(
        resumed.phase(),
        SessionPhase::Timer {
            ends_at: now + Duration::seconds(15)
        }
    );
    let err = resumed
        .submit_answer("toby", now + Duration::seconds(5))
        .unwrap_err();
    assert_eq!(err, SessionError::TimerActive { seconds_left: 10 });

    assert!(resumed.poll(now + Duration::seconds(15)).is_some());
    assert_eq!(resumed.card().state.baseline_index, 0);
    assert_eq!(resumed.phase(), SessionPhase::Question);
}
