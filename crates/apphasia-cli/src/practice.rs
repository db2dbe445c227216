//! Interactive practice loop
//!
//! Prompt, read an answer, show feedback, wait out the timer, repeat until the
//! card is mastered or the patient quits. Every state change is written back
//! to storage and every answer is logged.

use std::io::{BufRead, Write};
use std::thread;
use std::time::Duration as StdDuration;

use anyhow::{Context, bail};
use apphasia_core::{
    PracticeSession, SessionPhase, SrCard, Storage, TimerOutcome, format_interval, preview,
};
use chrono::{DateTime, Utc};
use colored::Colorize;

/// Typed on its own line to leave the drill
pub const QUIT_COMMAND: &str = ":q";

/// How timers are waited out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Real one-second countdown
    Countdown,
    /// Treat every timer as already elapsed
    Skip,
}

/// How a drill ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrillEnd {
    Mastered,
    Quit,
}

/// Pick the card to practise: the requested one, or the patient's soonest unmastered card
pub fn select_card(
    storage: &Storage,
    patient_id: &str,
    card_id: Option<&str>,
) -> anyhow::Result<Option<SrCard>> {
    if let Some(id) = card_id {
        let card = storage
            .get_card(id)?
            .with_context(|| format!("Card not found: {}", id))?;
        if card.patient_id != patient_id {
            bail!("Card {} does not belong to patient {}", id, patient_id);
        }
        return Ok(Some(card));
    }

    Ok(storage
        .cards_for_patient(patient_id)?
        .into_iter()
        .find(|card| !card.is_mastered()))
}

/// Run one card until mastery or quit
pub fn run_drill<R: BufRead, W: Write>(
    storage: &Storage,
    card: SrCard,
    input: &mut R,
    out: &mut W,
    wait: WaitMode,
) -> anyhow::Result<DrillEnd> {
    let mut session = PracticeSession::new(card, Utc::now());
    if session.is_mastered() {
        writeln!(out, "{}", "This card is already mastered.".green())?;
        return Ok(DrillEnd::Mastered);
    }

    tracing::info!(card_id = %session.card().id, "Practice started");

    // Saved mid-wait: the last answer's timer must finish first
    if matches!(session.phase(), SessionPhase::Timer { .. }) {
        writeln!(
            out,
            "{}",
            "The last answer's wait is still running.".yellow()
        )?;
        if finish_timer(storage, &mut session, out, wait)? == Some(DrillEnd::Mastered) {
            return Ok(DrillEnd::Mastered);
        }
    }

    loop {
        let card = session.card();
        let next = preview(&card.state);
        writeln!(out)?;
        writeln!(out, "{}", card.stimulus.cyan().bold())?;
        writeln!(
            out,
            "{}",
            format!(
                "(correct -> {} wait, incorrect -> {} wait; {} to stop)",
                format_interval(next.on_correct_secs),
                format_interval(next.on_incorrect_secs),
                QUIT_COMMAND
            )
            .dimmed()
        )?;
        write!(out, "> ")?;
        out.flush()?;

        let mut line = String::new();
        let read = input.read_line(&mut line).context("Failed to read answer")?;
        if read == 0 || line.trim() == QUIT_COMMAND {
            session.abandon();
            storage.save_card(session.card())?;
            writeln!(out, "{}", "Practice stopped.".yellow())?;
            return Ok(DrillEnd::Quit);
        }

        let typed = line.trim_end_matches(['\r', '\n']);
        let outcome = session.submit_answer(typed, Utc::now())?;
        storage.record_attempt(&outcome.to_attempt(&session.card().id))?;
        storage.save_card(session.card())?;

        if outcome.correct {
            writeln!(out, "{}", "Correct!".green().bold())?;
        } else {
            writeln!(
                out,
                "{} The answer was: {}",
                "Not quite.".red().bold(),
                outcome.expected.white().bold()
            )?;
        }
        writeln!(
            out,
            "Wait {} before the next try.",
            format_interval(outcome.wait_secs)
        )?;

        if finish_timer(storage, &mut session, out, wait)? == Some(DrillEnd::Mastered) {
            return Ok(DrillEnd::Mastered);
        }
    }
}

/// Wait out the running timer, consolidate and persist
fn finish_timer<W: Write>(
    storage: &Storage,
    session: &mut PracticeSession,
    out: &mut W,
    wait: WaitMode,
) -> anyhow::Result<Option<DrillEnd>> {
    let elapsed_at = wait_out_timer(session, out, wait)?;
    let Some(timer) = session.poll(elapsed_at) else {
        bail!("Timer did not elapse");
    };
    storage.save_card(session.card())?;

    match timer {
        TimerOutcome::Mastered => {
            writeln!(out)?;
            writeln!(
                out,
                "{}",
                "Mastered! The answer held for the longest wait.".green().bold()
            )?;
            Ok(Some(DrillEnd::Mastered))
        }
        TimerOutcome::Continue { .. } => Ok(None),
    }
}

/// Block until the running timer ends; returns the instant to poll with
fn wait_out_timer<W: Write>(
    session: &PracticeSession,
    out: &mut W,
    wait: WaitMode,
) -> anyhow::Result<DateTime<Utc>> {
    let SessionPhase::Timer { ends_at } = session.phase() else {
        return Ok(Utc::now());
    };

    if wait == WaitMode::Skip {
        return Ok(ends_at);
    }

    loop {
        let now = Utc::now();
        let left = session.seconds_left(now);
        if left == 0 {
            writeln!(out, "\r{:<12}", "")?;
            return Ok(now);
        }
        write!(out, "\r  {:>4}s ", left)?;
        out.flush()?;
        thread::sleep(StdDuration::from_secs(1));
    }
}
