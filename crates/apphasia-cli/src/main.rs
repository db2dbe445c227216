//! Apphasia CLI
//!
//! Terminal front end for spaced-retrieval practice: patients drill their
//! cards, therapists review and correct them.

mod practice;

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use apphasia_core::{CardEdit, CardStatus, NewCard, SrCard, Storage, format_interval, interval_secs};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::practice::{DrillEnd, WaitMode};

/// Apphasia - Spaced-retrieval practice for aphasia therapy
#[derive(Parser)]
#[command(name = "apphasia")]
#[command(author = "Apphasia Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Spaced-retrieval practice for aphasia therapy")]
#[command(long_about = "Apphasia drills personal word-finding prompts on a fixed ladder of waits (15s, 30s, 60s, 120s, 240s).\n\nA correct answer that survives the 240s wait marks the card as mastered.")]
struct Cli {
    /// Directory holding the database (defaults to the platform data directory)
    #[arg(long, global = true, env = "APPHASIA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a patient, optionally with a JSON file of cards
    Register {
        /// Patient identifier
        patient_id: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// JSON array of {stimulus, answer, category?}
        #[arg(long)]
        cards: Option<PathBuf>,
    },

    /// Add cards to an existing patient from a JSON file
    Import {
        /// Patient identifier
        patient_id: String,
        /// JSON array of {stimulus, answer, category?}
        file: PathBuf,
    },

    /// List a patient's cards, soonest due first
    Cards {
        /// Patient identifier
        patient_id: String,
    },

    /// List cards due now
    Due {
        /// Patient identifier
        patient_id: String,
        /// Maximum number of cards
        #[arg(long, default_value = "20")]
        limit: i32,
    },

    /// Practise a card until mastered or stopped
    Practice {
        /// Patient identifier
        patient_id: String,
        /// Card to practise (defaults to the soonest unmastered card)
        #[arg(long)]
        card: Option<String>,
        /// Do not wait out timers
        #[arg(long)]
        no_wait: bool,
    },

    /// List cards for therapist review, unreviewed first
    Review {
        /// Only cards with this review flag
        #[arg(long)]
        reviewed: Option<bool>,
    },

    /// Correct a card's prompt or answer, or set its review flag
    Edit {
        /// Card identifier
        card_id: String,
        #[arg(long)]
        stimulus: Option<String>,
        #[arg(long)]
        answer: Option<String>,
        #[arg(long)]
        reviewed: Option<bool>,
    },

    /// Show recent answers for a card
    History {
        /// Card identifier
        card_id: String,
        /// Maximum number of answers
        #[arg(long, default_value = "20")]
        limit: i32,
    },

    /// Delete a card and its answers
    Delete {
        /// Card identifier
        card_id: String,
    },

    /// Show a patient's progress
    Stats {
        /// Patient identifier
        patient_id: String,
    },

    /// Export a patient's cards as JSON
    Export {
        /// Patient identifier
        patient_id: String,
        /// Output file path
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout belongs to the drill
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    let storage = open_storage(cli.data_dir.as_deref())?;

    match cli.command {
        Commands::Register {
            patient_id,
            name,
            cards,
        } => run_register(&storage, &patient_id, &name, cards),
        Commands::Import { patient_id, file } => run_import(&storage, &patient_id, &file),
        Commands::Cards { patient_id } => run_cards(&storage, &patient_id),
        Commands::Due { patient_id, limit } => run_due(&storage, &patient_id, limit),
        Commands::Practice {
            patient_id,
            card,
            no_wait,
        } => run_practice(&storage, &patient_id, card.as_deref(), no_wait),
        Commands::Review { reviewed } => run_review(&storage, reviewed),
        Commands::Edit {
            card_id,
            stimulus,
            answer,
            reviewed,
        } => run_edit(
            &storage,
            &card_id,
            CardEdit {
                stimulus,
                answer,
                reviewed,
            },
        ),
        Commands::History { card_id, limit } => run_history(&storage, &card_id, limit),
        Commands::Delete { card_id } => run_delete(&storage, &card_id),
        Commands::Stats { patient_id } => run_stats(&storage, &patient_id),
        Commands::Export { patient_id, output } => run_export(&storage, &patient_id, &output),
    }
}

/// Open storage in `data_dir`, or the platform default
fn open_storage(data_dir: Option<&Path>) -> anyhow::Result<Storage> {
    let db_path = data_dir.map(|dir| dir.join("apphasia.db"));
    let storage = Storage::new(db_path).context("Failed to open the card database")?;
    tracing::debug!(path = %storage.path().display(), "Storage ready");
    Ok(storage)
}

fn read_cards_file(path: &Path) -> anyhow::Result<Vec<NewCard>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid card file {}", path.display()))
}

/// Run register command
fn run_register(
    storage: &Storage,
    patient_id: &str,
    name: &str,
    cards: Option<PathBuf>,
) -> anyhow::Result<()> {
    let inputs = match cards {
        Some(path) => read_cards_file(&path)?,
        None => Vec::new(),
    };

    let (patient, created) = storage.register_patient(patient_id, name, inputs)?;

    println!("{}", "=== Patient Registered ===".cyan().bold());
    println!("{}: {}", "ID".white().bold(), patient.id);
    println!("{}: {}", "Name".white().bold(), patient.name);
    println!("{}: {}", "Cards Added".white().bold(), created.len());
    Ok(())
}

/// Run import command
fn run_import(storage: &Storage, patient_id: &str, file: &Path) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let created = storage.import_cards(patient_id, &json)?;

    println!(
        "{}",
        format!("Imported {} card(s) for {}", created.len(), patient_id).green()
    );
    Ok(())
}

/// Human-readable due time
fn describe_due(card: &SrCard, now: DateTime<Utc>) -> String {
    if card.is_mastered() {
        return "mastered".to_string();
    }
    match card.state.next_due_at() {
        Some(due) if due > now => {
            let secs = (due - now).num_seconds().clamp(0, i64::from(u32::MAX)) as u32;
            format!("in {}", format_interval(secs))
        }
        _ => "now".to_string(),
    }
}

fn print_card_row(card: &SrCard, now: DateTime<Utc>) {
    let status = if card.is_mastered() {
        "mastered".green()
    } else if card.state.status == CardStatus::Relearning {
        "relearning".red()
    } else {
        "learning".yellow()
    };

    println!("{} {}", card.id.dimmed(), card.stimulus.white().bold());
    println!(
        "    answer: {}  status: {}  next wait: {}  due: {}  lapses: {}",
        card.answer,
        status,
        format_interval(interval_secs(card.state.interval_index)),
        describe_due(card, now),
        card.state.lapses
    );
}

/// Run cards command
fn run_cards(storage: &Storage, patient_id: &str) -> anyhow::Result<()> {
    let cards = storage.cards_for_patient(patient_id)?;
    let now = Utc::now();

    println!("{}", format!("=== Cards for {} ===", patient_id).cyan().bold());
    if cards.is_empty() {
        println!("{}", "No cards found.".dimmed());
        return Ok(());
    }
    for card in &cards {
        print_card_row(card, now);
    }
    Ok(())
}

/// Run due command
fn run_due(storage: &Storage, patient_id: &str, limit: i32) -> anyhow::Result<()> {
    let now = Utc::now();
    let cards = storage.due_cards(patient_id, now, limit)?;

    println!("{}", format!("=== Due for {} ===", patient_id).cyan().bold());
    if cards.is_empty() {
        println!("{}", "Nothing due right now.".dimmed());
        return Ok(());
    }
    for card in &cards {
        print_card_row(card, now);
    }
    Ok(())
}

/// Run practice command
fn run_practice(
    storage: &Storage,
    patient_id: &str,
    card_id: Option<&str>,
    no_wait: bool,
) -> anyhow::Result<()> {
    let Some(card) = practice::select_card(storage, patient_id, card_id)? else {
        println!("{}", "Every card is mastered. Well done!".green().bold());
        return Ok(());
    };

    let wait = if no_wait {
        WaitMode::Skip
    } else {
        WaitMode::Countdown
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();

    match practice::run_drill(storage, card, &mut input, &mut out, wait)? {
        DrillEnd::Mastered => tracing::info!(patient_id, "Drill finished with mastery"),
        DrillEnd::Quit => tracing::info!(patient_id, "Drill stopped"),
    }
    Ok(())
}

/// Run review command
fn run_review(storage: &Storage, reviewed: Option<bool>) -> anyhow::Result<()> {
    let cards = storage.cards_for_review(reviewed)?;

    println!("{}", "=== Therapist Review ===".cyan().bold());
    if cards.is_empty() {
        println!("{}", "No cards found.".dimmed());
        return Ok(());
    }

    for card in &cards {
        let flag = if card.reviewed {
            "reviewed".green()
        } else {
            "pending".yellow()
        };
        println!(
            "[{}] {} {}",
            flag,
            card.patient_id.dimmed(),
            card.id.dimmed()
        );
        println!("    Q: {}", card.stimulus);
        println!("    A: {}", card.answer);
        if let Some(category) = &card.category {
            println!("    {}", category.dimmed());
        }
    }
    Ok(())
}

/// Run edit command
fn run_edit(storage: &Storage, card_id: &str, edit: CardEdit) -> anyhow::Result<()> {
    if edit.is_empty() {
        println!("{}", "Nothing to change.".dimmed());
        return Ok(());
    }

    let card = storage.edit_card(card_id, &edit)?;
    println!("{}", "Card updated.".green());
    println!("    Q: {}", card.stimulus);
    println!("    A: {}", card.answer);
    println!("    reviewed: {}", card.reviewed);
    Ok(())
}

/// Run history command
fn run_history(storage: &Storage, card_id: &str, limit: i32) -> anyhow::Result<()> {
    let attempts = storage.attempts_for_card(card_id, limit)?;

    println!("{}", "=== Answer History ===".cyan().bold());
    if attempts.is_empty() {
        println!("{}", "No answers yet.".dimmed());
        return Ok(());
    }
    for attempt in &attempts {
        let mark = if attempt.correct { "+".green() } else { "x".red() };
        println!(
            "  {} {}  {:>5}  {}",
            mark,
            attempt.answered_at.format("%Y-%m-%d %H:%M:%S"),
            format_interval(interval_secs(attempt.timer_index)),
            attempt.response
        );
    }
    Ok(())
}

/// Run delete command
fn run_delete(storage: &Storage, card_id: &str) -> anyhow::Result<()> {
    if storage.delete_card(card_id)? {
        println!("{}", format!("Deleted card {}", card_id).green());
    } else {
        println!("{}", format!("Card not found: {}", card_id).yellow());
    }
    Ok(())
}

/// Run stats command
fn run_stats(storage: &Storage, patient_id: &str) -> anyhow::Result<()> {
    let patient = storage
        .get_patient(patient_id)?
        .with_context(|| format!("Patient not found: {}", patient_id))?;
    let stats = storage.patient_stats(patient_id, Utc::now())?;

    println!("{}", format!("=== Progress for {} ===", patient.name).cyan().bold());
    println!();
    println!("{}: {}", "Total Cards".white().bold(), stats.total_cards);
    println!("{}: {}", "Due Now".white().bold(), stats.due_now);
    println!("{}: {}", "Total Lapses".white().bold(), stats.total_lapses);
    println!("{}: {}", "Awaiting Review".white().bold(), stats.unreviewed);

    let total = stats.total_cards.max(0) as usize;
    if total > 0 {
        println!();
        println!("{}", "=== Card Distribution ===".yellow().bold());
        print_distribution_bar("Mastered", stats.mastered.max(0) as usize, total, "green");
        print_distribution_bar("Learning", stats.learning.max(0) as usize, total, "yellow");
        print_distribution_bar("Relearning", stats.relearning.max(0) as usize, total, "red");
    }
    Ok(())
}

/// Print a distribution bar
fn print_distribution_bar(label: &str, count: usize, total: usize, color: &str) {
    let percentage = if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    };

    let bar_width: usize = 30;
    let filled = ((percentage / 100.0) * bar_width as f64) as usize;
    let empty = bar_width.saturating_sub(filled);

    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(empty));
    let colored_bar = match color {
        "green" => bar.green(),
        "yellow" => bar.yellow(),
        "red" => bar.red(),
        _ => bar.white(),
    };

    println!(
        "  {:12} [{:30}] {:>4} ({:>5.1}%)",
        label, colored_bar, count, percentage
    );
}

/// Run export command
fn run_export(storage: &Storage, patient_id: &str, output: &Path) -> anyhow::Result<()> {
    let json = storage.export_cards(patient_id)?;

    let file = std::fs::File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(json.as_bytes())?;
    writer.flush()?;

    println!(
        "{}",
        format!("Exported cards for {} to {}", patient_id, output.display()).green()
    );
    Ok(())
}
