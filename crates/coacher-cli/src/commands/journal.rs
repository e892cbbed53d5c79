use std::sync::Arc;

use clap::{Subcommand, ValueEnum};
use coacher_core::{Clock, Config, Database, ReminderKind, StreakEngine};
use serde::Serialize;

use super::streak::{celebrate, Engine};

#[derive(Debug, Clone, Copy, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalFlow {
    /// Morning intention-setting
    MorningFocus,
    /// Evening prep for tomorrow
    EveningPrep,
    /// End-of-day check-in
    CheckIn,
    /// Craving note
    Craving,
    /// Success note
    Success,
}

impl JournalFlow {
    /// The reminder this flow silences for the day.
    fn reminder(self) -> Option<ReminderKind> {
        match self {
            JournalFlow::MorningFocus => Some(ReminderKind::MorningFocus),
            JournalFlow::EveningPrep => Some(ReminderKind::EveningPrep),
            JournalFlow::CheckIn | JournalFlow::Craving | JournalFlow::Success => None,
        }
    }
}

#[derive(Subcommand)]
pub enum JournalAction {
    /// Mark a journal flow complete for today
    Complete {
        #[arg(value_enum)]
        flow: JournalFlow,
    },
    /// Show which gated flows were completed and when
    Status,
}

pub fn run(action: JournalAction, clock: Arc<dyn Clock>) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        JournalAction::Complete { flow } => {
            let today = clock.today();
            let mut engine: Engine<'_> = StreakEngine::load(&db, Arc::clone(&clock))?;
            let outcome = engine.record_activity(today)?;

            if let Some(kind) = flow.reminder() {
                let mut completion = db.journal_completion()?;
                completion.mark(kind, today);
                db.save_journal_completion(&completion)?;
            }

            let config = Config::load_or_default();
            let celebration = celebrate(&mut engine, &db, &config, clock.as_ref())?;
            tracing::debug!(?flow, ?outcome, "journal flow completed");

            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "flow": flow,
                    "outcome": outcome,
                    "streak": engine.snapshot(),
                    "celebration": celebration,
                }))?
            );
        }
        JournalAction::Status => {
            println!("{}", serde_json::to_string_pretty(&db.journal_completion()?)?);
        }
    }
    Ok(())
}
