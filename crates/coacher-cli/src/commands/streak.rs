use std::sync::Arc;

use clap::Subcommand;
use coacher_core::{Achievement, Clock, Config, Database, Milestone, StreakEngine};
use serde::Serialize;

pub type Engine<'a> = StreakEngine<&'a Database, Arc<dyn Clock>>;

#[derive(Subcommand)]
pub enum StreakAction {
    /// Print the current streak as JSON
    Status,
    /// Record activity for today
    Record,
    /// Show any pending milestone celebration and mark it shown
    Celebrate,
    /// List earned achievements
    Achievements,
    /// Clear the current streak (the longest streak is kept)
    Reset,
}

/// A milestone celebration ready for display.
#[derive(Debug, Serialize)]
pub struct Celebration {
    pub streak: u32,
    pub level: Milestone,
    pub message: String,
    pub achievement: Achievement,
    pub animate: bool,
}

/// Present the pending milestone, if any, and acknowledge it.
pub fn celebrate(
    engine: &mut Engine<'_>,
    db: &Database,
    config: &Config,
    clock: &dyn Clock,
) -> Result<Option<Celebration>, Box<dyn std::error::Error>> {
    let Some(level) = engine.take_pending_celebration()? else {
        return Ok(None);
    };

    let message = engine.milestone_message(level, config.user_name(), &mut rand::thread_rng());
    let achievement = Achievement::streak(level.days(), clock.today());
    db.record_achievement(&achievement)?;

    Ok(Some(Celebration {
        streak: engine.current_streak(),
        level,
        message,
        achievement,
        animate: config.celebrations.show_animations,
    }))
}

pub fn run(action: StreakAction, clock: Arc<dyn Clock>) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut engine: Engine<'_> = StreakEngine::load(&db, Arc::clone(&clock))?;

    match action {
        StreakAction::Status => {
            println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
        }
        StreakAction::Record => {
            let outcome = engine.record_activity_today()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "outcome": outcome,
                    "streak": engine.snapshot(),
                }))?
            );
        }
        StreakAction::Celebrate => {
            let config = Config::load_or_default();
            match celebrate(&mut engine, &db, &config, clock.as_ref())? {
                Some(celebration) => println!("{}", serde_json::to_string_pretty(&celebration)?),
                None => println!("null"),
            }
        }
        StreakAction::Achievements => {
            println!("{}", serde_json::to_string_pretty(&db.achievements()?)?);
        }
        StreakAction::Reset => {
            engine.reset()?;
            println!("streak reset");
        }
    }
    Ok(())
}
