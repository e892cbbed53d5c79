use std::sync::Arc;

use clap::Subcommand;
use coacher_core::{Clock, Config, Database, ReminderPlanner, StreakStore};

#[derive(Subcommand)]
pub enum RemindAction {
    /// Print the reminders that should be pending, as JSON
    Plan,
}

pub fn run(action: RemindAction, clock: Arc<dyn Clock>) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load_or_default();

    match action {
        RemindAction::Plan => {
            let planner = ReminderPlanner::new(config.reminders.schedule()?);
            let completion = db.journal_completion()?;
            let streak = db.load_streak()?;
            let plans = planner.plan(
                clock.now(),
                &completion,
                config.user_name(),
                streak.as_ref(),
            );
            println!("{}", serde_json::to_string_pretty(&plans)?);
        }
    }
    Ok(())
}
