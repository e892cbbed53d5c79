use std::sync::Arc;

use clap::Subcommand;
use coacher_core::{Clock, Config, Database, UsageTracker};

#[derive(Subcommand)]
pub enum UsageAction {
    /// Print this month's usage as JSON
    Show,
    /// Record the tokens of one exchange
    Record {
        /// Prompt tokens
        #[arg(long)]
        input: u64,
        /// Completion tokens
        #[arg(long)]
        output: u64,
    },
    /// Check whether a request of this size fits the quota (exit 2 if not)
    Check {
        #[arg(long, default_value = "0")]
        tokens: u64,
    },
    /// Acknowledge the low-quota warning for this month
    AckWarning,
    /// Overwrite the counter
    Set { tokens: u64 },
    /// Zero the counter
    Reset,
}

pub fn run(action: UsageAction, clock: Arc<dyn Clock>) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let limits = Config::load_or_default().usage.limits();
    let mut tracker = UsageTracker::load(&db, clock, limits)?;

    match action {
        UsageAction::Show => {
            println!("{}", serde_json::to_string_pretty(&tracker.report()?)?);
        }
        UsageAction::Record { input, output } => {
            let total = tracker.record_usage(input, output)?;
            println!("{total}/{}", limits.monthly_limit);
        }
        UsageAction::Check { tokens } => {
            if tracker.can_make_request(tokens)? {
                println!("ok");
            } else {
                println!("over quota; renews {}", tracker.renewal_date()?);
                std::process::exit(2);
            }
        }
        UsageAction::AckWarning => {
            tracker.mark_warning_shown()?;
            println!("ok");
        }
        UsageAction::Set { tokens } => {
            tracker.set_usage(tokens)?;
            println!("ok");
        }
        UsageAction::Reset => {
            tracker.reset_usage()?;
            println!("usage reset");
        }
    }
    Ok(())
}
