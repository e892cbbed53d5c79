use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use coacher_core::{Clock, FixedClock, SystemClock};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "coacher-cli", version, about = "Coacher CLI")]
struct Cli {
    /// Pretend the current local time is this (YYYY-MM-DD or YYYY-MM-DDTHH:MM)
    #[arg(long, global = true, value_parser = parse_now)]
    now: Option<NaiveDateTime>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Streak status and milestone celebrations
    Streak {
        #[command(subcommand)]
        action: commands::streak::StreakAction,
    },
    /// Complete journal flows (records streak activity)
    Journal {
        #[command(subcommand)]
        action: commands::journal::JournalAction,
    },
    /// AI token usage quota
    Usage {
        #[command(subcommand)]
        action: commands::usage::UsageAction,
    },
    /// Reminder planning
    Remind {
        #[command(subcommand)]
        action: commands::remind::RemindAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn parse_now(s: &str) -> Result<NaiveDateTime, String> {
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
        .map_err(|_| format!("invalid time '{s}', expected YYYY-MM-DD or YYYY-MM-DDTHH:MM"))
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("COACHER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let clock: Arc<dyn Clock> = match cli.now {
        Some(now) => Arc::new(FixedClock(now)),
        None => Arc::new(SystemClock),
    };

    let result = match cli.command {
        Commands::Streak { action } => commands::streak::run(action, clock),
        Commands::Journal { action } => commands::journal::run(action, clock),
        Commands::Usage { action } => commands::usage::run(action, clock),
        Commands::Remind { action } => commands::remind::run(action, clock),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
