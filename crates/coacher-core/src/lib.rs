//! # Coacher Core Library
//!
//! This library provides the core logic for the Coacher habit coaching app.
//! Every operation is available through the `coacher-cli` binary; graphical
//! front ends are expected to be thin layers over the same library.
//!
//! ## Architecture
//!
//! - **Streak Engine**: consecutive-day streak, longest streak, and
//!   milestone celebration state, persisted after every change
//! - **Usage Tracker**: monthly AI token quota with calendar-month reset
//! - **Reminder Planner**: decides when evening-prep and morning-focus
//!   reminders should next fire
//! - **Storage**: SQLite state storage and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`StreakEngine`]: streak state owner
//! - [`UsageTracker`]: token quota
//! - [`ReminderPlanner`]: reminder trigger contract
//! - [`Database`]: persistence collaborator
//! - [`Config`]: application configuration management

pub mod clock;
pub mod error;
pub mod reminder;
pub mod storage;
pub mod streak;
pub mod usage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, StoreError};
pub use reminder::{JournalCompletion, ReminderKind, ReminderPlan, ReminderPlanner, ReminderSchedule};
pub use storage::{Config, Database};
pub use streak::{
    milestone_message, Achievement, ActivityOutcome, MemoryStreakStore, Milestone,
    SharedStreakEngine, StreakEngine, StreakSnapshot, StreakState, StreakStore,
};
pub use usage::{MemoryUsageStore, UsageLimits, UsageReport, UsageState, UsageStore, UsageTracker};
