//! Consecutive-day streak tracking and milestone celebrations.

pub mod engine;
pub mod milestone;
pub mod state;
pub mod store;

pub use engine::{SharedStreakEngine, StreakEngine, StreakSnapshot};
pub use milestone::{milestone_message, Achievement, Milestone};
pub use state::{ActivityOutcome, StreakState};
pub use store::{MemoryStreakStore, StreakStore};
