pub mod config;
pub mod journal;
pub mod remind;
pub mod streak;
pub mod usage;
