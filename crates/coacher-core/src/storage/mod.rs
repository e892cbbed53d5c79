mod config;
pub mod database;

pub use config::{CelebrationsConfig, Config, ProfileConfig, RemindersConfig, UsageConfig};
pub use database::Database;

use std::path::PathBuf;

/// Returns `~/.config/coacher[-dev]/` based on COACHER_ENV.
///
/// Set COACHER_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("COACHER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("coacher-dev")
    } else {
        base_dir.join("coacher")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
