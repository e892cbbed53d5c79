//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Display name used in celebrations and reminders
//! - Reminder toggles and times
//! - AI token quota parameters
//! - Celebration animation toggle
//!
//! Configuration is stored at `~/.config/coacher/config.toml`.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, CoreError};
use crate::reminder::ReminderSchedule;
use crate::usage::UsageLimits;

const TIME_FORMAT: &str = "%H:%M";

/// Profile configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Empty means the user skipped giving a name.
    #[serde(default)]
    pub user_name: String,
}

/// Reminder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemindersConfig {
    #[serde(default = "default_true")]
    pub evening_prep_enabled: bool,
    /// Local time as `HH:MM`
    #[serde(default = "default_evening_prep_time")]
    pub evening_prep_time: String,
    #[serde(default = "default_true")]
    pub morning_focus_enabled: bool,
    #[serde(default = "default_morning_focus_time")]
    pub morning_focus_time: String,
}

/// AI token quota configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    #[serde(default = "default_monthly_limit")]
    pub monthly_limit: u64,
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: f64,
}

/// Celebration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CelebrationsConfig {
    #[serde(default = "default_true")]
    pub show_animations: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/coacher/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub reminders: RemindersConfig,
    #[serde(default)]
    pub usage: UsageConfig,
    #[serde(default)]
    pub celebrations: CelebrationsConfig,
}

fn default_true() -> bool {
    true
}
fn default_evening_prep_time() -> String {
    "21:00".into()
}
fn default_morning_focus_time() -> String {
    "08:00".into()
}
fn default_monthly_limit() -> u64 {
    UsageLimits::default().monthly_limit
}
fn default_warning_threshold() -> f64 {
    UsageLimits::default().warning_threshold
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            evening_prep_enabled: true,
            evening_prep_time: default_evening_prep_time(),
            morning_focus_enabled: true,
            morning_focus_time: default_morning_focus_time(),
        }
    }
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            monthly_limit: default_monthly_limit(),
            warning_threshold: default_warning_threshold(),
        }
    }
}

impl Default for CelebrationsConfig {
    fn default() -> Self {
        Self {
            show_animations: true,
        }
    }
}

fn parse_time(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected HH:MM, got '{value}' ({e})"),
    })
}

impl RemindersConfig {
    /// Parsed schedule; disabled reminders are `None`.
    pub fn schedule(&self) -> Result<ReminderSchedule, ConfigError> {
        let evening = parse_time("reminders.evening_prep_time", &self.evening_prep_time)?;
        let morning = parse_time("reminders.morning_focus_time", &self.morning_focus_time)?;
        Ok(ReminderSchedule {
            evening_prep: self.evening_prep_enabled.then_some(evening),
            morning_focus: self.morning_focus_enabled.then_some(morning),
        })
    }
}

impl UsageConfig {
    pub fn limits(&self) -> UsageLimits {
        UsageLimits {
            monthly_limit: self.monthly_limit,
            warning_threshold: self.warning_threshold,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(format!("cannot parse '{value}' as bool: {e}")))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("not a leaf value".into()));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, CoreError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, CoreError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), CoreError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), CoreError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Check values serde can't.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reminders.schedule()?;
        if !(0.0..=1.0).contains(&self.usage.warning_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "usage.warning_threshold".into(),
                message: format!("{} is outside 0.0-1.0", self.usage.warning_threshold),
            });
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key without saving.
    ///
    /// The config is left untouched if the key is unknown or the new value
    /// fails validation.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Display name, if one was given.
    pub fn user_name(&self) -> Option<&str> {
        let name = self.profile.user_name.trim();
        (!name.is_empty()).then_some(name)
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default config");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert!(parsed.reminders.evening_prep_enabled);
        assert_eq!(parsed.usage.monthly_limit, 100_000);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[profile]\nuser_name = \"Ana\"\n").unwrap();
        assert_eq!(parsed.user_name(), Some("Ana"));
        assert_eq!(parsed.reminders.morning_focus_time, "08:00");
        assert!(parsed.celebrations.show_animations);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("reminders.evening_prep_time").as_deref(), Some("21:00"));
        assert_eq!(cfg.get("usage.monthly_limit").as_deref(), Some("100000"));
        assert!(cfg.get("reminders.missing_key").is_none());
    }

    #[test]
    fn set_updates_values() {
        let mut cfg = Config::default();
        cfg.set("profile.user_name", "Sam").unwrap();
        cfg.set("usage.warning_threshold", "0.9").unwrap();
        cfg.set("celebrations.show_animations", "false").unwrap();
        assert_eq!(cfg.user_name(), Some("Sam"));
        assert_eq!(cfg.usage.warning_threshold, 0.9);
        assert!(!cfg.celebrations.show_animations);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.set("reminders.bogus", "1").unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_rejects_invalid_values_and_keeps_old() {
        let mut cfg = Config::default();
        assert!(cfg.set("reminders.evening_prep_enabled", "maybe").is_err());
        assert!(cfg.set("reminders.evening_prep_time", "25:99").is_err());
        assert!(cfg.set("usage.warning_threshold", "1.5").is_err());
        assert_eq!(cfg.reminders.evening_prep_time, "21:00");
        assert_eq!(cfg.usage.warning_threshold, 0.8);
    }

    #[test]
    fn schedule_honours_toggles() {
        let mut cfg = Config::default();
        cfg.reminders.morning_focus_enabled = false;
        cfg.reminders.evening_prep_time = "20:30".into();
        let schedule = cfg.reminders.schedule().unwrap();
        assert_eq!(schedule.morning_focus, None);
        assert_eq!(schedule.evening_prep, NaiveTime::from_hms_opt(20, 30, 0));
    }

    #[test]
    fn load_from_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.usage.monthly_limit, 100_000);

        let mut cfg = cfg;
        cfg.set("profile.user_name", "Kai").unwrap();
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().user_name(), Some("Kai"));
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "profile = 3").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(CoreError::Config(ConfigError::LoadFailed { .. }))
        ));
    }
}
