//! SQLite-based persistence.
//!
//! Provides persistent storage for:
//! - The streak record, usage record and journal completion dates, each
//!   stored as a single JSON value in a key-value table
//! - Earned achievements

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::data_dir;
use crate::error::{CoreError, DatabaseError, StoreError};
use crate::reminder::JournalCompletion;
use crate::streak::{Achievement, StreakState, StreakStore};
use crate::usage::{UsageState, UsageStore};

const STREAK_KEY: &str = "streak";
const USAGE_KEY: &str = "usage";
const JOURNAL_KEY: &str = "journal_completion";

/// SQLite database for Coacher state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/coacher/coacher.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("coacher.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate().map_err(DatabaseError::from)?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        let db = Self { conn };
        db.migrate().map_err(DatabaseError::from)?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS achievements (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                name      TEXT NOT NULL,
                kind      TEXT NOT NULL,
                days      INTEGER NOT NULL,
                earned_on TEXT NOT NULL,
                details   TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX IF NOT EXISTS idx_achievements_earned_on ON achievements(earned_on);",
        )?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.kv_get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StoreError::Corrupt {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    fn save_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.kv_set(key, &raw)?;
        Ok(())
    }

    pub fn journal_completion(&self) -> Result<JournalCompletion, StoreError> {
        Ok(self.load_json(JOURNAL_KEY)?.unwrap_or_default())
    }

    pub fn save_journal_completion(&self, completion: &JournalCompletion) -> Result<(), StoreError> {
        self.save_json(JOURNAL_KEY, completion)
    }

    /// Record an earned achievement.
    pub fn record_achievement(&self, achievement: &Achievement) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO achievements (name, kind, days, earned_on, details)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                achievement.name,
                achievement.kind,
                achievement.days,
                achievement.earned_on.format("%Y-%m-%d").to_string(),
                achievement.details,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All achievements, oldest first.
    pub fn achievements(&self) -> Result<Vec<Achievement>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT name, kind, days, earned_on, details
             FROM achievements
             ORDER BY earned_on, id",
        )?;
        let rows = stmt.query_map([], |row| {
            let earned_on: String = row.get(3)?;
            let earned_on = NaiveDate::parse_from_str(&earned_on, "%Y-%m-%d").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
            })?;
            Ok(Achievement {
                name: row.get(0)?,
                kind: row.get(1)?,
                days: row.get(2)?,
                earned_on,
                details: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
    }
}

impl StreakStore for Database {
    fn load_streak(&self) -> Result<Option<StreakState>, StoreError> {
        self.load_json(STREAK_KEY)
    }

    fn save_streak(&self, state: &StreakState) -> Result<(), StoreError> {
        self.save_json(STREAK_KEY, state)
    }
}

impl UsageStore for Database {
    fn load_usage(&self) -> Result<Option<UsageState>, StoreError> {
        self.load_json(USAGE_KEY)
    }

    fn save_usage(&self, state: &UsageState) -> Result<(), StoreError> {
        self.save_json(USAGE_KEY, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
    }

    #[test]
    fn streak_record_round_trips() {
        let db = Database::open_memory().unwrap();
        assert!(db.load_streak().unwrap().is_none());
        let state = StreakState {
            current_streak: 4,
            longest_streak: 9,
            last_activity: NaiveDate::from_ymd_opt(2024, 4, 2),
            last_milestone_celebrated: 3,
        };
        db.save_streak(&state).unwrap();
        assert_eq!(db.load_streak().unwrap(), Some(state));
    }

    #[test]
    fn corrupt_record_is_reported() {
        let db = Database::open_memory().unwrap();
        db.kv_set(STREAK_KEY, "{not json").unwrap();
        assert!(matches!(
            db.load_streak(),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn achievements_are_listed_in_order() {
        let db = Database::open_memory().unwrap();
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        db.record_achievement(&Achievement::streak(7, d2)).unwrap();
        db.record_achievement(&Achievement::streak(3, d1)).unwrap();
        let all = db.achievements().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Getting Started");
        assert_eq!(all[1], Achievement::streak(7, d2));
    }

    #[test]
    fn file_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coacher.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.save_usage(&UsageState {
                tokens_used: 42,
                ..UsageState::default()
            })
            .unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.load_usage().unwrap().unwrap().tokens_used, 42);
    }
}
