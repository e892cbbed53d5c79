//! The persisted streak record and its day-granular transitions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::milestone::Milestone;

/// Consecutive-activity-day streak for one user.
///
/// `last_activity == None` means activity has never been recorded (or the
/// streak was reset). Invariant: `longest_streak >= current_streak`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_activity: Option<NaiveDate>,
    /// Highest milestone threshold already shown, 0 if none
    pub last_milestone_celebrated: u32,
}

/// What [`StreakState::record_activity`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityOutcome {
    /// Activity for this day was already counted
    AlreadyRecorded,
    /// Day after the last activity, streak extended
    Continued,
    /// First activity ever (or since a reset)
    Started,
    /// Chain was broken, streak restarted at 1
    Restarted,
}

impl StreakState {
    /// Count activity on `today`. Idempotent per day.
    pub fn record_activity(&mut self, today: NaiveDate) -> ActivityOutcome {
        let outcome = match self.last_activity {
            Some(last) if last == today => return ActivityOutcome::AlreadyRecorded,
            Some(last) if last.succ_opt() == Some(today) => {
                self.current_streak = self.current_streak.saturating_add(1);
                ActivityOutcome::Continued
            }
            Some(_) => {
                self.current_streak = 1;
                ActivityOutcome::Restarted
            }
            None => {
                self.current_streak = 1;
                ActivityOutcome::Started
            }
        };

        if self.current_streak > self.longest_streak {
            self.longest_streak = self.current_streak;
        }
        self.last_activity = Some(today);
        outcome
    }

    /// True when the current streak sits exactly on a milestone that hasn't
    /// been celebrated yet.
    pub fn should_celebrate_milestone(&self) -> bool {
        self.current_streak > 0
            && Milestone::from_days(self.current_streak).is_some()
            && self.last_milestone_celebrated < self.current_streak
    }

    /// Largest milestone the current streak has reached.
    pub fn current_milestone_level(&self) -> Option<Milestone> {
        Milestone::level_for(self.current_streak)
    }

    /// Remember the current level as shown. Returns the level, if any.
    pub fn mark_milestone_celebrated(&mut self) -> Option<Milestone> {
        let level = self.current_milestone_level()?;
        self.last_milestone_celebrated = self.last_milestone_celebrated.max(level.days());
        Some(level)
    }

    /// Whole days between the last activity and `today`.
    pub fn days_since_last_activity(&self, today: NaiveDate) -> Option<i64> {
        self.last_activity
            .map(|last| today.signed_duration_since(last).num_days())
    }

    /// Whether the chain is at risk on `today`.
    ///
    /// Activity recorded today is safe; otherwise the streak is in danger
    /// unless the last activity was yesterday.
    pub fn is_streak_in_danger(&self, today: NaiveDate) -> bool {
        match self.last_activity {
            Some(last) if last == today => false,
            Some(last) => today.pred_opt() != Some(last),
            None => true,
        }
    }

    /// Clear the running streak. The longest streak is kept.
    pub fn reset(&mut self) {
        self.current_streak = 0;
        self.last_activity = None;
        self.last_milestone_celebrated = 0;
    }

    /// Short human-readable status.
    pub fn status_line(&self) -> String {
        match self.current_streak {
            0 => "Start your streak today!".to_string(),
            1 => "1 day streak".to_string(),
            n => format!("{n} day streak"),
        }
    }
}
