//! Reminder trigger planning.
//!
//! Decides which daily reminders should be pending and when each should next
//! fire. Delivery belongs to the platform; this module only produces plans.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::streak::StreakState;

/// Display name used when the user hasn't given one.
pub const DEFAULT_GREETING_NAME: &str = "there";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    EveningPrep,
    MorningFocus,
}

impl ReminderKind {
    /// Stable identifier for the pending notification.
    pub fn identifier(self) -> &'static str {
        match self {
            ReminderKind::EveningPrep => "nightPrepReminder",
            ReminderKind::MorningFocus => "morningFocusReminder",
        }
    }

    /// Screen opened when the notification is tapped.
    pub fn destination(self) -> &'static str {
        match self {
            ReminderKind::EveningPrep => "nightPrep",
            ReminderKind::MorningFocus => "morningFocus",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ReminderKind::EveningPrep => "Time for Evening Prep! 🌙",
            ReminderKind::MorningFocus => "Morning Focus Time! ☀️",
        }
    }

    pub fn body(self, name: &str) -> String {
        match self {
            ReminderKind::EveningPrep => {
                format!("Hi {name}! Plan your tomorrow and set yourself up for success")
            }
            ReminderKind::MorningFocus => {
                format!("Hi {name}! Review your plan and set your intentions for the day")
            }
        }
    }
}

/// Which reminders are on, and at what local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSchedule {
    pub evening_prep: Option<NaiveTime>,
    pub morning_focus: Option<NaiveTime>,
}

impl Default for ReminderSchedule {
    fn default() -> Self {
        Self {
            evening_prep: NaiveTime::from_hms_opt(21, 0, 0),
            morning_focus: NaiveTime::from_hms_opt(8, 0, 0),
        }
    }
}

/// Last day each gated journal flow was completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalCompletion {
    pub morning_focus: Option<NaiveDate>,
    pub evening_prep: Option<NaiveDate>,
}

impl JournalCompletion {
    pub fn completed_on(&self, kind: ReminderKind) -> Option<NaiveDate> {
        match kind {
            ReminderKind::EveningPrep => self.evening_prep,
            ReminderKind::MorningFocus => self.morning_focus,
        }
    }

    pub fn mark(&mut self, kind: ReminderKind, day: NaiveDate) {
        match kind {
            ReminderKind::EveningPrep => self.evening_prep = Some(day),
            ReminderKind::MorningFocus => self.morning_focus = Some(day),
        }
    }
}

/// One pending notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPlan {
    pub kind: ReminderKind,
    pub identifier: String,
    pub fire_at: NaiveDateTime,
    pub title: String,
    pub body: String,
    pub destination: String,
    /// The flow was already done today, so the next fire moved to tomorrow
    pub done_today: bool,
    pub streak_in_danger: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ReminderPlanner {
    schedule: ReminderSchedule,
}

impl ReminderPlanner {
    pub fn new(schedule: ReminderSchedule) -> Self {
        Self { schedule }
    }

    /// Plans for every enabled reminder, evening first.
    pub fn plan(
        &self,
        now: NaiveDateTime,
        completion: &JournalCompletion,
        user_name: Option<&str>,
        streak: Option<&StreakState>,
    ) -> Vec<ReminderPlan> {
        let name = user_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_GREETING_NAME);
        let in_danger = streak.is_some_and(|s| s.is_streak_in_danger(now.date()));

        [
            (ReminderKind::EveningPrep, self.schedule.evening_prep),
            (ReminderKind::MorningFocus, self.schedule.morning_focus),
        ]
        .into_iter()
        .filter_map(|(kind, time)| time.map(|t| (kind, t)))
        .map(|(kind, time)| {
            let today = now.date();
            let done_today = completion.completed_on(kind) == Some(today);
            let fire_today = today.and_time(time);
            let fire_at = if done_today || fire_today <= now {
                today
                    .succ_opt()
                    .map(|d| d.and_time(time))
                    .unwrap_or(fire_today)
            } else {
                fire_today
            };
            ReminderPlan {
                kind,
                identifier: kind.identifier().to_string(),
                fire_at,
                title: kind.title().to_string(),
                body: kind.body(name),
                destination: kind.destination().to_string(),
                done_today,
                streak_in_danger: in_danger,
            }
        })
        .collect()
    }
}
