//! Milestone thresholds, celebration messages and achievement badges.
//!
//! Milestones are a fixed ascending set of streak lengths. Each level owns a
//! pool of message templates; a template may contain a `{name}` placeholder
//! that is filled with the user's display name.

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Placeholder substituted with the user's display name.
pub const NAME_PLACEHOLDER: &str = "{name}";

/// A streak length worth celebrating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum Milestone {
    Three,
    Seven,
    Fourteen,
    Thirty,
    Hundred,
}

impl Milestone {
    /// All milestones in ascending order.
    pub const ALL: [Milestone; 5] = [
        Milestone::Three,
        Milestone::Seven,
        Milestone::Fourteen,
        Milestone::Thirty,
        Milestone::Hundred,
    ];

    /// Streak length this milestone is reached at.
    pub fn days(self) -> u32 {
        match self {
            Milestone::Three => 3,
            Milestone::Seven => 7,
            Milestone::Fourteen => 14,
            Milestone::Thirty => 30,
            Milestone::Hundred => 100,
        }
    }

    /// The milestone whose threshold is exactly `days`.
    pub fn from_days(days: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.days() == days)
    }

    /// The largest milestone a streak of `days` has reached.
    pub fn level_for(days: u32) -> Option<Self> {
        Self::ALL.into_iter().rev().find(|m| days >= m.days())
    }

    /// Badge name awarded when the milestone is celebrated.
    pub fn achievement_name(self) -> &'static str {
        match self {
            Milestone::Three => "Getting Started",
            Milestone::Seven => "Week Warrior",
            Milestone::Fourteen => "Fortnight Fighter",
            Milestone::Thirty => "Monthly Master",
            Milestone::Hundred => "Century Club",
        }
    }

    /// Message templates for this level.
    pub fn templates(self) -> &'static [&'static str] {
        match self {
            Milestone::Three => &[
                "Three days straight — your new habit is taking root. 🌱",
                "Consistency is growing — keep watering it.",
                "That's a solid start! You're proving to yourself you can do this.",
                "Momentum is on your side now — ride the wave!",
                "Three days strong, {name} — you're building something real! 🌱",
            ],
            Milestone::Seven => &[
                "One week strong — your future self is cheering! 🎉",
                "Seven days in a row — amazing consistency!",
                "A whole week of swaps adds up — you've changed your tomorrow, seven times over.",
                "This is no fluke. You're building a real pattern.",
                "One week down, {name} — you're on fire! 🎉",
            ],
            Milestone::Fourteen => &[
                "Two weeks of dedication — you're unstoppable! 🚀",
                "Fortnight fighter! Your habit is becoming second nature.",
                "Fourteen days strong — you've proven this isn't temporary.",
                "Halfway to a month! You're building something lasting.",
                "Two weeks strong, {name} — you're unstoppable! 🚀",
            ],
            Milestone::Thirty => &[
                "One month of consistency — you're a habit master! 👑",
                "Thirty days strong — you've transformed your life!",
                "A full month of healthy choices — this is who you are now.",
                "Monthly master! You've built a foundation that lasts.",
                "One month down, {name} — you're a habit master! 👑",
            ],
            Milestone::Hundred => &[
                "Century club! 100 days of dedication! 🏆",
                "One hundred days strong — you're absolutely incredible!",
                "A hundred days of healthy choices — you've changed your life forever.",
                "Century achievement unlocked! You're a legend!",
                "100 days strong, {name} — you're absolutely legendary! 🏆",
            ],
        }
    }
}

impl From<Milestone> for u32 {
    fn from(m: Milestone) -> Self {
        m.days()
    }
}

impl TryFrom<u32> for Milestone {
    type Error = String;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        Milestone::from_days(days).ok_or_else(|| format!("{days} is not a milestone threshold"))
    }
}

impl std::fmt::Display for Milestone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-day milestone", self.days())
    }
}

/// Pick a celebration message for `level`.
///
/// `{name}` is replaced with `user_name` when it is present and non-blank.
/// Without a usable name, only templates that don't mention the user are
/// drawn from.
pub fn milestone_message<R: Rng + ?Sized>(
    level: Milestone,
    user_name: Option<&str>,
    rng: &mut R,
) -> String {
    let name = user_name.map(str::trim).filter(|n| !n.is_empty());
    let templates = level.templates();

    let chosen = match name {
        Some(_) => templates.choose(rng),
        None => {
            let anonymous: Vec<&&str> = templates
                .iter()
                .filter(|t| !t.contains(NAME_PLACEHOLDER))
                .collect();
            anonymous.choose(rng).copied()
        }
    };

    // Every pool is non-empty and has anonymous entries.
    let template = chosen.copied().unwrap_or(templates[0]);
    match name {
        Some(name) => template.replace(NAME_PLACEHOLDER, name),
        None => template.to_string(),
    }
}

/// A badge earned by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub name: String,
    /// Category tag, e.g. "streak"
    pub kind: String,
    /// Streak length the badge was earned at
    pub days: u32,
    pub earned_on: NaiveDate,
    pub details: String,
}

impl Achievement {
    /// Badge for holding a `days`-long streak.
    pub fn streak(days: u32, earned_on: NaiveDate) -> Self {
        let name = match Milestone::from_days(days) {
            Some(m) => m.achievement_name().to_string(),
            None => format!("{days}-Day Streak"),
        };
        Self {
            name,
            kind: "streak".to_string(),
            days,
            earned_on,
            details: format!("Maintained a {days}-day streak"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    #[test]
    fn thresholds_are_ascending() {
        let days: Vec<u32> = Milestone::ALL.iter().map(|m| m.days()).collect();
        assert_eq!(days, vec![3, 7, 14, 30, 100]);
    }

    #[test]
    fn from_days_requires_exact_match() {
        assert_eq!(Milestone::from_days(7), Some(Milestone::Seven));
        assert_eq!(Milestone::from_days(8), None);
        assert_eq!(Milestone::from_days(0), None);
    }

    #[test]
    fn level_for_picks_largest_reached() {
        assert_eq!(Milestone::level_for(0), None);
        assert_eq!(Milestone::level_for(2), None);
        assert_eq!(Milestone::level_for(3), Some(Milestone::Three));
        assert_eq!(Milestone::level_for(13), Some(Milestone::Seven));
        assert_eq!(Milestone::level_for(99), Some(Milestone::Thirty));
        assert_eq!(Milestone::level_for(365), Some(Milestone::Hundred));
    }

    #[test]
    fn message_substitutes_name() {
        let mut rng = Pcg64::seed_from_u64(7);
        for _ in 0..50 {
            let msg = milestone_message(Milestone::Three, Some("Sam"), &mut rng);
            assert!(!msg.contains(NAME_PLACEHOLDER));
            assert!(
                Milestone::Three
                    .templates()
                    .iter()
                    .any(|t| t.replace(NAME_PLACEHOLDER, "Sam") == msg),
                "unexpected message: {msg}"
            );
        }
    }

    #[test]
    fn message_without_name_never_leaks_placeholder() {
        let mut rng = Pcg64::seed_from_u64(42);
        for level in Milestone::ALL {
            for name in [None, Some(""), Some("   ")] {
                for _ in 0..30 {
                    let msg = milestone_message(level, name, &mut rng);
                    assert!(!msg.contains(NAME_PLACEHOLDER), "{msg}");
                }
            }
        }
    }

    #[test]
    fn message_choice_is_deterministic_for_a_seed() {
        let a = milestone_message(Milestone::Thirty, Some("Ana"), &mut Pcg64::seed_from_u64(3));
        let b = milestone_message(Milestone::Thirty, Some("Ana"), &mut Pcg64::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn pools_are_distinct_per_level() {
        let three = Milestone::Three.templates();
        let seven = Milestone::Seven.templates();
        assert!(three.iter().all(|t| !seven.contains(t)));
    }

    #[test]
    fn named_templates_read_as_written() {
        assert_eq!(
            Milestone::Three.templates()[0],
            "Three days straight — your new habit is taking root. 🌱"
        );
        assert_eq!(
            Milestone::Seven.templates()[4].replace(NAME_PLACEHOLDER, "Jo"),
            "One week down, Jo — you're on fire! 🎉"
        );
        assert_eq!(
            Milestone::Hundred.templates()[2],
            "A hundred days of healthy choices — you've changed your life forever."
        );
        for level in Milestone::ALL {
            let named = level
                .templates()
                .iter()
                .filter(|t| t.contains(NAME_PLACEHOLDER))
                .count();
            assert_eq!((level.templates().len(), named), (5, 1), "{level}");
        }
    }

    #[test]
    fn achievement_names() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(Achievement::streak(7, day).name, "Week Warrior");
        assert_eq!(Achievement::streak(100, day).name, "Century Club");
        assert_eq!(Achievement::streak(42, day).name, "42-Day Streak");
        assert_eq!(Achievement::streak(14, day).details, "Maintained a 14-day streak");
    }

    #[test]
    fn milestone_serializes_as_day_count() {
        assert_eq!(serde_json::to_string(&Milestone::Fourteen).unwrap(), "14");
        let parsed: Milestone = serde_json::from_str("30").unwrap();
        assert_eq!(parsed, Milestone::Thirty);
        assert!(serde_json::from_str::<Milestone>("4").is_err());
    }
}
