//! Monthly AI token quota.
//!
//! Tokens spent talking to the coach are counted against a monthly limit. The
//! counter resets the first time it is touched in a new calendar month, and
//! the "running low" warning is offered at most once per month.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;

/// Year and month, the granularity of the quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// First day of the following month.
    pub fn next_month_start(self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MAX)
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageState {
    pub tokens_used: u64,
    /// Day the counter was last zeroed, `None` before first use
    pub last_reset: Option<NaiveDate>,
    pub warning_shown_for: Option<MonthKey>,
}

/// Quota parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageLimits {
    pub monthly_limit: u64,
    /// Fraction of the limit (0.0-1.0) at which the warning is offered
    pub warning_threshold: f64,
}

impl Default for UsageLimits {
    fn default() -> Self {
        Self {
            monthly_limit: 100_000,
            warning_threshold: 0.80,
        }
    }
}

/// Durable home of a [`UsageState`].
pub trait UsageStore {
    fn load_usage(&self) -> Result<Option<UsageState>, StoreError>;
    fn save_usage(&self, state: &UsageState) -> Result<(), StoreError>;
}

impl<T: UsageStore + ?Sized> UsageStore for &T {
    fn load_usage(&self) -> Result<Option<UsageState>, StoreError> {
        (**self).load_usage()
    }

    fn save_usage(&self, state: &UsageState) -> Result<(), StoreError> {
        (**self).save_usage(state)
    }
}

/// In-process usage store.
#[derive(Debug, Default)]
pub struct MemoryUsageStore {
    record: std::sync::Mutex<Option<UsageState>>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Option<UsageState> {
        self.record.lock().ok().and_then(|r| r.clone())
    }
}

impl UsageStore for MemoryUsageStore {
    fn load_usage(&self) -> Result<Option<UsageState>, StoreError> {
        self.record
            .lock()
            .map(|r| r.clone())
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn save_usage(&self, state: &UsageState) -> Result<(), StoreError> {
        let mut record = self
            .record
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        *record = Some(state.clone());
        Ok(())
    }
}

/// Read-only summary for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    pub tokens_used: u64,
    pub monthly_limit: u64,
    pub remaining_tokens: u64,
    pub usage_fraction: f64,
    pub renewal_date: NaiveDate,
    pub should_show_warning: bool,
}

pub struct UsageTracker<S, C = SystemClock> {
    state: UsageState,
    limits: UsageLimits,
    store: S,
    clock: C,
}

impl<S: UsageStore, C: Clock> UsageTracker<S, C> {
    pub fn load(store: S, clock: C, limits: UsageLimits) -> Result<Self, StoreError> {
        let state = store.load_usage()?.unwrap_or_default();
        let mut tracker = Self {
            state,
            limits,
            store,
            clock,
        };
        tracker.reset_if_needed()?;
        Ok(tracker)
    }

    pub fn state(&self) -> &UsageState {
        &self.state
    }

    /// Tokens spent this month.
    pub fn current_usage(&mut self) -> Result<u64, StoreError> {
        self.reset_if_needed()?;
        Ok(self.state.tokens_used)
    }

    /// Whether spending `required_tokens` more stays within the limit.
    pub fn can_make_request(&mut self, required_tokens: u64) -> Result<bool, StoreError> {
        self.reset_if_needed()?;
        Ok(self.state.tokens_used.saturating_add(required_tokens) <= self.limits.monthly_limit)
    }

    /// Count the input and output tokens of one exchange.
    pub fn record_usage(&mut self, input_tokens: u64, output_tokens: u64) -> Result<u64, StoreError> {
        self.reset_if_needed()?;
        let total = input_tokens.saturating_add(output_tokens);
        self.state.tokens_used = self.state.tokens_used.saturating_add(total);
        tracing::debug!(
            input_tokens,
            output_tokens,
            used = self.state.tokens_used,
            limit = self.limits.monthly_limit,
            "token usage recorded"
        );
        self.persist()?;
        Ok(self.state.tokens_used)
    }

    /// True once usage crosses the warning threshold, until acknowledged
    /// for the month.
    pub fn should_show_warning(&mut self) -> Result<bool, StoreError> {
        self.reset_if_needed()?;
        let month = MonthKey::of(self.clock.today());
        if self.state.warning_shown_for == Some(month) {
            return Ok(false);
        }
        Ok(self.usage_fraction()? >= self.limits.warning_threshold)
    }

    pub fn mark_warning_shown(&mut self) -> Result<(), StoreError> {
        self.reset_if_needed()?;
        let month = MonthKey::of(self.clock.today());
        self.state.warning_shown_for = Some(month);
        tracing::debug!(%month, "usage warning marked shown");
        self.persist()
    }

    /// First day of next month, when the quota renews.
    pub fn renewal_date(&mut self) -> Result<NaiveDate, StoreError> {
        self.reset_if_needed()?;
        Ok(MonthKey::of(self.clock.today()).next_month_start())
    }

    pub fn remaining_tokens(&mut self) -> Result<u64, StoreError> {
        self.reset_if_needed()?;
        Ok(self.limits.monthly_limit.saturating_sub(self.state.tokens_used))
    }

    /// Usage as a fraction of the limit; may exceed 1.0.
    pub fn usage_fraction(&mut self) -> Result<f64, StoreError> {
        self.reset_if_needed()?;
        if self.limits.monthly_limit == 0 {
            return Ok(1.0);
        }
        Ok(self.state.tokens_used as f64 / self.limits.monthly_limit as f64)
    }

    /// Zero the counter and clear the warning flag.
    pub fn reset_usage(&mut self) -> Result<(), StoreError> {
        self.state = UsageState {
            tokens_used: 0,
            last_reset: Some(self.clock.today()),
            warning_shown_for: None,
        };
        tracing::info!("usage manually reset");
        self.persist()
    }

    /// Overwrite the counter.
    pub fn set_usage(&mut self, tokens: u64) -> Result<(), StoreError> {
        self.reset_if_needed()?;
        self.state.tokens_used = tokens;
        self.persist()
    }

    pub fn report(&mut self) -> Result<UsageReport, StoreError> {
        let should_show_warning = self.should_show_warning()?;
        let remaining_tokens = self.remaining_tokens()?;
        let usage_fraction = self.usage_fraction()?;
        let renewal_date = self.renewal_date()?;
        Ok(UsageReport {
            tokens_used: self.state.tokens_used,
            monthly_limit: self.limits.monthly_limit,
            remaining_tokens,
            usage_fraction,
            renewal_date,
            should_show_warning,
        })
    }

    fn reset_if_needed(&mut self) -> Result<(), StoreError> {
        let today = self.clock.today();
        match self.state.last_reset {
            Some(last) if MonthKey::of(last) == MonthKey::of(today) => Ok(()),
            Some(last) => {
                tracing::info!(
                    previous = self.state.tokens_used,
                    since = %last,
                    "month changed, resetting token usage"
                );
                self.state = UsageState {
                    tokens_used: 0,
                    last_reset: Some(today),
                    warning_shown_for: None,
                };
                self.persist()
            }
            None => {
                self.state.tokens_used = 0;
                self.state.last_reset = Some(today);
                self.persist()
            }
        }
    }

    fn persist(&self) -> Result<(), StoreError> {
        self.store.save_usage(&self.state).inspect_err(|e| {
            tracing::warn!(error = %e, "failed to save usage");
        })
    }
}
