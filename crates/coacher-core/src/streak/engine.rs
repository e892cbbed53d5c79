//! Streak engine: the single owner of a user's streak record.
//!
//! The engine loads its [`StreakState`] from a [`StreakStore`] at
//! construction and writes it back after every mutation. Queries are pure and
//! read the in-memory copy. If a save fails the new state is kept in memory
//! and the error is returned to the caller; nothing is retried.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::milestone::{self, Milestone};
use super::state::{ActivityOutcome, StreakState};
use super::store::StreakStore;
use crate::clock::{Clock, SystemClock};
use crate::error::{CoreError, StoreError};

/// Presentation-ready view of the streak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakSnapshot {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_activity: Option<NaiveDate>,
    pub last_milestone_celebrated: u32,
    pub milestone_level: Option<Milestone>,
    pub should_celebrate: bool,
    pub in_danger: bool,
    pub days_since_last_activity: Option<i64>,
    pub status: String,
}

pub struct StreakEngine<S, C = SystemClock> {
    state: StreakState,
    store: S,
    clock: C,
}

impl<S: StreakStore, C: Clock> StreakEngine<S, C> {
    /// Load the saved record, or start fresh on first use.
    pub fn load(store: S, clock: C) -> Result<Self, StoreError> {
        let state = store.load_streak()?.unwrap_or_default();
        tracing::debug!(
            current = state.current_streak,
            longest = state.longest_streak,
            "streak loaded"
        );
        Ok(Self { state, store, clock })
    }

    pub fn state(&self) -> &StreakState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn current_streak(&self) -> u32 {
        self.state.current_streak
    }

    pub fn longest_streak(&self) -> u32 {
        self.state.longest_streak
    }

    /// Count activity on `today` (time of day is irrelevant).
    ///
    /// # Errors
    /// Returns [`StoreError`] if the updated record could not be saved. The
    /// in-memory state already reflects the activity in that case.
    pub fn record_activity(&mut self, today: NaiveDate) -> Result<ActivityOutcome, StoreError> {
        let outcome = self.state.record_activity(today);
        match outcome {
            ActivityOutcome::AlreadyRecorded => {
                tracing::debug!(%today, "activity already recorded");
                return Ok(outcome);
            }
            ActivityOutcome::Restarted => tracing::info!(
                %today,
                longest = self.state.longest_streak,
                "streak chain broken, restarting"
            ),
            _ => tracing::debug!(
                %today,
                current = self.state.current_streak,
                ?outcome,
                "activity recorded"
            ),
        }
        self.persist()?;
        Ok(outcome)
    }

    /// [`record_activity`](Self::record_activity) for the clock's today.
    pub fn record_activity_today(&mut self) -> Result<ActivityOutcome, StoreError> {
        let today = self.clock.today();
        self.record_activity(today)
    }

    pub fn should_celebrate_milestone(&self) -> bool {
        self.state.should_celebrate_milestone()
    }

    pub fn current_milestone_level(&self) -> Option<Milestone> {
        self.state.current_milestone_level()
    }

    /// Record that the current level has been shown to the user.
    ///
    /// Returns the level that was marked, `None` if there was none.
    pub fn mark_milestone_celebrated(&mut self) -> Result<Option<Milestone>, StoreError> {
        let before = self.state.last_milestone_celebrated;
        let level = self.state.mark_milestone_celebrated();
        if self.state.last_milestone_celebrated != before {
            tracing::info!(level = self.state.last_milestone_celebrated, "milestone celebrated");
            self.persist()?;
        }
        Ok(level)
    }

    /// Acknowledge the pending celebration, if there is one.
    ///
    /// The level is returned only after the mark has been saved; on a save
    /// error the caller gets the error and nothing to celebrate.
    pub fn take_pending_celebration(&mut self) -> Result<Option<Milestone>, StoreError> {
        if !self.state.should_celebrate_milestone() {
            return Ok(None);
        }
        self.mark_milestone_celebrated()
    }

    /// Celebration text for `level`.
    pub fn milestone_message<R: Rng + ?Sized>(
        &self,
        level: Milestone,
        user_name: Option<&str>,
        rng: &mut R,
    ) -> String {
        milestone::milestone_message(level, user_name, rng)
    }

    pub fn is_streak_in_danger(&self) -> bool {
        self.state.is_streak_in_danger(self.clock.today())
    }

    /// `None` if activity was never recorded.
    pub fn days_since_last_activity(&self) -> Option<i64> {
        self.state.days_since_last_activity(self.clock.today())
    }

    /// Clear the running streak and celebration state, keeping the longest.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.state.reset();
        tracing::info!(longest = self.state.longest_streak, "streak reset");
        self.persist()
    }

    pub fn status_line(&self) -> String {
        self.state.status_line()
    }

    pub fn snapshot(&self) -> StreakSnapshot {
        let today = self.clock.today();
        StreakSnapshot {
            current_streak: self.state.current_streak,
            longest_streak: self.state.longest_streak,
            last_activity: self.state.last_activity,
            last_milestone_celebrated: self.state.last_milestone_celebrated,
            milestone_level: self.state.current_milestone_level(),
            should_celebrate: self.state.should_celebrate_milestone(),
            in_danger: self.state.is_streak_in_danger(today),
            days_since_last_activity: self.state.days_since_last_activity(today),
            status: self.state.status_line(),
        }
    }

    /// Wrap the engine for use from several threads.
    pub fn into_shared(self) -> SharedStreakEngine<S, C> {
        SharedStreakEngine {
            inner: Arc::new(Mutex::new(self)),
        }
    }

    fn persist(&self) -> Result<(), StoreError> {
        self.store.save_streak(&self.state).inspect_err(|e| {
            tracing::warn!(error = %e, "failed to save streak; state kept in memory");
        })
    }
}

/// A lock-guarded engine handle that can be cloned across threads.
///
/// Every call holds the lock for its whole read-modify-write, so concurrent
/// `record_activity` calls cannot lose updates.
pub struct SharedStreakEngine<S, C = SystemClock> {
    inner: Arc<Mutex<StreakEngine<S, C>>>,
}

impl<S, C> Clone for SharedStreakEngine<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: StreakStore, C: Clock> SharedStreakEngine<S, C> {
    /// Run `f` with exclusive access to the engine.
    pub fn with<T>(&self, f: impl FnOnce(&mut StreakEngine<S, C>) -> T) -> Result<T, CoreError> {
        let mut engine = self.inner.lock().map_err(|_| CoreError::LockPoisoned)?;
        Ok(f(&mut engine))
    }

    pub fn record_activity(&self, today: NaiveDate) -> Result<ActivityOutcome, CoreError> {
        Ok(self.with(|e| e.record_activity(today))??)
    }

    pub fn snapshot(&self) -> Result<StreakSnapshot, CoreError> {
        self.with(|e| e.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    use crate::clock::FixedClock;
    use crate::streak::store::MemoryStreakStore;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn day(n: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap() + chrono::Days::new(n)
    }

    fn engine_on(
        store: &MemoryStreakStore,
        today: NaiveDate,
    ) -> StreakEngine<&MemoryStreakStore, FixedClock> {
        StreakEngine::load(store, FixedClock::on(today)).unwrap()
    }

    #[test]
    fn fresh_engine_starts_at_zero() {
        let store = MemoryStreakStore::new();
        let engine = engine_on(&store, day(0));
        assert_eq!(engine.current_streak(), 0);
        assert_eq!(engine.longest_streak(), 0);
        assert!(!engine.should_celebrate_milestone());
        assert_eq!(engine.current_milestone_level(), None);
        assert_eq!(engine.days_since_last_activity(), None);
    }

    #[test]
    fn three_days_reach_first_milestone() {
        let store = MemoryStreakStore::new();
        let mut engine = engine_on(&store, day(2));
        for n in 0..3 {
            engine.record_activity(day(n)).unwrap();
        }
        assert_eq!(engine.current_streak(), 3);
        assert!(engine.should_celebrate_milestone());
        assert_eq!(engine.current_milestone_level(), Some(Milestone::Three));
    }

    #[test]
    fn every_mutation_is_persisted() {
        let store = MemoryStreakStore::new();
        let mut engine = engine_on(&store, day(1));
        engine.record_activity(day(0)).unwrap();
        engine.record_activity(day(1)).unwrap();
        assert_eq!(store.saved().unwrap().current_streak, 2);

        let reloaded = engine_on(&store, day(1));
        assert_eq!(reloaded.state(), engine.state());
    }

    #[test]
    fn celebration_protocol() {
        let store = MemoryStreakStore::new();
        let mut engine = engine_on(&store, day(3));
        for n in 0..3 {
            engine.record_activity(day(n)).unwrap();
        }
        let level = engine.current_milestone_level().unwrap();
        let msg = engine.milestone_message(level, None, &mut Pcg64::seed_from_u64(1));
        assert!(Milestone::Three.templates().contains(&msg.as_str()));

        assert_eq!(engine.mark_milestone_celebrated().unwrap(), Some(Milestone::Three));
        assert_eq!(store.saved().unwrap().last_milestone_celebrated, 3);

        engine.record_activity(day(3)).unwrap();
        assert_eq!(engine.current_streak(), 4);
        assert!(!engine.should_celebrate_milestone());
    }

    #[test]
    fn pending_celebration_is_taken_once() {
        let store = MemoryStreakStore::new();
        let mut engine = engine_on(&store, day(2));
        assert_eq!(engine.take_pending_celebration().unwrap(), None);
        for n in 0..3 {
            engine.record_activity(day(n)).unwrap();
        }
        assert_eq!(engine.take_pending_celebration().unwrap(), Some(Milestone::Three));
        assert_eq!(store.saved().unwrap().last_milestone_celebrated, 3);
        assert_eq!(engine.take_pending_celebration().unwrap(), None);
    }

    #[test]
    fn failed_mark_yields_no_celebration() {
        let store = MemoryStreakStore::new();
        let mut engine = engine_on(&store, day(2));
        for n in 0..3 {
            engine.record_activity(day(n)).unwrap();
        }
        store.set_unavailable(true);
        assert!(matches!(
            engine.take_pending_celebration(),
            Err(StoreError::Unavailable(_))
        ));
        store.set_unavailable(false);
        assert_eq!(store.saved().unwrap().last_milestone_celebrated, 0);
    }

    #[test]
    fn save_failure_keeps_state_in_memory() {
        let store = MemoryStreakStore::new();
        let mut engine = engine_on(&store, day(0));
        store.set_unavailable(true);

        let err = engine.record_activity(day(0)).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(engine.current_streak(), 1);
        assert!(store.saved().is_none());

        store.set_unavailable(false);
        // Same day is now a no-op, so nothing new is written.
        assert_eq!(
            engine.record_activity(day(0)).unwrap(),
            ActivityOutcome::AlreadyRecorded
        );
        engine.record_activity(day(1)).unwrap();
        assert_eq!(store.saved().unwrap().current_streak, 2);
    }

    #[test]
    fn load_failure_is_reported() {
        let store = MemoryStreakStore::new();
        store.set_unavailable(true);
        assert!(StreakEngine::load(&store, FixedClock::on(day(0))).is_err());
    }

    #[test]
    fn reset_persists_and_keeps_longest() {
        let store = MemoryStreakStore::new();
        let mut engine = engine_on(&store, day(4));
        for n in 0..5 {
            engine.record_activity(day(n)).unwrap();
        }
        engine.reset().unwrap();
        let saved = store.saved().unwrap();
        assert_eq!(saved.current_streak, 0);
        assert_eq!(saved.longest_streak, 5);
        assert_eq!(saved.last_activity, None);
    }

    #[test]
    fn snapshot_reflects_clock() {
        let store = MemoryStreakStore::new();
        let mut engine = engine_on(&store, day(3));
        engine.record_activity(day(1)).unwrap();
        let snap = engine.snapshot();
        assert_eq!(snap.current_streak, 1);
        assert!(snap.in_danger);
        assert_eq!(snap.days_since_last_activity, Some(2));
        assert_eq!(snap.status, "1 day streak");
    }

    #[test]
    fn shared_engine_serializes_concurrent_records() {
        let engine = StreakEngine::load(MemoryStreakStore::new(), FixedClock::on(day(0)))
            .unwrap()
            .into_shared();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                std::thread::spawn(move || {
                    for n in 0..10 {
                        engine.record_activity(day(n)).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snap = engine.snapshot().unwrap();
        assert!(snap.longest_streak >= snap.current_streak);
        assert!(snap.last_activity.is_some());
        let saved = engine.with(|e| e.store().saved()).unwrap().unwrap();
        assert_eq!(saved.current_streak, snap.current_streak);
    }

    #[test]
    fn panic_inside_shared_engine_poisons_later_calls() {
        let engine = StreakEngine::load(MemoryStreakStore::new(), FixedClock::on(day(0)))
            .unwrap()
            .into_shared();

        let held = engine.clone();
        let result = std::thread::spawn(move || {
            let _ = held.with(|_| panic!("engine user panicked"));
        })
        .join();
        assert!(result.is_err());

        assert!(matches!(
            engine.record_activity(day(0)),
            Err(CoreError::LockPoisoned)
        ));
        assert!(matches!(engine.snapshot(), Err(CoreError::LockPoisoned)));
    }

    /// Store that counts saves, to catch lost or duplicated writes.
    #[derive(Default)]
    struct CountingStore {
        saves: AtomicUsize,
    }

    impl StreakStore for CountingStore {
        fn load_streak(&self) -> Result<Option<StreakState>, StoreError> {
            Ok(None)
        }

        fn save_streak(&self, _state: &StreakState) -> Result<(), StoreError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn racing_records_for_one_day_count_once() {
        const THREADS: usize = 8;
        let engine = StreakEngine::load(CountingStore::default(), FixedClock::on(day(0)))
            .unwrap()
            .into_shared();
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let engine = engine.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    engine.record_activity(day(0)).unwrap()
                })
            })
            .collect();
        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let counted = outcomes
            .iter()
            .filter(|o| **o != ActivityOutcome::AlreadyRecorded)
            .count();
        assert_eq!(counted, 1);
        assert_eq!(engine.with(|e| e.store().saves.load(Ordering::SeqCst)).unwrap(), 1);
        assert_eq!(engine.snapshot().unwrap().current_streak, 1);
    }
}
