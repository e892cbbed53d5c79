//! Persistence seam for the streak record.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::state::StreakState;
use crate::error::StoreError;

/// Durable home of a [`StreakState`].
///
/// Implementations must write the whole record atomically so no reader can
/// observe a torn field set.
pub trait StreakStore {
    /// Load the saved record, `None` on first use.
    fn load_streak(&self) -> Result<Option<StreakState>, StoreError>;

    /// Replace the saved record.
    fn save_streak(&self, state: &StreakState) -> Result<(), StoreError>;
}

impl<T: StreakStore + ?Sized> StreakStore for &T {
    fn load_streak(&self) -> Result<Option<StreakState>, StoreError> {
        (**self).load_streak()
    }

    fn save_streak(&self, state: &StreakState) -> Result<(), StoreError> {
        (**self).save_streak(state)
    }
}

/// In-process store, mainly for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStreakStore {
    record: Mutex<Option<StreakState>>,
    unavailable: AtomicBool,
}

impl MemoryStreakStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent load and save fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// The last successfully saved record.
    pub fn saved(&self) -> Option<StreakState> {
        self.record.lock().ok().and_then(|r| r.clone())
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store marked unavailable".into()))
        } else {
            Ok(())
        }
    }
}

impl StreakStore for MemoryStreakStore {
    fn load_streak(&self) -> Result<Option<StreakState>, StoreError> {
        self.check()?;
        let record = self
            .record
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        Ok(record.clone())
    }

    fn save_streak(&self, state: &StreakState) -> Result<(), StoreError> {
        self.check()?;
        let mut record = self
            .record
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        *record = Some(state.clone());
        Ok(())
    }
}
