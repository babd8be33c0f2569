//! Per-date write serialization
//!
//! Version assignment reads `max(version)` and then writes rows at that
//! version (or `max + 1` for a rebuild). Two writers on the same date would
//! race, so every build acquires the lock of each date it touches first.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lazily created async mutex per calendar date.
#[derive(Debug, Default)]
pub struct DateLocks {
    locks: Mutex<HashMap<NaiveDate, Arc<AsyncMutex<()>>>>,
}

impl DateLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `date`.
    pub async fn lock(&self, date: NaiveDate) -> OwnedMutexGuard<()> {
        self.handle(date).lock_owned().await
    }

    /// Lock several dates. Acquisition follows ascending date order, which
    /// keeps concurrent multi-date builds deadlock-free.
    pub async fn lock_all(&self, dates: &BTreeSet<NaiveDate>) -> Vec<OwnedMutexGuard<()>> {
        let mut guards = Vec::with_capacity(dates.len());
        for date in dates {
            guards.push(self.lock(*date).await);
        }
        guards
    }

    /// Number of dates that have been locked at least once.
    pub fn tracked_dates(&self) -> usize {
        self.locks.lock().len()
    }

    fn handle(&self, date: NaiveDate) -> Arc<AsyncMutex<()>> {
        Arc::clone(self.locks.lock().entry(date).or_default())
    }
}
