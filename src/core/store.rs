//! Purpose: Own the running total and the sorted list behind a single lock.
//! Exports: `Store`, `StoreStats`.
//! Role: The only mutable state behind the virtual files; handlers share it by `Arc`.
//! Invariants: Every operation runs under the one mutex; no second lock is ever taken.
//! Invariants: A failed operation leaves both the total and the list unchanged.
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tracing::debug;

use crate::core::error::{Error, ErrorKind};
use crate::core::sorted::SortedList;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct StoreStats {
    pub total: i64,
    pub len: usize,
}

#[derive(Debug, Default)]
struct State {
    total: i64,
    sorted: SortedList,
}

#[derive(Debug, Default)]
pub struct Store {
    state: Mutex<State>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_to_total(&self, delta: i64) -> Result<i64, Error> {
        let mut state = self.lock()?;
        let total = state.total.checked_add(delta).ok_or_else(|| {
            Error::new(ErrorKind::CapacityExceeded)
                .with_message(format!("adding {delta} would overflow the running total"))
        })?;
        state.total = total;
        Ok(total)
    }

    pub fn read_total(&self) -> Result<i64, Error> {
        Ok(self.lock()?.total)
    }

    pub fn insert_sorted(&self, value: i64) -> Result<(), Error> {
        let index = self.lock()?.sorted.insert(value)?;
        debug!(value, index, "inserted into sorted list");
        Ok(())
    }

    pub fn render_sorted(&self) -> Result<Vec<i64>, Error> {
        Ok(self.lock()?.sorted.snapshot())
    }

    pub fn stats(&self) -> Result<StoreStats, Error> {
        let state = self.lock()?;
        Ok(StoreStats {
            total: state.total,
            len: state.sorted.len(),
        })
    }

    pub fn reset(&self) -> Result<(), Error> {
        let mut state = self.lock()?;
        state.total = 0;
        state.sorted.release();
        Ok(())
    }

    /// Releases every list node, returning how many were held.
    ///
    /// Runs even on a poisoned lock since nothing can observe the state after.
    pub fn teardown(&self) -> usize {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.total = 0;
        state.sorted.release()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, Error> {
        self.state.lock().map_err(|_| {
            Error::new(ErrorKind::Internal).with_message("store lock poisoned")
        })
    }
}
