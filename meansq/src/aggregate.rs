use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Distinct values submitted by every client, shared by all sessions and
/// the snapshot scheduler.
#[derive(Debug, Default)]
pub struct Aggregate {
    members: Mutex<Members>,
}

#[derive(Debug, Default)]
struct Members {
    values: BTreeSet<i32>,
    // i32::MIN squared is 2^62, so this cannot overflow for any set of i32.
    sum_of_squares: i128,
}

impl Members {
    fn mean_of_squares(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.sum_of_squares as f64 / self.values.len() as f64
        }
    }
}

impl Aggregate {
    pub fn new() -> Aggregate {
        Aggregate::default()
    }

    /// Inserts `value` and returns the mean of squares of the resulting set.
    ///
    /// Insertion and computation happen under one lock, so the result
    /// reflects exactly the membership right after this insert.
    pub fn observe(&self, value: i32) -> f64 {
        let mut members = self.lock();
        if members.values.insert(value) {
            members.sum_of_squares += i128::from(value) * i128::from(value);
        }
        members.mean_of_squares()
    }

    /// Current mean of squares; `0.0` while empty.
    pub fn mean_of_squares(&self) -> f64 {
        self.lock().mean_of_squares()
    }

    /// Point-in-time copy of the membership in ascending order.
    ///
    /// The lock is held only while copying.
    pub fn snapshot(&self) -> Vec<i32> {
        self.lock().values.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().values.is_empty()
    }

    // Neither insert nor the arithmetic can panic halfway, so a poisoned
    // lock still guards a consistent set.
    fn lock(&self) -> MutexGuard<'_, Members> {
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
