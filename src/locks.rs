use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;

/// Per-date exclusivity for batch operations (auto-assignment, on-hold
/// reconciliation, monthly fairness application).
///
/// Batch operations must not run concurrently with themselves for the same
/// date; different dates may proceed in parallel. This is an in-process
/// convenience only: batch entry points are administrator actions, and their
/// effects are idempotent/replace-semantics so an accidental rerun is safe.
#[derive(Clone, Default)]
pub struct DateLocks {
    inner: Arc<Mutex<HashMap<NaiveDate, Arc<tokio::sync::Mutex<()>>>>>,
}

impl DateLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_date(&self, date: NaiveDate) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock();
        // Drop entries no caller holds anymore, so a long-running process
        // does not accumulate one mutex per date ever touched.
        map.retain(|d, lock| *d == date || Arc::strong_count(lock) > 1);
        map.entry(date).or_default().clone()
    }
}
