//! On-hold reconciliation.
//!
//! Re-evaluates held applications whenever capacity may have grown
//! (cancellation, rejection of a competitor, a redeployed requirement
//! table). Never triggered speculatively on events that could shrink
//! capacity.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::NaiveDate;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::LeaveError;
use crate::leave::model::LeaveStatus;
use crate::leave::repository::LeaveRepository;
use crate::locks::DateLocks;
use crate::metrics::counters::Counters;
use crate::notify::{LeaveOutcomeEvent, Notifier, notify_best_effort};
use crate::requirement::RequirementService;
use crate::time::now_ms;

#[derive(Clone, Debug, Default)]
pub struct ReconcileReport {
    pub promoted: Vec<Uuid>,
    pub still_held: u32,
}

pub struct Reconciler {
    leaves: Arc<dyn LeaveRepository>,
    requirements: Arc<RequirementService>,
    notifier: Arc<dyn Notifier>,
    locks: DateLocks,
    counters: Counters,
}

impl Reconciler {
    pub fn new(
        leaves: Arc<dyn LeaveRepository>,
        requirements: Arc<RequirementService>,
        notifier: Arc<dyn Notifier>,
        locks: DateLocks,
        counters: Counters,
    ) -> Self {
        Self {
            leaves,
            requirements,
            notifier,
            locks,
            counters,
        }
    }

    /// Re-runs the slot allocator over every ON_HOLD application for `date`
    /// in original submission order, promoting while capacity remains.
    ///
    /// Idempotent: with no intervening mutation a second run promotes
    /// nothing further and partitions identically.
    #[instrument(skip(self), target = "reconcile", fields(date = %date))]
    pub async fn reconcile(&self, date: NaiveDate) -> Result<ReconcileReport, LeaveError> {
        let lock = self.locks.for_date(date);
        let _exclusive = lock.lock().await;

        let requirement = self.requirements.daily(date).await?;
        let held = self.leaves.fetch_on_hold(date).await?;

        if held.is_empty() {
            debug!("no held applications for date");
            return Ok(ReconcileReport::default());
        }

        // Per-category running confirmed count, seeded from fresh counts.
        let mut budgets: HashMap<String, (u32, u32)> = HashMap::new();
        let mut report = ReconcileReport::default();

        for h in held {
            let category = h.category.clone();

            let (confirmed, allowed) = match budgets.get(&category) {
                Some(&b) => b,
                None => {
                    let required = requirement.required.required_for_category(&category);
                    let counts = self.leaves.slot_counts(date, &category, required).await?;
                    let b = (counts.confirmed, counts.allowed_absences());
                    budgets.insert(category.clone(), b);
                    b
                }
            };

            if confirmed < allowed {
                self.leaves
                    .update_status(
                        &h.application.application_id,
                        LeaveStatus::Confirmed,
                        None,
                        now_ms(),
                    )
                    .await?;

                budgets.insert(category, (confirmed + 1, allowed));
                report.promoted.push(h.application.application_id);
                self.counters.reconcile_promoted.fetch_add(1, Ordering::Relaxed);

                notify_best_effort(
                    self.notifier.as_ref(),
                    LeaveOutcomeEvent {
                        staff_id: h.application.staff_id,
                        date,
                        leave_type: h.application.leave_type,
                        outcome: LeaveStatus::Confirmed,
                    },
                )
                .await;
            } else {
                report.still_held += 1;
            }
        }

        info!(
            promoted = report.promoted.len(),
            still_held = report.still_held,
            "reconciliation complete"
        );

        Ok(report)
    }
}
