//! The leave application state machine.
//!
//! This is the single canonical submission path: every request, staff
//! self-service or admin-entered, flows through [`LeaveService::submit`] so
//! there is exactly one consistency story. The sequence is:
//!   1. Eligibility gates outside the transaction (staff lookup, fairness
//!      threshold, annual balance) — cheap rejections with no writes.
//!   2. The critical section inside one transaction (duplicate check, fresh
//!      slot counts, insert), owned by the repository.
//!   3. Fire-and-forget notification of the outcome.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::LeaveError;
use crate::leave::model::{LeaveApplication, LeaveStatus, LeaveType, StatusReason};
use crate::leave::reconcile::Reconciler;
use crate::leave::repository::LeaveRepository;
use crate::leave::slots::SlotPolicy;
use crate::logger::warn_if_slow;
use crate::metrics::counters::Counters;
use crate::notify::{LeaveOutcomeEvent, Notifier, notify_best_effort};
use crate::requirement::RequirementService;
use crate::staff::model::Staff;
use crate::staff::repository::StaffRepository;
use crate::time::now_ms;

/// Fairness-threshold gate. ANNUAL uses a lower (more permissive) floor than
/// OFF: annual leave is an entitlement, OFF is discretionary.
#[derive(Clone, Copy, Debug)]
pub struct GatePolicy {
    pub annual_floor: f64,
    pub off_floor: f64,
}

impl GatePolicy {
    fn floor(&self, leave_type: LeaveType) -> f64 {
        match leave_type {
            LeaveType::Annual => self.annual_floor,
            LeaveType::Off => self.off_floor,
        }
    }
}

/// Transparent retry policy for serialization conflicts.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

/// Read-only capacity view for one category on one date.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryCapacity {
    pub category: String,
    pub required: u32,
    pub allowed: u32,
    pub confirmed: u32,
    pub pending: u32,
    pub on_hold: u32,
}

#[derive(Clone, Debug)]
pub struct DayCapacity {
    pub date: NaiveDate,
    pub config_gap: bool,
    pub categories: Vec<CategoryCapacity>,
}

pub struct LeaveService {
    staff: Arc<dyn StaffRepository>,
    leaves: Arc<dyn LeaveRepository>,
    requirements: Arc<RequirementService>,
    reconciler: Arc<Reconciler>,
    notifier: Arc<dyn Notifier>,
    slot_policy: SlotPolicy,
    gate: GatePolicy,
    retry: RetryPolicy,
    counters: Counters,
}

impl LeaveService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        staff: Arc<dyn StaffRepository>,
        leaves: Arc<dyn LeaveRepository>,
        requirements: Arc<RequirementService>,
        reconciler: Arc<Reconciler>,
        notifier: Arc<dyn Notifier>,
        cfg: &AppConfig,
        counters: Counters,
    ) -> Self {
        Self {
            staff,
            leaves,
            requirements,
            reconciler,
            notifier,
            slot_policy: SlotPolicy {
                hold_queue_depth: cfg.hold_queue_depth,
            },
            gate: GatePolicy {
                annual_floor: cfg.annual_fairness_floor,
                off_floor: cfg.off_fairness_floor,
            },
            retry: RetryPolicy {
                attempts: cfg.submit_retry_attempts,
                backoff: Duration::from_millis(cfg.submit_retry_backoff_ms),
            },
            counters,
        }
    }

    /// Submits a leave request and resolves its initial state synchronously.
    ///
    /// Slot overflow persists a REJECTED application and then surfaces as
    /// [`LeaveError::SlotOverflow`] so the caller can distinguish "rejected"
    /// from "held". A CONFIRMED or ON_HOLD outcome is returned as the stored
    /// application.
    #[instrument(skip(self), target = "leave", fields(staff_id = %staff_id, date = %date))]
    pub async fn submit(
        &self,
        staff_id: Uuid,
        date: NaiveDate,
        leave_type: LeaveType,
    ) -> Result<LeaveApplication, LeaveError> {
        let staff = self.load_eligible_staff(&staff_id).await?;

        // Gate 1: fairness threshold.
        let score = staff.fairness.overall();
        let floor = self.gate.floor(leave_type);
        if score < floor {
            self.counters.gate_fairness.fetch_add(1, Ordering::Relaxed);
            debug!(score, floor, "fairness gate rejected submission");
            return Err(LeaveError::FairnessBelowThreshold);
        }

        // Gate 2: annual balance.
        if leave_type == LeaveType::Annual {
            let live = self.leaves.count_live_annual(&staff_id, date.year()).await?;
            if staff.annual_remaining(live) <= 0 {
                self.counters
                    .gate_annual_exhausted
                    .fetch_add(1, Ordering::Relaxed);
                return Err(LeaveError::AnnualExhausted);
            }
        }

        // Resolve required headcount for the applicant's category. A
        // configuration gap degrades to required = 0 (permissive) and is
        // surfaced as a data-quality warning, never a block.
        let requirement = self.requirements.daily(date).await?;
        if requirement.config_gap {
            self.counters.config_gaps.fetch_add(1, Ordering::Relaxed);
            warn!("capacity computed against a configuration gap (required = 0)");
        }
        let required = requirement.required.required_for_category(&staff.category);

        let application = warn_if_slow(
            "leave_submit_txn",
            Duration::from_millis(250),
            self.submit_with_retry(&staff, date, leave_type, required),
        )
        .await?;

        match application.status {
            LeaveStatus::Confirmed => {
                self.counters.submit_confirmed.fetch_add(1, Ordering::Relaxed);
            }
            LeaveStatus::OnHold => {
                self.counters.submit_held.fetch_add(1, Ordering::Relaxed);
            }
            LeaveStatus::Rejected => {
                self.counters.submit_overflow.fetch_add(1, Ordering::Relaxed);
            }
            LeaveStatus::Pending => {}
        }

        if matches!(application.status, LeaveStatus::Confirmed | LeaveStatus::OnHold) {
            notify_best_effort(
                self.notifier.as_ref(),
                LeaveOutcomeEvent {
                    staff_id,
                    date,
                    leave_type,
                    outcome: application.status,
                },
            )
            .await;
        }

        info!(
            application_id = %application.application_id,
            status = application.status.as_str(),
            "leave application decided"
        );

        if application.status == LeaveStatus::Rejected {
            return Err(LeaveError::SlotOverflow);
        }

        Ok(application)
    }

    /// Administrator-entered application with a forced CONFIRMED status.
    /// Bypasses the fairness gate and capacity, not the duplicate invariant.
    #[instrument(skip(self), target = "leave", fields(staff_id = %staff_id, date = %date))]
    pub async fn force_confirm(
        &self,
        staff_id: Uuid,
        date: NaiveDate,
        leave_type: LeaveType,
    ) -> Result<LeaveApplication, LeaveError> {
        // Still refuse unknown/inactive staff.
        let _ = self.load_eligible_staff(&staff_id).await?;

        let application = self
            .leaves
            .insert_confirmed(&staff_id, date, leave_type, now_ms())
            .await?;

        info!(application_id = %application.application_id, "application force-confirmed by admin");
        Ok(application)
    }

    /// Cancels an application (transition to REJECTED).
    ///
    /// Staff may cancel their own PENDING or ON_HOLD requests; cancelling a
    /// CONFIRMED request is an administrative action and frees capacity, so
    /// it triggers on-hold reconciliation for the date.
    #[instrument(skip(self), target = "leave", fields(application_id = %application_id))]
    pub async fn cancel(
        &self,
        application_id: Uuid,
        by_admin: bool,
    ) -> Result<LeaveApplication, LeaveError> {
        let application = self
            .leaves
            .fetch_by_id(&application_id)
            .await?
            .ok_or_else(|| LeaveError::Validation("unknown application".to_string()))?;

        if !application.status.can_transition_to(LeaveStatus::Rejected) {
            return Err(LeaveError::Validation(
                "application is already terminal".to_string(),
            ));
        }

        let was_confirmed = application.status == LeaveStatus::Confirmed;
        if was_confirmed && !by_admin {
            return Err(LeaveError::Validation(
                "confirmed leave can only be cancelled by an administrator".to_string(),
            ));
        }

        let reason = if by_admin {
            StatusReason::AdminCancelled
        } else {
            StatusReason::Cancelled
        };
        let reviewed_ms = now_ms();

        self.leaves
            .update_status(&application_id, LeaveStatus::Rejected, Some(reason), reviewed_ms)
            .await?;

        info!(reason = reason.as_str(), "application cancelled");

        // Cancellation of reserved capacity can only increase availability;
        // re-evaluate the hold queue for that date.
        if was_confirmed {
            self.reconciler.reconcile(application.date).await?;
        }

        Ok(LeaveApplication {
            status: LeaveStatus::Rejected,
            reason: Some(reason),
            reviewed_ms: Some(reviewed_ms),
            ..application
        })
    }

    /// Read-only per-date, per-category slot status for a date range.
    #[instrument(skip(self), target = "leave")]
    pub async fn capacity_status(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DayCapacity>, LeaveError> {
        let categories: BTreeSet<String> = self
            .staff
            .fetch_active()
            .await?
            .into_iter()
            .map(|s| s.category)
            .collect();

        let mut out = Vec::new();
        let mut date = from;
        while date <= to {
            let requirement = self.requirements.daily(date).await?;

            let mut day = DayCapacity {
                date,
                config_gap: requirement.config_gap,
                categories: Vec::new(),
            };

            for category in &categories {
                let required = requirement.required.required_for_category(category);
                let counts = self.leaves.slot_counts(date, category, required).await?;
                day.categories.push(CategoryCapacity {
                    category: category.clone(),
                    required,
                    allowed: counts.allowed_absences(),
                    confirmed: counts.confirmed,
                    pending: counts.pending,
                    on_hold: counts.on_hold,
                });
            }

            out.push(day);
            date = date.succ_opt().ok_or_else(|| {
                LeaveError::Validation("date range exceeds calendar bounds".to_string())
            })?;
        }

        Ok(out)
    }

    async fn load_eligible_staff(&self, staff_id: &Uuid) -> Result<Staff, LeaveError> {
        let staff = self
            .staff
            .fetch_by_id(staff_id)
            .await?
            .ok_or_else(|| LeaveError::Staff("unknown staff member".to_string()))?;

        if !staff.active {
            return Err(LeaveError::Staff("staff member is deactivated".to_string()));
        }

        Ok(staff)
    }

    /// Runs the transactional critical section, retrying transparently on
    /// serialization conflicts. Each retry re-reads counts inside its own
    /// transaction, so the loser of a race is re-evaluated with fresh state.
    async fn submit_with_retry(
        &self,
        staff: &Staff,
        date: NaiveDate,
        leave_type: LeaveType,
        required: u32,
    ) -> Result<LeaveApplication, LeaveError> {
        let mut attempt = 0;
        loop {
            match self
                .leaves
                .submit_in_txn(staff, date, leave_type, required, &self.slot_policy, now_ms())
                .await
            {
                Err(LeaveError::Conflict) if attempt < self.retry.attempts => {
                    attempt += 1;
                    self.counters
                        .submit_conflict_retries
                        .fetch_add(1, Ordering::Relaxed);
                    debug!(attempt, "submission conflict; retrying with fresh counts");
                    tokio::time::sleep(self.retry.backoff).await;
                }
                Err(LeaveError::Duplicate) => {
                    self.counters.submit_duplicate.fetch_add(1, Ordering::Relaxed);
                    return Err(LeaveError::Duplicate);
                }
                other => return other,
            }
        }
    }
}
