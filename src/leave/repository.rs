use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::LeaveError;
use crate::leave::model::{LeaveApplication, LeaveStatus, LeaveType, StatusReason};
use crate::leave::slots::{SlotCounts, SlotPolicy};
use crate::staff::model::Staff;

/// An ON_HOLD application joined with its applicant's category.
#[derive(Clone, Debug)]
pub struct HeldApplication {
    pub application: LeaveApplication,
    pub category: String,
}

#[async_trait]
pub trait LeaveRepository: Send + Sync {
    /// The submission critical section: duplicate check, fresh slot counts
    /// and the insert execute as one transaction, so two concurrent
    /// submissions for the last slot cannot both observe capacity.
    ///
    /// Serialization failures surface as [`LeaveError::Conflict`].
    async fn submit_in_txn(
        &self,
        staff: &Staff,
        date: NaiveDate,
        leave_type: LeaveType,
        required: u32,
        policy: &SlotPolicy,
        now_ms: u64,
    ) -> Result<LeaveApplication, LeaveError>;

    /// Administrator force-confirm. Bypasses the fairness gate and capacity
    /// checks, but never the duplicate invariant.
    async fn insert_confirmed(
        &self,
        staff_id: &Uuid,
        date: NaiveDate,
        leave_type: LeaveType,
        now_ms: u64,
    ) -> Result<LeaveApplication, LeaveError>;

    async fn fetch_by_id(
        &self,
        application_id: &Uuid,
    ) -> Result<Option<LeaveApplication>, LeaveError>;

    /// Fresh counts for one (date, category) pair.
    async fn slot_counts(
        &self,
        date: NaiveDate,
        category: &str,
        required: u32,
    ) -> Result<SlotCounts, LeaveError>;

    /// ON_HOLD applications for a date in original submission order.
    async fn fetch_on_hold(&self, date: NaiveDate) -> Result<Vec<HeldApplication>, LeaveError>;

    /// Live ANNUAL applications for a staff member within a calendar year
    /// that no deployed schedule has consumed yet. Days folded into
    /// `annual_used` by the fairness ledger must not be counted again.
    async fn count_live_annual(&self, staff_id: &Uuid, year: i32) -> Result<u32, LeaveError>;

    async fn update_status(
        &self,
        application_id: &Uuid,
        status: LeaveStatus,
        reason: Option<StatusReason>,
        reviewed_ms: u64,
    ) -> Result<(), LeaveError>;

    /// CONFIRMED applications for a date (auto-assignment exclusions).
    async fn confirmed_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<LeaveApplication>, LeaveError>;
}
