use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::assign::model::StaffAssignment;
use crate::fairness::FairnessScores;

/// One month's fairness delta for one staff member.
#[derive(Clone, Debug)]
pub struct MonthlyDelta {
    pub staff_id: Uuid,
    pub schedule_id: Uuid,
    pub delta: FairnessScores,
    /// ANNUAL days consumed under this schedule.
    pub annual_days: u32,
}

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Deployed assignment rows for a schedule.
    async fn fetch_schedule_assignments(&self, schedule_id: &Uuid) -> Result<Vec<StaffAssignment>>;

    /// Appends one monthly entry and folds it into the staff row's
    /// materialized totals, atomically. Returns false (and changes nothing)
    /// when an entry for (staff, schedule) already exists, so totals move at
    /// most once per deployed schedule.
    async fn append_monthly(&self, delta: &MonthlyDelta, now_ms: u64) -> Result<bool>;

    /// Appends an audited reset entry and zeroes the staff row's totals.
    async fn append_reset(&self, staff_id: &Uuid, now_ms: u64) -> Result<()>;
}
