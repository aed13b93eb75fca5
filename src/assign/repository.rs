use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::assign::model::StaffAssignment;

#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Atomically replaces every assignment row for (schedule, date).
    /// Re-running the engine for a date is therefore idempotent.
    async fn replace_for_date(
        &self,
        schedule_id: &Uuid,
        date: NaiveDate,
        rows: &[StaffAssignment],
    ) -> Result<()>;

    async fn fetch_for_date(
        &self,
        schedule_id: &Uuid,
        date: NaiveDate,
    ) -> Result<Vec<StaffAssignment>>;
}
