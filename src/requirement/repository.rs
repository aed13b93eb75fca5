use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::requirement::model::{DoctorCombination, DutyDay};

/// Read-only access to the admin-authored combination table and duty roster.
#[async_trait]
pub trait RequirementRepository: Send + Sync {
    async fn fetch_combinations(&self) -> Result<Vec<DoctorCombination>>;

    async fn fetch_duty_day(&self, date: NaiveDate) -> Result<Option<DutyDay>>;
}
