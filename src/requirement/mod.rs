pub mod model;
pub mod repository;
pub mod repository_sqlx;
pub mod resolver;

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::warn;

use crate::requirement::model::DailyRequirement;
use crate::requirement::repository::RequirementRepository;
use crate::requirement::resolver::RequirementResolver;

/// Resolves a calendar date to its staffing requirement via the duty roster
/// and the admin-authored combination table.
pub struct RequirementService {
    repo: Arc<dyn RequirementRepository>,
}

impl RequirementService {
    pub fn new(repo: Arc<dyn RequirementRepository>) -> Self {
        Self { repo }
    }

    pub async fn daily(&self, date: NaiveDate) -> Result<DailyRequirement> {
        let combinations = self.repo.fetch_combinations().await?;
        let resolver = RequirementResolver::new(combinations);

        match self.repo.fetch_duty_day(date).await? {
            Some(duty) => Ok(resolver.resolve(date, &duty.doctors, duty.night_shift)),
            None => {
                // No roster row is the same data-quality problem as a missing
                // combination: required staffing degrades to zero and the gap
                // is surfaced, never trusted silently.
                warn!(%date, "no duty roster entry for date");
                Ok(DailyRequirement::unstaffed(date, Vec::new(), false))
            }
        }
    }
}
