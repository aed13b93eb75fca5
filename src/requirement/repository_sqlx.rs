use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{AnyPool, Row};
use uuid::Uuid;

use crate::requirement::model::{DoctorCombination, DutyDay, RequirementTable};
use crate::requirement::repository::RequirementRepository;

/// SQLx-backed implementation of RequirementRepository.
///
/// The nested requirement table and the doctor set are stored as JSON text
/// and validated here, at the read boundary. Rows failing validation are
/// skipped with a warning so one bad combination cannot take down every
/// resolution.
pub struct SqlxRequirementRepository {
    pool: AnyPool,
}

impl SqlxRequirementRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequirementRepository for SqlxRequirementRepository {
    async fn fetch_combinations(&self) -> anyhow::Result<Vec<DoctorCombination>> {
        let rows = sqlx::query(
            r#"
SELECT combination_id, doctors_json, night_shift, total_required, required_json
FROM doctor_combinations;
"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::new();
        for r in rows {
            match row_to_combination(&r) {
                Ok(c) => out.push(c),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed doctor combination row");
                }
            }
        }

        Ok(out)
    }

    async fn fetch_duty_day(&self, date: NaiveDate) -> anyhow::Result<Option<DutyDay>> {
        let row = sqlx::query(
            r#"
SELECT date, doctors_json, night_shift
FROM duty_days
WHERE date = ?;
"#,
        )
        .bind(date.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => {
                let doctors: Vec<String> = serde_json::from_str(&r.get::<String, _>("doctors_json"))
                    .context("invalid doctors_json on duty day")?;
                Ok(Some(DutyDay {
                    date,
                    doctors: DoctorCombination::normalize_doctors(doctors),
                    night_shift: r.get::<i64, _>("night_shift") == 1,
                }))
            }
            None => Ok(None),
        }
    }
}

fn row_to_combination(r: &sqlx::any::AnyRow) -> anyhow::Result<DoctorCombination> {
    let id_str: String = r.get("combination_id");
    let combination_id = Uuid::parse_str(&id_str).context("invalid combination_id")?;

    let doctors: Vec<String> =
        serde_json::from_str(&r.get::<String, _>("doctors_json")).context("invalid doctors_json")?;

    let required: RequirementTable =
        serde_json::from_str(&r.get::<String, _>("required_json")).context("invalid required_json")?;

    let total_required = i64_to_u32(r.get("total_required"))?;

    required
        .validate(total_required)
        .map_err(|e| anyhow::anyhow!("requirement table failed validation: {e}"))?;

    Ok(DoctorCombination {
        combination_id,
        doctors: DoctorCombination::normalize_doctors(doctors),
        night_shift: r.get::<i64, _>("night_shift") == 1,
        total_required,
        required,
    })
}

fn i64_to_u32(v: i64) -> anyhow::Result<u32> {
    if v < 0 || v > u32::MAX as i64 {
        anyhow::bail!("out of range for u32: {v}");
    }
    Ok(v as u32)
}
