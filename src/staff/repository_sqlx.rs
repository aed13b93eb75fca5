use anyhow::Context;
use async_trait::async_trait;
use sqlx::{AnyPool, Row};
use uuid::Uuid;

use crate::fairness::FairnessScores;
use crate::staff::model::Staff;
use crate::staff::repository::StaffRepository;

const STAFF_COLUMNS: &str = r#"
  staff_id, name, category, department, active, flexible, flex_priority,
  annual_entitlement, annual_used,
  fair_total, fair_night, fair_weekend, fair_holiday, fair_holiday_adjacent
"#;

/// SQLx-backed implementation of StaffRepository.
/// Responsible only for persistence and row mapping.
pub struct SqlxStaffRepository {
    pool: AnyPool,
}

impl SqlxStaffRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StaffRepository for SqlxStaffRepository {
    async fn fetch_by_id(&self, staff_id: &Uuid) -> anyhow::Result<Option<Staff>> {
        let row = sqlx::query(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff WHERE staff_id = ?;"
        ))
        .bind(staff_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(row_to_staff(&r)?)),
            None => Ok(None),
        }
    }

    async fn fetch_active(&self) -> anyhow::Result<Vec<Staff>> {
        let rows = sqlx::query(&format!(
            "SELECT {STAFF_COLUMNS} FROM staff WHERE active = 1 ORDER BY staff_id;"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(collect_staff(rows))
    }
}

fn collect_staff(rows: Vec<sqlx::any::AnyRow>) -> Vec<Staff> {
    let mut out = Vec::new();
    for r in rows {
        match row_to_staff(&r) {
            Ok(s) => out.push(s),
            Err(e) => {
                // poison-row resilience: skip but don't fail the batch
                tracing::warn!(error = %e, "skipping malformed staff row");
            }
        }
    }
    out
}

pub(crate) fn row_to_staff(r: &sqlx::any::AnyRow) -> anyhow::Result<Staff> {
    let id_str: String = r.get("staff_id");
    let staff_id = Uuid::parse_str(&id_str).context("invalid staff_id")?;

    Ok(Staff {
        staff_id,
        name: r.get::<String, _>("name"),
        category: r.get::<String, _>("category"),
        department: r.get::<String, _>("department"),
        active: r.get::<i64, _>("active") == 1,
        flexible: r.get::<i64, _>("flexible") == 1,
        flex_priority: r.get::<i64, _>("flex_priority"),
        annual_entitlement: i64_to_u32(r.get("annual_entitlement"))?,
        annual_used: i64_to_u32(r.get("annual_used"))?,
        fairness: FairnessScores {
            total: r.get::<f64, _>("fair_total"),
            night: r.get::<f64, _>("fair_night"),
            weekend: r.get::<f64, _>("fair_weekend"),
            holiday: r.get::<f64, _>("fair_holiday"),
            holiday_adjacent: r.get::<f64, _>("fair_holiday_adjacent"),
        },
    })
}

fn i64_to_u32(v: i64) -> anyhow::Result<u32> {
    if v < 0 || v > u32::MAX as i64 {
        anyhow::bail!("out of range for u32: {v}");
    }
    Ok(v as u32)
}
