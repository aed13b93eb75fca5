use async_trait::async_trait;
use sqlx::{AnyPool, Row};
use uuid::Uuid;

use crate::assign::model::StaffAssignment;
use crate::assign::repository_sqlx::row_to_assignment;
use crate::fairness::repository::{LedgerRepository, MonthlyDelta};
use crate::fairness::FairnessScores;

/// SQLx-backed implementation of LedgerRepository.
pub struct SqlxLedgerRepository {
    pool: AnyPool,
}

impl SqlxLedgerRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerRepository for SqlxLedgerRepository {
    async fn fetch_schedule_assignments(
        &self,
        schedule_id: &Uuid,
    ) -> anyhow::Result<Vec<StaffAssignment>> {
        let rows = sqlx::query(
            r#"
SELECT assignment_id, schedule_id, staff_id, date, shift, application_id
FROM staff_assignments
WHERE schedule_id = ?;
"#,
        )
        .bind(schedule_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::new();
        for r in rows {
            match row_to_assignment(&r) {
                Ok(a) => out.push(a),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed assignment row");
                }
            }
        }
        Ok(out)
    }

    async fn append_monthly(&self, delta: &MonthlyDelta, now_ms: u64) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        // The unique (staff_id, schedule_id) constraint makes this the
        // exactly-once guard: a second deployment run inserts nothing and
        // must not touch the materialized totals.
        let res = sqlx::query(
            r#"
INSERT INTO fairness_entries
  (entry_id, staff_id, schedule_id, kind,
   d_total, d_night, d_weekend, d_holiday, d_holiday_adjacent,
   annual_days, applied_ms)
VALUES (?, ?, ?, 'monthly', ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT (staff_id, schedule_id) DO NOTHING;
"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(delta.staff_id.to_string())
        .bind(delta.schedule_id.to_string())
        .bind(delta.delta.total)
        .bind(delta.delta.night)
        .bind(delta.delta.weekend)
        .bind(delta.delta.holiday)
        .bind(delta.delta.holiday_adjacent)
        .bind(delta.annual_days as i64)
        .bind(now_ms as i64)
        .execute(&mut *tx)
        .await?;

        if res.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
UPDATE staff
SET fair_total = fair_total + ?,
    fair_night = fair_night + ?,
    fair_weekend = fair_weekend + ?,
    fair_holiday = fair_holiday + ?,
    fair_holiday_adjacent = fair_holiday_adjacent + ?,
    annual_used = annual_used + ?
WHERE staff_id = ?;
"#,
        )
        .bind(delta.delta.total)
        .bind(delta.delta.night)
        .bind(delta.delta.weekend)
        .bind(delta.delta.holiday)
        .bind(delta.delta.holiday_adjacent)
        .bind(delta.annual_days as i64)
        .bind(delta.staff_id.to_string())
        .execute(&mut *tx)
        .await?;

        // The ANNUAL days just folded into annual_used came from this
        // schedule's mirrored assignments. Mark their applications consumed
        // so the balance gate stops counting them as live.
        sqlx::query(
            r#"
UPDATE leave_applications
SET consumed_ms = ?
WHERE consumed_ms IS NULL
  AND application_id IN (
    SELECT application_id FROM staff_assignments
    WHERE schedule_id = ? AND staff_id = ? AND shift = 'annual'
      AND application_id IS NOT NULL
  );
"#,
        )
        .bind(now_ms as i64)
        .bind(delta.schedule_id.to_string())
        .bind(delta.staff_id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn append_reset(&self, staff_id: &Uuid, now_ms: u64) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
SELECT fair_total, fair_night, fair_weekend, fair_holiday, fair_holiday_adjacent
FROM staff WHERE staff_id = ?;
"#,
        )
        .bind(staff_id.to_string())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| anyhow::anyhow!("unknown staff member: {staff_id}"))?;

        let current = FairnessScores {
            total: row.get::<f64, _>("fair_total"),
            night: row.get::<f64, _>("fair_night"),
            weekend: row.get::<f64, _>("fair_weekend"),
            holiday: row.get::<f64, _>("fair_holiday"),
            holiday_adjacent: row.get::<f64, _>("fair_holiday_adjacent"),
        };

        // The reset entry carries the negated totals, so replaying the
        // ledger still reproduces the materialized state.
        let undo = current.negated();

        sqlx::query(
            r#"
INSERT INTO fairness_entries
  (entry_id, staff_id, schedule_id, kind,
   d_total, d_night, d_weekend, d_holiday, d_holiday_adjacent,
   annual_days, applied_ms)
VALUES (?, ?, NULL, 'reset', ?, ?, ?, ?, ?, 0, ?);
"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(staff_id.to_string())
        .bind(undo.total)
        .bind(undo.night)
        .bind(undo.weekend)
        .bind(undo.holiday)
        .bind(undo.holiday_adjacent)
        .bind(now_ms as i64)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
UPDATE staff
SET fair_total = 0, fair_night = 0, fair_weekend = 0,
    fair_holiday = 0, fair_holiday_adjacent = 0
WHERE staff_id = ?;
"#,
        )
        .bind(staff_id.to_string())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
