use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::AnyPool;
use uuid::Uuid;

use crate::assign::model::StaffAssignment;
use crate::assign::repository::AssignmentRepository;

/// SQLx-backed implementation of AssignmentRepository.
pub struct SqlxAssignmentRepository {
    pool: AnyPool,
}

impl SqlxAssignmentRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssignmentRepository for SqlxAssignmentRepository {
    async fn replace_for_date(
        &self,
        schedule_id: &Uuid,
        date: NaiveDate,
        rows: &[StaffAssignment],
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"DELETE FROM staff_assignments WHERE schedule_id = ? AND date = ?;"#,
        )
        .bind(schedule_id.to_string())
        .bind(date.to_string())
        .execute(&mut *tx)
        .await?;

        for a in rows {
            sqlx::query(
                r#"
INSERT INTO staff_assignments
  (assignment_id, schedule_id, staff_id, date, shift, application_id)
VALUES (?, ?, ?, ?, ?, ?);
"#,
            )
            .bind(a.assignment_id.to_string())
            .bind(a.schedule_id.to_string())
            .bind(a.staff_id.to_string())
            .bind(a.date.to_string())
            .bind(a.shift.as_str())
            .bind(a.application_id.map(|id| id.to_string()))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn fetch_for_date(
        &self,
        schedule_id: &Uuid,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<StaffAssignment>> {
        let rows = sqlx::query(
            r#"
SELECT assignment_id, schedule_id, staff_id, date, shift, application_id
FROM staff_assignments
WHERE schedule_id = ? AND date = ?
ORDER BY staff_id;
"#,
        )
        .bind(schedule_id.to_string())
        .bind(date.to_string())
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
}

pub(crate) fn row_to_assignment(r: &sqlx::any::AnyRow) -> anyhow::Result<StaffAssignment> {
    use anyhow::Context;
    use sqlx::Row;

    use crate::assign::model::ShiftType;

    let id: String = r.get("assignment_id");
    let schedule: String = r.get("schedule_id");
    let staff: String = r.get("staff_id");
    let date: String = r.get("date");
    let shift: String = r.get("shift");
    let application: Option<String> = r.get("application_id");

    Ok(StaffAssignment {
        assignment_id: Uuid::parse_str(&id).context("invalid assignment_id")?,
        schedule_id: Uuid::parse_str(&schedule).context("invalid schedule_id")?,
        staff_id: Uuid::parse_str(&staff).context("invalid staff_id")?,
        date: date.parse().context("invalid assignment date")?,
        shift: ShiftType::parse(&shift)
            .ok_or_else(|| anyhow::anyhow!("unknown shift type: {shift}"))?,
        application_id: match application {
            Some(s) => Some(Uuid::parse_str(&s).context("invalid application_id")?),
            None => None,
        },
    })
}
