use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{AnyPool, Row};
use uuid::Uuid;

use crate::error::LeaveError;
use crate::leave::model::{LeaveApplication, LeaveStatus, LeaveType, StatusReason};
use crate::leave::repository::{HeldApplication, LeaveRepository};
use crate::leave::slots::{self, SlotCounts, SlotDecision, SlotPolicy};
use crate::staff::model::Staff;

/// SQLx-backed implementation of LeaveRepository.
///
/// The transactional store is the serialization authority: multiple server
/// instances may submit concurrently, so no in-process lock is relied upon.
/// A partial unique index on live (staff, date) pairs backstops the
/// duplicate invariant even if a check is ever bypassed.
pub struct SqlxLeaveRepository {
    pool: AnyPool,
}

impl SqlxLeaveRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeaveRepository for SqlxLeaveRepository {
    async fn submit_in_txn(
        &self,
        staff: &Staff,
        date: NaiveDate,
        leave_type: LeaveType,
        required: u32,
        policy: &SlotPolicy,
        now_ms: u64,
    ) -> Result<LeaveApplication, LeaveError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        // The count-then-insert below is only safe if no concurrent
        // transaction can count the same free slot. SQLite's single writer
        // gives that for free; Postgres defaults to READ COMMITTED and must
        // be upgraded (serialization failures map to the retryable Conflict).
        if let Some(stmt) = isolation_upgrade_stmt(tx.backend_name()) {
            sqlx::query(stmt).execute(&mut *tx).await.map_err(map_sqlx)?;
        }

        // Duplicate invariant: at most one live application per (staff, date).
        let dup = sqlx::query(
            r#"
SELECT COUNT(*) AS n FROM leave_applications
WHERE staff_id = ? AND date = ? AND status != 'rejected';
"#,
        )
        .bind(staff.staff_id.to_string())
        .bind(date.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        if dup.get::<i64, _>("n") > 0 {
            return Err(LeaveError::Duplicate);
        }

        let counts = slot_counts_tx(&mut tx, date, &staff.category, required).await?;
        let decision = slots::decide(&counts, policy);

        let (status, reason, reviewed_ms) = match decision {
            SlotDecision::Confirm => (LeaveStatus::Confirmed, None, Some(now_ms)),
            SlotDecision::Hold => (LeaveStatus::OnHold, Some(StatusReason::CapacityHeld), None),
            SlotDecision::Reject => (
                LeaveStatus::Rejected,
                Some(StatusReason::SlotOverflow),
                Some(now_ms),
            ),
        };

        let application = LeaveApplication {
            application_id: Uuid::new_v4(),
            staff_id: staff.staff_id,
            date,
            leave_type,
            status,
            reason,
            submitted_ms: now_ms,
            reviewed_ms,
        };

        insert_application(&mut tx, &application).await?;

        tx.commit().await.map_err(map_sqlx)?;

        Ok(application)
    }

    async fn insert_confirmed(
        &self,
        staff_id: &Uuid,
        date: NaiveDate,
        leave_type: LeaveType,
        now_ms: u64,
    ) -> Result<LeaveApplication, LeaveError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let dup = sqlx::query(
            r#"
SELECT COUNT(*) AS n FROM leave_applications
WHERE staff_id = ? AND date = ? AND status != 'rejected';
"#,
        )
        .bind(staff_id.to_string())
        .bind(date.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        if dup.get::<i64, _>("n") > 0 {
            return Err(LeaveError::Duplicate);
        }

        let application = LeaveApplication {
            application_id: Uuid::new_v4(),
            staff_id: *staff_id,
            date,
            leave_type,
            status: LeaveStatus::Confirmed,
            reason: None,
            submitted_ms: now_ms,
            reviewed_ms: Some(now_ms),
        };

        insert_application(&mut tx, &application).await?;

        tx.commit().await.map_err(map_sqlx)?;

        Ok(application)
    }

    async fn fetch_by_id(
        &self,
        application_id: &Uuid,
    ) -> Result<Option<LeaveApplication>, LeaveError> {
        let row = sqlx::query(
            r#"
SELECT application_id, staff_id, date, leave_type, status, reason, submitted_ms, reviewed_ms
FROM leave_applications
WHERE application_id = ?;
"#,
        )
        .bind(application_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        match row {
            Some(r) => Ok(Some(row_to_application(&r)?)),
            None => Ok(None),
        }
    }

    async fn slot_counts(
        &self,
        date: NaiveDate,
        category: &str,
        required: u32,
    ) -> Result<SlotCounts, LeaveError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        let counts = slot_counts_tx(&mut tx, date, category, required).await?;
        tx.commit().await.map_err(map_sqlx)?;
        Ok(counts)
    }

    async fn fetch_on_hold(&self, date: NaiveDate) -> Result<Vec<HeldApplication>, LeaveError> {
        let rows = sqlx::query(
            r#"
SELECT la.application_id, la.staff_id, la.date, la.leave_type, la.status, la.reason,
       la.submitted_ms, la.reviewed_ms, s.category
FROM leave_applications la
JOIN staff s ON s.staff_id = la.staff_id
WHERE la.date = ? AND la.status = 'on_hold'
ORDER BY la.submitted_ms, la.application_id;
"#,
        )
        .bind(date.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        let mut out = Vec::new();
        for r in rows {
            out.push(HeldApplication {
                application: row_to_application(&r)?,
                category: r.get::<String, _>("category"),
            });
        }
        Ok(out)
    }

    async fn count_live_annual(&self, staff_id: &Uuid, year: i32) -> Result<u32, LeaveError> {
        let row = sqlx::query(
            r#"
SELECT COUNT(*) AS n FROM leave_applications
WHERE staff_id = ? AND leave_type = 'annual' AND status != 'rejected'
  AND consumed_ms IS NULL
  AND date >= ? AND date <= ?;
"#,
        )
        .bind(staff_id.to_string())
        .bind(format!("{year}-01-01"))
        .bind(format!("{year}-12-31"))
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(row.get::<i64, _>("n").max(0) as u32)
    }

    async fn update_status(
        &self,
        application_id: &Uuid,
        status: LeaveStatus,
        reason: Option<StatusReason>,
        reviewed_ms: u64,
    ) -> Result<(), LeaveError> {
        sqlx::query(
            r#"
UPDATE leave_applications
SET status = ?, reason = ?, reviewed_ms = ?
WHERE application_id = ?;
"#,
        )
        .bind(status.as_str())
        .bind(reason.map(|r| r.as_str()))
        .bind(u64_to_i64(reviewed_ms)?)
        .bind(application_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn confirmed_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<LeaveApplication>, LeaveError> {
        let rows = sqlx::query(
            r#"
SELECT application_id, staff_id, date, leave_type, status, reason, submitted_ms, reviewed_ms
FROM leave_applications
WHERE date = ? AND status = 'confirmed'
ORDER BY submitted_ms, application_id;
"#,
        )
        .bind(date.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        let mut out = Vec::new();
        for r in rows {
            out.push(row_to_application(&r)?);
        }
        Ok(out)
    }
}

/// Statement that lifts the submission transaction to SERIALIZABLE on
/// backends whose default isolation would let two submissions observe the
/// same free slot. SQLite transactions are already serializable.
fn isolation_upgrade_stmt(backend: &str) -> Option<&'static str> {
    (backend == "PostgreSQL").then_some("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE;")
}

/* =========================
Transaction-scoped queries
========================= */

async fn slot_counts_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    date: NaiveDate,
    category: &str,
    required: u32,
) -> Result<SlotCounts, LeaveError> {
    let total = sqlx::query(
        r#"SELECT COUNT(*) AS n FROM staff WHERE active = 1 AND category = ?;"#,
    )
    .bind(category)
    .fetch_one(&mut **tx)
    .await
    .map_err(map_sqlx)?;

    let rows = sqlx::query(
        r#"
SELECT la.status AS status, COUNT(*) AS n
FROM leave_applications la
JOIN staff s ON s.staff_id = la.staff_id
WHERE la.date = ? AND s.category = ? AND la.status != 'rejected'
GROUP BY la.status;
"#,
    )
    .bind(date.to_string())
    .bind(category)
    .fetch_all(&mut **tx)
    .await
    .map_err(map_sqlx)?;

    let mut counts = SlotCounts {
        required,
        total_staff: total.get::<i64, _>("n").max(0) as u32,
        ..SlotCounts::default()
    };

    for r in rows {
        let n = r.get::<i64, _>("n").max(0) as u32;
        match LeaveStatus::parse(&r.get::<String, _>("status")) {
            Some(LeaveStatus::Confirmed) => counts.confirmed = n,
            Some(LeaveStatus::Pending) => counts.pending = n,
            Some(LeaveStatus::OnHold) => counts.on_hold = n,
            _ => {}
        }
    }

    Ok(counts)
}

async fn insert_application(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    a: &LeaveApplication,
) -> Result<(), LeaveError> {
    sqlx::query(
        r#"
INSERT INTO leave_applications
  (application_id, staff_id, date, leave_type, status, reason, submitted_ms, reviewed_ms)
VALUES (?, ?, ?, ?, ?, ?, ?, ?);
"#,
    )
    .bind(a.application_id.to_string())
    .bind(a.staff_id.to_string())
    .bind(a.date.to_string())
    .bind(a.leave_type.as_str())
    .bind(a.status.as_str())
    .bind(a.reason.map(|r| r.as_str()))
    .bind(u64_to_i64(a.submitted_ms)?)
    .bind(match a.reviewed_ms {
        Some(ms) => Some(u64_to_i64(ms)?),
        None => None,
    })
    .execute(&mut **tx)
    .await
    .map_err(map_sqlx)?;

    Ok(())
}

/* =========================
Row mapping + conversions
========================= */

fn row_to_application(r: &sqlx::any::AnyRow) -> Result<LeaveApplication, LeaveError> {
    let id: String = r.get("application_id");
    let staff: String = r.get("staff_id");
    let date: String = r.get("date");
    let leave_type: String = r.get("leave_type");
    let status: String = r.get("status");
    let reason: Option<String> = r.get("reason");

    Ok(LeaveApplication {
        application_id: Uuid::parse_str(&id).context("invalid application_id")?,
        staff_id: Uuid::parse_str(&staff).context("invalid staff_id")?,
        date: date.parse().context("invalid application date")?,
        leave_type: LeaveType::parse(&leave_type)
            .ok_or_else(|| anyhow::anyhow!("unknown leave_type: {leave_type}"))?,
        status: LeaveStatus::parse(&status)
            .ok_or_else(|| anyhow::anyhow!("unknown status: {status}"))?,
        reason: reason.as_deref().and_then(StatusReason::parse),
        submitted_ms: r.get::<i64, _>("submitted_ms").max(0) as u64,
        reviewed_ms: r
            .get::<Option<i64>, _>("reviewed_ms")
            .map(|v| v.max(0) as u64),
    })
}

/// Classifies driver errors: lock/serialization contention becomes the
/// retryable [`LeaveError::Conflict`]; a unique-index hit on the live
/// (staff, date) index means a concurrent duplicate won the race.
fn map_sqlx(e: sqlx::Error) -> LeaveError {
    if let sqlx::Error::Database(db) = &e {
        let msg = db.message().to_lowercase();
        if msg.contains("locked")
            || msg.contains("busy")
            || msg.contains("serialization")
            || msg.contains("deadlock")
        {
            return LeaveError::Conflict;
        }
        if msg.contains("unique") {
            return LeaveError::Duplicate;
        }
    }
    LeaveError::Storage(e.into())
}

fn u64_to_i64(v: u64) -> Result<i64, LeaveError> {
    if v > i64::MAX as u64 {
        return Err(LeaveError::Storage(anyhow::anyhow!(
            "u64 too large for i64: {v}"
        )));
    }
    Ok(v as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_postgres_needs_the_isolation_upgrade() {
        assert_eq!(
            isolation_upgrade_stmt("PostgreSQL"),
            Some("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE;")
        );
        assert_eq!(isolation_upgrade_stmt("SQLite"), None);
    }

    #[test]
    fn non_database_errors_stay_in_the_storage_bucket() {
        assert!(matches!(
            map_sqlx(sqlx::Error::PoolTimedOut),
            LeaveError::Storage(_)
        ));
    }
}
