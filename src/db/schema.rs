use sqlx::AnyPool;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    // Staff
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS staff (
  staff_id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  category TEXT NOT NULL,
  department TEXT NOT NULL,
  active INTEGER NOT NULL CHECK (active IN (0,1)),
  flexible INTEGER NOT NULL CHECK (flexible IN (0,1)),
  flex_priority BIGINT NOT NULL,
  annual_entitlement BIGINT NOT NULL,
  annual_used BIGINT NOT NULL,
  fair_total REAL NOT NULL,
  fair_night REAL NOT NULL,
  fair_weekend REAL NOT NULL,
  fair_holiday REAL NOT NULL,
  fair_holiday_adjacent REAL NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    // Leave applications
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS leave_applications (
  application_id TEXT PRIMARY KEY,
  staff_id TEXT NOT NULL,
  date TEXT NOT NULL,
  leave_type TEXT NOT NULL,
  status TEXT NOT NULL,
  reason TEXT,
  submitted_ms BIGINT NOT NULL,
  reviewed_ms BIGINT,
  consumed_ms BIGINT
);
"#,
    )
    .execute(pool)
    .await?;

    // Store-level backstop for the duplicate invariant: at most one
    // non-rejected application per (staff, date).
    sqlx::query(
        r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_leave_live_unique
ON leave_applications(staff_id, date) WHERE status != 'rejected';
"#,
    )
    .execute(pool)
    .await?;

    // Shift assignments (auto-assigned or mirrored from confirmed leave)
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS staff_assignments (
  assignment_id TEXT PRIMARY KEY,
  schedule_id TEXT NOT NULL,
  staff_id TEXT NOT NULL,
  date TEXT NOT NULL,
  shift TEXT NOT NULL,
  application_id TEXT
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_assignments_unique
ON staff_assignments(schedule_id, staff_id, date);
"#,
    )
    .execute(pool)
    .await?;

    // Append-only fairness ledger; staff rows carry the materialized totals.
    // schedule_id is NULL for administrative resets, so the uniqueness
    // constraint only binds monthly entries.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS fairness_entries (
  entry_id TEXT PRIMARY KEY,
  staff_id TEXT NOT NULL,
  schedule_id TEXT,
  kind TEXT NOT NULL,
  d_total REAL NOT NULL,
  d_night REAL NOT NULL,
  d_weekend REAL NOT NULL,
  d_holiday REAL NOT NULL,
  d_holiday_adjacent REAL NOT NULL,
  annual_days BIGINT NOT NULL,
  applied_ms BIGINT NOT NULL,
  UNIQUE (staff_id, schedule_id)
);
"#,
    )
    .execute(pool)
    .await?;

    // Admin-authored combination table: doctor set + night flag -> staffing.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS doctor_combinations (
  combination_id TEXT PRIMARY KEY,
  doctors_json TEXT NOT NULL,
  night_shift INTEGER NOT NULL CHECK (night_shift IN (0,1)),
  total_required BIGINT NOT NULL,
  required_json TEXT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    // Admin-authored duty roster: which doctors are on duty per date.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS duty_days (
  date TEXT PRIMARY KEY,
  doctors_json TEXT NOT NULL,
  night_shift INTEGER NOT NULL CHECK (night_shift IN (0,1))
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_leave_date ON leave_applications(date);"#)
        .execute(pool)
        .await?;

    sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_staff_category ON staff(category);"#)
        .execute(pool)
        .await?;

    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS idx_assignments_schedule ON staff_assignments(schedule_id);"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
