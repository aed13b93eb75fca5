use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Row};
use uuid::Uuid;

use clinrota::calendar::HolidayCalendar;
use clinrota::fairness::ledger::FairnessLedger;
use clinrota::fairness::repository_sqlx::SqlxLedgerRepository;
use clinrota::staff::repository_sqlx::SqlxStaffRepository;

async fn setup_db() -> AnyPool {
    sqlx::any::install_default_drivers();

    let db_name = Uuid::new_v4().to_string();
    let conn_str = format!("sqlite:file:{}?mode=memory&cache=shared", db_name);

    let pool = AnyPoolOptions::new()
        .max_connections(5)
        .connect(&conn_str)
        .await
        .unwrap();

    clinrota::db::schema::migrate(&pool).await.unwrap();

    pool
}

async fn seed_staff(pool: &AnyPool, department: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
INSERT INTO staff
  (staff_id, name, category, department, active, flexible, flex_priority,
   annual_entitlement, annual_used,
   fair_total, fair_night, fair_weekend, fair_holiday, fair_holiday_adjacent)
VALUES (?, 'T. Member', 'Nurse', ?, 1, 0, 0, 15, 0, 0, 0, 0, 0, 0);
"#,
    )
    .bind(id.to_string())
    .bind(department)
    .execute(pool)
    .await
    .unwrap();
    id
}

async fn seed_assignment(
    pool: &AnyPool,
    schedule_id: &Uuid,
    staff_id: &Uuid,
    date: NaiveDate,
    shift: &str,
) {
    sqlx::query(
        r#"
INSERT INTO staff_assignments
  (assignment_id, schedule_id, staff_id, date, shift, application_id)
VALUES (?, ?, ?, ?, ?, NULL);
"#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(schedule_id.to_string())
    .bind(staff_id.to_string())
    .bind(date.to_string())
    .bind(shift)
    .execute(pool)
    .await
    .unwrap();
}

fn build_ledger(pool: &AnyPool) -> FairnessLedger {
    FairnessLedger::new(
        Arc::new(SqlxStaffRepository::new(pool.clone())),
        Arc::new(SqlxLedgerRepository::new(pool.clone())),
        HolidayCalendar::default(),
    )
}

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

async fn totals(pool: &AnyPool, staff_id: &Uuid) -> (f64, f64, i64) {
    let row = sqlx::query("SELECT fair_total, fair_weekend, annual_used FROM staff WHERE staff_id = ?")
        .bind(staff_id.to_string())
        .fetch_one(pool)
        .await
        .unwrap();
    (
        row.get::<f64, _>("fair_total"),
        row.get::<f64, _>("fair_weekend"),
        row.get::<i64, _>("annual_used"),
    )
}

#[tokio::test]
async fn deltas_are_baseline_minus_actual() {
    let pool = setup_db().await;
    let schedule = Uuid::new_v4();

    // Same department: s1 works two days (one a Saturday), s2 works none.
    let s1 = seed_staff(&pool, "Dental").await;
    let s2 = seed_staff(&pool, "Dental").await;
    seed_assignment(&pool, &schedule, &s1, d("2025-11-21"), "day").await;
    seed_assignment(&pool, &schedule, &s1, d("2025-11-22"), "day").await; // Saturday
    seed_assignment(&pool, &schedule, &s2, d("2025-11-21"), "off").await;
    seed_assignment(&pool, &schedule, &s2, d("2025-11-22"), "off").await;

    let ledger = build_ledger(&pool);
    let report = ledger.apply_monthly(schedule).await.unwrap();
    assert_eq!(report.applied, 2);
    assert_eq!(report.skipped, 0);

    // Baseline total = (2 + 0) / 2 = 1.0; weekend baseline = 0.5.
    let (t1, w1, _) = totals(&pool, &s1).await;
    assert_eq!(t1, -1.0);
    assert_eq!(w1, -0.5);

    let (t2, w2, _) = totals(&pool, &s2).await;
    assert_eq!(t2, 1.0);
    assert_eq!(w2, 0.5);
}

#[tokio::test]
async fn second_apply_for_the_same_schedule_changes_nothing() {
    let pool = setup_db().await;
    let schedule = Uuid::new_v4();

    let s1 = seed_staff(&pool, "Dental").await;
    let s2 = seed_staff(&pool, "Dental").await;
    seed_assignment(&pool, &schedule, &s1, d("2025-11-21"), "day").await;
    seed_assignment(&pool, &schedule, &s2, d("2025-11-21"), "off").await;

    let ledger = build_ledger(&pool);
    ledger.apply_monthly(schedule).await.unwrap();
    let first = totals(&pool, &s1).await;

    let report = ledger.apply_monthly(schedule).await.unwrap();
    assert_eq!(report.applied, 0);
    assert_eq!(report.skipped, 2);
    assert_eq!(totals(&pool, &s1).await, first);
}

#[tokio::test]
async fn annual_shifts_consume_the_annual_balance() {
    let pool = setup_db().await;
    let schedule = Uuid::new_v4();

    let s1 = seed_staff(&pool, "Dental").await;
    seed_assignment(&pool, &schedule, &s1, d("2025-11-21"), "annual").await;
    seed_assignment(&pool, &schedule, &s1, d("2025-11-24"), "annual").await;

    let ledger = build_ledger(&pool);
    ledger.apply_monthly(schedule).await.unwrap();

    let (_, _, used) = totals(&pool, &s1).await;
    assert_eq!(used, 2);
}

#[tokio::test]
async fn applying_a_schedule_marks_linked_applications_consumed() {
    let pool = setup_db().await;
    let schedule = Uuid::new_v4();

    let s1 = seed_staff(&pool, "Dental").await;
    let application_id = Uuid::new_v4();
    sqlx::query(
        r#"
INSERT INTO leave_applications
  (application_id, staff_id, date, leave_type, status, reason, submitted_ms, reviewed_ms)
VALUES (?, ?, '2025-11-21', 'annual', 'confirmed', NULL, 1, 1);
"#,
    )
    .bind(application_id.to_string())
    .bind(s1.to_string())
    .execute(&pool)
    .await
    .unwrap();

    // Mirror row linking the deployed assignment to the application.
    sqlx::query(
        r#"
INSERT INTO staff_assignments
  (assignment_id, schedule_id, staff_id, date, shift, application_id)
VALUES (?, ?, ?, '2025-11-21', 'annual', ?);
"#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(schedule.to_string())
    .bind(s1.to_string())
    .bind(application_id.to_string())
    .execute(&pool)
    .await
    .unwrap();

    let ledger = build_ledger(&pool);
    ledger.apply_monthly(schedule).await.unwrap();

    let consumed: Option<i64> =
        sqlx::query("SELECT consumed_ms FROM leave_applications WHERE application_id = ?")
            .bind(application_id.to_string())
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("consumed_ms");
    assert!(consumed.is_some(), "deployed annual day must be marked consumed");

    // A rerun for the same schedule is a no-op and must not re-stamp it.
    let before = consumed;
    ledger.apply_monthly(schedule).await.unwrap();
    let after: Option<i64> =
        sqlx::query("SELECT consumed_ms FROM leave_applications WHERE application_id = ?")
            .bind(application_id.to_string())
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("consumed_ms");
    assert_eq!(before, after);
}

#[tokio::test]
async fn reset_zeroes_totals_and_leaves_an_audit_entry() {
    let pool = setup_db().await;
    let schedule = Uuid::new_v4();

    let s1 = seed_staff(&pool, "Dental").await;
    let s2 = seed_staff(&pool, "Dental").await;
    seed_assignment(&pool, &schedule, &s1, d("2025-11-21"), "day").await;
    seed_assignment(&pool, &schedule, &s2, d("2025-11-21"), "off").await;

    let ledger = build_ledger(&pool);
    ledger.apply_monthly(schedule).await.unwrap();

    ledger.reset(s2).await.unwrap();

    let (t2, w2, _) = totals(&pool, &s2).await;
    assert_eq!(t2, 0.0);
    assert_eq!(w2, 0.0);

    // One monthly entry and one reset entry; the reset carries the undo.
    let row = sqlx::query(
        "SELECT kind, d_total FROM fairness_entries WHERE staff_id = ? AND kind = 'reset'",
    )
    .bind(s2.to_string())
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(row.get::<String, _>("kind"), "reset");
    assert_eq!(row.get::<f64, _>("d_total"), -0.5);

    // The other staff member's totals are untouched.
    let (t1, _, _) = totals(&pool, &s1).await;
    assert_eq!(t1, -0.5);
}

#[tokio::test]
async fn departments_are_balanced_independently() {
    let pool = setup_db().await;
    let schedule = Uuid::new_v4();

    // Dental works unevenly; Ortho not at all. Ortho must see zero deltas,
    // not absorb Dental's baseline.
    let dental = seed_staff(&pool, "Dental").await;
    let idle_dental = seed_staff(&pool, "Dental").await;
    let ortho = seed_staff(&pool, "Ortho").await;
    seed_assignment(&pool, &schedule, &dental, d("2025-11-21"), "day").await;
    seed_assignment(&pool, &schedule, &idle_dental, d("2025-11-21"), "off").await;

    let ledger = build_ledger(&pool);
    ledger.apply_monthly(schedule).await.unwrap();

    let (t, _, _) = totals(&pool, &ortho).await;
    assert_eq!(t, 0.0);
    let (t, _, _) = totals(&pool, &dental).await;
    assert_eq!(t, -0.5);
}
