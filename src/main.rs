use std::sync::Arc;

use clinrota::{
    assign::engine::AssignmentEngine,
    assign::repository_sqlx::SqlxAssignmentRepository,
    calendar::HolidayCalendar,
    config::AppConfig,
    db::Db,
    fairness::ledger::FairnessLedger,
    fairness::repository_sqlx::SqlxLedgerRepository,
    leave::reconcile::Reconciler,
    leave::repository_sqlx::SqlxLeaveRepository,
    leave::service::LeaveService,
    locks::DateLocks,
    logger::init_tracing,
    metrics::counters::Counters,
    notify::LogNotifier,
    requirement::RequirementService,
    requirement::repository_sqlx::SqlxRequirementRepository,
    staff::repository_sqlx::SqlxStaffRepository,
};

struct App {
    #[allow(dead_code)]
    leave: Arc<LeaveService>,
    #[allow(dead_code)]
    engine: Arc<AssignmentEngine>,
    #[allow(dead_code)]
    ledger: Arc<FairnessLedger>,
}

/// Initializes the database, runs migrations, and wires the repositories
/// into the three service entry points.
async fn init_app(cfg: &AppConfig) -> anyhow::Result<App> {
    let db = Db::connect_and_migrate(cfg).await?;

    let staff = Arc::new(SqlxStaffRepository::new((*db.pool).clone()));
    let leaves = Arc::new(SqlxLeaveRepository::new((*db.pool).clone()));
    let assignments = Arc::new(SqlxAssignmentRepository::new((*db.pool).clone()));
    let ledger_repo = Arc::new(SqlxLedgerRepository::new((*db.pool).clone()));
    let requirements = Arc::new(RequirementService::new(Arc::new(
        SqlxRequirementRepository::new((*db.pool).clone()),
    )));

    let calendar = HolidayCalendar::new(cfg.holidays.iter().copied());
    let locks = DateLocks::new();
    let counters = Counters::default();
    let notifier = Arc::new(LogNotifier);

    let reconciler = Arc::new(Reconciler::new(
        leaves.clone(),
        requirements.clone(),
        notifier.clone(),
        locks.clone(),
        counters.clone(),
    ));

    let leave = Arc::new(LeaveService::new(
        staff.clone(),
        leaves.clone(),
        requirements.clone(),
        reconciler,
        notifier,
        cfg,
        counters.clone(),
    ));

    let engine = Arc::new(AssignmentEngine::new(
        staff.clone(),
        leaves,
        requirements,
        assignments,
        calendar.clone(),
        locks,
        counters,
    ));

    let ledger = Arc::new(FairnessLedger::new(staff, ledger_repo, calendar));

    Ok(App {
        leave,
        engine,
        ledger,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sqlx::any::install_default_drivers();

    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    tracing::info!("Starting clinrota...");

    let cfg = AppConfig::from_env();
    let _app = init_app(&cfg).await?;

    tracing::info!("Services ready; awaiting shutdown signal");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    Ok(())
}
