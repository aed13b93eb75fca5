use chrono::NaiveDate;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Database connection string.
    pub database_url: String,

    /// Connection pool size. Submissions are short transactions, so a small
    /// pool is plenty; batch operations run one date at a time.
    pub db_max_connections: u32,

    // =========================
    // Leave application policy
    // =========================
    /// Minimum cumulative fairness score required to submit an ANNUAL
    /// request.
    ///
    /// Annual leave is an entitlement, so the bar is low: only staff in
    /// extreme fairness debt (they have taken far more than their share)
    /// are gated.
    pub annual_fairness_floor: f64,

    /// Minimum cumulative fairness score required to submit an OFF request.
    ///
    /// OFF days are discretionary, so the bar is stricter than for ANNUAL.
    pub off_fairness_floor: f64,

    /// How many requests beyond a category's allowed absences may sit
    /// ON_HOLD before further requests are rejected outright.
    ///
    /// 0 disables holding entirely: every request past capacity is a
    /// terminal SLOT_OVERFLOW rejection.
    pub hold_queue_depth: u32,

    /// How many times a submission is retried transparently after a
    /// transaction serialization conflict before the caller is told to
    /// try again.
    pub submit_retry_attempts: u32,

    /// Backoff between submission retries, in milliseconds.
    pub submit_retry_backoff_ms: u64,

    // =========================
    // Calendar configuration
    // =========================
    /// Clinic holidays, used to classify work-burden dimensions.
    pub holidays: Vec<NaiveDate>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://clinrota_dev.db".to_string());

        let db_max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(16);

        // Comma-separated ISO dates, e.g. "2025-01-01,2025-12-25".
        let holidays = std::env::var("CLINIC_HOLIDAYS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| s.trim().parse::<NaiveDate>().ok())
            .collect();

        Self {
            database_url,
            db_max_connections,

            annual_fairness_floor: -20.0,
            off_fairness_floor: -5.0,

            hold_queue_depth: 2,

            submit_retry_attempts: 2,
            submit_retry_backoff_ms: 50,

            holidays,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annual_floor_is_more_permissive_than_off_floor() {
        let cfg = AppConfig::from_env();
        assert!(cfg.annual_fairness_floor < cfg.off_fairness_floor);
    }

    #[test]
    fn pool_size_has_a_nonzero_default() {
        let cfg = AppConfig::from_env();
        assert!(cfg.db_max_connections > 0);
    }
}
