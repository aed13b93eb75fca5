use std::sync::Arc;
use std::sync::atomic::AtomicU64;

/// Minimal counters for operational visibility.
#[derive(Clone, Default)]
pub struct Counters {
    pub submit_confirmed: Arc<AtomicU64>,
    pub submit_held: Arc<AtomicU64>,
    pub submit_overflow: Arc<AtomicU64>,
    pub submit_duplicate: Arc<AtomicU64>,
    pub submit_conflict_retries: Arc<AtomicU64>,

    // gate rejections
    pub gate_fairness: Arc<AtomicU64>,
    pub gate_annual_exhausted: Arc<AtomicU64>,

    // batch operations
    pub reconcile_promoted: Arc<AtomicU64>,
    pub assign_shortfalls: Arc<AtomicU64>,

    // data-quality warnings
    pub config_gaps: Arc<AtomicU64>,
}
