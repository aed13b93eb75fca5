use uuid::Uuid;

use crate::fairness::FairnessScores;

/// A clinic staff member.
///
/// The cumulative fairness scores are owned by the fairness ledger and only
/// change when a deployed schedule is applied (or on an audited reset),
/// never mid-month.
#[derive(Clone, Debug)]
pub struct Staff {
    pub staff_id: Uuid,
    pub name: String,
    /// Sub-grouping with its own leave-capacity accounting (e.g. "Hygienist").
    pub category: String,
    pub department: String,
    /// Deactivated staff keep their history but are excluded from all
    /// capacity and assignment computations.
    pub active: bool,
    /// Explicitly eligible to cover other categories during auto-assignment.
    pub flexible: bool,
    /// Overflow ordering among flexible staff; lower is preferred.
    pub flex_priority: i64,
    /// Annual leave entitlement in days per year.
    pub annual_entitlement: u32,
    /// Annual days consumed by deployed schedules.
    pub annual_used: u32,
    pub fairness: FairnessScores,
}

impl Staff {
    /// Remaining annual balance, net of days already consumed and live
    /// (non-rejected) ANNUAL applications.
    pub fn annual_remaining(&self, live_annual_applications: u32) -> i64 {
        self.annual_entitlement as i64
            - self.annual_used as i64
            - live_annual_applications as i64
    }
}
