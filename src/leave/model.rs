use chrono::NaiveDate;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeaveType {
    /// Entitlement-backed annual leave.
    Annual,
    /// Discretionary day off.
    Off,
}

impl LeaveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveType::Annual => "annual",
            LeaveType::Off => "off",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "annual" => Some(LeaveType::Annual),
            "off" => Some(LeaveType::Off),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeaveStatus {
    Pending,
    Confirmed,
    OnHold,
    Rejected,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Confirmed => "confirmed",
            LeaveStatus::OnHold => "on_hold",
            LeaveStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(LeaveStatus::Pending),
            "confirmed" => Some(LeaveStatus::Confirmed),
            "on_hold" => Some(LeaveStatus::OnHold),
            "rejected" => Some(LeaveStatus::Rejected),
            _ => None,
        }
    }

    /// Counts against the duplicate invariant and slot accounting.
    pub fn is_live(&self) -> bool {
        !matches!(self, LeaveStatus::Rejected)
    }

    /// Transitions are forward-only, except ON_HOLD resolving via
    /// reconciliation and cancellation to REJECTED from any live state.
    pub fn can_transition_to(&self, next: LeaveStatus) -> bool {
        match (self, next) {
            (LeaveStatus::Pending, LeaveStatus::Confirmed) => true,
            (LeaveStatus::Pending, LeaveStatus::OnHold) => true,
            (LeaveStatus::OnHold, LeaveStatus::Confirmed) => true,
            (s, LeaveStatus::Rejected) => s.is_live(),
            _ => false,
        }
    }
}

/// Machine-readable reason attached to a decided application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusReason {
    SlotOverflow,
    FairnessBelowThreshold,
    CapacityHeld,
    Cancelled,
    AdminCancelled,
}

impl StatusReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusReason::SlotOverflow => "SLOT_OVERFLOW",
            StatusReason::FairnessBelowThreshold => "FAIRNESS_BELOW_THRESHOLD",
            StatusReason::CapacityHeld => "CAPACITY_HELD",
            StatusReason::Cancelled => "CANCELLED",
            StatusReason::AdminCancelled => "ADMIN_CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SLOT_OVERFLOW" => Some(StatusReason::SlotOverflow),
            "FAIRNESS_BELOW_THRESHOLD" => Some(StatusReason::FairnessBelowThreshold),
            "CAPACITY_HELD" => Some(StatusReason::CapacityHeld),
            "CANCELLED" => Some(StatusReason::Cancelled),
            "ADMIN_CANCELLED" => Some(StatusReason::AdminCancelled),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LeaveApplication {
    pub application_id: Uuid,
    pub staff_id: Uuid,
    pub date: NaiveDate,
    pub leave_type: LeaveType,
    pub status: LeaveStatus,
    pub reason: Option<StatusReason>,
    pub submitted_ms: u64,
    pub reviewed_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_statuses_exclude_rejected() {
        assert!(LeaveStatus::Pending.is_live());
        assert!(LeaveStatus::Confirmed.is_live());
        assert!(LeaveStatus::OnHold.is_live());
        assert!(!LeaveStatus::Rejected.is_live());
    }

    #[test]
    fn on_hold_resolves_forward_only() {
        assert!(LeaveStatus::OnHold.can_transition_to(LeaveStatus::Confirmed));
        assert!(LeaveStatus::OnHold.can_transition_to(LeaveStatus::Rejected));
        assert!(!LeaveStatus::OnHold.can_transition_to(LeaveStatus::Pending));
        assert!(!LeaveStatus::Confirmed.can_transition_to(LeaveStatus::OnHold));
    }

    #[test]
    fn rejected_is_terminal() {
        assert!(!LeaveStatus::Rejected.can_transition_to(LeaveStatus::Pending));
        assert!(!LeaveStatus::Rejected.can_transition_to(LeaveStatus::Confirmed));
        assert!(!LeaveStatus::Rejected.can_transition_to(LeaveStatus::Rejected));
    }

    #[test]
    fn any_live_state_can_be_cancelled() {
        assert!(LeaveStatus::Pending.can_transition_to(LeaveStatus::Rejected));
        assert!(LeaveStatus::Confirmed.can_transition_to(LeaveStatus::Rejected));
    }

    #[test]
    fn reason_round_trips_through_text() {
        for r in [
            StatusReason::SlotOverflow,
            StatusReason::FairnessBelowThreshold,
            StatusReason::CapacityHeld,
            StatusReason::Cancelled,
            StatusReason::AdminCancelled,
        ] {
            assert_eq!(StatusReason::parse(r.as_str()), Some(r));
        }
    }
}
