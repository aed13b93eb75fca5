use chrono::NaiveDate;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftType {
    Day,
    Night,
    Off,
    /// Mirrored from a confirmed ANNUAL leave application.
    Annual,
}

impl ShiftType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftType::Day => "day",
            ShiftType::Night => "night",
            ShiftType::Off => "off",
            ShiftType::Annual => "annual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "day" => Some(ShiftType::Day),
            "night" => Some(ShiftType::Night),
            "off" => Some(ShiftType::Off),
            "annual" => Some(ShiftType::Annual),
            _ => None,
        }
    }
}

/// One staff member's shift on one date under one schedule.
///
/// At most one assignment per (schedule, staff, date); the auto-assignment
/// engine owns DAY/NIGHT/OFF rows, confirmed leave applications are
/// mirrored as OFF/ANNUAL rows with a link back to the application.
#[derive(Clone, Debug)]
pub struct StaffAssignment {
    pub assignment_id: Uuid,
    pub schedule_id: Uuid,
    pub staff_id: Uuid,
    pub date: NaiveDate,
    pub shift: ShiftType,
    pub application_id: Option<Uuid>,
}
