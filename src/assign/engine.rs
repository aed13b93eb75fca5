use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::Result;
use chrono::{Days, NaiveDate};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::assign::model::{ShiftType, StaffAssignment};
use crate::assign::repository::AssignmentRepository;
use crate::calendar::HolidayCalendar;
use crate::fairness::Dimension;
use crate::leave::model::LeaveType;
use crate::leave::repository::LeaveRepository;
use crate::locks::DateLocks;
use crate::logger::warn_if_slow;
use crate::metrics::counters::Counters;
use crate::requirement::RequirementService;
use crate::staff::model::Staff;
use crate::staff::repository::StaffRepository;

/// A category the engine could not fill to its required headcount, even
/// after drawing on the flexible pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryShortfall {
    pub category: String,
    pub required: u32,
    pub assigned: u32,
}

/// Outcome of one engine run for one date.
#[derive(Clone, Debug)]
pub struct AssignmentReport {
    pub schedule_id: Uuid,
    pub date: NaiveDate,
    /// DAY/NIGHT working rows written (leave mirrors and OFF excluded).
    pub working_assigned: u32,
    pub shortfalls: Vec<CategoryShortfall>,
    /// The date had no matching requirement configuration; staffing
    /// degraded to zero and the schedule needs administrator review.
    pub config_gap: bool,
}

/// Fills a date's staffing requirement from the eligible pool, lowest
/// cumulative fairness score first on the dimension the date exercises.
///
/// Confirmed leave is honored before anything else: those staff are mirrored
/// into the schedule as OFF/ANNUAL rows and never considered for duty. The
/// run replaces all rows for (schedule, date), so re-running after a roster
/// edit is the supported correction path.
pub struct AssignmentEngine {
    staff: Arc<dyn StaffRepository>,
    leaves: Arc<dyn LeaveRepository>,
    requirements: Arc<RequirementService>,
    assignments: Arc<dyn AssignmentRepository>,
    calendar: HolidayCalendar,
    locks: DateLocks,
    counters: Counters,
}

impl AssignmentEngine {
    pub fn new(
        staff: Arc<dyn StaffRepository>,
        leaves: Arc<dyn LeaveRepository>,
        requirements: Arc<RequirementService>,
        assignments: Arc<dyn AssignmentRepository>,
        calendar: HolidayCalendar,
        locks: DateLocks,
        counters: Counters,
    ) -> Self {
        Self {
            staff,
            leaves,
            requirements,
            assignments,
            calendar,
            locks,
            counters,
        }
    }

    #[instrument(skip(self), fields(%schedule_id, %date))]
    pub async fn assign(&self, schedule_id: Uuid, date: NaiveDate) -> Result<AssignmentReport> {
        let lock = self.locks.for_date(date);
        let _guard = lock.lock().await;

        let requirement = self.requirements.daily(date).await?;
        if requirement.config_gap {
            self.counters.config_gaps.fetch_add(1, Ordering::Relaxed);
            warn!(%date, doctors = ?requirement.doctors, "no requirement configuration; assigning zero duty staff");
        }

        let confirmed_leave = self.leaves.confirmed_for_date(date).await?;
        let excluded: HashMap<Uuid, &crate::leave::model::LeaveApplication> = confirmed_leave
            .iter()
            .map(|app| (app.staff_id, app))
            .collect();

        let active = self.staff.fetch_active().await?;

        let dimension = self.calendar.ranking_dimension(date, requirement.night_shift);
        let duty_shift = if requirement.night_shift {
            ShiftType::Night
        } else {
            ShiftType::Day
        };

        let mut chosen: HashSet<Uuid> = HashSet::new();
        let mut shortfalls: Vec<CategoryShortfall> = Vec::new();

        for category in requirement.required.categories() {
            let required = requirement.required.required_for_category(&category);
            if required == 0 {
                continue;
            }

            let mut candidates: Vec<&Staff> = active
                .iter()
                .filter(|s| s.category == category && !excluded.contains_key(&s.staff_id))
                .collect();
            sort_by_deviation(&mut candidates, dimension);

            let picked = candidates.len().min(required as usize);
            for s in &candidates[..picked] {
                chosen.insert(s.staff_id);
            }
            if picked < required as usize {
                shortfalls.push(CategoryShortfall {
                    category,
                    required,
                    assigned: picked as u32,
                });
            }
        }

        // Category pools exhausted; draw on staff explicitly marked as
        // cross-category cover, lowest deviation first, flex priority as
        // the tie-break.
        if !shortfalls.is_empty() {
            let mut pool: Vec<&Staff> = active
                .iter()
                .filter(|s| {
                    s.flexible && !excluded.contains_key(&s.staff_id) && !chosen.contains(&s.staff_id)
                })
                .collect();
            pool.sort_by(|a, b| {
                a.fairness
                    .get(dimension)
                    .total_cmp(&b.fairness.get(dimension))
                    .then(a.flex_priority.cmp(&b.flex_priority))
                    .then(a.staff_id.cmp(&b.staff_id))
            });

            let mut pool = pool.into_iter();
            for shortfall in &mut shortfalls {
                while shortfall.assigned < shortfall.required {
                    let Some(cover) = pool.next() else { break };
                    chosen.insert(cover.staff_id);
                    shortfall.assigned += 1;
                    info!(
                        staff_id = %cover.staff_id,
                        category = %shortfall.category,
                        "flexible staff covering understaffed category"
                    );
                }
            }
            shortfalls.retain(|s| s.assigned < s.required);
        }

        for shortfall in &shortfalls {
            self.counters.assign_shortfalls.fetch_add(1, Ordering::Relaxed);
            warn!(
                %date,
                category = %shortfall.category,
                required = shortfall.required,
                assigned = shortfall.assigned,
                "category understaffed after flexible fallback"
            );
        }

        let mut rows: Vec<StaffAssignment> = Vec::with_capacity(active.len());
        for s in &active {
            let (shift, application_id) = if let Some(app) = excluded.get(&s.staff_id) {
                let mirror = match app.leave_type {
                    LeaveType::Annual => ShiftType::Annual,
                    LeaveType::Off => ShiftType::Off,
                };
                (mirror, Some(app.application_id))
            } else if chosen.contains(&s.staff_id) {
                (duty_shift, None)
            } else {
                (ShiftType::Off, None)
            };

            rows.push(StaffAssignment {
                assignment_id: Uuid::new_v4(),
                schedule_id,
                staff_id: s.staff_id,
                date,
                shift,
                application_id,
            });
        }

        warn_if_slow(
            "assignment_replace",
            std::time::Duration::from_millis(250),
            self.assignments.replace_for_date(&schedule_id, date, &rows),
        )
        .await?;

        info!(
            %date,
            working = chosen.len(),
            on_leave = excluded.len(),
            shortfalls = shortfalls.len(),
            "assignment run complete"
        );

        Ok(AssignmentReport {
            schedule_id,
            date,
            working_assigned: chosen.len() as u32,
            shortfalls,
            config_gap: requirement.config_gap,
        })
    }

    /// Runs the engine over an inclusive date range, one date at a time.
    pub async fn assign_range(
        &self,
        schedule_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AssignmentReport>> {
        let mut reports = Vec::new();
        let mut date = from;
        while date <= to {
            reports.push(self.assign(schedule_id, date).await?);
            date = date
                .checked_add_days(Days::new(1))
                .ok_or_else(|| anyhow::anyhow!("date range overflow"))?;
        }
        Ok(reports)
    }
}

/// Ascending by cumulative deviation on the exercised dimension; staff id
/// as the deterministic tie-break.
fn sort_by_deviation(staff: &mut [&Staff], dimension: Dimension) {
    staff.sort_by(|a, b| {
        a.fairness
            .get(dimension)
            .total_cmp(&b.fairness.get(dimension))
            .then(a.staff_id.cmp(&b.staff_id))
    });
}
