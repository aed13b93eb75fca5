use chrono::NaiveDate;
use tracing::warn;

use crate::requirement::model::{DailyRequirement, DoctorCombination};

/// Deterministic, side-effect-free lookup from an on-duty doctor set to the
/// staffing requirement it implies.
pub struct RequirementResolver {
    combinations: Vec<DoctorCombination>,
}

impl RequirementResolver {
    pub fn new(combinations: Vec<DoctorCombination>) -> Self {
        let combinations = combinations
            .into_iter()
            .map(|mut c| {
                c.doctors = DoctorCombination::normalize_doctors(c.doctors);
                c
            })
            .collect();
        Self { combinations }
    }

    /// Order-independent match on {doctor set, night flag}.
    ///
    /// No match is a configuration gap: required staffing degrades to zero
    /// (which is capacity-permissive) and the caller must surface the gap to
    /// the administrator rather than trust it.
    pub fn resolve(
        &self,
        date: NaiveDate,
        on_duty: &[String],
        night_shift: bool,
    ) -> DailyRequirement {
        let wanted = DoctorCombination::normalize_doctors(on_duty.to_vec());

        let hit = self
            .combinations
            .iter()
            .find(|c| c.night_shift == night_shift && c.doctors == wanted);

        match hit {
            Some(c) => DailyRequirement {
                date,
                doctors: wanted,
                night_shift,
                total_required: c.total_required,
                required: c.required.clone(),
                config_gap: false,
            },
            None => {
                warn!(
                    %date,
                    doctors = ?wanted,
                    night_shift,
                    "no doctor combination matches; treating required staff as 0"
                );
                DailyRequirement::unstaffed(date, wanted, night_shift)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirement::model::RequirementTable;
    use uuid::Uuid;

    fn mk_combination(doctors: &[&str], night: bool, total: u32) -> DoctorCombination {
        let mut table = RequirementTable::default();
        table
            .0
            .entry("Dental".to_string())
            .or_default()
            .insert("Nurse".to_string(), total);

        DoctorCombination {
            combination_id: Uuid::new_v4(),
            doctors: doctors.iter().map(|s| s.to_string()).collect(),
            night_shift: night,
            total_required: total,
            required: table,
        }
    }

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn resolve_is_order_independent() {
        let r = RequirementResolver::new(vec![mk_combination(&["AHN", "KIM"], false, 4)]);

        let req = r.resolve(
            d("2025-11-21"),
            &["KIM".to_string(), "AHN".to_string()],
            false,
        );
        assert!(!req.config_gap);
        assert_eq!(req.total_required, 4);
    }

    #[test]
    fn night_flag_distinguishes_combinations() {
        let r = RequirementResolver::new(vec![
            mk_combination(&["KIM"], false, 4),
            mk_combination(&["KIM"], true, 6),
        ]);

        let day = r.resolve(d("2025-11-21"), &["KIM".to_string()], false);
        let night = r.resolve(d("2025-11-21"), &["KIM".to_string()], true);
        assert_eq!(day.total_required, 4);
        assert_eq!(night.total_required, 6);
    }

    #[test]
    fn no_match_degrades_to_unstaffed_with_gap_flag() {
        let r = RequirementResolver::new(vec![mk_combination(&["KIM"], false, 4)]);

        let req = r.resolve(d("2025-11-21"), &["PARK".to_string()], false);
        assert!(req.config_gap);
        assert_eq!(req.total_required, 0);
        assert_eq!(req.required.total(), 0);
    }

    #[test]
    fn duplicate_doctor_codes_collapse() {
        let r = RequirementResolver::new(vec![mk_combination(&["KIM"], false, 4)]);

        let req = r.resolve(
            d("2025-11-21"),
            &["KIM".to_string(), "KIM".to_string()],
            false,
        );
        assert!(!req.config_gap);
    }
}
