use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Nested required-count table: department -> category -> headcount.
///
/// Authored by an administrator; validated where it is read so the allocator
/// and the assignment engine never see an untyped blob.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequirementTable(pub BTreeMap<String, BTreeMap<String, u32>>);

impl RequirementTable {
    /// Required headcount for one category, summed across departments.
    pub fn required_for_category(&self, category: &str) -> u32 {
        self.0
            .values()
            .filter_map(|cats| cats.get(category))
            .sum()
    }

    /// Categories appearing anywhere in the table, deduplicated and sorted.
    pub fn categories(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .0
            .values()
            .flat_map(|cats| cats.keys().cloned())
            .collect();
        out.sort();
        out.dedup();
        out
    }

    pub fn total(&self) -> u32 {
        self.0.values().flat_map(|cats| cats.values()).sum()
    }

    /// Boundary validation: no blank keys, and the per-category entries must
    /// sum to the advertised total.
    pub fn validate(&self, total_required: u32) -> Result<(), String> {
        for (dept, cats) in &self.0 {
            if dept.trim().is_empty() {
                return Err("blank department key".to_string());
            }
            for cat in cats.keys() {
                if cat.trim().is_empty() {
                    return Err(format!("blank category key under department {dept}"));
                }
            }
        }
        let sum = self.total();
        if sum != total_required {
            return Err(format!(
                "per-category entries sum to {sum}, combination advertises {total_required}"
            ));
        }
        Ok(())
    }
}

/// Immutable admin-authored mapping from an on-duty doctor set (plus night
/// flag) to the staffing it requires.
#[derive(Clone, Debug)]
pub struct DoctorCombination {
    pub combination_id: Uuid,
    /// Doctor short-codes, stored sorted and deduplicated.
    pub doctors: Vec<String>,
    pub night_shift: bool,
    pub total_required: u32,
    pub required: RequirementTable,
}

impl DoctorCombination {
    /// Sort + dedup so set comparison is order-independent.
    pub fn normalize_doctors(mut doctors: Vec<String>) -> Vec<String> {
        doctors.sort();
        doctors.dedup();
        doctors
    }
}

/// One row of the admin-authored duty roster.
#[derive(Clone, Debug)]
pub struct DutyDay {
    pub date: NaiveDate,
    pub doctors: Vec<String>,
    pub night_shift: bool,
}

/// Resolved staffing requirement for one calendar date.
#[derive(Clone, Debug)]
pub struct DailyRequirement {
    pub date: NaiveDate,
    pub doctors: Vec<String>,
    pub night_shift: bool,
    pub total_required: u32,
    pub required: RequirementTable,
    /// True when no combination matched and required staffing degraded to
    /// zero. Surfaced to the administrator as a data-quality warning.
    pub config_gap: bool,
}

impl DailyRequirement {
    pub fn unstaffed(date: NaiveDate, doctors: Vec<String>, night_shift: bool) -> Self {
        Self {
            date,
            doctors,
            night_shift,
            total_required: 0,
            required: RequirementTable::default(),
            config_gap: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &str, u32)]) -> RequirementTable {
        let mut t = RequirementTable::default();
        for (dept, cat, n) in entries {
            t.0.entry(dept.to_string())
                .or_default()
                .insert(cat.to_string(), *n);
        }
        t
    }

    #[test]
    fn required_for_category_sums_across_departments() {
        let t = table(&[
            ("Dental", "Hygienist", 2),
            ("Ortho", "Hygienist", 1),
            ("Dental", "Nurse", 3),
        ]);
        assert_eq!(t.required_for_category("Hygienist"), 3);
        assert_eq!(t.required_for_category("Nurse"), 3);
        assert_eq!(t.required_for_category("Receptionist"), 0);
    }

    #[test]
    fn validate_rejects_total_mismatch() {
        let t = table(&[("Dental", "Nurse", 2)]);
        assert!(t.validate(2).is_ok());
        assert!(t.validate(3).is_err());
    }

    #[test]
    fn validate_rejects_blank_keys() {
        let t = table(&[("", "Nurse", 2)]);
        assert!(t.validate(2).is_err());
        let t = table(&[("Dental", " ", 2)]);
        assert!(t.validate(2).is_err());
    }

    #[test]
    fn normalize_doctors_sorts_and_dedups() {
        let d = DoctorCombination::normalize_doctors(vec![
            "KIM".to_string(),
            "AHN".to_string(),
            "KIM".to_string(),
        ]);
        assert_eq!(d, vec!["AHN".to_string(), "KIM".to_string()]);
    }
}
