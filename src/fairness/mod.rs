pub mod ledger;
pub mod repository;
pub mod repository_sqlx;

/// Work-burden dimensions tracked per staff member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dimension {
    Total,
    Night,
    Weekend,
    Holiday,
    HolidayAdjacent,
}

/// Cumulative fairness deviation per dimension.
///
/// Positive means the staff member has done less than their fair share of
/// that burden and is owed more of it; negative means they have done more
/// than their share. Carried month to month, never implicitly reset.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FairnessScores {
    pub total: f64,
    pub night: f64,
    pub weekend: f64,
    pub holiday: f64,
    pub holiday_adjacent: f64,
}

impl FairnessScores {
    pub const ZERO: FairnessScores = FairnessScores {
        total: 0.0,
        night: 0.0,
        weekend: 0.0,
        holiday: 0.0,
        holiday_adjacent: 0.0,
    };

    pub fn get(&self, dim: Dimension) -> f64 {
        match dim {
            Dimension::Total => self.total,
            Dimension::Night => self.night,
            Dimension::Weekend => self.weekend,
            Dimension::Holiday => self.holiday,
            Dimension::HolidayAdjacent => self.holiday_adjacent,
        }
    }

    /// Aggregate score consulted by the submission fairness gate.
    pub fn overall(&self) -> f64 {
        self.total + self.night + self.weekend + self.holiday + self.holiday_adjacent
    }

    pub fn add(&mut self, delta: &FairnessScores) {
        self.total += delta.total;
        self.night += delta.night;
        self.weekend += delta.weekend;
        self.holiday += delta.holiday;
        self.holiday_adjacent += delta.holiday_adjacent;
    }

    /// Entry that replays this score back to zero (used for audited resets).
    pub fn negated(&self) -> FairnessScores {
        FairnessScores {
            total: -self.total,
            night: -self.night,
            weekend: -self.weekend,
            holiday: -self.holiday,
            holiday_adjacent: -self.holiday_adjacent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_reads_the_requested_dimension() {
        let s = FairnessScores {
            total: 1.0,
            night: -2.0,
            weekend: 3.0,
            holiday: -4.0,
            holiday_adjacent: 5.0,
        };
        assert_eq!(s.get(Dimension::Night), -2.0);
        assert_eq!(s.get(Dimension::HolidayAdjacent), 5.0);
    }

    #[test]
    fn overall_is_the_sum_of_dimensions() {
        let s = FairnessScores {
            total: 1.0,
            night: 2.0,
            weekend: 3.0,
            holiday: 4.0,
            holiday_adjacent: 5.0,
        };
        assert_eq!(s.overall(), 15.0);
    }

    #[test]
    fn add_then_negated_round_trips_to_zero() {
        let mut s = FairnessScores::ZERO;
        let delta = FairnessScores {
            total: 0.5,
            night: -1.5,
            weekend: 2.0,
            holiday: 0.0,
            holiday_adjacent: -0.25,
        };
        s.add(&delta);
        let undo = s.negated();
        s.add(&undo);
        assert_eq!(s, FairnessScores::ZERO);
    }
}
