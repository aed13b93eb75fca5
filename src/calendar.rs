use std::collections::HashSet;

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::fairness::Dimension;

/// Classifies clinic dates into work-burden dimensions.
#[derive(Clone, Debug, Default)]
pub struct HolidayCalendar {
    holidays: HashSet<NaiveDate>,
}

impl HolidayCalendar {
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// Day immediately before or after a holiday, and not a holiday itself.
    pub fn is_holiday_adjacent(&self, date: NaiveDate) -> bool {
        if self.is_holiday(date) {
            return false;
        }
        let before = date.checked_sub_days(Days::new(1));
        let after = date.checked_add_days(Days::new(1));
        before.is_some_and(|d| self.is_holiday(d)) || after.is_some_and(|d| self.is_holiday(d))
    }

    pub fn is_weekend(&self, date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Dimension used to rank staff when filling `date`.
    ///
    /// Precedence: holiday, then holiday-adjacent, then weekend, then night
    /// (when a night shift is in effect), with total worked days as the
    /// default.
    pub fn ranking_dimension(&self, date: NaiveDate, night_shift: bool) -> Dimension {
        if self.is_holiday(date) {
            Dimension::Holiday
        } else if self.is_holiday_adjacent(date) {
            Dimension::HolidayAdjacent
        } else if self.is_weekend(date) {
            Dimension::Weekend
        } else if night_shift {
            Dimension::Night
        } else {
            Dimension::Total
        }
    }
}
