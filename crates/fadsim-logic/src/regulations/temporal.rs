//! Time-window predicates.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::RegulationError;
use crate::action::Action;

/// Fixed calendar window, both ends inclusive at day granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetweenDates {
    start: NaiveDate,
    end: NaiveDate,
}

impl BetweenDates {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RegulationError> {
        if start > end {
            return Err(RegulationError::InvertedDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// True if the action's interval touches the window. An ongoing action
    /// overlaps as soon as it started on or before the window's last day.
    pub fn test(&self, action: &Action) -> bool {
        let action_start = action.start.date();
        match action.end {
            Some(action_end) => action_start <= self.end && action_end.date() >= self.start,
            None => action_start <= self.end,
        }
    }
}

/// Month and day, without a year. Always a real calendar day; February 29
/// is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawMonthDay")]
pub struct MonthDay {
    month: u32,
    day: u32,
}

#[derive(Deserialize)]
struct RawMonthDay {
    month: u32,
    day: u32,
}

impl TryFrom<RawMonthDay> for MonthDay {
    type Error = RegulationError;

    fn try_from(raw: RawMonthDay) -> Result<Self, Self::Error> {
        MonthDay::new(raw.month, raw.day)
    }
}

impl MonthDay {
    pub fn new(month: u32, day: u32) -> Result<Self, RegulationError> {
        // 2000 is a leap year, so February 29 is accepted
        if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
            return Err(RegulationError::InvalidMonthDay { month, day });
        }
        Ok(Self { month, day })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            day: date.day(),
        }
    }

    /// Shift by a number of days, counted on a non-leap year.
    pub fn offset(&self, days: i64) -> Self {
        let day = if self.month == 2 && self.day == 29 { 28 } else { self.day };
        match NaiveDate::from_ymd_opt(2001, self.month, day) {
            Some(base) => Self::of(base + Duration::days(days)),
            None => *self,
        }
    }
}

/// Window that recurs every year; may wrap over New Year
/// (e.g. November 9 to January 19).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetweenYearlyDates {
    start: MonthDay,
    end: MonthDay,
}

impl BetweenYearlyDates {
    pub fn new(start: MonthDay, end: MonthDay) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let md = MonthDay::of(date);
        if self.start <= self.end {
            self.start <= md && md <= self.end
        } else {
            md >= self.start || md <= self.end
        }
    }

    /// True if any day of the action falls in the window. Ongoing actions
    /// always reach the next occurrence.
    pub fn test(&self, action: &Action) -> bool {
        let end = match action.end {
            Some(end) => end.date(),
            None => return true,
        };
        let start = action.start.date();
        if (end - start).num_days() >= 366 {
            return true;
        }
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .any(|d| self.contains(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionKind, VesselId};
    use crate::grid::Coordinate;
    use chrono::NaiveDateTime;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn action(start: NaiveDateTime, end: NaiveDateTime) -> Action {
        Action::at(ActionKind::FadSet, VesselId(1), start, Coordinate::default())
            .ending(end, Coordinate::default())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_inverted_range_fails() {
        let err = BetweenDates::new(date(2023, 5, 2), date(2023, 5, 1)).unwrap_err();
        assert!(matches!(err, RegulationError::InvertedDateRange { .. }));
    }

    #[test]
    fn test_overlap_across_new_year() {
        let p = BetweenDates::new(date(2023, 1, 1), date(2023, 12, 31)).unwrap();
        assert!(p.test(&action(at(2023, 12, 31, 23), at(2024, 1, 1, 1))));
    }

    #[test]
    fn test_single_day_window() {
        let p = BetweenDates::new(date(2023, 6, 1), date(2023, 6, 1)).unwrap();
        assert!(p.test(&action(at(2023, 6, 1, 0), at(2023, 6, 1, 23))));
        assert!(!p.test(&action(at(2023, 6, 2, 0), at(2023, 6, 2, 1))));
        assert!(!p.test(&action(at(2023, 5, 30, 0), at(2023, 5, 31, 23))));
    }

    #[test]
    fn test_ongoing_action() {
        let p = BetweenDates::new(date(2023, 6, 1), date(2023, 6, 30)).unwrap();
        assert!(p.test(&action(at(2023, 5, 1, 0), at(2023, 5, 1, 0)).ongoing()));
        assert!(p.test(&action(at(2023, 6, 30, 0), at(2023, 6, 30, 0)).ongoing()));
        assert!(!p.test(&action(at(2023, 7, 1, 0), at(2023, 7, 1, 0)).ongoing()));
    }

    #[test]
    fn test_invalid_month_day() {
        assert!(MonthDay::new(2, 29).is_ok());
        assert!(MonthDay::new(2, 30).is_err());
        assert!(MonthDay::new(13, 1).is_err());
    }

    #[test]
    fn test_month_day_rejects_impossible_days_when_parsed() {
        let leap: MonthDay = serde_json::from_str(r#"{ "month": 2, "day": 29 }"#).unwrap();
        assert_eq!((leap.month(), leap.day()), (2, 29));
        assert!(serde_json::from_str::<MonthDay>(r#"{ "month": 2, "day": 30 }"#).is_err());
        assert!(serde_json::from_str::<MonthDay>(r#"{ "month": 0, "day": 1 }"#).is_err());
    }

    #[test]
    fn test_month_day_offset() {
        let closure = MonthDay::new(7, 29).unwrap();
        assert_eq!(closure.offset(-15), MonthDay::new(7, 14).unwrap());
        assert_eq!(closure.offset(-1), MonthDay::new(7, 28).unwrap());
        let jan = MonthDay::new(1, 19).unwrap();
        assert_eq!(jan.offset(-20), MonthDay::new(12, 30).unwrap());
    }

    #[test]
    fn test_yearly_window_within_year() {
        let p = BetweenYearlyDates::new(MonthDay::new(6, 1).unwrap(), MonthDay::new(7, 31).unwrap());
        assert!(p.test(&action(at(2023, 6, 15, 10), at(2023, 7, 15, 10))));
        assert!(p.test(&action(at(2023, 7, 31, 0), at(2023, 7, 31, 23))));
        assert!(p.test(&action(at(2023, 3, 25, 0), at(2023, 7, 2, 23))));
        assert!(!p.test(&action(at(2023, 5, 15, 10), at(2023, 5, 20, 10))));
    }

    #[test]
    fn test_yearly_window_wrapping_new_year() {
        let p = BetweenYearlyDates::new(MonthDay::new(11, 1).unwrap(), MonthDay::new(2, 28).unwrap());
        assert!(p.test(&action(at(2023, 11, 15, 10), at(2023, 12, 15, 10))));
        assert!(p.test(&action(at(2023, 12, 31, 0), at(2024, 1, 1, 0))));
        assert!(p.test(&action(at(2022, 1, 1, 0), at(2022, 12, 31, 23))));
        assert!(!p.test(&action(at(2023, 7, 15, 10), at(2023, 8, 15, 10))));
    }

    #[test]
    fn test_yearly_window_multi_year_action() {
        let p = BetweenYearlyDates::new(MonthDay::new(1, 1).unwrap(), MonthDay::new(12, 31).unwrap());
        assert!(p.test(&action(at(2022, 6, 15, 10), at(2024, 7, 15, 10))));
    }
}
