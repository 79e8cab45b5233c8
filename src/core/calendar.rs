//! Bank-holiday calendar
//!
//! A holiday is a `(month, day)` pair that recurs every year. It is stored
//! packed into one integer, day in the low 12 bits and month above them, which
//! is also its on-disk representation.

use crate::core::engine::LedgerEngine;
use crate::types::LedgerError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

const DAY_BITS: u32 = 12;
const DAY_MASK: i64 = (1 << DAY_BITS) - 1;

/// A recurring bank holiday
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BankHoliday(i64);

impl BankHoliday {
    /// Create a holiday, rejecting days that never occur (e.g. 31/4)
    ///
    /// 29 February is accepted and only matches in leap years.
    pub fn new(day: i64, month: i64) -> Result<Self, LedgerError> {
        let valid = u32::try_from(month)
            .ok()
            .zip(u32::try_from(day).ok())
            .and_then(|(m, d)| NaiveDate::from_ymd_opt(2000, m, d))
            .is_some();
        if !valid {
            return Err(LedgerError::InvalidDate { day, month });
        }
        Ok(BankHoliday((month << DAY_BITS) + day))
    }

    pub fn from_packed(packed: i64) -> Self {
        BankHoliday(packed)
    }

    pub fn packed(&self) -> i64 {
        self.0
    }

    pub fn month(&self) -> i64 {
        self.0 >> DAY_BITS
    }

    pub fn day(&self) -> i64 {
        self.0 & DAY_MASK
    }

    /// Whether `date` is this holiday, in any year
    pub fn falls_on(&self, date: NaiveDate) -> bool {
        i64::from(date.month()) == self.month() && i64::from(date.day()) == self.day()
    }

    /// First date on or after `today` on which this holiday falls
    ///
    /// Looks ahead far enough to find the next 29 February.
    pub fn next_occurrence(&self, today: NaiveDate) -> Option<NaiveDate> {
        let month = u32::try_from(self.month()).ok()?;
        let day = u32::try_from(self.day()).ok()?;
        (today.year()..=today.year() + 8)
            .filter_map(|year| NaiveDate::from_ymd_opt(year, month, day))
            .find(|date| *date >= today)
    }
}

impl fmt::Display for BankHoliday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.day(), self.month())
    }
}

/// Result of a `set_holiday` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolidayChange {
    NowHoliday,
    AlreadyHoliday,
    NoLongerHoliday,
    AlreadyNotHoliday,
}

impl fmt::Display for HolidayChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            HolidayChange::NowHoliday => "is now a bank holiday",
            HolidayChange::AlreadyHoliday => "is already a bank holiday",
            HolidayChange::NoLongerHoliday => "is no longer a bank holiday",
            HolidayChange::AlreadyNotHoliday => "was already not a bank holiday",
        };
        f.write_str(text)
    }
}

impl LedgerEngine {
    /// Add (`enabled`) or remove a recurring holiday
    ///
    /// Setting a holiday to the state it is already in is reported, not an
    /// error.
    pub fn set_holiday(
        &mut self,
        day: i64,
        month: i64,
        enabled: bool,
    ) -> Result<(BankHoliday, HolidayChange), LedgerError> {
        let holiday = BankHoliday::new(day, month)?;
        let holidays = self.ledger_mut().holidays_mut();

        let change = match (enabled, holidays.contains(&holiday)) {
            (true, true) => HolidayChange::AlreadyHoliday,
            (true, false) => {
                holidays.insert(holiday);
                HolidayChange::NowHoliday
            }
            (false, true) => {
                holidays.remove(&holiday);
                HolidayChange::NoLongerHoliday
            }
            (false, false) => HolidayChange::AlreadyNotHoliday,
        };

        info!(holiday = %holiday, ?change, "Bank holiday updated");
        Ok((holiday, change))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::sample_engine;
    use rstest::rstest;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_packing_matches_snapshot_format() {
        let holiday = BankHoliday::new(25, 12).unwrap();
        assert_eq!(holiday.packed(), (12 << 12) + 25);
        assert_eq!(holiday.month(), 12);
        assert_eq!(holiday.day(), 25);
        assert_eq!(holiday.to_string(), "25/12");
        assert_eq!(BankHoliday::from_packed(holiday.packed()), holiday);
    }

    #[rstest]
    #[case::month_zero(1, 0)]
    #[case::month_thirteen(1, 13)]
    #[case::day_zero(0, 5)]
    #[case::thirty_first_april(31, 4)]
    #[case::thirtieth_february(30, 2)]
    #[case::negative(-1, 1)]
    fn test_invalid_dates_rejected(#[case] day: i64, #[case] month: i64) {
        assert_eq!(
            BankHoliday::new(day, month),
            Err(LedgerError::InvalidDate { day, month })
        );
    }

    #[test]
    fn test_falls_on_ignores_year() {
        let holiday = BankHoliday::new(1, 5).unwrap();
        assert!(holiday.falls_on(date(2023, 5, 1)));
        assert!(holiday.falls_on(date(2031, 5, 1)));
        assert!(!holiday.falls_on(date(2023, 5, 2)));
        assert!(!holiday.falls_on(date(2023, 1, 5)));
    }

    #[rstest]
    #[case::later_this_year(BankHoliday::new(25, 12).unwrap(), date(2024, 6, 1), date(2024, 12, 25))]
    #[case::today(BankHoliday::new(1, 6).unwrap(), date(2024, 6, 1), date(2024, 6, 1))]
    #[case::already_passed(BankHoliday::new(1, 1).unwrap(), date(2024, 6, 1), date(2025, 1, 1))]
    #[case::leap_day(BankHoliday::new(29, 2).unwrap(), date(2025, 3, 1), date(2028, 2, 29))]
    fn test_next_occurrence(
        #[case] holiday: BankHoliday,
        #[case] today: NaiveDate,
        #[case] expected: NaiveDate,
    ) {
        assert_eq!(holiday.next_occurrence(today), Some(expected));
    }

    #[test]
    fn test_set_holiday_is_idempotent() {
        let mut engine = sample_engine();

        let (_, first) = engine.set_holiday(5, 11, true).unwrap();
        let (_, second) = engine.set_holiday(5, 11, true).unwrap();
        assert_eq!(first, HolidayChange::NowHoliday);
        assert_eq!(second, HolidayChange::AlreadyHoliday);
        assert_eq!(engine.ledger().bank_holidays().count(), 1);

        let (_, removed) = engine.set_holiday(5, 11, false).unwrap();
        let (_, again) = engine.set_holiday(5, 11, false).unwrap();
        assert_eq!(removed, HolidayChange::NoLongerHoliday);
        assert_eq!(again, HolidayChange::AlreadyNotHoliday);
        assert_eq!(engine.ledger().bank_holidays().count(), 0);
    }

    #[test]
    fn test_set_holiday_rejects_invalid_date_without_change() {
        let mut engine = sample_engine();
        assert!(engine.set_holiday(31, 2, true).is_err());
        assert_eq!(engine.ledger().bank_holidays().count(), 0);
    }

    #[test]
    fn test_is_holiday_and_upcoming_order() {
        let mut engine = sample_engine();
        engine.set_holiday(1, 1, true).unwrap();
        engine.set_holiday(25, 12, true).unwrap();
        engine.set_holiday(1, 7, true).unwrap();

        assert!(engine.ledger().is_holiday(date(2030, 12, 25)));
        assert!(!engine.ledger().is_holiday(date(2030, 12, 24)));

        let upcoming: Vec<String> = engine
            .ledger()
            .upcoming_holidays(date(2024, 6, 15))
            .iter()
            .map(|(holiday, _)| holiday.to_string())
            .collect();
        assert_eq!(upcoming, vec!["1/7", "25/12", "1/1"]);
    }
}
