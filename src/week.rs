//! ISO week keys (`2026-W05`) and business-day arithmetic.

use crate::error::{PlannerError, PlannerResult};
use crate::types::{DATE_FORMAT, TIME_FORMAT};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use regex_lite::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// First and last business weekday (Monday..Friday).
pub const FIRST_WEEKDAY: u8 = 1;
pub const LAST_WEEKDAY: u8 = 5;

static WEEK_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-W(\d{2})$").expect("week key pattern compiles"));

/// An ISO 8601 week, identified by its Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekKey {
    monday: NaiveDate,
}

impl WeekKey {
    /// Parse `YYYY-Www`, rejecting weeks that do not exist in that ISO year.
    pub fn parse(value: &str) -> PlannerResult<Self> {
        let caps = WEEK_KEY_RE
            .captures(value)
            .ok_or_else(|| PlannerError::invalid_week_key(value))?;
        let year: i32 = caps[1]
            .parse()
            .map_err(|_| PlannerError::invalid_week_key(value))?;
        let week: u32 = caps[2]
            .parse()
            .map_err(|_| PlannerError::invalid_week_key(value))?;

        let monday = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
            .ok_or_else(|| PlannerError::invalid_week_key(value))?;
        Ok(Self { monday })
    }

    /// The ISO week containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        let offset = date.weekday().num_days_from_monday() as i64;
        Self {
            monday: date - Duration::days(offset),
        }
    }

    pub fn iso_year(&self) -> i32 {
        self.monday.iso_week().year()
    }

    pub fn iso_week(&self) -> u32 {
        self.monday.iso_week().week()
    }

    pub fn monday(&self) -> NaiveDate {
        self.monday
    }

    pub fn friday(&self) -> NaiveDate {
        self.monday + Duration::days((LAST_WEEKDAY - 1) as i64)
    }

    /// Concrete date of a business weekday in this week.
    pub fn date_for(&self, weekday: u8) -> PlannerResult<NaiveDate> {
        let weekday = validate_weekday(weekday as i64)?;
        Ok(self.monday + Duration::days((weekday - 1) as i64))
    }

    /// Shift by whole weeks; year boundaries roll over through the calendar.
    ///
    /// Fails when the result falls outside the representable date range.
    pub fn offset(&self, weeks: i64) -> PlannerResult<Self> {
        Duration::try_weeks(weeks)
            .and_then(|shift| self.monday.checked_add_signed(shift))
            .map(|monday| Self { monday })
            .ok_or_else(|| {
                PlannerError::invalid_value(
                    "offset",
                    format!("Shifting {} by {} weeks leaves the calendar", self, weeks),
                )
            })
    }

    pub fn next(&self) -> PlannerResult<Self> {
        self.offset(1)
    }

    pub fn prev(&self) -> PlannerResult<Self> {
        self.offset(-1)
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-W{:02}", self.iso_year(), self.iso_week())
    }
}

impl FromStr for WeekKey {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Add or subtract whole ISO weeks from a week key.
pub fn adjacent_week_key(week_key: &str, offset: i64) -> PlannerResult<String> {
    Ok(WeekKey::parse(week_key)?.offset(offset)?.to_string())
}

/// Business weekday (1..=5) of a date, or `None` on weekends.
pub fn business_weekday(date: NaiveDate) -> Option<u8> {
    let n = date.weekday().number_from_monday() as u8;
    (n <= LAST_WEEKDAY).then_some(n)
}

/// Validate a board weekday.
pub fn validate_weekday(weekday: i64) -> PlannerResult<u8> {
    if (FIRST_WEEKDAY as i64..=LAST_WEEKDAY as i64).contains(&weekday) {
        Ok(weekday as u8)
    } else {
        Err(PlannerError::invalid_weekday(weekday))
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> PlannerResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| PlannerError::invalid_date(value))
}

/// Parse an `HH:MM` wall-clock time.
pub fn parse_time(field: &str, value: &str) -> PlannerResult<NaiveTime> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|_| {
        PlannerError::invalid_value(field, format!("Malformed time '{}', expected HH:MM", value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_and_formats() {
        let key = WeekKey::parse("2026-W05").unwrap();
        assert_eq!(key.monday(), date(2026, 1, 26));
        assert_eq!(key.friday(), date(2026, 1, 30));
        assert_eq!(key.to_string(), "2026-W05");
    }

    #[test]
    fn rejects_malformed_keys() {
        for bad in ["2026-05", "2026-W5", "26-W05", "2026-W00", "2026-W54", "2026-w05", " 2026-W05"] {
            let err = WeekKey::parse(bad).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidWeekKey, "{bad}");
        }
    }

    #[test]
    fn week_53_only_in_long_years() {
        // 2026 has 53 ISO weeks, 2025 has 52.
        assert!(WeekKey::parse("2026-W53").is_ok());
        assert!(WeekKey::parse("2025-W53").is_err());
    }

    #[test]
    fn date_for_weekday() {
        let key = WeekKey::parse("2026-W05").unwrap();
        assert_eq!(key.date_for(1).unwrap(), date(2026, 1, 26));
        assert_eq!(key.date_for(2).unwrap(), date(2026, 1, 27));
        assert_eq!(key.date_for(5).unwrap(), date(2026, 1, 30));
        assert_eq!(key.date_for(0).unwrap_err().code, ErrorCode::InvalidWeekday);
        assert_eq!(key.date_for(6).unwrap_err().code, ErrorCode::InvalidWeekday);
    }

    #[test]
    fn iso_year_differs_from_calendar_year() {
        // Monday 2024-12-30 belongs to 2025-W01.
        let key = WeekKey::containing(date(2024, 12, 31));
        assert_eq!(key.to_string(), "2025-W01");
        assert_eq!(key.monday(), date(2024, 12, 30));
    }

    #[test]
    fn adjacent_rolls_back_into_previous_iso_year() {
        // 2025 has 52 ISO weeks.
        assert_eq!(adjacent_week_key("2026-W01", -1).unwrap(), "2025-W52");
        // 2020 has 53 ISO weeks.
        assert_eq!(adjacent_week_key("2021-W01", -1).unwrap(), "2020-W53");
    }

    #[test]
    fn adjacent_rolls_forward_into_next_iso_year() {
        assert_eq!(adjacent_week_key("2026-W53", 1).unwrap(), "2027-W01");
        assert_eq!(adjacent_week_key("2025-W52", 1).unwrap(), "2026-W01");
        assert_eq!(adjacent_week_key("2026-W05", 1).unwrap(), "2026-W06");
    }

    #[test]
    fn times_are_hours_and_minutes() {
        assert_eq!(
            parse_time("start", "09:30").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        for bad in ["24:00", "09:30:00", "noon", ""] {
            let err = parse_time("end", bad).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidFieldValue, "{bad}");
            assert_eq!(err.field.as_deref(), Some("end"));
        }
    }

    #[test]
    fn huge_offsets_are_errors() {
        for offset in [i64::MAX, i64::MIN, 1_000_000_000] {
            let err = adjacent_week_key("2026-W05", offset).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidFieldValue);
            assert_eq!(err.field.as_deref(), Some("offset"));
        }
    }

    #[test]
    fn containing_any_weekday_maps_to_monday() {
        let key = WeekKey::parse("2026-W05").unwrap();
        for d in 26..=31 {
            assert_eq!(WeekKey::containing(date(2026, 1, d)), key);
        }
        assert_eq!(WeekKey::containing(date(2026, 2, 1)), key);
    }

    #[test]
    fn business_weekday_excludes_weekend() {
        assert_eq!(business_weekday(date(2026, 1, 26)), Some(1));
        assert_eq!(business_weekday(date(2026, 1, 30)), Some(5));
        assert_eq!(business_weekday(date(2026, 1, 31)), None);
        assert_eq!(business_weekday(date(2026, 2, 1)), None);
    }

    #[test]
    fn parse_date_validates() {
        assert_eq!(parse_date("2026-02-03").unwrap(), date(2026, 2, 3));
        assert_eq!(parse_date("2026-02-30").unwrap_err().code, ErrorCode::InvalidDate);
        assert_eq!(parse_date("03/02/2026").unwrap_err().code, ErrorCode::InvalidDate);
    }
}
