//! `DateTime` conversion and calendar utilities for the PCF8563 RTC.
//!
//! This module provides the internal representation and conversion logic for
//! the PCF8563's date and time registers. It enables safe, validated
//! conversion between the chip's BCD-encoded registers and chrono's
//! `NaiveDateTime`, plus the small calendar helpers (month lengths, leap
//! years, weekday numbering) the scheduling layers share.
//!
//! # Register Model
//!
//! The PCF8563 stores date and time in 7 consecutive registers:
//! - Seconds, Minutes, Hours, Days, Weekdays, Months, Years
//!
//! The year register spans 2000-2099 (the century flag is left alone, as the
//! companion firmware never drives it). The free-running clock is kept in
//! UTC; any local-time handling happens in the conversion layers above.
//!
//! # Weekday Conventions
//!
//! Two numberings coexist deliberately and must never be merged: the
//! register/config side counts 0 = Sunday, while calendar stepping uses
//! chrono's Monday-first [`chrono::Weekday`]. [`weekday_from_sunday`] is the
//! single conversion point between them.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use log::{debug, error};

use crate::{CenturyMonths, Days, Hours, Minutes, Seconds, Weekdays, Years};

/// Weekday number of `moment` in the register/config convention, 0 = Sunday.
#[must_use]
pub fn weekday_from_sunday(moment: &NaiveDateTime) -> u8 {
    moment.weekday().num_days_from_sunday() as u8
}

/// True for Gregorian leap years.
#[must_use]
pub(crate) fn is_leap_year(year: i32) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

const MONTH_LENGTHS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Number of days in `month` of `year`.
///
/// # Panics
/// Panics if `month` is not 1-12.
#[must_use]
pub(crate) fn last_day_of_month(year: i32, month: u32) -> u32 {
    if month == 2 && is_leap_year(year) {
        29
    } else {
        MONTH_LENGTHS[(month - 1) as usize]
    }
}

/// Internal representation of the PCF8563 date and time.
///
/// This struct models the 7 clock registers of the PCF8563, using
/// strongly-typed bitfield wrappers for each field. It is used for
/// register-level I/O and conversion to/from chrono's `NaiveDateTime`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct PCF8563DateTime {
    seconds: Seconds,
    minutes: Minutes,
    hours: Hours,
    days: Days,
    weekdays: Weekdays,
    months: CenturyMonths,
    years: Years,
}

impl PCF8563DateTime {
    /// Helper function to convert a number to BCD digits with validation
    pub(crate) fn make_bcd(value: u32, max_value: u32) -> Result<(u8, u8), PCF8563DateTimeError> {
        if value > max_value {
            return Err(PCF8563DateTimeError::InvalidDateTime);
        }
        let ones = u8::try_from(value % 10).map_err(|_| PCF8563DateTimeError::InvalidDateTime)?;
        let tens = u8::try_from(value / 10).map_err(|_| PCF8563DateTimeError::InvalidDateTime)?;
        Ok((ones, tens))
    }

    fn convert_seconds(seconds: u32) -> Result<Seconds, PCF8563DateTimeError> {
        let (ones, tens) = Self::make_bcd(seconds, 59)?;
        let mut value = Seconds::default();
        value.set_seconds(ones);
        value.set_ten_seconds(tens);
        Ok(value)
    }

    fn convert_minutes(minutes: u32) -> Result<Minutes, PCF8563DateTimeError> {
        let (ones, tens) = Self::make_bcd(minutes, 59)?;
        let mut value = Minutes::default();
        value.set_minutes(ones);
        value.set_ten_minutes(tens);
        Ok(value)
    }

    fn convert_hours(hours: u32) -> Result<Hours, PCF8563DateTimeError> {
        let (ones, tens) = Self::make_bcd(hours, 23)?;
        let mut value = Hours::default();
        value.set_hours(ones);
        value.set_ten_hours(tens);
        Ok(value)
    }

    fn convert_days(days: u32) -> Result<Days, PCF8563DateTimeError> {
        let (ones, tens) = Self::make_bcd(days, 31)?;
        let mut value = Days::default();
        value.set_days(ones);
        value.set_ten_days(tens);
        Ok(value)
    }

    fn convert_weekday(weekday: u32) -> Result<Weekdays, PCF8563DateTimeError> {
        if weekday > 6 {
            return Err(PCF8563DateTimeError::InvalidDateTime);
        }
        let mut value = Weekdays::default();
        value.set_weekday(
            u8::try_from(weekday).map_err(|_| PCF8563DateTimeError::InvalidDateTime)?,
        );
        Ok(value)
    }

    fn convert_months(months: u32) -> Result<CenturyMonths, PCF8563DateTimeError> {
        let (ones, tens) = Self::make_bcd(months, 12)?;
        let mut value = CenturyMonths::default();
        value.set_months(ones);
        value.set_ten_months(tens);
        Ok(value)
    }

    fn convert_years(year: i32) -> Result<Years, PCF8563DateTimeError> {
        if year > 2099 {
            error!("Year {} is too late! must be before 2100", year);
            return Err(PCF8563DateTimeError::YearNotBefore2100);
        }
        if year < 2000 {
            error!("Year {} is too early! must be greater than 1999", year);
            return Err(PCF8563DateTimeError::YearNotAfter1999);
        }

        let offset = u8::try_from(year - 2000).map_err(|_| PCF8563DateTimeError::InvalidDateTime)?;
        let mut value = Years::default();
        value.set_years(offset % 10);
        value.set_ten_years(offset / 10);
        Ok(value)
    }

    /// Converts a UTC `NaiveDateTime` into the register block. The weekday
    /// register is derived from the date, numbered 0 = Sunday.
    pub(crate) fn from_datetime(datetime: &NaiveDateTime) -> Result<Self, PCF8563DateTimeError> {
        let raw = PCF8563DateTime {
            seconds: Self::convert_seconds(datetime.second())?,
            minutes: Self::convert_minutes(datetime.minute())?,
            hours: Self::convert_hours(datetime.hour())?,
            days: Self::convert_days(datetime.day())?,
            weekdays: Self::convert_weekday(u32::from(weekday_from_sunday(datetime)))?,
            months: Self::convert_months(datetime.month())?,
            years: Self::convert_years(datetime.year())?,
        };

        debug!("raw={:?}", raw);

        Ok(raw)
    }

    /// Decodes the register block into a UTC `NaiveDateTime`.
    ///
    /// The weekday register is ignored (the date determines it). A month
    /// register of zero is read as January: a factory-fresh or reset chip
    /// reports month 0 before it is first set.
    pub(crate) fn into_datetime(self) -> Result<NaiveDateTime, PCF8563DateTimeError> {
        let seconds =
            10 * u32::from(self.seconds.ten_seconds()) + u32::from(self.seconds.seconds());
        let minutes =
            10 * u32::from(self.minutes.ten_minutes()) + u32::from(self.minutes.minutes());
        let hours = 10 * u32::from(self.hours.ten_hours()) + u32::from(self.hours.hours());
        let days = 10 * u32::from(self.days.ten_days()) + u32::from(self.days.days());
        let months = 10 * u32::from(self.months.ten_months()) + u32::from(self.months.months());
        let months = if months == 0 { 1 } else { months };
        let years =
            2000 + i32::from(10 * self.years.ten_years() + self.years.years());

        debug!(
            "raw clock y={} mo={} d={} h={} m={} s={}",
            years, months, days, hours, minutes, seconds
        );

        // Validate the date components before creating NaiveDateTime
        NaiveDate::from_ymd_opt(years, months, days)
            .and_then(|d| d.and_hms_opt(hours, minutes, seconds))
            .ok_or(PCF8563DateTimeError::InvalidDateTime)
    }
}

impl From<[u8; 7]> for PCF8563DateTime {
    fn from(data: [u8; 7]) -> Self {
        PCF8563DateTime {
            seconds: Seconds(data[0]),
            minutes: Minutes(data[1]),
            hours: Hours(data[2]),
            days: Days(data[3]),
            weekdays: Weekdays(data[4]),
            months: CenturyMonths(data[5]),
            years: Years(data[6]),
        }
    }
}

impl From<&PCF8563DateTime> for [u8; 7] {
    fn from(dt: &PCF8563DateTime) -> [u8; 7] {
        [
            dt.seconds.0,
            dt.minutes.0,
            dt.hours.0,
            dt.days.0,
            dt.weekdays.0,
            dt.months.0,
            dt.years.0,
        ]
    }
}

#[derive(Debug)]
/// Errors that can occur during PCF8563 date/time conversion or validation.
pub enum PCF8563DateTimeError {
    /// The provided or decoded date/time is invalid (e.g., out of range, not representable)
    InvalidDateTime,
    /// The year is not before 2100 (the year register spans 2000-2099)
    YearNotBefore2100,
    /// The year is not after 1999 (the year register spans 2000-2099)
    YearNotAfter1999,
}
