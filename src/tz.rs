//! Local/UTC conversion for alarm fields.
//!
//! The free-running clock and the alarm registers stay in UTC; user
//! schedules are written in local wall-clock time. This module shifts an
//! [`AlarmFields`] across a single UTC offset, sampled once per conversion.
//!
//! Only present fields shift. A wildcard field is excluded from the shift
//! and from borrow propagation: a wildcard hour means no day rollover
//! happens no matter what the minute borrow was. A day borrow moves a
//! present weekday (mod 7) and a present day of month, clamped against the
//! length of the reference month (`month_of`): rolling past month end wraps
//! to day 1, rolling below day 1 wraps to that month's last day.
//!
//! The date handling is an approximation that holds for sub-day offset
//! shifts only, and the clamp month is whichever month the caller samples;
//! daylight-saving transitions are not modelled.

use chrono::{Datelike, Local, NaiveDate};

use crate::alarm::AlarmFields;
use crate::datetime::last_day_of_month;

/// Offset of local time from UTC in seconds, truncated to whole minutes
/// (the alarm register set has no seconds field).
#[must_use]
pub fn local_offset_seconds() -> i32 {
    let offset = Local::now().offset().local_minus_utc();
    offset - offset % 60
}

/// Converts local-time alarm fields to the UTC values the hardware stores.
#[must_use]
pub fn to_hardware_fields(
    local: &AlarmFields,
    offset_seconds: i32,
    month_of: NaiveDate,
) -> AlarmFields {
    shifted(local, offset_seconds, month_of)
}

/// Converts UTC alarm fields read from the hardware back to local time.
#[must_use]
pub fn to_local_fields(
    utc: &AlarmFields,
    offset_seconds: i32,
    month_of: NaiveDate,
) -> AlarmFields {
    shifted(utc, -offset_seconds, month_of)
}

/// Subtracts `offset_seconds` from the present fields, carrying borrows
/// minute -> hour -> day.
fn shifted(fields: &AlarmFields, offset_seconds: i32, month_of: NaiveDate) -> AlarmFields {
    let truncated = offset_seconds - offset_seconds % 60;
    let diff_minutes = (truncated / 60) % 60;
    let diff_hours = truncated / 3600;

    let mut result = *fields;

    let mut add_hour = 0;
    if let Some(minute) = fields.minute {
        let mut minute = i32::from(minute) - diff_minutes;
        if minute < 0 {
            add_hour = -1;
            minute += 60;
        } else if minute > 59 {
            add_hour = 1;
            minute -= 60;
        }
        result.minute = Some(minute as u8);
    }

    let mut add_day = 0;
    if let Some(hour) = fields.hour {
        let mut hour = i32::from(hour) - diff_hours + add_hour;
        if hour < 0 {
            hour += 24;
            add_day = -1;
        } else if hour > 23 {
            hour -= 24;
            add_day = 1;
        }
        result.hour = Some(hour as u8);
    }

    if add_day != 0 {
        if let Some(weekday) = fields.weekday {
            result.weekday = Some((i32::from(weekday) + add_day).rem_euclid(7) as u8);
        }
        if let Some(date) = fields.date {
            let last = last_day_of_month(month_of.year(), month_of.month()) as i32;
            let date = i32::from(date) + add_day;
            result.date = Some(if date < 1 {
                last as u8
            } else if date > last {
                1
            } else {
                date as u8
            });
        }
    }

    result
}
