//! Next-wake planning: stepping schedule entries through calendar time and
//! choosing the one alarm worth programming.
//!
//! The chip offers a single alarm register set, so the planner collapses an
//! arbitrary list of "on" schedules into the earliest future match. The
//! search is bounded: an entry that cannot fire within
//! [`PLAN_HORIZON_YEARS`] of the reference moment is ignored for the pass
//! (a fixed Feb-29 schedule is the far edge of that window).
//!
//! Everything here is pure calendar math over local wall-clock moments;
//! converting the winner to UTC and writing the registers is the driver's
//! job ([`crate::PCF8563::program_next_wake`]).

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use log::debug;

use crate::alarm::AlarmFields;
use crate::datetime::{is_leap_year, last_day_of_month, weekday_from_sunday};
use crate::schedule::{CommandKind, ScheduleEntry};

/// Years searched before an entry is declared unschedulable for this pass.
/// Divisible by 4 so a fixed leap-day schedule is always within reach.
pub const PLAN_HORIZON_YEARS: i32 = 12;

/// The planner's verdict: when the next "on" schedule fires and what to
/// program, both in local wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextWake {
    /// The next moment an "on" entry matches, strictly after the reference
    pub fire_at: NaiveDateTime,
    /// Alarm fields to program: date/weekday from the entry, hour/minute
    /// from the firing moment
    pub alarm: AlarmFields,
}

fn date_with(moment: NaiveDateTime, year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .expect("stepped date is valid")
        .and_time(moment.time())
}

/// Advances `from` to the next structurally possible match for `entry`.
///
/// Walks the field list minute, hour, date, month, year, least significant
/// first: the first *unconstrained* field that can step without carrying
/// absorbs the increment; on a carry the field wraps to its base and the
/// walk moves up. Month lengths and leap years are honored, so a wildcard
/// month skips months too short for a fixed date, and a Feb-29 moment in
/// the year step jumps to the next leap year.
///
/// The result is always strictly later than `from`.
#[must_use]
pub fn advance(entry: &ScheduleEntry, from: NaiveDateTime) -> NaiveDateTime {
    let mut moment = from;

    if entry.minute.is_none() {
        if moment.minute() < 59 {
            return moment + TimeDelta::minutes(1);
        }
        moment = moment.with_minute(0).expect("minute 0 is valid");
    }

    if entry.hour.is_none() {
        if moment.hour() < 23 {
            return moment + TimeDelta::hours(1);
        }
        moment = moment.with_hour(0).expect("hour 0 is valid");
    }

    if entry.date.is_none() {
        if moment.day() < last_day_of_month(moment.year(), moment.month()) {
            return moment + TimeDelta::days(1);
        }
        moment = moment.with_day(1).expect("day 1 is valid");
    }

    if entry.month.is_none() {
        let mut year = moment.year();
        let mut month = moment.month();
        loop {
            if month < 12 {
                month += 1;
            } else {
                month = 1;
                year += 1;
            }
            if moment.day() <= last_day_of_month(year, month) {
                return date_with(moment, year, month, moment.day());
            }
        }
    }

    // Year step; a leap-day moment only recurs in a leap year
    if moment.month() == 2 && moment.day() == 29 {
        let mut year = moment.year() + 1;
        while !is_leap_year(year) {
            year += 1;
        }
        return date_with(moment, year, 2, 29);
    }
    date_with(moment, moment.year() + 1, moment.month(), moment.day())
}

/// Builds the initial trial moment for an entry: the entry's concrete
/// fields, with every wildcard taken from `not_before` (seconds zeroed).
///
/// When the seeded day overflows the seeded month, the day is clamped (for
/// a wildcard date), or the month/year advance until the fixed date exists
/// (wildcard month), or the year alone advances (fixed leap day). Returns
/// `None` when no real calendar moment can carry the entry's values.
fn seed_trial(entry: &ScheduleEntry, not_before: NaiveDateTime) -> Option<NaiveDateTime> {
    let mut minute = entry.minute.map_or(not_before.minute(), u32::from);
    let mut hour = entry.hour.map_or(not_before.hour(), u32::from);
    let mut day = entry.date.map_or(not_before.day(), u32::from);
    let mut month = entry.month.map_or(not_before.month(), u32::from);
    let mut year = not_before.year();

    if !(1..=12).contains(&month) {
        return None;
    }

    let mut last = last_day_of_month(year, month);
    if day > last {
        if entry.date.is_none() {
            // Wildcard day seeded into a shorter fixed month
            day = last;
        } else {
            if entry.minute.is_none() {
                minute = 0;
            }
            if entry.hour.is_none() {
                hour = 0;
            }
            if entry.month.is_none() && day <= 31 {
                // Find the next month long enough for the fixed date
                while day > last {
                    if month < 12 {
                        month += 1;
                    } else {
                        month = 1;
                        year += 1;
                    }
                    last = last_day_of_month(year, month);
                }
            } else if day == 29 && month == 2 {
                // Fixed leap day: only the year may move
                while day > last {
                    year += 1;
                    last = last_day_of_month(year, month);
                }
            } else {
                return None;
            }
        }
    }

    NaiveDate::from_ymd_opt(year, month, day).and_then(|d| d.and_hms_opt(hour, minute, 0))
}

/// Finds the earliest future "on" match across `entries`, strictly after
/// `not_before`.
///
/// Ties go to the first entry in post-expansion config order. Returns
/// `None` when nothing fires within [`PLAN_HORIZON_YEARS`]; the caller
/// should disable the hardware alarm in that case.
#[must_use]
pub fn plan_next(entries: &[ScheduleEntry], not_before: NaiveDateTime) -> Option<NextWake> {
    let horizon = not_before
        .with_year(not_before.year() + PLAN_HORIZON_YEARS)
        .expect("horizon is a leap multiple away");
    let mut best_time = horizon;
    let mut best: Option<&ScheduleEntry> = None;

    for entry in entries {
        if entry.kind() != Some(CommandKind::On) {
            continue;
        }
        let Some(mut trial) = seed_trial(entry, not_before) else {
            debug!("entry {:?} cannot be seeded; skipping", entry);
            continue;
        };

        if let Some(target) = entry.weekday {
            // Rotate forward to the nearest matching day of week
            if weekday_from_sunday(&trial) != target || trial < not_before {
                if entry.minute.is_none() {
                    trial = trial.with_minute(0).expect("minute 0 is valid");
                }
                if entry.hour.is_none() {
                    trial = trial.with_hour(0).expect("hour 0 is valid");
                }
                let mut offset = i64::from(target) - i64::from(weekday_from_sunday(&trial));
                if offset < 0 {
                    offset += 7;
                } else if offset == 0 {
                    offset = 7;
                }
                trial += TimeDelta::days(offset);
            }
            // Week-step until the whole entry matches, bounded
            while !entry.matches(&trial)
                && trial.year() - not_before.year() < PLAN_HORIZON_YEARS
            {
                trial += TimeDelta::days(7);
            }
            if trial.year() - not_before.year() >= PLAN_HORIZON_YEARS {
                debug!("entry {:?} unschedulable within horizon", entry);
                continue;
            }
        }

        while trial <= not_before {
            trial = advance(entry, trial);
        }

        if trial < best_time {
            best_time = trial;
            best = Some(entry);
        }
    }

    best.map(|entry| {
        debug!("next wake {} from entry {:?}", best_time, entry);
        NextWake {
            fire_at: best_time,
            alarm: AlarmFields {
                minute: Some(best_time.minute() as u8),
                hour: Some(best_time.hour() as u8),
                date: entry.date,
                weekday: entry.weekday,
            },
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::parse_line;
    use chrono::NaiveDate;

    fn moment(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    fn entry(line: &str) -> ScheduleEntry {
        parse_line(line).remove(0)
    }

    #[test]
    fn test_advance_is_strictly_later() {
        let cases = [
            ("* * * * * on", moment(2024, 3, 14, 12, 30)),
            ("0 * * * * on", moment(2024, 3, 14, 12, 0)),
            ("0 1 * * * on", moment(2024, 3, 14, 1, 0)),
            ("0 1 31 * * on", moment(2024, 1, 31, 1, 0)),
            ("* * * * * on", moment(2024, 12, 31, 23, 59)),
        ];
        for (line, from) in cases {
            let e = entry(line);
            assert!(advance(&e, from) > from, "{line} from {from}");
        }

        // Fully constrained down to a fixed leap day
        let leap = ScheduleEntry {
            minute: Some(0),
            hour: Some(0),
            date: Some(29),
            month: Some(2),
            weekday: None,
            command: "on".to_string(),
        };
        let from = moment(2024, 2, 29, 0, 0);
        assert!(advance(&leap, from) > from);
    }

    #[test]
    fn test_advance_minute_steps_and_carries() {
        let e = entry("* * * * * on");
        assert_eq!(
            advance(&e, moment(2024, 3, 14, 10, 30)),
            moment(2024, 3, 14, 10, 31)
        );
        assert_eq!(
            advance(&e, moment(2024, 3, 14, 23, 59)),
            moment(2024, 3, 15, 0, 0)
        );
    }

    #[test]
    fn test_advance_with_fixed_minute_steps_hour() {
        let e = entry("15 * * * * on");
        assert_eq!(
            advance(&e, moment(2024, 3, 14, 10, 15)),
            moment(2024, 3, 14, 11, 15)
        );
        assert_eq!(
            advance(&e, moment(2024, 3, 14, 23, 15)),
            moment(2024, 3, 15, 0, 15)
        );
    }

    #[test]
    fn test_advance_daily_across_month_end() {
        let e = entry("0 1 * * * on");
        assert_eq!(
            advance(&e, moment(2024, 1, 31, 1, 0)),
            moment(2024, 2, 1, 1, 0)
        );
        assert_eq!(
            advance(&e, moment(2023, 2, 28, 1, 0)),
            moment(2023, 3, 1, 1, 0)
        );
    }

    #[test]
    fn test_advance_fixed_date_skips_short_months() {
        let e = entry("0 1 31 * * on");
        assert_eq!(
            advance(&e, moment(2024, 1, 31, 1, 0)),
            moment(2024, 3, 31, 1, 0)
        );

        // Day 29 reaches February only in leap years
        let e = entry("0 0 29 * * on");
        assert_eq!(
            advance(&e, moment(2024, 1, 29, 0, 0)),
            moment(2024, 2, 29, 0, 0)
        );
        assert_eq!(
            advance(&e, moment(2023, 1, 29, 0, 0)),
            moment(2023, 3, 29, 0, 0)
        );
    }

    #[test]
    fn test_advance_leap_day_year_step() {
        let leap = ScheduleEntry {
            minute: Some(0),
            hour: Some(0),
            date: Some(29),
            month: Some(2),
            weekday: None,
            command: "on".to_string(),
        };
        assert_eq!(
            advance(&leap, moment(2024, 2, 29, 0, 0)),
            moment(2028, 2, 29, 0, 0)
        );
    }

    #[test]
    fn test_plan_next_daily_pair() {
        let mut entries = parse_line("0 1 * * * on");
        entries.extend(parse_line("0 13 * * * off"));

        let plan = plan_next(&entries, moment(2024, 3, 14, 12, 0)).unwrap();
        assert_eq!(plan.fire_at, moment(2024, 3, 15, 1, 0));
        assert_eq!(
            plan.alarm,
            AlarmFields {
                minute: Some(0),
                hour: Some(1),
                date: None,
                weekday: None,
            }
        );
    }

    #[test]
    fn test_plan_next_is_strictly_after() {
        // A match landing exactly on the reference advances to the next one
        let entries = parse_line("0 12 * * * on");
        let plan = plan_next(&entries, moment(2024, 3, 14, 12, 0)).unwrap();
        assert_eq!(plan.fire_at, moment(2024, 3, 15, 12, 0));
    }

    #[test]
    fn test_plan_next_interval_only_uses_next_tick() {
        // Hourly schedule: the programmed hour is the winning moment's, not
        // a wildcard
        let entries = parse_line("0 * * * * on");
        let plan = plan_next(&entries, moment(2024, 3, 14, 12, 0)).unwrap();
        assert_eq!(plan.fire_at, moment(2024, 3, 14, 13, 0));
        assert_eq!(
            plan.alarm,
            AlarmFields {
                minute: Some(0),
                hour: Some(13),
                date: None,
                weekday: None,
            }
        );

        let plan = plan_next(&entries, moment(2024, 3, 14, 12, 30)).unwrap();
        assert_eq!(plan.fire_at, moment(2024, 3, 14, 13, 0));
    }

    #[test]
    fn test_plan_next_no_on_entries() {
        let entries = parse_line("0 13 * * * off");
        assert!(plan_next(&entries, moment(2024, 3, 14, 12, 0)).is_none());
        assert!(plan_next(&[], moment(2024, 3, 14, 12, 0)).is_none());
    }

    #[test]
    fn test_plan_next_unschedulable_entries() {
        // A date no month ever has
        let impossible = ScheduleEntry {
            minute: Some(0),
            hour: Some(0),
            date: Some(30),
            month: Some(2),
            weekday: None,
            command: "on".to_string(),
        };
        assert!(plan_next(
            &[impossible],
            moment(2024, 3, 14, 12, 0)
        )
        .is_none());

        // A weekday number that never occurs
        let bad_weekday = ScheduleEntry {
            weekday: Some(7),
            command: "on".to_string(),
            ..Default::default()
        };
        assert!(plan_next(
            &[bad_weekday],
            moment(2024, 3, 14, 12, 0)
        )
        .is_none());

        // An out-of-range minute can never form a calendar moment
        let bad_minute = ScheduleEntry {
            minute: Some(99),
            hour: Some(1),
            command: "on".to_string(),
            ..Default::default()
        };
        assert!(plan_next(
            &[bad_minute],
            moment(2024, 3, 14, 12, 0)
        )
        .is_none());
    }

    #[test]
    fn test_plan_next_fixed_leap_day() {
        let leap = ScheduleEntry {
            minute: Some(0),
            hour: Some(0),
            date: Some(29),
            month: Some(2),
            weekday: None,
            command: "on".to_string(),
        };
        let plan = plan_next(&[leap.clone()], moment(2023, 3, 1, 0, 0)).unwrap();
        assert_eq!(plan.fire_at, moment(2024, 2, 29, 0, 0));

        // Just after a leap day, the next one is four years out
        let plan = plan_next(&[leap], moment(2024, 3, 1, 0, 0)).unwrap();
        assert_eq!(plan.fire_at, moment(2028, 2, 29, 0, 0));
    }

    #[test]
    fn test_plan_next_wildcard_month_day_29() {
        // With the month wildcard, day 29 fires monthly, skipping short
        // Februaries
        let entries = parse_line("0 0 29 * * on");
        let plan = plan_next(&entries, moment(2023, 3, 1, 0, 0)).unwrap();
        assert_eq!(plan.fire_at, moment(2023, 3, 29, 0, 0));

        let plan = plan_next(&entries, moment(2023, 1, 30, 0, 0)).unwrap();
        assert_eq!(plan.fire_at, moment(2023, 3, 29, 0, 0));
    }

    #[test]
    fn test_plan_next_weekday_rotation() {
        // 2024-03-13 was a Wednesday; weekday 0 is the following Sunday
        let entries = parse_line("30 8 * * 0 on");
        let plan = plan_next(&entries, moment(2024, 3, 13, 10, 0)).unwrap();
        assert_eq!(plan.fire_at, moment(2024, 3, 17, 8, 30));
        assert_eq!(
            plan.alarm,
            AlarmFields {
                minute: Some(30),
                hour: Some(8),
                date: None,
                weekday: Some(0),
            }
        );
        assert!(plan.fire_at - moment(2024, 3, 13, 10, 0) <= TimeDelta::days(7));
    }

    #[test]
    fn test_plan_next_weekday_wildcard_time_zeroed() {
        // With wildcard hour/minute the rotated trial restarts at midnight
        let entries = parse_line("* * * * 0 on");
        let plan = plan_next(&entries, moment(2024, 3, 13, 10, 45)).unwrap();
        assert_eq!(plan.fire_at, moment(2024, 3, 17, 0, 0));
    }

    #[test]
    fn test_plan_next_weekday_already_matching() {
        // Reference is a Sunday before the entry's time: same day wins
        let entries = parse_line("30 8 * * 0 on");
        let plan = plan_next(&entries, moment(2024, 3, 17, 6, 0)).unwrap();
        assert_eq!(plan.fire_at, moment(2024, 3, 17, 8, 30));
    }

    #[test]
    fn test_plan_next_tie_goes_to_first_entry() {
        let mut entries = parse_line("0 1 * * * on");
        entries.extend(parse_line("0 1 15 * * on"));

        let plan = plan_next(&entries, moment(2024, 3, 14, 12, 0)).unwrap();
        assert_eq!(plan.fire_at, moment(2024, 3, 15, 1, 0));
        // Both fire at the same moment; the first entry's (wildcard) date
        // shape is what gets programmed
        assert_eq!(plan.alarm.date, None);
    }

    #[test]
    fn test_plan_next_picks_earliest_across_entries() {
        let mut entries = parse_line("0 6 * * * on");
        entries.extend(parse_line("0 1 * * * on"));

        let plan = plan_next(&entries, moment(2024, 3, 14, 12, 0)).unwrap();
        assert_eq!(plan.fire_at, moment(2024, 3, 15, 1, 0));
    }

    #[test]
    fn test_plan_next_seed_clamps_wildcard_day() {
        // Seeded from Jan 31 into fixed February: wildcard day clamps to
        // month end
        let feb_entry = ScheduleEntry {
            minute: Some(0),
            hour: Some(0),
            date: None,
            month: Some(2),
            weekday: None,
            command: "on".to_string(),
        };
        let plan = plan_next(&[feb_entry], moment(2024, 1, 31, 12, 0)).unwrap();
        assert_eq!(plan.fire_at, moment(2024, 2, 29, 0, 0));
    }
}
