//! Wildcard-capable on/off schedules parsed from cron-like config text.
//!
//! A schedule line follows the general cron shape, restricted to `*` and
//! comma-separated integer lists:
//!
//! ```text
//! minute hour date month weekday command...
//! ```
//!
//! Weekdays count 0 = Sunday. The month field is accepted but always treated
//! as a wildcard; month-constrained schedules have calendar edge cases the
//! companion firmware does not support. Commands are `on` and `off`
//! (case-insensitive); any other command parses but never matches an on/off
//! test.
//!
//! A line with value lists denotes the cartesian product of its concrete
//! combinations, so `0 1,13 * * * off` expands to two entries. Expansion
//! order is minute, hour, date, month, weekday, outermost first; downstream
//! tie-breaking relies on that order.

use chrono::{Datelike, NaiveDateTime, Timelike};
use log::debug;

use crate::datetime::weekday_from_sunday;

/// The two commands the power scheduler understands.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Power the host on
    On,
    /// Shut the host down
    Off,
}

/// One concrete schedule: a set of optional time constraints plus a command.
///
/// Each temporal field is either wildcard (`None`, matches anything) or one
/// concrete value. Entries are immutable once produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleEntry {
    /// Minute (0-59) or wildcard
    pub minute: Option<u8>,
    /// Hour (0-23) or wildcard
    pub hour: Option<u8>,
    /// Day of month (1-31) or wildcard
    pub date: Option<u8>,
    /// Month; always wildcard (accepted in config text, never honored)
    pub month: Option<u8>,
    /// Weekday (0-6, 0 = Sunday) or wildcard
    pub weekday: Option<u8>,
    /// Remaining tokens of the line, joined
    pub command: String,
}

impl ScheduleEntry {
    /// The on/off meaning of the command, if it has one.
    #[must_use]
    pub fn kind(&self) -> Option<CommandKind> {
        if self.command.eq_ignore_ascii_case("on") {
            Some(CommandKind::On)
        } else if self.command.eq_ignore_ascii_case("off") {
            Some(CommandKind::Off)
        } else {
            None
        }
    }

    /// True when every concrete field of the entry equals the corresponding
    /// field of `moment`. Weekdays compare in the 0 = Sunday convention.
    #[must_use]
    pub fn matches(&self, moment: &NaiveDateTime) -> bool {
        fn field_matches(field: Option<u8>, actual: u32) -> bool {
            field.map_or(true, |value| u32::from(value) == actual)
        }

        field_matches(self.minute, moment.minute())
            && field_matches(self.hour, moment.hour())
            && field_matches(self.date, moment.day())
            && field_matches(self.month, moment.month())
            && field_matches(self.weekday, u32::from(weekday_from_sunday(moment)))
    }

    /// Human-readable summary, e.g. `Startup | Daily: 7am`.
    #[must_use]
    pub fn describe(&self) -> String {
        let action = match self.kind() {
            Some(CommandKind::On) => "Startup",
            _ => "Shutdown",
        };
        format!(
            "{} | {}",
            action,
            describe_fields(
                &[self.month],
                &[self.weekday],
                &[self.date],
                &[self.hour],
                &[self.minute],
            )
        )
    }
}

/// First entry whose command has `kind` and whose schedule matches `moment`.
#[must_use]
pub fn command_for<'a>(
    entries: &'a [ScheduleEntry],
    moment: &NaiveDateTime,
    kind: CommandKind,
) -> Option<&'a ScheduleEntry> {
    entries
        .iter()
        .find(|entry| entry.kind() == Some(kind) && entry.matches(moment))
}

/// Parses one field token into its value set.
///
/// `*` is a single wildcard. A comma-separated list yields one value per
/// item; a negative item is a wildcard value. Anything unparsable turns the
/// whole field into a wildcard (best-effort parsing, not an error).
fn parse_field(token: &str) -> Vec<Option<u8>> {
    if token == "*" {
        return vec![None];
    }
    let mut values = Vec::new();
    for item in token.split(',') {
        match item.trim().parse::<i64>() {
            Ok(value) if value < 0 => values.push(None),
            Ok(value) => values.push(Some(u8::try_from(value).unwrap_or(u8::MAX))),
            Err(_) => return vec![None],
        }
    }
    if values.is_empty() {
        vec![None]
    } else {
        values
    }
}

/// Expands one schedule line into the cartesian product of its concrete
/// entries. Lines with fewer than 6 whitespace-separated tokens expand to
/// nothing.
#[must_use]
pub fn parse_line(line: &str) -> Vec<ScheduleEntry> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 6 {
        return Vec::new();
    }

    let minutes = parse_field(tokens[0]);
    let hours = parse_field(tokens[1]);
    let dates = parse_field(tokens[2]);
    // Month values are accepted but ignored; their calendar edge cases are
    // not supported.
    let months = vec![None];
    let weekdays = parse_field(tokens[4]);
    let command = tokens[5..].join(" ");

    let mut entries = Vec::new();
    for &minute in &minutes {
        for &hour in &hours {
            for &date in &dates {
                for &month in &months {
                    for &weekday in &weekdays {
                        entries.push(ScheduleEntry {
                            minute,
                            hour,
                            date,
                            month,
                            weekday,
                            command: command.clone(),
                        });
                    }
                }
            }
        }
    }
    debug!("expanded {:?} into {} entries", line, entries.len());
    entries
}

/// The schedulable lines of a config document.
///
/// Parsing is best effort: per line, bytes outside the printable ASCII range
/// are stripped, blank lines and `#` comments are skipped, and anything with
/// fewer than 6 tokens is dropped silently.
#[derive(Debug, Clone, Default)]
pub struct ScheduleConfig {
    lines: Vec<String>,
}

impl ScheduleConfig {
    /// Filters config text down to its schedulable lines.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut lines = Vec::new();
        for raw in text.lines() {
            let cleaned: String = raw
                .trim()
                .replace('\t', " ")
                .chars()
                .filter(|c| ('\x20'..='\x7e').contains(c))
                .collect();
            if cleaned.is_empty() || cleaned.starts_with('#') {
                continue;
            }
            if cleaned.split_whitespace().count() >= 6 {
                lines.push(cleaned);
            }
        }
        ScheduleConfig { lines }
    }

    /// Every schedulable line, in document order.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines shown when listing schedules. Lines whose first field is
    /// literally `*` (every-minute schedules) are hidden here but still
    /// evaluated by [`ScheduleConfig::entries`] -- an intentional asymmetry.
    #[must_use]
    pub fn listed(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|line| line.split_whitespace().next() != Some("*"))
            .map(String::as_str)
            .collect()
    }

    /// Expands every schedulable line into its concrete entries, in
    /// post-expansion config order.
    #[must_use]
    pub fn entries(&self) -> Vec<ScheduleEntry> {
        self.lines
            .iter()
            .flat_map(|line| parse_line(line))
            .collect()
    }
}

const WEEKDAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn ordinal_suffix(value: u8) -> &'static str {
    match value % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// Renders an hour (0-23) and optional minute on a 12-hour clock, with
/// `mn`/`nn` marking midnight and noon on the hour.
fn describe_hour_minute(hour: u8, minute: Option<u8>) -> String {
    let (display, meridiem) = match hour {
        0 => (12, "am"),
        1..=11 => (hour, "am"),
        12 => (12, "pm"),
        _ => (hour - 12, "pm"),
    };
    let minute = minute.unwrap_or(0);
    if minute == 0 {
        let meridiem = match hour {
            0 => "mn",
            12 => "nn",
            _ => meridiem,
        };
        return format!("{display}{meridiem}");
    }
    format!("{display}:{minute:02}{meridiem}")
}

/// Renders a human summary of schedule field value sets.
///
/// Category precedence: annual/monthly (date and month constrained), then
/// weekly (weekday), then daily (hour), then hourly (minute only), then
/// every-minute.
#[must_use]
pub(crate) fn describe_fields(
    months: &[Option<u8>],
    weekdays: &[Option<u8>],
    dates: &[Option<u8>],
    hours: &[Option<u8>],
    minutes: &[Option<u8>],
) -> String {
    let month_name = |m: u8| MONTH_NAMES.get((m as usize).wrapping_sub(1)).unwrap_or(&"?");
    let weekday_name = |w: u8| WEEKDAY_NAMES.get(w as usize).unwrap_or(&"?");

    let mut prefix = "";
    let mut has_date = false;
    let mut has_month = false;

    let mut month_dates: Vec<String> = Vec::new();
    for &month in months {
        for &date in dates {
            match (month, date) {
                (Some(m), Some(d)) => {
                    has_month = true;
                    has_date = true;
                    month_dates.push(format!("{} {}{}", month_name(m), d, ordinal_suffix(d)));
                }
                (None, Some(d)) => {
                    has_date = true;
                    month_dates.push(format!("{}{}", d, ordinal_suffix(d)));
                }
                (Some(m), None) => month_dates.push((*month_name(m)).to_string()),
                (None, None) => {}
            }
        }
    }

    let mut out = String::new();
    if !month_dates.is_empty() {
        prefix = if has_month { "Annually:" } else { "Monthly:" };
        out.push_str(" Every ");
        out.push_str(&month_dates.join(","));
        if !has_month {
            out.push_str(" of the Month");
        }
    }

    let weekday_names: Vec<&str> = weekdays
        .iter()
        .filter_map(|wd| wd.map(|w| *weekday_name(w)))
        .collect();
    if !weekday_names.is_empty() {
        has_date = true;
        if prefix.is_empty() {
            prefix = "Weekly:";
            out.push_str(" on ");
        } else {
            out.push_str(", on ");
        }
        out.push_str(&weekday_names.join(","));
    }

    let mut has_hour = false;
    let mut has_minute = false;
    let mut times: Vec<String> = Vec::new();
    for &hour in hours {
        for &minute in minutes {
            if let Some(h) = hour {
                has_hour = true;
                if minute.is_some() {
                    has_minute = true;
                }
                times.push(describe_hour_minute(h, minute));
            } else if let Some(m) = minute {
                has_minute = true;
                times.push(format!("{}{}", m, ordinal_suffix(m)));
            }
        }
    }

    let time_part = if times.is_empty() {
        "Every minute".to_string()
    } else if has_hour {
        let mut part = if has_date {
            format!("at {}", times.join(","))
        } else {
            format!("Daily: {}", times.join(","))
        };
        if !has_minute {
            part.push_str(" every minute");
        }
        part
    } else {
        format!("Hourly: At {} minute", times.join(","))
    };

    if prefix.is_empty() {
        return time_part;
    }
    format!("{}{}, {}", prefix, out, time_part)
        .trim()
        .to_string()
}

/// Human summary of one config line, or `None` when the line is too short
/// to be a schedule.
#[must_use]
pub fn describe_line(line: &str) -> Option<String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 6 {
        return None;
    }

    let minutes = parse_field(tokens[0]);
    let hours = parse_field(tokens[1]);
    let dates = parse_field(tokens[2]);
    // Month values are ignored, as in expansion
    let months = vec![None];
    let weekdays = parse_field(tokens[4]);
    let command = tokens[5..].join(" ");

    let action = if command.eq_ignore_ascii_case("on") {
        "Startup"
    } else {
        "Shutdown"
    };
    Some(format!(
        "{} | {}",
        action,
        describe_fields(&months, &weekdays, &dates, &hours, &minutes)
    ))
}
