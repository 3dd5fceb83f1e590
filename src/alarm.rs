//! Alarm field handling for the PCF8563 RTC.
//!
//! The chip offers a single alarm: four registers (minute, hour, day of
//! month, weekday) compared against the running clock. Each register is
//! independently present or disabled via its bit 7; a disabled field matches
//! anything. This module models that register set as [`AlarmFields`], with
//! validation and encoding/decoding.
//!
//! Alarm fields on the wire are always UTC. Conversion to and from local
//! wall-clock time lives in [`crate::tz`].

use crate::registers::{decimal_to_bcd, ALARM_FIELD_DISABLED};
use crate::{AlarmDay, AlarmHour, AlarmMinute, AlarmWeekday};

/// Error type for alarm field validation.
#[derive(Debug)]
pub enum AlarmError {
    /// Every field is wildcard; the alarm would never fire
    AllFieldsWildcard,
    /// Minute out of range (must be 0-59)
    InvalidMinute(u8),
    /// Hour out of range (must be 0-23)
    InvalidHour(u8),
    /// Day of month out of range (must be 1-31)
    InvalidDate(u8),
    /// Weekday out of range (must be 0-6, 0 = Sunday)
    InvalidWeekday(u8),
}

/// One alarm register set, each field independently present or wildcard.
///
/// `None` means the hardware comparison for that field is disabled; the
/// field never participates in equality checks or offset arithmetic.
/// Weekdays are numbered 0 = Sunday.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct AlarmFields {
    /// Minute (0-59) or wildcard
    pub minute: Option<u8>,
    /// Hour (0-23) or wildcard
    pub hour: Option<u8>,
    /// Day of month (1-31) or wildcard
    pub date: Option<u8>,
    /// Weekday (0-6, 0 = Sunday) or wildcard
    pub weekday: Option<u8>,
}

impl AlarmFields {
    /// True when every field is wildcard.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.minute.is_none()
            && self.hour.is_none()
            && self.date.is_none()
            && self.weekday.is_none()
    }

    /// Validates the field set: at least one field present, every present
    /// value within its natural range.
    ///
    /// # Errors
    ///
    /// Returns an error if all fields are wildcard or any value is out of
    /// range.
    pub fn validate(&self) -> Result<(), AlarmError> {
        if self.is_empty() {
            return Err(AlarmError::AllFieldsWildcard);
        }
        if let Some(minute) = self.minute {
            if minute > 59 {
                return Err(AlarmError::InvalidMinute(minute));
            }
        }
        if let Some(hour) = self.hour {
            if hour > 23 {
                return Err(AlarmError::InvalidHour(hour));
            }
        }
        if let Some(date) = self.date {
            if date == 0 || date > 31 {
                return Err(AlarmError::InvalidDate(date));
            }
        }
        if let Some(weekday) = self.weekday {
            if weekday > 6 {
                return Err(AlarmError::InvalidWeekday(weekday));
            }
        }
        Ok(())
    }

    /// Encodes the fields as the four alarm register bytes, in register
    /// order (minute, hour, day, weekday). Wildcard fields encode as the
    /// disable byte.
    ///
    /// # Errors
    ///
    /// Returns an error if the fields do not validate; nothing is encoded
    /// in that case.
    pub(crate) fn to_registers(&self) -> Result<[u8; 4], AlarmError> {
        self.validate()?;
        Ok([
            self.minute.map_or(ALARM_FIELD_DISABLED, decimal_to_bcd),
            self.hour.map_or(ALARM_FIELD_DISABLED, decimal_to_bcd),
            self.date.map_or(ALARM_FIELD_DISABLED, decimal_to_bcd),
            self.weekday.map_or(ALARM_FIELD_DISABLED, decimal_to_bcd),
        ])
    }

    /// Decodes the four alarm register bytes. A set disable bit yields a
    /// wildcard regardless of the remaining digits.
    pub(crate) fn from_registers(data: [u8; 4]) -> Self {
        let minute = AlarmMinute(data[0]);
        let hour = AlarmHour(data[1]);
        let day = AlarmDay(data[2]);
        let weekday = AlarmWeekday(data[3]);
        AlarmFields {
            minute: (!minute.disabled()).then(|| 10 * minute.ten_minutes() + minute.minutes()),
            hour: (!hour.disabled()).then(|| 10 * hour.ten_hours() + hour.hours()),
            date: (!day.disabled()).then(|| 10 * day.ten_days() + day.days()),
            weekday: (!weekday.disabled()).then(|| weekday.weekday()),
        }
    }

    /// Human-readable summary of when this alarm fires, or `"None"` when
    /// every field is wildcard.
    #[must_use]
    pub fn describe(&self) -> String {
        if self.is_empty() {
            return "None".to_string();
        }
        crate::schedule::describe_fields(
            &[None],
            &[self.weekday],
            &[self.date],
            &[self.hour],
            &[self.minute],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_all_wildcard() {
        let fields = AlarmFields::default();
        assert!(fields.is_empty());
        assert!(matches!(
            fields.validate(),
            Err(AlarmError::AllFieldsWildcard)
        ));
    }

    #[test]
    fn test_validate_ranges() {
        let fields = AlarmFields {
            minute: Some(60),
            ..Default::default()
        };
        assert!(matches!(fields.validate(), Err(AlarmError::InvalidMinute(60))));

        let fields = AlarmFields {
            hour: Some(24),
            ..Default::default()
        };
        assert!(matches!(fields.validate(), Err(AlarmError::InvalidHour(24))));

        let fields = AlarmFields {
            date: Some(0),
            ..Default::default()
        };
        assert!(matches!(fields.validate(), Err(AlarmError::InvalidDate(0))));

        let fields = AlarmFields {
            date: Some(32),
            ..Default::default()
        };
        assert!(matches!(fields.validate(), Err(AlarmError::InvalidDate(32))));

        let fields = AlarmFields {
            weekday: Some(7),
            ..Default::default()
        };
        assert!(matches!(
            fields.validate(),
            Err(AlarmError::InvalidWeekday(7))
        ));

        let fields = AlarmFields {
            minute: Some(59),
            hour: Some(23),
            date: Some(31),
            weekday: Some(6),
        };
        assert!(fields.validate().is_ok());
    }

    #[test]
    fn test_to_registers_encoding() {
        let fields = AlarmFields {
            minute: Some(30),
            hour: Some(5),
            date: None,
            weekday: None,
        };
        assert_eq!(fields.to_registers().unwrap(), [0x30, 0x05, 0x80, 0x80]);

        let fields = AlarmFields {
            minute: Some(45),
            hour: Some(23),
            date: Some(29),
            weekday: Some(3),
        };
        assert_eq!(fields.to_registers().unwrap(), [0x45, 0x23, 0x29, 0x03]);
    }

    #[test]
    fn test_to_registers_rejects_invalid() {
        let fields = AlarmFields {
            minute: Some(75),
            ..Default::default()
        };
        assert!(fields.to_registers().is_err());
    }

    #[test]
    fn test_from_registers_decoding() {
        let fields = AlarmFields::from_registers([0x30, 0x05, 0x80, 0x80]);
        assert_eq!(
            fields,
            AlarmFields {
                minute: Some(30),
                hour: Some(5),
                date: None,
                weekday: None,
            }
        );

        // Stale digits behind a set disable bit stay hidden
        let fields = AlarmFields::from_registers([0xB0, 0x95, 0xA9, 0x83]);
        assert!(fields.is_empty());
    }

    #[test]
    fn test_register_roundtrip() {
        let fields = AlarmFields {
            minute: Some(10),
            hour: None,
            date: Some(14),
            weekday: Some(0),
        };
        let regs = fields.to_registers().unwrap();
        assert_eq!(AlarmFields::from_registers(regs), fields);
    }

    #[test]
    fn test_describe_empty_alarm() {
        assert_eq!(AlarmFields::default().describe(), "None");
    }

    #[test]
    fn test_describe_daily_alarm() {
        let fields = AlarmFields {
            minute: Some(0),
            hour: Some(7),
            date: None,
            weekday: None,
        };
        let text = fields.describe();
        assert!(text.contains("Daily"), "unexpected description: {text}");
        assert!(text.contains("7am"), "unexpected description: {text}");
    }
}
