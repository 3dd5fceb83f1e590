//! Register definitions and bitfield structures for the PCF8563 RTC.
//!
//! This module contains the register address map, bitfield definitions, and
//! related types for interacting with the PCF8563 registers, along with the
//! BCD codec the chip uses for every numeric field.
//!
//! # Register Model
//!
//! - Register 0x01 is the control/status register carrying the alarm and
//!   timer event flags, their interrupt enable bits, and the TI_TP output
//!   control bit (which this crate always holds low).
//! - Registers 0x02..=0x08 are the free-running clock (seconds through
//!   years), BCD encoded, year offset +2000.
//! - Registers 0x09..=0x0C are the alarm fields (minute, hour, day,
//!   weekday); bit 7 set means the field is disabled (wildcard).
//! - Registers 0x0E..=0x0F control the periodic countdown timer.

use bitfield::bitfield;

/// Converts a BCD-encoded register byte to its decimal value (0-99).
///
/// The caller is responsible for handing in a valid BCD byte; out-of-range
/// nibbles produce an undefined decimal value (hardware constraint).
#[must_use]
pub const fn bcd_to_decimal(value: u8) -> u8 {
    (value & 0x0f) + ((value >> 4) & 0x0f) * 10
}

/// Converts a decimal value (0-99) to its BCD register encoding.
///
/// The caller enforces the 0-99 range; larger values are undefined.
#[must_use]
pub const fn decimal_to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Register addresses for the PCF8563 RTC.
#[allow(unused)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RegAddr {
    /// Control/status register 1 (STOP bit, test modes)
    Control1 = 0x00,
    /// Control/status register 2 (event flags and interrupt enables)
    Control2 = 0x01,
    /// Seconds register (0-59) with low-voltage flag
    Seconds = 0x02,
    /// Minutes register (0-59)
    Minutes = 0x03,
    /// Hours register (0-23)
    Hours = 0x04,
    /// Day-of-month register (1-31)
    Days = 0x05,
    /// Weekday register (0-6, 0 = Sunday in this crate's convention)
    Weekdays = 0x06,
    /// Month register (1-12) with century flag
    CenturyMonths = 0x07,
    /// Year register (0-99, offset +2000)
    Years = 0x08,
    /// Alarm minute register
    MinuteAlarm = 0x09,
    /// Alarm hour register
    HourAlarm = 0x0A,
    /// Alarm day-of-month register
    DayAlarm = 0x0B,
    /// Alarm weekday register
    WeekdayAlarm = 0x0C,
    /// CLKOUT control register
    ClkOutControl = 0x0D,
    /// Timer mode register (enable + source frequency)
    TimerControl = 0x0E,
    /// Timer countdown register (binary, 1-255)
    Timer = 0x0F,
}

/// Written to an alarm register to mark its field disabled (wildcard).
pub const ALARM_FIELD_DISABLED: u8 = 0x80;

/// The two hardware event sources sharing the control/status register.
///
/// Each kind knows its own flag and interrupt-enable bits in [`Control2`],
/// so callers never shift raw masks around.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// The alarm comparator (minute/hour/day/weekday registers)
    Alarm,
    /// The periodic countdown timer
    Timer,
}

impl EventKind {
    /// Reads this event's "fired" flag from a control/status value.
    #[must_use]
    pub fn flag(self, control: Control2) -> bool {
        match self {
            EventKind::Alarm => control.alarm_flag(),
            EventKind::Timer => control.timer_flag(),
        }
    }

    /// Sets or clears this event's "fired" flag in a control/status value.
    pub fn set_flag(self, control: &mut Control2, value: bool) {
        match self {
            EventKind::Alarm => control.set_alarm_flag(value),
            EventKind::Timer => control.set_timer_flag(value),
        }
    }

    /// Reads this event's interrupt-enable bit from a control/status value.
    #[must_use]
    pub fn enabled(self, control: Control2) -> bool {
        match self {
            EventKind::Alarm => control.alarm_interrupt_enable(),
            EventKind::Timer => control.timer_interrupt_enable(),
        }
    }

    /// Sets or clears this event's interrupt-enable bit in a control/status
    /// value.
    pub fn set_enabled(self, control: &mut Control2, value: bool) {
        match self {
            EventKind::Alarm => control.set_alarm_interrupt_enable(value),
            EventKind::Timer => control.set_timer_interrupt_enable(value),
        }
    }
}

/// Source frequency for the periodic countdown timer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TimerFrequency {
    /// 4096 Hz countdown (sub-millisecond ticks)
    Hz4096 = 0b00,
    /// 64 Hz countdown
    Hz64 = 0b01,
    /// 1 Hz countdown (the value counts seconds)
    Hertz = 0b10,
    /// 1/60 Hz countdown (the value counts minutes)
    PerMinute = 0b11,
}

impl From<u8> for TimerFrequency {
    /// Creates a `TimerFrequency` from the two frequency bits.
    ///
    /// # Panics
    /// Panics if the value is not 0b00-0b11.
    fn from(v: u8) -> Self {
        match v {
            0b00 => TimerFrequency::Hz4096,
            0b01 => TimerFrequency::Hz64,
            0b10 => TimerFrequency::Hertz,
            0b11 => TimerFrequency::PerMinute,
            _ => panic!("Invalid value for TimerFrequency: {}", v),
        }
    }
}

impl From<TimerFrequency> for u8 {
    /// Converts a `TimerFrequency` to its raw register bits.
    fn from(v: TimerFrequency) -> Self {
        v as u8
    }
}

// This macro generates the From<u8> and Into<u8> implementations for the
// register type
macro_rules! from_register_u8 {
    ($typ:ty) => {
        impl From<u8> for $typ {
            fn from(v: u8) -> Self {
                paste::paste!([< $typ >](v))
            }
        }
        impl From<$typ> for u8 {
            fn from(v: $typ) -> Self {
                v.0
            }
        }
    };
}

bitfield! {
    /// Control/status register 2 with event flags and interrupt enables.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Control2(u8);
    impl Debug;
    /// TI_TP output control; must stay zero or the timer flag is routed to
    /// the interrupt pin as a pulse train
    pub timer_interrupt_pulse, set_timer_interrupt_pulse: 4;
    /// Alarm fired flag
    pub alarm_flag, set_alarm_flag: 3;
    /// Timer fired flag
    pub timer_flag, set_timer_flag: 2;
    /// Alarm interrupt enable
    pub alarm_interrupt_enable, set_alarm_interrupt_enable: 1;
    /// Timer interrupt enable
    pub timer_interrupt_enable, set_timer_interrupt_enable: 0;
}
from_register_u8!(Control2);

bitfield! {
    /// Seconds register (0-59) with BCD encoding and low-voltage flag.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Seconds(u8);
    impl Debug;
    /// Low-voltage flag; set when clock integrity is no longer guaranteed
    pub voltage_low, set_voltage_low: 7;
    /// Tens place of seconds (0-5)
    pub ten_seconds, set_ten_seconds: 6, 4;
    /// Ones place of seconds (0-9)
    pub seconds, set_seconds: 3, 0;
}
from_register_u8!(Seconds);

bitfield! {
    /// Minutes register (0-59) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Minutes(u8);
    impl Debug;
    /// Tens place of minutes (0-5)
    pub ten_minutes, set_ten_minutes: 6, 4;
    /// Ones place of minutes (0-9)
    pub minutes, set_minutes: 3, 0;
}
from_register_u8!(Minutes);

bitfield! {
    /// Hours register (0-23) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Hours(u8);
    impl Debug;
    /// Tens place of hours (0-2)
    pub ten_hours, set_ten_hours: 5, 4;
    /// Ones place of hours (0-9)
    pub hours, set_hours: 3, 0;
}
from_register_u8!(Hours);

bitfield! {
    /// Day-of-month register (1-31) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Days(u8);
    impl Debug;
    /// Tens place of the day (0-3)
    pub ten_days, set_ten_days: 5, 4;
    /// Ones place of the day (0-9)
    pub days, set_days: 3, 0;
}
from_register_u8!(Days);

bitfield! {
    /// Weekday register (0-6, 0 = Sunday).
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Weekdays(u8);
    impl Debug;
    /// Weekday number (0-6)
    pub weekday, set_weekday: 2, 0;
}
from_register_u8!(Weekdays);

bitfield! {
    /// Month register (1-12) with century flag and BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct CenturyMonths(u8);
    impl Debug;
    /// Century flag; left untouched by this crate
    pub century, set_century: 7;
    /// Tens place of the month (0-1)
    pub ten_months, set_ten_months: 4, 4;
    /// Ones place of the month (0-9)
    pub months, set_months: 3, 0;
}
from_register_u8!(CenturyMonths);

bitfield! {
    /// Year register (0-99, offset +2000) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Years(u8);
    impl Debug;
    /// Tens place of the year (0-9)
    pub ten_years, set_ten_years: 7, 4;
    /// Ones place of the year (0-9)
    pub years, set_years: 3, 0;
}
from_register_u8!(Years);

// Alarm register types; bit 7 disables the field (wildcard)

bitfield! {
    /// Alarm minute register with disable bit and BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct AlarmMinute(u8);
    impl Debug;
    /// Field disabled (wildcard) when set
    pub disabled, set_disabled: 7;
    /// Tens place of minutes (0-5)
    pub ten_minutes, set_ten_minutes: 6, 4;
    /// Ones place of minutes (0-9)
    pub minutes, set_minutes: 3, 0;
}
from_register_u8!(AlarmMinute);

bitfield! {
    /// Alarm hour register with disable bit and BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct AlarmHour(u8);
    impl Debug;
    /// Field disabled (wildcard) when set
    pub disabled, set_disabled: 7;
    /// Tens place of hours (0-2)
    pub ten_hours, set_ten_hours: 5, 4;
    /// Ones place of hours (0-9)
    pub hours, set_hours: 3, 0;
}
from_register_u8!(AlarmHour);

bitfield! {
    /// Alarm day-of-month register with disable bit and BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct AlarmDay(u8);
    impl Debug;
    /// Field disabled (wildcard) when set
    pub disabled, set_disabled: 7;
    /// Tens place of the day (0-3)
    pub ten_days, set_ten_days: 5, 4;
    /// Ones place of the day (0-9)
    pub days, set_days: 3, 0;
}
from_register_u8!(AlarmDay);

bitfield! {
    /// Alarm weekday register with disable bit (0-6, 0 = Sunday).
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct AlarmWeekday(u8);
    impl Debug;
    /// Field disabled (wildcard) when set
    pub disabled, set_disabled: 7;
    /// Weekday number (0-6)
    pub weekday, set_weekday: 2, 0;
}
from_register_u8!(AlarmWeekday);

bitfield! {
    /// Timer mode register: countdown enable and source frequency.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct TimerControl(u8);
    impl Debug;
    /// Countdown running when set
    pub enabled, set_enabled: 7;
    /// Countdown source frequency
    pub from into TimerFrequency, frequency, set_frequency: 1, 0;
}
from_register_u8!(TimerControl);

bitfield! {
    /// Timer countdown register (binary, not BCD).
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct TimerValue(u8);
    impl Debug;
    /// Countdown start value (1-255)
    pub value, set_value: 7, 0;
}
from_register_u8!(TimerValue);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bcd_roundtrip() {
        for value in 0..=99u8 {
            assert_eq!(bcd_to_decimal(decimal_to_bcd(value)), value);
        }
    }

    #[test]
    fn test_bcd_known_values() {
        assert_eq!(decimal_to_bcd(0), 0x00);
        assert_eq!(decimal_to_bcd(9), 0x09);
        assert_eq!(decimal_to_bcd(10), 0x10);
        assert_eq!(decimal_to_bcd(59), 0x59);
        assert_eq!(decimal_to_bcd(99), 0x99);

        assert_eq!(bcd_to_decimal(0x00), 0);
        assert_eq!(bcd_to_decimal(0x45), 45);
        assert_eq!(bcd_to_decimal(0x31), 31);
        assert_eq!(bcd_to_decimal(0x99), 99);
    }

    #[test]
    fn test_control2_bit_positions() {
        // Alarm flag bit 3, timer flag bit 2, enables bits 1 and 0, TI_TP
        // bit 4 -- the chip's control/status register 2 layout.
        let control = Control2::from(0b0000_1000);
        assert!(control.alarm_flag());
        assert!(!control.timer_flag());

        let control = Control2::from(0b0000_0100);
        assert!(control.timer_flag());
        assert!(!control.alarm_flag());

        let control = Control2::from(0b0000_0010);
        assert!(control.alarm_interrupt_enable());
        assert!(!control.timer_interrupt_enable());

        let control = Control2::from(0b0000_0001);
        assert!(control.timer_interrupt_enable());

        let control = Control2::from(0b0001_0000);
        assert!(control.timer_interrupt_pulse());
    }

    #[test]
    fn test_event_kind_dispatch() {
        let mut control = Control2::default();

        EventKind::Alarm.set_flag(&mut control, true);
        assert_eq!(u8::from(control), 0b0000_1000);
        assert!(EventKind::Alarm.flag(control));
        assert!(!EventKind::Timer.flag(control));

        EventKind::Timer.set_enabled(&mut control, true);
        assert_eq!(u8::from(control), 0b0000_1001);
        assert!(EventKind::Timer.enabled(control));
        assert!(!EventKind::Alarm.enabled(control));

        EventKind::Alarm.set_flag(&mut control, false);
        assert_eq!(u8::from(control), 0b0000_0001);
    }

    #[test]
    fn test_seconds_register_conversions() {
        let seconds = Seconds::from(0x59);
        assert_eq!(seconds.ten_seconds(), 5);
        assert_eq!(seconds.seconds(), 9);
        assert!(!seconds.voltage_low());
        assert_eq!(u8::from(seconds), 0x59);

        // The low-voltage warning bit does not disturb the BCD digits
        let seconds = Seconds::from(0xD9);
        assert!(seconds.voltage_low());
        assert_eq!(seconds.ten_seconds(), 5);
        assert_eq!(seconds.seconds(), 9);
    }

    #[test]
    fn test_clock_register_conversions() {
        let minutes = Minutes::from(0x45);
        assert_eq!(minutes.ten_minutes(), 4);
        assert_eq!(minutes.minutes(), 5);

        let hours = Hours::from(0x23);
        assert_eq!(hours.ten_hours(), 2);
        assert_eq!(hours.hours(), 3);

        let days = Days::from(0x31);
        assert_eq!(days.ten_days(), 3);
        assert_eq!(days.days(), 1);

        let weekdays = Weekdays::from(0x06);
        assert_eq!(weekdays.weekday(), 6);

        let months = CenturyMonths::from(0x12);
        assert!(!months.century());
        assert_eq!(months.ten_months(), 1);
        assert_eq!(months.months(), 2);

        let months = CenturyMonths::from(0x81);
        assert!(months.century());
        assert_eq!(months.ten_months(), 0);
        assert_eq!(months.months(), 1);

        let years = Years::from(0x24);
        assert_eq!(years.ten_years(), 2);
        assert_eq!(years.years(), 4);
    }

    #[test]
    fn test_alarm_register_disable_bit() {
        let minute = AlarmMinute::from(0x80);
        assert!(minute.disabled());
        assert_eq!(minute.ten_minutes(), 0);
        assert_eq!(minute.minutes(), 0);

        let minute = AlarmMinute::from(0x30);
        assert!(!minute.disabled());
        assert_eq!(minute.ten_minutes(), 3);
        assert_eq!(minute.minutes(), 0);

        // A disabled register may still carry stale digits
        let hour = AlarmHour::from(0x95);
        assert!(hour.disabled());
        assert_eq!(hour.ten_hours(), 1);
        assert_eq!(hour.hours(), 5);

        let day = AlarmDay::from(0x29);
        assert!(!day.disabled());
        assert_eq!(day.ten_days(), 2);
        assert_eq!(day.days(), 9);

        let weekday = AlarmWeekday::from(0x83);
        assert!(weekday.disabled());
        assert_eq!(weekday.weekday(), 3);
    }

    #[test]
    fn test_timer_control_conversions() {
        let control = TimerControl::from(0x83);
        assert!(control.enabled());
        assert_eq!(control.frequency(), TimerFrequency::PerMinute);

        let control = TimerControl::from(0x82);
        assert!(control.enabled());
        assert_eq!(control.frequency(), TimerFrequency::Hertz);

        let control = TimerControl::from(0x00);
        assert!(!control.enabled());
        assert_eq!(control.frequency(), TimerFrequency::Hz4096);

        let mut control = TimerControl::default();
        control.set_enabled(true);
        control.set_frequency(TimerFrequency::PerMinute);
        assert_eq!(u8::from(control), 0x83);
    }

    #[test]
    fn test_register_roundtrip_conversions() {
        let test_values = [0x00, 0x55, 0xAA, 0xFF, 0x12, 0x34, 0x56, 0x78];

        for &value in &test_values {
            assert_eq!(u8::from(Control2::from(value)), value);
            assert_eq!(u8::from(Seconds::from(value)), value);
            assert_eq!(u8::from(Minutes::from(value)), value);
            assert_eq!(u8::from(Hours::from(value)), value);
            assert_eq!(u8::from(Days::from(value)), value);
            assert_eq!(u8::from(Weekdays::from(value)), value);
            assert_eq!(u8::from(CenturyMonths::from(value)), value);
            assert_eq!(u8::from(Years::from(value)), value);
            assert_eq!(u8::from(AlarmMinute::from(value)), value);
            assert_eq!(u8::from(AlarmHour::from(value)), value);
            assert_eq!(u8::from(AlarmDay::from(value)), value);
            assert_eq!(u8::from(AlarmWeekday::from(value)), value);
            assert_eq!(u8::from(TimerControl::from(value)), value);
            assert_eq!(u8::from(TimerValue::from(value)), value);
        }
    }

    #[test]
    fn test_timer_frequency_conversions() {
        assert_eq!(TimerFrequency::from(0b00), TimerFrequency::Hz4096);
        assert_eq!(TimerFrequency::from(0b01), TimerFrequency::Hz64);
        assert_eq!(TimerFrequency::from(0b10), TimerFrequency::Hertz);
        assert_eq!(TimerFrequency::from(0b11), TimerFrequency::PerMinute);
        assert_eq!(u8::from(TimerFrequency::PerMinute), 0b11);
    }

    #[test]
    #[should_panic(expected = "Invalid value for TimerFrequency: 4")]
    fn test_invalid_timer_frequency_conversion() {
        let _ = TimerFrequency::from(4);
    }
}
