//! Power scheduling engine for PCF8563-class real-time clocks.
//!
//! This crate lets a host that is attached to a battery-backed PCF8563 RTC
//! power itself on and off on a schedule, even while fully powered down: the
//! chip's single alarm register set wakes the board, and the host shuts
//! itself back down when an "off" schedule matches. Schedules are cron-like
//! text lines (`minute hour date month weekday command`), wildcard-capable,
//! written in local wall-clock time; the clock and the alarm registers stay
//! in UTC.
//!
//! # Features
//!
//! - Typed register access over any [`embedded_hal::i2c::I2c`] bus
//! - Event flag handling (alarm/timer) with the TI_TP quirk kept safe
//! - Clock read/write as chrono [`NaiveDateTime`] (UTC)
//! - Wildcard alarm fields with validation and local/UTC conversion
//! - Schedule parsing, matching, and human-readable summaries
//! - A bounded next-alarm planner collapsing many schedules onto the one
//!   hardware alarm
//! - Periodic countdown timer control
//!
//! # Example
//!
//! ```rust,ignore
//! use pcf8563_wake::{PCF8563, ScheduleConfig, DEFAULT_ADDRESS};
//!
//! let mut rtc = PCF8563::new(i2c, DEFAULT_ADDRESS);
//!
//! let config = ScheduleConfig::parse("0 7 * * * on\n0 23 * * * off\n");
//! let entries = config.entries();
//!
//! // Program the alarm for the next "on" schedule
//! let offset = pcf8563_wake::local_offset_seconds();
//! let now = rtc.datetime()? + chrono::TimeDelta::seconds(i64::from(offset));
//! let next = rtc.program_next_wake(&entries, now, offset)?;
//! println!("next wake: {next}");
//! ```
//!
//! The crate performs no I/O beyond the bus handle it is given, and all
//! register access is blocking and unqueued; callers sharing a chip across
//! threads must serialize access themselves (the chip has no transaction
//! isolation). The planner itself is pure and may run anywhere.

mod alarm;
mod datetime;
mod planner;
mod registers;
mod schedule;
pub mod tz;

pub use alarm::{AlarmError, AlarmFields};
pub use datetime::{weekday_from_sunday, PCF8563DateTimeError};
pub use planner::{advance, plan_next, NextWake, PLAN_HORIZON_YEARS};
pub use registers::*;
pub use schedule::{
    command_for, describe_line, parse_line, CommandKind, ScheduleConfig, ScheduleEntry,
};
pub use tz::{local_offset_seconds, to_hardware_fields, to_local_fields};

use chrono::NaiveDateTime;
use embedded_hal::i2c::I2c;
use log::debug;

use crate::datetime::PCF8563DateTime;

/// Factory-default I2C address of the PCF8563.
pub const DEFAULT_ADDRESS: u8 = 0x51;

/// Errors reported by the driver.
#[derive(Debug)]
pub enum PCF8563Error<I2CE> {
    /// Bus transaction failure; fatal for the call, never retried here
    I2c(I2CE),
    /// Clock register block did not convert to or from a date/time
    DateTime(PCF8563DateTimeError),
    /// Alarm fields failed validation; no register was written
    Alarm(AlarmError),
    /// Timer countdown out of range (must be 1-255); no register was written
    InvalidTimerValue(u8),
}

impl<I2CE> From<I2CE> for PCF8563Error<I2CE> {
    fn from(e: I2CE) -> Self {
        PCF8563Error::I2c(e)
    }
}

/// PCF8563 driver: an explicit bus capability plus device address.
///
/// Every operation issues blocking transactions on the owned bus and
/// propagates transport failures to the caller.
pub struct PCF8563<I2C: I2c> {
    i2c: I2C,
    address: u8,
}

macro_rules! set_and_get_register {
    ($(($name:ident, $regaddr:expr, $typ:ty)),+) => {
        $(
            paste::paste!{
                pub fn [< set_ $name >](&mut self, value: $typ) -> Result<(), PCF8563Error<I2C::Error>> {
                    self.i2c.write(
                        self.address,
                        &[$regaddr as u8, value.into()],
                        )?;
                    Ok(())
                }
            }

            pub fn $name(&mut self) -> Result<$typ, PCF8563Error<I2C::Error>> {
                let mut data = [0];
                self.i2c
                    .write_read(self.address, &[$regaddr as u8], &mut data)?;
                Ok(paste::paste!([<$typ>])(data[0]))
            }
        )+
    }
}

#[allow(unused)]
impl<I2C: I2c> PCF8563<I2C> {
    /// Creates a new driver instance for the device at `address`.
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Clears control register 1 so the oscillator runs and the chip's test
    /// modes are off. Worth doing once at startup on a factory-fresh part.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transaction fails.
    pub fn init(&mut self) -> Result<(), PCF8563Error<I2C::Error>> {
        self.i2c
            .write(self.address, &[RegAddr::Control1 as u8, 0x00])?;
        Ok(())
    }

    /// Reads whether `kind`'s event flag is raised.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transaction fails.
    pub fn event_fired(&mut self, kind: EventKind) -> Result<bool, PCF8563Error<I2C::Error>> {
        Ok(kind.flag(self.control2()?))
    }

    /// Clears `kind`'s event flag if it is raised and reports whether it had
    /// been set.
    ///
    /// The read-modify-write touches only this event's flag bit; the other
    /// event's flag survives. An already-clear flag causes no write at all.
    ///
    /// # Errors
    ///
    /// Returns an error if a bus transaction fails.
    pub fn clear_event(&mut self, kind: EventKind) -> Result<bool, PCF8563Error<I2C::Error>> {
        let mut control = self.control2()?;
        if !kind.flag(control) {
            return Ok(false);
        }
        kind.set_flag(&mut control, false);
        self.set_control2(control)?;
        Ok(true)
    }

    /// Enables or disables the interrupt for `kind`, clearing that event's
    /// own flag in the same write.
    ///
    /// The TI_TP output control bit is forced low on every write: left set,
    /// the chip turns the interrupt pin into a timer pulse output.
    ///
    /// # Errors
    ///
    /// Returns an error if a bus transaction fails.
    pub fn set_event_enabled(
        &mut self,
        kind: EventKind,
        enabled: bool,
    ) -> Result<(), PCF8563Error<I2C::Error>> {
        let mut control = self.control2()?;
        control.set_timer_interrupt_pulse(false);
        kind.set_flag(&mut control, false);
        kind.set_enabled(&mut control, enabled);
        debug!("control2: {:?}", control);
        self.set_control2(control)?;
        Ok(())
    }

    /// Reads the free-running clock as a UTC `NaiveDateTime`.
    ///
    /// The seven clock registers are read in one burst starting at the
    /// seconds register, the access pattern the datasheet recommends.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transaction fails or the registers do not
    /// decode to a valid date/time.
    pub fn datetime(&mut self) -> Result<NaiveDateTime, PCF8563Error<I2C::Error>> {
        let mut data = [0; 7];
        self.i2c
            .write_read(self.address, &[RegAddr::Seconds as u8], &mut data)?;
        PCF8563DateTime::from(data)
            .into_datetime()
            .map_err(PCF8563Error::DateTime)
    }

    /// Sets the free-running clock from a UTC `NaiveDateTime` (2000-2099).
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented in the clock
    /// registers or the bus transaction fails.
    pub fn set_datetime(
        &mut self,
        datetime: &NaiveDateTime,
    ) -> Result<(), PCF8563Error<I2C::Error>> {
        let raw = PCF8563DateTime::from_datetime(datetime).map_err(PCF8563Error::DateTime)?;
        let bytes: [u8; 7] = (&raw).into();
        let mut buffer = [0; 8];
        buffer[0] = RegAddr::Seconds as u8;
        buffer[1..].copy_from_slice(&bytes);
        self.i2c.write(self.address, &buffer)?;
        Ok(())
    }

    /// Reads the alarm register set. Fields are UTC; a set disable bit
    /// reads as a wildcard.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transaction fails.
    pub fn alarm(&mut self) -> Result<AlarmFields, PCF8563Error<I2C::Error>> {
        let mut data = [0; 4];
        self.i2c
            .write_read(self.address, &[RegAddr::MinuteAlarm as u8], &mut data)?;
        Ok(AlarmFields::from_registers(data))
    }

    /// Programs the alarm registers with UTC `fields` and enables the alarm
    /// interrupt, clearing a stale alarm flag first.
    ///
    /// Validation happens before any register is touched, so an invalid
    /// field set leaves prior hardware state intact. The chip has no
    /// multi-register commit: each field is its own write, and a transport
    /// failure mid-sequence can leave a mixed alarm programmed. Callers
    /// needing atomicity must disable, verify, and re-enable themselves.
    ///
    /// # Errors
    ///
    /// Returns an error if the fields do not validate or a bus transaction
    /// fails.
    pub fn set_alarm(&mut self, fields: &AlarmFields) -> Result<(), PCF8563Error<I2C::Error>> {
        let values = fields.to_registers().map_err(PCF8563Error::Alarm)?;
        debug!("alarm registers: {:02x?}", values);
        self.clear_event(EventKind::Alarm)?;
        self.set_event_enabled(EventKind::Alarm, true)?;
        for (addr, value) in [
            (RegAddr::MinuteAlarm, values[0]),
            (RegAddr::HourAlarm, values[1]),
            (RegAddr::DayAlarm, values[2]),
            (RegAddr::WeekdayAlarm, values[3]),
        ] {
            self.i2c.write(self.address, &[addr as u8, value])?;
        }
        Ok(())
    }

    /// Disables the alarm interrupt and marks all four alarm fields
    /// wildcard.
    ///
    /// # Errors
    ///
    /// Returns an error if a bus transaction fails.
    pub fn remove_alarm(&mut self) -> Result<(), PCF8563Error<I2C::Error>> {
        self.set_event_enabled(EventKind::Alarm, false)?;
        for addr in [
            RegAddr::MinuteAlarm,
            RegAddr::HourAlarm,
            RegAddr::DayAlarm,
            RegAddr::WeekdayAlarm,
        ] {
            self.i2c
                .write(self.address, &[addr as u8, ALARM_FIELD_DISABLED])?;
        }
        Ok(())
    }

    /// Starts the periodic countdown timer: `value` ticks of `frequency`
    /// per firing, optionally raising the interrupt line.
    ///
    /// A stale timer flag is cleared first. The countdown register is
    /// binary, so the full 1-255 range is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if `value` is zero (nothing is written) or a bus
    /// transaction fails.
    pub fn set_timer(
        &mut self,
        value: u8,
        frequency: TimerFrequency,
        enable_interrupt: bool,
    ) -> Result<(), PCF8563Error<I2C::Error>> {
        if value == 0 {
            return Err(PCF8563Error::InvalidTimerValue(value));
        }
        self.clear_event(EventKind::Timer)?;
        self.set_event_enabled(EventKind::Timer, enable_interrupt)?;

        let mut control = TimerControl::default();
        control.set_enabled(true);
        control.set_frequency(frequency);
        self.set_timer_control(control)?;
        self.set_timer_value(TimerValue(value))?;
        Ok(())
    }

    /// Stops the periodic timer and disables its interrupt, parking the
    /// countdown on the slowest source with a zero value.
    ///
    /// # Errors
    ///
    /// Returns an error if a bus transaction fails.
    pub fn remove_timer(&mut self) -> Result<(), PCF8563Error<I2C::Error>> {
        self.set_event_enabled(EventKind::Timer, false)?;

        let mut control = TimerControl::default();
        control.set_frequency(TimerFrequency::PerMinute);
        self.set_timer_control(control)?;
        self.set_timer_value(TimerValue(0))?;
        Ok(())
    }

    /// Reads the periodic timer setting: `Some((value, frequency))` while
    /// the countdown runs, `None` when it is stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if a bus transaction fails.
    pub fn timer(&mut self) -> Result<Option<(u8, TimerFrequency)>, PCF8563Error<I2C::Error>> {
        let control = self.timer_control()?;
        if !control.enabled() {
            return Ok(None);
        }
        let value = self.timer_value()?;
        Ok(Some((value.value(), control.frequency())))
    }

    /// Plans the next "on" wake across `entries` and programs the hardware
    /// alarm for it.
    ///
    /// `not_before` and the returned fire time are local wall-clock;
    /// `offset_seconds` is the local UTC offset (normally
    /// [`tz::local_offset_seconds`]), applied once to the winning alarm
    /// fields with the winning moment's month as the clamp reference. When
    /// nothing is schedulable within [`PLAN_HORIZON_YEARS`], the alarm is
    /// disabled and `not_before` comes back unchanged, which makes the
    /// caller retry on its next tick.
    ///
    /// # Errors
    ///
    /// Returns an error if a bus transaction fails or the winning fields do
    /// not validate (nothing is written in that case).
    pub fn program_next_wake(
        &mut self,
        entries: &[ScheduleEntry],
        not_before: NaiveDateTime,
        offset_seconds: i32,
    ) -> Result<NaiveDateTime, PCF8563Error<I2C::Error>> {
        match plan_next(entries, not_before) {
            Some(plan) => {
                let utc = tz::to_hardware_fields(&plan.alarm, offset_seconds, plan.fire_at.date());
                debug!("next wake {} -> alarm {:?}", plan.fire_at, utc);
                self.set_alarm(&utc)?;
                Ok(plan.fire_at)
            }
            None => {
                debug!("no schedulable wake; disabling alarm");
                self.remove_alarm()?;
                Ok(not_before)
            }
        }
    }

    set_and_get_register!(
        (control2, RegAddr::Control2, Control2),
        (second, RegAddr::Seconds, Seconds),
        (minute, RegAddr::Minutes, Minutes),
        (hour, RegAddr::Hours, Hours),
        (day, RegAddr::Days, Days),
        (weekday, RegAddr::Weekdays, Weekdays),
        (month, RegAddr::CenturyMonths, CenturyMonths),
        (year, RegAddr::Years, Years),
        (alarm_minute, RegAddr::MinuteAlarm, AlarmMinute),
        (alarm_hour, RegAddr::HourAlarm, AlarmHour),
        (alarm_day, RegAddr::DayAlarm, AlarmDay),
        (alarm_weekday, RegAddr::WeekdayAlarm, AlarmWeekday),
        (timer_control, RegAddr::TimerControl, TimerControl),
        (timer_value, RegAddr::Timer, TimerValue)
    );
}
