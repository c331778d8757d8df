//! DS3231 real-time clock: register layout, decoding and the bus driver.

use core::fmt;
use core::ops::RangeInclusive;

use embedded_hal::blocking::i2c::{Write, WriteRead};

use crate::bcd;
use crate::error::Error;

/// Fixed 7-bit bus address of the DS3231.
pub const ADDRESS: u8 = 0x68;

/// Seconds in one day; seconds-since-midnight is always below this.
pub const SECONDS_PER_DAY: u32 = 86_400;

const CLOCK_HALT: u8 = 0x80;
const HOUR_12H_MODE: u8 = 0x40;
const HOUR_PM: u8 = 0x20;

/// The seven timekeeping registers, by offset from register 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    Seconds = 0,
    Minutes = 1,
    Hours = 2,
    Weekday = 3,
    Date = 4,
    Month = 5,
    Year = 6,
}

/// Raw contents of registers 0..=6, exactly as read from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterSnapshot([u8; 7]);

impl RegisterSnapshot {
    pub const fn new(raw: [u8; 7]) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> &[u8; 7] {
        &self.0
    }

    pub fn get(&self, register: Register) -> u8 {
        self.0[register as usize]
    }

    /// Bit 7 of the seconds register. Set means the oscillator is stopped.
    pub fn clock_halted(&self) -> bool {
        self.get(Register::Seconds) & CLOCK_HALT != 0
    }
}

/// Calendar date and time of day. `hour` is always 0..=23.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    /// 1..=7, meaning is up to whoever set the clock.
    pub weekday: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DateTime {
    pub fn seconds_since_midnight(&self) -> u32 {
        seconds_since_midnight(self)
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

pub fn seconds_since_midnight(time: &DateTime) -> u32 {
    time.hour as u32 * 3600 + time.minute as u32 * 60 + time.second as u32
}

/// Masks and decodes one register, rejecting values outside `range`.
fn field<B>(
    snapshot: &RegisterSnapshot,
    register: Register,
    mask: u8,
    range: RangeInclusive<u8>,
) -> Result<u8, Error<B>> {
    let raw = snapshot.get(register);
    match bcd::decode(raw & mask) {
        Ok(value) if range.contains(&value) => Ok(value),
        _ => Err(Error::DataIntegrity { register, raw }),
    }
}

/// Decodes the hours register, folding 12-hour mode into 0..=23.
fn hour<B>(snapshot: &RegisterSnapshot) -> Result<u8, Error<B>> {
    let raw = snapshot.get(Register::Hours);
    if raw & HOUR_12H_MODE == 0 {
        return field(snapshot, Register::Hours, 0x3F, 0..=23);
    }

    let hour12 = field(snapshot, Register::Hours, 0x1F, 1..=12)?;
    if raw & HOUR_PM != 0 {
        Ok(hour12 % 12 + 12)
    } else {
        Ok(hour12 % 12)
    }
}

/// Decodes every field, failing on any register the device could not hold
/// while running normally.
pub fn decode_datetime<B>(snapshot: &RegisterSnapshot) -> Result<DateTime, Error<B>> {
    Ok(DateTime {
        year: 2000 + field(snapshot, Register::Year, 0xFF, 0..=99)? as u16,
        month: field(snapshot, Register::Month, 0x1F, 1..=12)?,
        day: field(snapshot, Register::Date, 0x3F, 1..=31)?,
        weekday: field(snapshot, Register::Weekday, 0x07, 1..=7)?,
        hour: hour(snapshot)?,
        minute: field(snapshot, Register::Minutes, 0x7F, 0..=59)?,
        second: field(snapshot, Register::Seconds, 0x7F, 0..=59)?,
    })
}

/// Encodes `time` in 24-hour mode with the clock running.
pub fn encode_datetime<B>(time: &DateTime) -> Result<RegisterSnapshot, Error<B>> {
    let valid = (2000..=2099).contains(&time.year)
        && (1..=12).contains(&time.month)
        && (1..=31).contains(&time.day)
        && (1..=7).contains(&time.weekday)
        && time.hour < 24
        && time.minute < 60
        && time.second < 60;
    if !valid {
        return Err(Error::InvalidDateTime);
    }

    let encode = |value: u8| bcd::encode(value).map_err(|_| Error::InvalidDateTime);
    Ok(RegisterSnapshot([
        encode(time.second)?,
        encode(time.minute)?,
        encode(time.hour)?,
        encode(time.weekday)?,
        encode(time.day)?,
        encode(time.month)?,
        encode((time.year - 2000) as u8)?,
    ]))
}

/// DS3231 on a blocking I2C bus.
pub struct Ds3231<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C, E> Ds3231<I2C>
where
    I2C: WriteRead<Error = E> + Write<Error = E>,
{
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, ADDRESS)
    }

    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Reads registers 0..=6 in one transfer. Never cached.
    pub fn read_snapshot(&mut self) -> Result<RegisterSnapshot, Error<E>> {
        let mut raw = [0u8; 7];
        self.i2c
            .write_read(self.address, &[Register::Seconds as u8], &mut raw)
            .map_err(Error::DeviceIo)?;
        Ok(RegisterSnapshot(raw))
    }

    /// Writes registers 0..=6 in one transfer.
    pub fn write_snapshot(&mut self, snapshot: &RegisterSnapshot) -> Result<(), Error<E>> {
        let mut frame = [0u8; 8];
        frame[0] = Register::Seconds as u8;
        frame[1..].copy_from_slice(&snapshot.0);
        self.i2c.write(self.address, &frame).map_err(Error::DeviceIo)
    }

    pub fn now(&mut self) -> Result<DateTime, Error<E>> {
        let snapshot = self.read_snapshot()?;
        if snapshot.clock_halted() {
            warn!("RTC oscillator halted, time is not advancing");
        }
        decode_datetime(&snapshot)
    }

    pub fn seconds_since_midnight(&mut self) -> Result<u32, Error<E>> {
        Ok(self.now()?.seconds_since_midnight())
    }

    pub fn set_datetime(&mut self, time: &DateTime) -> Result<(), Error<E>> {
        let snapshot = encode_datetime(time)?;
        self.write_snapshot(&snapshot)?;
        debug!("RTC set to {}", snapshot);
        Ok(())
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}
