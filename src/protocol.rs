//! Register-level protocol definitions for Heatmiser Modbus thermostats.
//!
//! This module is pure and performs no I/O. It maps typed thermostat values
//! (temperatures, schedule modes, date/time, keylock PINs, ...) to and from
//! the raw 16-bit holding-register words the device speaks, including the
//! device's bespoke encodings:
//!
//! - temperatures as value x 10 fixed point, with words `>= 0xFFFE` reserved
//!   to mean "sensor reading unavailable",
//! - packed date/time words across four consecutive registers,
//! - small enumerated codes for operation mode, programme mode and sensor
//!   selection,
//! - the `(hours << 8) | minutes` packing of the hold-duration register.

use std::{fmt, str::FromStr};

/// Errors for invalid protocol values supplied by the caller.
///
/// These are raised before any Modbus transaction is issued; a failed
/// validation never reaches the wire.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Unit ID outside the valid bus address range (1-32).
    #[error("Unit ID {0} is out of range ({min}-{max})", min = UnitId::MIN, max = UnitId::MAX)]
    UnitIdOutOfRange(u8),

    /// Temperature not representable in the x10 fixed-point register format.
    #[error("temperature {0} is out of range ({min:.1}-{max:.1})", min = Temperature::MIN, max = Temperature::MAX)]
    TemperatureOutOfRange(f32),

    /// Temperature units string not recognised.
    #[error("`{0}` is not valid, units should be [C]elsius or [F]ahrenheit")]
    InvalidTemperatureUnits(String),

    /// Programme mode name or code not one of the four known modes.
    #[error("invalid programme mode: {0}")]
    InvalidProgrammeMode(String),

    /// Programme period count other than 4 or 6.
    #[error("invalid number of programme periods: {0} (must be 4 or 6)")]
    InvalidProgrammePeriods(u8),

    /// Sensor selection code outside 0-4.
    #[error("invalid sensor selection mode: {0} (must be 0-4)")]
    SensorSelectionOutOfRange(u8),

    /// Hold duration at or beyond the device limit of 1536 minutes.
    #[error("hold duration of {0} minutes is too long (maximum {max})", max = HoldDuration::MAX_MINUTES - 1)]
    HoldDurationTooLong(u16),

    /// The device replied with a different number of registers than the
    /// requested block length.
    #[error("device returned {actual} registers, expected {expected}")]
    UnexpectedRegisterCount { expected: u16, actual: usize },
}

type Result<T> = std::result::Result<T, Error>;

/// The Modbus bus address ("Communications ID") of one thermostat.
///
/// Heatmiser thermostats accept addresses 1 to 32 on a shared RS485 bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(u8);

impl UnitId {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 32;
}

impl TryFrom<u8> for UnitId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::UnitIdOutOfRange(value))
        }
    }
}

impl Default for UnitId {
    fn default() -> Self {
        Self(1)
    }
}

impl std::ops::Deref for UnitId {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A temperature with one decimal place of precision, as used by every
/// temperature-valued register (°C or °F depending on the device's configured
/// units).
///
/// On the wire a temperature is the value multiplied by ten, stored in an
/// unsigned 16-bit word. Words at or above [`SensorReading::UNAVAILABLE`] are
/// reserved, so the representable range is 0.0 to 6553.3; values outside it
/// (including negatives, which the register format cannot carry) are rejected
/// at construction.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Temperature(f32);

impl Temperature {
    pub const MIN: f32 = 0.0;
    pub const MAX: f32 = 6553.3;

    /// Decodes a register word into a temperature.
    pub fn decode(word: u16) -> Self {
        Self(word as f32 / 10.0)
    }

    /// Encodes this temperature as a x10 fixed-point register word.
    pub fn encode_for_write_register(&self) -> u16 {
        // Range is enforced by `try_from`, the cast cannot wrap.
        (self.0 * 10.0).round() as u16
    }

    /// The temperature in degrees as a float.
    pub fn degrees(&self) -> f32 {
        self.0
    }
}

impl TryFrom<f32> for Temperature {
    type Error = Error;

    fn try_from(value: f32) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::TemperatureOutOfRange(value))
        }
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// One temperature measurement as reported by the device.
///
/// The device reserves register words `0xFFFE` and `0xFFFF` to mean that the
/// underlying sensor cannot currently produce a measurement (sensor not
/// fitted, open circuit, ...). That state decodes to
/// [`SensorReading::Unavailable`], never to a zero temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorReading {
    Available(Temperature),
    Unavailable,
}

impl SensorReading {
    /// First register word of the reserved "no measurement" range.
    pub const UNAVAILABLE: u16 = 0xFFFE;

    pub fn decode(word: u16) -> Self {
        if word >= Self::UNAVAILABLE {
            Self::Unavailable
        } else {
            Self::Available(Temperature::decode(word))
        }
    }

    /// The measured temperature, or `None` when the sensor is unavailable.
    pub fn temperature(&self) -> Option<Temperature> {
        match self {
            Self::Available(t) => Some(*t),
            Self::Unavailable => None,
        }
    }
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Available(t) => write!(f, "{t}"),
            Self::Unavailable => write!(f, "n/a"),
        }
    }
}

/// The thermostat's current operating mode, the last word of the status
/// block.
///
/// Decoding never fails: codes outside 0-5 map to [`OperationMode::Unknown`]
/// so that a newer firmware revision cannot break a status read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    ChangeOver,
    Schedule,
    Hold,
    Advanced,
    Away,
    FrostMode,
    /// A mode code this library does not know about.
    Unknown,
}

impl OperationMode {
    pub fn decode(word: u16) -> Self {
        match word {
            0 => Self::ChangeOver,
            1 => Self::Schedule,
            2 => Self::Hold,
            3 => Self::Advanced,
            4 => Self::Away,
            5 => Self::FrostMode,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::ChangeOver => "change_over",
            Self::Schedule => "schedule",
            Self::Hold => "hold",
            Self::Advanced => "advanced",
            Self::Away => "away",
            Self::FrostMode => "frost_mode",
            Self::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// The thermostat's weekly scheduling strategy, register 28.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgrammeMode {
    /// One schedule for weekdays, another for weekends (factory default).
    FiveDayTwoDay,
    /// A different schedule for each day of the week.
    SevenDay,
    /// The same schedule every day.
    TwentyFourHour,
    /// Non-programmable, temperature control only.
    None,
}

impl ProgrammeMode {
    pub const ADDRESS: u16 = 28;

    pub fn encode_for_write_register(&self) -> u16 {
        match self {
            Self::FiveDayTwoDay => 0,
            Self::SevenDay => 1,
            Self::TwentyFourHour => 2,
            Self::None => 3,
        }
    }
}

impl TryFrom<u8> for ProgrammeMode {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::FiveDayTwoDay),
            1 => Ok(Self::SevenDay),
            2 => Ok(Self::TwentyFourHour),
            3 => Ok(Self::None),
            _ => Err(Error::InvalidProgrammeMode(code.to_string())),
        }
    }
}

impl FromStr for ProgrammeMode {
    type Err = Error;

    /// Accepts either the mode name (`5day_2day`, `7day`, `24hour`, `none`)
    /// or its numeric code (`0`-`3`).
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "5day_2day" => Ok(Self::FiveDayTwoDay),
            "7day" => Ok(Self::SevenDay),
            "24hour" => Ok(Self::TwentyFourHour),
            "none" => Ok(Self::None),
            _ => match s.parse::<u8>() {
                Ok(code) => Self::try_from(code),
                Err(_) => Err(Error::InvalidProgrammeMode(s.to_string())),
            },
        }
    }
}

impl fmt::Display for ProgrammeMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::FiveDayTwoDay => "5day_2day",
            Self::SevenDay => "7day",
            Self::TwentyFourHour => "24hour",
            Self::None => "none",
        };
        write!(f, "{name}")
    }
}

/// The number of switching periods per day, register 27.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgrammePeriods {
    Four,
    Six,
}

impl ProgrammePeriods {
    pub const ADDRESS: u16 = 27;

    pub fn encode_for_write_register(&self) -> u16 {
        match self {
            Self::Four => 0,
            Self::Six => 1,
        }
    }
}

impl TryFrom<u8> for ProgrammePeriods {
    type Error = Error;

    /// Accepts the period count itself: exactly `4` or `6`.
    fn try_from(periods: u8) -> Result<Self> {
        match periods {
            4 => Ok(Self::Four),
            6 => Ok(Self::Six),
            _ => Err(Error::InvalidProgrammePeriods(periods)),
        }
    }
}

impl fmt::Display for ProgrammePeriods {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Four => write!(f, "4"),
            Self::Six => write!(f, "6"),
        }
    }
}

/// The temperature units the thermostat displays and reports, register 20.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnits {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnits {
    pub const ADDRESS: u16 = 20;
    pub const QUANTITY: u16 = 1;

    pub fn decode_from_holding_registers(words: &[u16]) -> Result<Self> {
        check_register_count(Self::QUANTITY, words)?;
        // The device reports 0 for Celsius, anything else is Fahrenheit.
        if words[0] == 0 {
            Ok(Self::Celsius)
        } else {
            Ok(Self::Fahrenheit)
        }
    }

    pub fn encode_for_write_register(&self) -> u16 {
        match self {
            Self::Celsius => 0,
            Self::Fahrenheit => 1,
        }
    }

    /// The single-letter unit symbol, `C` or `F`.
    pub fn symbol(&self) -> char {
        match self {
            Self::Celsius => 'C',
            Self::Fahrenheit => 'F',
        }
    }
}

impl FromStr for TemperatureUnits {
    type Err = Error;

    /// Accepts any string starting with `C`/`c` (Celsius) or `F`/`f`
    /// (Fahrenheit), so `"C"`, `"celsius"` and `"Fahrenheit"` all parse.
    fn from_str(s: &str) -> Result<Self> {
        match s.chars().next() {
            Some('C' | 'c') => Ok(Self::Celsius),
            Some('F' | 'f') => Ok(Self::Fahrenheit),
            _ => Err(Error::InvalidTemperatureUnits(s.to_string())),
        }
    }
}

impl fmt::Display for TemperatureUnits {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "°{}", self.symbol())
    }
}

/// Which sensors the thermostat uses for control, register 24.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SensorSelection {
    /// Built in sensor with optional remote air sensor (factory default).
    BuiltIn = 0,
    /// Remote air sensor only.
    RemoteAir = 1,
    /// Floor sensor only.
    Floor = 2,
    /// Built in + floor sensor + optional remote air sensor.
    BuiltInAndFloor = 3,
    /// Floor sensor and remote air sensor only.
    FloorAndRemoteAir = 4,
}

impl SensorSelection {
    pub const ADDRESS: u16 = 24;

    pub fn encode_for_write_register(&self) -> u16 {
        *self as u16
    }
}

impl TryFrom<u8> for SensorSelection {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::BuiltIn),
            1 => Ok(Self::RemoteAir),
            2 => Ok(Self::Floor),
            3 => Ok(Self::BuiltInAndFloor),
            4 => Ok(Self::FloorAndRemoteAir),
            _ => Err(Error::SensorSelectionOutOfRange(code)),
        }
    }
}

impl fmt::Display for SensorSelection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::BuiltIn => "built in sensor",
            Self::RemoteAir => "remote air sensor only",
            Self::Floor => "floor sensor only",
            Self::BuiltInAndFloor => "built in + floor sensor",
            Self::FloorAndRemoteAir => "floor and remote air sensors",
        };
        write!(f, "{name}")
    }
}

/// A temporary target-temperature override period, register 37.
///
/// Packed on the wire as `(hours << 8) | minutes`. Durations at or beyond
/// the device limit of 1536 minutes are rejected rather than silently
/// truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldDuration {
    minutes: u16,
}

impl HoldDuration {
    pub const ADDRESS: u16 = 37;
    /// The first duration the device refuses to hold for.
    pub const MAX_MINUTES: u16 = 1536;

    pub fn encode_for_write_register(&self) -> u16 {
        let hours = self.minutes / 60;
        let mins = self.minutes % 60;
        (hours << 8) | mins
    }

    /// Total duration in minutes.
    pub fn as_minutes(&self) -> u16 {
        self.minutes
    }
}

impl TryFrom<u16> for HoldDuration {
    type Error = Error;

    fn try_from(minutes: u16) -> Result<Self> {
        if minutes < Self::MAX_MINUTES {
            Ok(Self { minutes })
        } else {
            Err(Error::HoldDurationTooLong(minutes))
        }
    }
}

impl fmt::Display for HoldDuration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{:02}", self.minutes / 60, self.minutes % 60)
    }
}

/// A local calendar timestamp for the thermostat's clock, registers 46-49.
///
/// Encoded as four consecutive words:
/// `[year, (month << 8) | day, (hour << 8) | minute, second]` with a 1-based
/// month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DeviceTime {
    pub const ADDRESS: u16 = 46;
    pub const QUANTITY: u16 = 4;

    /// The current local time of the host system.
    pub fn now() -> Self {
        Self::from(chrono::Local::now())
    }

    pub fn encode_for_write_registers(&self) -> [u16; 4] {
        [
            self.year,
            ((self.month as u16) << 8) | self.day as u16,
            ((self.hour as u16) << 8) | self.minute as u16,
            self.second as u16,
        ]
    }
}

impl From<chrono::DateTime<chrono::Local>> for DeviceTime {
    fn from(time: chrono::DateTime<chrono::Local>) -> Self {
        use chrono::{Datelike, Timelike};
        Self {
            year: time.year() as u16,
            month: time.month() as u8,
            day: time.day() as u8,
            hour: time.hour() as u8,
            minute: time.minute() as u8,
            second: time.second() as u8,
        }
    }
}

impl fmt::Display for DeviceTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// The on/off command, register 31.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Power {
    Off,
    On,
}

impl Power {
    pub const ADDRESS: u16 = 31;

    pub fn encode_for_write_register(&self) -> u16 {
        match self {
            Self::Off => 0,
            Self::On => 1,
        }
    }
}

impl From<bool> for Power {
    fn from(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

/// Automatic daylight-saving adjustment of the device clock, register 29.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoDst {
    Disabled,
    Enabled,
}

impl AutoDst {
    pub const ADDRESS: u16 = 29;

    pub fn encode_for_write_register(&self) -> u16 {
        match self {
            Self::Disabled => 0,
            Self::Enabled => 1,
        }
    }
}

impl From<bool> for AutoDst {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }
}

/// The keypad lock PIN, register 41.
///
/// Writing zero disables the lock, so [`Keylock::DISABLED`] and an absent PIN
/// encode identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keylock(u16);

impl Keylock {
    pub const ADDRESS: u16 = 41;
    pub const DISABLED: Keylock = Keylock(0);

    pub fn encode_for_write_register(&self) -> u16 {
        self.0
    }

    pub fn is_disabled(&self) -> bool {
        self.0 == 0
    }
}

impl From<u16> for Keylock {
    fn from(pin: u16) -> Self {
        Self(pin)
    }
}

impl From<Option<u16>> for Keylock {
    fn from(pin: Option<u16>) -> Self {
        Self(pin.unwrap_or(0))
    }
}

impl fmt::Display for Keylock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_disabled() {
            write!(f, "disabled")
        } else {
            write!(f, "{:04}", self.0)
        }
    }
}

/// Minutes to delay output switching by, register 22.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputDelay(u16);

impl OutputDelay {
    pub const ADDRESS: u16 = 22;

    pub fn encode_for_write_register(&self) -> u16 {
        self.0
    }
}

impl From<u16> for OutputDelay {
    fn from(minutes: u16) -> Self {
        Self(minutes)
    }
}

impl fmt::Display for OutputDelay {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The device firmware version word, register 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion(u16);

impl FirmwareVersion {
    pub const ADDRESS: u16 = 0;
    pub const QUANTITY: u16 = 1;

    pub fn decode_from_holding_registers(words: &[u16]) -> Result<Self> {
        check_register_count(Self::QUANTITY, words)?;
        Ok(Self(words[0]))
    }
}

impl std::ops::Deref for FirmwareVersion {
    type Target = u16;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Factory reset command, register 45.
///
/// Heatmiser thermostats disable their Modbus interface after a factory
/// reset; it has to be re-enabled from the front panel.
#[derive(Debug)]
pub struct FactoryReset;

impl FactoryReset {
    pub const ADDRESS: u16 = 45;

    pub fn encode_for_write_register() -> u16 {
        1
    }
}

/// Write-register addresses for the temperature setpoints that need no
/// dedicated wrapper type; all take a x10 fixed-point [`Temperature`] word.
pub const TARGET_TEMPERATURE_ADDRESS: u16 = 33;
pub const FROST_PROTECT_TEMPERATURE_ADDRESS: u16 = 36;
pub const FLOOR_LIMIT_TEMPERATURE_ADDRESS: u16 = 25;
pub const SWITCHING_DIFFERENTIAL_ADDRESS: u16 = 21;
pub const UP_DOWN_LIMIT_ADDRESS: u16 = 23;

/// The register layout of the status block for a device firmware revision.
///
/// Two layouts have been observed in the field: older firmware starts the
/// block at register 1 (relay status first), newer firmware exposes its
/// version as a leading word at register 0 and lengthens the block by one.
/// No register identifies which layout a device uses, so the caller has to
/// select it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusLayout {
    /// Block starts at register 0 with the firmware version word (9 words).
    WithFirmware,
    /// Block starts at register 1, no firmware word (8 words).
    #[default]
    WithoutFirmware,
}

impl StatusLayout {
    /// First register of the status block.
    pub const fn address(&self) -> u16 {
        match self {
            Self::WithFirmware => 0,
            Self::WithoutFirmware => 1,
        }
    }

    /// Number of registers in the status block.
    pub const fn quantity(&self) -> u16 {
        match self {
            Self::WithFirmware => 9,
            Self::WithoutFirmware => 8,
        }
    }
}

/// A decoded status block: one contiguous holding-register read covering the
/// thermostat's live state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Status {
    /// Firmware version, only present with [`StatusLayout::WithFirmware`].
    pub firmware_version: Option<FirmwareVersion>,
    /// Whether the heating relay is currently closed.
    pub relay_on: bool,
    pub room_temperature: SensorReading,
    pub floor_temperature: SensorReading,
    pub target_temperature: SensorReading,
    /// Whether the thermostat itself is switched on.
    pub device_on: bool,
    pub operation_mode: OperationMode,
}

impl Status {
    /// Decodes a status block read with `layout`.
    pub fn decode_from_holding_registers(layout: StatusLayout, words: &[u16]) -> Result<Self> {
        check_register_count(layout.quantity(), words)?;
        let (firmware_version, words) = match layout {
            StatusLayout::WithFirmware => (Some(FirmwareVersion(words[0])), &words[1..]),
            StatusLayout::WithoutFirmware => (None, words),
        };
        Ok(Self {
            firmware_version,
            relay_on: words[0] != 0,
            room_temperature: SensorReading::decode(words[1]),
            floor_temperature: SensorReading::decode(words[2]),
            target_temperature: SensorReading::decode(words[5]),
            device_on: words[6] != 0,
            operation_mode: OperationMode::decode(words[7]),
        })
    }
}

fn check_register_count(expected: u16, words: &[u16]) -> Result<()> {
    if words.len() == expected as usize {
        Ok(())
    } else {
        Err(Error::UnexpectedRegisterCount {
            expected,
            actual: words.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn temperature_round_trip() {
        // Every one-decimal value in 0.0..=50.0 survives the x10 fixed-point
        // encoding.
        for tenths in 0..=500u16 {
            let value = tenths as f32 / 10.0;
            let temperature = Temperature::try_from(value).unwrap();
            let word = temperature.encode_for_write_register();
            assert_eq!(word, tenths);
            assert_eq!(Temperature::decode(word), temperature);
        }
    }

    #[test]
    fn temperature_range() {
        assert_matches!(Temperature::try_from(0.0), Ok(_));
        assert_matches!(Temperature::try_from(6553.3), Ok(_));
        assert_matches!(
            Temperature::try_from(-0.5),
            Err(Error::TemperatureOutOfRange(_))
        );
        // Negative temperatures cannot be carried by the unsigned wire word;
        // they are rejected outright, never wrapped.
        assert_matches!(
            Temperature::try_from(-50.0),
            Err(Error::TemperatureOutOfRange(v)) if v == -50.0
        );
        assert_matches!(
            Temperature::try_from(6553.4),
            Err(Error::TemperatureOutOfRange(_))
        );
    }

    #[test]
    fn sensor_reading_sentinels() {
        assert_eq!(SensorReading::decode(0xFFFE), SensorReading::Unavailable);
        assert_eq!(SensorReading::decode(0xFFFF), SensorReading::Unavailable);
        assert_eq!(
            SensorReading::decode(0xFFFD),
            SensorReading::Available(Temperature::try_from(6553.3).unwrap())
        );
        assert_eq!(
            SensorReading::decode(215),
            SensorReading::Available(Temperature::try_from(21.5).unwrap())
        );
        // An unavailable sensor must never read as 0.0 degrees.
        assert_eq!(SensorReading::decode(0xFFFF).temperature(), None);
    }

    #[test]
    fn operation_mode_decode() {
        assert_eq!(OperationMode::decode(0), OperationMode::ChangeOver);
        assert_eq!(OperationMode::decode(1), OperationMode::Schedule);
        assert_eq!(OperationMode::decode(2), OperationMode::Hold);
        assert_eq!(OperationMode::decode(3), OperationMode::Advanced);
        assert_eq!(OperationMode::decode(4), OperationMode::Away);
        assert_eq!(OperationMode::decode(5), OperationMode::FrostMode);
        assert_eq!(OperationMode::decode(6), OperationMode::Unknown);
        assert_eq!(OperationMode::decode(0xFFFF), OperationMode::Unknown);
    }

    #[test]
    fn programme_mode_by_name_and_code() {
        let cases = [
            ("5day_2day", 0u16),
            ("7day", 1),
            ("24hour", 2),
            ("none", 3),
        ];
        for (name, code) in cases {
            let by_name: ProgrammeMode = name.parse().unwrap();
            let by_code: ProgrammeMode = code.to_string().parse().unwrap();
            assert_eq!(by_name, by_code);
            assert_eq!(by_name.encode_for_write_register(), code);
        }

        assert_matches!(
            "weekly".parse::<ProgrammeMode>(),
            Err(Error::InvalidProgrammeMode(_))
        );
        assert_matches!(
            "4".parse::<ProgrammeMode>(),
            Err(Error::InvalidProgrammeMode(_))
        );
    }

    #[test]
    fn programme_periods() {
        assert_eq!(
            ProgrammePeriods::try_from(4)
                .unwrap()
                .encode_for_write_register(),
            0
        );
        assert_eq!(
            ProgrammePeriods::try_from(6)
                .unwrap()
                .encode_for_write_register(),
            1
        );
        for bad in [0u8, 1, 2, 3, 5, 7, 8, 255] {
            assert_matches!(
                ProgrammePeriods::try_from(bad),
                Err(Error::InvalidProgrammePeriods(_))
            );
        }
    }

    #[test]
    fn hold_duration_packing() {
        // 75 minutes = 1 hour 15 minutes.
        assert_eq!(
            HoldDuration::try_from(75)
                .unwrap()
                .encode_for_write_register(),
            0x010F
        );
        assert_eq!(
            HoldDuration::try_from(0)
                .unwrap()
                .encode_for_write_register(),
            0x0000
        );
        // 1535 minutes (25 hours 35 minutes) is the last accepted duration.
        assert_eq!(
            HoldDuration::try_from(1535)
                .unwrap()
                .encode_for_write_register(),
            0x1923
        );
        assert_matches!(
            HoldDuration::try_from(1536),
            Err(Error::HoldDurationTooLong(1536))
        );
        assert_matches!(
            HoldDuration::try_from(u16::MAX),
            Err(Error::HoldDurationTooLong(_))
        );
    }

    #[test]
    fn device_time_packing() {
        let time = DeviceTime {
            year: 2021,
            month: 12,
            day: 31,
            hour: 23,
            minute: 59,
            second: 58,
        };
        assert_eq!(
            time.encode_for_write_registers(),
            [2021, (12 << 8) | 31, (23 << 8) | 59, 58]
        );
    }

    #[test]
    fn temperature_units_parsing() {
        for s in ["C", "c", "celsius", "Celsius"] {
            assert_eq!(
                s.parse::<TemperatureUnits>().unwrap(),
                TemperatureUnits::Celsius
            );
        }
        for s in ["F", "f", "fahrenheit", "Fahrenheit"] {
            assert_eq!(
                s.parse::<TemperatureUnits>().unwrap(),
                TemperatureUnits::Fahrenheit
            );
        }
        assert_matches!(
            "k".parse::<TemperatureUnits>(),
            Err(Error::InvalidTemperatureUnits(_))
        );
        assert_matches!(
            "".parse::<TemperatureUnits>(),
            Err(Error::InvalidTemperatureUnits(_))
        );
    }

    #[test]
    fn temperature_units_decode() {
        assert_eq!(
            TemperatureUnits::decode_from_holding_registers(&[0]).unwrap(),
            TemperatureUnits::Celsius
        );
        assert_eq!(
            TemperatureUnits::decode_from_holding_registers(&[1]).unwrap(),
            TemperatureUnits::Fahrenheit
        );
        assert_matches!(
            TemperatureUnits::decode_from_holding_registers(&[]),
            Err(Error::UnexpectedRegisterCount { .. })
        );
    }

    #[test]
    fn keylock_encoding() {
        assert_eq!(Keylock::DISABLED.encode_for_write_register(), 0);
        assert_eq!(Keylock::from(None).encode_for_write_register(), 0);
        assert_eq!(Keylock::from(Some(1234)).encode_for_write_register(), 1234);
        assert_eq!(Keylock::from(9999u16).encode_for_write_register(), 9999);
    }

    #[test]
    fn unit_id_bounds() {
        assert_matches!(UnitId::try_from(0), Err(Error::UnitIdOutOfRange(0)));
        assert_eq!(*UnitId::try_from(1).unwrap(), 1);
        assert_eq!(*UnitId::try_from(32).unwrap(), 32);
        assert_matches!(UnitId::try_from(33), Err(Error::UnitIdOutOfRange(33)));
        assert_eq!(*UnitId::default(), 1);
    }

    #[test]
    fn status_decode_without_firmware() {
        // Block as read from register 1 on older firmware.
        let words = [1, 215, 180, 0, 0, 210, 1, 2];
        let status =
            Status::decode_from_holding_registers(StatusLayout::WithoutFirmware, &words).unwrap();
        assert_eq!(status.firmware_version, None);
        assert!(status.relay_on);
        assert_eq!(
            status.room_temperature.temperature().unwrap().degrees(),
            21.5
        );
        assert_eq!(
            status.floor_temperature.temperature().unwrap().degrees(),
            18.0
        );
        assert_eq!(
            status.target_temperature.temperature().unwrap().degrees(),
            21.0
        );
        assert!(status.device_on);
        assert_eq!(status.operation_mode, OperationMode::Hold);
    }

    #[test]
    fn status_decode_with_firmware() {
        let words = [0, 1, 215, 180, 0, 0, 210, 1, 2];
        let status =
            Status::decode_from_holding_registers(StatusLayout::WithFirmware, &words).unwrap();
        assert_eq!(status.firmware_version.map(|v| *v), Some(0));
        assert!(status.relay_on);
        assert_eq!(
            status.room_temperature.temperature().unwrap().degrees(),
            21.5
        );
        assert_eq!(
            status.floor_temperature.temperature().unwrap().degrees(),
            18.0
        );
        assert_eq!(
            status.target_temperature.temperature().unwrap().degrees(),
            21.0
        );
        assert!(status.device_on);
        assert_eq!(status.operation_mode, OperationMode::Hold);
    }

    #[test]
    fn status_decode_unavailable_sensor() {
        let words = [1, 215, 0xFFFE, 0, 0, 210, 1, 2];
        let status =
            Status::decode_from_holding_registers(StatusLayout::WithoutFirmware, &words).unwrap();
        assert_eq!(status.floor_temperature, SensorReading::Unavailable);
    }

    #[test]
    fn status_decode_wrong_length() {
        assert_matches!(
            Status::decode_from_holding_registers(StatusLayout::WithoutFirmware, &[1, 2, 3]),
            Err(Error::UnexpectedRegisterCount {
                expected: 8,
                actual: 3
            })
        );
        assert_matches!(
            Status::decode_from_holding_registers(
                StatusLayout::WithFirmware,
                &[1, 215, 180, 0, 0, 210, 1, 2]
            ),
            Err(Error::UnexpectedRegisterCount {
                expected: 9,
                actual: 8
            })
        );
    }
}
