//! Synchronous operations for Heatmiser thermostats.
//!
//! This module provides the stateless, low-level API: one associated function
//! of the [`Heatmiser`] struct per thermostat capability, each operating on a
//! caller-supplied [`RegisterTransport`] (in production the synchronous
//! `tokio_modbus::client::sync::Context`). It handles the conversion between
//! the Rust types defined in [`crate::protocol`] and the raw Modbus register
//! values.
//!
//! The transport must already be targeted at the right unit ID (slave
//! address); [`crate::session::Session`] takes care of that and of
//! serializing access to the shared serial transport, and is the recommended
//! entry point.
//!
//! # Examples
//!
//! ```no_run
//! use heatmiser_modbus_lib::{protocol as proto, tokio_sync::Heatmiser};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let builder = heatmiser_modbus_lib::tokio_common::serial_port_builder("/dev/ttyUSB0");
//!     let slave = tokio_modbus::Slave(*proto::UnitId::default());
//!     let mut modbus_ctx = tokio_modbus::client::sync::rtu::connect_slave(&builder, slave)?;
//!     modbus_ctx.set_timeout(Some(Duration::from_secs(1)));
//!
//!     let status = Heatmiser::read_status(&mut modbus_ctx, proto::StatusLayout::default())?;
//!     println!("Room temperature: {}", status.room_temperature);
//!
//!     Ok(())
//! }
//! ```

use crate::{
    protocol as proto,
    tokio_common::{RegisterTransport, Result},
};

/// Stateless synchronous operations against a Heatmiser thermostat.
///
/// All methods that interact with the Modbus device block the current thread
/// and issue exactly one read or write transaction, except [`hold_mode`]
/// which the device protocol forces to be two sequential writes.
///
/// [`hold_mode`]: Heatmiser::hold_mode
#[derive(Debug)]
pub struct Heatmiser;

impl Heatmiser {
    /// Helper function to read holding registers and decode them into a
    /// specific type.
    fn read_and_decode<C, T, F>(ctx: &mut C, address: u16, quantity: u16, decoder: F) -> Result<T>
    where
        C: RegisterTransport + ?Sized,
        F: FnOnce(&[u16]) -> std::result::Result<T, proto::Error>,
    {
        Ok(decoder(&ctx.read_holding_registers(address, quantity)?)?)
    }

    /// Reads the thermostat's live status block in one transaction.
    ///
    /// `layout` selects the firmware-revision register layout; see
    /// [`proto::StatusLayout`].
    pub fn read_status<C: RegisterTransport + ?Sized>(
        ctx: &mut C,
        layout: proto::StatusLayout,
    ) -> Result<proto::Status> {
        Self::read_and_decode(ctx, layout.address(), layout.quantity(), |words| {
            proto::Status::decode_from_holding_registers(layout, words)
        })
    }

    /// Reads the temperature units the thermostat is configured to use.
    pub fn read_temperature_units<C: RegisterTransport + ?Sized>(
        ctx: &mut C,
    ) -> Result<proto::TemperatureUnits> {
        Self::read_and_decode(
            ctx,
            proto::TemperatureUnits::ADDRESS,
            proto::TemperatureUnits::QUANTITY,
            proto::TemperatureUnits::decode_from_holding_registers,
        )
    }

    /// Reads the firmware version register.
    pub fn read_firmware_version<C: RegisterTransport + ?Sized>(
        ctx: &mut C,
    ) -> Result<proto::FirmwareVersion> {
        Self::read_and_decode(
            ctx,
            proto::FirmwareVersion::ADDRESS,
            proto::FirmwareVersion::QUANTITY,
            proto::FirmwareVersion::decode_from_holding_registers,
        )
    }

    /// Switches the thermostat on or off.
    pub fn set_power<C: RegisterTransport + ?Sized>(
        ctx: &mut C,
        power: proto::Power,
    ) -> Result<()> {
        ctx.write_single_register(proto::Power::ADDRESS, power.encode_for_write_register())
    }

    /// Sets the target room temperature.
    pub fn set_target_temperature<C: RegisterTransport + ?Sized>(
        ctx: &mut C,
        temperature: proto::Temperature,
    ) -> Result<()> {
        ctx.write_single_register(
            proto::TARGET_TEMPERATURE_ADDRESS,
            temperature.encode_for_write_register(),
        )
    }

    /// Sets the frost protection temperature.
    pub fn set_frost_protect_temperature<C: RegisterTransport + ?Sized>(
        ctx: &mut C,
        temperature: proto::Temperature,
    ) -> Result<()> {
        ctx.write_single_register(
            proto::FROST_PROTECT_TEMPERATURE_ADDRESS,
            temperature.encode_for_write_register(),
        )
    }

    /// Sets the temperature limit for the floor sensor.
    pub fn set_floor_limit_temperature<C: RegisterTransport + ?Sized>(
        ctx: &mut C,
        temperature: proto::Temperature,
    ) -> Result<()> {
        ctx.write_single_register(
            proto::FLOOR_LIMIT_TEMPERATURE_ADDRESS,
            temperature.encode_for_write_register(),
        )
    }

    /// Sets the switching differential.
    pub fn set_switching_differential<C: RegisterTransport + ?Sized>(
        ctx: &mut C,
        temperature: proto::Temperature,
    ) -> Result<()> {
        ctx.write_single_register(
            proto::SWITCHING_DIFFERENTIAL_ADDRESS,
            temperature.encode_for_write_register(),
        )
    }

    /// Sets the limit on the front-panel up/down keys.
    pub fn set_up_down_limit<C: RegisterTransport + ?Sized>(
        ctx: &mut C,
        limit: proto::Temperature,
    ) -> Result<()> {
        ctx.write_single_register(
            proto::UP_DOWN_LIMIT_ADDRESS,
            limit.encode_for_write_register(),
        )
    }

    /// Sets the number of minutes to delay output switching by.
    pub fn set_output_delay<C: RegisterTransport + ?Sized>(
        ctx: &mut C,
        delay: proto::OutputDelay,
    ) -> Result<()> {
        ctx.write_single_register(proto::OutputDelay::ADDRESS, delay.encode_for_write_register())
    }

    /// Sets which sensors the thermostat uses for control.
    pub fn set_sensor_selection<C: RegisterTransport + ?Sized>(
        ctx: &mut C,
        selection: proto::SensorSelection,
    ) -> Result<()> {
        ctx.write_single_register(
            proto::SensorSelection::ADDRESS,
            selection.encode_for_write_register(),
        )
    }

    /// Sets the number of programme periods per day.
    pub fn set_programme_periods<C: RegisterTransport + ?Sized>(
        ctx: &mut C,
        periods: proto::ProgrammePeriods,
    ) -> Result<()> {
        ctx.write_single_register(
            proto::ProgrammePeriods::ADDRESS,
            periods.encode_for_write_register(),
        )
    }

    /// Sets the programme / schedule mode.
    pub fn set_programme_mode<C: RegisterTransport + ?Sized>(
        ctx: &mut C,
        mode: proto::ProgrammeMode,
    ) -> Result<()> {
        ctx.write_single_register(
            proto::ProgrammeMode::ADDRESS,
            mode.encode_for_write_register(),
        )
    }

    /// Sets the temperature units the thermostat displays.
    pub fn set_temperature_units<C: RegisterTransport + ?Sized>(
        ctx: &mut C,
        units: proto::TemperatureUnits,
    ) -> Result<()> {
        ctx.write_single_register(
            proto::TemperatureUnits::ADDRESS,
            units.encode_for_write_register(),
        )
    }

    /// Writes a timestamp to the thermostat's clock registers.
    pub fn set_time<C: RegisterTransport + ?Sized>(
        ctx: &mut C,
        time: &proto::DeviceTime,
    ) -> Result<()> {
        ctx.write_multiple_registers(proto::DeviceTime::ADDRESS, &time.encode_for_write_registers())
    }

    /// Enables or disables automatic daylight-saving adjustment.
    pub fn set_auto_dst<C: RegisterTransport + ?Sized>(
        ctx: &mut C,
        auto_dst: proto::AutoDst,
    ) -> Result<()> {
        ctx.write_single_register(proto::AutoDst::ADDRESS, auto_dst.encode_for_write_register())
    }

    /// Sets or clears the keypad lock PIN.
    pub fn set_keylock<C: RegisterTransport + ?Sized>(
        ctx: &mut C,
        keylock: proto::Keylock,
    ) -> Result<()> {
        ctx.write_single_register(proto::Keylock::ADDRESS, keylock.encode_for_write_register())
    }

    /// Overrides the target temperature for a bounded duration.
    ///
    /// The device protocol has no transactional semantics: this is two
    /// sequential register writes (duration, then target temperature). If the
    /// second write fails the duration has already taken effect on the device
    /// and is not rolled back.
    pub fn hold_mode<C: RegisterTransport + ?Sized>(
        ctx: &mut C,
        temperature: proto::Temperature,
        duration: proto::HoldDuration,
    ) -> Result<()> {
        ctx.write_single_register(
            proto::HoldDuration::ADDRESS,
            duration.encode_for_write_register(),
        )?;
        Self::set_target_temperature(ctx, temperature)
    }

    /// Restores the thermostat to its factory default settings.
    ///
    /// **Important:** Heatmiser thermostats disable their Modbus interface
    /// after a factory reset; it has to be re-enabled from the front panel
    /// before this library can talk to the device again.
    pub fn factory_reset<C: RegisterTransport + ?Sized>(ctx: &mut C) -> Result<()> {
        ctx.write_single_register(
            proto::FactoryReset::ADDRESS,
            proto::FactoryReset::encode_for_write_register(),
        )
    }
}
