//! A cached, named view of one physical thermostat on the bus.

use crate::protocol as proto;

/// A lightweight projection of one thermostat, identified by its unit ID.
///
/// A `Thermostat` never owns a transport; it is created and updated by the
/// owning [`Session`](crate::session::Session), which decodes status reads
/// into the handle's cached fields. The cache distinguishes "never read this
/// session" (`None`) from "read, but the device reports the sensor as
/// unavailable" ([`proto::SensorReading::Unavailable`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Thermostat {
    id: proto::UnitId,
    name: String,
    status: Option<proto::Status>,
    units: Option<proto::TemperatureUnits>,
}

impl Thermostat {
    /// Creates a handle for `id`. Without an explicit name the handle is
    /// called `Thermostat #<id>`.
    pub fn new(id: proto::UnitId, name: Option<String>) -> Self {
        Self {
            name: name.unwrap_or_else(|| format!("Thermostat #{id}")),
            id,
            status: None,
            units: None,
        }
    }

    /// The unit ID (bus address) of the device.
    pub fn id(&self) -> proto::UnitId {
        self.id
    }

    /// The display name of the thermostat.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The last successfully read status snapshot, or `None` if no status
    /// read has succeeded yet.
    pub fn status(&self) -> Option<&proto::Status> {
        self.status.as_ref()
    }

    /// Whether the heating relay was on at the last status read.
    pub fn relay_on(&self) -> Option<bool> {
        self.status.map(|s| s.relay_on)
    }

    pub fn room_temperature(&self) -> Option<proto::SensorReading> {
        self.status.map(|s| s.room_temperature)
    }

    pub fn floor_temperature(&self) -> Option<proto::SensorReading> {
        self.status.map(|s| s.floor_temperature)
    }

    pub fn target_temperature(&self) -> Option<proto::SensorReading> {
        self.status.map(|s| s.target_temperature)
    }

    /// Whether the thermostat was switched on at the last status read.
    pub fn device_on(&self) -> Option<bool> {
        self.status.map(|s| s.device_on)
    }

    pub fn operation_mode(&self) -> Option<proto::OperationMode> {
        self.status.map(|s| s.operation_mode)
    }

    /// Firmware version, if a status read with a firmware-bearing layout has
    /// succeeded.
    pub fn firmware_version(&self) -> Option<proto::FirmwareVersion> {
        self.status.and_then(|s| s.firmware_version)
    }

    /// The cached temperature-unit preference, if it has been read (or set)
    /// this session lifetime.
    pub fn temperature_units(&self) -> Option<proto::TemperatureUnits> {
        self.units
    }

    /// Replaces the cached status snapshot. Called by the session on a
    /// successful read only, so a failed read leaves the previous snapshot
    /// intact.
    pub(crate) fn update_status(&mut self, status: proto::Status) {
        self.status = Some(status);
    }

    /// Refreshes the cached unit preference. Called by the session after a
    /// units read, and after a successful `set_temperature_units` write so
    /// the memo cannot go stale.
    pub(crate) fn update_temperature_units(&mut self, units: proto::TemperatureUnits) {
        self.units = Some(units);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{OperationMode, SensorReading, Status, StatusLayout, UnitId};

    fn unit(id: u8) -> UnitId {
        UnitId::try_from(id).unwrap()
    }

    #[test]
    fn default_name() {
        let therm = Thermostat::new(unit(1), None);
        assert_eq!(therm.id(), unit(1));
        assert_eq!(therm.name(), "Thermostat #1");
    }

    #[test]
    fn explicit_name() {
        let therm = Thermostat::new(unit(2), Some("Bedroom 2".into()));
        assert_eq!(therm.id(), unit(2));
        assert_eq!(therm.name(), "Bedroom 2");
    }

    #[test]
    fn fields_are_unset_before_first_read() {
        let therm = Thermostat::new(unit(1), None);
        assert_eq!(therm.status(), None);
        assert_eq!(therm.relay_on(), None);
        assert_eq!(therm.room_temperature(), None);
        assert_eq!(therm.operation_mode(), None);
        assert_eq!(therm.temperature_units(), None);
    }

    #[test]
    fn update_status_replaces_snapshot() {
        let mut therm = Thermostat::new(unit(3), None);
        let status = Status::decode_from_holding_registers(
            StatusLayout::WithoutFirmware,
            &[1, 215, 0xFFFE, 0, 0, 210, 1, 2],
        )
        .unwrap();
        therm.update_status(status);

        assert_eq!(therm.relay_on(), Some(true));
        assert_eq!(
            therm
                .room_temperature()
                .unwrap()
                .temperature()
                .unwrap()
                .degrees(),
            21.5
        );
        // Read succeeded but the floor sensor is not fitted: distinct from
        // the never-read state.
        assert_eq!(therm.floor_temperature(), Some(SensorReading::Unavailable));
        assert_eq!(therm.operation_mode(), Some(OperationMode::Hold));
        assert_eq!(therm.firmware_version(), None);
    }
}
