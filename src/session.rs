//! A stateful, thread-safe session owning one Modbus RTU serial transport
//! and the thermostats addressed through it.
//!
//! One [`Session`] maps to one serial port (one RS485 bus). Any number of
//! thermostats, distinguished by their unit IDs, can be addressed through the
//! same session; the underlying link is half-duplex and strictly
//! request/response, so the session serializes all register operations behind
//! a single transport mutex. Concurrent calls from multiple threads queue and
//! execute one at a time; sessions on distinct ports are fully independent.
//!
//! ## Example
//!
//! ```no_run
//! use heatmiser_modbus_lib::{protocol as proto, session::Session};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::new("/dev/ttyUSB0", proto::StatusLayout::default());
//!     session.connect()?;
//!
//!     let id = proto::UnitId::try_from(1)?;
//!     session.add_thermostat(id, None);
//!     let thermostat = session.read_status(id)?;
//!     println!("Room temperature: {}", thermostat.room_temperature().unwrap());
//!
//!     session.close();
//!     Ok(())
//! }
//! ```

use crate::{
    protocol as proto,
    thermostat::Thermostat,
    tokio_common::{Error, RegisterTransport, Result, serial_port_builder},
    tokio_sync::Heatmiser,
};
use std::{collections::HashMap, fmt, sync::Mutex, time::Duration};
use tokio_modbus::Slave;

/// A session on one serial bus of Heatmiser thermostats.
///
/// The transport is opened by [`connect`](Session::connect) and released by
/// [`close`](Session::close); every register operation between the two is a
/// single Modbus transaction targeted at the unit ID passed to it.
pub struct Session {
    port: String,
    layout: proto::StatusLayout,
    timeout: Mutex<Option<Duration>>,
    // One live transport at most; the mutex is what serializes all register
    // operations issued through this session.
    transport: Mutex<Option<Box<dyn RegisterTransport + Send>>>,
    thermostats: Mutex<HashMap<proto::UnitId, Thermostat>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Session")
            .field("port", &self.port)
            .field("layout", &self.layout)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session for the serial port at `port`. No transport is
    /// opened until [`connect`](Session::connect) is called.
    ///
    /// `layout` selects the status-block register layout of the firmware
    /// revision on this bus; see [`proto::StatusLayout`].
    pub fn new(port: impl Into<String>, layout: proto::StatusLayout) -> Self {
        Self {
            port: port.into(),
            layout,
            timeout: Mutex::new(None),
            transport: Mutex::new(None),
            thermostats: Mutex::new(HashMap::new()),
        }
    }

    /// The serial port path this session talks through.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Sets the timeout applied to every Modbus transaction. Takes effect
    /// immediately, also for an already open transport.
    pub fn set_timeout(&self, timeout: Duration) {
        *self.timeout.lock().unwrap() = Some(timeout);
        if let Some(transport) = self.transport.lock().unwrap().as_mut() {
            transport.set_timeout(timeout);
        }
    }

    /// The currently configured transaction timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        *self.timeout.lock().unwrap()
    }

    /// Opens the RTU transport on the configured serial port at the fixed
    /// device framing (9600 baud, 8 data bits, no parity, 1 stop bit).
    ///
    /// A transport that is already open is replaced; the old one is closed
    /// first. Fails if the port cannot be opened (missing device, permission
    /// denied, already in use).
    pub fn connect(&self) -> Result<()> {
        let builder = serial_port_builder(&self.port);
        // The slave address is re-targeted per operation; the initial value
        // only has to be valid.
        let mut ctx = tokio_modbus::client::sync::rtu::connect_slave(
            &builder,
            Slave(*proto::UnitId::default()),
        )?;
        if let Some(timeout) = *self.timeout.lock().unwrap() {
            ctx.set_timeout(timeout);
        }
        *self.transport.lock().unwrap() = Some(Box::new(ctx));
        Ok(())
    }

    #[cfg(test)]
    fn install_transport(&self, transport: Box<dyn RegisterTransport + Send>) {
        *self.transport.lock().unwrap() = Some(transport);
    }

    /// Releases the transport. Safe to call any number of times, including
    /// when never connected. After `close()` the session only becomes usable
    /// again through a fresh [`connect`](Session::connect).
    pub fn close(&self) {
        self.transport.lock().unwrap().take();
    }

    /// Whether a transport is currently open.
    pub fn is_connected(&self) -> bool {
        self.transport.lock().unwrap().is_some()
    }

    /// Adds a thermostat handle for `id`, returning a snapshot of it. Adding
    /// an id that already exists leaves the existing handle (and its cached
    /// state) untouched.
    pub fn add_thermostat(&self, id: proto::UnitId, name: Option<String>) -> Thermostat {
        let mut thermostats = self.thermostats.lock().unwrap();
        thermostats
            .entry(id)
            .or_insert_with(|| Thermostat::new(id, name))
            .clone()
    }

    /// A snapshot of the thermostat handle for `id`, if one has been added.
    pub fn thermostat(&self, id: proto::UnitId) -> Option<Thermostat> {
        self.thermostats.lock().unwrap().get(&id).cloned()
    }

    /// Snapshots of all thermostat handles of this session.
    pub fn thermostats(&self) -> Vec<Thermostat> {
        self.thermostats.lock().unwrap().values().cloned().collect()
    }

    /// Removes the thermostat handle for `id`, dropping its cached state.
    pub fn remove_thermostat(&self, id: proto::UnitId) {
        self.thermostats.lock().unwrap().remove(&id);
    }

    /// Runs one logical transaction against unit `id`, holding the transport
    /// lock for the re-target of the slave address and the transaction
    /// itself so that concurrent calls can never interleave on the bus.
    fn transaction<T>(
        &self,
        id: proto::UnitId,
        operation: impl FnOnce(&mut (dyn RegisterTransport + Send)) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.transport.lock().unwrap();
        let transport = guard.as_mut().ok_or(Error::NotConnected)?;
        transport.set_slave(Slave(*id));
        operation(transport.as_mut())
    }

    /// Reads the status block of unit `id` and replaces the cached snapshot
    /// of its handle (creating the handle if it was never added). On failure
    /// the previously cached snapshot is left untouched.
    pub fn read_status(&self, id: proto::UnitId) -> Result<Thermostat> {
        let layout = self.layout;
        let status = self.transaction(id, |ctx| Heatmiser::read_status(ctx, layout))?;
        let mut thermostats = self.thermostats.lock().unwrap();
        let thermostat = thermostats
            .entry(id)
            .or_insert_with(|| Thermostat::new(id, None));
        thermostat.update_status(status);
        Ok(thermostat.clone())
    }

    /// The temperature units of unit `id`, read from the device at most once
    /// per session lifetime: a cached preference is returned without a bus
    /// transaction. [`set_temperature_units`](Session::set_temperature_units)
    /// refreshes the cache.
    pub fn temperature_units(&self, id: proto::UnitId) -> Result<proto::TemperatureUnits> {
        if let Some(units) = self
            .thermostats
            .lock()
            .unwrap()
            .get(&id)
            .and_then(|t| t.temperature_units())
        {
            return Ok(units);
        }
        let units = self.transaction(id, |ctx| Heatmiser::read_temperature_units(ctx))?;
        self.cache_units(id, units);
        Ok(units)
    }

    /// Sets the temperature units of unit `id` and refreshes the handle's
    /// cached preference.
    pub fn set_temperature_units(
        &self,
        id: proto::UnitId,
        units: proto::TemperatureUnits,
    ) -> Result<()> {
        self.transaction(id, |ctx| Heatmiser::set_temperature_units(ctx, units))?;
        self.cache_units(id, units);
        Ok(())
    }

    fn cache_units(&self, id: proto::UnitId, units: proto::TemperatureUnits) {
        self.thermostats
            .lock()
            .unwrap()
            .entry(id)
            .or_insert_with(|| Thermostat::new(id, None))
            .update_temperature_units(units);
    }

    /// Reads the firmware version of unit `id`.
    pub fn read_firmware_version(&self, id: proto::UnitId) -> Result<proto::FirmwareVersion> {
        self.transaction(id, |ctx| Heatmiser::read_firmware_version(ctx))
    }

    /// Turns unit `id` on.
    pub fn turn_on(&self, id: proto::UnitId) -> Result<()> {
        self.transaction(id, |ctx| Heatmiser::set_power(ctx, proto::Power::On))
    }

    /// Turns unit `id` off.
    pub fn turn_off(&self, id: proto::UnitId) -> Result<()> {
        self.transaction(id, |ctx| Heatmiser::set_power(ctx, proto::Power::Off))
    }

    /// Sets the target room temperature of unit `id`.
    pub fn set_target_temperature(
        &self,
        id: proto::UnitId,
        temperature: proto::Temperature,
    ) -> Result<()> {
        self.transaction(id, |ctx| {
            Heatmiser::set_target_temperature(ctx, temperature)
        })
    }

    /// Sets the frost protection temperature of unit `id`.
    pub fn set_frost_protect_temperature(
        &self,
        id: proto::UnitId,
        temperature: proto::Temperature,
    ) -> Result<()> {
        self.transaction(id, |ctx| {
            Heatmiser::set_frost_protect_temperature(ctx, temperature)
        })
    }

    /// Sets the floor sensor temperature limit of unit `id`.
    pub fn set_floor_limit_temperature(
        &self,
        id: proto::UnitId,
        temperature: proto::Temperature,
    ) -> Result<()> {
        self.transaction(id, |ctx| {
            Heatmiser::set_floor_limit_temperature(ctx, temperature)
        })
    }

    /// Sets the switching differential of unit `id`.
    pub fn set_switching_differential(
        &self,
        id: proto::UnitId,
        temperature: proto::Temperature,
    ) -> Result<()> {
        self.transaction(id, |ctx| {
            Heatmiser::set_switching_differential(ctx, temperature)
        })
    }

    /// Sets the up/down key limit of unit `id`.
    pub fn set_up_down_limit(&self, id: proto::UnitId, limit: proto::Temperature) -> Result<()> {
        self.transaction(id, |ctx| Heatmiser::set_up_down_limit(ctx, limit))
    }

    /// Sets the output switching delay of unit `id`.
    pub fn set_output_delay(&self, id: proto::UnitId, delay: proto::OutputDelay) -> Result<()> {
        self.transaction(id, |ctx| Heatmiser::set_output_delay(ctx, delay))
    }

    /// Sets the sensor selection mode of unit `id`.
    pub fn set_sensor_selection(
        &self,
        id: proto::UnitId,
        selection: proto::SensorSelection,
    ) -> Result<()> {
        self.transaction(id, |ctx| Heatmiser::set_sensor_selection(ctx, selection))
    }

    /// Sets the number of programme periods of unit `id`.
    pub fn set_programme_periods(
        &self,
        id: proto::UnitId,
        periods: proto::ProgrammePeriods,
    ) -> Result<()> {
        self.transaction(id, |ctx| Heatmiser::set_programme_periods(ctx, periods))
    }

    /// Sets the programme / schedule mode of unit `id`.
    pub fn set_programme_mode(&self, id: proto::UnitId, mode: proto::ProgrammeMode) -> Result<()> {
        self.transaction(id, |ctx| Heatmiser::set_programme_mode(ctx, mode))
    }

    /// Writes `time` to the clock of unit `id`.
    pub fn set_time(&self, id: proto::UnitId, time: &proto::DeviceTime) -> Result<()> {
        self.transaction(id, |ctx| Heatmiser::set_time(ctx, time))
    }

    /// Enables or disables automatic daylight-saving adjustment on unit `id`.
    pub fn set_auto_dst(&self, id: proto::UnitId, auto_dst: proto::AutoDst) -> Result<()> {
        self.transaction(id, |ctx| Heatmiser::set_auto_dst(ctx, auto_dst))
    }

    /// Sets or clears the keypad lock PIN of unit `id`.
    pub fn set_keylock(&self, id: proto::UnitId, keylock: proto::Keylock) -> Result<()> {
        self.transaction(id, |ctx| Heatmiser::set_keylock(ctx, keylock))
    }

    /// Overrides the target temperature of unit `id` for a bounded duration.
    ///
    /// Two sequential writes on the wire (duration, then temperature); the
    /// first is not rolled back if the second fails. Both run under one
    /// acquisition of the transport lock, so no other operation can slot in
    /// between them.
    pub fn hold_mode(
        &self,
        id: proto::UnitId,
        temperature: proto::Temperature,
        duration: proto::HoldDuration,
    ) -> Result<()> {
        self.transaction(id, |ctx| Heatmiser::hold_mode(ctx, temperature, duration))
    }

    /// Restores unit `id` to its factory default settings. The device
    /// disables its Modbus interface afterwards.
    pub fn factory_reset(&self, id: proto::UnitId) -> Result<()> {
        self.transaction(id, |ctx| Heatmiser::factory_reset(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::{
        collections::HashMap,
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
    };

    fn unit(id: u8) -> proto::UnitId {
        proto::UnitId::try_from(id).unwrap()
    }

    fn session() -> Session {
        Session::new("/dev/ttyS0", proto::StatusLayout::default())
    }

    /// One recorded bus interaction.
    #[derive(Debug, Clone, PartialEq)]
    enum BusOp {
        Slave(u8),
        Read { address: u16, quantity: u16 },
        Write { address: u16, word: u16 },
        WriteMany { address: u16, words: Vec<u16> },
    }

    /// An in-memory transport serving canned register blocks. It records
    /// every interaction and panics if two transactions ever overlap in
    /// time.
    #[derive(Default)]
    struct FakeTransport {
        blocks: HashMap<(u16, u16), Vec<u16>>,
        ops: Arc<Mutex<Vec<BusOp>>>,
        in_flight: Arc<AtomicBool>,
    }

    impl FakeTransport {
        fn begin(&self) {
            assert!(
                !self.in_flight.swap(true, Ordering::SeqCst),
                "transaction started while another was still in flight"
            );
            // Widen the window in which an overlapping caller would collide.
            std::thread::sleep(Duration::from_millis(1));
        }

        fn end(&self) {
            self.in_flight.store(false, Ordering::SeqCst);
        }
    }

    impl RegisterTransport for FakeTransport {
        fn set_slave(&mut self, slave: Slave) {
            self.ops.lock().unwrap().push(BusOp::Slave(slave.0));
        }

        fn set_timeout(&mut self, _timeout: Duration) {}

        fn read_holding_registers(&mut self, address: u16, quantity: u16) -> Result<Vec<u16>> {
            self.begin();
            self.ops
                .lock()
                .unwrap()
                .push(BusOp::Read { address, quantity });
            let words = self
                .blocks
                .get(&(address, quantity))
                .expect("read of an address with no canned block")
                .clone();
            self.end();
            Ok(words)
        }

        fn write_single_register(&mut self, address: u16, word: u16) -> Result<()> {
            self.begin();
            self.ops.lock().unwrap().push(BusOp::Write { address, word });
            self.end();
            Ok(())
        }

        fn write_multiple_registers(&mut self, address: u16, words: &[u16]) -> Result<()> {
            self.begin();
            self.ops.lock().unwrap().push(BusOp::WriteMany {
                address,
                words: words.to_vec(),
            });
            self.end();
            Ok(())
        }
    }

    #[test]
    fn stores_the_port() {
        assert_eq!(session().port(), "/dev/ttyS0");
    }

    #[test]
    fn operations_before_connect_fail_fast() {
        let session = session();
        assert_matches!(session.turn_on(unit(1)), Err(Error::NotConnected));
        assert_matches!(session.read_status(unit(1)), Err(Error::NotConnected));
        assert_matches!(session.temperature_units(unit(1)), Err(Error::NotConnected));
        // Failed read never creates a status snapshot.
        assert_eq!(session.thermostat(unit(1)), None);
    }

    #[test]
    fn close_is_idempotent() {
        let session = session();
        session.close();
        session.close();
        assert!(!session.is_connected());
        // Still not usable without a fresh connect.
        assert_matches!(session.turn_off(unit(1)), Err(Error::NotConnected));
    }

    #[test]
    fn add_and_get_thermostats() {
        let session = session();
        assert!(session.thermostats().is_empty());

        let one = session.add_thermostat(unit(1), None);
        assert_eq!(one.name(), "Thermostat #1");

        let two = session.add_thermostat(unit(2), Some("Bedroom 2".into()));
        assert_eq!(two.name(), "Bedroom 2");

        assert_eq!(session.thermostats().len(), 2);
        assert_eq!(session.thermostat(unit(2)).unwrap().name(), "Bedroom 2");
        assert_eq!(session.thermostat(unit(3)), None);
    }

    #[test]
    fn adding_an_existing_id_keeps_the_handle() {
        let session = session();
        session.add_thermostat(unit(1), Some("one".into()));
        let again = session.add_thermostat(unit(1), Some("other".into()));
        assert_eq!(again.name(), "one");
        assert_eq!(session.thermostats().len(), 1);
    }

    #[test]
    fn remove_thermostat() {
        let session = session();
        session.add_thermostat(unit(1), None);
        session.add_thermostat(unit(2), None);
        session.remove_thermostat(unit(2));
        assert_eq!(session.thermostat(unit(2)), None);
        assert_eq!(session.thermostats().len(), 1);
    }

    #[test]
    fn timeout_is_stored_before_connect() {
        let session = session();
        assert_eq!(session.timeout(), None);
        session.set_timeout(Duration::from_millis(500));
        assert_eq!(session.timeout(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn read_status_decodes_into_the_handle() {
        let session = Session::new("/dev/ttyS0", proto::StatusLayout::WithFirmware);
        let mut fake = FakeTransport::default();
        fake.blocks
            .insert((0, 9), vec![0, 1, 215, 180, 0, 0, 210, 1, 2]);
        let ops = fake.ops.clone();
        session.install_transport(Box::new(fake));

        session.add_thermostat(unit(3), None);
        let thermostat = session.read_status(unit(3)).unwrap();

        assert_eq!(thermostat.relay_on(), Some(true));
        assert_eq!(
            thermostat
                .room_temperature()
                .unwrap()
                .temperature()
                .unwrap()
                .degrees(),
            21.5
        );
        assert_eq!(
            thermostat
                .floor_temperature()
                .unwrap()
                .temperature()
                .unwrap()
                .degrees(),
            18.0
        );
        assert_eq!(
            thermostat
                .target_temperature()
                .unwrap()
                .temperature()
                .unwrap()
                .degrees(),
            21.0
        );
        assert_eq!(thermostat.device_on(), Some(true));
        assert_eq!(thermostat.operation_mode(), Some(proto::OperationMode::Hold));

        // Exactly one transaction, addressed to unit 3.
        assert_eq!(
            *ops.lock().unwrap(),
            vec![
                BusOp::Slave(3),
                BusOp::Read {
                    address: 0,
                    quantity: 9
                }
            ]
        );
        // The decoded snapshot stays cached on the session's handle.
        assert_eq!(
            session.thermostat(unit(3)).unwrap().operation_mode(),
            Some(proto::OperationMode::Hold)
        );
    }

    #[test]
    fn set_temperature_units_writes_and_caches() {
        let session = session();
        let fake = FakeTransport::default();
        let ops = fake.ops.clone();
        session.install_transport(Box::new(fake));

        session
            .set_temperature_units(unit(1), proto::TemperatureUnits::Fahrenheit)
            .unwrap();
        assert_eq!(
            *ops.lock().unwrap(),
            vec![
                BusOp::Slave(1),
                BusOp::Write {
                    address: 20,
                    word: 1
                }
            ]
        );

        // The write refreshed the memo, so no units read hits the bus.
        assert_eq!(
            session.temperature_units(unit(1)).unwrap(),
            proto::TemperatureUnits::Fahrenheit
        );
        assert_eq!(ops.lock().unwrap().len(), 2);
    }

    #[test]
    fn concurrent_operations_never_interleave() {
        let session = session();
        let fake = FakeTransport::default();
        let ops = fake.ops.clone();
        session.install_transport(Box::new(fake));

        std::thread::scope(|scope| {
            for id in 1..=8u8 {
                let session = &session;
                scope.spawn(move || session.turn_on(unit(id)).unwrap());
            }
        });

        // Eight transactions, each a slave re-target followed by its own
        // write, with nothing from another transaction in between. The fake
        // additionally panics if two operations ever overlapped in time.
        let ops = ops.lock().unwrap();
        assert_eq!(ops.len(), 16);
        for pair in ops.chunks(2) {
            assert_matches!(
                pair,
                [
                    BusOp::Slave(_),
                    BusOp::Write {
                        address: 31,
                        word: 1
                    }
                ]
            );
        }
    }

    #[test]
    fn hold_mode_writes_stay_back_to_back() {
        let session = session();
        let fake = FakeTransport::default();
        let ops = fake.ops.clone();
        session.install_transport(Box::new(fake));

        session
            .hold_mode(
                unit(2),
                proto::Temperature::try_from(21.5).unwrap(),
                proto::HoldDuration::try_from(75).unwrap(),
            )
            .unwrap();

        assert_eq!(
            *ops.lock().unwrap(),
            vec![
                BusOp::Slave(2),
                BusOp::Write {
                    address: 37,
                    word: 0x010F
                },
                BusOp::Write {
                    address: 33,
                    word: 215
                }
            ]
        );
    }
}
