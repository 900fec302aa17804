//! Common data structures and error types for the `tokio-modbus` based
//! session.
//!
//! It defines the `Error` enum, which encapsulates all possible communication
//! errors, the [`RegisterTransport`] trait the session and the stateless
//! operations run over, and the fixed serial framing Heatmiser thermostats
//! mandate.
use crate::protocol as proto;
use std::time::Duration;
use tokio_modbus::{
    Slave,
    client::sync::Context,
    prelude::{SyncReader, SyncWriter},
    slave::SlaveContext,
};

/// Represents all possible errors that can occur while talking to a
/// thermostat.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An invalid value was supplied by the caller; nothing was sent to the
    /// device.
    #[error(transparent)]
    Protocol(#[from] proto::Error),

    /// A register operation was attempted before `connect()` succeeded (or
    /// after `close()`).
    #[error("not connected, call connect() first")]
    NotConnected,

    /// The device accepted the frame but rejected the request.
    #[error(transparent)]
    Exception(#[from] tokio_modbus::ExceptionCode),

    /// A transport-level failure: a transaction failed or timed out.
    #[error(transparent)]
    Modbus(#[from] tokio_modbus::Error),

    /// The serial port could not be opened (missing device, permission
    /// denied, already in use).
    #[error("cannot open serial port: {0}")]
    Io(#[from] std::io::Error),
}

/// The result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Register-level access to one Modbus connection.
///
/// The production implementation is the synchronous `tokio-modbus`
/// [`Context`]; holding-register reads and writes come back with the nested
/// tokio-modbus result already flattened into this crate's [`Result`].
pub trait RegisterTransport {
    /// Selects the unit ID subsequent transactions are addressed to.
    fn set_slave(&mut self, slave: Slave);

    /// Bounds the time one transaction may take.
    fn set_timeout(&mut self, timeout: Duration);

    fn read_holding_registers(&mut self, address: u16, quantity: u16) -> Result<Vec<u16>>;

    fn write_single_register(&mut self, address: u16, word: u16) -> Result<()>;

    fn write_multiple_registers(&mut self, address: u16, words: &[u16]) -> Result<()>;
}

/// Helper function to map the nested tokio result to our result.
fn flatten<T>(result: tokio_modbus::Result<T>) -> Result<T> {
    match result {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(err)) => Err(err.into()), // Modbus exception
        Err(err) => Err(err.into()),     // IO error
    }
}

impl RegisterTransport for Context {
    fn set_slave(&mut self, slave: Slave) {
        SlaveContext::set_slave(self, slave);
    }

    fn set_timeout(&mut self, timeout: Duration) {
        Context::set_timeout(self, timeout);
    }

    fn read_holding_registers(&mut self, address: u16, quantity: u16) -> Result<Vec<u16>> {
        flatten(SyncReader::read_holding_registers(self, address, quantity))
    }

    fn write_single_register(&mut self, address: u16, word: u16) -> Result<()> {
        flatten(SyncWriter::write_single_register(self, address, word))
    }

    fn write_multiple_registers(&mut self, address: u16, words: &[u16]) -> Result<()> {
        flatten(SyncWriter::write_multiple_registers(self, address, words))
    }
}

/// The baud rate mandated by the device; not configurable.
pub const BAUD_RATE: u32 = 9600;
/// The parity used for serial communication.
pub const PARITY: &tokio_serial::Parity = &tokio_serial::Parity::None;
/// The number of stop bits used for serial communication.
pub const STOP_BITS: &tokio_serial::StopBits = &tokio_serial::StopBits::One;
/// The number of data bits used for serial communication.
pub const DATA_BITS: &tokio_serial::DataBits = &tokio_serial::DataBits::Eight;

/// Creates a `tokio_serial::SerialPortBuilder` with the fixed framing the
/// thermostats require (9600 baud, 8 data bits, no parity, 1 stop bit).
///
/// # Arguments
///
/// * `device` - The path to the serial port device (e.g., `/dev/ttyUSB0`).
pub fn serial_port_builder(device: &str) -> tokio_serial::SerialPortBuilder {
    tokio_serial::new(device, BAUD_RATE)
        .parity(*PARITY)
        .stop_bits(*STOP_BITS)
        .data_bits(*DATA_BITS)
        .flow_control(tokio_serial::FlowControl::None)
}
