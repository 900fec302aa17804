//! A library for controlling Heatmiser Modbus electric thermostats over an
//! RS485 serial bus.
//!
//! This crate provides two ways to interact with the thermostats:
//!
//! 1.  **High-Level Session**: A stateful, thread-safe [`session::Session`]
//!     that owns one serial transport, addresses any number of thermostats
//!     by unit ID and caches per-device state in [`thermostat::Thermostat`]
//!     handles. This is the recommended approach for most users.
//!
//! 2.  **Low-Level, Stateless Functions**: A set of stateless functions that
//!     directly map to the device's register operations. This API offers
//!     maximum flexibility but requires manual management of the Modbus
//!     context. See the [`tokio_sync`] module.
//!
//! ## Features
//!
//! - **Protocol Implementation**: Complete implementation of the Heatmiser
//!   Modbus register map, including the x10 fixed-point temperature format,
//!   sentinel "sensor unavailable" words, packed hold durations and packed
//!   date/time registers.
//! - **Strongly-Typed API**: Utilizes Rust's type system for protocol
//!   correctness (e.g., [`protocol::UnitId`], [`protocol::Temperature`],
//!   [`protocol::ProgrammeMode`]); invalid values are rejected before they
//!   reach the wire.
//! - **Firmware Variants**: The two observed status-block register layouts
//!   are selectable via [`protocol::StatusLayout`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use heatmiser_modbus_lib::{protocol as proto, session::Session};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // One session per serial port; the baud rate and framing are fixed
//!     // by the device (9600, 8N1).
//!     let session = Session::new("/dev/ttyUSB0", proto::StatusLayout::default());
//!     session.connect()?;
//!
//!     let id = proto::UnitId::try_from(1)?;
//!     session.add_thermostat(id, Some("Hallway".into()));
//!
//!     let target = proto::Temperature::try_from(21.5)?;
//!     session.set_target_temperature(id, target)?;
//!
//!     let thermostat = session.read_status(id)?;
//!     println!("{}: room temperature {}", thermostat.name(), thermostat.room_temperature().unwrap());
//!
//!     session.close();
//!     Ok(())
//! }
//! ```

pub mod protocol;

pub mod thermostat;

#[cfg_attr(docsrs, doc(cfg(feature = "tokio-rtu-sync")))]
#[cfg(feature = "tokio-rtu-sync")]
pub mod tokio_common;

#[cfg_attr(docsrs, doc(cfg(feature = "tokio-rtu-sync")))]
#[cfg(feature = "tokio-rtu-sync")]
pub mod tokio_sync;

#[cfg_attr(docsrs, doc(cfg(feature = "tokio-rtu-sync")))]
#[cfg(feature = "tokio-rtu-sync")]
pub mod session;
