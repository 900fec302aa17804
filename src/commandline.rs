use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use heatmiser_modbus_lib::protocol as proto;
use std::time::Duration;

fn parse_unit_id(s: &str) -> Result<proto::UnitId, String> {
    let id = clap_num::maybe_hex::<u8>(s).map_err(|e| format!("Invalid unit ID format: {e}"))?;
    proto::UnitId::try_from(id).map_err(|e| e.to_string())
}

fn parse_temperature(s: &str) -> Result<proto::Temperature, String> {
    let value = s
        .parse::<f32>()
        .map_err(|e| format!("Invalid temperature value format: {e}"))?;
    proto::Temperature::try_from(value).map_err(|e| e.to_string())
}

/// Accepts a hold period as either `hours:minutes` (e.g. `1:30`) or a plain
/// number of minutes (e.g. `90`).
fn parse_hold_duration(s: &str) -> Result<proto::HoldDuration, String> {
    let minutes = match s.split_once(':') {
        Some((hours, mins)) => {
            let hours = hours
                .parse::<u16>()
                .map_err(|e| format!("Invalid hours in hold period: {e}"))?;
            let mins = mins
                .parse::<u16>()
                .map_err(|e| format!("Invalid minutes in hold period: {e}"))?;
            if mins >= 60 {
                return Err(format!("Minutes in hold period must be below 60: {mins}"));
            }
            hours
                .checked_mul(60)
                .and_then(|h| h.checked_add(mins))
                .ok_or_else(|| format!("Hold period is too long: {s}"))?
        }
        None => s
            .parse::<u16>()
            .map_err(|e| format!("Invalid hold period format: {e}"))?,
    };
    proto::HoldDuration::try_from(minutes).map_err(|e| e.to_string())
}

fn parse_programme_mode(s: &str) -> Result<proto::ProgrammeMode, String> {
    s.parse::<proto::ProgrammeMode>().map_err(|e| e.to_string())
}

fn parse_programme_periods(s: &str) -> Result<proto::ProgrammePeriods, String> {
    let periods = s
        .parse::<u8>()
        .map_err(|e| format!("Invalid programme period format: {e}"))?;
    proto::ProgrammePeriods::try_from(periods).map_err(|e| e.to_string())
}

fn parse_sensor_selection(s: &str) -> Result<proto::SensorSelection, String> {
    let mode = s
        .parse::<u8>()
        .map_err(|e| format!("Invalid sensor mode format: {e}"))?;
    proto::SensorSelection::try_from(mode).map_err(|e| e.to_string())
}

fn parse_temperature_units(s: &str) -> Result<proto::TemperatureUnits, String> {
    s.parse::<proto::TemperatureUnits>()
        .map_err(|e| e.to_string())
}

fn parse_output_delay(s: &str) -> Result<proto::OutputDelay, String> {
    let minutes = clap_num::maybe_hex::<u16>(s)
        .map_err(|e| format!("Invalid output delay format: {e}"))?;
    Ok(proto::OutputDelay::from(minutes))
}

fn parse_status_layout(s: &str) -> Result<proto::StatusLayout, String> {
    match s {
        "with-firmware" => Ok(proto::StatusLayout::WithFirmware),
        "without-firmware" => Ok(proto::StatusLayout::WithoutFirmware),
        _ => Err(format!(
            "Invalid status layout '{s}' (must be 'with-firmware' or 'without-firmware')"
        )),
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommands {
    /// Display thermostat status (including current temperatures).
    GetStatus,

    /// Turn on the thermostat.
    TurnOn,

    /// Turn off the thermostat.
    TurnOff,

    /// Set a different target temperature for a desired duration.
    /// After the period expires the thermostat reverts to its programmed
    /// schedule.
    #[clap(verbatim_doc_comment)]
    Hold {
        /// Temperature for the hold period.
        #[arg(value_parser = parse_temperature)]
        temperature: proto::Temperature,

        /// Length of the hold period, as "hours:minutes" (e.g. "1:30") or a
        /// plain number of minutes (e.g. "90"). Maximum 25 hours 35 minutes.
        #[arg(value_parser = parse_hold_duration, verbatim_doc_comment)]
        duration: proto::HoldDuration,
    },

    /// Set the target room temperature.
    SetTemperature {
        /// The target temperature, in the units the thermostat is configured
        /// to use. One decimal place of precision.
        #[arg(value_parser = parse_temperature, verbatim_doc_comment)]
        temperature: proto::Temperature,
    },

    /// Set the temperature limit for the floor sensor.
    SetFloorLimit {
        /// The floor temperature limit.
        #[arg(value_parser = parse_temperature)]
        temperature: proto::Temperature,
    },

    /// Set the frost protection temperature (typically 7-17 °C).
    SetFrostTemperature {
        /// The frost protection temperature.
        #[arg(value_parser = parse_temperature)]
        temperature: proto::Temperature,
    },

    /// Set the thermostat switching differential.
    SetSwitchingDifferential {
        /// The differential in degrees; the device supports only these steps.
        #[arg(value_parser = ["0.5", "1.0", "2.0", "3.0"])]
        temperature: String,
    },

    /// Set the time in minutes to delay output switching by.
    SetOutputDelay {
        /// Delay in minutes.
        #[arg(value_parser = parse_output_delay)]
        minutes: proto::OutputDelay,
    },

    /// Set a limit on the use of the up and down keys.
    SetUpDownLimit {
        /// The +/- temperature limit.
        #[arg(value_parser = parse_temperature)]
        limit: proto::Temperature,
    },

    /// Set the sensor selection mode.
    /// Sensor modes:
    ///   0    Built in sensor with optional remote air (default)
    ///   1    Remote air sensor only
    ///   2    Floor sensor only
    ///   3    Built in + floor sensor + optional remote air
    ///   4    Floor sensor and remote air only
    #[clap(verbatim_doc_comment)]
    SetSensors {
        /// The sensor selection mode number (0-4).
        #[arg(value_parser = parse_sensor_selection)]
        mode: proto::SensorSelection,
    },

    /// Set the number of programme periods per day.
    SetProgrammePeriods {
        /// The number of periods, 4 or 6.
        #[arg(value_parser = parse_programme_periods)]
        periods: proto::ProgrammePeriods,
    },

    /// Set the type of programme / schedule mode.
    /// Programme modes:
    ///   0   5day_2day   One schedule for weekdays, another for weekends (default)
    ///   1   7day        Different schedule for each day of the week
    ///   2   24hour      Same schedule every day
    ///   3   none        Non-programmable - temperature control only
    #[clap(verbatim_doc_comment)]
    SetProgrammeMode {
        /// The programme mode number or name.
        #[arg(value_parser = parse_programme_mode)]
        mode: proto::ProgrammeMode,
    },

    /// Set the temperature units used by the thermostat.
    SetUnits {
        /// The temperature units, [C]elsius or [F]ahrenheit.
        #[arg(value_parser = parse_temperature_units)]
        units: proto::TemperatureUnits,
    },

    /// Sync the system clock to the thermostat.
    SetTime,

    /// Enable or disable automatic adjustment for Daylight Saving Time.
    SetAutoDst {
        #[arg(value_parser = ["on", "off"])]
        enabled: String,
    },

    /// Set a PIN to lock the keypad with.
    SetKeylock {
        /// A 4-digit PIN; omit to disable the keypad lock.
        pin: Option<u16>,
    },

    /// Read and display the thermostat firmware version.
    ReadFirmware,

    /// Restore the thermostat to its default factory settings.
    /// **Warning:** This is an irreversible operation, and the thermostat
    /// disables its Modbus interface after the reset; it has to be re-enabled
    /// from the front panel.
    #[clap(verbatim_doc_comment)]
    FactoryReset,

    /// Continuously poll the thermostat status and print it to stdout.
    Poll {
        /// Interval between status reads (e.g. "10s", "1m").
        #[arg(value_parser = humantime::parse_duration, short, long, default_value = "2sec")]
        poll_interval: Duration,
    },
}

const fn about_text() -> &'static str {
    "Tool for controlling Heatmiser Modbus thermostats over an RS485 serial bus."
}

#[derive(Parser, Debug)]
#[command(name="hmmb", author, version, about=about_text(), long_about = None, propagate_version = true)]
pub struct CliArgs {
    /// Configure verbosity of logging output.
    /// -v for info, -vv for debug, -vvv for trace. Default is off.
    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,

    /// The serial port device to connect to (e.g. /dev/ttyUSB0).
    #[arg(short, long, env = "HMMB_DEVICE")]
    pub device: String,

    /// The Communications ID of the thermostat to control (1-32).
    #[arg(short, long, env = "HMMB_ID", default_value_t = proto::UnitId::default(), value_parser = parse_unit_id)]
    pub id: proto::UnitId,

    /// The status-block register layout of the thermostat firmware.
    /// Newer firmware exposes its version as a leading word in the status
    /// block ("with-firmware"); older firmware does not ("without-firmware").
    #[arg(long, default_value = "without-firmware", value_parser = parse_status_layout, verbatim_doc_comment)]
    pub status_layout: proto::StatusLayout,

    /// Modbus I/O timeout for read/write operations.
    /// Examples: "1s", "500ms".
    #[arg(global = true, long, default_value = "500ms", value_parser = humantime::parse_duration, verbatim_doc_comment)]
    pub timeout: Duration,

    /// The command to run against the thermostat.
    #[command(subcommand)]
    pub command: CliCommands,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hold_duration_formats() {
        assert_eq!(parse_hold_duration("1:15").unwrap().as_minutes(), 75);
        assert_eq!(parse_hold_duration("0:00").unwrap().as_minutes(), 0);
        assert_eq!(parse_hold_duration("90").unwrap().as_minutes(), 90);
        assert!(parse_hold_duration("1:75").is_err());
        assert!(parse_hold_duration("1536").is_err());
        assert!(parse_hold_duration("abc").is_err());
    }

    #[test]
    fn unit_id_parsing() {
        assert_eq!(*parse_unit_id("1").unwrap(), 1);
        assert_eq!(*parse_unit_id("0x20").unwrap(), 32);
        assert!(parse_unit_id("0").is_err());
        assert!(parse_unit_id("33").is_err());
    }

    #[test]
    fn status_layout_parsing() {
        assert_eq!(
            parse_status_layout("with-firmware").unwrap(),
            proto::StatusLayout::WithFirmware
        );
        assert_eq!(
            parse_status_layout("without-firmware").unwrap(),
            proto::StatusLayout::WithoutFirmware
        );
        assert!(parse_status_layout("auto").is_err());
    }
}
