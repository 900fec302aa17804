//! Heatmiser Modbus thermostat CLI
//!
//! A command-line interface (CLI) application for controlling Heatmiser
//! electric thermostats (PRT-E and compatible models) over an RS485 serial
//! bus using Modbus RTU.
//!
//! This tool allows users to:
//! - Read the live thermostat status (relay, room / floor / target
//!   temperatures, power state, operation mode).
//! - Turn the thermostat on and off, set the target temperature, and hold a
//!   temporary target for a bounded period.
//! - Configure frost protection, the floor limit, the switching differential,
//!   the output delay, the up/down key limit and the sensor selection mode.
//! - Configure the programme mode, the programme periods, the temperature
//!   units, the keypad lock and automatic daylight-saving adjustment.
//! - Sync the system clock to the thermostat.
//! - Perform a factory reset of the device.
//! - Run in a continuous poll mode printing the status to the console.
//!
//! The CLI leverages the `heatmiser_modbus_lib` crate for protocol
//! definitions and session management.

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::Confirm;
use flexi_logger::{Logger, LoggerHandle};
use heatmiser_modbus_lib::{protocol as proto, session::Session, thermostat::Thermostat};
use log::*;
use std::panic;

mod commandline;

fn logging_init(loglevel: LevelFilter) -> LoggerHandle {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .expect("Cannot init logging")
        .start()
        .expect("Cannot start logging");

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown_file>", 0, 0)); // Provide defaults

        let cause_str = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            *s
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.as_str()
        } else {
            "<unknown_panic_cause>"
        };

        error!(
            target: "panic",
            "Thread '{}' panicked at '{}': {}:{} - Cause: {}",
            std::thread::current().name().unwrap_or("<unnamed>"),
            filename,
            line,
            column,
            cause_str
        );
    }));
    log_handle
}

/// Formats one sensor reading with the thermostat's unit symbol.
fn format_reading(reading: Option<proto::SensorReading>, units: proto::TemperatureUnits) -> String {
    match reading {
        Some(proto::SensorReading::Available(t)) => format!("{t} {units}"),
        Some(proto::SensorReading::Unavailable) => "n/a".to_string(),
        None => "unknown".to_string(),
    }
}

fn print_status(thermostat: &Thermostat, units: proto::TemperatureUnits) {
    println!("{}:", thermostat.name());
    if let Some(version) = thermostat.firmware_version() {
        println!("  Firmware version:   {version}");
    }
    println!(
        "  Power:              {}",
        match thermostat.device_on() {
            Some(true) => "on",
            Some(false) => "off",
            None => "unknown",
        }
    );
    println!(
        "  Heating:            {}",
        match thermostat.relay_on() {
            Some(true) => "on",
            Some(false) => "off",
            None => "unknown",
        }
    );
    println!(
        "  Room temperature:   {}",
        format_reading(thermostat.room_temperature(), units)
    );
    println!(
        "  Floor temperature:  {}",
        format_reading(thermostat.floor_temperature(), units)
    );
    println!(
        "  Target temperature: {}",
        format_reading(thermostat.target_temperature(), units)
    );
    match thermostat.operation_mode() {
        Some(mode) => println!("  Operation mode:     {mode}"),
        None => println!("  Operation mode:     unknown"),
    }
}

fn read_and_print_status(session: &Session, id: proto::UnitId) -> Result<()> {
    let units = session
        .temperature_units(id)
        .with_context(|| "Cannot read temperature units")?;
    let thermostat = session
        .read_status(id)
        .with_context(|| "Cannot read thermostat status")?;
    print_status(&thermostat, units);
    Ok(())
}

/// Handles the factory reset command.
///
/// This function prompts the user for confirmation, verifies the connection
/// to the device, and then sends the factory reset command.
fn handle_factory_reset(session: &Session, id: proto::UnitId) -> Result<()> {
    info!("Executing: Factory Reset");
    println!(
        "WARNING: This will reset thermostat {id} to its factory default settings.\n\
         All programme schedules and configuration will be lost."
    );
    println!(
        "After this operation the thermostat DISABLES ITS MODBUS INTERFACE.\n\
         It has to be re-enabled from the thermostat's front panel before this\n\
         tool can communicate with it again."
    );

    if !Confirm::new()
        .with_prompt("Are you sure you want to proceed with the factory reset?")
        .default(false)
        .show_default(true)
        .interact()?
    {
        info!("Factory reset aborted by user.");
        return Ok(());
    }

    // A quick read to confirm connectivity before the irreversible write.
    session
        .read_status(id)
        .with_context(|| "Cannot reach the thermostat, aborting factory reset")?;

    session
        .factory_reset(id)
        .with_context(|| "Failed to send factory reset command")?;
    println!("Factory reset command sent successfully.");
    println!(
        "IMPORTANT: Re-enable the Modbus interface from the thermostat's front panel \
         before using this tool again."
    );
    Ok(())
}

fn main() -> Result<()> {
    let args = commandline::CliArgs::parse();

    // 1. Initialize logging as early as possible
    let _log_handle = logging_init(args.verbose.log_level_filter());
    info!(
        "Heatmiser CLI started. Log level: {}",
        args.verbose.log_level_filter()
    );

    // 2. Open the session
    let id = args.id;
    let session = Session::new(&args.device, args.status_layout);
    session.set_timeout(args.timeout);
    info!(
        "Attempting to connect via RTU to device {} (ID: {id})...",
        args.device
    );
    session
        .connect()
        .with_context(|| format!("Cannot open serial port {}", args.device))?;
    session.add_thermostat(id, None);

    // 3. Execute the command
    match &args.command {
        commandline::CliCommands::GetStatus => {
            info!("Executing: Get Status");
            read_and_print_status(&session, id)?;
        }
        commandline::CliCommands::TurnOn => {
            info!("Executing: Turn On");
            session
                .turn_on(id)
                .with_context(|| "Failed to turn the thermostat on")?;
            println!("Thermostat turned on.");
        }
        commandline::CliCommands::TurnOff => {
            info!("Executing: Turn Off");
            session
                .turn_off(id)
                .with_context(|| "Failed to turn the thermostat off")?;
            println!("Thermostat turned off.");
        }
        commandline::CliCommands::Hold {
            temperature,
            duration,
        } => {
            info!("Executing: Hold {temperature} for {duration}");
            session
                .hold_mode(id, *temperature, *duration)
                .with_context(|| format!("Failed to hold {temperature} for {duration}"))?;
            println!("Holding target temperature {temperature} for {duration}.");
        }
        commandline::CliCommands::SetTemperature { temperature } => {
            info!("Executing: Set Target Temperature to {temperature}");
            session
                .set_target_temperature(id, *temperature)
                .with_context(|| format!("Failed to set target temperature to {temperature}"))?;
            println!("Target temperature set to {temperature} successfully.");
        }
        commandline::CliCommands::SetFloorLimit { temperature } => {
            info!("Executing: Set Floor Limit to {temperature}");
            session
                .set_floor_limit_temperature(id, *temperature)
                .with_context(|| format!("Failed to set floor limit to {temperature}"))?;
            println!("Floor temperature limit set to {temperature} successfully.");
        }
        commandline::CliCommands::SetFrostTemperature { temperature } => {
            info!("Executing: Set Frost Protection Temperature to {temperature}");
            session
                .set_frost_protect_temperature(id, *temperature)
                .with_context(|| {
                    format!("Failed to set frost protection temperature to {temperature}")
                })?;
            println!("Frost protection temperature set to {temperature} successfully.");
        }
        commandline::CliCommands::SetSwitchingDifferential { temperature } => {
            // The parser restricts the choices, so this cannot fail.
            let temperature = temperature
                .parse::<f32>()
                .ok()
                .and_then(|v| proto::Temperature::try_from(v).ok())
                .context("Invalid switching differential")?;
            info!("Executing: Set Switching Differential to {temperature}");
            session
                .set_switching_differential(id, temperature)
                .with_context(|| format!("Failed to set switching differential to {temperature}"))?;
            println!("Switching differential set to {temperature} successfully.");
        }
        commandline::CliCommands::SetOutputDelay { minutes } => {
            info!("Executing: Set Output Delay to {minutes} minutes");
            session
                .set_output_delay(id, *minutes)
                .with_context(|| format!("Failed to set output delay to {minutes} minutes"))?;
            println!("Output delay set to {minutes} minutes successfully.");
        }
        commandline::CliCommands::SetUpDownLimit { limit } => {
            info!("Executing: Set Up/Down Key Limit to {limit}");
            session
                .set_up_down_limit(id, *limit)
                .with_context(|| format!("Failed to set up/down key limit to {limit}"))?;
            println!("Up/down key limit set to {limit} successfully.");
        }
        commandline::CliCommands::SetSensors { mode } => {
            info!("Executing: Set Sensor Selection to {mode}");
            session
                .set_sensor_selection(id, *mode)
                .with_context(|| format!("Failed to set sensor selection to {mode}"))?;
            println!("Sensor selection set to {mode} successfully.");
        }
        commandline::CliCommands::SetProgrammePeriods { periods } => {
            info!("Executing: Set Programme Periods to {periods}");
            session
                .set_programme_periods(id, *periods)
                .with_context(|| format!("Failed to set programme periods to {periods}"))?;
            println!("Programme periods set to {periods} per day successfully.");
        }
        commandline::CliCommands::SetProgrammeMode { mode } => {
            info!("Executing: Set Programme Mode to {mode}");
            session
                .set_programme_mode(id, *mode)
                .with_context(|| format!("Failed to set programme mode to {mode}"))?;
            println!("Programme mode set to {mode} successfully.");
        }
        commandline::CliCommands::SetUnits { units } => {
            info!("Executing: Set Temperature Units to {units}");
            session
                .set_temperature_units(id, *units)
                .with_context(|| format!("Failed to set temperature units to {units}"))?;
            println!("Temperature units set to {units} successfully.");
        }
        commandline::CliCommands::SetTime => {
            let now = proto::DeviceTime::now();
            info!("Executing: Set Time to {now}");
            session
                .set_time(id, &now)
                .with_context(|| format!("Failed to set the thermostat clock to {now}"))?;
            println!("Thermostat clock set to {now} successfully.");
        }
        commandline::CliCommands::SetAutoDst { enabled } => {
            let auto_dst = if enabled == "on" {
                proto::AutoDst::Enabled
            } else {
                proto::AutoDst::Disabled
            };
            info!("Executing: Set Auto DST to {enabled}");
            session
                .set_auto_dst(id, auto_dst)
                .with_context(|| format!("Failed to turn automatic DST adjustment {enabled}"))?;
            println!("Automatic DST adjustment turned {enabled} successfully.");
        }
        commandline::CliCommands::SetKeylock { pin } => {
            let keylock = proto::Keylock::from(*pin);
            info!("Executing: Set Keylock to {keylock}");
            session
                .set_keylock(id, keylock)
                .with_context(|| "Failed to set the keypad lock")?;
            if keylock.is_disabled() {
                println!("Keypad lock disabled successfully.");
            } else {
                println!("Keypad lock PIN set to {keylock} successfully.");
            }
        }
        commandline::CliCommands::ReadFirmware => {
            info!("Executing: Read Firmware Version");
            let version = session
                .read_firmware_version(id)
                .with_context(|| "Cannot read firmware version")?;
            println!("Firmware version: {version}");
        }
        commandline::CliCommands::FactoryReset => {
            handle_factory_reset(&session, id)?;
        }
        commandline::CliCommands::Poll { poll_interval } => {
            info!("Starting poll mode: interval={poll_interval:?}");
            loop {
                debug!("Poll: reading thermostat status...");
                read_and_print_status(&session, id)?;
                std::thread::sleep(*poll_interval);
            }
        }
    }

    session.close();
    Ok(())
}
