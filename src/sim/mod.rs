//! Controller Simulator
//!
//! An in-memory bank of AC units that answers the controller line protocol,
//! and a TCP server exposing it like a real controller's command shell.
//!
//! ## Architecture
//! - [`UnitBank`] holds unit state and turns one command line into a response
//! - [`SimServer`] accepts TCP sessions, one thread per connection
//!
//! `UnitBank::respond` also plugs straight into a
//! [`MemoryTransport`](crate::transport::MemoryTransport) responder.

mod connection;
mod server;

pub use connection::Connection;
pub use server::{SimHandle, SimServer};

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::AcError;
use crate::protocol::{
    decode_command, encode_state, format_temperature, Command, DeviceStateRecord, FanMode, OnOff,
    OperatingMode, QueryField,
};
use crate::translate::TemperatureUnit;
use crate::transport::Reply;

/// Lowest setpoint the simulated units accept
pub const MIN_SETPOINT: f64 = 10.0;

/// Highest setpoint the simulated units accept
pub const MAX_SETPOINT: f64 = 35.0;

/// State of one simulated unit
#[derive(Debug, Clone, PartialEq)]
pub struct SimUnit {
    pub on: bool,
    pub mode: OperatingMode,
    pub setpoint: f64,
    pub room: f64,
    pub fan: FanMode,
}

impl Default for SimUnit {
    fn default() -> Self {
        Self {
            on: false,
            mode: OperatingMode::Cool,
            setpoint: 24.0,
            room: 26.0,
            fan: FanMode::Low,
        }
    }
}

/// Simulated controller state
pub struct UnitBank {
    units: Mutex<BTreeMap<String, SimUnit>>,

    temperature_unit: Option<TemperatureUnit>,

    /// While set, commands are swallowed without a response
    muted: AtomicBool,
}

impl UnitBank {
    /// Bank with default units for each id, temperatures suffixed with `unit`
    pub fn new<I, S>(ids: I, unit: Option<TemperatureUnit>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let units = ids
            .into_iter()
            .map(|id| (id.into(), SimUnit::default()))
            .collect();

        Self {
            units: Mutex::new(units),
            temperature_unit: unit,
            muted: AtomicBool::new(false),
        }
    }

    /// Replace one unit's state
    pub fn set_unit(&self, id: &str, unit: SimUnit) {
        self.units.lock().insert(id.to_string(), unit);
    }

    pub fn unit(&self, id: &str) -> Option<SimUnit> {
        self.units.lock().get(id).cloned()
    }

    /// Stop (or resume) answering commands
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    /// Response for one command line, or `None` while muted
    ///
    /// The response holds every line before the prompt.
    pub fn respond(&self, line: &str) -> Option<String> {
        if self.is_muted() {
            tracing::trace!("sim muted, swallowing {:?}", line);
            return None;
        }

        let command = match decode_command(line) {
            Ok(c) => c,
            Err(AcError::Parse(msg)) if msg.starts_with("unknown command") => {
                return Some("Unknown command".to_string());
            }
            Err(e) => return Some(format!("ERROR: {}", e)),
        };

        let mut units = self.units.lock();
        let unit = match units.get_mut(command.unit()) {
            Some(u) => u,
            None => return Some(format!("ERROR: no such UID {}", command.unit())),
        };

        let response = match &command {
            Command::Query { field, .. } => {
                let value = match field {
                    QueryField::Power => u8::from(unit.on).to_string(),
                    QueryField::Mode => unit.mode.code().to_string(),
                    QueryField::Setpoint => format_temperature(unit.setpoint),
                    QueryField::FanSpeed => unit.fan.level().to_string(),
                };
                format!("{}\nOK", value)
            }
            Command::On { .. } => set(|| unit.on = true),
            Command::Off { .. } => set(|| unit.on = false),
            Command::Cool { .. } => set(|| unit.mode = OperatingMode::Cool),
            Command::Heat { .. } => set(|| unit.mode = OperatingMode::Heat),
            Command::Auto { .. } => set(|| unit.mode = OperatingMode::Auto),
            Command::Dry { .. } => set(|| unit.mode = OperatingMode::Dry),
            Command::Fan { .. } => set(|| unit.mode = OperatingMode::Fan),
            Command::Temp { value, .. } => {
                if *value < MIN_SETPOINT || *value > MAX_SETPOINT {
                    format!("ERROR: temperature {} out of range", format_temperature(*value))
                } else {
                    set(|| unit.setpoint = *value)
                }
            }
            Command::FanSpeed { code, .. } => match FanMode::from_level(code.level()) {
                Some(fan) => set(|| unit.fan = fan),
                None => format!("ERROR: bad fan code {}", code),
            },
            Command::State { unit: id } => {
                let record = DeviceStateRecord {
                    unit_id: id.rsplit('.').next().unwrap_or(id).to_string(),
                    on_off: if unit.on { OnOff::On } else { OnOff::Off },
                    setpoint_temperature: unit.setpoint,
                    room_temperature: unit.room,
                    fan_mode: unit.fan,
                    operating_mode: unit.mode,
                    temperature_unit: self.temperature_unit,
                };
                format!("{}\nOK", encode_state(id, &record))
            }
        };

        Some(response)
    }

    /// Responder for a [`MemoryTransport`](crate::transport::MemoryTransport)
    pub fn reply(&self, line: &str) -> Reply {
        match self.respond(line) {
            Some(text) => Reply::Lines(text),
            None => Reply::Silent,
        }
    }
}

fn set<F: FnOnce()>(apply: F) -> String {
    apply();
    "OK".to_string()
}
