//! Device Facade
//!
//! Typed per-unit API over the dispatcher. Every call formats a command,
//! queues it, waits for the matched response and decodes it. Nothing is
//! cached: a failed read is an error, never a stale value.

use crate::config::{Config, UnitConfig};
use crate::dispatcher::{DispatchHandle, Dispatcher};
use crate::error::Result;
use crate::protocol::{
    decode_ack, decode_scalar, decode_state, encode_command, Command, DeviceStateRecord, FanCode,
    QueryField,
};
use crate::transport::{ConnectionState, Transport};
use crate::translate::{
    check_setpoint, fan_level_to_percent, percent_to_fan_code, power_from_value, running_state,
    target_mode_from_code, RunningState, TargetMode, TemperatureUnit,
};

/// One controller endpoint and the units behind it
pub struct Controller {
    config: Config,
    dispatcher: Dispatcher,
}

impl Controller {
    /// Start a dispatcher over TCP for the configured controller
    pub fn connect(config: Config) -> Result<Self> {
        let dispatcher = Dispatcher::connect(&config)?;
        Ok(Self { config, dispatcher })
    }

    /// Start a dispatcher over a caller-supplied transport
    pub fn with_transport<T>(config: Config, transport: T) -> Result<Self>
    where
        T: Transport + 'static,
    {
        config.validate()?;
        let dispatcher = Dispatcher::start(transport, config.command_timeout())?;
        Ok(Self { config, dispatcher })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.dispatcher.connection_state()
    }

    /// Handle for a configured unit
    pub fn device(&self, unique_id: &str) -> Option<Device> {
        self.config
            .units
            .iter()
            .find(|u| u.unique_id == unique_id)
            .map(|u| self.bind(u.clone()))
    }

    /// Handles for every configured unit
    pub fn devices(&self) -> Vec<Device> {
        self.config.units.iter().map(|u| self.bind(u.clone())).collect()
    }

    /// Handle for a unit that is not in the config
    pub fn unit(&self, unique_id: &str) -> Device {
        self.bind(UnitConfig::new(unique_id, unique_id))
    }

    fn bind(&self, unit: UnitConfig) -> Device {
        Device::new(unit, self.dispatcher.handle(), self.config.default_temperature_unit)
    }

    pub fn shutdown(self) {
        self.dispatcher.shutdown();
    }
}

/// Typed access to one AC unit
#[derive(Clone)]
pub struct Device {
    unit: UnitConfig,
    dispatch: DispatchHandle,
    default_temperature_unit: TemperatureUnit,
}

impl Device {
    pub fn new(
        unit: UnitConfig,
        dispatch: DispatchHandle,
        default_temperature_unit: TemperatureUnit,
    ) -> Self {
        Self {
            unit,
            dispatch,
            default_temperature_unit,
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.unit.unique_id
    }

    pub fn display_name(&self) -> &str {
        &self.unit.display_name
    }

    // -------------------------------------------------------------------------
    // Power
    // -------------------------------------------------------------------------

    pub fn power_state(&self) -> Result<bool> {
        let value = self.query(QueryField::Power)?;
        let on = power_from_value(value);
        tracing::debug!("{} power is {}", self.display_name(), if on { "on" } else { "off" });
        Ok(on)
    }

    pub fn set_power_state(&self, on: bool) -> Result<()> {
        tracing::debug!("{} set power: {}", self.display_name(), on);
        let unit = self.unit_id();
        self.set(if on { Command::On { unit } } else { Command::Off { unit } })
    }

    // -------------------------------------------------------------------------
    // Mode
    // -------------------------------------------------------------------------

    pub fn mode_state(&self) -> Result<TargetMode> {
        let code = self.query(QueryField::Mode)?;
        let mode = target_mode_from_code(code);
        tracing::debug!("{} target mode is {:?}", self.display_name(), mode);
        Ok(mode)
    }

    pub fn set_cool_state(&self) -> Result<()> {
        tracing::debug!("{} set mode: cool", self.display_name());
        self.set(Command::Cool { unit: self.unit_id() })
    }

    pub fn set_heat_state(&self) -> Result<()> {
        tracing::debug!("{} set mode: heat", self.display_name());
        self.set(Command::Heat { unit: self.unit_id() })
    }

    /// Switch mode, then read back the setpoint the unit uses in that mode
    ///
    /// Two separate commands: another caller's command may run in between.
    pub fn set_mode(&self, mode: TargetMode) -> Result<f64> {
        match mode {
            TargetMode::Cool => self.set_cool_state()?,
            TargetMode::Heat => self.set_heat_state()?,
        }
        let setpoint = self.target_temperature()?;
        tracing::debug!("{} {:?} threshold is {}", self.display_name(), mode, setpoint);
        Ok(setpoint)
    }

    // -------------------------------------------------------------------------
    // Temperature
    // -------------------------------------------------------------------------

    pub fn target_temperature(&self) -> Result<f64> {
        let value = self.query(QueryField::Setpoint)?;
        tracing::debug!("{} setpoint is {}", self.display_name(), value);
        Ok(value)
    }

    pub fn set_target_temperature(&self, value: f64) -> Result<()> {
        let value = check_setpoint(value)?;
        tracing::debug!("{} set setpoint: {}", self.display_name(), value);
        self.set(Command::Temp {
            unit: self.unit_id(),
            value,
        })
    }

    pub fn room_temperature(&self) -> Result<f64> {
        Ok(self.device_state()?.room_temperature)
    }

    /// Scale of the unit's temperatures
    ///
    /// Read from the state line's suffix; the configured default applies when
    /// the controller prints bare numbers.
    pub fn temperature_unit(&self) -> Result<TemperatureUnit> {
        Ok(self
            .device_state()?
            .temperature_unit
            .unwrap_or(self.default_temperature_unit))
    }

    // -------------------------------------------------------------------------
    // Fan
    // -------------------------------------------------------------------------

    /// Fan speed as a percentage
    pub fn fan_speed(&self) -> Result<f64> {
        let level = self.query(QueryField::FanSpeed)?;
        let percent = fan_level_to_percent(level)?;
        tracing::debug!("{} fan level {} is {}%", self.display_name(), level, percent);
        Ok(percent)
    }

    /// Set the fan speed from a percentage; returns the code sent
    pub fn set_fan_speed(&self, percent: f64) -> Result<FanCode> {
        let code = percent_to_fan_code(percent)?;
        tracing::debug!("{} set fan speed: {}% -> {}", self.display_name(), percent, code);
        self.set(Command::FanSpeed {
            unit: self.unit_id(),
            code,
        })?;
        Ok(code)
    }

    // -------------------------------------------------------------------------
    // Full State
    // -------------------------------------------------------------------------

    pub fn device_state(&self) -> Result<DeviceStateRecord> {
        let raw = self.run(Command::State { unit: self.unit_id() })?;
        decode_state(&raw)
    }

    /// Running state derived from one state line
    pub fn current_state(&self) -> Result<RunningState> {
        let state = running_state(&self.device_state()?);
        tracing::debug!("{} current state is {:?}", self.display_name(), state);
        Ok(state)
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn unit_id(&self) -> String {
        self.unit.unique_id.clone()
    }

    fn run(&self, command: Command) -> Result<String> {
        self.dispatch.execute(encode_command(&command))
    }

    fn query(&self, field: QueryField) -> Result<f64> {
        let raw = self.run(Command::Query {
            unit: self.unit_id(),
            field,
        })?;
        decode_scalar(&raw)
    }

    fn set(&self, command: Command) -> Result<()> {
        let raw = self.run(command)?;
        decode_ack(&raw)
    }
}
