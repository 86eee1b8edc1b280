//! Command definitions
//!
//! Represents commands sent to the controller's command shell.

use std::fmt;

/// Command verbs understood by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    Query,
    On,
    Off,
    Cool,
    Heat,
    Auto,
    Dry,
    Fan,
    Temp,
    FanSpeed,
    State,
}

impl CommandType {
    /// The verb as written on the wire
    pub fn verb(&self) -> &'static str {
        match self {
            CommandType::Query => "query",
            CommandType::On => "on",
            CommandType::Off => "off",
            CommandType::Cool => "cool",
            CommandType::Heat => "heat",
            CommandType::Auto => "auto",
            CommandType::Dry => "dry",
            CommandType::Fan => "fan",
            CommandType::Temp => "temp",
            CommandType::FanSpeed => "fspeed",
            CommandType::State => "ls2",
        }
    }

    pub fn from_verb(verb: &str) -> Option<Self> {
        Some(match verb {
            "query" => CommandType::Query,
            "on" => CommandType::On,
            "off" => CommandType::Off,
            "cool" => CommandType::Cool,
            "heat" => CommandType::Heat,
            "auto" => CommandType::Auto,
            "dry" => CommandType::Dry,
            "fan" => CommandType::Fan,
            "temp" => CommandType::Temp,
            "fspeed" => CommandType::FanSpeed,
            "ls2" => CommandType::State,
            _ => return None,
        })
    }
}

/// Single-value fields readable with `query <unit> <field>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryField {
    /// `o`: 1 when the unit is on, 0 when off
    Power,
    /// `m`: numeric operating mode code
    Mode,
    /// `h`: setpoint temperature
    Setpoint,
    /// `f`: fan speed level 0-4
    FanSpeed,
}

impl QueryField {
    pub fn code(&self) -> char {
        match self {
            QueryField::Power => 'o',
            QueryField::Mode => 'm',
            QueryField::Setpoint => 'h',
            QueryField::FanSpeed => 'f',
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "o" => Some(QueryField::Power),
            "m" => Some(QueryField::Mode),
            "h" => Some(QueryField::Setpoint),
            "f" => Some(QueryField::FanSpeed),
            _ => None,
        }
    }
}

/// Fan speed letter codes accepted by `fspeed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanCode {
    Low,
    Medium,
    High,
    Auto,
    Top,
}

impl FanCode {
    pub fn letter(&self) -> char {
        match self {
            FanCode::Low => 'l',
            FanCode::Medium => 'm',
            FanCode::High => 'h',
            FanCode::Auto => 'a',
            FanCode::Top => 't',
        }
    }

    pub fn from_letter(letter: &str) -> Option<Self> {
        match letter {
            "l" => Some(FanCode::Low),
            "m" => Some(FanCode::Medium),
            "h" => Some(FanCode::High),
            "a" => Some(FanCode::Auto),
            "t" => Some(FanCode::Top),
            _ => None,
        }
    }

    /// Device level reported back by `query <unit> f`
    pub fn level(&self) -> u8 {
        match self {
            FanCode::Low => 0,
            FanCode::Medium => 1,
            FanCode::High => 2,
            FanCode::Auto => 3,
            FanCode::Top => 4,
        }
    }
}

impl fmt::Display for FanCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A command addressed to one unit
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Read a single value
    Query { unit: String, field: QueryField },

    /// Switch the unit on
    On { unit: String },

    /// Switch the unit off
    Off { unit: String },

    /// Select cooling mode
    Cool { unit: String },

    /// Select heating mode
    Heat { unit: String },

    /// Select automatic mode
    Auto { unit: String },

    /// Select dry mode
    Dry { unit: String },

    /// Select fan-only mode
    Fan { unit: String },

    /// Set the setpoint temperature
    Temp { unit: String, value: f64 },

    /// Set the fan speed
    FanSpeed { unit: String, code: FanCode },

    /// Read the full state line
    State { unit: String },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Query { .. } => CommandType::Query,
            Command::On { .. } => CommandType::On,
            Command::Off { .. } => CommandType::Off,
            Command::Cool { .. } => CommandType::Cool,
            Command::Heat { .. } => CommandType::Heat,
            Command::Auto { .. } => CommandType::Auto,
            Command::Dry { .. } => CommandType::Dry,
            Command::Fan { .. } => CommandType::Fan,
            Command::Temp { .. } => CommandType::Temp,
            Command::FanSpeed { .. } => CommandType::FanSpeed,
            Command::State { .. } => CommandType::State,
        }
    }

    /// The unit the command is addressed to
    pub fn unit(&self) -> &str {
        match self {
            Command::Query { unit, .. }
            | Command::On { unit }
            | Command::Off { unit }
            | Command::Cool { unit }
            | Command::Heat { unit }
            | Command::Auto { unit }
            | Command::Dry { unit }
            | Command::Fan { unit }
            | Command::Temp { unit, .. }
            | Command::FanSpeed { unit, .. }
            | Command::State { unit } => unit,
        }
    }

    /// Whether the controller answers with a bare `OK` instead of data
    pub fn expects_ack(&self) -> bool {
        !matches!(self, Command::Query { .. } | Command::State { .. })
    }
}
