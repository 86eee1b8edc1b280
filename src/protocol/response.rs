//! Response definitions
//!
//! Typed values decoded from controller responses.

use std::fmt;
use std::str::FromStr;

use crate::error::AcError;
use crate::translate::TemperatureUnit;

/// On/off token of a state line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnOff {
    On,
    Off,
}

impl FromStr for OnOff {
    type Err = AcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ON" => Ok(OnOff::On),
            "OFF" => Ok(OnOff::Off),
            _ => Err(AcError::Parse(format!("invalid on/off token: {:?}", s))),
        }
    }
}

impl fmt::Display for OnOff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnOff::On => write!(f, "ON"),
            OnOff::Off => write!(f, "OFF"),
        }
    }
}

/// Fan mode reported by the unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanMode {
    Low,
    Medium,
    High,
    Auto,
    Top,
}

impl FanMode {
    /// Device fan level, 0-4
    pub fn level(&self) -> u8 {
        match self {
            FanMode::Low => 0,
            FanMode::Medium => 1,
            FanMode::High => 2,
            FanMode::Auto => 3,
            FanMode::Top => 4,
        }
    }

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(FanMode::Low),
            1 => Some(FanMode::Medium),
            2 => Some(FanMode::High),
            3 => Some(FanMode::Auto),
            4 => Some(FanMode::Top),
            _ => None,
        }
    }
}

impl FromStr for FanMode {
    type Err = AcError;

    /// Accepts both the numeric level and the controller's names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(level) = s.parse::<u8>() {
            return FanMode::from_level(level)
                .ok_or_else(|| AcError::Parse(format!("fan level out of range: {}", level)));
        }
        match s.to_lowercase().as_str() {
            "vlow" | "low" => Ok(FanMode::Low),
            "med" | "medium" => Ok(FanMode::Medium),
            "high" => Ok(FanMode::High),
            "auto" => Ok(FanMode::Auto),
            "top" => Ok(FanMode::Top),
            _ => Err(AcError::Parse(format!("invalid fan mode token: {:?}", s))),
        }
    }
}

impl fmt::Display for FanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FanMode::Low => "Low",
            FanMode::Medium => "Med",
            FanMode::High => "High",
            FanMode::Auto => "Auto",
            FanMode::Top => "Top",
        };
        write!(f, "{}", name)
    }
}

/// Operating mode reported by the unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    Cool,
    Heat,
    Auto,
    Dry,
    HeatAux,
    Fan,
}

impl OperatingMode {
    /// Numeric code returned by `query <unit> m`
    pub fn code(&self) -> u8 {
        match self {
            OperatingMode::Cool => 0,
            OperatingMode::Heat => 1,
            OperatingMode::Auto => 2,
            OperatingMode::Dry => 3,
            OperatingMode::HeatAux => 4,
            OperatingMode::Fan => 5,
        }
    }
}

impl FromStr for OperatingMode {
    type Err = AcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cool" => Ok(OperatingMode::Cool),
            "heat" => Ok(OperatingMode::Heat),
            "auto" => Ok(OperatingMode::Auto),
            "dry" => Ok(OperatingMode::Dry),
            "haux" => Ok(OperatingMode::HeatAux),
            "fan" => Ok(OperatingMode::Fan),
            _ => Err(AcError::Parse(format!("invalid operating mode token: {:?}", s))),
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperatingMode::Cool => "Cool",
            OperatingMode::Heat => "Heat",
            OperatingMode::Auto => "Auto",
            OperatingMode::Dry => "Dry",
            OperatingMode::HeatAux => "Haux",
            OperatingMode::Fan => "Fan",
        };
        write!(f, "{}", name)
    }
}

/// Decoded `ls2` state line
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStateRecord {
    /// Unit id without the line prefix (`L1.100` → `100`)
    pub unit_id: String,

    pub on_off: OnOff,

    pub setpoint_temperature: f64,

    pub room_temperature: f64,

    pub fan_mode: FanMode,

    pub operating_mode: OperatingMode,

    /// Unit suffix of the temperature tokens, if the controller printed one
    pub temperature_unit: Option<TemperatureUnit>,
}

impl DeviceStateRecord {
    pub fn is_on(&self) -> bool {
        self.on_off == OnOff::On
    }
}
