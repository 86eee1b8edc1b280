//! State translation tables
//!
//! Maps the controller's numeric and textual vocabulary onto the semantic
//! values callers work with: booleans, fan percentages, target modes, running
//! state and temperature units.

use std::fmt;

use crate::error::{AcError, Result};
use crate::protocol::{DeviceStateRecord, FanCode, OperatingMode};

/// Caller-facing percentage for device fan levels 0-4
///
/// Level 3 is the controller's auto speed; it reports no real speed, so it
/// shares the percentage of level 2.
pub const FAN_LEVEL_PERCENT: [f64; 5] = [25.0, 50.0, 75.0, 75.0, 100.0];

/// Percentage that selects auto fan speed when set
pub const FAN_AUTO_PERCENT: f64 = 75.0;

/// Setpoints outside this range are refused before anything is sent
///
/// Wide enough for either scale; the controller enforces the unit's own
/// limits.
pub const SETPOINT_RANGE: (f64, f64) = (-40.0, 120.0);

// =============================================================================
// Semantic Types
// =============================================================================

/// Target mode as exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetMode {
    Cool,
    Heat,
}

/// What the unit is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningState {
    Inactive,
    Heating,
    Cooling,
}

/// Temperature scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn from_suffix(c: char) -> Option<Self> {
        match c {
            'C' | 'c' => Some(TemperatureUnit::Celsius),
            'F' | 'f' => Some(TemperatureUnit::Fahrenheit),
            _ => None,
        }
    }

    pub fn suffix(&self) -> char {
        match self {
            TemperatureUnit::Celsius => 'C',
            TemperatureUnit::Fahrenheit => 'F',
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemperatureUnit::Celsius => write!(f, "Celsius"),
            TemperatureUnit::Fahrenheit => write!(f, "Fahrenheit"),
        }
    }
}

// =============================================================================
// Tables
// =============================================================================

/// Power flag from `query <id> o`
pub fn power_from_value(value: f64) -> bool {
    value > 0.0
}

/// Percentage for a device fan level
pub fn fan_level_to_percent(level: f64) -> Result<f64> {
    if level.fract() != 0.0 || level < 0.0 {
        return Err(AcError::Parse(format!("invalid fan level {}", level)));
    }
    FAN_LEVEL_PERCENT
        .get(level as usize)
        .copied()
        .ok_or_else(|| AcError::Parse(format!("fan level out of range: {}", level)))
}

/// Fan letter code for a caller percentage
///
/// Exactly 75 selects auto; the other bands are half-open as below.
pub fn percent_to_fan_code(value: f64) -> Result<FanCode> {
    if value.is_nan() || value > 100.0 {
        return Err(AcError::InvalidValue(format!(
            "fan speed must be at most 100, got {}",
            value
        )));
    }

    let code = if value <= 25.0 {
        FanCode::Low
    } else if value <= 50.0 {
        FanCode::Medium
    } else if value < FAN_AUTO_PERCENT {
        FanCode::High
    } else if value == FAN_AUTO_PERCENT {
        FanCode::Auto
    } else {
        FanCode::Top
    };

    Ok(code)
}

/// Check a caller setpoint before it is formatted for the wire
pub fn check_setpoint(value: f64) -> Result<f64> {
    let (min, max) = SETPOINT_RANGE;
    if !value.is_finite() || value < min || value > max {
        return Err(AcError::InvalidValue(format!(
            "temperature must be between {} and {}, got {}",
            min, max, value
        )));
    }
    Ok(value)
}

/// Target mode for a `query <id> m` code
///
/// Codes other than cool (0), dry (3) and heat (1) have no heater-cooler
/// equivalent and report as cool.
pub fn target_mode_from_code(code: f64) -> TargetMode {
    match code as i64 {
        1 => TargetMode::Heat,
        0 | 3 => TargetMode::Cool,
        other => {
            tracing::trace!("mode code {} has no target mode, reporting cool", other);
            TargetMode::Cool
        }
    }
}

/// Target mode for a state line's operating mode
pub fn target_mode_from_operating(mode: OperatingMode) -> TargetMode {
    target_mode_from_code(mode.code() as f64)
}

/// Running state of a decoded state line
pub fn running_state(record: &DeviceStateRecord) -> RunningState {
    if !record.is_on() {
        RunningState::Inactive
    } else if record.operating_mode == OperatingMode::Heat {
        RunningState::Heating
    } else {
        RunningState::Cooling
    }
}
