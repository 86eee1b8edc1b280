//! Protocol codec
//!
//! Formatting and parsing functions for the controller's line protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! <verb> <unit id> [argument]\n
//! ```
//!
//! ### Response Format
//! ```text
//! <first line>\r\n      <- the only line that carries meaning
//! [OK\r\n]              <- trailing status / echo lines, discarded
//! >                     <- shell prompt, consumed by the transport
//! ```
//!
//! ### State Line (`ls2`)
//! ```text
//! L1.100 ON  25C 23.5C High Cool OK - 0
//! │      │   │   │     │    │
//! │      │   │   │     │    └─ operating mode
//! │      │   │   │     └────── fan mode
//! │      │   │   └──────────── room temperature (first 4 chars)
//! │      │   └──────────────── setpoint (first 4 chars)
//! │      └──────────────────── on/off
//! └─────────────────────────── dotted unit id
//! ```

use super::{Command, CommandType, DeviceStateRecord, FanCode, FanMode, OnOff, OperatingMode, QueryField};
use crate::error::{AcError, Result};
use crate::translate::TemperatureUnit;

/// Terminator appended to every command line
pub const LINE_TERMINATOR: &str = "\n";

/// Minimum number of whitespace separated fields in a state line
pub const STATE_FIELD_COUNT: usize = 6;

/// Width of the fixed numeric slice taken from temperature fields
pub const TEMPERATURE_WIDTH: usize = 4;

/// Response prefixes the controller uses to refuse a command
const REJECTION_PREFIXES: [&str; 2] = ["ERROR", "Unknown command"];

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to its wire line, terminator included
pub fn encode_command(command: &Command) -> String {
    let verb = command.command_type().verb();
    let unit = command.unit();

    let line = match command {
        Command::Query { field, .. } => format!("{} {} {}", verb, unit, field.code()),
        Command::Temp { value, .. } => format!("{} {} {}", verb, unit, format_temperature(*value)),
        Command::FanSpeed { code, .. } => format!("{} {} {}", verb, unit, code.letter()),
        _ => format!("{} {}", verb, unit),
    };

    line + LINE_TERMINATOR
}

/// Decode a command line back into a Command
///
/// Used by the controller simulator. Surrounding whitespace and the line
/// terminator are ignored.
pub fn decode_command(line: &str) -> Result<Command> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let (verb, rest) = match parts.split_first() {
        Some((verb, rest)) => (*verb, rest),
        None => return Err(AcError::Parse("empty command line".to_string())),
    };

    let command_type = CommandType::from_verb(verb)
        .ok_or_else(|| AcError::Parse(format!("unknown command: {}", verb)))?;

    let unit = rest
        .first()
        .map(|u| u.to_string())
        .ok_or_else(|| AcError::Parse(format!("{}: missing unit id", verb)))?;

    let argument = rest.get(1).copied();
    let expected_args = match command_type {
        CommandType::Query | CommandType::Temp | CommandType::FanSpeed => 2,
        _ => 1,
    };
    if rest.len() != expected_args {
        return Err(AcError::Parse(format!(
            "{}: expected {} arguments, got {}",
            verb,
            expected_args,
            rest.len()
        )));
    }

    let command = match command_type {
        CommandType::Query => {
            let code = argument.unwrap_or_default();
            let field = QueryField::from_code(code)
                .ok_or_else(|| AcError::Parse(format!("query: unknown field {:?}", code)))?;
            Command::Query { unit, field }
        }
        CommandType::Temp => {
            let raw = argument.unwrap_or_default();
            let value = raw
                .parse::<f64>()
                .map_err(|_| AcError::Parse(format!("temp: invalid value {:?}", raw)))?;
            Command::Temp { unit, value }
        }
        CommandType::FanSpeed => {
            let raw = argument.unwrap_or_default();
            let code = FanCode::from_letter(raw)
                .ok_or_else(|| AcError::Parse(format!("fspeed: invalid code {:?}", raw)))?;
            Command::FanSpeed { unit, code }
        }
        CommandType::On => Command::On { unit },
        CommandType::Off => Command::Off { unit },
        CommandType::Cool => Command::Cool { unit },
        CommandType::Heat => Command::Heat { unit },
        CommandType::Auto => Command::Auto { unit },
        CommandType::Dry => Command::Dry { unit },
        CommandType::Fan => Command::Fan { unit },
        CommandType::State => Command::State { unit },
    };

    Ok(command)
}

/// Render a temperature the way the controller expects it (`22`, `22.5`)
pub fn format_temperature(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

// =============================================================================
// Response Decoding
// =============================================================================

/// First line of a raw response; later lines are echoes and status
pub fn first_line(raw: &str) -> &str {
    raw.lines().next().unwrap_or("").trim()
}

/// Fail with `Rejected` if the controller refused the command
pub fn check_rejection(line: &str) -> Result<()> {
    if REJECTION_PREFIXES.iter().any(|p| line.starts_with(p)) {
        return Err(AcError::Rejected(line.to_string()));
    }
    Ok(())
}

/// Decode a single numeric response
pub fn decode_scalar(raw: &str) -> Result<f64> {
    let line = first_line(raw);
    check_rejection(line)?;

    if line.is_empty() {
        return Err(AcError::Parse("empty response".to_string()));
    }

    line.parse::<f64>()
        .map_err(|_| AcError::Parse(format!("expected a number, got {:?}", line)))
}

/// Decode the acknowledgement of a set command
pub fn decode_ack(raw: &str) -> Result<()> {
    let line = first_line(raw);
    check_rejection(line)?;

    if line == "OK" {
        Ok(())
    } else {
        Err(AcError::Parse(format!("expected OK, got {:?}", line)))
    }
}

/// Decode an `ls2` full-state response
pub fn decode_state(raw: &str) -> Result<DeviceStateRecord> {
    let line = first_line(raw);
    check_rejection(line)?;

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < STATE_FIELD_COUNT {
        return Err(AcError::Parse(format!(
            "state line: expected {} fields, got {} in {:?}",
            STATE_FIELD_COUNT,
            fields.len(),
            line
        )));
    }

    let unit_id = match fields[0].rsplit_once('.') {
        Some((_, suffix)) if !suffix.is_empty() => suffix.to_string(),
        _ => {
            return Err(AcError::Parse(format!(
                "state line: unit id {:?} is not dotted",
                fields[0]
            )))
        }
    };

    let on_off: OnOff = fields[1].parse()?;
    let (setpoint_temperature, setpoint_unit) = parse_temperature(fields[2])?;
    let (room_temperature, room_unit) = parse_temperature(fields[3])?;
    let fan_mode: FanMode = fields[4].parse()?;
    let operating_mode: OperatingMode = fields[5].parse()?;

    Ok(DeviceStateRecord {
        unit_id,
        on_off,
        setpoint_temperature,
        room_temperature,
        fan_mode,
        operating_mode,
        temperature_unit: setpoint_unit.or(room_unit),
    })
}

/// Encode a state line the way the controller prints it
pub fn encode_state(full_unit_id: &str, record: &DeviceStateRecord) -> String {
    let suffix = record
        .temperature_unit
        .map(|u| u.suffix().to_string())
        .unwrap_or_default();

    format!(
        "{} {} {}{} {}{} {} {} OK - 0",
        full_unit_id,
        record.on_off,
        format_temperature(record.setpoint_temperature),
        suffix,
        format_temperature(record.room_temperature),
        suffix,
        record.fan_mode,
        record.operating_mode,
    )
}

/// Parse a fixed-width temperature token
///
/// The unit suffix is read from the whole token, the value from its first
/// four characters. A slice of four digits is a tenths value (`0235` → 23.5).
pub fn parse_temperature(token: &str) -> Result<(f64, Option<TemperatureUnit>)> {
    let unit = token.chars().last().and_then(TemperatureUnit::from_suffix);

    let slice: String = token.chars().take(TEMPERATURE_WIDTH).collect();
    let numeric = slice.trim_end_matches(|c: char| TemperatureUnit::from_suffix(c).is_some());

    let value = if numeric.len() == TEMPERATURE_WIDTH && numeric.chars().all(|c| c.is_ascii_digit()) {
        numeric
            .parse::<u32>()
            .map(|tenths| tenths as f64 / 10.0)
            .map_err(|_| AcError::Parse(format!("invalid temperature {:?}", token)))?
    } else {
        numeric
            .parse::<f64>()
            .map_err(|_| AcError::Parse(format!("invalid temperature {:?}", token)))?
    };

    Ok((value, unit))
}
