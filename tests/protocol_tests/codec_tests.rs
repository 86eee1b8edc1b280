//! Codec Tests
//!
//! Tests for command formatting and response decoding.

use coolmaster::protocol::{
    decode_ack, decode_command, decode_scalar, decode_state, encode_command, encode_state,
    parse_temperature, Command, DeviceStateRecord, FanCode, FanMode, OnOff, OperatingMode,
    QueryField,
};
use coolmaster::{AcError, TemperatureUnit};

fn unit() -> String {
    "L1.100".to_string()
}

// =============================================================================
// Command Encoding Tests
// =============================================================================

#[test]
fn test_encode_queries() {
    let cases = [
        (QueryField::Power, "query L1.100 o\n"),
        (QueryField::Mode, "query L1.100 m\n"),
        (QueryField::Setpoint, "query L1.100 h\n"),
        (QueryField::FanSpeed, "query L1.100 f\n"),
    ];

    for (field, expected) in cases {
        let cmd = Command::Query { unit: unit(), field };
        assert_eq!(encode_command(&cmd), expected);
    }
}

#[test]
fn test_encode_power_and_mode() {
    assert_eq!(encode_command(&Command::On { unit: unit() }), "on L1.100\n");
    assert_eq!(encode_command(&Command::Off { unit: unit() }), "off L1.100\n");
    assert_eq!(encode_command(&Command::Cool { unit: unit() }), "cool L1.100\n");
    assert_eq!(encode_command(&Command::Heat { unit: unit() }), "heat L1.100\n");
    assert_eq!(encode_command(&Command::State { unit: unit() }), "ls2 L1.100\n");
}

#[test]
fn test_encode_temp() {
    let whole = Command::Temp { unit: unit(), value: 22.0 };
    assert_eq!(encode_command(&whole), "temp L1.100 22\n");

    let half = Command::Temp { unit: unit(), value: 22.5 };
    assert_eq!(encode_command(&half), "temp L1.100 22.5\n");
}

#[test]
fn test_encode_fan_speed() {
    let cmd = Command::FanSpeed {
        unit: unit(),
        code: FanCode::High,
    };
    assert_eq!(encode_command(&cmd), "fspeed L1.100 h\n");
}

#[test]
fn test_decode_command_lines() {
    assert_eq!(
        decode_command("temp L1.100 21.5\r\n").unwrap(),
        Command::Temp { unit: unit(), value: 21.5 }
    );
    assert_eq!(
        decode_command("query L1.100 m").unwrap(),
        Command::Query { unit: unit(), field: QueryField::Mode }
    );
    assert_eq!(
        decode_command("fspeed L1.100 a").unwrap(),
        Command::FanSpeed { unit: unit(), code: FanCode::Auto }
    );
}

#[test]
fn test_decode_command_errors() {
    assert!(matches!(decode_command(""), Err(AcError::Parse(_))));
    assert!(matches!(decode_command("reboot L1.100"), Err(AcError::Parse(msg)) if msg.starts_with("unknown command")));
    assert!(matches!(decode_command("on"), Err(AcError::Parse(_))));
    assert!(matches!(decode_command("query L1.100"), Err(AcError::Parse(_))));
    assert!(matches!(decode_command("query L1.100 x"), Err(AcError::Parse(_))));
    assert!(matches!(decode_command("temp L1.100 warm"), Err(AcError::Parse(_))));
    assert!(matches!(decode_command("fspeed L1.100 z"), Err(AcError::Parse(_))));
}

// =============================================================================
// Scalar / Ack Decoding Tests
// =============================================================================

#[test]
fn test_decode_scalar_uses_first_line() {
    assert_eq!(decode_scalar("1\nOK").unwrap(), 1.0);
    assert_eq!(decode_scalar("22.5\r\nOK\r\n").unwrap(), 22.5);
    assert_eq!(decode_scalar("0").unwrap(), 0.0);
}

#[test]
fn test_decode_scalar_non_numeric() {
    assert!(matches!(decode_scalar("abc\nOK"), Err(AcError::Parse(_))));
    assert!(matches!(decode_scalar(""), Err(AcError::Parse(_))));
}

#[test]
fn test_rejection_is_not_a_parse_error() {
    assert_eq!(
        decode_scalar("ERROR: no such UID L9.999"),
        Err(AcError::Rejected("ERROR: no such UID L9.999".to_string()))
    );
    assert!(matches!(decode_ack("Unknown command"), Err(AcError::Rejected(_))));
    assert!(matches!(decode_state("ERROR: bad uid\nOK"), Err(AcError::Rejected(_))));
}

#[test]
fn test_decode_ack() {
    assert!(decode_ack("OK").is_ok());
    assert!(decode_ack("OK\r\n").is_ok());
    assert!(matches!(decode_ack("1\nOK"), Err(AcError::Parse(_))));
}

// =============================================================================
// State Line Tests
// =============================================================================

#[test]
fn test_decode_state_fixed_width_tenths() {
    let record = decode_state("AC.01 ON 0220 0235 2 Cool").unwrap();

    assert_eq!(record.unit_id, "01");
    assert_eq!(record.on_off, OnOff::On);
    assert!(record.is_on());
    assert_eq!(record.setpoint_temperature, 22.0);
    assert_eq!(record.room_temperature, 23.5);
    assert_eq!(record.fan_mode, FanMode::High);
    assert_eq!(record.operating_mode, OperatingMode::Cool);
    assert_eq!(record.temperature_unit, None);
}

#[test]
fn test_decode_state_with_suffix_and_trailer() {
    let record = decode_state("L1.100 OFF 25C 23.5C Med Heat OK - 0\nOK").unwrap();

    assert_eq!(record.unit_id, "100");
    assert!(!record.is_on());
    assert_eq!(record.setpoint_temperature, 25.0);
    assert_eq!(record.room_temperature, 23.5);
    assert_eq!(record.fan_mode, FanMode::Medium);
    assert_eq!(record.operating_mode, OperatingMode::Heat);
    assert_eq!(record.temperature_unit, Some(TemperatureUnit::Celsius));
}

#[test]
fn test_decode_state_too_few_fields() {
    assert!(matches!(decode_state("L1.100 ON 25C 23C High"), Err(AcError::Parse(_))));
    assert!(matches!(decode_state(""), Err(AcError::Parse(_))));
}

#[test]
fn test_decode_state_bad_tokens() {
    assert!(matches!(decode_state("L1100 ON 25C 23C High Cool"), Err(AcError::Parse(_))));
    assert!(matches!(decode_state("L1.100 MAYBE 25C 23C High Cool"), Err(AcError::Parse(_))));
    assert!(matches!(decode_state("L1.100 ON hot 23C High Cool"), Err(AcError::Parse(_))));
    assert!(matches!(decode_state("L1.100 ON 25C 23C Turbo Cool"), Err(AcError::Parse(_))));
    assert!(matches!(decode_state("L1.100 ON 25C 23C High Vent"), Err(AcError::Parse(_))));
}

#[test]
fn test_encode_state_is_decodable() {
    let record = DeviceStateRecord {
        unit_id: "101".to_string(),
        on_off: OnOff::On,
        setpoint_temperature: 72.0,
        room_temperature: 70.5,
        fan_mode: FanMode::Top,
        operating_mode: OperatingMode::Dry,
        temperature_unit: Some(TemperatureUnit::Fahrenheit),
    };

    let line = encode_state("L1.101", &record);
    assert_eq!(line, "L1.101 ON 72F 70.5F Top Dry OK - 0");
    assert_eq!(decode_state(&line).unwrap(), record);
}

#[test]
fn test_parse_temperature_forms() {
    assert_eq!(parse_temperature("0235").unwrap(), (23.5, None));
    assert_eq!(parse_temperature("24C").unwrap(), (24.0, Some(TemperatureUnit::Celsius)));
    assert_eq!(parse_temperature("75.5F").unwrap(), (75.5, Some(TemperatureUnit::Fahrenheit)));
    assert!(matches!(parse_temperature("--"), Err(AcError::Parse(_))));
}
