//! Device Tests
//!
//! Drives the typed device API against the in-memory simulated controller.

use std::sync::Arc;

use coolmaster::protocol::{FanCode, FanMode, OperatingMode};
use coolmaster::sim::{SimUnit, UnitBank};
use coolmaster::transport::MemoryTransport;
use coolmaster::{
    AcError, Config, Controller, RunningState, TargetMode, TemperatureUnit,
};

struct Fixture {
    bank: Arc<UnitBank>,
    sent: Arc<parking_lot::Mutex<Vec<String>>>,
    controller: Controller,
}

fn fixture_with(unit: Option<TemperatureUnit>, config: Config) -> Fixture {
    let bank = Arc::new(UnitBank::new(["L1.100", "L1.101"], unit));
    let responder = Arc::clone(&bank);
    let transport = MemoryTransport::new(move |line| responder.reply(line));
    let sent = transport.sent_log();
    let controller = Controller::with_transport(config, transport).unwrap();

    Fixture { bank, sent, controller }
}

fn fixture() -> Fixture {
    let config = Config::builder()
        .command_timeout_ms(200)
        .unit("L1.100", "Living room")
        .unit("L1.101", "Bedroom")
        .build();
    fixture_with(Some(TemperatureUnit::Celsius), config)
}

// =============================================================================
// Controller
// =============================================================================

#[test]
fn test_controller_lookup() {
    let f = fixture();

    let device = f.controller.device("L1.100").unwrap();
    assert_eq!(device.unique_id(), "L1.100");
    assert_eq!(device.display_name(), "Living room");

    assert!(f.controller.device("L9.999").is_none());
    assert_eq!(f.controller.devices().len(), 2);
    assert_eq!(f.controller.unit("L1.101").display_name(), "L1.101");
}

#[test]
fn test_controller_rejects_invalid_config() {
    let config = Config::builder().unit("L1.100", "a").unit("L1.100", "b").build();
    let result = Controller::with_transport(config, MemoryTransport::echo());
    assert!(matches!(result, Err(AcError::Config(_))));
}

// =============================================================================
// Power and Mode
// =============================================================================

#[test]
fn test_power_on_off() {
    let f = fixture();
    let device = f.controller.device("L1.100").unwrap();

    assert!(!device.power_state().unwrap());
    device.set_power_state(true).unwrap();
    assert!(device.power_state().unwrap());

    // Setting the current state again is harmless
    device.set_power_state(true).unwrap();
    assert!(device.power_state().unwrap());

    device.set_power_state(false).unwrap();
    assert!(!device.power_state().unwrap());
    assert!(!f.bank.unit("L1.100").unwrap().on);
}

#[test]
fn test_set_mode_reads_back_setpoint() {
    let f = fixture();
    let device = f.controller.device("L1.100").unwrap();

    assert_eq!(device.set_mode(TargetMode::Heat).unwrap(), 24.0);
    assert_eq!(device.mode_state().unwrap(), TargetMode::Heat);

    let sent = f.sent.lock().clone();
    assert_eq!(&sent[..2], ["heat L1.100", "query L1.100 h"]);
}

#[test]
fn test_mode_codes_without_target_equivalent() {
    let f = fixture();
    let device = f.controller.device("L1.101").unwrap();

    f.bank.set_unit(
        "L1.101",
        SimUnit {
            mode: OperatingMode::Dry,
            ..SimUnit::default()
        },
    );
    assert_eq!(device.mode_state().unwrap(), TargetMode::Cool);

    device.set_cool_state().unwrap();
    assert_eq!(f.bank.unit("L1.101").unwrap().mode, OperatingMode::Cool);
}

// =============================================================================
// Temperature
// =============================================================================

#[test]
fn test_target_temperature() {
    let f = fixture();
    let device = f.controller.device("L1.100").unwrap();

    device.set_target_temperature(22.5).unwrap();
    assert_eq!(device.target_temperature().unwrap(), 22.5);
    assert!(f.sent.lock().contains(&"temp L1.100 22.5".to_string()));
}

#[test]
fn test_out_of_range_temperature_is_rejected() {
    let f = fixture();
    let device = f.controller.device("L1.100").unwrap();

    assert!(matches!(device.set_target_temperature(40.0), Err(AcError::Rejected(_))));
    assert_eq!(device.target_temperature().unwrap(), 24.0);
}

#[test]
fn test_non_finite_temperature_never_sent() {
    let f = fixture();
    let device = f.controller.device("L1.100").unwrap();

    assert!(matches!(
        device.set_target_temperature(f64::NAN),
        Err(AcError::InvalidValue(_))
    ));
    assert!(f.sent.lock().is_empty());
}

#[test]
fn test_absurd_temperature_never_sent() {
    let f = fixture();
    let device = f.controller.device("L1.100").unwrap();

    for value in [1e20, -1e20, 500.0, -100.0] {
        assert!(matches!(
            device.set_target_temperature(value),
            Err(AcError::InvalidValue(_))
        ));
    }
    assert!(f.sent.lock().is_empty());
}

#[test]
fn test_room_temperature_and_unit() {
    let f = fixture();
    let device = f.controller.device("L1.100").unwrap();

    assert_eq!(device.room_temperature().unwrap(), 26.0);
    assert_eq!(device.temperature_unit().unwrap(), TemperatureUnit::Celsius);
}

#[test]
fn test_temperature_unit_falls_back_to_config() {
    let config = Config::builder()
        .default_temperature_unit(TemperatureUnit::Fahrenheit)
        .unit("L1.100", "Office")
        .build();
    let f = fixture_with(None, config);
    let device = f.controller.device("L1.100").unwrap();

    assert_eq!(device.temperature_unit().unwrap(), TemperatureUnit::Fahrenheit);
}

// =============================================================================
// Fan
// =============================================================================

#[test]
fn test_fan_speed_bands() {
    let f = fixture();
    let device = f.controller.device("L1.100").unwrap();

    assert_eq!(device.fan_speed().unwrap(), 25.0);

    assert_eq!(device.set_fan_speed(70.0).unwrap(), FanCode::High);
    assert_eq!(f.bank.unit("L1.100").unwrap().fan, FanMode::High);
    assert_eq!(device.fan_speed().unwrap(), 75.0);

    assert_eq!(device.set_fan_speed(75.0).unwrap(), FanCode::Auto);
    assert_eq!(device.fan_speed().unwrap(), 75.0);

    assert_eq!(device.set_fan_speed(100.0).unwrap(), FanCode::Top);
    assert_eq!(device.fan_speed().unwrap(), 100.0);
}

#[test]
fn test_fan_speed_over_100_is_invalid() {
    let f = fixture();
    let device = f.controller.device("L1.100").unwrap();

    assert!(matches!(device.set_fan_speed(120.0), Err(AcError::InvalidValue(_))));
    assert!(f.sent.lock().is_empty());
}

// =============================================================================
// Full State
// =============================================================================

#[test]
fn test_device_state_and_running_state() {
    let f = fixture();
    let device = f.controller.device("L1.100").unwrap();

    let state = device.device_state().unwrap();
    assert_eq!(state.unit_id, "100");
    assert_eq!(state.setpoint_temperature, 24.0);
    assert_eq!(state.fan_mode, FanMode::Low);
    assert_eq!(device.current_state().unwrap(), RunningState::Inactive);

    device.set_power_state(true).unwrap();
    assert_eq!(device.current_state().unwrap(), RunningState::Cooling);

    device.set_heat_state().unwrap();
    assert_eq!(device.current_state().unwrap(), RunningState::Heating);
}

#[test]
fn test_unknown_unit_is_rejected() {
    let f = fixture();
    let device = f.controller.unit("L9.999");

    assert!(matches!(device.power_state(), Err(AcError::Rejected(_))));
    assert!(matches!(device.set_power_state(true), Err(AcError::Rejected(_))));
}

#[test]
fn test_silent_controller_times_out_then_recovers() {
    let f = fixture();
    let device = f.controller.device("L1.100").unwrap();

    f.bank.set_muted(true);
    assert_eq!(device.power_state(), Err(AcError::Timeout(200)));

    f.bank.set_muted(false);
    assert!(!device.power_state().unwrap());
}
