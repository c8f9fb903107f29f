mod common;

use common::{RecordingDelay, Sensor, SimBus};
use dallas_temperature::{DallasConfig, DallasError, DallasTemperature};

fn session(sensors: Vec<Sensor>) -> DallasTemperature<SimBus, RecordingDelay> {
    DallasTemperature::new(SimBus::new(sensors), RecordingDelay::default())
}

#[test]
fn active_poll_waits_for_the_line_to_rise() {
    let mut sensor = Sensor::ds18b20(1, 0x0191).busy_for(5);
    sensor.next_raw = Some(0x0190);
    let rom = sensor.rom;
    let mut sensors = session(vec![sensor]);
    sensors.begin().unwrap();
    sensors.request_temperatures().unwrap();
    assert_eq!(sensors.get_temp_c(&rom), 25.0);
    let (bus, delay) = sensors.release();
    assert_eq!(bus.polls, 6);
    assert_eq!(delay.ms, vec![1; 5]);
    assert!(bus.powered.is_empty());
}

#[test]
fn parasite_power_forces_blocking_delay() {
    let sensor = Sensor::ds18b20(1, 0x0191).parasite().busy_for(5);
    let mut sensors = session(vec![sensor]);
    sensors.begin().unwrap();
    assert!(sensors.wait_for_conversion());
    assert!(sensors.check_for_conversion());
    sensors.request_temperatures().unwrap();
    let (bus, delay) = sensors.release();
    assert_eq!(bus.polls, 0);
    assert_eq!(bus.powered, vec![0x44]);
    assert_eq!(delay.ms, vec![750]);
}

#[test]
fn blocking_delay_without_check() {
    let sensor = Sensor::ds18b20_config(1, 0x0191, 0x3f);
    let mut sensors = session(vec![sensor]);
    sensors.begin().unwrap();
    sensors.set_check_for_conversion(false);
    sensors.request_temperatures().unwrap();
    let (bus, delay) = sensors.release();
    assert_eq!(bus.polls, 0);
    assert_eq!(delay.ms, vec![188]);
}

#[test]
fn fire_and_forget_returns_at_once() {
    let sensor = Sensor::ds18b20(1, 0x0191).busy_for(2);
    let mut sensors = DallasTemperature::new(SimBus::new(vec![sensor]), RecordingDelay::default())
        .with_config(DallasConfig::default().with_wait_for_conversion(false));
    sensors.request_temperatures().unwrap();
    assert!(sensors.bus_mut().commands.contains(&0x44));
    assert!(!sensors.is_conversion_complete().unwrap());
    assert!(!sensors.is_conversion_complete().unwrap());
    assert!(sensors.is_conversion_complete().unwrap());
    let (_, delay) = sensors.release();
    assert!(delay.ms.is_empty());
}

#[test]
fn poll_gives_up_after_conversion_time() {
    let sensor = Sensor::ds18b20_config(1, 0x0191, 0x1f).busy_for(10_000);
    let mut sensors = session(vec![sensor]);
    sensors.begin().unwrap();
    assert!(matches!(
        sensors.request_temperatures(),
        Err(DallasError::ConversionTimeout)
    ));
    let (bus, delay) = sensors.release();
    assert_eq!(bus.polls, 95);
    assert_eq!(delay.total_ms(), 94);
}

#[test]
fn request_by_address_uses_device_resolution() {
    let slow = Sensor::ds18b20_config(1, 0x0191, 0x7f);
    let fast = Sensor::ds18b20_config(2, 0x0191, 0x1f);
    let rom = fast.rom;
    let mut sensors = session(vec![slow, fast]);
    sensors.begin().unwrap();
    sensors.set_check_for_conversion(false);
    assert!(sensors.request_temperatures_by_address(&rom).unwrap());
    let (bus, delay) = sensors.release();
    assert_eq!(delay.ms, vec![94]);
    assert_eq!(bus.commands.last(), Some(&0x44));
}

#[test]
fn request_for_missing_device() {
    let absent = Sensor::ds18b20(9, 0x0191).rom;
    let mut sensors = session(vec![Sensor::ds18b20(1, 0x0191)]);
    sensors.begin().unwrap();
    assert!(!sensors.request_temperatures_by_address(&absent).unwrap());
    assert!(!sensors.request_temperatures_by_index(1).unwrap());
    assert!(sensors.request_temperatures_by_index(0).unwrap());
}
