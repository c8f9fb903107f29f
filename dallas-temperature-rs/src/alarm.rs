//! Alarm dispatch.

use embedded_onewire::OneWireAddress;
use log::warn;

/// Receives the devices reported by
/// [`process_alarms`](crate::DallasTemperature::process_alarms).
///
/// Implemented for closures taking the device address:
/// ```ignore
/// let sensors = DallasTemperature::new(bus, delay)
///     .with_alarm_handler(|addr: &OneWireAddress| alarmed.push(*addr));
/// ```
pub trait AlarmObserver {
    /// Called once per alarmed device and pass.
    fn on_alarm(&mut self, address: &OneWireAddress);
}

impl<F: FnMut(&OneWireAddress)> AlarmObserver for F {
    fn on_alarm(&mut self, address: &OneWireAddress) {
        self(address)
    }
}

/// Logs every alarm at `warn` level. The default handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlarmHandler;

impl AlarmObserver for LogAlarmHandler {
    fn on_alarm(&mut self, address: &OneWireAddress) {
        warn!("{address}: temperature alarm");
    }
}

/// Ignores alarms.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAlarmHandler;

impl AlarmObserver for NoopAlarmHandler {
    fn on_alarm(&mut self, _address: &OneWireAddress) {}
}
