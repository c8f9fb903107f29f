#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]
//! # dallas-temperature
//! Driver for the Maxim/Dallas 1-Wire temperature sensors: DS18S20, DS18B20,
//! DS1822 and the MAX31850 thermocouple converter.
//!
//! The driver talks to the bus only through the [`OneWire`] trait of
//! [`embedded_onewire`] and waits through an [`embedded_hal::delay::DelayNs`]
//! implementation. Start with [`DallasTemperature`]:
//!
//! ```ignore
//! let mut sensors = DallasTemperature::new(bus, delay)
//!     .with_config(DallasConfig::default().with_resolution(ReadoutResolution::Resolution12bit));
//! sensors.begin()?;
//! sensors.request_temperatures()?;
//! let celsius = sensors.get_temp_c_by_index(0);
//! ```

mod alarm;
mod config;
mod conversion;
mod dallas;
pub mod decode;
mod error;
mod scratchpad;

pub use alarm::{AlarmObserver, LogAlarmHandler, NoopAlarmHandler};
pub use config::DallasConfig;
pub use conversion::ConversionPolicy;
pub use dallas::DallasTemperature;
pub use decode::{Decoder, Temperature, to_celsius, to_fahrenheit};
pub use embedded_onewire::{OneWire, OneWireAddress, OneWireError, OneWireStatus};
pub use error::DallasError;
pub use scratchpad::{ConfigRegister, ReadoutResolution, Scratchpad};

/// Result type of the driver operations.
pub type DallasResult<T, E> = Result<T, DallasError<E>>;

/// Family code of the DS18S20 (and the older DS1820).
pub const DS18S20_FAMILY: u8 = 0x10;
/// Family code of the DS18B20.
pub const DS18B20_FAMILY: u8 = 0x28;
/// Family code of the DS1822.
pub const DS1822_FAMILY: u8 = 0x22;
/// Family code of the MAX31850 / MAX31851.
pub const MAX31850_FAMILY: u8 = 0x3b;

/// Reported in °C by the sentinel-valued readers when a device does not answer.
pub const DEVICE_DISCONNECTED_C: f32 = -127.0;
/// [`DEVICE_DISCONNECTED_C`] in °F.
pub const DEVICE_DISCONNECTED_F: f32 = -196.6;
/// Lowest alarm threshold the sensors can measure against, in °C.
pub const ALARM_TEMP_MIN: i8 = -55;
/// Highest alarm threshold the sensors can measure against, in °C.
pub const ALARM_TEMP_MAX: i8 = 125;

pub(crate) const DALLAS_START_CONV: u8 = 0x44;
pub(crate) const DALLAS_READ_SCRATCH: u8 = 0xbe;
pub(crate) const DALLAS_WRITE_SCRATCH: u8 = 0x4e;
pub(crate) const DALLAS_COPY_SCRATCH: u8 = 0x48;
pub(crate) const DALLAS_RECALL_EEPROM: u8 = 0xb8;
pub(crate) const DALLAS_READ_POWERMODE: u8 = 0xb4;
