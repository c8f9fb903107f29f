//! Conversion of scratchpad images to temperatures.

use crate::{
    DS1822_FAMILY, DS18B20_FAMILY, DS18S20_FAMILY, MAX31850_FAMILY, ReadoutResolution, Scratchpad,
};
use fixed::types::I12F4;

/// Temperature in degrees Celsius with the 1/16 °C granularity of the raw register.
pub type Temperature = I12F4;

/// Temperature decoding strategy of a sensor family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    /// DS18S20: 0.5 °C register extended with COUNT REMAIN / COUNT PER °C.
    CountRemain,
    /// DS18B20, DS1822: two's complement 1/16 °C register, low bits undefined below 12-bit resolution.
    Configurable,
    /// MAX31850: two's complement 1/16 °C register with 0.25 °C steps, bit 0 is the fault flag.
    Thermocouple,
}

/// Family code to decoder table. Unknown families decode as [`Decoder::Configurable`].
const DECODERS: [(u8, Decoder); 4] = [
    (DS18S20_FAMILY, Decoder::CountRemain),
    (DS18B20_FAMILY, Decoder::Configurable),
    (DS1822_FAMILY, Decoder::Configurable),
    (MAX31850_FAMILY, Decoder::Thermocouple),
];

impl Decoder {
    /// Looks up the decoder of a family code.
    pub fn for_family(family: u8) -> Self {
        DECODERS
            .iter()
            .find(|(code, _)| *code == family)
            .map(|(_, decoder)| *decoder)
            .unwrap_or(Decoder::Configurable)
    }

    /// Resolution of families without a configuration register, `None` for configurable ones.
    ///
    /// Fixed-resolution parts are timed like a 12-bit conversion.
    pub fn fixed_resolution(&self) -> Option<ReadoutResolution> {
        match self {
            Decoder::Configurable => None,
            Decoder::CountRemain | Decoder::Thermocouple => Some(ReadoutResolution::Resolution12bit),
        }
    }

    /// Temperature in °C.
    pub fn decode(&self, scratchpad: &Scratchpad) -> f32 {
        let raw = scratchpad.raw_temperature();
        match self {
            Decoder::CountRemain => {
                let count_per_c = scratchpad.count_per_c();
                if count_per_c == 0 {
                    // No calibration data, report the native half-degree reading
                    return raw as f32 / 2.0;
                }
                let count_remain = scratchpad.count_remain();
                (raw >> 1) as f32 - 0.25
                    + (count_per_c as f32 - count_remain as f32) / count_per_c as f32
            }
            Decoder::Configurable => {
                let masked = raw & scratchpad.resolution().raw_mask();
                Temperature::from_bits(masked).to_num::<f32>()
            }
            Decoder::Thermocouple => Temperature::from_bits(raw & !0b11).to_num::<f32>(),
        }
    }

    /// `true` if the device flagged the last conversion as invalid.
    ///
    /// Only the MAX31850 reports faults, in bit 0 of the temperature register.
    pub fn is_fault(&self, scratchpad: &Scratchpad) -> bool {
        matches!(self, Decoder::Thermocouple) && scratchpad.raw_temperature() & 0b1 != 0
    }

    /// Whole degrees the device compares against its alarm thresholds.
    pub fn alarm_degrees(&self, scratchpad: &Scratchpad) -> i16 {
        let raw = scratchpad.raw_temperature();
        match self {
            Decoder::CountRemain => raw >> 1,
            Decoder::Configurable | Decoder::Thermocouple => raw >> 4,
        }
    }
}

/// Temperature in °C of a scratchpad read from a device of the given family.
pub fn decode(family: u8, scratchpad: &Scratchpad) -> f32 {
    Decoder::for_family(family).decode(scratchpad)
}

/// Converts °C to °F.
pub fn to_fahrenheit(celsius: f32) -> f32 {
    celsius * 1.8 + 32.0
}

/// Converts °F to °C.
pub fn to_celsius(fahrenheit: f32) -> f32 {
    (fahrenheit - 32.0) / 1.8
}
